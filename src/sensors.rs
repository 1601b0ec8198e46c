//! Sensor latch: two 16-bit words (temperature, Vdd) continuously
//! refreshed by an external collaborator (ADC + DMA in the original
//! firmware), plus the fixed calibration constants baked into the chip.
//!
//! Both the protocol engine (SENSORS command) and the VM (`@T`/`@V`
//! primitives) read through the same [`SensorSource`].

use byteorder::{ByteOrder, LittleEndian};

use crate::config::DATA_SIZE;
use crate::wire::Selector;

/// External collaborator exposing the latest ADC sample. Bring-up of the
/// ADC/DMA pair that keeps this fresh is out of scope; this crate only
/// ever reads the latched words.
pub trait SensorSource {
    /// Latest (temperature, vdd) raw ADC words.
    fn sample(&self) -> (u16, u16);
}

/// The three calibration constants baked into the chip at manufacture
/// time, read through fixed immutable addresses in the original firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    pub vdd_cal: u16,
    pub temp30_cal: u16,
    pub temp110_cal: u16,
}

/// Fill `data[..n]` with the SENSORS payload for the given selector, and
/// return `n`.
///
/// - `All`: `[temp110_cal, temp30_cal, temp, vdd_cal, vdd]`, 10 bytes.
/// - `Temp`: the first 6 bytes of that.
/// - `Vdd`: `[vdd_cal, vdd]`, 4 bytes.
///
/// Any other selector value fills nothing and returns 0; the caller is
/// expected to still ACK (the original firmware's `switch` has no default
/// case either, so unmatched options silently leave `data` untouched).
pub fn fill_payload(
    cal: &Calibration,
    source: &dyn SensorSource,
    selector: Selector,
    data: &mut [u8; DATA_SIZE],
) -> usize {
    let (temp, vdd) = source.sample();

    match selector {
        Selector::All => {
            LittleEndian::write_u16(&mut data[0..2], cal.temp110_cal);
            LittleEndian::write_u16(&mut data[2..4], cal.temp30_cal);
            LittleEndian::write_u16(&mut data[4..6], temp);
            LittleEndian::write_u16(&mut data[6..8], cal.vdd_cal);
            LittleEndian::write_u16(&mut data[8..10], vdd);
            10
        }
        Selector::Temp => {
            LittleEndian::write_u16(&mut data[0..2], cal.temp110_cal);
            LittleEndian::write_u16(&mut data[2..4], cal.temp30_cal);
            LittleEndian::write_u16(&mut data[4..6], temp);
            6
        }
        Selector::Vdd => {
            LittleEndian::write_u16(&mut data[0..2], cal.vdd_cal);
            LittleEndian::write_u16(&mut data[2..4], vdd);
            4
        }
        _ => 0,
    }
}

#[cfg(test)]
pub struct FixedSensorSource {
    pub temp: u16,
    pub vdd: u16,
}

#[cfg(test)]
impl SensorSource for FixedSensorSource {
    fn sample(&self) -> (u16, u16) {
        (self.temp, self.vdd)
    }
}
