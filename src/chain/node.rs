//! One link in the chain: receives packets from upstream, services the
//! ones addressed to it, forwards the rest downstream, and relays
//! whatever arrives on the downstream link back upstream unchanged.
//!
//! This is a direct port of the original firmware's single `while(1)`
//! dispatch loop, split into two pollable steps (`service_upstream` and
//! `service_downstream`) so a test harness can drive a chain of nodes
//! deterministically instead of needing real interrupts and timers.

use log::{debug, trace, warn};

use crate::config::UID_SIZE;
use crate::crc;
use crate::identity::{self, ChipInfo};
use crate::link::{self, Link};
use crate::mem::MemorySurface;
use crate::sensors::{self, Calibration, SensorSource};
use crate::vm::{Io, Vm};
use crate::wire::{Command, PacketRepr, Selector};

/// A single node, generic over its two link implementations so the same
/// code runs against real UART links or in-memory test links alike.
pub struct Node<'s, U: Link, D: Link> {
    up: U,
    down: D,
    uid: [u8; UID_SIZE],
    sram_size: u32,
    calibration: Calibration,
    sensors: &'s dyn SensorSource,
    mem: MemorySurface,
    vm: Vm,
}

impl<'s, U: Link, D: Link> Node<'s, U, D> {
    pub fn new(
        up: U,
        down: D,
        chip: &dyn ChipInfo,
        calibration: Calibration,
        sensors: &'s dyn SensorSource,
    ) -> Self {
        Node {
            up,
            down,
            uid: identity::format_uid(chip.id_words()),
            sram_size: chip.sram_size(),
            calibration,
            sensors,
            mem: MemorySurface::new(),
            vm: Vm::new(),
        }
    }

    pub fn uid(&self) -> &[u8; UID_SIZE] {
        &self.uid
    }

    fn is_mine(&self, repr: &PacketRepr) -> bool {
        repr.uid_matches(&self.uid)
    }

    /// Pass whatever has arrived on the downstream link straight back
    /// upstream, re-arming both links as the downstream completion
    /// callback does in the original firmware. Returns whether a frame
    /// was relayed.
    pub fn service_downstream(&mut self) -> Result<bool, link::LinkError> {
        match self.down.try_recv() {
            Some(frame) => {
                trace!("relaying downstream frame upward unchanged");
                self.up.send(&frame)?;
                self.down.reset();
                self.up.reset();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Service one packet from the upstream link, if one has arrived.
    /// Returns whether a packet was processed.
    pub fn service_upstream(&mut self) -> Result<bool, link::LinkError> {
        let frame = match self.up.try_recv() {
            Some(frame) => frame,
            None => return Ok(false),
        };

        // Checksum is verified against the raw, as-received image: the
        // hop counter below is bumped only in the decoded copy, never
        // written back into the bytes the sender actually checksummed.
        let expected = crc::make_crc(&frame);
        let mut repr = PacketRepr::parse(&frame);
        repr.pic = repr.pic.wrapping_add(1);

        if expected != repr.checksum {
            warn!("checksum mismatch from upstream, command {:?}", repr.command);
            repr.command = Command::Err;
            repr.options = 1;
            repr.refresh_checksum();
            self.up.send(&repr.emit())?;
            self.up.reset();
            return Ok(true);
        }

        debug!("dispatching {:?} options={:#x}", repr.command, repr.options);
        self.dispatch(repr)?;
        Ok(true)
    }

    fn dispatch(&mut self, mut repr: PacketRepr) -> Result<(), link::LinkError> {
        match repr.command {
            Command::Ping => match Selector::from(repr.options) {
                Selector::Own => {
                    if self.is_mine(&repr) {
                        self.ack_with_options(repr, self.sram_size)?;
                    } else {
                        self.forward_down(repr)?;
                    }
                }
                Selector::All => {
                    let mut ack = repr;
                    ack.uid = self.uid;
                    self.ack_with_options(ack, self.sram_size)?;

                    repr.command = Command::Ping;
                    repr.options = u32::from(Selector::All);
                    self.send_down(repr)?;
                }
                // No other PING selector is defined; the original
                // firmware's switch has no default case either, so an
                // unmatched selector is silently dropped rather than
                // answered.
                _ => {}
            },
            Command::Read => {
                if self.is_mine(&repr) {
                    self.mem.read_block(repr.options, &mut repr.data);
                    self.ack(repr)?;
                } else {
                    self.forward_down(repr)?;
                }
            }
            Command::Write => {
                if self.is_mine(&repr) {
                    self.mem.write_block(repr.options, &repr.data);
                    self.ack(repr)?;
                } else {
                    self.forward_down(repr)?;
                }
            }
            Command::Sensors => {
                if self.is_mine(&repr) {
                    let selector = Selector::from(repr.options);
                    sensors::fill_payload(&self.calibration, self.sensors, selector, &mut repr.data);
                    self.ack(repr)?;
                } else {
                    self.forward_down(repr)?;
                }
            }
            Command::Load => {
                if self.is_mine(&repr) {
                    self.mem.load_src_block(repr.options, &repr.data);
                    self.ack(repr)?;
                } else {
                    self.forward_down(repr)?;
                }
            }
            Command::Exec => {
                if self.is_mine(&repr) {
                    if repr.options == 1 {
                        self.mem.reset_write_pos();
                    }
                    let src = owned_src(self.mem.src_buf());
                    let mut io = Io {
                        mem: &mut self.mem,
                        sensors: self.sensors,
                    };
                    let code = self.vm.eval(&src, &mut io);
                    self.ack_with_options(repr, code)?;
                } else {
                    self.forward_down(repr)?;
                }
            }
            Command::Retr => {
                if self.is_mine(&repr) {
                    self.mem.retr_block(repr.options, &mut repr.data);
                    self.ack(repr)?;
                } else {
                    self.forward_down(repr)?;
                }
            }
            _ => self.reflect_up(repr)?,
        }
        Ok(())
    }

    fn ack(&mut self, mut repr: PacketRepr) -> Result<(), link::LinkError> {
        repr.command = Command::Ack;
        self.send_up(repr)
    }

    fn ack_with_options(&mut self, mut repr: PacketRepr, options: u32) -> Result<(), link::LinkError> {
        repr.command = Command::Ack;
        repr.options = options;
        self.send_up(repr)
    }

    fn reflect_up(&mut self, repr: PacketRepr) -> Result<(), link::LinkError> {
        self.send_up(repr)
    }

    fn forward_down(&mut self, repr: PacketRepr) -> Result<(), link::LinkError> {
        self.send_down(repr)?;
        self.up.reset();
        Ok(())
    }

    fn send_up(&mut self, mut repr: PacketRepr) -> Result<(), link::LinkError> {
        repr.refresh_checksum();
        self.up.send(&repr.emit())?;
        self.up.reset();
        Ok(())
    }

    fn send_down(&mut self, mut repr: PacketRepr) -> Result<(), link::LinkError> {
        repr.refresh_checksum();
        self.down.send(&repr.emit())?;
        self.down.reset();
        Ok(())
    }
}

/// Copy the source staging buffer out into an owned, NUL-bounded byte
/// array so the VM's evaluation borrow doesn't overlap the `MemorySurface`
/// borrow `Io` also needs for `@D`/`!D`/`.`.
fn owned_src(src: &[u8]) -> heapless::Vec<u8, { crate::config::SRC_BUF_BLOCKS * crate::config::DATA_SIZE }> {
    let mut out = heapless::Vec::new();
    // capacity matches src.len() exactly; never fails.
    let _ = out.extend_from_slice(src);
    out
}

/// Object-safe view of a [`Node`], for driving a whole chain of them
/// (each with its own concrete `U`/`D` link types) from a single
/// `Vec<Box<dyn Pollable>>` in a test harness or a host-side simulator.
pub trait Pollable {
    fn service_upstream(&mut self) -> Result<bool, link::LinkError>;
    fn service_downstream(&mut self) -> Result<bool, link::LinkError>;
}

impl<'s, U: Link, D: Link> Pollable for Node<'s, U, D> {
    fn service_upstream(&mut self) -> Result<bool, link::LinkError> {
        Node::service_upstream(self)
    }

    fn service_downstream(&mut self) -> Result<bool, link::LinkError> {
        Node::service_downstream(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::FixedChipInfo;
    use crate::link::QueueLink;
    use crate::sensors::FixedSensorSource;
    use byteorder::{ByteOrder, LittleEndian};

    fn chip(words: [u32; 3]) -> FixedChipInfo {
        FixedChipInfo {
            words,
            sram_base: 0x2000_0000,
            sram_end: 0x2000_1000,
        }
    }

    fn cal() -> Calibration {
        Calibration {
            vdd_cal: 1,
            temp30_cal: 2,
            temp110_cal: 3,
        }
    }

    fn sensors() -> FixedSensorSource {
        FixedSensorSource { temp: 10, vdd: 20 }
    }

    fn ping_all() -> PacketRepr {
        let mut repr = PacketRepr {
            command: Command::Ping,
            pic: 0,
            options: u32::from(Selector::All),
            uid: [0u8; UID_SIZE],
            data: [0u8; crate::config::DATA_SIZE],
            checksum: 0,
        };
        repr.refresh_checksum();
        repr
    }

    #[test]
    fn ping_all_acks_and_forwards() {
        let chip_a = chip([1, 2, 3]);
        let sensors_a = sensors();
        let (mut controller_link, node_up_side) = QueueLink::pair();
        let (node_down_side, mut unattached_down) = QueueLink::pair();

        let mut node = Node::new(node_up_side, node_down_side, &chip_a, cal(), &sensors_a);

        controller_link.send(&ping_all().emit()).unwrap();
        assert!(node.service_upstream().unwrap());

        let ack_bytes = controller_link.recv().unwrap();
        let ack = PacketRepr::parse(&ack_bytes);
        assert_eq!(ack.command, Command::Ack);
        assert_eq!(ack.uid, *node.uid());
        assert_eq!(ack.options, node.sram_size);

        let forwarded_bytes = unattached_down.recv().unwrap();
        let forwarded = PacketRepr::parse(&forwarded_bytes);
        assert_eq!(forwarded.command, Command::Ping);
        assert_eq!(forwarded.options, u32::from(Selector::All));
    }

    #[test]
    fn checksum_failure_yields_err_without_forwarding() {
        let chip_a = chip([1, 2, 3]);
        let sensors_a = sensors();
        let (mut controller_link, node_up_side) = QueueLink::pair();
        let (node_down_side, mut unattached_down) = QueueLink::pair();

        let mut node = Node::new(node_up_side, node_down_side, &chip_a, cal(), &sensors_a);

        let mut bytes = ping_all().emit();
        bytes[0] ^= 0xff;
        controller_link.send(&bytes).unwrap();
        assert!(node.service_upstream().unwrap());

        let reply_bytes = controller_link.recv().unwrap();
        let reply = PacketRepr::parse(&reply_bytes);
        assert_eq!(reply.command, Command::Err);
        assert_eq!(reply.options, 1);
        assert_eq!(unattached_down.recv(), Err(link::LinkError));
    }

    #[test]
    fn write_then_read_round_trips_through_dispatch() {
        let chip_a = chip([9, 9, 9]);
        let sensors_a = sensors();
        let (mut controller_link, node_up_side) = QueueLink::pair();
        let (node_down_side, _unattached_down) = QueueLink::pair();

        let mut node = Node::new(node_up_side, node_down_side, &chip_a, cal(), &sensors_a);
        let uid = *node.uid();

        let mut data = [0u8; crate::config::DATA_SIZE];
        data[0] = 0xAB;
        let mut write = PacketRepr {
            command: Command::Write,
            pic: 0,
            options: 7,
            uid,
            data,
            checksum: 0,
        };
        write.refresh_checksum();
        controller_link.send(&write.emit()).unwrap();
        assert!(node.service_upstream().unwrap());
        let ack = PacketRepr::parse(&controller_link.recv().unwrap());
        assert_eq!(ack.command, Command::Ack);

        let mut read = PacketRepr {
            command: Command::Read,
            pic: 0,
            options: 7,
            uid,
            data: [0u8; crate::config::DATA_SIZE],
            checksum: 0,
        };
        read.refresh_checksum();
        controller_link.send(&read.emit()).unwrap();
        assert!(node.service_upstream().unwrap());
        let ack = PacketRepr::parse(&controller_link.recv().unwrap());
        assert_eq!(ack.command, Command::Ack);
        assert_eq!(ack.data[0], 0xAB);
    }

    #[test]
    fn exec_then_retr_via_dispatch() {
        let chip_a = chip([4, 5, 6]);
        let sensors_a = sensors();
        let (mut controller_link, node_up_side) = QueueLink::pair();
        let (node_down_side, _unattached_down) = QueueLink::pair();

        let mut node = Node::new(node_up_side, node_down_side, &chip_a, cal(), &sensors_a);
        let uid = *node.uid();

        let mut src = [0u8; crate::config::DATA_SIZE];
        let program = b": inc 1 + ; 41 inc . ";
        src[..program.len()].copy_from_slice(program);
        let mut load = PacketRepr {
            command: Command::Load,
            pic: 0,
            options: 0,
            uid,
            data: src,
            checksum: 0,
        };
        load.refresh_checksum();
        controller_link.send(&load.emit()).unwrap();
        node.service_upstream().unwrap();
        controller_link.recv().unwrap();

        let mut exec = PacketRepr {
            command: Command::Exec,
            pic: 0,
            options: 1,
            uid,
            data: [0u8; crate::config::DATA_SIZE],
            checksum: 0,
        };
        exec.refresh_checksum();
        controller_link.send(&exec.emit()).unwrap();
        node.service_upstream().unwrap();
        let exec_ack = PacketRepr::parse(&controller_link.recv().unwrap());
        assert_eq!(exec_ack.command, Command::Ack);
        assert_eq!(exec_ack.options, 0);

        let mut retr = PacketRepr {
            command: Command::Retr,
            pic: 0,
            options: 0,
            uid,
            data: [0u8; crate::config::DATA_SIZE],
            checksum: 0,
        };
        retr.refresh_checksum();
        controller_link.send(&retr.emit()).unwrap();
        node.service_upstream().unwrap();
        let retr_ack = PacketRepr::parse(&controller_link.recv().unwrap());
        assert_eq!(LittleEndian::read_i32(&retr_ack.data[0..4]), 42);
    }

    /// A program that divides by zero reports the abort's reason code in
    /// the EXEC ACK's `options`, and the node is still usable afterward:
    /// a second, unrelated EXEC on the same node completes normally.
    #[test]
    fn exec_division_by_zero_reports_reason_and_node_recovers() {
        use crate::vm::Abort;

        let chip_a = chip([7, 8, 9]);
        let sensors_a = sensors();
        let (mut controller_link, node_up_side) = QueueLink::pair();
        let (node_down_side, _unattached_down) = QueueLink::pair();

        let mut node = Node::new(node_up_side, node_down_side, &chip_a, cal(), &sensors_a);
        let uid = *node.uid();

        fn load(
            node: &mut Node<QueueLink, QueueLink>,
            link: &mut QueueLink,
            uid: [u8; UID_SIZE],
            program: &[u8],
        ) {
            let mut src = [0u8; crate::config::DATA_SIZE];
            src[..program.len()].copy_from_slice(program);
            let mut pkt = PacketRepr {
                command: Command::Load,
                pic: 0,
                options: 0,
                uid,
                data: src,
                checksum: 0,
            };
            pkt.refresh_checksum();
            link.send(&pkt.emit()).unwrap();
            node.service_upstream().unwrap();
            link.recv().unwrap();
        }

        load(&mut node, &mut controller_link, uid, b"1 0 / . ");

        let mut exec = PacketRepr {
            command: Command::Exec,
            pic: 0,
            options: 1,
            uid,
            data: [0u8; crate::config::DATA_SIZE],
            checksum: 0,
        };
        exec.refresh_checksum();
        controller_link.send(&exec.emit()).unwrap();
        node.service_upstream().unwrap();
        let exec_ack = PacketRepr::parse(&controller_link.recv().unwrap());
        assert_eq!(exec_ack.command, Command::Ack);
        assert_eq!(exec_ack.options, Abort::DivisionByZero.code());

        load(&mut node, &mut controller_link, uid, b"2 3 + . ");

        let mut exec2 = PacketRepr {
            command: Command::Exec,
            pic: 0,
            options: 1,
            uid,
            data: [0u8; crate::config::DATA_SIZE],
            checksum: 0,
        };
        exec2.refresh_checksum();
        controller_link.send(&exec2.emit()).unwrap();
        node.service_upstream().unwrap();
        let exec_ack2 = PacketRepr::parse(&controller_link.recv().unwrap());
        assert_eq!(exec_ack2.command, Command::Ack);
        assert_eq!(exec_ack2.options, 0);

        let mut retr = PacketRepr {
            command: Command::Retr,
            pic: 0,
            options: 0,
            uid,
            data: [0u8; crate::config::DATA_SIZE],
            checksum: 0,
        };
        retr.refresh_checksum();
        controller_link.send(&retr.emit()).unwrap();
        node.service_upstream().unwrap();
        let retr_ack = PacketRepr::parse(&controller_link.recv().unwrap());
        assert_eq!(LittleEndian::read_i32(&retr_ack.data[0..4]), 5);
    }
}
