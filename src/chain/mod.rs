//! The chain protocol engine: the dispatch loop each node runs to service
//! its upstream link, act on or forward packets addressed elsewhere, and
//! relay downstream replies back up unchanged.

mod node;

pub use node::{Node, Pollable};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::FixedChipInfo;
    use crate::link::{Link, QueueLink};
    use crate::sensors::{Calibration, FixedSensorSource};
    use crate::wire::{Command, PacketRepr, Selector};
    use crate::config::UID_SIZE;

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

    /// Drive every node's upstream and downstream queues until a full
    /// pass produces no activity anywhere in the chain.
    fn pump(nodes: &mut [Box<dyn Pollable + '_>]) {
        loop {
            let mut progress = false;
            for node in nodes.iter_mut() {
                progress |= node.service_upstream().unwrap_or(false);
            }
            for node in nodes.iter_mut().rev() {
                progress |= node.service_downstream().unwrap_or(false);
            }
            if !progress {
                break;
            }
        }
    }

    /// PING ALL sent into a 3-node chain should draw exactly one ACK per
    /// node back to the controller, each carrying that node's own uid and
    /// sram size, plus the PING ALL forwarded all the way to the end.
    #[test]
    fn ping_all_enumerates_every_node_in_chain() {
        let chip_a = chip([1, 0, 0]);
        let chip_b = chip([2, 0, 0]);
        let chip_c = chip([3, 0, 0]);
        let sensors = FixedSensorSource { temp: 0, vdd: 0 };

        let (mut controller, a_up) = QueueLink::pair();
        let (a_down, b_up) = QueueLink::pair();
        let (b_down, c_up) = QueueLink::pair();
        let (c_down, mut tail) = QueueLink::pair();

        let node_a = Node::new(a_up, a_down, &chip_a, cal(), &sensors);
        let node_b = Node::new(b_up, b_down, &chip_b, cal(), &sensors);
        let node_c = Node::new(c_up, c_down, &chip_c, cal(), &sensors);
        let uids = [*node_a.uid(), *node_b.uid(), *node_c.uid()];

        let mut nodes: Vec<Box<dyn Pollable + '_>> =
            vec![Box::new(node_a), Box::new(node_b), Box::new(node_c)];

        let mut ping = PacketRepr {
            command: Command::Ping,
            pic: 0,
            options: u32::from(Selector::All),
            uid: [0u8; UID_SIZE],
            data: [0u8; crate::config::DATA_SIZE],
            checksum: 0,
        };
        ping.refresh_checksum();
        controller.send(&ping.emit()).unwrap();

        pump(&mut nodes);

        let mut acks = Vec::new();
        while let Ok(frame) = controller.recv() {
            acks.push(PacketRepr::parse(&frame));
        }
        assert_eq!(acks.len(), 3);
        for (ack, uid) in acks.iter().zip(uids.iter()) {
            assert_eq!(ack.command, Command::Ack);
            assert_eq!(&ack.uid, uid);
        }

        // the original PING ALL also reaches the far end of the chain
        let tail_frame = tail.recv().unwrap();
        let tail_ping = PacketRepr::parse(&tail_frame);
        assert_eq!(tail_ping.command, Command::Ping);
        assert_eq!(tail_ping.options, u32::from(Selector::All));
    }

    /// A PING OWN addressed to the middle node of a 3-node chain is
    /// forwarded past the first node untouched and gets exactly one ACK
    /// back, from the node whose uid matches.
    #[test]
    fn targeted_ping_reaches_only_its_node() {
        let chip_a = chip([1, 0, 0]);
        let chip_b = chip([2, 0, 0]);
        let chip_c = chip([3, 0, 0]);
        let sensors = FixedSensorSource { temp: 0, vdd: 0 };

        let (mut controller, a_up) = QueueLink::pair();
        let (a_down, b_up) = QueueLink::pair();
        let (b_down, c_up) = QueueLink::pair();
        let (c_down, mut tail) = QueueLink::pair();

        let node_a = Node::new(a_up, a_down, &chip_a, cal(), &sensors);
        let node_b = Node::new(b_up, b_down, &chip_b, cal(), &sensors);
        let node_c = Node::new(c_up, c_down, &chip_c, cal(), &sensors);
        let target_uid = *node_b.uid();

        let mut nodes: Vec<Box<dyn Pollable + '_>> =
            vec![Box::new(node_a), Box::new(node_b), Box::new(node_c)];

        let mut ping = PacketRepr {
            command: Command::Ping,
            pic: 0,
            options: u32::from(Selector::Own),
            uid: target_uid,
            data: [0u8; crate::config::DATA_SIZE],
            checksum: 0,
        };
        ping.refresh_checksum();
        controller.send(&ping.emit()).unwrap();

        pump(&mut nodes);

        let ack = PacketRepr::parse(&controller.recv().unwrap());
        assert_eq!(ack.command, Command::Ack);
        assert_eq!(ack.uid, target_uid);
        assert_eq!(controller.recv(), Err(crate::link::LinkError));
        assert_eq!(tail.recv(), Err(crate::link::LinkError));
    }

    /// A packet that fails checksum verification at the first node gets
    /// an ERR back from that node alone; it is never forwarded, and no
    /// node further down the chain sees any traffic at all.
    #[test]
    fn corrupted_packet_stops_at_first_node() {
        let chip_a = chip([1, 0, 0]);
        let chip_b = chip([2, 0, 0]);
        let sensors = FixedSensorSource { temp: 0, vdd: 0 };

        let (mut controller, a_up) = QueueLink::pair();
        let (a_down, b_up) = QueueLink::pair();
        let (b_down, mut tail) = QueueLink::pair();

        let node_a = Node::new(a_up, a_down, &chip_a, cal(), &sensors);
        let node_b = Node::new(b_up, b_down, &chip_b, cal(), &sensors);

        let mut nodes: Vec<Box<dyn Pollable + '_>> = vec![Box::new(node_a), Box::new(node_b)];

        let mut ping = PacketRepr {
            command: Command::Ping,
            pic: 0,
            options: u32::from(Selector::All),
            uid: [0u8; UID_SIZE],
            data: [0u8; crate::config::DATA_SIZE],
            checksum: 0,
        };
        ping.refresh_checksum();
        let mut bytes = ping.emit();
        bytes[5] ^= 0xff; // corrupt a byte inside `options`
        controller.send(&bytes).unwrap();

        pump(&mut nodes);

        let reply = PacketRepr::parse(&controller.recv().unwrap());
        assert_eq!(reply.command, Command::Err);
        assert_eq!(reply.options, 1);
        // nothing else ever reaches the controller (no forwarded ping's
        // worth of further acks) or the tail of the chain.
        assert_eq!(controller.recv(), Err(crate::link::LinkError));
        assert_eq!(tail.recv(), Err(crate::link::LinkError));
    }
}
