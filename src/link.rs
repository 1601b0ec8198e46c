//! Physical packet transport: a node sits between an upstream link (toward
//! the host/previous node) and a downstream link (toward the next node in
//! the chain). Both directions carry whole, fixed-size wire frames.
//!
//! This mirrors a `phy::Device`-style split of "how bytes actually
//! move" from "what the bytes mean" (`wire`): the protocol engine in
//! [`crate::chain`] only ever calls `recv`/`send` here, never touches a
//! UART or DMA ring buffer directly. Bring-up of the actual UART/DMA
//! peripherals is out of scope; this trait is the seam a real board
//! support crate would fill in.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::PACKET_SIZE;

/// Failure to move a frame across a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkError;

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "link::LinkError: transport failure")
    }
}

impl std::error::Error for LinkError {}

pub type Result<T> = core::result::Result<T, LinkError>;

/// One direction of packet transport. A node holds two: `upstream` and
/// `downstream`.
pub trait Link {
    /// Block until a full packet arrives, or report a transport failure.
    fn recv(&mut self) -> Result<[u8; PACKET_SIZE]>;

    /// Send a full packet, blocking until it has been handed off.
    fn send(&mut self, frame: &[u8; PACKET_SIZE]) -> Result<()>;

    /// Non-blocking poll: `None` means nothing has arrived yet. Used for
    /// the down-link pass-through, which re-arms its receive after every
    /// packet rather than blocking the main loop. Default forwards to
    /// `recv`, treating "nothing arrived" and "transport failure" the
    /// same way; a real interrupt-driven link would distinguish them.
    fn try_recv(&mut self) -> Option<[u8; PACKET_SIZE]> {
        self.recv().ok()
    }

    /// Re-arm reception on this link. A no-op for links that are always
    /// ready to receive (every in-memory test link); real UART/DMA links
    /// would restart their receive descriptor here.
    fn reset(&mut self) {}
}

type Queue = Rc<RefCell<heapless::Deque<[u8; PACKET_SIZE], 8>>>;

/// An in-memory link backed by a pair of fixed-capacity queues, for
/// wiring nodes together in tests without real hardware — a loopback
/// `phy::Loopback`-style device, generalized to two endpoints instead of
/// one. Built only via [`QueueLink::pair`], which is the only way to get
/// a connected pair; there is no bare `new`.
pub struct QueueLink {
    inbox: Queue,
    outbox: Queue,
}

impl QueueLink {
    /// Build two endpoints wired to each other: sending on one enqueues
    /// into the other's `recv`. The shared queues live behind `Rc`, so
    /// either endpoint can be freely moved (e.g. into a `chain::Node`)
    /// after pairing without invalidating the connection.
    pub fn pair() -> (QueueLink, QueueLink) {
        let a_to_b: Queue = Rc::new(RefCell::new(heapless::Deque::new()));
        let b_to_a: Queue = Rc::new(RefCell::new(heapless::Deque::new()));
        (
            QueueLink {
                inbox: b_to_a.clone(),
                outbox: a_to_b.clone(),
            },
            QueueLink {
                inbox: a_to_b,
                outbox: b_to_a,
            },
        )
    }
}

impl Link for QueueLink {
    fn recv(&mut self) -> Result<[u8; PACKET_SIZE]> {
        self.inbox.borrow_mut().pop_front().ok_or(LinkError)
    }

    fn send(&mut self, frame: &[u8; PACKET_SIZE]) -> Result<()> {
        self.outbox
            .borrow_mut()
            .push_back(*frame)
            .map_err(|_| LinkError)
    }
}
