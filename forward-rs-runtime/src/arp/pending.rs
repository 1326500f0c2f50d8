use std::net::Ipv4Addr;
use std::time::Instant;

/// A copy of a frame parked until its next hop resolves, with the interface it will leave from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferedPacket {
    pub frame: Vec<u8>,
    pub interface: String,
}

impl BufferedPacket {
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }
}

/// Identifies one pending request. The id is never reused, so a handle kept after its request
/// was resolved or abandoned cannot reach a newer request for the same address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestHandle {
    pub ip: Ipv4Addr,
    pub(crate) id: u64,
}

/// An unresolved address and the packets waiting on it.
#[derive(Clone, Debug)]
pub struct PendingRequest {
    pub(crate) id: u64,
    pub target_ip: Ipv4Addr,
    /// When the last ARP request went out. `None` until the sweeper sends the first one, which
    /// it does on its next tick.
    pub last_sent: Option<Instant>,
    pub attempts: u32,
    pub packets: Vec<BufferedPacket>,
}

impl PendingRequest {
    pub(crate) fn new(id: u64, target_ip: Ipv4Addr) -> Self {
        PendingRequest {
            id,
            target_ip,
            last_sent: None,
            attempts: 0,
            packets: vec![],
        }
    }

    pub fn handle(&self) -> RequestHandle {
        RequestHandle {
            ip: self.target_ip,
            id: self.id,
        }
    }

    /// The interface ARP requests for this address go out on: the one the first parked packet
    /// is headed for.
    pub fn interface(&self) -> Option<&str> {
        self.packets.first().map(|p| p.interface.as_str())
    }
}

/// An ARP request the sweeper decided to (re)transmit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArpRetry {
    pub target_ip: Ipv4Addr,
    pub interface: String,
}

/// Everything one sweep decided. The cache only updates its own state; turning this into frames
/// and sending them is left to the caller, after the lock is gone.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Entries that aged out on this tick.
    pub expired: usize,
    pub retries: Vec<ArpRetry>,
    /// Requests that ran out of attempts, already removed from the cache.
    pub abandoned: Vec<PendingRequest>,
}
