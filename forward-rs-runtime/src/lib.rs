/// Tunables for the forwarding engine: ARP cache size and timers, retry budget, and the TTL put
/// on packets the router originates. Everything has a sensible default, so most users only ever
/// call `RouterConfig::default()`.
pub mod config;

/// Error types for the pieces of the runtime that can fail: building the tables and handing a
/// frame to the transport. Nothing in the per-packet path returns these to the caller; they are
/// logged and absorbed.
pub mod error;

/// The boundary to whatever actually puts bytes on the wire. The router only ever needs to
/// `send(frame, interface)`, so transports (raw sockets, test channels, pcap replay) implement
/// `FrameSink` and are handed to the router at construction.
pub mod sink;

/// Static lookup structures loaded at startup: the router's own interfaces, and the routing table
/// answering longest-prefix-match queries. Both are immutable once built and shared freely.
pub mod table;

/// The ARP cache and its queue of requests still waiting for an answer. This is the only mutable
/// state shared between packet dispatch and the sweeper, and all of it sits behind one lock.
pub mod arp;

/// ICMP messages the router originates on its own behalf: the error replies for unreachable and
/// expired packets, along with the rules for when an error must not be sent.
pub mod icmp;

/// The forwarding engine. `Router::handle_frame` consumes one received frame and decides between
/// answering ARP, replying to pings, forwarding, parking the packet until its next hop resolves,
/// or sending back an ICMP error. The periodic sweeper that retries and expires ARP state lives
/// here too.
pub mod router;

/// Utility module
#[doc(hidden)]
pub mod utils;

pub use arp::ArpCache;
pub use config::RouterConfig;
pub use icmp::IcmpErrorKind;
pub use router::{Disposition, DropReason, Router, SweepStats};
pub use sink::{ChannelSink, FrameSink, OutboundFrame};
