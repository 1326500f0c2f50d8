use std::net::Ipv4Addr;
use thiserror::Error;

/// Failure reported by a `FrameSink` when a frame could not be handed to the wire.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("transport receiver has been dropped")]
    Disconnected,
    #[error("transport I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejection while building the interface or routing table.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("interface {0} is configured more than once")]
    DuplicateInterface(String),
    #[error("route {destination} has non-contiguous mask {mask}")]
    NonContiguousMask {
        destination: Ipv4Addr,
        mask: Ipv4Addr,
    },
    #[error("route {destination} points at unknown interface {interface}")]
    UnknownInterface {
        destination: Ipv4Addr,
        interface: String,
    },
}
