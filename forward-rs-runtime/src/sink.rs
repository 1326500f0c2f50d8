use crate::error::SendError;
use crossbeam::channel::{self, Receiver, Sender};
use std::sync::Arc;

/// The send primitive the router transmits through. Implementations must be callable from the
/// dispatch path and the sweeper at the same time.
pub trait FrameSink: Send + Sync {
    fn send(&self, frame: &[u8], interface: &str) -> Result<(), SendError>;
}

impl<T: FrameSink + ?Sized> FrameSink for Arc<T> {
    fn send(&self, frame: &[u8], interface: &str) -> Result<(), SendError> {
        (**self).send(frame, interface)
    }
}

/// A frame on its way out, tagged with the interface it leaves from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundFrame {
    pub interface: String,
    pub data: Vec<u8>,
}

/// Pushes every transmitted frame into a crossbeam channel. Whoever holds the receiving end plays
/// the part of the wire, a socket writer in production or a collector in tests.
#[derive(Clone)]
pub struct ChannelSink {
    sender: Sender<OutboundFrame>,
}

impl ChannelSink {
    pub fn new(sender: Sender<OutboundFrame>) -> Self {
        ChannelSink { sender }
    }

    pub fn unbounded() -> (Self, Receiver<OutboundFrame>) {
        let (sender, receiver) = channel::unbounded();
        (ChannelSink::new(sender), receiver)
    }
}

impl FrameSink for ChannelSink {
    fn send(&self, frame: &[u8], interface: &str) -> Result<(), SendError> {
        self.sender
            .send(OutboundFrame {
                interface: interface.to_string(),
                data: frame.to_vec(),
            })
            .map_err(|_| SendError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_arrive_in_order() {
        let (sink, receiver) = ChannelSink::unbounded();
        sink.send(&[1, 2, 3], "eth0").unwrap();
        sink.send(&[4], "eth1").unwrap();

        let frames: Vec<OutboundFrame> = receiver.try_iter().collect();
        assert_eq!(
            frames,
            vec![
                OutboundFrame {
                    interface: "eth0".to_string(),
                    data: vec![1, 2, 3],
                },
                OutboundFrame {
                    interface: "eth1".to_string(),
                    data: vec![4],
                },
            ]
        );
    }

    #[test]
    fn dropped_receiver_is_an_error() {
        let (sink, receiver) = ChannelSink::unbounded();
        drop(receiver);
        match sink.send(&[1], "eth0") {
            Err(SendError::Disconnected) => {}
            other => panic!("expected Disconnected, got {:?}", other),
        }
    }

    #[test]
    fn io_failure_converts() {
        let error: SendError = std::io::Error::new(std::io::ErrorKind::Other, "eth3 is down").into();
        match &error {
            SendError::Io(_) => {}
            other => panic!("expected Io, got {:?}", other),
        }
        assert_eq!(error.to_string(), "transport I/O failed: eth3 is down");
    }

    #[test]
    fn shared_sink() {
        let (sink, receiver) = ChannelSink::unbounded();
        let shared: Arc<dyn FrameSink> = Arc::new(sink);
        shared.send(&[7], "eth2").unwrap();
        assert_eq!(receiver.try_recv().unwrap().interface, "eth2");
    }
}
