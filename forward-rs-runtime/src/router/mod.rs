use crate::arp::ArpCache;
use crate::config::RouterConfig;
use crate::error::TableError;
use crate::icmp::{IcmpErrorGenerator, IcmpErrorKind};
use crate::sink::FrameSink;
use crate::table::{Interface, InterfaceTable, RouteTable};
use forward_rs_packets::*;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, warn};

mod arp;
mod ipv4;
mod sweep;
pub use self::sweep::SweepStats;

/// What `handle_frame` did with a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Answered an ARP request for one of our addresses.
    ArpReplied,
    /// Learned a mapping from an ARP reply, and sent the packets that were waiting on it.
    ArpLearned { flushed: usize },
    /// Answered a ping addressed to one of our interfaces.
    EchoReplied,
    /// Sent on toward its next hop.
    Forwarded { interface: String },
    /// Parked until the next hop's MAC is known.
    Queued { next_hop: Ipv4Addr },
    /// Rejected with an ICMP error back to the sender.
    IcmpError(IcmpErrorKind),
    Dropped(DropReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Received on an interface the router does not have.
    UnknownInterface,
    Malformed(&'static str),
    UnsupportedEtherType(u16),
    /// ARP for another hardware or protocol type, or an opcode we do not act on.
    UnsupportedArp,
    /// ARP whose target address is none of ours.
    NotForUs,
    BadChecksum,
    /// ICMP addressed to us that is not a valid echo request.
    UnhandledIcmp,
    /// An ICMP error was due, but sending one is not allowed for this packet.
    IcmpSuppressed,
}

/// The forwarding plane. Tables are fixed at construction; the only mutable state is the ARP
/// cache, which is shared with the sweeper. `handle_frame` takes `&self` and may be called from
/// any number of receive threads at once.
pub struct Router<S: FrameSink> {
    interfaces: Arc<InterfaceTable>,
    routes: Arc<RouteTable>,
    cache: Arc<ArpCache>,
    sink: S,
    config: RouterConfig,
    icmp: IcmpErrorGenerator,
}

impl<S: FrameSink> Router<S> {
    /// Builds a router over the given tables. Every route must leave through a configured
    /// interface.
    pub fn new(
        interfaces: InterfaceTable,
        routes: RouteTable,
        sink: S,
        config: RouterConfig,
    ) -> Result<Self, TableError> {
        if let Some(route) = routes
            .iter()
            .find(|route| interfaces.by_name(&route.interface).is_none())
        {
            return Err(TableError::UnknownInterface {
                destination: route.destination,
                interface: route.interface.clone(),
            });
        }

        Ok(Router {
            interfaces: Arc::new(interfaces),
            routes: Arc::new(routes),
            cache: Arc::new(ArpCache::new(&config)),
            sink,
            icmp: IcmpErrorGenerator::new(config.icmp_ttl),
            config,
        })
    }

    pub fn interfaces(&self) -> &Arc<InterfaceTable> {
        &self.interfaces
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    pub fn cache(&self) -> &Arc<ArpCache> {
        &self.cache
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Handles one frame received on `interface`. The bytes are copied before anything is kept,
    /// and every failure is logged and reported in the returned `Disposition`.
    pub fn handle_frame(&self, bytes: &[u8], interface: &str) -> Disposition {
        let received_on = match self.interfaces.by_name(interface) {
            Some(received_on) => received_on,
            None => {
                warn!(interface, "frame received on unknown interface");
                return Disposition::Dropped(DropReason::UnknownInterface);
            }
        };

        let frame = match EthernetFrame::from_buffer(bytes.to_vec()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(interface, len = bytes.len(), "dropping frame: {}", e);
                return Disposition::Dropped(DropReason::Malformed(e));
            }
        };

        let ether_type = frame.ether_type();
        debug!(interface, len = bytes.len(), ether_type, "frame received");

        let disposition = match ether_type {
            ARP_ETHER_TYPE => self.handle_arp(frame, received_on),
            IPV4_ETHER_TYPE => self.handle_ipv4(frame, received_on),
            other => Disposition::Dropped(DropReason::UnsupportedEtherType(other)),
        };
        debug!(interface, ?disposition, "frame handled");
        disposition
    }

    /// Hands a frame to the sink. A failure is logged and otherwise ignored.
    fn transmit(&self, frame: &[u8], interface: &str) -> bool {
        match self.sink.send(frame, interface) {
            Ok(()) => true,
            Err(e) => {
                warn!(interface, len = frame.len(), "send failed: {}", e);
                false
            }
        }
    }

    /// Sends `kind` about `offending` out of `out`, from `src_ip`, to `dest_mac`.
    fn reply_error(
        &self,
        kind: IcmpErrorKind,
        offending: &Ipv4Packet,
        out: &Interface,
        src_ip: Ipv4Addr,
        dest_mac: MacAddr,
    ) -> Disposition {
        match self
            .icmp
            .error_frame(kind, offending, out.mac, src_ip, dest_mac)
        {
            Some(frame) => {
                debug!(?kind, to = %offending.src_addr(), interface = %out.name, "sending ICMP error");
                self.transmit(&frame.data, &out.name);
                Disposition::IcmpError(kind)
            }
            None => {
                debug!(?kind, src = %offending.src_addr(), "ICMP error suppressed");
                Disposition::Dropped(DropReason::IcmpSuppressed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ChannelSink;
    use crate::table::RouteEntry;

    fn interfaces() -> InterfaceTable {
        InterfaceTable::new(vec![Interface::new(
            "eth0",
            MacAddr::new([2, 0, 0, 0, 0, 1]),
            Ipv4Addr::new(10, 0, 0, 1),
        )])
        .unwrap()
    }

    #[test]
    fn route_to_unknown_interface_is_rejected() {
        let routes = RouteTable::new(vec![RouteEntry::new(
            Ipv4Addr::new(0, 0, 0, 0),
            Ipv4Addr::new(0, 0, 0, 0),
            Ipv4Addr::new(10, 0, 0, 254),
            "eth9",
        )])
        .unwrap();
        let (sink, _receiver) = ChannelSink::unbounded();

        match Router::new(interfaces(), routes, sink, RouterConfig::default()) {
            Err(TableError::UnknownInterface { interface, .. }) => assert_eq!(interface, "eth9"),
            other => panic!("expected UnknownInterface, got {:?}", other.err()),
        }
    }

    #[test]
    fn unknown_interface_and_runt_frames_are_dropped() {
        let (sink, receiver) = ChannelSink::unbounded();
        let router = Router::new(
            interfaces(),
            RouteTable::new(vec![]).unwrap(),
            sink,
            RouterConfig::default(),
        )
        .unwrap();

        assert_eq!(
            router.handle_frame(&[0; 60], "eth7"),
            Disposition::Dropped(DropReason::UnknownInterface)
        );
        match router.handle_frame(&[0; 10], "eth0") {
            Disposition::Dropped(DropReason::Malformed(_)) => {}
            other => panic!("expected Malformed, got {:?}", other),
        }
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn construction_wires_tables_and_config() {
        let (sink, receiver) = ChannelSink::unbounded();
        let config = RouterConfig::default().arp_cache_capacity(8).icmp_ttl(32);
        let router = Router::new(interfaces(), RouteTable::new(vec![]).unwrap(), sink, config).unwrap();

        assert_eq!(router.interfaces().len(), 1);
        assert!(router.routes().is_empty());
        assert_eq!(router.config().icmp_ttl, 32);
        assert_eq!(router.cache().capacity(), 8);

        router.sink().send(&[1, 2], "eth0").unwrap();
        assert_eq!(receiver.try_recv().unwrap().data, vec![1, 2]);
    }

    #[test]
    fn unknown_ether_type_is_dropped() {
        let (sink, _receiver) = ChannelSink::unbounded();
        let router = Router::new(
            interfaces(),
            RouteTable::new(vec![]).unwrap(),
            sink,
            RouterConfig::default(),
        )
        .unwrap();

        let mut frame = vec![0; 60];
        frame[12] = 0x86;
        frame[13] = 0xdd;
        assert_eq!(
            router.handle_frame(&frame, "eth0"),
            Disposition::Dropped(DropReason::UnsupportedEtherType(0x86dd))
        );
    }
}
