use super::Router;
use crate::arp::{ArpRetry, BufferedPacket};
use crate::icmp::IcmpErrorKind;
use crate::sink::FrameSink;
use forward_rs_packets::*;
use std::convert::TryFrom;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{trace, warn};

/// Frames produced by one sweeper tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub expired: usize,
    pub arp_requests: usize,
    pub host_unreachable: usize,
}

impl<S: FrameSink> Router<S> {
    /// Runs one sweeper tick at `now`: expires old ARP entries, then sends the ARP requests and
    /// host unreachable errors the cache decided on. The cache lock is released before anything
    /// is sent.
    pub fn sweep(&self, now: Instant) -> SweepStats {
        let outcome = self.cache.sweep(now);
        let mut stats = SweepStats {
            expired: outcome.expired,
            ..SweepStats::default()
        };

        for retry in &outcome.retries {
            if self.send_arp_request(retry) {
                stats.arp_requests += 1;
            }
        }

        for request in outcome.abandoned {
            for packet in request.packets {
                if self.host_unreachable(packet) {
                    stats.host_unreachable += 1;
                }
            }
        }

        trace!(
            expired = stats.expired,
            arp_requests = stats.arp_requests,
            host_unreachable = stats.host_unreachable,
            "sweep"
        );
        stats
    }

    fn send_arp_request(&self, retry: &ArpRetry) -> bool {
        let out = match self.interfaces.by_name(&retry.interface) {
            Some(out) => out,
            None => {
                warn!(interface = %retry.interface, "no interface to send ARP request from");
                return false;
            }
        };
        let request = ArpFrame::request(out.mac, out.ip, retry.target_ip);
        self.transmit(&request.frame_ref().data, &out.name)
    }

    /// Tells the sender of a parked packet that its next hop never answered. The error leaves
    /// through the interface the packet arrived on, found by the destination MAC the packet
    /// still carries.
    fn host_unreachable(&self, packet: BufferedPacket) -> bool {
        let BufferedPacket { frame, interface } = packet;
        let frame = match EthernetFrame::from_buffer(frame) {
            Ok(frame) => frame,
            Err(_) => return false,
        };
        let sender_mac = frame.src_mac();
        let from = match self
            .interfaces
            .by_mac(frame.dest_mac())
            .or_else(|| self.interfaces.by_name(&interface))
        {
            Some(from) => from,
            None => return false,
        };
        let offending = match Ipv4Packet::try_from(frame) {
            Ok(offending) => offending,
            Err(_) => return false,
        };

        match self.icmp.error_frame(
            IcmpErrorKind::HostUnreachable,
            &offending,
            from.mac,
            from.ip,
            sender_mac,
        ) {
            Some(error) => self.transmit(&error.data, &from.name),
            None => false,
        }
    }
}

impl<S: FrameSink + 'static> Router<S> {
    /// Starts the periodic sweeper on the current tokio runtime. It ticks every
    /// `sweep_interval` for as long as the task lives; abort the handle to stop it.
    pub fn spawn_sweeper(router: Arc<Router<S>>) -> JoinHandle<()> {
        let period = router.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // Sweep at the scheduled deadline, not at wakeup
                let deadline = ticker.tick().await;
                router.sweep(deadline.into_std());
            }
        })
    }
}
