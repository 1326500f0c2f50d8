use super::{Disposition, DropReason, Router};
use crate::arp::PendingRequest;
use crate::sink::FrameSink;
use crate::table::Interface;
use forward_rs_packets::*;
use std::convert::TryFrom;
use tracing::{debug, warn};

impl<S: FrameSink> Router<S> {
    ///
    /// From the ARP RFC: https://tools.ietf.org/html/rfc826
    ///
    /// ?Do I have the hardware type in ar$hrd?
    /// Yes:
    ///     ?Do I speak the protocol in ar$pro?
    ///     Yes:
    ///         ?Am I the target protocol address?
    ///         Yes:
    ///             ?Is the opcode ares_op$REQUEST?
    ///             Yes:
    ///                 Swap hardware and protocol fields, putting the local hardware and protocol
    ///                     addresses in the sender fields.
    ///                 Set the ar$op field to ares_op$REPLY
    ///                 Send the packet to the (new) target hardware address on the same hardware
    ///                     on which the request was received.
    ///             ?Is the opcode ares_op$REPLY?
    ///             Yes:
    ///                 Record the sender, then send everything that was waiting on it.
    ///
    pub(super) fn handle_arp(&self, frame: EthernetFrame, received_on: &Interface) -> Disposition {
        let arp_frame = match ArpFrame::try_from(frame) {
            Ok(arp_frame) => arp_frame,
            Err(e) => {
                warn!(interface = %received_on.name, "dropping ARP frame: {}", e);
                return Disposition::Dropped(DropReason::Malformed(e));
            }
        };

        if arp_frame.hardware_type() != ArpHardwareType::Ethernet as u16
            || arp_frame.protocol_type() != IPV4_ETHER_TYPE
        {
            debug!(
                hardware_type = arp_frame.hardware_type(),
                protocol_type = arp_frame.protocol_type(),
                "ignoring ARP for another link or protocol"
            );
            return Disposition::Dropped(DropReason::UnsupportedArp);
        }

        let (sender_mac, sender_ip, target_ip) = match (
            arp_frame.sender_mac_addr(),
            arp_frame.sender_ipv4_addr(),
            arp_frame.target_ipv4_addr(),
        ) {
            (Ok(mac), Ok(sender), Ok(target)) => (mac, sender, target),
            _ => return Disposition::Dropped(DropReason::UnsupportedArp),
        };

        let target = match self.interfaces.by_ip(target_ip) {
            Some(target) => target,
            None => {
                debug!(%target_ip, "ARP not addressed to us");
                return Disposition::Dropped(DropReason::NotForUs);
            }
        };

        match arp_frame.opcode() {
            op if op == ArpOp::Request as u16 => {
                let reply = match arp_frame.into_reply(target.mac, target.ip) {
                    Ok(reply) => reply,
                    Err(e) => return Disposition::Dropped(DropReason::Malformed(e)),
                };
                let mut frame = reply.frame();
                frame.set_src_mac(received_on.mac);

                debug!(%sender_ip, %sender_mac, interface = %received_on.name, "answering ARP request");
                self.transmit(&frame.data, &received_on.name);
                Disposition::ArpReplied
            }
            op if op == ArpOp::Reply as u16 => {
                let flushed = match self.cache.insert(sender_mac, sender_ip) {
                    Some(request) => self.flush(request, sender_mac),
                    None => 0,
                };
                Disposition::ArpLearned { flushed }
            }
            op => {
                debug!(op, "ignoring ARP opcode");
                Disposition::Dropped(DropReason::UnsupportedArp)
            }
        }
    }

    /// Sends every packet that was waiting on `request`, now addressed to `mac`. Consumes the
    /// request; its buffers go with it.
    fn flush(&self, request: PendingRequest, mac: MacAddr) -> usize {
        let target_ip = request.target_ip;
        let mut sent = 0;

        for packet in request.packets {
            let out = match self.interfaces.by_name(&packet.interface) {
                Some(out) => out,
                None => {
                    warn!(interface = %packet.interface, "parked packet has no outgoing interface");
                    continue;
                }
            };
            let mut frame = match EthernetFrame::from_buffer(packet.frame) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("dropping parked packet: {}", e);
                    continue;
                }
            };
            frame.set_dest_mac(mac);
            frame.set_src_mac(out.mac);
            if self.transmit(&frame.data, &out.name) {
                sent += 1;
            }
        }

        debug!(ip = %target_ip, sent, "flushed parked packets");
        sent
    }
}
