use super::{Disposition, DropReason, Router};
use crate::icmp::IcmpErrorKind;
use crate::sink::FrameSink;
use crate::table::Interface;
use forward_rs_packets::*;
use smoltcp::wire::{Icmpv4Message, Icmpv4Packet};
use std::convert::TryFrom;
use tracing::{debug, warn};

impl<S: FrameSink> Router<S> {
    pub(super) fn handle_ipv4(&self, frame: EthernetFrame, received_on: &Interface) -> Disposition {
        let sender_mac = frame.src_mac();
        let packet = match Ipv4Packet::try_from(frame) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(interface = %received_on.name, "dropping IPv4 packet: {}", e);
                return Disposition::Dropped(DropReason::Malformed(e));
            }
        };

        if !packet.validate_checksum() {
            warn!(
                interface = %received_on.name,
                src = %packet.src_addr(),
                checksum = packet.checksum(),
                "dropping IPv4 packet with bad header checksum"
            );
            return Disposition::Dropped(DropReason::BadChecksum);
        }

        match self.interfaces.by_ip(packet.dest_addr()) {
            Some(local) => self.deliver_local(packet, sender_mac, local, received_on),
            None => self.forward(packet, sender_mac, received_on),
        }
    }

    /// A packet addressed to one of our interfaces. Echo requests are answered, other ICMP is
    /// ignored, and anything else is refused with port unreachable.
    fn deliver_local(
        &self,
        mut packet: Ipv4Packet,
        sender_mac: MacAddr,
        local: &Interface,
        received_on: &Interface,
    ) -> Disposition {
        if packet.protocol() != IpProtocol::ICMP {
            return self.reply_error(
                IcmpErrorKind::PortUnreachable,
                &packet,
                received_on,
                local.ip,
                sender_mac,
            );
        }

        let is_echo = match Icmpv4Packet::new_checked(packet.payload_mut()) {
            Ok(mut message)
                if message.msg_type() == Icmpv4Message::EchoRequest && message.verify_checksum() =>
            {
                message.set_msg_type(Icmpv4Message::EchoReply);
                message.set_msg_code(0);
                message.fill_checksum();
                true
            }
            _ => false,
        };
        if !is_echo {
            debug!(src = %packet.src_addr(), "ignoring ICMP addressed to us");
            return Disposition::Dropped(DropReason::UnhandledIcmp);
        }

        let requester = packet.src_addr();
        packet.set_src_addr(local.ip);
        packet.set_dest_addr(requester);
        packet.set_ttl(self.config.icmp_ttl);
        packet.set_checksum();

        let mut frame = match EthernetFrame::try_from(packet) {
            Ok(frame) => frame,
            Err(e) => return Disposition::Dropped(DropReason::Malformed(e)),
        };
        frame.reflect(received_on.mac);

        debug!(%requester, interface = %received_on.name, "answering echo request");
        self.transmit(&frame.data, &received_on.name);
        Disposition::EchoReplied
    }

    /// Routes a transit packet. Resolved next hops get the frame immediately, unresolved ones
    /// get it parked in the ARP cache for the sweeper to chase.
    fn forward(&self, mut packet: Ipv4Packet, sender_mac: MacAddr, received_on: &Interface) -> Disposition {
        let destination = packet.dest_addr();

        if packet.ttl() <= 1 {
            return self.reply_error(
                IcmpErrorKind::TimeExceeded,
                &packet,
                received_on,
                received_on.ip,
                sender_mac,
            );
        }

        let route = match self.routes.lookup(destination) {
            Some(route) => route,
            None => {
                debug!(%destination, "no route");
                return self.reply_error(
                    IcmpErrorKind::NetUnreachable,
                    &packet,
                    received_on,
                    received_on.ip,
                    sender_mac,
                );
            }
        };
        // Route interfaces are checked when the router is built
        let out = match self.interfaces.by_name(&route.interface) {
            Some(out) => out,
            None => return Disposition::Dropped(DropReason::UnknownInterface),
        };

        packet.decrement_ttl();
        let next_hop = route.next_hop(destination);

        let mut frame = match EthernetFrame::try_from(packet) {
            Ok(frame) => frame,
            Err(e) => return Disposition::Dropped(DropReason::Malformed(e)),
        };

        match self.cache.resolve_or_queue(next_hop, &frame.data, &out.name) {
            Ok(entry) => {
                frame.set_dest_mac(entry.mac);
                frame.set_src_mac(out.mac);
                debug!(%destination, %next_hop, interface = %out.name, "forwarding");
                self.transmit(&frame.data, &out.name);
                Disposition::Forwarded {
                    interface: out.name.clone(),
                }
            }
            Err(_) => {
                debug!(%destination, %next_hop, interface = %out.name, "next hop unresolved, packet parked");
                Disposition::Queued { next_hop }
            }
        }
    }
}
