use forward_rs_packets::{EthernetFrame, IpProtocol, Ipv4Packet, MacAddr, IPV4_ETHER_TYPE, IPV4_MIN_HEADER_LEN};
use smoltcp::phy::ChecksumCapabilities;
use smoltcp::wire::{
    Icmpv4DstUnreachable, Icmpv4Message, Icmpv4Packet, Icmpv4TimeExceeded, IpProtocol as WireProtocol,
    Ipv4Address, Ipv4Packet as WirePacket, Ipv4Repr,
};
use std::cmp;
use std::net::Ipv4Addr;

/// The size of an ICMP "header", which precedes the data field
const ICMP_HDR_LEN: usize = 8;

/// Errors carry the offending IPv4 header plus the first 8 bytes of its payload.
pub const ICMP_ERROR_DATA_LEN: usize = IPV4_MIN_HEADER_LEN + 8;

/// The ICMP errors the router originates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IcmpErrorKind {
    /// No route to the destination network.
    NetUnreachable,
    /// ARP for the next hop never got an answer.
    HostUnreachable,
    /// Non-ICMP traffic addressed to one of our interfaces.
    PortUnreachable,
    /// TTL ran out in transit.
    TimeExceeded,
}

impl IcmpErrorKind {
    pub fn msg_type(self) -> Icmpv4Message {
        match self {
            IcmpErrorKind::TimeExceeded => Icmpv4Message::TimeExceeded,
            _ => Icmpv4Message::DstUnreachable,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            IcmpErrorKind::NetUnreachable => Icmpv4DstUnreachable::NetUnreachable.into(),
            IcmpErrorKind::HostUnreachable => Icmpv4DstUnreachable::HostUnreachable.into(),
            IcmpErrorKind::PortUnreachable => Icmpv4DstUnreachable::PortUnreachable.into(),
            IcmpErrorKind::TimeExceeded => Icmpv4TimeExceeded::TtlExpired.into(),
        }
    }
}

/// Helper to generate ICMPv4 error frames
pub struct IcmpErrorGenerator {
    ttl: u8,
}

impl IcmpErrorGenerator {
    /// Create an ICMPv4 error generator
    ///
    /// # Arguments
    ///
    /// * `ttl` - The TTL written into every generated error
    pub fn new(ttl: u8) -> IcmpErrorGenerator {
        IcmpErrorGenerator { ttl }
    }

    /// Build a complete Ethernet frame carrying an ICMP error about `offending`. Return `None`
    /// if an ICMP error should not be generated, and the packet should be silently discarded
    /// instead.
    ///
    /// # Arguments
    ///
    /// * `kind` - Which error to report
    /// * `offending` - The packet that caused the error. Its header and the first 8 bytes of its
    /// payload are copied into the error
    /// * `src_mac` - Link layer source, the interface the error leaves from
    /// * `src_ip` - Source address of the error
    /// * `dest_mac` - Link layer destination, normally whoever handed us `offending`
    pub fn error_frame(
        &self,
        kind: IcmpErrorKind,
        offending: &Ipv4Packet,
        src_mac: MacAddr,
        src_ip: Ipv4Addr,
        dest_mac: MacAddr,
    ) -> Option<EthernetFrame> {
        if !self.should_generate_error(offending) {
            return None;
        }

        let error_pkt_repr = Ipv4Repr {
            src_addr: Ipv4Address::from_bytes(&src_ip.octets()),
            dst_addr: Ipv4Address::from_bytes(&offending.src_addr().octets()),
            protocol: WireProtocol::Icmp,
            payload_len: ICMP_HDR_LEN + ICMP_ERROR_DATA_LEN,
            hop_limit: self.ttl,
        };

        // Generate the layer 3 header
        let mut buffer = vec![0x00; error_pkt_repr.buffer_len() + error_pkt_repr.payload_len];
        let mut error_pkt = WirePacket::new_unchecked(&mut buffer[..]);
        error_pkt_repr.emit(&mut error_pkt, &ChecksumCapabilities::default());

        // Generate the ICMP message, zero padded when the offending packet is short
        let offending_bytes = offending.packet_bytes();
        let copied = cmp::min(offending_bytes.len(), ICMP_ERROR_DATA_LEN);
        let mut icmp_error = Icmpv4Packet::new_unchecked(error_pkt.payload_mut());
        icmp_error.set_msg_type(kind.msg_type());
        icmp_error.set_msg_code(kind.code());
        icmp_error.data_mut()[..copied].copy_from_slice(&offending_bytes[..copied]);
        icmp_error.fill_checksum();

        let mut frame = EthernetFrame::empty();
        frame.set_payload(&buffer);
        frame.set_ether_type(IPV4_ETHER_TYPE);
        frame.set_dest_mac(dest_mac);
        frame.set_src_mac(src_mac);
        Some(frame)
    }

    // Performs checks based on RFC 1812 4.3.2.7 (When Not to Send ICMP Errors)
    pub fn should_generate_error(&self, packet: &Ipv4Packet) -> bool {
        // Only the first fragment
        if packet.fragment_offset() != 0 {
            return false;
        }
        // Avoid infinite loops, no errors from errors
        if packet.protocol() == IpProtocol::ICMP {
            let payload = packet.payload();
            match Icmpv4Packet::new_checked(&payload[..]) {
                Ok(icmp_packet) if !is_error_type(icmp_packet.msg_type()) => {}
                _ => return false,
            }
        }
        // No broadcast, multicast, unspecified or loopback sources
        is_unicast(packet.src_addr())
    }
}

fn is_error_type(msg: Icmpv4Message) -> bool {
    let error_types = [
        Icmpv4Message::DstUnreachable,
        Icmpv4Message::Redirect,
        Icmpv4Message::TimeExceeded,
        Icmpv4Message::ParamProblem,
        // Source quench
        Icmpv4Message::Unknown(4),
    ];
    error_types.contains(&msg)
}

fn is_unicast(addr: Ipv4Addr) -> bool {
    !(addr.is_broadcast() || addr.is_multicast() || addr.is_unspecified() || addr.is_loopback())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    const LOCAL_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);

    fn local_mac() -> MacAddr {
        MacAddr::new([0x02, 0, 0, 0, 0, 0x01])
    }

    fn sender_mac() -> MacAddr {
        MacAddr::new([0x02, 0, 0, 0, 0, 0x99])
    }

    fn packet(src: Ipv4Addr, protocol: IpProtocol, payload: &[u8]) -> Ipv4Packet {
        let mut packet = Ipv4Packet::empty();
        packet.set_ttl(1);
        packet.set_protocol(protocol);
        packet.set_src_addr(src);
        packet.set_dest_addr(Ipv4Addr::new(10, 0, 0, 3));
        packet.set_payload(payload);
        packet.set_checksum();
        packet
    }

    fn icmp_message(msg_type: Icmpv4Message, code: u8, len: usize) -> Vec<u8> {
        let mut buffer = vec![0; len];
        let mut message = Icmpv4Packet::new_unchecked(&mut buffer[..]);
        message.set_msg_type(msg_type);
        message.set_msg_code(code);
        message.fill_checksum();
        buffer
    }

    #[test]
    fn time_exceeded_layout() {
        let generator = IcmpErrorGenerator::new(64);
        let offending = packet(
            Ipv4Addr::new(192, 168, 1, 100),
            IpProtocol::UDP,
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        );

        let frame = generator
            .error_frame(IcmpErrorKind::TimeExceeded, &offending, local_mac(), LOCAL_IP, sender_mac())
            .unwrap();
        assert_eq!(frame.dest_mac(), sender_mac());
        assert_eq!(frame.src_mac(), local_mac());
        assert_eq!(frame.ether_type(), IPV4_ETHER_TYPE);
        assert_eq!(frame.data.len(), 14 + 20 + 36);

        let reply = Ipv4Packet::try_from(frame).unwrap();
        assert!(reply.validate_checksum());
        assert_eq!(reply.ttl(), 64);
        assert_eq!(reply.protocol(), IpProtocol::ICMP);
        assert_eq!(reply.src_addr(), LOCAL_IP);
        assert_eq!(reply.dest_addr(), Ipv4Addr::new(192, 168, 1, 100));

        let payload = reply.payload();
        let message = Icmpv4Packet::new_checked(&payload[..]).unwrap();
        assert!(message.verify_checksum());
        assert_eq!(message.msg_type(), Icmpv4Message::TimeExceeded);
        assert_eq!(message.msg_code(), 0);
        assert_eq!(payload[4..8], [0; 4]);
        // Header plus the first 8 payload bytes, nothing more
        assert_eq!(message.data()[..20], offending.header()[..]);
        assert_eq!(message.data()[20..], [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn short_payload_is_zero_padded() {
        let generator = IcmpErrorGenerator::new(64);
        let offending = packet(Ipv4Addr::new(192, 168, 1, 100), IpProtocol::TCP, &[0xaa, 0xbb]);

        let frame = generator
            .error_frame(IcmpErrorKind::PortUnreachable, &offending, local_mac(), LOCAL_IP, sender_mac())
            .unwrap();
        let reply = Ipv4Packet::try_from(frame).unwrap();
        let payload = reply.payload();
        let message = Icmpv4Packet::new_checked(&payload[..]).unwrap();
        assert_eq!(message.msg_type(), Icmpv4Message::DstUnreachable);
        assert_eq!(message.msg_code(), 3);
        assert_eq!(message.data()[20..], [0xaa, 0xbb, 0, 0, 0, 0, 0, 0]);
        assert!(message.verify_checksum());
    }

    #[test]
    fn kinds_map_to_type_and_code() {
        assert_eq!(u8::from(IcmpErrorKind::NetUnreachable.msg_type()), 3);
        assert_eq!(IcmpErrorKind::NetUnreachable.code(), 0);
        assert_eq!(IcmpErrorKind::HostUnreachable.code(), 1);
        assert_eq!(IcmpErrorKind::PortUnreachable.code(), 3);
        assert_eq!(u8::from(IcmpErrorKind::TimeExceeded.msg_type()), 11);
        assert_eq!(IcmpErrorKind::TimeExceeded.code(), 0);
    }

    #[test]
    fn no_error_for_bad_sources() {
        let generator = IcmpErrorGenerator::new(64);
        for src in &[
            Ipv4Addr::BROADCAST,
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::LOCALHOST,
            Ipv4Addr::new(224, 0, 0, 5),
        ] {
            let offending = packet(*src, IpProtocol::UDP, &[0; 8]);
            assert!(!generator.should_generate_error(&offending), "{}", src);
        }
    }

    #[test]
    fn no_error_for_later_fragments() {
        let generator = IcmpErrorGenerator::new(64);
        let mut offending = packet(Ipv4Addr::new(192, 168, 1, 100), IpProtocol::UDP, &[0; 8]);
        offending.data[7] = 0x10;
        offending.set_checksum();
        assert!(!generator.should_generate_error(&offending));
    }

    #[test]
    fn no_error_from_icmp_error() {
        let generator = IcmpErrorGenerator::new(64);
        let unreachable = icmp_message(Icmpv4Message::DstUnreachable, 1, 36);
        let offending = packet(Ipv4Addr::new(192, 168, 1, 100), IpProtocol::ICMP, &unreachable);
        assert!(!generator.should_generate_error(&offending));

        let quench = icmp_message(Icmpv4Message::Unknown(4), 0, 36);
        let offending = packet(Ipv4Addr::new(192, 168, 1, 100), IpProtocol::ICMP, &quench);
        assert!(!generator.should_generate_error(&offending));

        let echo = icmp_message(Icmpv4Message::EchoRequest, 0, 8);
        let offending = packet(Ipv4Addr::new(192, 168, 1, 100), IpProtocol::ICMP, &echo);
        assert!(generator.should_generate_error(&offending));
    }

    #[test]
    fn no_error_from_truncated_icmp() {
        let generator = IcmpErrorGenerator::new(64);
        let offending = packet(Ipv4Addr::new(192, 168, 1, 100), IpProtocol::ICMP, &[8, 0, 0]);
        assert!(!generator.should_generate_error(&offending));
    }
}
