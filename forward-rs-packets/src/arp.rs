use crate::*;
use std::convert::{TryFrom, TryInto};
use std::net::Ipv4Addr;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

pub enum ArpHardwareType {
    Ethernet = 1,
}

const HARDWARE_TYPE_RANGE: (usize, usize) = (0, 2);
const PROTOCOL_TYPE_RANGE: (usize, usize) = (2, 4);
const HARDWARE_ADDR_LEN_RANGE: (usize, usize) = (4, 5);
const PROTOCOL_ADDR_LEN_RANGE: (usize, usize) = (5, 6);
const OPCODE_RANGE: (usize, usize) = (6, 8);

///
/// EthernetFrame wrapper with getters/setters for the packet structure described in RFC 826
/// https://tools.ietf.org/html/rfc826
///
#[derive(Clone, Debug)]
pub struct ArpFrame {
    frame: EthernetFrame,
}

impl ArpFrame {
    ///
    /// Constructs a new, empty packet with a payload big enough for all ARP fields,
    /// given some hardware/protocol address lengths.
    ///
    pub fn new(hardware_addr_len: u8, protocol_addr_len: u8) -> Self {
        let payload_len = 8 + (2 * hardware_addr_len as usize) + (2 * protocol_addr_len as usize);
        let payload: Vec<u8> = vec![0; payload_len];

        let mut frame = EthernetFrame::empty();
        frame.set_payload(payload.as_slice());
        frame.set_ether_type(ARP_ETHER_TYPE);

        let mut arp_frame = ArpFrame { frame };
        arp_frame.set_hardware_addr_len(hardware_addr_len);
        arp_frame.set_protocol_addr_len(protocol_addr_len);
        arp_frame
    }

    ///
    /// Builds a broadcast "who has `target_ip`" request for Ethernet/IPv4.
    /// The target hardware address is left zeroed, it is what we are asking for.
    ///
    pub fn request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        let mut arp_frame = ArpFrame::new(6, 4);
        arp_frame.set_hardware_type(ArpHardwareType::Ethernet as u16);
        arp_frame.set_protocol_type(IPV4_ETHER_TYPE);
        arp_frame.set_opcode(ArpOp::Request as u16);
        arp_frame.set_sender_hardware_addr(sender_mac);
        arp_frame.set_sender_protocol_addr(sender_ip);
        arp_frame.set_target_hardware_addr(MacAddr::ZERO);
        arp_frame.set_target_protocol_addr(target_ip);

        arp_frame.frame.set_dest_mac(MacAddr::BROADCAST);
        arp_frame.frame.set_src_mac(sender_mac);
        arp_frame
    }

    ///
    /// Turns a request into its reply in place, per RFC 826: the requester's
    /// addresses move to the target fields, the local ones become the sender, and
    /// the Ethernet header is pointed back at the requester.
    ///
    pub fn into_reply(mut self, local_mac: MacAddr, local_ip: Ipv4Addr) -> Result<Self, &'static str> {
        let requester_mac = self.sender_mac_addr()?;
        let requester_ip = self.sender_ipv4_addr()?;

        self.set_target_hardware_addr(requester_mac);
        self.set_target_protocol_addr(requester_ip);
        self.set_sender_hardware_addr(local_mac);
        self.set_sender_protocol_addr(local_ip);
        self.set_opcode(ArpOp::Reply as u16);

        self.frame.set_dest_mac(requester_mac);
        self.frame.set_src_mac(local_mac);
        Ok(self)
    }

    pub fn hardware_type(&self) -> u16 {
        let (start, end) = HARDWARE_TYPE_RANGE;
        u16::from_be_bytes(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn protocol_type(&self) -> u16 {
        let (start, end) = PROTOCOL_TYPE_RANGE;
        u16::from_be_bytes(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn hardware_addr_len(&self) -> u8 {
        let (start, _) = HARDWARE_ADDR_LEN_RANGE;
        self.arp_data(start, start + 1)[0]
    }

    pub fn protocol_addr_len(&self) -> u8 {
        let (start, _) = PROTOCOL_ADDR_LEN_RANGE;
        self.arp_data(start, start + 1)[0]
    }

    pub fn opcode(&self) -> u16 {
        let (start, end) = OPCODE_RANGE;
        u16::from_be_bytes(self.arp_data(start, end).try_into().unwrap())
    }

    pub fn sender_hardware_addr(&self) -> &[u8] {
        let (start, end) = self.sender_hardware_addr_range();
        self.arp_data(start, end)
    }

    pub fn sender_protocol_addr(&self) -> &[u8] {
        let (start, end) = self.sender_protocol_addr_range();
        self.arp_data(start, end)
    }

    pub fn target_hardware_addr(&self) -> &[u8] {
        let (start, end) = self.target_hardware_addr_range();
        self.arp_data(start, end)
    }

    pub fn target_protocol_addr(&self) -> &[u8] {
        let (start, end) = self.target_protocol_addr_range();
        self.arp_data(start, end)
    }

    pub fn sender_mac_addr(&self) -> Result<MacAddr, &'static str> {
        self.check_ethernet_ipv4()?;
        MacAddr::try_from(self.sender_hardware_addr())
    }

    pub fn sender_ipv4_addr(&self) -> Result<Ipv4Addr, &'static str> {
        self.check_ethernet_ipv4()?;
        Ok(ipv4_from_slice(self.sender_protocol_addr()))
    }

    pub fn target_mac_addr(&self) -> Result<MacAddr, &'static str> {
        self.check_ethernet_ipv4()?;
        MacAddr::try_from(self.target_hardware_addr())
    }

    pub fn target_ipv4_addr(&self) -> Result<Ipv4Addr, &'static str> {
        self.check_ethernet_ipv4()?;
        Ok(ipv4_from_slice(self.target_protocol_addr()))
    }

    pub fn set_hardware_type(&mut self, htype: u16) {
        let (start, end) = HARDWARE_TYPE_RANGE;
        self.set_arp_data(&htype.to_be_bytes(), start, end);
    }

    pub fn set_protocol_type(&mut self, ptype: u16) {
        let (start, end) = PROTOCOL_TYPE_RANGE;
        self.set_arp_data(&ptype.to_be_bytes(), start, end);
    }

    pub fn set_hardware_addr_len(&mut self, len: u8) {
        let (start, end) = HARDWARE_ADDR_LEN_RANGE;
        self.set_arp_data(&[len], start, end);
    }

    pub fn set_protocol_addr_len(&mut self, len: u8) {
        let (start, end) = PROTOCOL_ADDR_LEN_RANGE;
        self.set_arp_data(&[len], start, end);
    }

    pub fn set_opcode(&mut self, code: u16) {
        let (start, end) = OPCODE_RANGE;
        self.set_arp_data(&code.to_be_bytes(), start, end);
    }

    pub fn set_sender_hardware_addr(&mut self, addr: MacAddr) {
        let (start, end) = self.sender_hardware_addr_range();
        self.set_arp_data(&addr.bytes, start, end);
    }

    pub fn set_sender_protocol_addr(&mut self, addr: Ipv4Addr) {
        let (start, end) = self.sender_protocol_addr_range();
        self.set_arp_data(&addr.octets(), start, end);
    }

    pub fn set_target_hardware_addr(&mut self, addr: MacAddr) {
        let (start, end) = self.target_hardware_addr_range();
        self.set_arp_data(&addr.bytes, start, end);
    }

    pub fn set_target_protocol_addr(&mut self, addr: Ipv4Addr) {
        let (start, end) = self.target_protocol_addr_range();
        self.set_arp_data(&addr.octets(), start, end);
    }

    pub fn frame_ref(&self) -> &EthernetFrame {
        &self.frame
    }

    // Move ownership of the frame back to the caller
    pub fn frame(self) -> EthernetFrame {
        self.frame
    }

    fn check_ethernet_ipv4(&self) -> Result<(), &'static str> {
        if self.hardware_addr_len() != 6 || self.protocol_addr_len() != 4 {
            return Err("ARP frame does not carry Ethernet/IPv4 addresses");
        }
        Ok(())
    }

    // Returns the bytes in the ethernet frame between start and end, exclusive
    fn arp_data(&self, start: usize, end: usize) -> &[u8] {
        let frame_offset_start = self.frame.payload_offset + start;
        let frame_offset_end = self.frame.payload_offset + end;
        &self.frame.data[frame_offset_start..frame_offset_end]
    }

    fn set_arp_data(&mut self, bytes: &[u8], start: usize, end: usize) {
        let frame_offset_start = self.frame.payload_offset + start;
        let frame_offset_end = self.frame.payload_offset + end;
        self.frame.data[frame_offset_start..frame_offset_end].copy_from_slice(bytes);
    }

    fn sender_hardware_addr_range(&self) -> (usize, usize) {
        let hlen = self.hardware_addr_len() as usize;

        let start = 8;
        let end = start + hlen;
        (start, end)
    }

    fn sender_protocol_addr_range(&self) -> (usize, usize) {
        let hlen = self.hardware_addr_len() as usize;
        let plen = self.protocol_addr_len() as usize;

        let start = 8 + hlen;
        let end = start + plen;
        (start, end)
    }

    fn target_hardware_addr_range(&self) -> (usize, usize) {
        let hlen = self.hardware_addr_len() as usize;
        let plen = self.protocol_addr_len() as usize;

        let start = 8 + hlen + plen;
        let end = start + hlen;
        (start, end)
    }

    fn target_protocol_addr_range(&self) -> (usize, usize) {
        let hlen = self.hardware_addr_len() as usize;
        let plen = self.protocol_addr_len() as usize;

        let start = 8 + (2 * hlen) + plen;
        let end = start + plen;
        (start, end)
    }
}

fn ipv4_from_slice(bytes: &[u8]) -> Ipv4Addr {
    Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3])
}

impl TryFrom<EthernetFrame> for ArpFrame {
    type Error = &'static str;

    ///
    /// Decorates the given EthernetFrame with ArpFrame getters/setters.
    /// Validates
    /// - The frame has an ARP ether type
    /// - The frame has a payload big enough for the hardware/protocol address lengths.
    ///   Anything past that is Ethernet padding and is ignored.
    ///
    fn try_from(frame: EthernetFrame) -> Result<Self, Self::Error> {
        if frame.ether_type() != ARP_ETHER_TYPE {
            return Err("Frame does not have ARP ether type.");
        };

        let arp_frame = ArpFrame { frame };
        let payload_len = arp_frame.frame.payload().len();

        if payload_len < 8 {
            return Err("Frame payload is too small");
        }

        let hlen = arp_frame.hardware_addr_len() as usize;
        let plen = arp_frame.protocol_addr_len() as usize;

        if payload_len < (8 + (2 * hlen) + (2 * plen)) {
            return Err("Frame payload doesn't match address length fields");
        }

        Ok(arp_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_payload() -> Vec<u8> {
        vec![
            0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01, 1, 2, 3, 4, 5, 6, 10, 0, 0, 1, 0, 0, 0,
            0, 0, 0, 10, 0, 0, 2,
        ]
    }

    #[test]
    fn generate_empty_arp_frame() {
        let arp_frame = ArpFrame::new(6, 4);
        assert_eq!(arp_frame.hardware_type(), 0);
        assert_eq!(arp_frame.protocol_type(), 0);
        assert_eq!(arp_frame.hardware_addr_len(), 6);
        assert_eq!(arp_frame.protocol_addr_len(), 4);
        assert_eq!(arp_frame.opcode(), 0);
        assert_eq!(arp_frame.sender_hardware_addr(), [0, 0, 0, 0, 0, 0]);
        assert_eq!(arp_frame.sender_protocol_addr(), [0, 0, 0, 0]);
        assert_eq!(arp_frame.target_hardware_addr(), [0, 0, 0, 0, 0, 0]);
        assert_eq!(arp_frame.target_protocol_addr(), [0, 0, 0, 0]);
        assert_eq!(arp_frame.frame().data.len(), 14 + ARP_PACKET_LEN);
    }

    #[test]
    fn arp_frame_from_ethernet() -> Result<(), String> {
        let mut ethernet_frame = EthernetFrame::empty();
        ethernet_frame.set_payload(&request_payload());
        ethernet_frame.set_ether_type(ARP_ETHER_TYPE);

        let arp_frame = ArpFrame::try_from(ethernet_frame)?;
        assert_eq!(arp_frame.hardware_type(), 1);
        assert_eq!(arp_frame.protocol_type(), IPV4_ETHER_TYPE);
        assert_eq!(arp_frame.opcode(), ArpOp::Request as u16);
        assert_eq!(arp_frame.sender_mac_addr()?, MacAddr::new([1, 2, 3, 4, 5, 6]));
        assert_eq!(arp_frame.sender_ipv4_addr()?, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(arp_frame.target_mac_addr()?, MacAddr::ZERO);
        assert_eq!(arp_frame.target_ipv4_addr()?, Ipv4Addr::new(10, 0, 0, 2));
        Ok(())
    }

    #[test]
    fn padded_frame_is_accepted() {
        let mut payload = request_payload();
        payload.extend_from_slice(&[0; 18]);
        let mut ethernet_frame = EthernetFrame::empty();
        ethernet_frame.set_payload(&payload);
        ethernet_frame.set_ether_type(ARP_ETHER_TYPE);

        assert!(ArpFrame::try_from(ethernet_frame).is_ok());
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let payload = &request_payload()[..20];
        let mut ethernet_frame = EthernetFrame::empty();
        ethernet_frame.set_payload(payload);
        ethernet_frame.set_ether_type(ARP_ETHER_TYPE);

        assert!(ArpFrame::try_from(ethernet_frame).is_err());
    }

    #[test]
    fn wrong_ether_type_is_rejected() {
        let mut ethernet_frame = EthernetFrame::empty();
        ethernet_frame.set_payload(&request_payload());
        ethernet_frame.set_ether_type(IPV4_ETHER_TYPE);

        assert!(ArpFrame::try_from(ethernet_frame).is_err());
    }

    #[test]
    fn build_request() {
        let mac = MacAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        let request = ArpFrame::request(mac, Ipv4Addr::new(10, 0, 1, 1), Ipv4Addr::new(10, 0, 1, 9));

        assert_eq!(request.opcode(), ArpOp::Request as u16);
        assert_eq!(request.hardware_type(), 1);
        assert_eq!(request.protocol_type(), IPV4_ETHER_TYPE);
        assert_eq!(request.sender_mac_addr(), Ok(mac));
        assert_eq!(request.target_ipv4_addr(), Ok(Ipv4Addr::new(10, 0, 1, 9)));

        let frame = request.frame();
        assert!(frame.dest_mac().is_broadcast());
        assert_eq!(frame.src_mac(), mac);
        assert_eq!(frame.ether_type(), ARP_ETHER_TYPE);
    }

    #[test]
    fn request_into_reply() {
        let requester = MacAddr::new([1, 2, 3, 4, 5, 6]);
        let local = MacAddr::new([0xaa; 6]);
        let request = ArpFrame::request(requester, Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2));

        let reply = request.into_reply(local, Ipv4Addr::new(10, 0, 0, 2)).unwrap();
        assert_eq!(reply.opcode(), ArpOp::Reply as u16);
        assert_eq!(reply.sender_mac_addr(), Ok(local));
        assert_eq!(reply.sender_ipv4_addr(), Ok(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(reply.target_mac_addr(), Ok(requester));
        assert_eq!(reply.target_ipv4_addr(), Ok(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(reply.frame_ref().dest_mac(), requester);
        assert_eq!(reply.frame_ref().src_mac(), local);
    }

    #[test]
    fn typed_accessors_need_ethernet_ipv4() {
        let arp_frame = ArpFrame::new(8, 4);
        assert!(arp_frame.sender_mac_addr().is_err());
        assert!(arp_frame.target_ipv4_addr().is_err());
    }
}
