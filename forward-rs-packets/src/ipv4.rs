use crate::*;
use std::borrow::Cow;
use std::convert::{TryFrom, TryInto};
use std::net::Ipv4Addr;

#[derive(Clone, Debug)]
pub struct Ipv4Packet {
    pub data: PacketData,
    pub layer3_offset: usize,
    pub payload_offset: usize,
}

impl Ipv4Packet {
    fn new(data: PacketData, layer3_offset: usize) -> Result<Ipv4Packet, &'static str> {
        // Header of Ethernet Frame: 14 bytes
        // Header of IPv4 Frame: 20 bytes
        if data.len() < layer3_offset + IPV4_MIN_HEADER_LEN {
            return Err("Data is too short to be an IPv4 Packet");
        }

        // Check version number
        let version: u8 = (data[layer3_offset] & 0xF0) >> 4;
        if version != 4 {
            return Err("Packet has incorrect version, is not Ipv4Packet");
        }

        // This is the header length in 32bit words
        let ihl = (data[layer3_offset] & 0x0F) as usize;
        if ihl < 5 {
            return Err("Packet has an IHL smaller than the minimum header");
        }
        let header_len = ihl * 4;
        if data.len() < layer3_offset + header_len {
            return Err("Packet header is longer than the data");
        }

        // TotalLen is the 3rd and 4th byte of the IP Header. Anything past it is
        // link layer padding, which we tolerate.
        let total_len = u16::from_be_bytes(
            data[layer3_offset + 2..=layer3_offset + 3]
                .try_into()
                .unwrap(),
        ) as usize;
        if total_len < header_len || data.len() < total_len + layer3_offset {
            return Err("Packet has invalid total length field");
        }

        Ok(Ipv4Packet {
            data,
            layer3_offset,
            payload_offset: layer3_offset + header_len,
        })
    }

    /// Returns an empty 20 byte header with version and IHL set and no payload.
    pub fn empty() -> Ipv4Packet {
        let mut data = vec![0; IPV4_MIN_HEADER_LEN];
        data[0] = 0x45;
        data[2..4].copy_from_slice(&(IPV4_MIN_HEADER_LEN as u16).to_be_bytes());
        Ipv4Packet {
            data,
            layer3_offset: 0,
            payload_offset: IPV4_MIN_HEADER_LEN,
        }
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        let data: [u8; 4] = self.data[self.layer3_offset + 12..self.layer3_offset + 16]
            .try_into()
            .unwrap();
        Ipv4Addr::from(data)
    }

    pub fn set_src_addr(&mut self, addr: Ipv4Addr) {
        self.data[self.layer3_offset + 12..self.layer3_offset + 16].copy_from_slice(&addr.octets());
    }

    pub fn dest_addr(&self) -> Ipv4Addr {
        let data: [u8; 4] = self.data[self.layer3_offset + 16..self.layer3_offset + 20]
            .try_into()
            .unwrap();
        Ipv4Addr::from(data)
    }

    pub fn set_dest_addr(&mut self, addr: Ipv4Addr) {
        self.data[self.layer3_offset + 16..self.layer3_offset + 20].copy_from_slice(&addr.octets());
    }

    pub fn ihl(&self) -> u8 {
        self.data[self.layer3_offset] & 0x0F
    }

    pub fn header_len(&self) -> usize {
        self.payload_offset - self.layer3_offset
    }

    /// The header bytes, options included.
    pub fn header(&self) -> &[u8] {
        &self.data[self.layer3_offset..self.payload_offset]
    }

    /// The packet from the first header byte to `total_len`, without link padding.
    pub fn packet_bytes(&self) -> &[u8] {
        &self.data[self.layer3_offset..self.end_offset()]
    }

    /// Everything between the header and the end of `total_len`, without link padding.
    pub fn payload(&self) -> Cow<[u8]> {
        Cow::from(&self.data[self.payload_offset..self.end_offset()])
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let end = self.end_offset();
        &mut self.data[self.payload_offset..end]
    }

    pub fn set_payload(&mut self, payload: &[u8]) {
        let payload_len = payload.len();

        self.data.truncate(self.payload_offset);

        let total_len = ((payload_len + self.header_len()) as u16).to_be_bytes();
        self.data[self.layer3_offset + 2..=self.layer3_offset + 3].copy_from_slice(&total_len);

        self.data.reserve_exact(payload_len);
        self.data.extend(payload);
    }

    pub fn protocol(&self) -> IpProtocol {
        IpProtocol::from(self.data[self.layer3_offset + 9])
    }

    pub fn set_protocol(&mut self, protocol: IpProtocol) {
        self.data[self.layer3_offset + 9] = protocol.into();
    }

    pub fn total_len(&self) -> u16 {
        u16::from_be_bytes(
            self.data[self.layer3_offset + 2..=self.layer3_offset + 3]
                .try_into()
                .unwrap(),
        )
    }

    pub fn tos(&self) -> u8 {
        self.data[self.layer3_offset + 1]
    }

    pub fn set_tos(&mut self, tos: u8) {
        self.data[self.layer3_offset + 1] = tos;
    }

    pub fn ttl(&self) -> u8 {
        self.data[self.layer3_offset + 8]
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.data[self.layer3_offset + 8] = ttl;
    }

    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes(
            self.data[self.layer3_offset + 10..=self.layer3_offset + 11]
                .try_into()
                .unwrap(),
        )
    }

    pub fn identification(&self) -> u16 {
        u16::from_be_bytes(
            self.data[self.layer3_offset + 4..=self.layer3_offset + 5]
                .try_into()
                .unwrap(),
        )
    }

    pub fn set_identification(&mut self, id: u16) {
        self.data[self.layer3_offset + 4..=self.layer3_offset + 5].copy_from_slice(&id.to_be_bytes());
    }

    pub fn fragment_offset(&self) -> u16 {
        u16::from_be_bytes([
            self.data[self.layer3_offset + 6] & 0x1F,
            self.data[self.layer3_offset + 7],
        ])
    }

    /// Returns tuple of (Don't Fragment, More Fragments)
    pub fn flags(&self) -> (bool, bool) {
        let df = (self.data[self.layer3_offset + 6] & 0x40) != 0;
        let mf = (self.data[self.layer3_offset + 6] & 0x20) != 0;
        (df, mf)
    }

    /// A header is intact when the checksum over all of it, checksum field
    /// included, comes out to zero.
    pub fn validate_checksum(&self) -> bool {
        checksum(self.header()) == 0
    }

    /// Calculates what the checksum should be set to given the current header
    pub fn calculate_checksum(&self) -> u16 {
        let mut header = self.header().to_vec();
        header[10] = 0;
        header[11] = 0;
        checksum(&header)
    }

    /// Sets checksum field to valid value
    pub fn set_checksum(&mut self) {
        let new_checksum = self.calculate_checksum();
        self.data[self.layer3_offset + 10..=self.layer3_offset + 11]
            .copy_from_slice(&new_checksum.to_be_bytes());
    }

    /// Lowers the TTL by one and refreshes the header checksum. Saturates at zero.
    pub fn decrement_ttl(&mut self) {
        let ttl = self.ttl().saturating_sub(1);
        self.set_ttl(ttl);
        self.set_checksum();
    }

    fn end_offset(&self) -> usize {
        self.layer3_offset + self.total_len() as usize
    }
}

/// Ipv4Packets are considered the same if they have the same data from the layer 3
/// header and onward.
impl PartialEq for Ipv4Packet {
    fn eq(&self, other: &Self) -> bool {
        self.data[self.layer3_offset..] == other.data[other.layer3_offset..]
    }
}

impl Eq for Ipv4Packet {}

impl TryFrom<EthernetFrame> for Ipv4Packet {
    type Error = &'static str;

    fn try_from(frame: EthernetFrame) -> Result<Self, Self::Error> {
        if frame.ether_type() != IPV4_ETHER_TYPE {
            return Err("Frame does not have IPv4 ether type.");
        }
        Ipv4Packet::new(frame.data, frame.payload_offset)
    }
}
