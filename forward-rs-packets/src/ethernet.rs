use crate::*;
use std::borrow::Cow;
use std::convert::{TryFrom, TryInto};

/// An Ethernet II frame that owns its bytes, starting at the destination MAC.
#[derive(Clone, Debug)]
pub struct EthernetFrame {
    pub data: PacketData,
    pub payload_offset: usize,
}

impl EthernetFrame {
    pub fn from_buffer(frame: PacketData) -> Result<EthernetFrame, &'static str> {
        // Ethernet II frames must be at least the header, which is 14bytes
        // 0                    6                    12                      14
        // |---6 byte Dest_MAC--|---6 byte Src_MAC---|--2 Byte EtherType---|
        if frame.len() < ETHERNET_HEADER_LEN {
            return Err("Frame is less than the minimum of 14 bytes");
        }

        Ok(EthernetFrame {
            data: frame,
            payload_offset: ETHERNET_HEADER_LEN,
        })
    }

    /// Returns an empty EthernetFrame where all values all populated to zero. This function allocates a
    /// new array to hold the header.
    pub fn empty() -> EthernetFrame {
        EthernetFrame {
            data: vec![0; ETHERNET_HEADER_LEN],
            payload_offset: ETHERNET_HEADER_LEN,
        }
    }

    pub fn dest_mac(&self) -> MacAddr {
        MacAddr::new(self.data[0..6].try_into().unwrap())
    }

    pub fn src_mac(&self) -> MacAddr {
        MacAddr::new(self.data[6..12].try_into().unwrap())
    }

    pub fn set_dest_mac(&mut self, mac: MacAddr) {
        self.data[..6].copy_from_slice(&mac.bytes);
    }

    pub fn set_src_mac(&mut self, mac: MacAddr) {
        self.data[6..12].copy_from_slice(&mac.bytes);
    }

    pub fn ether_type(&self) -> u16 {
        u16::from_be_bytes(self.data[12..=13].try_into().unwrap())
    }

    pub fn set_ether_type(&mut self, ether_type: u16) {
        self.data[12..=13].copy_from_slice(&ether_type.to_be_bytes());
    }

    // This gives you a cow of a slice of the payload.
    pub fn payload(&self) -> Cow<[u8]> {
        Cow::from(&self.data[self.payload_offset..])
    }

    pub fn set_payload(&mut self, payload: &[u8]) {
        self.data.truncate(self.payload_offset);
        self.data.reserve_exact(payload.len());
        self.data.extend(payload);
    }

    pub fn encap_ipv4(ipv4: Ipv4Packet) -> EthernetFrame {
        let mut frame = EthernetFrame::empty();
        frame.set_payload(&ipv4.data[ipv4.layer3_offset..]);
        frame.set_ether_type(IPV4_ETHER_TYPE);
        frame
    }

    /// Points the frame back at whoever sent it: the old source becomes the
    /// destination and `local` becomes the source.
    pub fn reflect(&mut self, local: MacAddr) {
        let sender = self.src_mac();
        self.set_dest_mac(sender);
        self.set_src_mac(local);
    }
}

impl PartialEq for EthernetFrame {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for EthernetFrame {}

impl TryFrom<Ipv4Packet> for EthernetFrame {
    type Error = &'static str;

    fn try_from(packet: Ipv4Packet) -> Result<Self, Self::Error> {
        if packet.layer3_offset != ETHERNET_HEADER_LEN {
            return Err("IPv4 Packet does not contain an Ethernet Frame");
        }
        EthernetFrame::from_buffer(packet.data)
    }
}
