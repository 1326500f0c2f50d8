use crate::error::TableError;
use forward_rs_packets::MacAddr;
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// One of the router's own ports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
}

impl Interface {
    pub fn new(name: &str, mac: MacAddr, ip: Ipv4Addr) -> Self {
        Interface {
            name: String::from(name),
            mac,
            ip,
        }
    }
}

/// The router's interfaces, searchable by name, address or hardware address. A router has a
/// handful of ports, so lookups are plain scans.
#[derive(Clone, Debug, Default)]
pub struct InterfaceTable {
    interfaces: Vec<Interface>,
}

impl InterfaceTable {
    pub fn new(interfaces: Vec<Interface>) -> Result<Self, TableError> {
        let mut names = HashSet::new();
        for interface in &interfaces {
            if !names.insert(interface.name.as_str()) {
                return Err(TableError::DuplicateInterface(interface.name.clone()));
            }
        }
        Ok(InterfaceTable { interfaces })
    }

    pub fn by_name(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn by_ip(&self, ip: Ipv4Addr) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.ip == ip)
    }

    pub fn by_mac(&self, mac: MacAddr) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.mac == mac)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}
