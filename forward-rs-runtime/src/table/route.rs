use crate::error::TableError;
use std::fmt;
use std::net::Ipv4Addr;

/// A static route: packets for `destination/mask` leave through `interface` towards `gateway`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub destination: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub interface: String,
}

impl RouteEntry {
    pub fn new(destination: Ipv4Addr, mask: Ipv4Addr, gateway: Ipv4Addr, interface: &str) -> Self {
        RouteEntry {
            destination,
            mask,
            gateway,
            interface: String::from(interface),
        }
    }

    pub fn prefix_len(&self) -> u32 {
        u32::from(self.mask).count_ones()
    }

    pub fn matches(&self, addr: Ipv4Addr) -> bool {
        let mask = u32::from(self.mask);
        u32::from(self.destination) & mask == u32::from(addr) & mask
    }

    /// Where the packet goes next. A gateway of 0.0.0.0 marks a directly connected network, in
    /// which case that is the destination itself.
    pub fn next_hop(&self, destination: Ipv4Addr) -> Ipv4Addr {
        if self.gateway.is_unspecified() {
            destination
        } else {
            self.gateway
        }
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}/{} via {} dev {}",
            self.destination,
            self.prefix_len(),
            self.gateway,
            self.interface
        )
    }
}

/// Static routing table with longest-prefix-match lookup.
///
/// Routes are kept in the order they were configured. When two routes are equally specific the
/// one configured first wins, since a candidate is only replaced by a strictly longer mask.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteEntry>) -> Result<Self, TableError> {
        for route in &routes {
            let mask = u32::from(route.mask);
            // A contiguous mask is all ones followed by all zeros.
            if mask.leading_ones() + mask.trailing_zeros() != 32 {
                return Err(TableError::NonContiguousMask {
                    destination: route.destination,
                    mask: route.mask,
                });
            }
        }
        Ok(RouteTable { routes })
    }

    pub fn lookup(&self, destination: Ipv4Addr) -> Option<&RouteEntry> {
        let mut best: Option<&RouteEntry> = None;
        for route in self.routes.iter().filter(|r| r.matches(destination)) {
            match best {
                Some(current) if u32::from(route.mask) <= u32::from(current.mask) => {}
                _ => best = Some(route),
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
