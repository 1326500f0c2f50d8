use std::time::Duration;

/// Runtime knobs for a `Router`. Setters consume and return `self` so a config reads as a chain:
///
/// ```
/// use forward_rs_runtime::RouterConfig;
/// use std::time::Duration;
///
/// let config = RouterConfig::new()
///     .arp_cache_capacity(16)
///     .sweep_interval(Duration::from_millis(100));
/// assert_eq!(config.arp_cache_capacity, 16);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouterConfig {
    /// Number of slots in the ARP entry table.
    pub arp_cache_capacity: usize,
    /// How long a learned IP to MAC mapping stays valid.
    pub arp_entry_ttl: Duration,
    /// Period of the background sweeper.
    pub sweep_interval: Duration,
    /// Minimum spacing between two ARP requests for the same address.
    pub arp_retry_interval: Duration,
    /// A pending request that has already sent more requests than this gives up.
    pub arp_retry_limit: u32,
    /// TTL written into packets the router originates (ICMP errors and echo replies).
    pub icmp_ttl: u8,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            arp_cache_capacity: 100,
            arp_entry_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(1),
            arp_retry_interval: Duration::from_secs(1),
            arp_retry_limit: 5,
            icmp_ttl: 64,
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        RouterConfig::default()
    }

    pub fn arp_cache_capacity(self, arp_cache_capacity: usize) -> Self {
        RouterConfig {
            arp_cache_capacity,
            ..self
        }
    }

    pub fn arp_entry_ttl(self, arp_entry_ttl: Duration) -> Self {
        RouterConfig {
            arp_entry_ttl,
            ..self
        }
    }

    pub fn sweep_interval(self, sweep_interval: Duration) -> Self {
        RouterConfig {
            sweep_interval,
            ..self
        }
    }

    pub fn arp_retry_interval(self, arp_retry_interval: Duration) -> Self {
        RouterConfig {
            arp_retry_interval,
            ..self
        }
    }

    pub fn arp_retry_limit(self, arp_retry_limit: u32) -> Self {
        RouterConfig {
            arp_retry_limit,
            ..self
        }
    }

    pub fn icmp_ttl(self, icmp_ttl: u8) -> Self {
        RouterConfig { icmp_ttl, ..self }
    }
}
