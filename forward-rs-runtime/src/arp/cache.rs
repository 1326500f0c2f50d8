use crate::arp::{ArpRetry, BufferedPacket, PendingRequest, RequestHandle, SweepOutcome};
use crate::config::RouterConfig;
use forward_rs_packets::MacAddr;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// One learned IP to MAC mapping. Entries are invalidated in place when they age out, and the
/// slot is reused by a later insertion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArpEntry {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
    pub inserted_at: Instant,
    pub valid: bool,
}

struct CacheState {
    entries: Vec<ArpEntry>,
    requests: Vec<PendingRequest>,
    next_request_id: u64,
}

impl CacheState {
    fn request_position(&self, ip: Ipv4Addr) -> Option<usize> {
        self.requests.iter().position(|r| r.target_ip == ip)
    }

    fn valid_entry(&self, ip: Ipv4Addr) -> Option<ArpEntry> {
        self.entries.iter().find(|e| e.valid && e.ip == ip).copied()
    }

    /// Appends a copy of `frame` to the request for `ip`, creating the request if needed.
    fn park(&mut self, ip: Ipv4Addr, frame: &[u8], interface: &str) -> RequestHandle {
        let index = match self.request_position(ip) {
            Some(i) => i,
            None => {
                let id = self.next_request_id;
                self.next_request_id += 1;
                self.requests.push(PendingRequest::new(id, ip));
                debug!(%ip, interface, "new pending ARP request");
                self.requests.len() - 1
            }
        };

        let request = &mut self.requests[index];
        request.packets.push(BufferedPacket {
            frame: frame.to_vec(),
            interface: String::from(interface),
        });
        trace!(%ip, queued = request.packets.len(), "packet parked awaiting ARP");
        request.handle()
    }

    fn take_request(&mut self, ip: Ipv4Addr) -> Option<PendingRequest> {
        self.request_position(ip).map(|i| self.requests.remove(i))
    }

    fn destroy_request(&mut self, handle: &RequestHandle) -> bool {
        match self.requests.iter().position(|r| r.id == handle.id) {
            Some(i) => {
                self.requests.remove(i);
                true
            }
            None => false,
        }
    }

    /// Writes the mapping into a slot. An existing valid entry for `ip` is refreshed, otherwise
    /// the first invalid slot is used, then any unused capacity, and finally the oldest entry is
    /// evicted.
    fn store(&mut self, ip: Ipv4Addr, mac: MacAddr, now: Instant, capacity: usize) {
        let entry = ArpEntry {
            ip,
            mac,
            inserted_at: now,
            valid: true,
        };

        let slot = self
            .entries
            .iter()
            .position(|e| e.valid && e.ip == ip)
            .or_else(|| self.entries.iter().position(|e| !e.valid));

        match slot {
            Some(i) => self.entries[i] = entry,
            None if self.entries.len() < capacity => self.entries.push(entry),
            None => {
                let oldest = self
                    .entries
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(i, _)| i);
                if let Some(i) = oldest {
                    debug!(evicted = %self.entries[i].ip, %ip, "ARP cache full, evicting oldest entry");
                    self.entries[i] = entry;
                }
            }
        }
    }
}

/// The ARP cache and its pending-request queue behind a single lock.
///
/// Every method locks, does its work and unlocks before returning; callers never see the lock
/// and nothing is transmitted while it is held. Operations that need to be atomic together, such
/// as storing a mapping and detaching the request waiting on it, happen in one critical section.
pub struct ArpCache {
    state: Mutex<CacheState>,
    capacity: usize,
    entry_ttl: Duration,
    retry_interval: Duration,
    retry_limit: u32,
}

impl ArpCache {
    pub fn new(config: &RouterConfig) -> Self {
        ArpCache {
            state: Mutex::new(CacheState {
                entries: Vec::with_capacity(config.arp_cache_capacity),
                requests: vec![],
                next_request_id: 0,
            }),
            capacity: config.arp_cache_capacity,
            entry_ttl: config.arp_entry_ttl,
            retry_interval: config.arp_retry_interval,
            retry_limit: config.arp_retry_limit,
        }
    }

    // A panic elsewhere while holding the lock leaves the state consistent, every mutation here
    // is a single push/remove/assign, so keep going with it.
    fn lock(&self) -> MutexGuard<CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the valid entry for `ip`. The copy is detached from the cache, later
    /// changes to the table do not show up in it.
    pub fn lookup(&self, ip: Ipv4Addr) -> Option<ArpEntry> {
        let state = self.lock();
        state.valid_entry(ip)
    }

    /// Parks a copy of `frame` until `ip` resolves, creating the request for `ip` if this is the
    /// first packet waiting on it. Packets keep the order they were queued in.
    pub fn queue_request(&self, ip: Ipv4Addr, frame: &[u8], interface: &str) -> RequestHandle {
        self.lock().park(ip, frame, interface)
    }

    /// Looks `ip` up and, on a miss, parks `frame` against it, all under one lock. An ARP reply
    /// can therefore never land between the miss and the enqueue, which would leave the packet
    /// waiting on an address that is already resolved.
    pub fn resolve_or_queue(
        &self,
        ip: Ipv4Addr,
        frame: &[u8],
        interface: &str,
    ) -> Result<ArpEntry, RequestHandle> {
        let mut state = self.lock();
        match state.valid_entry(ip) {
            Some(entry) => Ok(entry),
            None => Err(state.park(ip, frame, interface)),
        }
    }

    /// Records `ip` at `mac` and detaches the request waiting on `ip`, if any. The returned
    /// request is no longer in the cache; its packets are the caller's to flush.
    pub fn insert(&self, mac: MacAddr, ip: Ipv4Addr) -> Option<PendingRequest> {
        self.insert_at(mac, ip, Instant::now())
    }

    pub fn insert_at(&self, mac: MacAddr, ip: Ipv4Addr, now: Instant) -> Option<PendingRequest> {
        let mut state = self.lock();
        let request = state.take_request(ip);
        state.store(ip, mac, now, self.capacity);
        info!(%ip, %mac, waiting = request.as_ref().map_or(0, |r| r.packets.len()), "ARP entry learned");
        request
    }

    /// Removes the request and drops its packets. Destroying a request that is already gone is a
    /// no-op; the return value says whether anything was removed.
    pub fn destroy_request(&self, handle: &RequestHandle) -> bool {
        self.lock().destroy_request(handle)
    }

    /// One sweeper tick. Ages out entries older than the TTL, then walks the pending requests:
    /// those sent less than a retry interval ago are left alone, those already past the retry
    /// limit are removed and handed back as abandoned, and the rest are marked sent at `now`
    /// with one more attempt and handed back as retries.
    pub fn sweep(&self, now: Instant) -> SweepOutcome {
        let mut state = self.lock();
        let mut outcome = SweepOutcome::default();

        for entry in state.entries.iter_mut() {
            if entry.valid && now.saturating_duration_since(entry.inserted_at) > self.entry_ttl {
                entry.valid = false;
                outcome.expired += 1;
                debug!(ip = %entry.ip, "ARP entry expired");
            }
        }

        let mut abandoned = vec![];
        for request in state.requests.iter_mut() {
            if let Some(last_sent) = request.last_sent {
                if now.saturating_duration_since(last_sent) < self.retry_interval {
                    continue;
                }
            }

            match request.interface().map(String::from) {
                Some(interface) if request.attempts <= self.retry_limit => {
                    outcome.retries.push(ArpRetry {
                        target_ip: request.target_ip,
                        interface,
                    });
                    request.last_sent = Some(now);
                    request.attempts += 1;
                }
                _ => abandoned.push(request.handle()),
            }
        }

        for handle in abandoned {
            if let Some(i) = state.requests.iter().position(|r| r.id == handle.id) {
                let request = state.requests.remove(i);
                info!(ip = %request.target_ip, attempts = request.attempts, "giving up on ARP resolution");
                outcome.abandoned.push(request);
            }
        }

        outcome
    }

    /// Snapshot of every slot, valid or not.
    pub fn entries(&self) -> Vec<ArpEntry> {
        self.lock().entries.clone()
    }

    /// Snapshot of the pending requests.
    pub fn pending(&self) -> Vec<PendingRequest> {
        self.lock().requests.clone()
    }

    pub fn pending_request(&self, ip: Ipv4Addr) -> Option<PendingRequest> {
        let state = self.lock();
        state.request_position(ip).map(|i| state.requests[i].clone())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Table dump for diagnostics, one slot per line.
impl fmt::Display for ArpCache {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let now = Instant::now();
        let entries = self.entries();
        writeln!(f, "{:<19} {:<15} {:>8}  VALID", "MAC", "IP", "AGE(s)")?;
        writeln!(f, "{}", "-".repeat(52))?;
        for entry in entries {
            writeln!(
                f,
                "{:<19} {:<15} {:>8}  {}",
                entry.mac.to_string(),
                entry.ip.to_string(),
                now.saturating_duration_since(entry.inserted_at).as_secs(),
                entry.valid as u8
            )?;
        }
        Ok(())
    }
}
