//! ARP resolution state shared by the dispatch path and the sweeper.
//!
//! `ArpCache` owns both the IP to MAC entries and the pending requests. Every public operation
//! takes the one lock for its whole duration and never longer, so nothing is held across a send.

mod cache;
pub use self::cache::*;

mod pending;
pub use self::pending::*;
