//! Request generation tracking.
//!
//! Listings driven by rapidly changing input (search-as-you-type) tag each
//! request with a monotonically increasing generation. A response is applied
//! only if its generation is still the latest one issued.

use std::sync::atomic::{AtomicU64, Ordering};

/// Generation number handed out when a request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenerationTicket(u64);

impl GenerationTicket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Monotonic counter of issued requests.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    latest: AtomicU64,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket; every earlier ticket becomes stale.
    pub fn begin(&self) -> GenerationTicket {
        GenerationTicket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `ticket` is the most recently issued one.
    pub fn is_current(&self, ticket: GenerationTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_increase() {
        let generation = RequestGeneration::new();
        let first = generation.begin();
        let second = generation.begin();
        assert!(second > first);
        assert_eq!(generation.latest(), 2);
    }

    #[test]
    fn test_only_latest_ticket_is_current() {
        let generation = RequestGeneration::new();
        let stale = generation.begin();
        let fresh = generation.begin();
        assert!(!generation.is_current(stale));
        assert!(generation.is_current(fresh));
    }
}
