use std::sync::atomic::{AtomicU16, Ordering};

use log::debug;

/// Hands out packet identifiers for outgoing PUBLISH, SUBSCRIBE and UNSUBSCRIBE packets.
///
/// Identifiers count up from 1, wrap after 65,535 and never take the value 0.
#[derive(Debug)]
pub struct PacketIdAllocator {
    next: AtomicU16,
}

impl PacketIdAllocator {
    pub fn new() -> Self {
        Self { next: AtomicU16::new(1) }
    }

    /// The next identifier, whether or not it is still in use.
    pub fn next_id(&self) -> u16 {
        // The closure always returns Some, so both arms carry the previous value.
        match self.next.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            Some(if current == u16::MAX { 1 } else { current + 1 })
        }) {
            Ok(id) | Err(id) => id,
        }
    }

    /// The next identifier for which `in_use` returns `false`.
    ///
    /// Returns `None` when all 65,535 identifiers are in use.
    pub fn next_free_id(&self, in_use: impl Fn(u16) -> bool) -> Option<u16> {
        for _ in 0..u16::MAX {
            let id = self.next_id();
            if !in_use(id) {
                return Some(id);
            }
        }

        debug!("No packet identifier available");
        None
    }
}

impl Default for PacketIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_one() {
        let allocator = PacketIdAllocator::new();
        assert_eq!(allocator.next_id(), 1);
        assert_eq!(allocator.next_id(), 2);
    }

    #[test]
    fn wraps_and_skips_zero() {
        let allocator = PacketIdAllocator { next: AtomicU16::new(u16::MAX - 1) };

        assert_eq!(allocator.next_id(), u16::MAX - 1);
        assert_eq!(allocator.next_id(), u16::MAX);
        assert_eq!(allocator.next_id(), 1);
    }

    #[test]
    fn skips_identifiers_in_use() {
        let allocator = PacketIdAllocator::new();
        assert_eq!(allocator.next_free_id(|id| id < 4), Some(4));
        assert_eq!(allocator.next_free_id(|id| id % 2 == 1), Some(6));
    }

    #[test]
    fn exhausted_when_everything_is_in_use() {
        let allocator = PacketIdAllocator::new();
        assert_eq!(allocator.next_free_id(|_| true), None);
    }
}
