//! EventTable - Bounded table of active and recently active health events
//!
//! Slots are allocated once with a fixed capacity and scanned linearly. A slot
//! is either empty (never used) or holds an event that is active or expired.
//! Expired events keep their slot until an upsert needs the room.

use crate::domain::hms::{HealthEvent, HmsCode};
use crate::domain::severity::Severity;
use crate::helpers::{Millis, elapsed};

/// Fixed-capacity store of health events keyed by [`HmsCode`]
#[derive(Clone, Debug)]
pub struct EventTable {
    slots: Box<[Option<HealthEvent>]>,
}

impl EventTable {
    /// Allocate a table with `capacity` empty slots
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots, active or not
    pub fn tracked(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Look up the event stored for `key`
    pub fn get(&self, key: HmsCode) -> Option<&HealthEvent> {
        self.events().find(|event| event.code_key == key)
    }

    /// Occupied slots in slot order
    pub fn events(&self) -> impl Iterator<Item = &HealthEvent> {
        self.slots.iter().flatten()
    }

    fn active(&self) -> impl Iterator<Item = &HealthEvent> {
        self.events().filter(|event| event.active)
    }

    /// Record a report of `key` at `now`.
    ///
    /// An existing entry is refreshed. Otherwise the first empty slot is used,
    /// then the oldest inactive entry, then the oldest entry overall. Equal
    /// ages resolve to the first slot in scan order.
    pub fn upsert(&mut self, key: HmsCode, now: Millis) {
        if key.is_zero() || self.slots.is_empty() {
            return;
        }

        if let Some(event) = self.slots.iter_mut().flatten().find(|e| e.code_key == key) {
            event.refresh(now);
            tracing::debug!(
                code = %event.display_code,
                count = event.occurrence_count,
                "HMS event refreshed"
            );
            return;
        }

        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .or_else(|| self.oldest(now, |event| !event.active))
            .or_else(|| self.oldest(now, |_| true));

        let Some(slot) = slot else {
            return;
        };

        match &self.slots[slot] {
            Some(evicted) if evicted.active => tracing::warn!(
                evicted = %evicted.display_code,
                "HMS table full of active events, evicting oldest"
            ),
            Some(evicted) => tracing::debug!(
                evicted = %evicted.display_code,
                "Reusing slot of inactive HMS event"
            ),
            None => {}
        }

        let event = HealthEvent::new(key, now);
        tracing::debug!(code = %event.display_code, severity = %event.severity, "HMS event tracked");
        self.slots[slot] = Some(event);
    }

    /// Index of the occupied slot matching `filter` with the largest age
    fn oldest(&self, now: Millis, filter: impl Fn(&HealthEvent) -> bool) -> Option<usize> {
        let mut best: Option<(usize, Millis)> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(event) = slot else { continue };
            if !filter(event) {
                continue;
            }
            let age = event.age(now);
            if best.is_none_or(|(_, best_age)| age > best_age) {
                best = Some((index, age));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Mark events not seen for more than `ttl` as inactive.
    ///
    /// Expired entries keep their slot, code and occurrence history.
    pub fn expire(&mut self, now: Millis, ttl: Millis) {
        for event in self.slots.iter_mut().flatten() {
            if event.active && elapsed(now, event.last_seen) > ttl {
                event.active = false;
                tracing::debug!(code = %event.display_code, "HMS event expired");
            }
        }
    }

    /// Highest severity among active events, `None` when nothing is active
    pub fn top_severity(&self) -> Severity {
        self.active()
            .map(|event| event.severity)
            .max()
            .unwrap_or_default()
    }

    /// Whether any active event is Warning or worse
    pub fn has_problem(&self) -> bool {
        self.top_severity().is_problem()
    }

    pub fn count_active(&self, severity: Severity) -> usize {
        self.active().filter(|event| event.severity == severity).count()
    }

    pub fn count_active_total(&self) -> usize {
        self.active().count()
    }

    /// Up to `max` active events in slot order
    pub fn list_active(&self, max: usize) -> Vec<HealthEvent> {
        self.active().take(max).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Millis = 20_000;

    fn key(n: u32) -> HmsCode {
        HmsCode::new(0x0300_0000 | n, 0x0003_0001)
    }

    #[test]
    fn test_upsert_same_code_refreshes() {
        let mut table = EventTable::new(4);
        for (i, now) in [0u32, 100, 200, 300].into_iter().enumerate() {
            table.upsert(key(1), now);
            let event = table.get(key(1)).expect("tracked");
            assert_eq!(event.occurrence_count, i as u32 + 1);
            assert!(event.active);
        }
        assert_eq!(table.tracked(), 1);
        let event = table.get(key(1)).expect("tracked");
        assert_eq!(event.first_seen, 0);
        assert_eq!(event.last_seen, 300);
    }

    #[test]
    fn test_capacity_bound() {
        let mut table = EventTable::new(5);
        for n in 1..=12 {
            table.upsert(key(n), n * 10);
            assert!(table.tracked() <= 5);
        }
        assert_eq!(table.tracked(), 5);
        assert_eq!(table.capacity(), 5);
    }

    #[test]
    fn test_evicts_oldest_inactive() {
        let mut table = EventTable::new(3);
        table.upsert(key(1), 300);
        table.upsert(key(2), 100);
        table.upsert(key(3), 200);
        table.expire(100_000, TTL);
        assert_eq!(table.count_active_total(), 0);

        table.upsert(key(4), 100_001);
        assert!(table.get(key(2)).is_none());
        assert!(table.get(key(1)).is_some());
        assert!(table.get(key(3)).is_some());
        assert!(table.get(key(4)).is_some_and(|e| e.active));
    }

    #[test]
    fn test_inactive_evicted_before_active() {
        let mut table = EventTable::new(3);
        table.upsert(key(1), 0);
        table.upsert(key(2), 10);
        table.upsert(key(3), 20);
        table.expire(20_011, TTL);
        table.upsert(key(1), 20_012);

        table.upsert(key(4), 20_013);
        assert!(table.get(key(2)).is_none());
        assert!(table.get(key(1)).is_some_and(|e| e.active));
        assert!(table.get(key(3)).is_some_and(|e| e.active));
        assert!(table.get(key(4)).is_some_and(|e| e.active));
    }

    #[test]
    fn test_full_of_active_evicts_oldest() {
        let mut table = EventTable::new(2);
        table.upsert(key(0xA), 0);
        table.upsert(key(0xB), 10);
        table.upsert(key(0xC), 20);

        assert!(table.get(key(0xA)).is_none());
        assert!(table.get(key(0xB)).is_some());
        assert!(table.get(key(0xC)).is_some());
        assert_eq!(table.count_active_total(), 2);
    }

    #[test]
    fn test_equal_ages_evict_first_slot() {
        let mut table = EventTable::new(3);
        table.upsert(key(1), 50);
        table.upsert(key(2), 50);
        table.upsert(key(3), 50);
        table.upsert(key(4), 60);

        let codes: Vec<HmsCode> = table.events().map(|e| e.code_key).collect();
        assert_eq!(codes, vec![key(4), key(2), key(3)]);
    }

    #[test]
    fn test_expire_threshold_and_idempotence() {
        let mut table = EventTable::new(2);
        table.upsert(key(1), 1_000);

        table.expire(1_000 + TTL, TTL);
        assert_eq!(table.count_active_total(), 1);

        table.expire(1_000 + TTL + 1, TTL);
        assert_eq!(table.count_active_total(), 0);

        let before = table.clone();
        table.expire(1_000 + TTL + 1, TTL);
        let after: Vec<_> = table.events().cloned().collect();
        let before: Vec<_> = before.events().cloned().collect();
        assert_eq!(before, after);

        // Expired entries keep their history.
        let event = table.get(key(1)).expect("slot retained");
        assert_eq!(event.occurrence_count, 1);
        assert!(!event.active);
    }

    #[test]
    fn test_reactivation_keeps_count() {
        let mut table = EventTable::new(2);
        table.upsert(key(1), 0);
        table.expire(TTL + 1, TTL);
        table.upsert(key(1), TTL + 2);
        let event = table.get(key(1)).expect("tracked");
        assert!(event.active);
        assert_eq!(event.occurrence_count, 2);
    }

    #[test]
    fn test_top_severity_over_mixed_set() {
        let mut table = EventTable::new(8);
        assert_eq!(table.top_severity(), Severity::None);
        assert!(!table.has_problem());

        table.upsert(HmsCode::new(1, 0x0004_0001), 0);
        assert_eq!(table.top_severity(), Severity::Info);
        assert!(!table.has_problem());

        table.upsert(HmsCode::new(2, 0x0003_0001), 0);
        table.upsert(HmsCode::new(3, 0x0002_0001), 0);
        assert_eq!(table.top_severity(), Severity::Error);
        assert!(table.has_problem());

        table.upsert(HmsCode::new(4, 0x0001_0001), 5_000);
        assert_eq!(table.top_severity(), Severity::Fatal);

        table.expire(TTL + 10, TTL);
        assert_eq!(table.top_severity(), Severity::Fatal);
        table.expire(TTL + 5_001, TTL);
        assert_eq!(table.top_severity(), Severity::None);
    }

    #[test]
    fn test_counts_and_listing() {
        let mut table = EventTable::new(8);
        table.upsert(HmsCode::new(1, 0x0003_0001), 0);
        table.upsert(HmsCode::new(2, 0x0003_0002), 0);
        table.upsert(HmsCode::new(3, 0x0002_0001), 0);
        table.upsert(HmsCode::new(4, 0x0002_0002), 30_000);
        table.expire(30_000, TTL);

        assert_eq!(table.count_active(Severity::Warning), 0);
        assert_eq!(table.count_active(Severity::Error), 1);
        assert_eq!(table.count_active_total(), 1);

        table.upsert(HmsCode::new(1, 0x0003_0001), 30_001);
        table.upsert(HmsCode::new(5, 0x0004_0001), 30_002);
        let listed = table.list_active(2);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].code_key, HmsCode::new(1, 0x0003_0001));
        assert_eq!(listed[1].code_key, HmsCode::new(4, 0x0002_0002));
        assert!(table.list_active(0).is_empty());
    }

    #[test]
    fn test_zero_key_and_zero_capacity_ignored() {
        let mut table = EventTable::new(2);
        table.upsert(HmsCode(0), 0);
        assert_eq!(table.tracked(), 0);

        let mut empty = EventTable::new(0);
        empty.upsert(key(1), 0);
        assert_eq!(empty.tracked(), 0);
        assert_eq!(empty.top_severity(), Severity::None);
    }
}
