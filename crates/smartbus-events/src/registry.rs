//! Subscriber registry: event type -> priority buckets -> handles.
//!
//! Mutations (register/unregister, every overload) serialize on one
//! registry-wide write lock. Lookup takes the read lock only while cloning
//! handle references out of the buckets; no handle is ever invoked while a
//! registry lock is held, so subscribers may register or unregister
//! re-entrantly.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace, warn};

use crate::event::EventType;
use crate::subscriber::SubscriberHandle;

/// Priority used when none is given.
pub const DEFAULT_PRIORITY: i8 = 0;

/// One past the highest priority; sort keys are `MAX_PRIORITY_PLUS_ONE - priority`.
const MAX_PRIORITY_PLUS_ONE: i16 = 128;

/// Ascending sort key: iterating keys in order yields highest priority first.
type SortKey = i16;

fn sort_key(priority: i8) -> SortKey {
    MAX_PRIORITY_PLUS_ONE.saturating_sub(i16::from(priority))
}

/// Priority buckets of one event type, ascending by sort key.
type TypeIndex = BTreeMap<SortKey, Vec<SubscriberHandle>>;

/// Concurrent, priority-ordered index of subscriber handles.
///
/// Entries for an event type and for a sort key are created lazily and are
/// never removed; buckets may become empty.
#[derive(Default)]
pub struct SubscriberRegistry {
    index: RwLock<HashMap<EventType, TypeIndex>>,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let event_types = self.read().len();
        let subscriber_count = self.len();
        f.debug_struct("SubscriberRegistry")
            .field("event_types", &event_types)
            .field("subscriber_count", &subscriber_count)
            .finish()
    }
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<EventType, TypeIndex>> {
        self.index.read().unwrap_or_else(|e| {
            warn!("SubscriberRegistry read lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<EventType, TypeIndex>> {
        self.index.write().unwrap_or_else(|e| {
            warn!("SubscriberRegistry lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Append `handle` to the bucket for `(event_type, priority)`.
    ///
    /// Visible to every lookup that starts after this call returns.
    pub fn register(&self, event_type: EventType, priority: i8, handle: SubscriberHandle) {
        debug!(
            event_type = %event_type,
            priority,
            subscriber = %handle,
            "Subscriber registered"
        );
        let mut index = self.write();
        insert(&mut index, event_type, priority, handle);
    }

    /// Register several handles under a single critical section.
    pub fn register_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (EventType, i8, SubscriberHandle)>,
    {
        let mut index = self.write();
        for (event_type, priority, handle) in entries {
            debug!(
                event_type = %event_type,
                priority,
                subscriber = %handle,
                "Subscriber registered"
            );
            insert(&mut index, event_type, priority, handle);
        }
    }

    /// Remove `handle` from the first bucket (highest priority first) that
    /// contains it.
    ///
    /// Returns `true` if a handle was removed; absence is not an error.
    pub fn unregister(&self, event_type: EventType, handle: &SubscriberHandle) -> bool {
        let mut index = self.write();
        let Some(buckets) = index.get_mut(&event_type) else {
            return false;
        };
        let removed = buckets
            .values_mut()
            .any(|bucket| remove_first(bucket, handle));
        if removed {
            debug!(event_type = %event_type, subscriber = %handle, "Subscriber unregistered");
        }
        removed
    }

    /// Remove `handle` from the bucket for exactly `priority`.
    ///
    /// Returns `true` if a handle was removed; absence is not an error.
    pub fn unregister_at(
        &self,
        event_type: EventType,
        priority: i8,
        handle: &SubscriberHandle,
    ) -> bool {
        let mut index = self.write();
        let removed = index
            .get_mut(&event_type)
            .and_then(|buckets| buckets.get_mut(&sort_key(priority)))
            .is_some_and(|bucket| remove_first(bucket, handle));
        if removed {
            debug!(
                event_type = %event_type,
                priority,
                subscriber = %handle,
                "Subscriber unregistered"
            );
        }
        removed
    }

    /// Remove several `(event type, priority, handle)` registrations under a
    /// single critical section. Returns how many were removed.
    pub fn unregister_all<'a, I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (EventType, i8, &'a SubscriberHandle)>,
    {
        let mut index = self.write();
        let mut removed = 0_usize;
        for (event_type, priority, handle) in entries {
            let hit = index
                .get_mut(&event_type)
                .and_then(|buckets| buckets.get_mut(&sort_key(priority)))
                .is_some_and(|bucket| remove_first(bucket, handle));
            if hit {
                debug!(
                    event_type = %event_type,
                    priority,
                    subscriber = %handle,
                    "Subscriber unregistered"
                );
                removed = removed.saturating_add(1);
            }
        }
        removed
    }

    /// Snapshot of the handles for `event_type`, highest priority first and
    /// in registration order within a priority.
    ///
    /// Returns an empty vector when nothing is registered.
    #[must_use]
    pub fn lookup(&self, event_type: EventType) -> Vec<SubscriberHandle> {
        let index = self.read();
        let Some(buckets) = index.get(&event_type) else {
            trace!(event_type = %event_type, "No subscribers for event type");
            return Vec::new();
        };
        let total: usize = buckets.values().map(Vec::len).sum();
        let mut snapshot = Vec::with_capacity(total);
        for bucket in buckets.values() {
            snapshot.extend(bucket.iter().cloned());
        }
        snapshot
    }

    /// Number of handles registered for `event_type`.
    #[must_use]
    pub fn subscriber_count(&self, event_type: EventType) -> usize {
        self.read()
            .get(&event_type)
            .map_or(0, |buckets| buckets.values().map(Vec::len).sum())
    }

    /// Total number of registered handles across all event types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read()
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Whether no handles are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn insert(
    index: &mut HashMap<EventType, TypeIndex>,
    event_type: EventType,
    priority: i8,
    handle: SubscriberHandle,
) {
    index
        .entry(event_type)
        .or_default()
        .entry(sort_key(priority))
        .or_default()
        .push(handle);
}

fn remove_first(bucket: &mut Vec<SubscriberHandle>, handle: &SubscriberHandle) -> bool {
    match bucket.iter().position(|h| h == handle) {
        Some(pos) => {
            bucket.remove(pos);
            true
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubscriberResult;
    use crate::event::Event;
    use crate::subscriber::EventSubscriber;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Ping;

    #[derive(Debug)]
    struct Pong;

    struct Named(&'static str);

    impl EventSubscriber for Named {
        fn on_event(&self, _event: &dyn Event) -> SubscriberResult {
            Ok(())
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    fn handle(name: &'static str) -> SubscriberHandle {
        SubscriberHandle::direct(Arc::from("test"), Arc::new(Named(name)))
    }

    fn names(handles: &[SubscriberHandle]) -> Vec<String> {
        handles
            .iter()
            .map(|h| h.description().trim_start_matches("bus: test, subscriber: ").to_string())
            .collect()
    }

    #[test]
    fn test_sort_key_orders_high_priority_first() {
        assert_eq!(sort_key(127), 1);
        assert_eq!(sort_key(0), 128);
        assert_eq!(sort_key(-128), 256);
        assert!(sort_key(10) < sort_key(5));
    }

    #[test]
    fn test_lookup_empty_registry() {
        let registry = SubscriberRegistry::new();
        assert!(registry.lookup(EventType::of::<Ping>()).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_lookup_orders_by_priority_then_registration() {
        let registry = SubscriberRegistry::new();
        let ping = EventType::of::<Ping>();

        registry.register(ping, 5, handle("a"));
        registry.register(ping, 10, handle("b"));
        registry.register(ping, 5, handle("c"));
        registry.register(ping, -128, handle("d"));
        registry.register(ping, 127, handle("e"));

        assert_eq!(names(&registry.lookup(ping)), vec!["e", "b", "a", "c", "d"]);
        assert_eq!(registry.subscriber_count(ping), 5);
    }

    #[test]
    fn test_lookup_is_exact_type() {
        let registry = SubscriberRegistry::new();
        registry.register(EventType::of::<Ping>(), 0, handle("a"));

        assert!(registry.lookup(EventType::of::<Pong>()).is_empty());
        assert_eq!(registry.subscriber_count(EventType::of::<Pong>()), 0);
    }

    #[test]
    fn test_unregister_removes_first_matching_bucket() {
        let registry = SubscriberRegistry::new();
        let ping = EventType::of::<Ping>();
        let h = handle("a");

        registry.register(ping, 1, h.clone());
        registry.register(ping, 9, h.clone());

        assert!(registry.unregister(ping, &h));
        assert_eq!(registry.subscriber_count(ping), 1);
        // the priority-9 registration went first; the priority-1 one remains
        assert!(!registry.unregister_at(ping, 9, &h));
        assert!(registry.unregister_at(ping, 1, &h));
        assert!(registry.lookup(ping).is_empty());
    }

    #[test]
    fn test_unregister_only_removes_one_duplicate() {
        let registry = SubscriberRegistry::new();
        let ping = EventType::of::<Ping>();
        let h = handle("a");

        registry.register(ping, 0, h.clone());
        registry.register(ping, 0, h.clone());

        assert!(registry.unregister(ping, &h));
        assert_eq!(registry.lookup(ping), vec![h]);
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let registry = SubscriberRegistry::new();
        let ping = EventType::of::<Ping>();

        assert!(!registry.unregister(ping, &handle("ghost")));
        assert!(!registry.unregister_at(ping, 3, &handle("ghost")));

        registry.register(ping, 0, handle("a"));
        assert!(!registry.unregister(ping, &handle("ghost")));
        assert!(!registry.unregister_at(ping, 3, &handle("ghost")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_at_wrong_priority_keeps_handle() {
        let registry = SubscriberRegistry::new();
        let ping = EventType::of::<Ping>();
        let h = handle("a");

        registry.register(ping, 4, h.clone());
        assert!(!registry.unregister_at(ping, 5, &h));
        assert_eq!(registry.lookup(ping), vec![h]);
    }

    #[test]
    fn test_batch_register_and_unregister() {
        let registry = SubscriberRegistry::new();
        let ping = EventType::of::<Ping>();
        let pong = EventType::of::<Pong>();
        let a = handle("a");
        let b = handle("b");

        registry.register_all(vec![(ping, 0, a.clone()), (pong, 3, b.clone())]);
        assert_eq!(registry.len(), 2);

        let removed = registry.unregister_all(vec![(ping, 0, &a), (pong, 3, &b), (pong, 3, &b)]);
        assert_eq!(removed, 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_unaffected_by_later_mutation() {
        let registry = SubscriberRegistry::new();
        let ping = EventType::of::<Ping>();
        let a = handle("a");

        registry.register(ping, 0, a.clone());
        let snapshot = registry.lookup(ping);
        registry.unregister(ping, &a);
        registry.register(ping, 0, handle("b"));

        assert_eq!(snapshot, vec![a]);
    }
}
