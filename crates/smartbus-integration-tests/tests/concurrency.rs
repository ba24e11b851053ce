//! Integration tests for concurrent registration, lookup and posting.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use smartbus_events::{EventSubscriber, EventType, SubscriberHandle};
use smartbus_test::{RecordingSubscriber, Sequenced, immediate_bus, setup_test_logging_default};

const BUS: &str = "stress";
const STABLE: usize = 4;
const CHURNERS: usize = 4;
const POSTERS: usize = 4;
const POSTS_PER_THREAD: usize = 250;
const POSTS_TOTAL: usize = 1_000;

fn stable_priority(index: usize) -> i8 {
    // 40, 30, 20, 10
    match index {
        0 => 40,
        1 => 30,
        2 => 20,
        _ => 10,
    }
}

#[test]
fn test_stable_subscribers_see_every_post_while_others_churn() {
    setup_test_logging_default();
    let (bus, sink) = immediate_bus(BUS);
    let event_type = EventType::of::<Sequenced>();

    let stable: Vec<Arc<RecordingSubscriber>> = (0..STABLE)
        .map(|i| RecordingSubscriber::shared(format!("stable-{i}")))
        .collect();
    for (i, subscriber) in stable.iter().enumerate() {
        bus.register_with_priority(
            Arc::clone(subscriber) as Arc<dyn EventSubscriber>,
            event_type,
            stable_priority(i),
        );
    }

    let churned: Vec<Arc<RecordingSubscriber>> = (0..CHURNERS)
        .map(|i| RecordingSubscriber::shared(format!("churn-{i}")))
        .collect();
    let posting_done = AtomicBool::new(false);

    thread::scope(|scope| {
        for (i, subscriber) in churned.iter().enumerate() {
            let bus = &bus;
            let posting_done = &posting_done;
            let subscriber = Arc::clone(subscriber) as Arc<dyn EventSubscriber>;
            scope.spawn(move || {
                // Churn at a priority shared with a stable subscriber so
                // buckets are mutated under readers.
                let priority = stable_priority(i);
                while !posting_done.load(Ordering::SeqCst) {
                    bus.register_with_priority(Arc::clone(&subscriber), event_type, priority);
                    assert!(bus.unregister_with_priority(&subscriber, event_type, priority));
                }
            });
        }

        let posters: Vec<_> = (0..POSTERS)
            .map(|source| {
                let bus = &bus;
                scope.spawn(move || {
                    for sequence in 0..POSTS_PER_THREAD {
                        bus.post(Sequenced { source, sequence });
                    }
                })
            })
            .collect();
        for poster in posters {
            poster.join().unwrap();
        }
        posting_done.store(true, Ordering::SeqCst);
    });

    for subscriber in &stable {
        assert_eq!(subscriber.count(), POSTS_TOTAL);
        let distinct: HashSet<String> = subscriber.received().into_iter().collect();
        assert_eq!(distinct.len(), POSTS_TOTAL);
    }
    assert_eq!(bus.registry().subscriber_count(event_type), STABLE);
    assert!(sink.is_empty());
}

#[test]
fn test_lookup_snapshots_are_consistent_under_mutation() {
    let (bus, _sink) = immediate_bus(BUS);
    let event_type = EventType::of::<Sequenced>();
    let bus_id: Arc<str> = Arc::from(BUS);

    let stable: Vec<Arc<dyn EventSubscriber>> = (0..STABLE)
        .map(|i| RecordingSubscriber::shared(format!("stable-{i}")) as Arc<dyn EventSubscriber>)
        .collect();
    for (i, subscriber) in stable.iter().enumerate() {
        bus.register_with_priority(Arc::clone(subscriber), event_type, stable_priority(i));
    }
    let expected: Vec<SubscriberHandle> = stable
        .iter()
        .map(|s| SubscriberHandle::direct(Arc::clone(&bus_id), Arc::clone(s)))
        .collect();

    let done = AtomicBool::new(false);
    thread::scope(|scope| {
        for i in 0..CHURNERS {
            let bus = &bus;
            let done = &done;
            scope.spawn(move || {
                let subscriber =
                    RecordingSubscriber::shared(format!("churn-{i}")) as Arc<dyn EventSubscriber>;
                let priority = stable_priority(i);
                while !done.load(Ordering::SeqCst) {
                    bus.register_with_priority(Arc::clone(&subscriber), event_type, priority);
                    bus.unregister_with_priority(&subscriber, event_type, priority);
                }
            });
        }

        let readers: Vec<_> = (0..POSTERS)
            .map(|_| {
                let bus = &bus;
                let expected = &expected;
                scope.spawn(move || {
                    for _ in 0..POSTS_PER_THREAD {
                        let snapshot = bus.registry().lookup(event_type);

                        let unique: HashSet<&SubscriberHandle> = snapshot.iter().collect();
                        assert_eq!(unique.len(), snapshot.len(), "duplicate handle in snapshot");

                        let stable_in_order: Vec<&SubscriberHandle> = snapshot
                            .iter()
                            .filter(|handle| expected.contains(*handle))
                            .collect();
                        let expected_refs: Vec<&SubscriberHandle> = expected.iter().collect();
                        assert_eq!(stable_in_order, expected_refs);
                    }
                })
            })
            .collect();
        for reader in readers {
            reader.join().unwrap();
        }
        done.store(true, Ordering::SeqCst);
    });
}

#[test]
fn test_subscriber_registering_from_another_thread_during_delivery() {
    let (bus, sink) = immediate_bus(BUS);
    let event_type = EventType::of::<Sequenced>();
    let late = RecordingSubscriber::shared("late");
    let late_dyn = Arc::clone(&late) as Arc<dyn EventSubscriber>;

    bus.register(
        RecordingSubscriber::shared("early") as Arc<dyn EventSubscriber>,
        event_type,
    );

    thread::scope(|scope| {
        scope.spawn(|| {
            for sequence in 0..POSTS_PER_THREAD {
                bus.post(Sequenced {
                    source: 0,
                    sequence,
                });
            }
        });
        scope.spawn(|| bus.register(Arc::clone(&late_dyn), event_type));
    });

    // Registered at some point during the run, then present for every later post.
    assert!(late.count() <= POSTS_PER_THREAD);
    bus.post(Sequenced {
        source: 1,
        sequence: 0,
    });
    assert!(late.count() >= 1);
    assert!(sink.is_empty());
}
