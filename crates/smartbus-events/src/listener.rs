//! Listener front end: explicit per-type subscription tables.
//!
//! A [`Listener`] declares its entry points once, in
//! [`Listener::subscriptions`]. Each entry point names one handler method,
//! the event type it accepts, a priority and an optional target bus. The
//! bus turns every qualifying entry point into one [`SubscriberHandle`].
//!
//! ```rust
//! use std::sync::Arc;
//! use smartbus_events::{EventBus, Listener, Subscription, SubscriptionTable, SubscriberResult};
//!
//! #[derive(Debug)]
//! struct OrderPlaced(u64);
//!
//! struct Audit;
//!
//! impl Audit {
//!     fn on_order(&self, event: &OrderPlaced) -> SubscriberResult {
//!         let _ = event.0;
//!         Ok(())
//!     }
//! }
//!
//! impl Listener for Audit {
//!     fn subscriptions(table: &mut SubscriptionTable<Self>) {
//!         table.add(Subscription::new("on_order", Self::on_order).priority(10));
//!     }
//! }
//!
//! # fn main() -> Result<(), smartbus_events::EventBusError> {
//! let bus = EventBus::with_defaults("orders")?;
//! bus.register_listener(&Arc::new(Audit))?;
//! bus.post(OrderPlaced(1));
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{EventBusError, EventBusResult, SubscriberResult};
use crate::event::{Event, EventType};
use crate::registry::DEFAULT_PRIORITY;
use crate::subscriber::{Entry, EventSubscriber, HandleId, SubscriberHandle, arc_addr};

type Invoker<L> = Arc<dyn Fn(&L, &dyn Event) -> SubscriberResult + Send + Sync>;

/// An object that declares its own event entry points.
pub trait Listener: Send + Sync + Sized + 'static {
    /// Declare the entry points of this listener type.
    fn subscriptions(table: &mut SubscriptionTable<Self>);
}

/// One declared entry point of a listener.
pub struct Subscription<L> {
    name: &'static str,
    event_type: EventType,
    priority: i8,
    target_bus: Option<String>,
    invoke: Invoker<L>,
}

impl<L: Listener> Subscription<L> {
    /// Declare `handler` as the entry point `name` for events of type `E`.
    ///
    /// Defaults: priority `0`, delivered on any bus.
    #[must_use]
    pub fn new<E: Event>(name: &'static str, handler: fn(&L, &E) -> SubscriberResult) -> Self {
        let invoke: Invoker<L> = Arc::new(move |listener: &L, event: &dyn Event| {
            match event.downcast_ref::<E>() {
                Some(event) => handler(listener, event),
                None => Err(format!(
                    "event type mismatch: expected {}",
                    std::any::type_name::<E>()
                )
                .into()),
            }
        });
        Self {
            name,
            event_type: EventType::of::<E>(),
            priority: DEFAULT_PRIORITY,
            target_bus: None,
            invoke,
        }
    }

    /// Set the delivery priority (higher delivers earlier).
    #[must_use]
    pub fn priority(mut self, priority: i8) -> Self {
        self.priority = priority;
        self
    }

    /// Only deliver when posted on the bus with this identifier.
    ///
    /// An empty identifier means any bus.
    #[must_use]
    pub fn bus(mut self, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        self.target_bus = (!identifier.is_empty()).then_some(identifier);
        self
    }

    /// Entry point name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Event type accepted by the entry point.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    fn applies_to(&self, bus: &str) -> bool {
        self.target_bus.as_deref().is_none_or(|target| target == bus)
    }
}

impl<L> fmt::Debug for Subscription<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("event_type", &self.event_type)
            .field("priority", &self.priority)
            .field("target_bus", &self.target_bus)
            .finish_non_exhaustive()
    }
}

/// Collects the entry points a [`Listener`] declares.
pub struct SubscriptionTable<L> {
    entries: Vec<Subscription<L>>,
}

impl<L: Listener> SubscriptionTable<L> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add an entry point.
    pub fn add(&mut self, subscription: Subscription<L>) -> &mut Self {
        self.entries.push(subscription);
        self
    }

    /// Number of declared entry points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry points were declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A listener entry point resolved against one bus.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedEntry {
    pub(crate) event_type: EventType,
    pub(crate) priority: i8,
    pub(crate) handle: SubscriberHandle,
}

/// Turn a listener's declared entry points into handles for `bus`.
///
/// Entry points targeted at another bus are skipped. Blank or duplicate
/// entry names are rejected.
pub(crate) fn resolve<L: Listener>(
    bus: &Arc<str>,
    listener: &Arc<L>,
) -> EventBusResult<Vec<ResolvedEntry>> {
    let mut table = SubscriptionTable::new();
    L::subscriptions(&mut table);

    let listener_type = std::any::type_name::<L>();
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(table.len());

    for entry in table.entries {
        if entry.name.trim().is_empty() {
            return Err(EventBusError::InvalidArgument(format!(
                "listener {listener_type} declares an entry point without a name"
            )));
        }
        if !seen.insert(entry.name) {
            return Err(EventBusError::InvalidArgument(format!(
                "listener {listener_type} declares entry point {} more than once",
                entry.name
            )));
        }
        if !entry.applies_to(bus) {
            debug!(
                bus = %bus,
                listener = listener_type,
                entry = entry.name,
                "Skipping entry point targeted at another bus"
            );
            continue;
        }

        let id = HandleId::new(
            Arc::clone(bus),
            arc_addr(listener),
            Entry::Declared {
                name: entry.name,
                event_type: entry.event_type,
            },
        );
        let target = Arc::new(MethodSubscriber {
            listener: Arc::clone(listener),
            description: format!("{listener_type}::{}", entry.name),
            invoke: entry.invoke,
        });
        resolved.push(ResolvedEntry {
            event_type: entry.event_type,
            priority: entry.priority,
            handle: SubscriberHandle::from_parts(id, target),
        });
    }

    Ok(resolved)
}

struct MethodSubscriber<L> {
    listener: Arc<L>,
    description: String,
    invoke: Invoker<L>,
}

impl<L: Listener> EventSubscriber for MethodSubscriber<L> {
    fn on_event(&self, event: &dyn Event) -> SubscriberResult {
        (self.invoke)(&self.listener, event)
    }

    fn name(&self) -> &str {
        &self.description
    }
}
