//! Subscriber trait and the normalized subscriber handle.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::error::{DeliveryFailure, SubscriberResult};
use crate::event::{Event, EventType};

/// Trait for directly registered subscribers.
///
/// `on_event` runs on whichever thread performs the delivery: the posting
/// thread for immediate dispatch, an executor thread for asynchronous
/// dispatch. Returning an error (or panicking) is reported through the
/// bus's exception policy and never reaches the poster.
pub trait EventSubscriber: Send + Sync {
    /// Called with each event whose type matches the registration.
    ///
    /// # Errors
    ///
    /// Any error is handed to the exception policy.
    fn on_event(&self, event: &dyn Event) -> SubscriberResult;

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Handler signature for closure registration: `(context, event)`.
pub type HandlerFn<S, E> = fn(&S, &E) -> SubscriberResult;

/// Which entry point of a listener a handle delivers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Entry {
    /// The subscriber's own `on_event`.
    Direct,
    /// A registered handler function, by address. Identical handlers may
    /// share an address.
    Function(usize),
    /// A named entry point declared by a [`Listener`](crate::Listener).
    Declared {
        name: &'static str,
        event_type: EventType,
    },
}

/// Identity of a subscriber handle: (bus, listener, entry point).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandleId {
    bus: Arc<str>,
    listener: usize,
    entry: Entry,
}

impl HandleId {
    pub(crate) fn new(bus: Arc<str>, listener: usize, entry: Entry) -> Self {
        Self {
            bus,
            listener,
            entry,
        }
    }

    /// Identifier of the bus that owns the handle.
    #[must_use]
    pub fn bus(&self) -> &str {
        &self.bus
    }
}

/// Address of an `Arc`'s allocation, used as listener identity.
///
/// Stable while the handle (which keeps a clone of the `Arc`) is registered.
pub(crate) fn arc_addr<T: ?Sized>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc).cast::<()>().addr()
}

/// A normalized, equality-comparable unit of registration.
///
/// Equality and hashing use the identity only, so a handle rebuilt from
/// the same (bus, listener, entry point) compares equal to the registered one.
#[derive(Clone)]
pub struct SubscriberHandle {
    id: HandleId,
    target: Arc<dyn EventSubscriber>,
}

impl SubscriberHandle {
    /// Wrap a directly registered subscriber for the given bus.
    #[must_use]
    pub fn direct(bus: Arc<str>, subscriber: Arc<dyn EventSubscriber>) -> Self {
        let id = HandleId::new(bus, arc_addr(&subscriber), Entry::Direct);
        Self {
            id,
            target: subscriber,
        }
    }

    /// Bind a handler function and its context value into a handle.
    #[must_use]
    pub fn from_fn<S, E>(bus: Arc<str>, handler: HandlerFn<S, E>, context: Arc<S>) -> Self
    where
        S: Send + Sync + 'static,
        E: Event,
    {
        let id = HandleId::new(
            bus,
            arc_addr(&context),
            Entry::Function(handler as usize),
        );
        Self {
            id,
            target: Arc::new(FnSubscriber {
                handler,
                context,
                _event: PhantomData,
            }),
        }
    }

    pub(crate) fn from_parts(id: HandleId, target: Arc<dyn EventSubscriber>) -> Self {
        Self { id, target }
    }

    /// The handle's identity.
    #[must_use]
    pub fn id(&self) -> &HandleId {
        &self.id
    }

    /// Deliver one event, converting errors and panics into a [`DeliveryFailure`].
    ///
    /// # Errors
    ///
    /// Returns the failure raised by the subscriber.
    pub fn deliver(&self, event: &dyn Event) -> Result<(), DeliveryFailure> {
        match catch_unwind(AssertUnwindSafe(|| self.target.on_event(event))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DeliveryFailure::Failed(e)),
            Err(payload) => Err(DeliveryFailure::from_panic(payload.as_ref())),
        }
    }

    /// Human-readable description for diagnostics.
    #[must_use]
    pub fn description(&self) -> String {
        format!("bus: {}, subscriber: {}", self.id.bus, self.target.name())
    }
}

impl PartialEq for SubscriberHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubscriberHandle {}

impl Hash for SubscriberHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("bus", &self.id.bus)
            .field("subscriber", &self.target.name())
            .field("entry", &self.id.entry)
            .finish()
    }
}

impl fmt::Display for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Adapter that binds an untyped event to a typed handler function.
struct FnSubscriber<S, E> {
    handler: HandlerFn<S, E>,
    context: Arc<S>,
    _event: PhantomData<fn(&E)>,
}

impl<S, E> EventSubscriber for FnSubscriber<S, E>
where
    S: Send + Sync + 'static,
    E: Event,
{
    fn on_event(&self, event: &dyn Event) -> SubscriberResult {
        let Some(event) = event.downcast_ref::<E>() else {
            return Err(format!(
                "event type mismatch: expected {}",
                std::any::type_name::<E>()
            )
            .into());
        };
        (self.handler)(&self.context, event)
    }

    fn name(&self) -> &str {
        std::any::type_name::<S>()
    }
}
