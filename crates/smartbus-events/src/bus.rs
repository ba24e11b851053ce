//! The bus façade: identifier-scoped registration and posting.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use smartbus_config::{BusConfig, DispatchMode};
use tracing::{debug, trace};

use crate::dispatch::{AsyncDispatcher, Dispatcher, Executor, ImmediateDispatcher};
use crate::error::{EventBusError, EventBusResult};
use crate::event::{Event, EventType};
use crate::listener::{Listener, resolve};
use crate::policy::{DiagnosticSink, TracingSink};
use crate::registry::{DEFAULT_PRIORITY, SubscriberRegistry};
use crate::subscriber::{EventSubscriber, HandlerFn, SubscriberHandle};

/// In-process publish/subscribe bus.
///
/// Events are delivered to subscribers registered for their exact type,
/// highest priority first, using the bus's dispatch strategy.
pub struct EventBus {
    identifier: Arc<str>,
    registry: SubscriberRegistry,
    dispatcher: Arc<dyn Dispatcher>,
}

impl EventBus {
    /// Create a bus with an explicit dispatch strategy.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::InvalidArgument`] if `identifier` is blank.
    pub fn new(
        identifier: impl Into<String>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> EventBusResult<Self> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(EventBusError::InvalidArgument(
                "bus identifier must not be blank".to_string(),
            ));
        }
        debug!(bus = %identifier, "Event bus created");
        Ok(Self {
            identifier: Arc::from(identifier),
            registry: SubscriberRegistry::new(),
            dispatcher,
        })
    }

    /// Create a bus with immediate dispatch and the default logging policy
    /// reporting to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::InvalidArgument`] if `identifier` is blank.
    pub fn with_sink(
        identifier: impl Into<String>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> EventBusResult<Self> {
        Self::new(identifier, Arc::new(ImmediateDispatcher::new(sink)))
    }

    /// Create a bus with immediate dispatch reporting to `tracing`.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::InvalidArgument`] if `identifier` is blank.
    pub fn with_defaults(identifier: impl Into<String>) -> EventBusResult<Self> {
        Self::with_sink(identifier, Arc::new(TracingSink))
    }

    /// Create a bus from configuration.
    ///
    /// `executor` is required when the configured mode is asynchronous and
    /// ignored otherwise. The `[log]` section is not applied here; the owning
    /// process installs it with [`BusConfig::init_logging`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or an asynchronous
    /// bus is requested without an executor.
    pub fn from_config(
        config: &BusConfig,
        sink: Arc<dyn DiagnosticSink>,
        executor: Option<Arc<dyn Executor>>,
    ) -> EventBusResult<Self> {
        config.validate()?;
        let dispatcher: Arc<dyn Dispatcher> = match config.dispatch.mode {
            DispatchMode::Immediate => Arc::new(ImmediateDispatcher::new(sink)),
            DispatchMode::Async => {
                let executor = executor.ok_or_else(|| {
                    EventBusError::InvalidArgument(
                        "asynchronous dispatch requires an executor".to_string(),
                    )
                })?;
                Arc::new(AsyncDispatcher::new(executor, sink))
            },
        };
        Self::new(config.identifier.clone(), dispatcher)
    }

    /// The bus identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    // ========== Direct subscribers ==========

    /// Register `subscriber` for `event_type` at the default priority.
    pub fn register(&self, subscriber: Arc<dyn EventSubscriber>, event_type: EventType) {
        self.register_with_priority(subscriber, event_type, DEFAULT_PRIORITY);
    }

    /// Register `subscriber` for `event_type` at `priority`.
    pub fn register_with_priority(
        &self,
        subscriber: Arc<dyn EventSubscriber>,
        event_type: EventType,
        priority: i8,
    ) {
        let handle = SubscriberHandle::direct(Arc::clone(&self.identifier), subscriber);
        self.registry.register(event_type, priority, handle);
    }

    /// Remove the first registration of `subscriber` for `event_type`,
    /// highest priority first. Returns whether one was removed.
    pub fn unregister(&self, subscriber: &Arc<dyn EventSubscriber>, event_type: EventType) -> bool {
        let handle = SubscriberHandle::direct(Arc::clone(&self.identifier), Arc::clone(subscriber));
        self.registry.unregister(event_type, &handle)
    }

    /// Remove the registration of `subscriber` for `event_type` at exactly
    /// `priority`. Returns whether one was removed.
    pub fn unregister_with_priority(
        &self,
        subscriber: &Arc<dyn EventSubscriber>,
        event_type: EventType,
        priority: i8,
    ) -> bool {
        let handle = SubscriberHandle::direct(Arc::clone(&self.identifier), Arc::clone(subscriber));
        self.registry.unregister_at(event_type, priority, &handle)
    }

    // ========== Handler functions ==========
    //
    // A handler registration is identified by (bus, function address,
    // context `Arc`). Rust does not promise distinct or stable function
    // addresses: the linker may fold two identical handlers into one, and a
    // generic handler may be instantiated at several addresses. Unregister
    // with the same function item and context used to register, and give
    // each handler sharing a context a distinct body. Subscribers needing
    // exact identity should register through [`register`](Self::register).

    /// Register `handler(context, event)` for events of type `E` at the
    /// default priority.
    ///
    /// See the identity notes above [`unregister_fn`](Self::unregister_fn).
    pub fn register_fn<S, E>(&self, handler: HandlerFn<S, E>, context: Arc<S>)
    where
        S: Send + Sync + 'static,
        E: Event,
    {
        self.register_fn_with_priority(handler, context, DEFAULT_PRIORITY);
    }

    /// Register `handler(context, event)` for events of type `E` at `priority`.
    pub fn register_fn_with_priority<S, E>(
        &self,
        handler: HandlerFn<S, E>,
        context: Arc<S>,
        priority: i8,
    ) where
        S: Send + Sync + 'static,
        E: Event,
    {
        let handle = SubscriberHandle::from_fn(Arc::clone(&self.identifier), handler, context);
        self.registry.register(EventType::of::<E>(), priority, handle);
    }

    /// Remove the first registration of `(handler, context)` for `E`.
    /// Returns whether one was removed.
    ///
    /// Matching compares function addresses, which the compiler may merge
    /// for handlers with identical bodies; such handlers are
    /// indistinguishable here.
    pub fn unregister_fn<S, E>(&self, handler: HandlerFn<S, E>, context: &Arc<S>) -> bool
    where
        S: Send + Sync + 'static,
        E: Event,
    {
        let handle =
            SubscriberHandle::from_fn(Arc::clone(&self.identifier), handler, Arc::clone(context));
        self.registry.unregister(EventType::of::<E>(), &handle)
    }

    // ========== Listeners ==========

    /// Register every entry point `listener` declares for this bus.
    ///
    /// Entry points targeted at a different bus identifier are skipped.
    /// Returns the number of handles registered.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::InvalidArgument`] if the listener declares a
    /// blank or duplicate entry point name; nothing is registered then.
    pub fn register_listener<L: Listener>(&self, listener: &Arc<L>) -> EventBusResult<usize> {
        let entries = resolve(&self.identifier, listener)?;
        let count = entries.len();
        self.registry.register_all(
            entries
                .into_iter()
                .map(|e| (e.event_type, e.priority, e.handle)),
        );
        Ok(count)
    }

    /// Remove every registration made by [`register_listener`](Self::register_listener)
    /// for `listener`. Returns the number of handles removed.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::InvalidArgument`] if the listener declares a
    /// blank or duplicate entry point name.
    pub fn unregister_listener<L: Listener>(&self, listener: &Arc<L>) -> EventBusResult<usize> {
        let entries = resolve(&self.identifier, listener)?;
        Ok(self.registry.unregister_all(
            entries
                .iter()
                .map(|e| (e.event_type, e.priority, &e.handle)),
        ))
    }

    // ========== Posting ==========

    /// Post `event` to the subscribers registered for its exact type.
    ///
    /// Nothing happens, not even executor scheduling, when no subscriber
    /// matches. Subscriber failures never reach the caller.
    ///
    /// A `Box<dyn Event>` or `Arc<dyn Event>` is unwrapped and posted under
    /// the tag of the value inside it.
    pub fn post<E: Event>(&self, event: E) {
        let mut slot = Some(event);
        if let Some(boxed) = take_as::<Box<dyn Event>>(&mut slot) {
            self.post_boxed(boxed);
            return;
        }
        if let Some(shared) = take_as::<Arc<dyn Event>>(&mut slot) {
            self.post_shared(shared);
            return;
        }
        if let Some(event) = slot {
            self.publish(EventType::of::<E>(), Arc::new(event));
        }
    }

    /// Post a type-erased event under the tag of its concrete type.
    pub fn post_boxed(&self, event: Box<dyn Event>) {
        self.post_shared(Arc::from(event));
    }

    /// Post a shared type-erased event under the tag of its concrete type.
    pub fn post_shared(&self, event: Arc<dyn Event>) {
        let event_type = EventType::of_dyn(&*event);
        self.publish(event_type, event);
    }

    fn publish(&self, event_type: EventType, event: Arc<dyn Event>) {
        let subscribers = self.registry.lookup(event_type);
        if subscribers.is_empty() {
            trace!(bus = %self.identifier, event_type = %event_type, "No subscribers, dropping event");
            return;
        }
        trace!(
            bus = %self.identifier,
            event_type = %event_type,
            subscriber_count = subscribers.len(),
            "Posting event"
        );
        self.dispatcher.dispatch(event, subscribers);
    }
}

/// Move the value out of `slot` if it holds a `T`.
fn take_as<T: Any>(slot: &mut dyn Any) -> Option<T> {
    slot.downcast_mut::<Option<T>>().and_then(Option::take)
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("identifier", &self.identifier)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
