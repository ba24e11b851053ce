//! Prelude module - commonly used types for convenient import.
//!
//! Use `use smartbus_events::prelude::*;` to import all essential types.

// Bus
pub use crate::{EventBus, EventBusError, EventBusResult};

// Events
pub use crate::{Event, EventType};

// Subscribing
pub use crate::{
    EventSubscriber, Listener, SubscriberResult, Subscription, SubscriptionTable,
};

// Dispatch and failure handling
pub use crate::{
    AsyncDispatcher, DiagnosticSink, ExceptionPolicy, Executor, ImmediateDispatcher,
    TokioExecutor, TracingSink,
};
