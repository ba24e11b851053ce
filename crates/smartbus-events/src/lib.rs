//! SmartBus Events - priority-ordered, type-keyed in-process event bus.
//!
//! This crate provides:
//! - A subscriber registry indexed by exact event type and priority
//! - Immediate and asynchronous dispatch strategies
//! - Per-subscriber failure isolation through pluggable exception policies
//! - Three ways to subscribe: direct subscribers, handler functions, and
//!   listeners declaring their own entry points
//!
//! # Architecture
//!
//! ```text
//! register ─► SubscriberHandle ─► SubscriberRegistry
//!                                   event type ─► priority bucket ─► [handles]
//!
//! post(event) ─► lookup(exact type) ─► snapshot ─► Dispatcher
//!                                                   ├─ Immediate: posting thread
//!                                                   └─ Async: one job on the Executor
//! ```
//!
//! Higher priorities are delivered first; equal priorities keep
//! registration order. A failing subscriber (error or panic) is reported
//! through the [`ExceptionPolicy`] and never stops delivery to the rest.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use smartbus_events::{EventBus, SubscriberResult};
//!
//! #[derive(Debug)]
//! struct Ping(u32);
//!
//! struct Counter(std::sync::atomic::AtomicU32);
//!
//! fn on_ping(counter: &Counter, ping: &Ping) -> SubscriberResult {
//!     counter.0.fetch_add(ping.0, std::sync::atomic::Ordering::SeqCst);
//!     Ok(())
//! }
//!
//! # fn main() -> Result<(), smartbus_events::EventBusError> {
//! let bus = EventBus::with_defaults("main")?;
//! let counter = Arc::new(Counter(0.into()));
//! bus.register_fn(on_ping, Arc::clone(&counter));
//!
//! bus.post(Ping(2));
//! assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 2);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod dispatch;
mod error;
mod event;
mod listener;
mod policy;
mod registry;
mod subscriber;

pub use bus::EventBus;
pub use dispatch::{
    AsyncDispatcher, Dispatcher, Executor, ImmediateDispatcher, Job, POLICY_FAILURE_MESSAGE,
    TokioExecutor, deliver_all,
};
pub use error::{BoxError, DeliveryFailure, EventBusError, EventBusResult, SubscriberResult};
pub use event::{Event, EventType};
pub use listener::{Listener, Subscription, SubscriptionTable};
pub use policy::{DiagnosticSink, ExceptionPolicy, FailureContext, LoggingPolicy, TracingSink};
pub use registry::{DEFAULT_PRIORITY, SubscriberRegistry};
pub use subscriber::{EventSubscriber, HandleId, HandlerFn, SubscriberHandle};
