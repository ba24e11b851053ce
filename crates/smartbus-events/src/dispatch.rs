//! Dispatch strategies: immediate (posting thread) and asynchronous (executor).
//!
//! Both strategies walk the snapshot in order and isolate every handle:
//!
//! ```text
//! for handle in snapshot:
//!     handle.deliver(event)
//!         └─ Err(failure) ─► policy.handle_failure(failure, ctx)
//!                               └─ Err / panic ─► sink.error("exception policy failed", ..)
//! ```

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::trace;

use crate::error::{DeliveryFailure, EventBusError, EventBusResult};
use crate::event::Event;
use crate::policy::{DiagnosticSink, ExceptionPolicy, FailureContext, LoggingPolicy};
use crate::subscriber::SubscriberHandle;

/// Message reported when an exception policy itself fails.
pub const POLICY_FAILURE_MESSAGE: &str = "exception policy failed";

/// A unit of delivery work handed to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Caller-supplied worker pool for asynchronous dispatch.
///
/// `execute` must not block on the job itself. Jobs submitted for
/// different posts may run concurrently and in any order.
pub trait Executor: Send + Sync {
    /// Schedule `job` to run.
    fn execute(&self, job: Job);
}

impl<F> Executor for F
where
    F: Fn(Job) + Send + Sync,
{
    fn execute(&self, job: Job) {
        self(job);
    }
}

/// Executor running jobs on a tokio runtime's blocking pool.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    /// Use the given runtime.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ExecutorUnavailable`] outside a tokio runtime.
    pub fn try_current() -> EventBusResult<Self> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| EventBusError::ExecutorUnavailable(e.to_string()))
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        // Completion is observed through the subscribers, not the join handle.
        drop(self.handle.spawn_blocking(job));
    }
}

/// Delivery strategy consuming a lookup snapshot.
pub trait Dispatcher: Send + Sync {
    /// Deliver `event` to `subscribers`, in order.
    fn dispatch(&self, event: Arc<dyn Event>, subscribers: Vec<SubscriberHandle>);
}

/// Invoke every handle in order, isolating failures.
pub fn deliver_all(
    event: &dyn Event,
    subscribers: &[SubscriberHandle],
    policy: &dyn ExceptionPolicy,
    sink: &dyn DiagnosticSink,
) {
    for subscriber in subscribers {
        trace!(subscriber = %subscriber, "Delivering event");
        let Err(failure) = subscriber.deliver(event) else {
            continue;
        };
        let context = FailureContext { event, subscriber };
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            policy.handle_failure(&failure, &context)
        }));
        match outcome {
            Ok(Ok(())) => {},
            Ok(Err(policy_err)) => report_policy_failure(sink, &*policy_err),
            Err(payload) => {
                report_policy_failure(sink, &DeliveryFailure::from_panic(payload.as_ref()));
            },
        }
    }
}

/// Best effort: a panicking sink must not abort the remaining deliveries.
fn report_policy_failure(sink: &dyn DiagnosticSink, cause: &(dyn std::error::Error + 'static)) {
    let _ = catch_unwind(AssertUnwindSafe(|| {
        sink.error(POLICY_FAILURE_MESSAGE, cause);
    }));
}

/// Delivers on the posting thread; returns once every handle was attempted.
#[derive(Clone)]
pub struct ImmediateDispatcher {
    policy: Arc<dyn ExceptionPolicy>,
    sink: Arc<dyn DiagnosticSink>,
}

impl ImmediateDispatcher {
    /// Immediate dispatch with the default [`LoggingPolicy`].
    #[must_use]
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        let policy = Arc::new(LoggingPolicy::new(Arc::clone(&sink)));
        Self { policy, sink }
    }

    /// Immediate dispatch with a custom exception policy.
    #[must_use]
    pub fn with_policy(sink: Arc<dyn DiagnosticSink>, policy: Arc<dyn ExceptionPolicy>) -> Self {
        Self { policy, sink }
    }
}

impl fmt::Debug for ImmediateDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImmediateDispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher for ImmediateDispatcher {
    fn dispatch(&self, event: Arc<dyn Event>, subscribers: Vec<SubscriberHandle>) {
        deliver_all(&*event, &subscribers, &*self.policy, &*self.sink);
    }
}

/// Schedules one job per post on an [`Executor`] and returns immediately.
///
/// Within one job delivery follows snapshot order; jobs for different
/// posts are unordered relative to each other.
#[derive(Clone)]
pub struct AsyncDispatcher {
    executor: Arc<dyn Executor>,
    policy: Arc<dyn ExceptionPolicy>,
    sink: Arc<dyn DiagnosticSink>,
}

impl AsyncDispatcher {
    /// Asynchronous dispatch with the default [`LoggingPolicy`].
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>, sink: Arc<dyn DiagnosticSink>) -> Self {
        let policy = Arc::new(LoggingPolicy::new(Arc::clone(&sink)));
        Self {
            executor,
            policy,
            sink,
        }
    }

    /// Asynchronous dispatch with a custom exception policy.
    #[must_use]
    pub fn with_policy(
        executor: Arc<dyn Executor>,
        sink: Arc<dyn DiagnosticSink>,
        policy: Arc<dyn ExceptionPolicy>,
    ) -> Self {
        Self {
            executor,
            policy,
            sink,
        }
    }
}

impl fmt::Debug for AsyncDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncDispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher for AsyncDispatcher {
    fn dispatch(&self, event: Arc<dyn Event>, subscribers: Vec<SubscriberHandle>) {
        let policy = Arc::clone(&self.policy);
        let sink = Arc::clone(&self.sink);
        trace!(subscriber_count = subscribers.len(), "Scheduling delivery");
        self.executor.execute(Box::new(move || {
            deliver_all(&*event, &subscribers, &*policy, &*sink);
        }));
    }
}
