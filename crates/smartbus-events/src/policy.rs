//! Diagnostic sinks and exception policies.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, DeliveryFailure};
use crate::event::Event;
use crate::subscriber::SubscriberHandle;

/// Receives (message, raised-condition) diagnostics from the bus.
pub trait DiagnosticSink: Send + Sync {
    /// Record an error diagnostic.
    fn error(&self, message: &str, cause: &(dyn Error + 'static));
}

/// Sink that forwards diagnostics to `tracing` at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn error(&self, message: &str, cause: &(dyn Error + 'static)) {
        tracing::error!(error = %cause, "{message}");
    }
}

/// What was being delivered when a subscriber failed.
#[derive(Clone, Copy)]
pub struct FailureContext<'a> {
    /// The event being delivered.
    pub event: &'a dyn Event,
    /// The handle that failed.
    pub subscriber: &'a SubscriberHandle,
}

impl fmt::Debug for FailureContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureContext")
            .field("event", &self.event)
            .field("subscriber", &self.subscriber)
            .finish()
    }
}

/// Strategy invoked when a subscriber fails to handle an event.
///
/// An error returned (or a panic raised) here is itself reported to the
/// diagnostic sink; delivery to the remaining subscribers always continues.
pub trait ExceptionPolicy: Send + Sync {
    /// Handle one delivery failure.
    ///
    /// # Errors
    ///
    /// A returned error is reported to the bus's diagnostic sink.
    fn handle_failure(
        &self,
        failure: &DeliveryFailure,
        context: &FailureContext<'_>,
    ) -> Result<(), BoxError>;
}

/// Default policy: report every failure to the diagnostic sink and carry on.
#[derive(Clone)]
pub struct LoggingPolicy {
    sink: Arc<dyn DiagnosticSink>,
}

impl LoggingPolicy {
    /// Create a policy reporting to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    /// The message recorded for a failure.
    #[must_use]
    pub fn message(context: &FailureContext<'_>) -> String {
        format!(
            "dispatching event error, subscriber: {}, event: {:?}",
            context.subscriber, context.event
        )
    }
}

impl fmt::Debug for LoggingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingPolicy").finish_non_exhaustive()
    }
}

impl ExceptionPolicy for LoggingPolicy {
    fn handle_failure(
        &self,
        failure: &DeliveryFailure,
        context: &FailureContext<'_>,
    ) -> Result<(), BoxError> {
        self.sink.error(&Self::message(context), failure);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubscriberResult;
    use crate::subscriber::EventSubscriber;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Ping(u8);

    struct Quiet;

    impl EventSubscriber for Quiet {
        fn on_event(&self, _event: &dyn Event) -> SubscriberResult {
            Ok(())
        }

        fn name(&self) -> &str {
            "quiet"
        }
    }

    #[derive(Default)]
    struct Capture {
        lines: Mutex<Vec<(String, String)>>,
    }

    impl DiagnosticSink for Capture {
        fn error(&self, message: &str, cause: &(dyn Error + 'static)) {
            self.lines
                .lock()
                .unwrap()
                .push((message.to_string(), cause.to_string()));
        }
    }

    #[test]
    fn test_logging_policy_reports_to_sink() {
        let sink = Arc::new(Capture::default());
        let policy = LoggingPolicy::new(Arc::clone(&sink) as Arc<dyn DiagnosticSink>);
        let handle = SubscriberHandle::direct(Arc::from("orders"), Arc::new(Quiet));
        let event = Ping(9);
        let context = FailureContext {
            event: &event,
            subscriber: &handle,
        };

        policy
            .handle_failure(&DeliveryFailure::Failed("nope".into()), &context)
            .unwrap();

        let lines = sink.lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].0,
            "dispatching event error, subscriber: bus: orders, subscriber: quiet, event: Ping(9)"
        );
        assert_eq!(lines[0].1, "subscriber returned an error: nope");
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        TracingSink.error("message", &DeliveryFailure::Panicked("p".to_string()));
    }
}
