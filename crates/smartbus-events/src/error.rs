//! Error types for the event bus.

use std::any::Any;

use thiserror::Error;

/// Boxed error returned by subscribers and exception policies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of delivering one event to one subscriber.
pub type SubscriberResult = Result<(), BoxError>;

/// Errors surfaced to callers of registration, construction and post operations.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// A required value was missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No executor could be resolved for asynchronous dispatch.
    #[error("executor unavailable: {0}")]
    ExecutorUnavailable(String),

    /// The bus configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] smartbus_config::ConfigError),
}

/// Result type for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// A condition raised while invoking a subscriber.
///
/// Never propagated to the poster; always routed through the exception policy.
#[derive(Debug, Error)]
pub enum DeliveryFailure {
    /// The subscriber returned an error.
    #[error("subscriber returned an error: {0}")]
    Failed(#[source] BoxError),

    /// The subscriber panicked.
    #[error("subscriber panicked: {0}")]
    Panicked(String),
}

impl DeliveryFailure {
    /// Build a failure from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::Panicked(panic_message(payload))
    }

    /// Whether this failure came from a panic.
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let p: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(p.as_ref()), "boom");

        let p: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(p.as_ref()), "bang");

        let p: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(p.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_delivery_failure_display() {
        let failure = DeliveryFailure::Failed("disk full".into());
        assert_eq!(failure.to_string(), "subscriber returned an error: disk full");
        assert!(!failure.is_panic());

        let failure = DeliveryFailure::Panicked("oops".to_string());
        assert!(failure.is_panic());
        assert_eq!(failure.to_string(), "subscriber panicked: oops");
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = EventBusError::InvalidArgument("bus identifier must not be blank".to_string());
        assert_eq!(
            err.to_string(),
            "invalid argument: bus identifier must not be blank"
        );
    }
}
