//! Test harness helpers.

use std::sync::Arc;

use smartbus_events::{AsyncDispatcher, DiagnosticSink, EventBus, Executor};
use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

use crate::mocks::{QueueExecutor, RecordingSink};

/// Create a temporary `.toml` file with the given content.
///
/// The file is removed when the returned `NamedTempFile` is dropped.
///
/// # Panics
///
/// Panics if the file cannot be created or written.
#[must_use]
pub fn test_config_file(content: &str) -> NamedTempFile {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

/// Create an immediate-dispatch bus reporting to a fresh [`RecordingSink`].
///
/// # Panics
///
/// Panics if `identifier` is blank.
#[must_use]
pub fn immediate_bus(identifier: &str) -> (EventBus, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let bus = EventBus::with_sink(identifier, Arc::clone(&sink) as Arc<dyn DiagnosticSink>)
        .expect("Failed to create bus");
    (bus, sink)
}

/// Create an asynchronous bus whose jobs wait in a [`QueueExecutor`] until
/// the test runs them.
///
/// # Panics
///
/// Panics if `identifier` is blank.
#[must_use]
pub fn queued_bus(identifier: &str) -> (EventBus, Arc<RecordingSink>, Arc<QueueExecutor>) {
    let sink = Arc::new(RecordingSink::new());
    let executor = Arc::new(QueueExecutor::new());
    let dispatcher = AsyncDispatcher::new(
        Arc::clone(&executor) as Arc<dyn Executor>,
        Arc::clone(&sink) as Arc<dyn DiagnosticSink>,
    );
    let bus = EventBus::new(identifier, Arc::new(dispatcher)).expect("Failed to create bus");
    (bus, sink, executor)
}

/// Set up test logging with the given filter.
///
/// Output goes through the test writer so it is captured per test.
/// Calling it more than once is harmless.
///
/// # Example
///
/// ```rust,ignore
/// use smartbus_test::setup_test_logging;
///
/// #[test]
/// fn my_test() {
///     setup_test_logging("smartbus_events=trace");
///     // ... test code
/// }
/// ```
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// Set up test logging with default filter (warn level).
pub fn setup_test_logging_default() {
    setup_test_logging("warn");
}
