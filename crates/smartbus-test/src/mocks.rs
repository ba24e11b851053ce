//! Mock subscribers, sinks and executors.
//!
//! All mocks record what happened to them behind a mutex and can be shared
//! across threads. Lock poisoning is ignored so a panicking subscriber in
//! one test never hides the recordings.

use std::collections::VecDeque;
use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use smartbus_events::{DiagnosticSink, Event, EventSubscriber, Executor, Job, SubscriberResult};
use tracing::trace;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// Ordered log shared by several subscribers, for cross-subscriber ordering
/// assertions. Entries read `"{subscriber}:{event:?}"`.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    /// Create an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        lock(&self.entries).push(entry.into());
    }

    /// Snapshot of all entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

/// Subscriber recording the `Debug` form of every event it receives.
#[derive(Debug)]
pub struct RecordingSubscriber {
    name: String,
    received: Mutex<Vec<String>>,
    journal: Option<Journal>,
}

impl RecordingSubscriber {
    /// Create a recorder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            received: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    /// Create a recorder that also appends to `journal`.
    #[must_use]
    pub fn with_journal(name: impl Into<String>, journal: &Journal) -> Self {
        Self {
            journal: Some(journal.clone()),
            ..Self::new(name)
        }
    }

    /// Create a recorder behind an `Arc`.
    #[must_use]
    pub fn shared(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(name))
    }

    /// Events received so far, oldest first.
    #[must_use]
    pub fn received(&self) -> Vec<String> {
        lock(&self.received).clone()
    }

    /// Number of events received.
    #[must_use]
    pub fn count(&self) -> usize {
        lock(&self.received).len()
    }
}

impl EventSubscriber for RecordingSubscriber {
    fn on_event(&self, event: &dyn Event) -> SubscriberResult {
        let rendered = format!("{event:?}");
        if let Some(journal) = &self.journal {
            journal.record(format!("{}:{rendered}", self.name));
        }
        lock(&self.received).push(rendered);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Subscriber that returns an error for every event.
#[derive(Debug)]
pub struct FailingSubscriber {
    name: String,
    message: String,
    calls: AtomicUsize,
}

impl FailingSubscriber {
    /// Create a subscriber failing with `message`.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many events it was handed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EventSubscriber for FailingSubscriber {
    fn on_event(&self, _event: &dyn Event) -> SubscriberResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.message.clone().into())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Subscriber that panics for every event.
#[derive(Debug)]
pub struct PanickingSubscriber {
    name: String,
    message: String,
    calls: AtomicUsize,
}

impl PanickingSubscriber {
    /// Create a subscriber panicking with `message`.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many events it was handed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EventSubscriber for PanickingSubscriber {
    fn on_event(&self, _event: &dyn Event) -> SubscriberResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("{}", self.message);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Diagnostic sink
// ---------------------------------------------------------------------------

/// One diagnostic captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The message passed by the bus.
    pub message: String,
    /// `Display` form of the cause.
    pub cause: String,
}

/// Sink capturing every diagnostic.
#[derive(Debug, Default)]
pub struct RecordingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, oldest first.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        lock(&self.diagnostics).clone()
    }

    /// Recorded messages only.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        lock(&self.diagnostics)
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }

    /// Number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.diagnostics).len()
    }

    /// Whether nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.diagnostics).is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn error(&self, message: &str, cause: &(dyn Error + 'static)) {
        lock(&self.diagnostics).push(Diagnostic {
            message: message.to_string(),
            cause: cause.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Executor queueing jobs until the test runs them.
///
/// Jobs run on the calling thread in submission order, outside the queue
/// lock, so a job may post again.
#[derive(Default)]
pub struct QueueExecutor {
    jobs: Mutex<VecDeque<Job>>,
    submitted: AtomicUsize,
}

impl QueueExecutor {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.jobs).len()
    }

    /// Jobs ever submitted.
    #[must_use]
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Run the oldest job. Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        let job = lock(&self.jobs).pop_front();
        match job {
            Some(job) => {
                trace!(pending = self.pending(), "Running queued job");
                job();
                true
            },
            None => false,
        }
    }

    /// Run jobs until the queue is empty, including jobs queued meanwhile.
    /// Returns how many ran.
    pub fn run_all(&self) -> usize {
        std::iter::from_fn(|| self.run_next().then_some(())).count()
    }
}

impl std::fmt::Debug for QueueExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueExecutor")
            .field("pending", &self.pending())
            .field("submitted", &self.submitted())
            .finish()
    }
}

impl Executor for QueueExecutor {
    fn execute(&self, job: Job) {
        let submitted = self.submitted.fetch_add(1, Ordering::SeqCst);
        trace!(submitted, "Job queued");
        lock(&self.jobs).push_back(job);
    }
}
