//! Configuration types.

use serde::{Deserialize, Serialize};
use smartbus_telemetry::{LogConfig, TelemetryResult};

/// How a bus delivers events to its subscribers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// On the posting thread, before `post` returns.
    #[default]
    Immediate,
    /// As one job per post on a caller-supplied executor.
    Async,
}

/// Dispatch section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Delivery strategy.
    #[serde(default)]
    pub mode: DispatchMode,
}

/// Configuration of one event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Identifier naming the bus; listeners may target it.
    pub identifier: String,
    /// Dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Optional logging setup for processes that own the bus.
    ///
    /// Building a bus never installs it; call [`BusConfig::init_logging`].
    #[serde(default)]
    pub log: Option<LogConfig>,
}

impl BusConfig {
    /// Configuration with immediate dispatch and no logging section.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            dispatch: DispatchConfig::default(),
            log: None,
        }
    }

    /// Set the dispatch mode.
    #[must_use]
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch.mode = mode;
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = Some(log);
        self
    }

    /// Install the `[log]` section as the global `tracing` subscriber.
    ///
    /// Returns `Ok(false)` when the section is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the section is invalid or a global subscriber is
    /// already installed.
    pub fn init_logging(&self) -> TelemetryResult<bool> {
        match &self.log {
            Some(log) => smartbus_telemetry::setup_logging(log).map(|()| true),
            None => Ok(false),
        }
    }
}
