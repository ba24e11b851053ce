//! Event fixtures.

/// A simple event carrying a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping(pub u32);

/// A second event type, distinct from [`Ping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong(pub u32);

/// An event without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// An event tagged with its producer and sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequenced {
    /// Index of the producing thread or task.
    pub source: usize,
    /// Position in that producer's stream.
    pub sequence: usize,
}
