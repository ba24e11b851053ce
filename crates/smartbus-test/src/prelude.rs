//! Prelude module - commonly used types for convenient import.
//!
//! Use `use smartbus_test::prelude::*;` to import the test helpers together
//! with the bus types they are used with.

pub use crate::fixtures::*;
pub use crate::harness::*;
pub use crate::mocks::*;

pub use smartbus_events::{EventBus, EventSubscriber, EventType};
