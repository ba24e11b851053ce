//! SmartBus Test - shared test utilities for the SmartBus crates.
//!
//! This crate provides recording and failing subscribers, a capturing
//! diagnostic sink, a manually driven executor and a few event fixtures.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! smartbus-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use smartbus_test::prelude::*;
//!
//! #[test]
//! fn test_ping() {
//!     let (bus, sink) = immediate_bus("test");
//!     let recorder = RecordingSubscriber::shared("recorder");
//!     bus.register(recorder.clone(), EventType::of::<Ping>());
//!
//!     bus.post(Ping(1));
//!
//!     assert_eq!(recorder.received(), vec!["Ping(1)"]);
//!     assert!(sink.is_empty());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
