//! Adapters layer - External system implementations.
//!
//! Implementations of the traits defined in `ports`.

mod runner;

pub use runner::{SystemRunner, DEFAULT_TIMEOUT};
