//! Ports layer - Trait definitions (interfaces).
//!
//! The application layer reaches the operating system only through these
//! traits. Implementations live in `adapters`; tests substitute mocks.

mod runner;

pub use runner::{CommandOutput, CommandRunner};
