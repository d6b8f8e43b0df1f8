//! Application layer - Use case services.
//!
//! Each service owns a [`CommandRunner`] and turns typed options into one
//! external-command call:
//! - validate and render the options into a [`CommandLine`]
//! - run it through the runner
//! - parse the captured output into domain types
//!
//! Nothing is cached; every call runs the command again.

mod netstat_service;
mod port_finder;
mod shutdown_service;
mod taskkill_service;
#[cfg(test)]
pub(crate) mod testing;

pub use netstat_service::NetstatService;
pub use port_finder::PortFinder;
pub use shutdown_service::ShutdownService;
pub use taskkill_service::TaskkillService;

use tracing::debug;

use crate::domain::{CommandLine, CommandSpec};
use crate::error::Result;
use crate::ports::CommandRunner;

/// Validate `spec`, run it and return stdout of a successful run.
async fn invoke<R, C>(runner: &R, spec: &C) -> Result<String>
where
    R: CommandRunner,
    C: CommandSpec,
{
    let line: CommandLine = spec.command_line()?;
    debug!(program = C::PROGRAM, command = %line, "Invoking");
    runner.run(&line).await?.into_stdout(&line)
}
