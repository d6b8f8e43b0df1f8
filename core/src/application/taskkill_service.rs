//! Process termination through `taskkill`.

use tracing::debug;

use super::invoke;
use crate::domain::TaskkillOptions;
use crate::error::Result;
use crate::ports::CommandRunner;

/// Runs `taskkill`.
pub struct TaskkillService<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> TaskkillService<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run taskkill with `options` and return its report, e.g.
    /// `SUCCESS: The process with PID 1234 has been terminated.`
    pub async fn kill(&self, options: &TaskkillOptions) -> Result<String> {
        let report = invoke(&self.runner, options).await?;
        debug!(selectors = options.selectors.len(), force = options.force, "taskkill succeeded");
        Ok(report)
    }

    /// Terminate one local process.
    pub async fn kill_pid(&self, pid: u32, force: bool) -> Result<String> {
        self.kill(&TaskkillOptions::new().pid(pid).force(force)).await
    }
}
