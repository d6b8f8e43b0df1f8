//! Runs commands as child processes through `tokio::process`.

use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::CommandLine;
use crate::error::{Error, Result};
use crate::ports::{CommandOutput, CommandRunner};

/// Default time allowed for one command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes commands on the local machine.
///
/// The child is killed if it outlives `timeout`. Output is decoded lossily,
/// so bytes outside UTF-8 (OEM code pages) become replacement characters.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        debug!(command = %command, timeout_secs = self.timeout.as_secs(), "Running command");

        let child = Command::new(command.program())
            .args(command.args())
            .kill_on_drop(true)
            .output();

        let output = match timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(command = %command, error = %e, "Failed to start command");
                return Err(Error::Invocation {
                    command: command.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!(command = %command, "Command timed out");
                return Err(Error::Invocation {
                    command: command.to_string(),
                    reason: format!("timed out after {:?}", self.timeout),
                });
            }
        };

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(
            command = %command,
            status = ?result.status,
            stdout_bytes = output.stdout.len(),
            "Command finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_invocation_error() {
        let runner = SystemRunner::with_timeout(Duration::from_secs(5));
        let line = CommandLine::new("wincmd-no-such-program", vec!["-a".into()]);
        match runner.run(&line).await {
            Err(Error::Invocation { command, .. }) => {
                assert_eq!(command, "wincmd-no-such-program -a");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_command_times_out() {
        let runner = SystemRunner::with_timeout(Duration::from_millis(100));
        let line = CommandLine::new("sleep", vec!["5".into()]);

        let started = std::time::Instant::now();
        match runner.run(&line).await {
            Err(Error::Invocation { command, reason }) => {
                assert_eq!(command, "sleep 5");
                assert!(reason.contains("timed out"), "reason: {}", reason);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(windows)]
    #[tokio::test]
    async fn test_slow_command_times_out() {
        let runner = SystemRunner::with_timeout(Duration::from_millis(100));
        let line = CommandLine::new("ping", vec!["-n".into(), "10".into(), "127.0.0.1".into()]);

        match runner.run(&line).await {
            Err(Error::Invocation { reason, .. }) => {
                assert!(reason.contains("timed out"), "reason: {}", reason);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(SystemRunner::default().timeout(), DEFAULT_TIMEOUT);
    }
}
