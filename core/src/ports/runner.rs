//! Command runner port (interface).

use crate::domain::CommandLine;
use crate::error::{Error, Result};

/// Raw result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run that printed `stdout`.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout of a successful run, or an invocation error.
    ///
    /// netstat and taskkill report some failures on stdout, so stdout is used
    /// as the reason when stderr is empty.
    pub fn into_stdout(self, command: &CommandLine) -> Result<String> {
        if self.is_success() {
            return Ok(self.stdout);
        }
        let message = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        let status = match self.status {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        let reason = if message.is_empty() {
            status
        } else {
            format!("{}: {}", status, message)
        };
        Err(Error::Invocation {
            command: command.to_string(),
            reason,
        })
    }
}

/// Port for running external commands.
///
/// Implementations execute the command without a shell and wait for it to
/// finish. A nonzero exit status is not an error at this level; callers
/// decide through [`CommandOutput::into_stdout`].
pub trait CommandRunner: Send + Sync {
    /// Run `command` and capture its output.
    fn run(
        &self,
        command: &CommandLine,
    ) -> impl std::future::Future<Output = Result<CommandOutput>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_stdout_success() {
        let line = CommandLine::new("netstat", vec!["-a".into()]);
        let out = CommandOutput::success("Active Connections").into_stdout(&line);
        assert_eq!(out.unwrap(), "Active Connections");
    }

    #[test]
    fn test_into_stdout_prefers_stderr() {
        let line = CommandLine::new("taskkill", vec!["/PID".into(), "1".into()]);
        let output = CommandOutput {
            status: Some(128),
            stdout: "ignored".into(),
            stderr: "ERROR: The process \"1\" not found.\r\n".into(),
        };
        match output.into_stdout(&line) {
            Err(Error::Invocation { command, reason }) => {
                assert_eq!(command, "taskkill /PID 1");
                assert_eq!(reason, "exit code 128: ERROR: The process \"1\" not found.");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_into_stdout_falls_back_to_stdout() {
        let line = CommandLine::new("netstat", vec!["-p".into(), "XYZ".into()]);
        let output = CommandOutput {
            status: Some(1),
            stdout: "Displays protocol statistics".into(),
            stderr: String::new(),
        };
        let err = output.into_stdout(&line).unwrap_err();
        assert!(err.to_string().contains("Displays protocol statistics"));
    }
}
