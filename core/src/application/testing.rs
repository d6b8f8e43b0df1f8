//! Scripted runner for service tests.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::domain::CommandLine;
use crate::error::{Error, Result};
use crate::ports::{CommandOutput, CommandRunner};

/// Replays queued outputs in order and records every command it is given.
#[derive(Default)]
pub(crate) struct MockRunner {
    outputs: Mutex<VecDeque<CommandOutput>>,
    calls: Mutex<Vec<CommandLine>>,
}

impl MockRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, output: CommandOutput) -> Self {
        self.outputs.lock().push_back(output);
        self
    }

    pub(crate) fn respond_stdout(self, stdout: &str) -> Self {
        self.respond(CommandOutput::success(stdout))
    }

    /// Commands run so far, rendered with secrets masked.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|line| line.to_string()).collect()
    }

    pub(crate) fn raw_calls(&self) -> Vec<CommandLine> {
        self.calls.lock().clone()
    }
}

impl CommandRunner for MockRunner {
    async fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        self.calls.lock().push(command.clone());
        self.outputs
            .lock()
            .pop_front()
            .ok_or_else(|| Error::Invocation {
                command: command.to_string(),
                reason: "no scripted output left".to_string(),
            })
    }
}

/// `netstat -ano` capture shared by the port tests.
pub(crate) const LISTENING: &str = "
Active Connections

  Proto  Local Address          Foreign Address        State           PID
  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       1020
  TCP    127.0.0.1:5000         0.0.0.0:0              LISTENING       4242
  TCP    127.0.0.1:5001         0.0.0.0:0              LISTENING       4242
  TCP    192.168.1.20:5002      52.1.1.1:443           ESTABLISHED     5150
  TCP    [::]:445               [::]:0                 LISTENING       4
  UDP    0.0.0.0:5353           *:*                                    2212
  UDP    127.0.0.1:5002         *:*                                    2212
";
