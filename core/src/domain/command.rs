//! Command lines assembled from validated option values.

use std::fmt;

use crate::error::Result;

/// A program and its argument list, ready to hand to a runner.
///
/// Arguments are kept as separate strings and never go through a shell.
/// Arguments flagged as secret (passwords) are masked by `Display` and `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    secrets: Vec<usize>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            secrets: Vec::new(),
        }
    }

    /// Mark the arguments at `indices` as secret.
    pub fn with_secrets(mut self, indices: Vec<usize>) -> Self {
        self.secrets = indices;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn masked_args(&self) -> impl Iterator<Item = &str> {
        self.args.iter().enumerate().map(|(index, arg)| {
            if self.secrets.contains(&index) {
                "****"
            } else {
                arg.as_str()
            }
        })
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLine")
            .field("program", &self.program)
            .field("args", &self.masked_args().collect::<Vec<_>>())
            .finish()
    }
}

/// Renders the command as it would be typed in `cmd.exe`, quoting
/// arguments that contain spaces: `taskkill /FI "STATUS eq RUNNING"`.
impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for (index, arg) in self.args.iter().enumerate() {
            if self.secrets.contains(&index) {
                f.write_str(" ****")?;
            } else if arg.is_empty() || arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Typed options for one of the wrapped utilities.
///
/// `validate` and `args` are pure; `command_line` runs validation before
/// rendering, so every `CommandLine` it returns is valid.
pub trait CommandSpec {
    /// Executable name, resolved through `PATH`.
    const PROGRAM: &'static str;

    /// Check option combinations the utility would reject.
    fn validate(&self) -> Result<()>;

    /// Render the argument list. Does not validate.
    fn args(&self) -> Vec<String>;

    /// Indices into `args()` that hold secrets.
    fn secret_args(&self) -> Vec<usize> {
        Vec::new()
    }

    /// Validate, then render.
    fn command_line(&self) -> Result<CommandLine> {
        self.validate()?;
        Ok(CommandLine::new(Self::PROGRAM, self.args()).with_secrets(self.secret_args()))
    }
}
