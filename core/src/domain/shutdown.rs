//! Typed options for the `shutdown` utility.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::command::CommandSpec;
use crate::error::{Error, Result};

/// Longest delay `/t` accepts: ten years, in seconds.
pub const MAX_TIMEOUT_SECS: u32 = 315_360_000;
/// Longest comment `/c` accepts.
pub const MAX_COMMENT_CHARS: usize = 512;

/// What `shutdown` should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownAction {
    /// `/l`
    Logoff,
    /// `/s`
    Shutdown,
    /// `/sg`: shut down, then restart registered applications on next boot.
    ShutdownAndRestartApps,
    /// `/r`
    Restart,
    /// `/g`: restart, then restart registered applications.
    RestartAndRestartApps,
    /// `/a`: abort a pending shutdown.
    Abort,
    /// `/p`: turn off immediately, no warning.
    PowerOff,
    /// `/h`
    Hibernate,
    /// `/s /hybrid`: shut down and prepare for fast startup.
    Hybrid,
    /// `/e`: document the reason for an unexpected shutdown.
    DocumentReason,
}

impl ShutdownAction {
    fn switches(&self) -> &'static [&'static str] {
        match self {
            ShutdownAction::Logoff => &["/l"],
            ShutdownAction::Shutdown => &["/s"],
            ShutdownAction::ShutdownAndRestartApps => &["/sg"],
            ShutdownAction::Restart => &["/r"],
            ShutdownAction::RestartAndRestartApps => &["/g"],
            ShutdownAction::Abort => &["/a"],
            ShutdownAction::PowerOff => &["/p"],
            ShutdownAction::Hibernate => &["/h"],
            ShutdownAction::Hybrid => &["/s", "/hybrid"],
            ShutdownAction::DocumentReason => &["/e"],
        }
    }

    fn is_power_cycle(&self) -> bool {
        matches!(
            self,
            ShutdownAction::Shutdown
                | ShutdownAction::ShutdownAndRestartApps
                | ShutdownAction::Restart
                | ShutdownAction::RestartAndRestartApps
                | ShutdownAction::Hybrid
        )
    }
}

/// Category of a `/d` reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    Unplanned,
    /// `p:`
    Planned,
    /// `u:`
    UserDefined,
}

/// A `/d [p:|u:]major:minor` reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShutdownReason {
    pub kind: ReasonKind,
    pub major: u8,
    pub minor: u16,
}

impl ShutdownReason {
    pub fn new(kind: ReasonKind, major: u8, minor: u16) -> Self {
        Self { kind, major, minor }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            ReasonKind::Unplanned => "",
            ReasonKind::Planned => "p:",
            ReasonKind::UserDefined => "u:",
        };
        write!(f, "{}{}:{}", prefix, self.major, self.minor)
    }
}

impl FromStr for ShutdownReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::invalid(format!(
                "reason {:?} is not of the form [p:|u:]major:minor",
                s
            ))
        };
        let lowered = s.trim().to_ascii_lowercase();
        let (kind, code) = if let Some(code) = lowered.strip_prefix("p:") {
            (ReasonKind::Planned, code)
        } else if let Some(code) = lowered.strip_prefix("u:") {
            (ReasonKind::UserDefined, code)
        } else {
            (ReasonKind::Unplanned, lowered.as_str())
        };
        let (major, minor) = code.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            kind,
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

/// One `shutdown` invocation.
///
/// ```
/// use wincmd_core::{CommandSpec, ShutdownAction, ShutdownOptions};
///
/// let restart = ShutdownOptions::new(ShutdownAction::Restart).with_timeout(60);
/// assert_eq!(restart.command_line().unwrap().to_string(), "shutdown /r /t 60");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownOptions {
    pub action: ShutdownAction,
    /// `/f`: close running applications without warning.
    pub force: bool,
    /// `/t`: delay in seconds.
    pub timeout: Option<u32>,
    /// `/c`
    pub comment: Option<String>,
    /// `/d`
    pub reason: Option<ShutdownReason>,
    /// `/m \\computer`
    pub remote: Option<String>,
    /// `/fw`: boot into firmware setup.
    pub firmware: bool,
    /// `/o`: boot into the advanced boot options menu.
    pub advanced_boot: bool,
}

impl ShutdownOptions {
    pub fn new(action: ShutdownAction) -> Self {
        Self {
            action,
            force: false,
            timeout: None,
            comment: None,
            reason: None,
            remote: None,
            firmware: false,
            advanced_boot: false,
        }
    }

    pub fn with_force(mut self, enabled: bool) -> Self {
        self.force = enabled;
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_reason(mut self, reason: ShutdownReason) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Target computer, with or without the leading `\\`.
    pub fn with_remote(mut self, computer: impl Into<String>) -> Self {
        self.remote = Some(computer.into());
        self
    }

    pub fn with_firmware(mut self, enabled: bool) -> Self {
        self.firmware = enabled;
        self
    }

    pub fn with_advanced_boot(mut self, enabled: bool) -> Self {
        self.advanced_boot = enabled;
        self
    }

    fn reject(&self, present: bool, switch: &str) -> Result<()> {
        if present {
            return Err(Error::invalid(format!(
                "{} cannot be combined with {}",
                self.action.switches().join(" "),
                switch
            )));
        }
        Ok(())
    }
}

impl CommandSpec for ShutdownOptions {
    const PROGRAM: &'static str = "shutdown";

    fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.timeout {
            if timeout > MAX_TIMEOUT_SECS {
                return Err(Error::invalid(format!(
                    "timeout {}s exceeds the maximum of {}s",
                    timeout, MAX_TIMEOUT_SECS
                )));
            }
        }
        if let Some(comment) = &self.comment {
            if comment.chars().count() > MAX_COMMENT_CHARS {
                return Err(Error::invalid(format!(
                    "comment exceeds {} characters",
                    MAX_COMMENT_CHARS
                )));
            }
        }
        if let Some(remote) = &self.remote {
            if remote.trim_start_matches('\\').trim().is_empty() {
                return Err(Error::invalid("remote computer name is empty"));
            }
        }
        if self.advanced_boot && self.action != ShutdownAction::Restart {
            return Err(Error::invalid("/o can only be combined with /r"));
        }
        if self.firmware && !self.action.is_power_cycle() {
            return Err(Error::invalid(
                "/fw can only be combined with a shutdown or restart",
            ));
        }

        match self.action {
            ShutdownAction::Logoff => {
                self.reject(self.remote.is_some(), "/m")?;
                self.reject(self.timeout.is_some(), "/t")?;
            }
            ShutdownAction::Abort => {
                self.reject(self.force, "/f")?;
                self.reject(self.timeout.is_some(), "/t")?;
                self.reject(self.comment.is_some(), "/c")?;
                self.reject(self.reason.is_some(), "/d")?;
            }
            ShutdownAction::PowerOff | ShutdownAction::Hibernate => {
                self.reject(self.remote.is_some(), "/m")?;
                self.reject(self.timeout.is_some(), "/t")?;
                self.reject(self.reason.is_some(), "/d")?;
                self.reject(self.comment.is_some(), "/c")?;
            }
            ShutdownAction::Shutdown
            | ShutdownAction::ShutdownAndRestartApps
            | ShutdownAction::Restart
            | ShutdownAction::RestartAndRestartApps
            | ShutdownAction::Hybrid
            | ShutdownAction::DocumentReason => {}
        }
        Ok(())
    }

    fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = self
            .action
            .switches()
            .iter()
            .map(|switch| switch.to_string())
            .collect();

        if self.firmware {
            args.push("/fw".to_string());
        }
        if self.advanced_boot {
            args.push("/o".to_string());
        }
        if self.force {
            args.push("/f".to_string());
        }
        if let Some(remote) = &self.remote {
            args.push("/m".to_string());
            args.push(format!("\\\\{}", remote.trim_start_matches('\\')));
        }
        if let Some(timeout) = self.timeout {
            args.push("/t".to_string());
            args.push(timeout.to_string());
        }
        if let Some(reason) = &self.reason {
            args.push("/d".to_string());
            args.push(reason.to_string());
        }
        if let Some(comment) = &self.comment {
            args.push("/c".to_string());
            args.push(comment.clone());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_parsing() {
        let planned: ShutdownReason = "p:4:1".parse().unwrap();
        assert_eq!(planned, ShutdownReason::new(ReasonKind::Planned, 4, 1));
        assert_eq!(planned.to_string(), "p:4:1");

        let unplanned: ShutdownReason = "2:17".parse().unwrap();
        assert_eq!(unplanned.kind, ReasonKind::Unplanned);
        assert_eq!(unplanned.to_string(), "2:17");

        assert_eq!("U:0:0".parse::<ShutdownReason>().unwrap().kind, ReasonKind::UserDefined);
        assert!("p:4".parse::<ShutdownReason>().is_err());
        assert!("p:300:1".parse::<ShutdownReason>().is_err());
    }

    #[test]
    fn test_full_restart() {
        let restart = ShutdownOptions::new(ShutdownAction::Restart)
            .with_force(true)
            .with_remote("srv01")
            .with_timeout(30)
            .with_reason(ShutdownReason::new(ReasonKind::Planned, 2, 4))
            .with_comment("patch night");
        assert_eq!(
            restart.args(),
            vec!["/r", "/f", "/m", "\\\\srv01", "/t", "30", "/d", "p:2:4", "/c", "patch night"]
        );
        assert_eq!(
            restart.command_line().unwrap().to_string(),
            r#"shutdown /r /f /m \\srv01 /t 30 /d p:2:4 /c "patch night""#
        );
    }

    #[test]
    fn test_remote_prefix_not_doubled() {
        let abort = ShutdownOptions::new(ShutdownAction::Abort).with_remote("\\\\srv01");
        assert_eq!(abort.args(), vec!["/a", "/m", "\\\\srv01"]);
        assert!(abort.validate().is_ok());
    }

    #[test]
    fn test_hybrid_and_firmware() {
        let hybrid = ShutdownOptions::new(ShutdownAction::Hybrid).with_timeout(0);
        assert_eq!(hybrid.args(), vec!["/s", "/hybrid", "/t", "0"]);

        let firmware = ShutdownOptions::new(ShutdownAction::Restart).with_firmware(true);
        assert_eq!(firmware.args(), vec!["/r", "/fw"]);
        assert!(ShutdownOptions::new(ShutdownAction::Logoff)
            .with_firmware(true)
            .validate()
            .is_err());
    }

    #[test]
    fn test_limits() {
        assert!(ShutdownOptions::new(ShutdownAction::Shutdown)
            .with_timeout(MAX_TIMEOUT_SECS)
            .validate()
            .is_ok());
        assert!(ShutdownOptions::new(ShutdownAction::Shutdown)
            .with_timeout(MAX_TIMEOUT_SECS + 1)
            .validate()
            .is_err());
        assert!(ShutdownOptions::new(ShutdownAction::Shutdown)
            .with_comment("x".repeat(MAX_COMMENT_CHARS + 1))
            .validate()
            .is_err());
    }

    #[test]
    fn test_incompatible_switches() {
        assert!(ShutdownOptions::new(ShutdownAction::Shutdown)
            .with_advanced_boot(true)
            .validate()
            .is_err());
        assert!(ShutdownOptions::new(ShutdownAction::Restart)
            .with_advanced_boot(true)
            .validate()
            .is_ok());
        assert!(ShutdownOptions::new(ShutdownAction::Logoff)
            .with_remote("srv")
            .validate()
            .is_err());
        assert!(ShutdownOptions::new(ShutdownAction::Abort)
            .with_timeout(5)
            .validate()
            .is_err());
        assert!(matches!(
            ShutdownOptions::new(ShutdownAction::Hibernate)
                .with_comment("bye")
                .command_line(),
            Err(Error::InvalidParameter(_))
        ));
    }
}
