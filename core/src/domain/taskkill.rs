//! Typed options for the `taskkill` utility.

use std::fmt;
use std::str::FromStr;

use super::command::CommandSpec;
use crate::error::{Error, Result};

/// Comparison operator of a `/FI` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::Ge => "ge",
            FilterOperator::Le => "le",
        }
    }

    fn is_equality(&self) -> bool {
        matches!(self, FilterOperator::Eq | FilterOperator::Ne)
    }
}

impl FromStr for FilterOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Ok(FilterOperator::Eq),
            "ne" => Ok(FilterOperator::Ne),
            "gt" => Ok(FilterOperator::Gt),
            "lt" => Ok(FilterOperator::Lt),
            "ge" => Ok(FilterOperator::Ge),
            "le" => Ok(FilterOperator::Le),
            _ => Err(Error::invalid(format!("unknown filter operator {:?}", s))),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of the `STATUS` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessStatus {
    Running,
    NotResponding,
    Unknown,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Running => "RUNNING",
            ProcessStatus::NotResponding => "NOT RESPONDING",
            ProcessStatus::Unknown => "UNKNOWN",
        }
    }
}

impl FromStr for ProcessStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RUNNING" => Ok(ProcessStatus::Running),
            "NOT RESPONDING" => Ok(ProcessStatus::NotResponding),
            "UNKNOWN" => Ok(ProcessStatus::Unknown),
            _ => Err(Error::invalid(format!(
                "invalid STATUS value {:?} (expected RUNNING, NOT RESPONDING or UNKNOWN)",
                s
            ))),
        }
    }
}

/// A `/FI "NAME op value"` process filter.
///
/// String filters accept only `eq` and `ne`; numeric filters accept every
/// operator. Build one directly or parse it from its textual form:
///
/// ```
/// use wincmd_core::ProcessFilter;
///
/// let filter: ProcessFilter = "MEMUSAGE gt 10240".parse().unwrap();
/// assert_eq!(filter.to_string(), "MEMUSAGE gt 10240");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessFilter {
    Status {
        op: FilterOperator,
        status: ProcessStatus,
    },
    ImageName {
        op: FilterOperator,
        name: String,
    },
    Username {
        op: FilterOperator,
        domain: Option<String>,
        user: String,
    },
    Services {
        op: FilterOperator,
        name: String,
    },
    WindowTitle {
        op: FilterOperator,
        title: String,
    },
    Modules {
        op: FilterOperator,
        name: String,
    },
    Pid {
        op: FilterOperator,
        pid: u32,
    },
    Session {
        op: FilterOperator,
        session: u32,
    },
    /// Memory usage in kilobytes.
    MemUsage {
        op: FilterOperator,
        kilobytes: u64,
    },
    CpuTime {
        op: FilterOperator,
        hours: u32,
        minutes: u8,
        seconds: u8,
    },
}

impl ProcessFilter {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessFilter::Status { .. } => "STATUS",
            ProcessFilter::ImageName { .. } => "IMAGENAME",
            ProcessFilter::Username { .. } => "USERNAME",
            ProcessFilter::Services { .. } => "SERVICES",
            ProcessFilter::WindowTitle { .. } => "WINDOWTITLE",
            ProcessFilter::Modules { .. } => "MODULES",
            ProcessFilter::Pid { .. } => "PID",
            ProcessFilter::Session { .. } => "SESSION",
            ProcessFilter::MemUsage { .. } => "MEMUSAGE",
            ProcessFilter::CpuTime { .. } => "CPUTIME",
        }
    }

    pub fn operator(&self) -> FilterOperator {
        match self {
            ProcessFilter::Status { op, .. }
            | ProcessFilter::ImageName { op, .. }
            | ProcessFilter::Username { op, .. }
            | ProcessFilter::Services { op, .. }
            | ProcessFilter::WindowTitle { op, .. }
            | ProcessFilter::Modules { op, .. }
            | ProcessFilter::Pid { op, .. }
            | ProcessFilter::Session { op, .. }
            | ProcessFilter::MemUsage { op, .. }
            | ProcessFilter::CpuTime { op, .. } => *op,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self,
            ProcessFilter::Pid { .. }
                | ProcessFilter::Session { .. }
                | ProcessFilter::MemUsage { .. }
                | ProcessFilter::CpuTime { .. }
        )
    }

    /// The value as taskkill expects it.
    pub fn value(&self) -> String {
        match self {
            ProcessFilter::Status { status, .. } => status.as_str().to_string(),
            ProcessFilter::Username { domain, user, .. } => match domain {
                Some(domain) => format!("{}\\{}", domain, user),
                None => user.clone(),
            },
            ProcessFilter::ImageName { name, .. }
            | ProcessFilter::Services { name, .. }
            | ProcessFilter::Modules { name, .. } => name.clone(),
            ProcessFilter::WindowTitle { title, .. } => title.clone(),
            ProcessFilter::Pid { pid, .. } => pid.to_string(),
            ProcessFilter::Session { session, .. } => session.to_string(),
            ProcessFilter::MemUsage { kilobytes, .. } => kilobytes.to_string(),
            ProcessFilter::CpuTime {
                hours,
                minutes,
                seconds,
                ..
            } => format!("{:02}:{:02}:{:02}", hours, minutes, seconds),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.is_numeric() && !self.operator().is_equality() {
            return Err(Error::invalid(format!(
                "invalid '{}' operator for {} filter (expected eq or ne)",
                self.operator(),
                self.name()
            )));
        }
        match self {
            ProcessFilter::ImageName { name: value, .. }
            | ProcessFilter::Services { name: value, .. }
            | ProcessFilter::Modules { name: value, .. }
            | ProcessFilter::WindowTitle { title: value, .. }
            | ProcessFilter::Username { user: value, .. }
                if value.trim().is_empty() =>
            {
                Err(Error::invalid(format!("{} filter value is empty", self.name())))
            }
            ProcessFilter::Username {
                domain: Some(domain),
                ..
            } if domain.trim().is_empty() => {
                Err(Error::invalid("USERNAME filter domain is empty"))
            }
            ProcessFilter::CpuTime {
                minutes, seconds, ..
            } if *minutes >= 60 || *seconds >= 60 => Err(Error::invalid(format!(
                "CPUTIME {} has minutes or seconds above 59",
                self.value()
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ProcessFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name(), self.operator(), self.value())
    }
}

/// Parses `"NAME op value"`; the value may contain spaces.
impl FromStr for ProcessFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().splitn(3, char::is_whitespace);
        let (Some(name), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::invalid(format!(
                "filter {:?} is not of the form \"NAME op value\"",
                s
            )));
        };
        let op: FilterOperator = op.parse()?;
        let value = value.trim();

        let number = |value: &str| {
            value
                .parse::<u64>()
                .map_err(|_| Error::invalid(format!("{} filter expects a number, got {:?}", name, value)))
        };
        let small = |value: &str| {
            u32::try_from(number(value)?)
                .map_err(|_| Error::invalid(format!("{} filter value {} is too large", name, value)))
        };

        let filter = match name.to_ascii_uppercase().as_str() {
            "STATUS" => ProcessFilter::Status {
                op,
                status: value.parse()?,
            },
            "IMAGENAME" => ProcessFilter::ImageName {
                op,
                name: value.to_string(),
            },
            "USERNAME" => match value.split_once('\\') {
                Some((domain, user)) => ProcessFilter::Username {
                    op,
                    domain: Some(domain.to_string()),
                    user: user.to_string(),
                },
                None => ProcessFilter::Username {
                    op,
                    domain: None,
                    user: value.to_string(),
                },
            },
            "SERVICES" => ProcessFilter::Services {
                op,
                name: value.to_string(),
            },
            "WINDOWTITLE" => ProcessFilter::WindowTitle {
                op,
                title: value.to_string(),
            },
            "MODULES" => ProcessFilter::Modules {
                op,
                name: value.to_string(),
            },
            "PID" => ProcessFilter::Pid {
                op,
                pid: small(value)?,
            },
            "SESSION" => ProcessFilter::Session {
                op,
                session: small(value)?,
            },
            "MEMUSAGE" => ProcessFilter::MemUsage {
                op,
                kilobytes: number(value)?,
            },
            "CPUTIME" => {
                let fields: Vec<&str> = value.split(':').collect();
                let [hours, minutes, seconds] = fields[..] else {
                    return Err(Error::invalid(format!(
                        "CPUTIME value {:?} is not hh:mm:ss",
                        value
                    )));
                };
                let component = |part: &str| {
                    part.parse::<u8>()
                        .map_err(|_| Error::invalid(format!("CPUTIME value {:?} is not hh:mm:ss", value)))
                };
                ProcessFilter::CpuTime {
                    op,
                    hours: small(hours)?,
                    minutes: component(minutes)?,
                    seconds: component(seconds)?,
                }
            }
            _ => return Err(Error::invalid(format!("unknown filter {:?}", name))),
        };
        filter.validate()?;
        Ok(filter)
    }
}

/// Password handling for `/U`.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Password {
    /// No `/P` switch.
    #[default]
    None,
    /// Bare `/P`: taskkill prompts for it.
    Prompt,
    /// `/P secret`.
    Given(String),
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Password::None => f.write_str("None"),
            Password::Prompt => f.write_str("Prompt"),
            Password::Given(_) => f.write_str("Given(****)"),
        }
    }
}

/// Credentials used on a remote system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub username: String,
    pub domain: Option<String>,
    pub password: Password,
}

impl UserContext {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            domain: None,
            password: Password::None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_password(mut self, password: Password) -> Self {
        self.password = password;
        self
    }

    fn qualified_name(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}\\{}", domain, self.username),
            None => self.username.clone(),
        }
    }
}

/// `/S system`, optionally with `/U` credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSystem {
    pub system: String,
    pub user: Option<UserContext>,
}

impl RemoteSystem {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: None,
        }
    }

    pub fn with_user(mut self, user: UserContext) -> Self {
        self.user = Some(user);
        self
    }
}

/// Which processes to terminate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// `/PID n`
    Pid(u32),
    /// `/IM name`, `*` allowed as a wildcard.
    ImageName(String),
    /// `/FI "NAME op value"`
    Filter(ProcessFilter),
}

/// One `taskkill` invocation.
///
/// ```
/// use wincmd_core::{CommandSpec, TaskkillOptions};
///
/// let kill = TaskkillOptions::new().pid(1234).force(true);
/// assert_eq!(kill.command_line().unwrap().to_string(), "taskkill /PID 1234 /F");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskkillOptions {
    pub remote: Option<RemoteSystem>,
    pub selectors: Vec<Selector>,
    /// `/F`
    pub force: bool,
    /// `/T`: also terminate child processes.
    pub tree: bool,
}

impl TaskkillOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remote(mut self, remote: RemoteSystem) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn select(mut self, selector: Selector) -> Self {
        self.selectors.push(selector);
        self
    }

    pub fn pid(self, pid: u32) -> Self {
        self.select(Selector::Pid(pid))
    }

    pub fn image(self, name: impl Into<String>) -> Self {
        self.select(Selector::ImageName(name.into()))
    }

    pub fn filter(self, filter: ProcessFilter) -> Self {
        self.select(Selector::Filter(filter))
    }

    pub fn force(mut self, enabled: bool) -> Self {
        self.force = enabled;
        self
    }

    pub fn tree(mut self, enabled: bool) -> Self {
        self.tree = enabled;
        self
    }

    fn has_filter(&self) -> bool {
        self.selectors
            .iter()
            .any(|selector| matches!(selector, Selector::Filter(_)))
    }

    /// Argument list plus the index of a given password, if any.
    fn render(&self) -> (Vec<String>, Option<usize>) {
        let mut args = Vec::new();
        let mut secret = None;

        if let Some(remote) = &self.remote {
            args.push("/S".to_string());
            args.push(remote.system.clone());
            if let Some(user) = &remote.user {
                args.push("/U".to_string());
                args.push(user.qualified_name());
                match &user.password {
                    Password::None => {}
                    Password::Prompt => args.push("/P".to_string()),
                    Password::Given(password) => {
                        args.push("/P".to_string());
                        secret = Some(args.len());
                        args.push(password.clone());
                    }
                }
            }
        }

        for selector in &self.selectors {
            match selector {
                Selector::Pid(pid) => {
                    args.push("/PID".to_string());
                    args.push(pid.to_string());
                }
                Selector::ImageName(name) => {
                    args.push("/IM".to_string());
                    args.push(name.clone());
                }
                Selector::Filter(filter) => {
                    args.push("/FI".to_string());
                    args.push(filter.to_string());
                }
            }
        }

        if self.tree {
            args.push("/T".to_string());
        }
        if self.force {
            args.push("/F".to_string());
        }
        (args, secret)
    }
}

impl CommandSpec for TaskkillOptions {
    const PROGRAM: &'static str = "taskkill";

    fn validate(&self) -> Result<()> {
        if self.selectors.is_empty() {
            return Err(Error::invalid(
                "taskkill needs at least one /PID, /IM or /FI selector",
            ));
        }

        if let Some(remote) = &self.remote {
            if remote.system.trim().is_empty() {
                return Err(Error::invalid("remote system name is empty"));
            }
            if let Some(user) = &remote.user {
                if user.username.trim().is_empty() {
                    return Err(Error::invalid("username is empty"));
                }
                if matches!(&user.domain, Some(domain) if domain.trim().is_empty()) {
                    return Err(Error::invalid("domain is empty"));
                }
                if matches!(&user.password, Password::Given(password) if password.is_empty()) {
                    return Err(Error::invalid(
                        "password is empty; use Password::Prompt to be asked for it",
                    ));
                }
            }
        }

        for selector in &self.selectors {
            match selector {
                Selector::Pid(_) => {}
                Selector::ImageName(name) => {
                    if name.trim().is_empty() {
                        return Err(Error::invalid("image name is empty"));
                    }
                    if name.contains('*') && !self.has_filter() {
                        return Err(Error::invalid(format!(
                            "wildcard image name {:?} requires at least one /FI filter",
                            name
                        )));
                    }
                }
                Selector::Filter(filter) => filter.validate()?,
            }
        }
        Ok(())
    }

    fn args(&self) -> Vec<String> {
        self.render().0
    }

    fn secret_args(&self) -> Vec<usize> {
        self.render().1.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_round_trips_through_text() {
        for text in [
            "STATUS eq NOT RESPONDING",
            "IMAGENAME ne notepad.exe",
            "USERNAME eq CORP\\alice",
            "WINDOWTITLE eq Untitled - Notepad",
            "PID ge 1000",
            "SESSION eq 0",
            "MEMUSAGE gt 10240",
            "CPUTIME gt 00:30:00",
        ] {
            let filter: ProcessFilter = text.parse().unwrap();
            assert_eq!(filter.to_string(), text);
        }
    }

    #[test]
    fn test_filter_operator_restrictions() {
        assert!(matches!(
            "STATUS gt RUNNING".parse::<ProcessFilter>(),
            Err(Error::InvalidParameter(_))
        ));
        assert!("WINDOWTITLE lt x".parse::<ProcessFilter>().is_err());
        assert!("MEMUSAGE le 100".parse::<ProcessFilter>().is_ok());
    }

    #[test]
    fn test_filter_value_errors() {
        assert!("STATUS eq SLEEPING".parse::<ProcessFilter>().is_err());
        assert!("PID eq abc".parse::<ProcessFilter>().is_err());
        assert!("CPUTIME gt 00:60:00".parse::<ProcessFilter>().is_err());
        assert!("CPUTIME gt 1:2".parse::<ProcessFilter>().is_err());
        assert!("COLOR eq red".parse::<ProcessFilter>().is_err());
        assert!("STATUS eq".parse::<ProcessFilter>().is_err());
    }

    #[test]
    fn test_pid_and_flags() {
        let kill = TaskkillOptions::new().pid(1234).pid(5678).tree(true).force(true);
        assert_eq!(
            kill.args(),
            vec!["/PID", "1234", "/PID", "5678", "/T", "/F"]
        );
    }

    #[test]
    fn test_filter_is_one_argument() {
        let kill = TaskkillOptions::new().filter(ProcessFilter::Status {
            op: FilterOperator::Eq,
            status: ProcessStatus::NotResponding,
        });
        let line = kill.command_line().unwrap();
        assert_eq!(line.args(), ["/FI", "STATUS eq NOT RESPONDING"]);
        assert_eq!(line.to_string(), r#"taskkill /FI "STATUS eq NOT RESPONDING""#);
    }

    #[test]
    fn test_remote_credentials_are_masked() {
        let kill = TaskkillOptions::new()
            .remote(
                RemoteSystem::new("srv01").with_user(
                    UserContext::new("admin")
                        .with_domain("CORP")
                        .with_password(Password::Given("s3cret".into())),
                ),
            )
            .image("notepad.exe");
        let line = kill.command_line().unwrap();
        assert_eq!(
            line.args(),
            ["/S", "srv01", "/U", "CORP\\admin", "/P", "s3cret", "/IM", "notepad.exe"]
        );
        assert_eq!(
            line.to_string(),
            "taskkill /S srv01 /U CORP\\admin /P **** /IM notepad.exe"
        );
        assert!(!format!("{:?}", kill).contains("s3cret"));
    }

    #[test]
    fn test_prompt_password() {
        let kill = TaskkillOptions::new()
            .remote(
                RemoteSystem::new("srv01")
                    .with_user(UserContext::new("admin").with_password(Password::Prompt)),
            )
            .pid(4);
        assert_eq!(kill.args(), vec!["/S", "srv01", "/U", "admin", "/P", "/PID", "4"]);
        assert!(kill.secret_args().is_empty());
    }

    #[test]
    fn test_validation() {
        assert!(TaskkillOptions::new().force(true).validate().is_err());
        assert!(TaskkillOptions::new().image("").validate().is_err());
        assert!(TaskkillOptions::new().image("note*").validate().is_err());
        assert!(TaskkillOptions::new()
            .image("note*")
            .filter("USERNAME eq alice".parse().unwrap())
            .validate()
            .is_ok());
        assert!(TaskkillOptions::new()
            .remote(RemoteSystem::new(" "))
            .pid(1)
            .validate()
            .is_err());
        assert!(TaskkillOptions::new()
            .remote(RemoteSystem::new("srv").with_user(
                UserContext::new("admin").with_password(Password::Given(String::new()))
            ))
            .pid(1)
            .validate()
            .is_err());
    }
}
