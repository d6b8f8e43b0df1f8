//! wincmd CLI - Typed front end for netstat, shutdown and taskkill
//!
//! Lists connections, routes and protocol statistics, finds free ports,
//! terminates processes and schedules power actions.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use wincmd_core::{
    ConnectionProtocol, PortRange, ProcessFilter, Protocol, ShutdownAction, ShutdownReason,
    StatisticsProtocol, TcpState,
};

#[derive(Parser)]
#[command(name = "wincmd")]
#[command(author, version, about = "Typed front end for netstat, shutdown and taskkill")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Log every command that is run (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Seconds a command may run, overriding the config file
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List active connections
    #[command(alias = "ls")]
    Connections {
        /// All connections and listening ports (-a)
        #[arg(short, long)]
        all: bool,
        /// All connections, listening ports and bound non-listening ports (-q)
        #[arg(short = 'q', long)]
        all_bound: bool,
        /// Owning executables; needs elevation (-b)
        #[arg(short = 'b', long)]
        executables: bool,
        /// Fully qualified domain names (-f)
        #[arg(short, long)]
        fqdn: bool,
        /// Numeric addresses and ports (-n)
        #[arg(short, long)]
        numeric: bool,
        /// Owning process IDs (-o)
        #[arg(short = 'o', long)]
        pids: bool,
        /// Time in current state (-i)
        #[arg(short = 'i', long)]
        time_in_state: bool,
        /// Offload state (-t)
        #[arg(short = 't', long)]
        offload_state: bool,
        /// Connection templates (-y)
        #[arg(short = 'y', long)]
        templates: bool,
        /// TCP, UDP, TCPv6 or UDPv6 (-p)
        #[arg(short, long)]
        protocol: Option<ConnectionProtocol>,
        /// Print only connections in this state, e.g. LISTENING
        #[arg(long)]
        state: Option<TcpState>,
    },

    /// Show the interface list and routing tables
    Routes,

    /// Show per-protocol statistics
    Stats {
        /// IP, IPv6, ICMP, ICMPv6, TCP, TCPv6, UDP or UDPv6
        #[arg(short, long)]
        protocol: Option<StatisticsProtocol>,
    },

    /// Show ethernet statistics
    Ethernet,

    /// Find a free local port
    FreePort {
        /// TCP or UDP
        #[arg(short, long, default_value = "TCP")]
        protocol: Protocol,
        /// Range to search, e.g. 5000-5100 (defaults to the configured range)
        #[arg(short, long)]
        range: Option<PortRange>,
        /// Ports to try first; the smallest free one wins
        #[arg(long = "prefer", value_name = "PORT")]
        prefer: Vec<u16>,
        /// List every free localhost port in the range instead
        #[arg(long)]
        all: bool,
    },

    /// Show ports bound on localhost
    Busy {
        /// Group ports by owning PID
        #[arg(long)]
        by_pid: bool,
    },

    /// Terminate processes with taskkill
    Kill(KillArgs),

    /// Log off, shut down, restart or hibernate
    Shutdown(ShutdownArgs),

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(clap::Args)]
pub struct KillArgs {
    /// Process ID to terminate (repeatable)
    #[arg(long = "pid", value_name = "PID")]
    pub pids: Vec<u32>,
    /// Image name to terminate, `*` allowed with a filter (repeatable)
    #[arg(long = "image", value_name = "NAME")]
    pub images: Vec<String>,
    /// Filter such as "STATUS eq NOT RESPONDING" (repeatable)
    #[arg(long = "filter", value_name = "FILTER")]
    pub filters: Vec<ProcessFilter>,
    /// Terminate forcefully (/F)
    #[arg(short, long)]
    pub force: bool,
    /// Terminate child processes too (/T)
    #[arg(short, long)]
    pub tree: bool,
    /// Remote system (/S)
    #[arg(long)]
    pub system: Option<String>,
    /// User on the remote system (/U)
    #[arg(long, requires = "system")]
    pub user: Option<String>,
    /// Domain of the user
    #[arg(long, requires = "user")]
    pub domain: Option<String>,
    /// Password of the user (/P)
    #[arg(long, requires = "user", conflicts_with = "prompt_password")]
    pub password: Option<String>,
    /// Let taskkill prompt for the password (/P)
    #[arg(long, requires = "user")]
    pub prompt_password: bool,
    /// Print the command line instead of running it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(clap::Args)]
pub struct ShutdownArgs {
    /// What to do
    #[arg(value_enum)]
    pub action: ActionArg,
    /// Close applications without warning (/f)
    #[arg(short, long)]
    pub force: bool,
    /// Delay in seconds (/t)
    #[arg(short, long, value_name = "SECS")]
    pub delay: Option<u32>,
    /// Comment, up to 512 characters (/c)
    #[arg(short, long)]
    pub comment: Option<String>,
    /// Reason code [p:|u:]major:minor (/d)
    #[arg(long)]
    pub reason: Option<ShutdownReason>,
    /// Target computer (/m)
    #[arg(short, long)]
    pub remote: Option<String>,
    /// Boot into firmware setup (/fw)
    #[arg(long)]
    pub firmware: bool,
    /// Boot into advanced boot options (/o)
    #[arg(long)]
    pub advanced_boot: bool,
    /// Print the command line instead of running it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ActionArg {
    Logoff,
    Shutdown,
    ShutdownRestartApps,
    Restart,
    RestartRestartApps,
    Abort,
    PowerOff,
    Hibernate,
    Hybrid,
    DocumentReason,
}

impl From<ActionArg> for ShutdownAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Logoff => ShutdownAction::Logoff,
            ActionArg::Shutdown => ShutdownAction::Shutdown,
            ActionArg::ShutdownRestartApps => ShutdownAction::ShutdownAndRestartApps,
            ActionArg::Restart => ShutdownAction::Restart,
            ActionArg::RestartRestartApps => ShutdownAction::RestartAndRestartApps,
            ActionArg::Abort => ShutdownAction::Abort,
            ActionArg::PowerOff => ShutdownAction::PowerOff,
            ActionArg::Hibernate => ShutdownAction::Hibernate,
            ActionArg::Hybrid => ShutdownAction::Hybrid,
            ActionArg::DocumentReason => ShutdownAction::DocumentReason,
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Change settings
    Set {
        /// Command timeout in seconds
        #[arg(long, value_name = "SECS")]
        command_timeout: Option<u64>,
        /// Default port range, e.g. 1024-49150
        #[arg(long)]
        range: Option<PortRange>,
    },
    /// Print the config file location
    Path,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let json = cli.json;
    let timeout = cli.timeout;

    match cli.command {
        Commands::Connections {
            all,
            all_bound,
            executables,
            fqdn,
            numeric,
            pids,
            time_in_state,
            offload_state,
            templates,
            protocol,
            state,
        } => {
            let options = wincmd_core::ConnectionOptions {
                all,
                all_bound,
                executables,
                fqdn,
                numeric,
                pids,
                time_in_state,
                offload_state,
                templates,
                protocol,
            };
            commands::connections::run(&options, state, timeout, json).await?;
        }
        Commands::Routes => commands::routes::run(timeout, json).await?,
        Commands::Stats { protocol } => commands::stats::run(protocol, timeout, json).await?,
        Commands::Ethernet => commands::stats::ethernet(timeout, json).await?,
        Commands::FreePort {
            protocol,
            range,
            prefer,
            all,
        } => commands::ports::free(protocol, range, &prefer, all, timeout, json).await?,
        Commands::Busy { by_pid } => commands::ports::busy(by_pid, timeout, json).await?,
        Commands::Kill(args) => commands::kill::run(args, timeout).await?,
        Commands::Shutdown(args) => commands::shutdown::run(args, timeout).await?,
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => commands::config::show(json).await?,
            ConfigAction::Set {
                command_timeout,
                range,
            } => commands::config::set(command_timeout, range).await?,
            ConfigAction::Path => commands::config::path()?,
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["wincmd", "busy", "--json", "--timeout", "5"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.timeout, Some(5));
    }

    #[test]
    fn test_typed_values_are_parsed() {
        let cli = Cli::try_parse_from([
            "wincmd", "connections", "-a", "-n", "-o", "-p", "tcpv6", "--state", "LISTEN",
        ])
        .unwrap();
        match cli.command {
            Commands::Connections {
                protocol, state, ..
            } => {
                assert_eq!(protocol, Some(ConnectionProtocol::TcpV6));
                assert_eq!(state, Some(TcpState::Listening));
            }
            _ => panic!("expected connections"),
        }

        assert!(Cli::try_parse_from(["wincmd", "free-port", "--range", "9-1"]).is_err());
        assert!(Cli::try_parse_from(["wincmd", "shutdown", "restart", "--reason", "p:4"]).is_err());
    }
}
