//! wincmd core library
//!
//! Typed wrappers for the Windows `netstat`, `shutdown` and `taskkill`
//! utilities. Provides functionality to:
//! - Build validated command lines from typed options
//! - Parse netstat connection listings, routing tables and statistics
//! - Find free local ports from live netstat output
//! - Terminate processes and schedule power actions
//! - Persist settings (command timeout, default port range)
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Models, parsers and command builders (no I/O)
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: External system implementations
//! - `application`: Use case services
//!
//! # Example
//! ```no_run
//! use wincmd_core::{PortFinder, PortRange, Protocol, SystemRunner};
//!
//! # async fn run() -> wincmd_core::Result<()> {
//! let finder = PortFinder::new(SystemRunner::new());
//! let port = finder.lowest_free_port(Protocol::Tcp, PortRange::new(5000, 5100)?).await?;
//! println!("listen on {}", port);
//! # Ok(())
//! # }
//! ```
//!
//! # Platform Support
//! The commands exist only on Windows. Parsers and builders work everywhere,
//! so captured output can be processed on any platform.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use adapters::SystemRunner;
pub use application::{NetstatService, PortFinder, ShutdownService, TaskkillService};
pub use config::{Config, ConfigStore};
pub use domain::{
    parse_connections, CommandLine, CommandSpec, ConnectionOptions, ConnectionProtocol,
    ConnectionRecord, ConnectionTable, NetstatCommand, Password, PortRange, ProcessFilter,
    Protocol, ReasonKind, RemoteSystem, Selector, ShutdownAction, ShutdownOptions,
    ShutdownReason, StatisticsProtocol, TaskkillOptions, TcpState, UserContext,
};
pub use error::{Error, Result};
pub use ports::{CommandOutput, CommandRunner};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
