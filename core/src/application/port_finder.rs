//! Free-port lookup on top of live netstat output.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::NetstatService;
use crate::domain::{ConnectionOptions, ConnectionTable, PortRange, Protocol};
use crate::error::Result;
use crate::ports::CommandRunner;

/// Answers "which ports are free" from a fresh `netstat -a -n` on every call.
///
/// A port reported free can be taken by another process before the caller
/// binds it. Callers that need certainty must bind and retry.
pub struct PortFinder<R: CommandRunner> {
    netstat: NetstatService<R>,
}

impl<R: CommandRunner> PortFinder<R> {
    pub fn new(runner: R) -> Self {
        Self {
            netstat: NetstatService::new(runner),
        }
    }

    pub fn runner(&self) -> &R {
        self.netstat.runner()
    }

    async fn snapshot(&self, with_pids: bool) -> Result<ConnectionTable> {
        let options = ConnectionOptions::new()
            .with_all(true)
            .with_numeric(true)
            .with_pids(with_pids);
        self.netstat.connections(&options).await
    }

    /// Local ports currently bound for `protocol`, on any address.
    pub async fn busy_ports(&self, protocol: Protocol) -> Result<BTreeSet<u16>> {
        Ok(self.snapshot(false).await?.local_ports(protocol))
    }

    /// The smallest port in `range` with no local `protocol` binding.
    pub async fn lowest_free_port(&self, protocol: Protocol, range: PortRange) -> Result<u16> {
        let occupied = self.busy_ports(protocol).await?;
        let port = range.lowest_free(&occupied)?;
        debug!(protocol = %protocol, range = %range, port = port, "Found free port");
        Ok(port)
    }

    /// Ports bound on a loopback or wildcard address, any protocol.
    pub async fn localhost_busy_ports(&self) -> Result<BTreeSet<u16>> {
        Ok(self.snapshot(false).await?.localhost_ports())
    }

    /// Localhost ports grouped by owning PID (`netstat -a -n -o`).
    pub async fn localhost_processes_with_ports(&self) -> Result<BTreeMap<u32, BTreeSet<u16>>> {
        Ok(self.snapshot(true).await?.localhost_ports_by_pid())
    }

    /// Every port in `range` not bound on localhost, ascending.
    pub async fn localhost_free_ports(&self, range: PortRange) -> Result<Vec<u16>> {
        let occupied = self.localhost_busy_ports().await?;
        Ok(range.free_ports(&occupied))
    }

    /// The smallest free port among `candidates` that lies in `range`, or the
    /// lowest free port of `range` when no candidate qualifies.
    pub async fn preferred_free_port(&self, candidates: &[u16], range: PortRange) -> Result<u16> {
        let occupied = self.localhost_busy_ports().await?;
        range.preferred_free(candidates, &occupied)
    }
}
