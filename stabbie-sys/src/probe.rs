// SPDX-License-Identifier: GPL-3.0-only

use std::time::{Duration, Instant};

use async_trait::async_trait;
use stabbie_contracts::ReachabilityProbe;
use stabbie_types::{ProbeTarget, ReachabilityStatus};
use tokio::net::{TcpStream, lookup_host};
use tracing::debug;

use crate::cmd;

/// Reachability over the network
///
/// `Service` targets get a TCP handshake that is closed as soon as it
/// completes. `Host` targets get a single ICMP echo through `ping(8)`.
#[derive(Debug, Clone, Default)]
pub struct TcpProbe;

impl TcpProbe {
    pub fn new() -> Self {
        Self
    }

    async fn connect_any(host: &str, port: u16) -> bool {
        let addresses = match lookup_host((host, port)).await {
            Ok(addresses) => addresses,
            Err(e) => {
                debug!("Failed to resolve {}: {}", host, e);
                return false;
            }
        };

        for address in addresses {
            match TcpStream::connect(address).await {
                Ok(stream) => {
                    drop(stream);
                    return true;
                }
                Err(e) => debug!("Connection to {} failed: {}", address, e),
            }
        }

        false
    }

    async fn ping(host: &str, timeout: Duration) -> bool {
        let wait_secs = timeout.as_secs().max(1);
        let args = vec![
            "-c".to_string(),
            "1".to_string(),
            "-W".to_string(),
            wait_secs.to_string(),
            host.to_string(),
        ];

        match cmd::run("ping", &args, timeout).await {
            Ok(outcome) => outcome.success,
            Err(e) => {
                debug!("ping {} failed: {}", host, e);
                false
            }
        }
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn probe(&self, target: &ProbeTarget, timeout: Duration) -> ReachabilityStatus {
        let started = Instant::now();
        let attempt = async {
            match target {
                ProbeTarget::Service { host, port } => Self::connect_any(host, *port).await,
                ProbeTarget::Host { host } => Self::ping(host, timeout).await,
            }
        };

        let reachable = match tokio::time::timeout(timeout, attempt).await {
            Ok(reachable) => reachable,
            Err(_) => {
                debug!(
                    "Probe of {} timed out after {} ms",
                    target,
                    timeout.as_millis()
                );
                false
            }
        };

        let status = if reachable {
            ReachabilityStatus::Reachable
        } else {
            ReachabilityStatus::Unreachable
        };
        debug!(
            "Probe of {}: {} ({} ms)",
            target,
            status,
            started.elapsed().as_millis()
        );
        status
    }
}
