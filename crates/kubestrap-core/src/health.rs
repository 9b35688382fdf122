//! Lifecycle state probes for the kubelet and the API server

use crate::commands::KUBELET_STATUS;
use crate::error::{Error, Result};
use command_executor::CommandRunner;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::{debug, warn};

/// How long an API server health check may take
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Observable state of a cluster component, derived fresh from every probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Up and answering
    Running,
    /// On its way up
    Starting,
    /// Not running
    Stopped,
    /// Running but unhealthy, or in a state we do not recognise
    Error,
}

impl LifecycleState {
    /// Human readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Running => "Running",
            LifecycleState::Starting => "Starting",
            LifecycleState::Stopped => "Stopped",
            LifecycleState::Error => "Error",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map `systemctl is-active` output to a state
pub fn state_from_service_status(status: &str) -> LifecycleState {
    match status.trim() {
        "active" => LifecycleState::Running,
        "inactive" => LifecycleState::Stopped,
        "activating" => LifecycleState::Starting,
        _ => LifecycleState::Error,
    }
}

/// Map a `/healthz` outcome to a state; `None` means no HTTP response at all
pub fn state_from_http_status(status: Option<u16>) -> LifecycleState {
    match status {
        None => LifecycleState::Stopped,
        Some(200) => LifecycleState::Running,
        Some(_) => LifecycleState::Error,
    }
}

/// Ask systemd for the kubelet's state
///
/// `systemctl is-active` exits non-zero for anything but `active`, so the
/// text of a non-zero exit is mapped like a successful answer. Only failing to
/// reach the node is an error.
pub async fn kubelet_status(runner: &dyn CommandRunner) -> Result<LifecycleState> {
    let status = match runner.combined_output(KUBELET_STATUS).await {
        Ok(output) => output,
        Err(e) if !e.is_transport() => e.output().unwrap_or_default().to_string(),
        Err(source) => {
            return Err(Error::Probe {
                target: "kubelet".to_string(),
                source,
            });
        }
    };
    Ok(state_from_service_status(&status))
}

/// GET `https://<ip>:<port>/healthz` without verifying the cluster's certificate
///
/// Nothing listening is the expected state before bootstrap and maps to
/// [`LifecycleState::Stopped`].
pub async fn apiserver_status(ip: IpAddr, port: u16, timeout: Duration) -> LifecycleState {
    check_healthz(format!("https://{}/healthz", SocketAddr::new(ip, port)), timeout).await
}

async fn check_healthz(url: String, timeout: Duration) -> LifecycleState {
    smol::unblock(move || {
        let client = match reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Failed to build health check client");
                return LifecycleState::Error;
            }
        };

        let status = match client.get(&url).send() {
            Ok(response) => Some(response.status().as_u16()),
            Err(e) => {
                debug!(url = %url, error = %e, "Health check got no response");
                None
            }
        };
        debug!(url = %url, status = ?status, "Health check");
        state_from_http_status(status)
    })
    .await
}
