use std::fmt;

use serde::Deserialize;

use crate::cmd::Runner;
use crate::config::DeployConfig;
use crate::docker;
use crate::error::{DeployError, DeployResult};
use crate::output;
use crate::retry::{CancelToken, Retry, RetryOutcome};

/// Container health as reported by `docker inspect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Starting,
    Unhealthy,
    /// No healthcheck configured, inspection failed, or an
    /// unrecognized value.
    Unknown,
}

impl HealthStatus {
    /// Parse the output of `docker inspect --format
    /// '{{json .State.Health}}'`.
    #[must_use]
    pub fn from_inspect(raw: &str) -> Self {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct State {
            status: String,
        }

        match serde_json::from_str::<Option<State>>(raw.trim()) {
            Ok(Some(state)) => Self::from_name(&state.status),
            Ok(None) | Err(_) => Self::Unknown,
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "healthy" => Self::Healthy,
            "starting" => Self::Starting,
            "unhealthy" => Self::Unhealthy,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Starting => "starting",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one poll attempt saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// No container for the service yet.
    Unresolved,
    Status(HealthStatus),
}

/// Read-only view of the service's container health.
pub struct HealthProbe<'a> {
    runner: &'a dyn Runner,
    config: &'a DeployConfig,
}

impl<'a> HealthProbe<'a> {
    #[must_use]
    pub const fn new(runner: &'a dyn Runner, config: &'a DeployConfig) -> Self {
        Self { runner, config }
    }

    #[must_use]
    pub fn service(&self) -> &str {
        &self.config.service
    }

    /// Resolve the container id and query its health. Lookup
    /// failures are transient, so they are observations rather than
    /// errors.
    #[must_use]
    pub fn observe(&self) -> Observation {
        let Some(id) = self.container_id() else {
            return Observation::Unresolved;
        };

        let inspect = docker::inspect_health(&id);
        let status = match self.runner.capture(&inspect) {
            Ok(out) if out.success() => HealthStatus::from_inspect(&out.stdout),
            _ => HealthStatus::Unknown,
        };
        Observation::Status(status)
    }

    fn container_id(&self) -> Option<String> {
        let lookup = docker::container_id(self.config);
        let out = self.runner.capture(&lookup).ok()?;
        let stdout = out.into_stdout(&lookup).ok()?;
        // Scaled services print one id per line; any one will do.
        stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(ToString::to_string)
    }
}

/// Poll until the container reports healthy.
///
/// Returns the attempt number that saw `healthy`. Gives up with
/// [`DeployError::HealthcheckTimeout`] once the retry budget is
/// spent and [`DeployError::Cancelled`] when `cancel` fires.
pub fn wait_healthy(
    probe: &HealthProbe<'_>,
    retry: Retry,
    cancel: &CancelToken,
) -> DeployResult<u32> {
    let max = retry.max_attempts;
    output::info(&format!(
        "Waiting for '{}' to become healthy (up to {max} checks, every {}s)...",
        probe.service(),
        retry.interval.as_secs()
    ));

    let outcome = retry.run(cancel, |attempt| match probe.observe() {
        Observation::Status(HealthStatus::Healthy) => {
            eprintln!("  Health check ({attempt}/{max}): healthy");
            Some(())
        }
        Observation::Status(status) => {
            eprintln!("  Health check ({attempt}/{max}): {status} - retrying...");
            None
        }
        Observation::Unresolved => {
            eprintln!("  Health check ({attempt}/{max}): waiting for container...");
            None
        }
    });

    match outcome {
        RetryOutcome::Ready { attempt, .. } => Ok(attempt),
        RetryOutcome::Exhausted { attempts } => Err(DeployError::HealthcheckTimeout(
            probe.service().to_string(),
            attempts,
        )),
        RetryOutcome::Cancelled { .. } => Err(DeployError::Cancelled),
    }
}
