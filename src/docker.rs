//! Builders for the Docker CLI calls the pipeline makes. Nothing
//! here runs a process; see [`crate::cmd::Runner`].

use crate::cmd::Invocation;
use crate::config::DeployConfig;

/// Build arg carrying the application version into the image.
pub const VERSION_BUILD_ARG: &str = "APP_VERSION";

/// Number of log lines shown when the health check gives up.
pub const LOG_TAIL_LINES: u32 = 50;

/// `docker build` for the source checkout, tagged locally.
#[must_use]
pub fn build_image(config: &DeployConfig) -> Invocation {
    let mut inv = Invocation::new("docker").arg("build");

    if let Some(platform) = &config.platform {
        inv = inv.args(["--platform", platform.as_str()]);
    }
    if config.no_cache {
        inv = inv.arg("--no-cache");
    }

    inv = inv.args([
        "--build-arg".to_string(),
        format!("{VERSION_BUILD_ARG}={}", config.app_version),
    ]);
    for (key, value) in &config.build_args {
        inv = inv.args(["--build-arg".to_string(), format!("{key}={value}")]);
    }

    inv.args(["-f", config.dockerfile.as_str()])
        .args(["-t", config.image_tag.as_str()])
        .arg(".")
        .current_dir(&config.source_dir)
}

#[must_use]
pub fn compose_down(config: &DeployConfig) -> Invocation {
    compose(config).arg("down")
}

#[must_use]
pub fn compose_up(config: &DeployConfig) -> Invocation {
    compose(config).args(["up", "-d"])
}

#[must_use]
pub fn compose_ps(config: &DeployConfig) -> Invocation {
    compose(config).arg("ps")
}

#[must_use]
pub fn compose_logs(config: &DeployConfig) -> Invocation {
    compose(config)
        .args(["logs", "--tail"])
        .arg(LOG_TAIL_LINES.to_string())
        .arg(config.service.as_str())
}

/// `docker compose ps -q <service>`: prints the container id, or
/// nothing when the service has no container yet.
#[must_use]
pub fn container_id(config: &DeployConfig) -> Invocation {
    compose(config).args(["ps", "-q", config.service.as_str()])
}

/// Health state as JSON: an object with a `Status` field, or `null`
/// when the image defines no healthcheck.
#[must_use]
pub fn inspect_health(container_id: &str) -> Invocation {
    Invocation::new("docker").args([
        "inspect",
        "--format",
        "{{json .State.Health}}",
        container_id,
    ])
}

fn compose(config: &DeployConfig) -> Invocation {
    Invocation::new("docker")
        .args(["compose", "-f", config.compose_file.as_str()])
        .current_dir(&config.deploy_dir)
}
