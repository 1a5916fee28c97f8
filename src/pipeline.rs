use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::cmd::{Invocation, Runner};
use crate::compose::{self, ComposeFile, PinOutcome};
use crate::config::DeployConfig;
use crate::docker;
use crate::error::{DeployError, DeployResult};
use crate::git;
use crate::health::{self, HealthProbe};
use crate::output;
use crate::retry::{CancelToken, Retry};

/// One unit of work in a deployment, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Pull(Invocation),
    Build(Invocation),
    PinImage {
        compose: PathBuf,
        service: String,
        current: String,
        tag: String,
    },
    Down(Invocation),
    Up(Invocation),
    WaitHealthy { service: String, retry: Retry },
}

impl Step {
    /// The external command this step runs, if any.
    #[must_use]
    pub const fn invocation(&self) -> Option<&Invocation> {
        match self {
            Self::Pull(inv) | Self::Build(inv) | Self::Down(inv) | Self::Up(inv) => Some(inv),
            Self::PinImage { .. } | Self::WaitHealthy { .. } => None,
        }
    }

    const fn title(&self) -> &'static str {
        match self {
            Self::Pull(_) => "Pull latest source",
            Self::Build(_) => "Build image",
            Self::PinImage { .. } => "Point compose at local image",
            Self::Down(_) => "Stop stack",
            Self::Up(_) => "Start stack",
            Self::WaitHealthy { .. } => "Wait for health",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.title())?;
        match self {
            Self::Pull(inv) | Self::Build(inv) | Self::Down(inv) | Self::Up(inv) => {
                write!(f, "{inv}")?;
                if let Some(dir) = &inv.dir {
                    write!(f, " (in {})", dir.display())?;
                }
                Ok(())
            }
            Self::PinImage {
                compose,
                service,
                current,
                tag,
            } => {
                if current == tag {
                    write!(f, "'{service}' already uses {tag} in {}", compose.display())
                } else {
                    write!(f, "'{service}' {current} -> {tag} in {}", compose.display())
                }
            }
            Self::WaitHealthy { service, retry } => write!(
                f,
                "'{service}' (up to {} checks, every {}s)",
                retry.max_attempts,
                retry.interval.as_secs()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthOutcome {
    Healthy { attempts: u32 },
    /// Reported as a warning; the deployment itself still succeeds.
    TimedOut { attempts: u32 },
}

impl HealthOutcome {
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy { .. })
    }
}

/// Result of a completed deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub image_tag: String,
    pub app_version: String,
    pub pin: Option<PinOutcome>,
    pub health: Option<HealthOutcome>,
    pub elapsed: Duration,
}

/// Rebuild-and-redeploy pipeline: pull, build, pin the compose
/// image, restart, and wait for health.
pub struct Pipeline<'a> {
    config: &'a DeployConfig,
    runner: &'a dyn Runner,
    cancel: CancelToken,
}

impl<'a> Pipeline<'a> {
    #[must_use]
    pub const fn new(
        config: &'a DeployConfig,
        runner: &'a dyn Runner,
        cancel: CancelToken,
    ) -> Self {
        Self {
            config,
            runner,
            cancel,
        }
    }

    /// Validate the deployment directory and compose file, then list
    /// the steps a run would take. Touches nothing.
    pub fn plan(&self) -> DeployResult<Vec<Step>> {
        let cfg = self.config;
        let path = compose::locate(&cfg.deploy_dir, &cfg.compose_file)?;
        let descriptor = ComposeFile::load(&path)?;
        let current = descriptor.service_image(&cfg.service)?.to_string();
        compose::prepare_pin(&descriptor, &cfg.service, &cfg.image_tag)?;

        let mut steps = Vec::new();
        if !cfg.skip_pull {
            steps.push(Step::Pull(git::pull(cfg)));
        }
        steps.push(Step::Build(docker::build_image(cfg)));
        steps.push(Step::PinImage {
            compose: path,
            service: cfg.service.clone(),
            current,
            tag: cfg.image_tag.clone(),
        });
        steps.push(Step::Down(docker::compose_down(cfg)));
        steps.push(Step::Up(docker::compose_up(cfg)));
        steps.push(Step::WaitHealthy {
            service: cfg.service.clone(),
            retry: Retry::new(cfg.health_attempts, cfg.health_interval),
        });
        Ok(steps)
    }

    /// Print the plan without executing it.
    pub fn dry_run(&self) -> DeployResult<Vec<Step>> {
        let steps = self.plan()?;

        output::banner("Dry run: no changes will be made");
        for (i, step) in steps.iter().enumerate() {
            println!("{}. {step}", i + 1);
        }
        Ok(steps)
    }

    /// Execute the full deployment. Any failing step aborts the run
    /// without rollback; a health timeout only produces a warning.
    pub fn run(&self) -> DeployResult<DeployReport> {
        let started = Instant::now();
        let steps = self.plan()?;
        self.check_prerequisites()?;

        output::info(&format!(
            "Deploying {} (version {}) to {}",
            self.config.image_tag,
            self.config.app_version,
            self.config.deploy_dir.display()
        ));
        if self.config.skip_pull {
            output::info("Skipping git pull");
        }

        let mut pin = None;
        let mut health = None;

        for step in &steps {
            self.checkpoint()?;
            match step {
                Step::Pull(inv) | Step::Build(inv) | Step::Down(inv) | Step::Up(inv) => {
                    output::info(&format!("{}: {inv}", step.title()));
                    self.runner
                        .stream(inv)
                        .map_err(|e| self.interrupted_or(e))?;
                }
                Step::PinImage {
                    compose,
                    service,
                    tag,
                    ..
                } => {
                    let outcome = compose::pin_local_image(compose, service, tag)?;
                    log_pin(&outcome, tag);
                    pin = Some(outcome);
                }
                Step::WaitHealthy { retry, .. } => {
                    health = Some(self.await_health(*retry)?);
                }
            }
        }

        Ok(DeployReport {
            image_tag: self.config.image_tag.clone(),
            app_version: self.config.app_version.clone(),
            pin,
            health,
            elapsed: started.elapsed(),
        })
    }

    fn check_prerequisites(&self) -> DeployResult<()> {
        let mut required = vec!["docker"];
        if !self.config.skip_pull {
            required.push("git");
        }

        for program in required {
            if !self.runner.command_exists(program) {
                return Err(DeployError::PrerequisiteMissing(format!(
                    "{program} is not installed or not on PATH"
                )));
            }
        }
        Ok(())
    }

    fn checkpoint(&self) -> DeployResult<()> {
        if self.cancel.is_cancelled() {
            Err(DeployError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// A child killed by the same Ctrl-C surfaces as a plain command
    /// failure; report it as an interrupt instead.
    fn interrupted_or(&self, err: DeployError) -> DeployError {
        if self.cancel.is_cancelled() {
            DeployError::Cancelled
        } else {
            err
        }
    }

    fn await_health(&self, retry: Retry) -> DeployResult<HealthOutcome> {
        let probe = HealthProbe::new(self.runner, self.config);

        match health::wait_healthy(&probe, retry, &self.cancel) {
            Ok(attempts) => {
                output::success(&format!("'{}' is healthy", self.config.service));
                self.show_diagnostics(&docker::compose_ps(self.config));
                Ok(HealthOutcome::Healthy { attempts })
            }
            Err(DeployError::HealthcheckTimeout(service, attempts)) => {
                output::warn(&format!(
                    "'{service}' did not become healthy after {attempts} checks; recent logs:"
                ));
                self.show_diagnostics(&docker::compose_logs(self.config));
                Ok(HealthOutcome::TimedOut { attempts })
            }
            Err(e) => Err(e),
        }
    }

    fn show_diagnostics(&self, inv: &Invocation) {
        if let Err(e) = self.runner.stream(inv) {
            output::warn(&format!("could not run `{inv}`: {e}"));
        }
    }
}

fn log_pin(outcome: &PinOutcome, tag: &str) {
    match outcome {
        PinOutcome::Pinned {
            previous,
            backup_created,
        } => {
            if *backup_created {
                output::info("Saved original compose file as backup");
            }
            output::info(&format!("Compose image updated: {previous} -> {tag}"));
        }
        PinOutcome::AlreadyPinned => {
            output::info(&format!("Compose already uses {tag}"));
        }
    }
}

/// Print the end-of-run summary.
pub fn print_summary(report: &DeployReport) {
    output::banner("Deployment summary");
    eprintln!("  Image:    {}", report.image_tag);
    eprintln!("  Version:  {}", report.app_version);
    match &report.pin {
        Some(PinOutcome::Pinned { previous, .. }) => {
            eprintln!("  Compose:  replaced {previous}");
        }
        Some(PinOutcome::AlreadyPinned) => eprintln!("  Compose:  unchanged"),
        None => {}
    }
    match report.health {
        Some(HealthOutcome::Healthy { attempts }) => {
            eprintln!("  Health:   healthy after {attempts} check(s)");
        }
        Some(HealthOutcome::TimedOut { attempts }) => {
            eprintln!("  Health:   not healthy after {attempts} checks");
        }
        None => {}
    }
    eprintln!("  Elapsed:  {:.1}s", report.elapsed.as_secs_f64());
    eprintln!();

    if report.health.is_some_and(HealthOutcome::is_healthy) {
        output::success("Deployment complete");
    } else {
        output::warn("Deployment finished, but the service is not healthy yet");
    }
}
