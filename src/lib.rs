//! Rebuild a container image locally and redeploy it with Docker
//! Compose.
//!
//! `relaunch` replaces the usual "pull, build, edit the compose
//! file, restart, hope" routine with one typed pipeline:
//!
//! 1. **Validate** - the deployment directory must exist and hold
//!    the compose file before anything is touched
//! 2. **Pull** - `git pull` in the source checkout (skippable)
//! 3. **Build** - `docker build` tagged `<service>:local`, with
//!    optional platform, no-cache and build args
//! 4. **Pin** - rewrite the service's `image:` to the local tag,
//!    keeping a one-time `.backup` of the original
//! 5. **Restart** - `docker compose down` then `up -d`
//! 6. **Wait** - poll `docker inspect` until the container reports
//!    healthy, for a bounded number of attempts
//!
//! Every step except the health wait is fail-fast. A service that
//! is still unhealthy when the budget runs out is reported as a
//! warning, with its recent logs, and the run still succeeds.
//!
//! # Command line
//!
//! ```sh
//! # Rebuild from the current checkout and redeploy staging
//! relaunch --dir /srv/staging
//!
//! # Cross-build for amd64 from scratch, without pulling
//! relaunch -d /srv/staging -p linux/amd64 --no-cache --skip-pull
//!
//! # Show what would happen
//! relaunch -d /srv/staging --dry-run
//! ```
//!
//! # Library
//!
//! All external commands go through the [`Runner`] trait, so the
//! pipeline can be driven programmatically or against a fake:
//!
//! ```rust,no_run
//! use relaunch::{DeployConfig, Pipeline, SystemRunner};
//! use relaunch::retry::CancelToken;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = DeployConfig::new("/srv/staging")
//!         .source_dir("/home/ci/app")
//!         .platform("linux/amd64")
//!         .skip_pull(true);
//!
//!     let pipeline = Pipeline::new(&config, &SystemRunner, CancelToken::new());
//!     let report = pipeline.run()?;
//!     relaunch::pipeline::print_summary(&report);
//!     Ok(())
//! }
//! ```
//!
//! [`Runner`]: cmd::Runner

#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cli;
pub mod cmd;
pub mod compose;
pub mod config;
pub mod docker;
pub mod error;
pub mod git;
pub mod health;
pub mod output;
pub mod pipeline;
pub mod retry;

pub use cmd::{CommandOutput, Invocation, Runner, SystemRunner};
pub use compose::PinOutcome;
pub use config::DeployConfig;
pub use error::{DeployError, DeployResult};
pub use health::HealthStatus;
pub use pipeline::{DeployReport, HealthOutcome, Pipeline, Step};
