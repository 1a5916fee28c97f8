use crate::cmd::Invocation;
use crate::config::DeployConfig;

/// `git pull` in the source checkout.
#[must_use]
pub fn pull(config: &DeployConfig) -> Invocation {
    Invocation::new("git")
        .arg("pull")
        .current_dir(&config.source_dir)
}
