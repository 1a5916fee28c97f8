use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";
pub const DEFAULT_SERVICE: &str = "app";
pub const HEALTH_ATTEMPTS: u32 = 12;
pub const HEALTH_INTERVAL: Duration = Duration::from_secs(5);

/// Name of the version marker file in the source checkout.
pub const VERSION_FILE: &str = "VERSION";
pub const UNKNOWN_VERSION: &str = "unknown";

/// Everything one deployment run needs. Built once from the
/// command line and passed by reference to each step.
///
/// # Example
///
/// ```
/// use relaunch::DeployConfig;
///
/// let config = DeployConfig::new("/srv/staging")
///     .platform("linux/amd64")
///     .skip_pull(true);
///
/// assert_eq!(config.image_tag, "app:local");
/// assert_eq!(config.platform.as_deref(), Some("linux/amd64"));
/// ```
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub deploy_dir: PathBuf,
    pub source_dir: PathBuf,
    pub compose_file: String,
    pub dockerfile: String,
    pub service: String,
    pub image_tag: String,
    pub platform: Option<String>,
    pub no_cache: bool,
    pub skip_pull: bool,
    pub dry_run: bool,
    pub build_args: Vec<(String, String)>,
    pub health_attempts: u32,
    pub health_interval: Duration,
    pub app_version: String,
}

impl DeployConfig {
    #[must_use]
    pub fn new(deploy_dir: impl Into<PathBuf>) -> Self {
        Self {
            deploy_dir: deploy_dir.into(),
            source_dir: PathBuf::from("."),
            compose_file: DEFAULT_COMPOSE_FILE.to_string(),
            dockerfile: DEFAULT_DOCKERFILE.to_string(),
            service: DEFAULT_SERVICE.to_string(),
            image_tag: local_tag(DEFAULT_SERVICE),
            platform: None,
            no_cache: false,
            skip_pull: false,
            dry_run: false,
            build_args: Vec::new(),
            health_attempts: HEALTH_ATTEMPTS,
            health_interval: HEALTH_INTERVAL,
            app_version: UNKNOWN_VERSION.to_string(),
        }
    }

    #[must_use]
    pub fn source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    #[must_use]
    pub fn compose_file(mut self, name: &str) -> Self {
        self.compose_file = name.to_string();
        self
    }

    #[must_use]
    pub fn dockerfile(mut self, path: &str) -> Self {
        self.dockerfile = path.to_string();
        self
    }

    /// Set the target service. Also resets the image tag to
    /// `<service>:local`; call [`Self::image_tag`] afterwards to
    /// override it.
    #[must_use]
    pub fn service(mut self, name: &str) -> Self {
        self.service = name.to_string();
        self.image_tag = local_tag(name);
        self
    }

    #[must_use]
    pub fn image_tag(mut self, tag: &str) -> Self {
        self.image_tag = tag.to_string();
        self
    }

    #[must_use]
    pub fn platform(mut self, platform: &str) -> Self {
        self.platform = Some(platform.to_string());
        self
    }

    #[must_use]
    pub const fn no_cache(mut self, yes: bool) -> Self {
        self.no_cache = yes;
        self
    }

    #[must_use]
    pub const fn skip_pull(mut self, yes: bool) -> Self {
        self.skip_pull = yes;
        self
    }

    #[must_use]
    pub const fn dry_run(mut self, yes: bool) -> Self {
        self.dry_run = yes;
        self
    }

    #[must_use]
    pub fn build_arg(mut self, key: &str, value: &str) -> Self {
        self.build_args.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub const fn health_attempts(mut self, attempts: u32) -> Self {
        self.health_attempts = attempts;
        self
    }

    #[must_use]
    pub const fn health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval;
        self
    }

    #[must_use]
    pub fn app_version(mut self, version: &str) -> Self {
        self.app_version = version.to_string();
        self
    }

    #[must_use]
    pub fn compose_path(&self) -> PathBuf {
        self.deploy_dir.join(&self.compose_file)
    }
}

#[must_use]
pub fn local_tag(service: &str) -> String {
    format!("{service}:local")
}

/// Read the application version from the `VERSION` file in `dir`.
/// Falls back to [`UNKNOWN_VERSION`] when the file is missing,
/// unreadable or blank.
#[must_use]
pub fn read_app_version(dir: &Path) -> String {
    std::fs::read_to_string(dir.join(VERSION_FILE))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
}
