pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("command failed: {command} ({})", describe_exit(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("deployment directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("service '{0}' not found in compose file")]
    ServiceNotFound(String),

    #[error("service '{0}' has no image reference to replace")]
    ImageNotSet(String),

    #[error("no literal `image: {image}` line for service '{service}' in compose file")]
    ImageLineNotFound { service: String, image: String },

    #[error("container '{0}' did not become healthy after {1} attempts")]
    HealthcheckTimeout(String, u32),

    #[error("interrupted")]
    Cancelled,

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid compose file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[allow(clippy::ref_option)]
fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(
        || "terminated by signal".to_string(),
        |c| format!("exit code {c}"),
    )
}
