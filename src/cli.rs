use std::path::PathBuf;

use clap::Parser;

use crate::config::{
    self, DEFAULT_COMPOSE_FILE, DEFAULT_DOCKERFILE, DEFAULT_SERVICE, DeployConfig,
};

#[derive(Parser, Debug)]
#[command(name = "relaunch", version)]
#[command(about = "Rebuild a container image locally and redeploy its compose stack")]
pub struct Cli {
    /// Deployment directory containing the compose file
    #[arg(short = 'd', long = "dir", value_name = "PATH", env = "RELAUNCH_DIR")]
    pub deploy_dir: PathBuf,

    /// Source checkout to pull and build
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    pub source_dir: PathBuf,

    /// Target platform for the build (e.g. linux/amd64)
    #[arg(short, long)]
    pub platform: Option<String>,

    /// Build without using the layer cache
    #[arg(long)]
    pub no_cache: bool,

    /// Do not run git pull before building
    #[arg(long)]
    pub skip_pull: bool,

    /// Compose file name inside the deployment directory
    #[arg(short = 'f', long, default_value = DEFAULT_COMPOSE_FILE)]
    pub compose_file: String,

    /// Dockerfile path, relative to the source checkout
    #[arg(long, default_value = DEFAULT_DOCKERFILE)]
    pub dockerfile: String,

    /// Compose service to point at the local image
    #[arg(long, default_value = DEFAULT_SERVICE)]
    pub service: String,

    /// Local image tag [default: <service>:local]
    #[arg(long)]
    pub tag: Option<String>,

    /// Extra build argument, repeatable
    #[arg(long = "build-arg", value_name = "KEY=VALUE", value_parser = parse_build_arg)]
    pub build_args: Vec<(String, String)>,

    /// Print the planned steps without executing them
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    #[must_use]
    pub fn into_config(self) -> DeployConfig {
        let version = config::read_app_version(&self.source_dir);

        let mut cfg = DeployConfig::new(self.deploy_dir)
            .source_dir(self.source_dir)
            .compose_file(&self.compose_file)
            .dockerfile(&self.dockerfile)
            .service(&self.service)
            .no_cache(self.no_cache)
            .skip_pull(self.skip_pull)
            .dry_run(self.dry_run)
            .app_version(&version);

        if let Some(tag) = &self.tag {
            cfg = cfg.image_tag(tag);
        }
        if let Some(platform) = &self.platform {
            cfg = cfg.platform(platform);
        }
        for (key, value) in &self.build_args {
            cfg = cfg.build_arg(key, value);
        }
        cfg
    }
}

fn parse_build_arg(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
