mod common;

use std::cell::RefCell;
use std::time::Duration;

use common::{COMPOSE, FakeRunner, deploy_dir, read};
use relaunch::cmd::{CommandOutput, Invocation, Runner};
use relaunch::compose::backup_path;
use relaunch::error::{DeployError, DeployResult};
use relaunch::retry::CancelToken;
use relaunch::{DeployConfig, HealthOutcome, PinOutcome, Pipeline, Step};

fn config(dir: &std::path::Path) -> DeployConfig {
    DeployConfig::new(dir)
        .source_dir("/src/shop")
        .health_interval(Duration::ZERO)
        .app_version("3.1.0")
}

#[test]
fn full_run_executes_steps_in_order() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path());
    let runner = FakeRunner::new().statuses(&["starting", "healthy"]);

    let report = Pipeline::new(&config, &runner, CancelToken::new())
        .run()
        .unwrap();

    assert_eq!(
        runner.rendered(),
        [
            "git pull",
            "docker build --build-arg APP_VERSION=3.1.0 -f Dockerfile -t app:local .",
            "docker compose -f docker-compose.yml down",
            "docker compose -f docker-compose.yml up -d",
            "docker compose -f docker-compose.yml ps -q app",
            "docker inspect --format {{json .State.Health}} abc123",
            "docker compose -f docker-compose.yml ps -q app",
            "docker inspect --format {{json .State.Health}} abc123",
            "docker compose -f docker-compose.yml ps",
        ]
    );
    assert_eq!(report.health, Some(HealthOutcome::Healthy { attempts: 2 }));
    assert_eq!(
        report.pin,
        Some(PinOutcome::Pinned {
            previous: "ghcr.io/acme/shop:latest".into(),
            backup_created: true,
        })
    );
    assert_eq!(report.image_tag, "app:local");
    assert_eq!(report.app_version, "3.1.0");
    assert!(read(&dir.path().join("docker-compose.yml")).contains("image: app:local"));
}

#[test]
fn skip_pull_omits_only_the_pull() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path()).skip_pull(true);
    let runner = FakeRunner::healthy().missing("git");

    Pipeline::new(&config, &runner, CancelToken::new())
        .run()
        .unwrap();

    assert_eq!(runner.count("git"), 0);
    assert_eq!(runner.count("docker build"), 1);
    assert_eq!(runner.count(" down"), 1);
    assert_eq!(runner.count("up -d"), 1);
}

#[test]
fn build_flags_are_forwarded() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path())
        .platform("linux/amd64")
        .no_cache(true)
        .build_arg("FEATURES", "full");
    let runner = FakeRunner::healthy();

    Pipeline::new(&config, &runner, CancelToken::new())
        .run()
        .unwrap();

    let build = runner
        .calls()
        .into_iter()
        .find(|c| c.has_arg("build"))
        .unwrap();
    assert!(build.to_string().contains("--platform linux/amd64 --no-cache"));
    assert!(build.has_arg("FEATURES=full"));
    assert_eq!(build.dir.as_deref(), Some(std::path::Path::new("/src/shop")));
}

#[test]
fn missing_compose_file_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let runner = FakeRunner::healthy();

    let err = Pipeline::new(&config, &runner, CancelToken::new())
        .run()
        .unwrap_err();

    assert!(matches!(err, DeployError::FileNotFound(_)));
    assert!(runner.calls().is_empty());
}

#[test]
fn missing_directory_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir.path().join("absent"));
    let runner = FakeRunner::healthy();

    let err = Pipeline::new(&config, &runner, CancelToken::new())
        .run()
        .unwrap_err();

    assert!(matches!(err, DeployError::DirectoryNotFound(_)));
    assert!(runner.calls().is_empty());
}

#[test]
fn unknown_service_fails_before_build() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path()).service("worker");
    let runner = FakeRunner::healthy();

    let err = Pipeline::new(&config, &runner, CancelToken::new())
        .run()
        .unwrap_err();

    assert!(matches!(err, DeployError::ServiceNotFound(_)));
    assert!(runner.calls().is_empty());
}

#[test]
fn missing_docker_is_a_prerequisite_error() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path());
    let runner = FakeRunner::healthy().missing("docker");

    let err = Pipeline::new(&config, &runner, CancelToken::new())
        .run()
        .unwrap_err();

    assert!(matches!(err, DeployError::PrerequisiteMissing(ref m) if m.starts_with("docker")));
    assert!(runner.calls().is_empty());
}

#[test]
fn build_failure_aborts_before_touching_compose() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path());
    let runner = FakeRunner::healthy().failing_on("docker build");
    let path = dir.path().join("docker-compose.yml");

    let err = Pipeline::new(&config, &runner, CancelToken::new())
        .run()
        .unwrap_err();

    assert!(matches!(err, DeployError::CommandFailed { code: Some(1), .. }));
    assert_eq!(read(&path), COMPOSE);
    assert!(!backup_path(&path).exists());
    assert_eq!(runner.count("down"), 0);
    assert_eq!(runner.count("up -d"), 0);
}

#[test]
fn restart_failure_aborts_without_health_check() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path());
    let runner = FakeRunner::healthy().failing_on("up -d");

    let err = Pipeline::new(&config, &runner, CancelToken::new())
        .run()
        .unwrap_err();

    assert!(matches!(err, DeployError::CommandFailed { .. }));
    assert_eq!(runner.count("docker inspect"), 0);
}

#[test]
fn health_timeout_is_not_an_error() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path()).health_attempts(3);
    let runner = FakeRunner::new().statuses(&["unhealthy", "unhealthy", "unhealthy"]);

    let report = Pipeline::new(&config, &runner, CancelToken::new())
        .run()
        .unwrap();

    assert_eq!(report.health, Some(HealthOutcome::TimedOut { attempts: 3 }));
    assert_eq!(runner.count("docker inspect"), 3);
    assert_eq!(
        runner.count("docker compose -f docker-compose.yml logs --tail 50 app"),
        1
    );
}

#[test]
fn diagnostics_failure_only_warns() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path()).health_attempts(1);
    let runner = FakeRunner::new().failing_on("logs");

    let report = Pipeline::new(&config, &runner, CancelToken::new())
        .run()
        .unwrap();

    assert_eq!(report.health, Some(HealthOutcome::TimedOut { attempts: 1 }));
}

#[test]
fn second_run_keeps_first_backup() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path());
    let path = dir.path().join("docker-compose.yml");

    let runner = FakeRunner::healthy();
    Pipeline::new(&config, &runner, CancelToken::new())
        .run()
        .unwrap();
    let runner = FakeRunner::healthy();
    let report = Pipeline::new(&config, &runner, CancelToken::new())
        .run()
        .unwrap();

    assert_eq!(report.pin, Some(PinOutcome::AlreadyPinned));
    assert_eq!(read(&backup_path(&path)), COMPOSE);
}

#[test]
fn cancelled_run_executes_nothing() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path());
    let runner = FakeRunner::healthy();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = Pipeline::new(&config, &runner, cancel).run().unwrap_err();

    assert!(matches!(err, DeployError::Cancelled));
    assert!(runner.calls().is_empty());
}

/// Simulates Ctrl-C during `docker build`: the token fires and the
/// killed child reports a signal exit.
struct InterruptedBuild {
    cancel: CancelToken,
    streamed: RefCell<Vec<String>>,
}

impl Runner for InterruptedBuild {
    fn capture(&self, _invocation: &Invocation) -> DeployResult<CommandOutput> {
        Ok(CommandOutput::new(Some(0), "", ""))
    }

    fn stream(&self, invocation: &Invocation) -> DeployResult<()> {
        self.streamed.borrow_mut().push(invocation.to_string());
        if invocation.has_arg("build") {
            self.cancel.cancel();
            return Err(DeployError::CommandFailed {
                command: invocation.to_string(),
                code: None,
            });
        }
        Ok(())
    }

    fn command_exists(&self, _program: &str) -> bool {
        true
    }
}

#[test]
fn interrupt_during_step_reports_cancelled() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path());
    let path = dir.path().join("docker-compose.yml");
    let cancel = CancelToken::new();
    let runner = InterruptedBuild {
        cancel: cancel.clone(),
        streamed: RefCell::new(Vec::new()),
    };

    let err = Pipeline::new(&config, &runner, cancel).run().unwrap_err();

    assert!(matches!(err, DeployError::Cancelled));
    assert_eq!(runner.streamed.borrow().len(), 2);
    assert_eq!(read(&path), COMPOSE);
    assert!(!backup_path(&path).exists());
}

#[test]
fn flow_mapping_image_fails_before_any_command() {
    let content = "services:\n  app: { image: \"acme/shop:1.0\" }\n";
    let dir = deploy_dir(content);
    let config = config(dir.path());
    let runner = FakeRunner::healthy();
    let pipeline = Pipeline::new(&config, &runner, CancelToken::new());

    assert!(matches!(
        pipeline.dry_run().unwrap_err(),
        DeployError::ImageLineNotFound { .. }
    ));
    assert!(matches!(
        pipeline.run().unwrap_err(),
        DeployError::ImageLineNotFound { .. }
    ));
    assert!(runner.calls().is_empty());
    assert_eq!(read(&dir.path().join("docker-compose.yml")), content);
}

#[test]
fn plan_lists_steps_without_side_effects() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path()).skip_pull(true);
    let runner = FakeRunner::healthy();
    let path = dir.path().join("docker-compose.yml");

    let steps = Pipeline::new(&config, &runner, CancelToken::new())
        .dry_run()
        .unwrap();

    assert_eq!(steps.len(), 5);
    assert!(matches!(steps[0], Step::Build(_)));
    assert!(matches!(
        steps[1],
        Step::PinImage { ref current, ref tag, .. }
            if current == "ghcr.io/acme/shop:latest" && tag == "app:local"
    ));
    assert!(matches!(steps[4], Step::WaitHealthy { .. }));
    assert!(runner.calls().is_empty());
    assert_eq!(read(&path), COMPOSE);
    assert!(!backup_path(&path).exists());
}

#[test]
fn step_display_reads_as_plan() {
    let dir = deploy_dir(COMPOSE);
    let config = config(dir.path());
    let runner = FakeRunner::healthy();

    let steps = Pipeline::new(&config, &runner, CancelToken::new())
        .plan()
        .unwrap();

    assert_eq!(steps[0].to_string(), "Pull latest source: git pull (in /src/shop)");
    assert!(steps[2].to_string().contains("'app' ghcr.io/acme/shop:latest -> app:local"));
    assert_eq!(
        steps[5].to_string(),
        "Wait for health: 'app' (up to 12 checks, every 0s)"
    );
    assert_eq!(steps[0].invocation().map(|i| i.program.as_str()), Some("git"));
    assert!(steps[2].invocation().is_none());
}
