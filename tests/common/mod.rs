#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;

use relaunch::error::{DeployError, DeployResult};
use relaunch::{CommandOutput, Invocation, Runner};

pub const COMPOSE: &str = "\
services:
  app:
    image: ghcr.io/acme/shop:latest # from CI
    restart: unless-stopped
    ports:
      - \"8080:8080\"
  db:
    image: postgres:16
";

/// Write `content` as `docker-compose.yml` in a fresh temp dir.
pub fn deploy_dir(content: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("docker-compose.yml"), content).expect("write compose");
    dir
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).expect("read")
}

/// Records every invocation and answers Docker queries from a
/// scripted list of health statuses.
pub struct FakeRunner {
    calls: RefCell<Vec<Invocation>>,
    statuses: RefCell<VecDeque<String>>,
    container_id: Option<String>,
    failing: Option<String>,
    missing: Vec<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            statuses: RefCell::new(VecDeque::new()),
            container_id: Some("abc123".to_string()),
            failing: None,
            missing: Vec::new(),
        }
    }

    /// Health statuses returned by successive inspections. Once
    /// exhausted every inspection reports `starting`.
    pub fn statuses(self, statuses: &[&str]) -> Self {
        self.statuses
            .borrow_mut()
            .extend(statuses.iter().map(ToString::to_string));
        self
    }

    pub fn healthy() -> Self {
        Self::new().statuses(&["healthy"])
    }

    pub fn without_container(mut self) -> Self {
        self.container_id = None;
        self
    }

    /// Fail any command whose rendered line contains `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.failing = Some(needle.to_string());
        self
    }

    pub fn missing(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    pub fn rendered(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ToString::to_string).collect()
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.rendered().iter().filter(|c| c.contains(needle)).count()
    }

    fn fails(&self, invocation: &Invocation) -> bool {
        self.failing
            .as_deref()
            .is_some_and(|needle| invocation.to_string().contains(needle))
    }
}

impl Runner for FakeRunner {
    fn capture(&self, invocation: &Invocation) -> DeployResult<CommandOutput> {
        self.calls.borrow_mut().push(invocation.clone());

        if self.fails(invocation) {
            return Ok(CommandOutput::new(Some(1), "", "simulated failure"));
        }

        if invocation.has_arg("ps") && invocation.has_arg("-q") {
            let id = self.container_id.as_deref().unwrap_or("");
            return Ok(CommandOutput::new(Some(0), &format!("{id}\n"), ""));
        }

        if invocation.args.first().map(String::as_str) == Some("inspect") {
            let status = self
                .statuses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| "starting".to_string());
            let json = format!("{{\"Status\":\"{status}\",\"FailingStreak\":0}}\n");
            return Ok(CommandOutput::new(Some(0), &json, ""));
        }

        Ok(CommandOutput::new(Some(0), "", ""))
    }

    fn stream(&self, invocation: &Invocation) -> DeployResult<()> {
        self.calls.borrow_mut().push(invocation.clone());

        if self.fails(invocation) {
            return Err(DeployError::CommandFailed {
                command: invocation.to_string(),
                code: Some(1),
            });
        }
        Ok(())
    }

    fn command_exists(&self, program: &str) -> bool {
        !self.missing.iter().any(|m| m == program)
    }
}
