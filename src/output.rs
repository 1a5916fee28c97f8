//! Severity-tagged terminal output. Everything goes to stderr so
//! stdout stays free for generated content such as the dry-run
//! plan.

use colored::{ColoredString, Colorize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warn,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "[INFO]",
            Self::Success => "[OK]",
            Self::Warn => "[WARN]",
            Self::Error => "[ERROR]",
        }
    }

    fn tag(self) -> ColoredString {
        let label = self.label();
        match self {
            Self::Info => label.blue().bold(),
            Self::Success => label.green().bold(),
            Self::Warn => label.yellow().bold(),
            Self::Error => label.red().bold(),
        }
    }
}

#[must_use]
pub fn format_line(severity: Severity, msg: &str) -> String {
    format!("{} {msg}", severity.tag())
}

pub fn info(msg: &str) {
    eprintln!("{}", format_line(Severity::Info, msg));
}

pub fn success(msg: &str) {
    eprintln!("{}", format_line(Severity::Success, msg));
}

pub fn warn(msg: &str) {
    eprintln!("{}", format_line(Severity::Warn, msg));
}

pub fn error(msg: &str) {
    eprintln!("{}", format_line(Severity::Error, msg));
}

/// Bold section header.
pub fn banner(title: &str) {
    eprintln!();
    eprintln!("{}", format!("=== {title} ===").bold());
}
