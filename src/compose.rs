use std::io::Write;
use std::path::{Path, PathBuf};

use docker_compose_types::Compose;

use crate::error::{DeployError, DeployResult};

pub const BACKUP_SUFFIX: &str = ".backup";

/// Check that `dir` exists and contains `file_name`, returning the
/// full path of the compose file.
pub fn locate(dir: &Path, file_name: &str) -> DeployResult<PathBuf> {
    if !dir.is_dir() {
        return Err(DeployError::DirectoryNotFound(dir.display().to_string()));
    }

    let path = dir.join(file_name);
    if !path.is_file() {
        return Err(DeployError::FileNotFound(path.display().to_string()));
    }
    Ok(path)
}

/// Path of the one-time backup made before the first rewrite.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// A compose descriptor as raw text plus its parsed form. The text
/// is what gets rewritten, so comments and layout survive.
#[derive(Debug, Clone)]
pub struct ComposeFile {
    pub path: PathBuf,
    pub content: String,
    parsed: Compose,
}

impl ComposeFile {
    pub fn load(path: &Path) -> DeployResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let parsed: Compose = serde_yaml::from_str(&content)?;

        Ok(Self {
            path: path.to_path_buf(),
            content,
            parsed,
        })
    }

    /// Image reference currently configured for `service`.
    pub fn service_image(&self, service: &str) -> DeployResult<&str> {
        let entry = self
            .parsed
            .services
            .0
            .get(service)
            .ok_or_else(|| DeployError::ServiceNotFound(service.to_string()))?;

        entry
            .as_ref()
            .and_then(|svc| svc.image.as_deref())
            .ok_or_else(|| DeployError::ImageNotSet(service.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinOutcome {
    /// The image reference was replaced.
    Pinned {
        previous: String,
        backup_created: bool,
    },
    /// The service already used the local tag.
    AlreadyPinned,
}

/// Compute the rewritten compose text for pointing `service` at
/// `tag`. `Ok(None)` means the service already uses `tag`.
///
/// Fails with [`DeployError::ImageLineNotFound`] when the parsed image
/// differs from `tag` but no literal `image:` line carries it, as with
/// flow mappings or anchors.
pub fn prepare_pin(
    compose: &ComposeFile,
    service: &str,
    tag: &str,
) -> DeployResult<Option<(String, String)>> {
    let previous = compose.service_image(service)?;
    if previous == tag {
        return Ok(None);
    }

    rewrite_image(&compose.content, previous, tag)
        .map(|updated| Some((previous.to_string(), updated)))
        .ok_or_else(|| DeployError::ImageLineNotFound {
            service: service.to_string(),
            image: previous.to_string(),
        })
}

/// Point `service` at the locally built `tag`.
///
/// Before the first modification the original file is copied to
/// `<file>.backup`. An existing backup is never overwritten.
pub fn pin_local_image(path: &Path, service: &str, tag: &str) -> DeployResult<PinOutcome> {
    let compose = ComposeFile::load(path)?;
    let Some((previous, updated)) = prepare_pin(&compose, service, tag)? else {
        return Ok(PinOutcome::AlreadyPinned);
    };

    let backup = backup_path(path);
    let backup_created = if backup.exists() {
        false
    } else {
        std::fs::copy(path, &backup)?;
        true
    };

    write_replacing(path, &updated)?;

    Ok(PinOutcome::Pinned {
        previous,
        backup_created,
    })
}

/// Replace `path` by renaming a sibling temp file over it. Keeps the
/// original permissions.
fn write_replacing(path: &Path, content: &str) -> DeployResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let permissions = std::fs::metadata(path)?.permissions();
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().set_permissions(permissions)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Replace every `image:` value equal to `from` with `to`.
///
/// Indentation, quoting, trailing comments and line endings are kept.
/// Returns `None` when no line matched, so applying the rewrite to
/// its own output is a no-op.
#[must_use]
pub fn rewrite_image(content: &str, from: &str, to: &str) -> Option<String> {
    if from == to {
        return None;
    }

    let mut out = String::with_capacity(content.len());
    let mut changed = false;

    for line in content.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        let ending = &line[body.len()..];

        match split_image_value(body) {
            Some((prefix, value, suffix)) if value == from => {
                out.push_str(prefix);
                out.push_str(to);
                out.push_str(suffix);
                out.push_str(ending);
                changed = true;
            }
            _ => out.push_str(line),
        }
    }

    changed.then_some(out)
}

/// Split an `image:` line into (prefix, value, suffix).
fn split_image_value(line: &str) -> Option<(&str, &str, &str)> {
    let rest = line.trim_start().strip_prefix("image:")?;
    let value = rest.trim_start();
    let start = line.len() - value.len();

    let (start, end) = match value.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let close = value[1..].find(quote)?;
            (start + 1, start + 1 + close)
        }
        _ => {
            let unquoted = value.find(" #").map_or(value, |i| &value[..i]);
            (start, start + unquoted.trim_end().len())
        }
    };

    Some((&line[..start], &line[start..end], &line[end..]))
}
