use std::path::PathBuf;

/// A prefix substitution rule from a remote web path to a local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub remote_path: String,
    pub local_path: String,
}

impl PathMapping {
    pub fn new(remote_path: impl Into<String>, local_path: impl Into<String>) -> Self {
        Self {
            remote_path: remote_path.into(),
            local_path: local_path.into(),
        }
    }
}

/// Error returned when no configured mapping covers a web path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("couldn't find config for remote file: {web_path}")]
pub struct NotFound {
    pub web_path: String,
}

/// Resolve a remote web path to a local filesystem path.
///
/// Every mapping whose `remote_path` is a prefix of `web_path` produces a
/// candidate, and later candidates overwrite earlier ones: the last matching
/// mapping in declared order wins. This is not a longest-prefix match.
pub fn resolve(web_path: &str, mappings: &[PathMapping]) -> Result<PathBuf, NotFound> {
    let mut resolved = None;

    for mapping in mappings {
        if let Some(rest) = web_path.strip_prefix(mapping.remote_path.as_str()) {
            resolved = Some(format!("{}{rest}", mapping.local_path));
        }
    }

    resolved.map(PathBuf::from).ok_or_else(|| NotFound {
        web_path: web_path.to_owned(),
    })
}

/// The name recorded for a downloaded file: the last segment of its web path.
pub fn file_name(web_path: &str) -> &str {
    if web_path.is_empty() {
        return ".";
    }
    let trimmed = web_path.trim_end_matches('/');
    match trimmed.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => "/",
    }
}
