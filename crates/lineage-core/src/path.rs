//! Project-relative path normalization and the containment rule.
//!
//! Every path stored in a plan or entity is normalized first: separators are
//! collapsed, `.` is dropped and `..` is resolved lexically against the
//! project root (it never climbs above the root). The root itself is `.`.

use serde::{Deserialize, Serialize};

/// How a directory pattern relates to the paths below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainmentPolicy {
    /// A pattern covers itself and everything below it, including paths that
    /// did not exist when the graph was built.
    #[default]
    Ancestor,
    /// A pattern covers only the identical path.
    Exact,
}

impl std::str::FromStr for ContainmentPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ancestor" => Ok(Self::Ancestor),
            "exact" => Ok(Self::Exact),
            other => Err(crate::Error::Config(format!(
                "unknown containment policy '{other}' (expected 'ancestor' or 'exact')"
            ))),
        }
    }
}

/// Normalize a project-relative (or root-anchored) path.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(|c| c == '/' || c == '\\') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Whether `pattern` contains `path`. Both must already be normalized.
pub fn contains(pattern: &str, path: &str, policy: ContainmentPolicy) -> bool {
    if pattern == path {
        return true;
    }
    match policy {
        ContainmentPolicy::Exact => false,
        ContainmentPolicy::Ancestor => {
            pattern == "."
                || (path.len() > pattern.len()
                    && path.starts_with(pattern)
                    && path.as_bytes()[pattern.len()] == b'/')
        }
    }
}

/// Parent directory of a normalized path (`None` for the root).
pub fn parent(path: &str) -> Option<&str> {
    if path == "." {
        return None;
    }
    Some(path.rsplit_once('/').map(|(p, _)| p).unwrap_or("."))
}
