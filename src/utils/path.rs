use log::warn;
use std::path::{Path, PathBuf};

/// Percent-decode a request path and resolve `.` and `..` segments.
///
/// The result always starts with `/` and can never climb above it, so joining
/// it onto a root directory stays inside that root. Returns `None` when the
/// path cannot name anything on disk (bad escapes, NUL bytes).
pub fn clean_request_path(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw).ok()?;
    if decoded.contains('\0') || (cfg!(windows) && decoded.contains('\\')) {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    Some(format!("/{}", segments.join("/")))
}

/// Join an already cleaned request path onto the filesystem root.
pub fn join_under_root(root: &Path, cleaned: &str) -> PathBuf {
    let relative = cleaned.trim_start_matches('/');
    if relative.is_empty() { root.to_path_buf() } else { root.join(relative) }
}

/// Append a trailing slash unless one is already present
pub fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') { path.to_string() } else { format!("{}/", path) }
}

/// Normalize a route prefix to the `/segment/` form used for matching, warning when it had to be changed
pub fn normalize_prefix(prefix: String) -> String {
    let trimmed = prefix.trim_matches('/');
    let normalized = if trimmed.is_empty() { "/".to_string() } else { format!("/{}/", trimmed) };
    if normalized != prefix {
        warn!("Route prefix should start and end with '/', using: {}", normalized);
    }
    normalized
}
