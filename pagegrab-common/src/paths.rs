//! Filesystem path helpers.

use std::path::{Path, PathBuf};

/// Expand a leading `~/` (or a bare `~`) to `$HOME`. Other paths are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Some(raw) = path.to_str() else {
        return path.to_path_buf();
    };
    let home = std::env::var("HOME").ok();
    match (raw, home) {
        ("~", Some(home)) => PathBuf::from(home),
        (other, Some(home)) => match other.strip_prefix("~/") {
            Some(rest) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// `~/.local/share/<app_name>`, or `./<app_name>` when `$HOME` is unset.
pub fn default_data_dir(app_name: &str) -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(app_name)
    } else {
        PathBuf::from(".").join(app_name)
    }
}
