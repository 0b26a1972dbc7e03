//! Filesystem locations

use std::path::PathBuf;

/// Data directory (~/.ukbsearch), falling back to a relative directory
/// when no home directory can be resolved
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".ukbsearch"))
        .unwrap_or_else(|| PathBuf::from(".ukbsearch"))
}

/// Configuration file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
