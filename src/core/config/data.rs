use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::SplitMode;

/// On-disk settings. Every field is optional; accessors in `defaults` supply
/// the fallback values.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// API origin, e.g. `https://api.readme.dev`
    pub api_url: Option<String>,
    /// Repositories requested per page
    pub per_page: Option<u32>,
    /// Quiet period before an edited section is saved
    pub debounce_ms: Option<u64>,
    /// Wait for the task stream's `connected` event
    pub connect_timeout_secs: Option<u64>,
    /// Wait for a task's terminal event before polling the fallback
    pub task_timeout_secs: Option<u64>,
    pub default_split_mode: Option<SplitMode>,
    /// Persist session cookies in the system keyring
    pub use_keyring: Option<bool>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.config/readmegen/config.toml` → `~/.config/readmegen/config.toml`
/// - Windows: paths are shown unchanged
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
