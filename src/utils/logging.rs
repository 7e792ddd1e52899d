//! Diagnostic output for the binary.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn";

/// `RUST_LOG` when it parses, else [`DEFAULT_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber: stderr by default, or appended to
/// `log_file` without ANSI colors.
///
/// A second call is a no-op.
pub fn init_tracing(log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_file_is_created_in_append_mode() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("readmegen.log");
        std::fs::write(&path, "previous run\n").expect("seed log");

        init_tracing(Some(&path)).expect("init");
        tracing::warn!("after init");

        let contents = std::fs::read_to_string(&path).expect("read log");
        assert!(contents.starts_with("previous run\n"));
    }

    #[test]
    fn unwritable_log_path_is_reported() {
        let temp_dir = TempDir::new().expect("temp dir");
        let missing = temp_dir.path().join("missing").join("readmegen.log");
        assert!(init_tracing(Some(&missing)).is_err());
    }
}
