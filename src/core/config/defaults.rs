use std::time::Duration;

use crate::api::SplitMode;
use crate::core::config::data::Config;
use crate::core::repos::DEFAULT_PER_PAGE;
use crate::core::sections::editor::DEFAULT_DEBOUNCE;
use crate::core::task::TaskTimeouts;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const API_URL_ENV: &str = "READMEGEN_API_URL";

impl Config {
    /// API origin; the environment override wins over the file.
    pub fn api_url(&self) -> String {
        self.api_url_with_env(std::env::var(API_URL_ENV).ok())
    }

    pub(crate) fn api_url_with_env(&self, env_value: Option<String>) -> String {
        env_value
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.filter(|value| *value > 0).unwrap_or(DEFAULT_PER_PAGE)
    }

    pub fn debounce(&self) -> Duration {
        self.debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DEBOUNCE)
    }

    pub fn task_timeouts(&self) -> TaskTimeouts {
        let defaults = TaskTimeouts::default();
        TaskTimeouts {
            connect: self
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect),
            task: self
                .task_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.task),
        }
    }

    pub fn split_mode(&self) -> SplitMode {
        self.default_split_mode.unwrap_or_default()
    }

    pub fn use_keyring(&self) -> bool {
        self.use_keyring.unwrap_or(true)
    }
}
