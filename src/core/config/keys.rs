use std::fmt;
use std::str::FromStr;

use crate::api::SplitMode;
use crate::core::config::data::Config;
use crate::core::config::io::ConfigError;

/// Settings reachable from `config get|set|unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ApiUrl,
    PerPage,
    DebounceMs,
    ConnectTimeoutSecs,
    TaskTimeoutSecs,
    DefaultSplitMode,
    UseKeyring,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 7] = [
        ConfigKey::ApiUrl,
        ConfigKey::PerPage,
        ConfigKey::DebounceMs,
        ConfigKey::ConnectTimeoutSecs,
        ConfigKey::TaskTimeoutSecs,
        ConfigKey::DefaultSplitMode,
        ConfigKey::UseKeyring,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::ApiUrl => "api-url",
            ConfigKey::PerPage => "per-page",
            ConfigKey::DebounceMs => "debounce-ms",
            ConfigKey::ConnectTimeoutSecs => "connect-timeout-secs",
            ConfigKey::TaskTimeoutSecs => "task-timeout-secs",
            ConfigKey::DefaultSplitMode => "default-split-mode",
            ConfigKey::UseKeyring => "use-keyring",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownKey(value.to_string()))
    }
}

fn parse<T: FromStr>(key: ConfigKey, value: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    value.trim().parse::<T>().map_err(|err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: err.to_string(),
    })
}

fn parse_bool(key: ConfigKey, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected on/off, got '{other}'"),
        }),
    }
}

impl Config {
    /// Stored value for `key`, or `None` when unset.
    pub fn get_value(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::ApiUrl => self.api_url.clone(),
            ConfigKey::PerPage => self.per_page.map(|value| value.to_string()),
            ConfigKey::DebounceMs => self.debounce_ms.map(|value| value.to_string()),
            ConfigKey::ConnectTimeoutSecs => {
                self.connect_timeout_secs.map(|value| value.to_string())
            }
            ConfigKey::TaskTimeoutSecs => self.task_timeout_secs.map(|value| value.to_string()),
            ConfigKey::DefaultSplitMode => self
                .default_split_mode
                .map(|mode| mode.as_str().to_string()),
            ConfigKey::UseKeyring => self
                .use_keyring
                .map(|enabled| if enabled { "on" } else { "off" }.to_string()),
        }
    }

    pub fn set_value(&mut self, key: ConfigKey, value: &str) -> Result<(), ConfigError> {
        match key {
            ConfigKey::ApiUrl => {
                let url = value.trim();
                if reqwest::Url::parse(url).is_err() {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("'{url}' is not an absolute URL"),
                    });
                }
                self.api_url = Some(url.to_string());
            }
            ConfigKey::PerPage => {
                let per_page: u32 = parse(key, value)?;
                if per_page == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: "must be at least 1".to_string(),
                    });
                }
                self.per_page = Some(per_page);
            }
            ConfigKey::DebounceMs => self.debounce_ms = Some(parse(key, value)?),
            ConfigKey::ConnectTimeoutSecs => self.connect_timeout_secs = Some(parse(key, value)?),
            ConfigKey::TaskTimeoutSecs => self.task_timeout_secs = Some(parse(key, value)?),
            ConfigKey::DefaultSplitMode => {
                self.default_split_mode = Some(parse::<SplitMode>(key, value)?)
            }
            ConfigKey::UseKeyring => self.use_keyring = Some(parse_bool(key, value)?),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::ApiUrl => self.api_url = None,
            ConfigKey::PerPage => self.per_page = None,
            ConfigKey::DebounceMs => self.debounce_ms = None,
            ConfigKey::ConnectTimeoutSecs => self.connect_timeout_secs = None,
            ConfigKey::TaskTimeoutSecs => self.task_timeout_secs = None,
            ConfigKey::DefaultSplitMode => self.default_split_mode = None,
            ConfigKey::UseKeyring => self.use_keyring = None,
        }
    }
}
