use crate::core::config::data::Config;
use crate::core::config::keys::ConfigKey;

impl Config {
    /// Lines for `config show`; unset keys display their effective default.
    pub fn describe(&self) -> Vec<String> {
        ConfigKey::ALL
            .iter()
            .map(|key| match self.get_value(*key) {
                Some(value) => format!("  {key}: {value}"),
                None => format!("  {key}: {} (default)", self.effective_value(*key)),
            })
            .collect()
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        for line in self.describe() {
            println!("{line}");
        }
    }

    fn effective_value(&self, key: ConfigKey) -> String {
        match key {
            ConfigKey::ApiUrl => self.api_url(),
            ConfigKey::PerPage => self.per_page().to_string(),
            ConfigKey::DebounceMs => self.debounce().as_millis().to_string(),
            ConfigKey::ConnectTimeoutSecs => self.task_timeouts().connect.as_secs().to_string(),
            ConfigKey::TaskTimeoutSecs => self.task_timeouts().task.as_secs().to_string(),
            ConfigKey::DefaultSplitMode => self.split_mode().as_str().to_string(),
            ConfigKey::UseKeyring => match self.use_keyring() {
                true => "on".to_string(),
                false => "off".to_string(),
            },
        }
    }
}
