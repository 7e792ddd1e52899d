use std::error::Error;

use clap::Subcommand;

use crate::core::config::{path_display, Config, ConfigKey};

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Show one key, or every key when none is given
    Get {
        /// Configuration key, e.g. api-url
        key: Option<String>,
    },
    /// Set a configuration value
    Set {
        /// Configuration key, e.g. per-page
        key: String,
        /// New value
        value: String,
    },
    /// Remove a value so its default applies again
    Unset {
        /// Configuration key
        key: String,
    },
}

pub fn run(command: ConfigCommand) -> Result<(), Box<dyn Error>> {
    match command {
        ConfigCommand::Get { key: None } => {
            let config = Config::load()?;
            config.print_all();
            println!("  (file: {})", path_display(Config::get_config_path()));
        }
        ConfigCommand::Get { key: Some(key) } => {
            let key: ConfigKey = key.parse()?;
            let config = Config::load()?;
            match config.get_value(key) {
                Some(value) => println!("{value}"),
                None => println!("(unset)"),
            }
        }
        ConfigCommand::Set { key, value } => {
            let key: ConfigKey = key.parse()?;
            Config::mutate(|config| config.set_value(key, &value))?;
            println!("✅ Set {key} to: {}", value.trim());
        }
        ConfigCommand::Unset { key } => {
            let key: ConfigKey = key.parse()?;
            Config::mutate(|config| {
                config.unset_value(key);
                Ok(())
            })?;
            println!("✅ Unset {key}");
        }
    }
    Ok(())
}
