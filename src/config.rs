// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! The persisted settings live in a TOML file managed by `confy`. The card
//! options are stored verbatim so the same values can be printed as a host
//! configuration object with `--print-config`.

use radar_client::{CardConfig, DEFAULT_HOME};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "rainradar-desktop";
const CONFIG_NAME: &str = "config";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Radar card options
    #[serde(default)]
    pub card: CardConfig,

    /// Home latitude used when the card has no explicit location
    #[serde(default = "default_home_latitude")]
    pub home_latitude: f64,

    /// Home longitude used when the card has no explicit location
    #[serde(default = "default_home_longitude")]
    pub home_longitude: f64,

    /// Initial window width in points
    #[serde(default = "default_window_width")]
    pub window_width: f32,

    /// Initial window height in points
    #[serde(default = "default_window_height")]
    pub window_height: f32,
}

fn default_config_version() -> u32 {
    1
}

fn default_home_latitude() -> f64 {
    DEFAULT_HOME.0
}

fn default_home_longitude() -> f64 {
    DEFAULT_HOME.1
}

fn default_window_width() -> f32 {
    900.0
}

fn default_window_height() -> f32 {
    700.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            card: CardConfig::default(),
            home_latitude: default_home_latitude(),
            home_longitude: default_home_longitude(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        let mut config: AppConfig = confy::load(APP_NAME, CONFIG_NAME)?;
        if config.config_version < default_config_version() {
            log::info!(
                "Upgrading configuration from version {} to {}",
                config.config_version,
                default_config_version()
            );
            config.config_version = default_config_version();
            config.save()?;
        }
        config.card = config.card.validated();
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Home location as `(lat, lon)`
    pub fn home(&self) -> (f64, f64) {
        (self.home_latitude, self.home_longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.home(), DEFAULT_HOME);
        assert_eq!(config.card.zoom, 7);
    }

    #[test]
    fn test_card_keys_keep_camel_case() {
        let config = AppConfig {
            card: CardConfig {
                show_marker: true,
                refresh_interval: 10,
                ..CardConfig::default()
            },
            ..AppConfig::default()
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["card"]["showMarker"], true);
        assert_eq!(value["card"]["refreshInterval"], 10);
        assert!(value["card"].get("lat").is_none());
    }
}
