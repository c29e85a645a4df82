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

//! Card configuration as supplied by the host.
//!
//! Keys follow the host's camelCase convention and every option has a
//! default, so an empty object is a valid configuration.

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Relative height hint for the host layout (in card rows).
pub const CARD_SIZE: u32 = 5;

/// Zoom range supported by the basemap over the radar area.
pub const MIN_ZOOM: u8 = 7;
pub const MAX_ZOOM: u8 = 19;

/// Lowest accepted refresh interval, in minutes.
pub const MIN_REFRESH_INTERVAL_MINUTES: u64 = 5;

/// Lowest accepted frame period, in milliseconds.
pub const MIN_ANIMATION_SPEED_MS: u64 = 50;

/// Options recognised by the radar card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardConfig {
    /// Map centre latitude; the host's home location when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    /// Map centre longitude; the host's home location when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,

    /// Initial zoom level (7 - 19)
    #[serde(default = "default_zoom")]
    pub zoom: u8,

    /// Start playing as soon as the first run has loaded
    #[serde(default)]
    pub autoplay: bool,

    /// Minutes ahead of now to show initially
    #[serde(default = "default_time_offset")]
    pub time_offset: i64,

    /// Milliseconds per frame while playing
    #[serde(default = "default_animation_speed")]
    pub animation_speed: u64,

    /// Overlay alpha (0.0 - 1.0)
    #[serde(default = "default_opacity")]
    pub opacity: f32,

    /// Show a marker at the map centre
    #[serde(default)]
    pub show_marker: bool,

    /// Minutes between checks for a newer run
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
}

fn default_zoom() -> u8 {
    MIN_ZOOM
}

fn default_time_offset() -> i64 {
    15
}

fn default_animation_speed() -> u64 {
    200
}

fn default_opacity() -> f32 {
    0.7
}

fn default_refresh_interval() -> u64 {
    30
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            lat: None,
            lon: None,
            zoom: default_zoom(),
            autoplay: false,
            time_offset: default_time_offset(),
            animation_speed: default_animation_speed(),
            opacity: default_opacity(),
            show_marker: false,
            refresh_interval: default_refresh_interval(),
        }
    }
}

impl CardConfig {
    /// Parse a host configuration object and apply limits.
    ///
    /// Unknown keys (such as the host's `type`) are ignored.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)?;
        Ok(config.validated())
    }

    /// Configuration offered by the editor for a freshly added card.
    #[must_use]
    pub fn stub() -> Self {
        Self::default()
    }

    /// Clamp every option into its supported range.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.zoom = self.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.animation_speed = self.animation_speed.max(MIN_ANIMATION_SPEED_MS);
        self.opacity = if self.opacity.is_nan() {
            default_opacity()
        } else {
            self.opacity.clamp(0.0, 1.0)
        };
        self.refresh_interval = self.refresh_interval.max(MIN_REFRESH_INTERVAL_MINUTES);
        self.lat = self.lat.filter(|lat| (-90.0..=90.0).contains(lat));
        self.lon = self.lon.filter(|lon| (-180.0..=180.0).contains(lon));
        self
    }

    /// Map centre, falling back to `home` for missing coordinates.
    #[must_use]
    pub fn location(&self, home: (f64, f64)) -> (f64, f64) {
        (self.lat.unwrap_or(home.0), self.lon.unwrap_or(home.1))
    }

    #[must_use]
    pub fn animation_period(&self) -> Duration {
        Duration::from_millis(self.animation_speed.max(MIN_ANIMATION_SPEED_MS))
    }

    #[must_use]
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_interval.max(MIN_REFRESH_INTERVAL_MINUTES) * 60)
    }

    /// Offset added to the current time when picking the initial frame.
    #[must_use]
    pub fn time_offset(&self) -> TimeDelta {
        TimeDelta::try_minutes(self.time_offset).unwrap_or_else(TimeDelta::zero)
    }
}
