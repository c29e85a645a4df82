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

mod app;
mod config;
mod map;
mod ui;

use app::RadarApp;
use clap::Parser;
use config::AppConfig;
use eframe::egui;
use log::warn;
use radar_client::{CardConfig, CARD_SIZE, DEFAULT_BASE_URL};

/// Identifies the card in host configuration objects.
const CARD_TYPE: &str = "custom:buienradar-rain-card";

/// Animated Buienradar precipitation radar.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Map centre latitude
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Map centre longitude
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Initial zoom level (7 - 19)
    #[arg(long)]
    zoom: Option<u8>,

    /// Start playing once the first run has loaded
    #[arg(long)]
    autoplay: bool,

    /// Root of the forecast run images
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Print the effective card configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    /// Command line options win over the stored configuration for this session.
    fn apply(&self, card: &mut CardConfig) {
        if self.lat.is_some() {
            card.lat = self.lat;
        }
        if self.lon.is_some() {
            card.lon = self.lon;
        }
        if let Some(zoom) = self.zoom {
            card.zoom = zoom;
        }
        if self.autoplay {
            card.autoplay = true;
        }
        *card = card.clone().validated();
    }
}

fn card_json(card: &CardConfig) -> serde_json::Result<serde_json::Value> {
    let mut value = serde_json::to_value(card)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("type".to_string(), serde_json::Value::from(CARD_TYPE));
    }
    Ok(value)
}

#[allow(clippy::cast_precision_loss, reason = "card size is a small constant")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load configuration, using defaults: {}", e);
        AppConfig::default()
    });
    args.apply(&mut config.card);

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&card_json(&config.card)?)?);
        return Ok(());
    }

    if let Ok(path) = AppConfig::config_path() {
        log::info!("Using configuration at {}", path.display());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_min_inner_size([320.0, CARD_SIZE as f32 * 50.0])
            .with_title("Rain Radar"),
        ..Default::default()
    };

    let base_url = args.base_url;
    eframe::run_native(
        "Rain Radar",
        options,
        Box::new(move |cc| Ok(Box::new(RadarApp::new(cc, config, base_url)?))),
    )?;
    Ok(())
}
