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

//! Settings window for the radar card options.

use radar_client::config::{MAX_ZOOM, MIN_ANIMATION_SPEED_MS, MIN_REFRESH_INTERVAL_MINUTES, MIN_ZOOM};
use radar_client::CardConfig;

/// Emitted whenever a field in the editor changes.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEvent {
    Changed(CardConfig),
}

#[derive(Debug)]
pub struct ConfigEditor {
    pub open: bool,
    draft: CardConfig,
    home: (f64, f64),
}

impl ConfigEditor {
    pub fn new(config: CardConfig, home: (f64, f64)) -> Self {
        Self {
            open: false,
            draft: config,
            home,
        }
    }

    /// Render the window; returns the new options when something changed.
    pub fn show(&mut self, ctx: &egui::Context) -> Option<ConfigEvent> {
        if !self.open {
            return None;
        }

        let mut open = self.open;
        let mut changed = false;
        egui::Window::new("Radar settings")
            .open(&mut open)
            .resizable(false)
            .collapsible(false)
            .default_width(280.0)
            .show(ctx, |ui| {
                changed = self.fields(ui);
            });
        self.open = open;

        changed.then(|| {
            self.draft = self.draft.clone().validated();
            ConfigEvent::Changed(self.draft.clone())
        })
    }

    fn fields(&mut self, ui: &mut egui::Ui) -> bool {
        let mut changed = false;
        let draft = &mut self.draft;

        egui::Grid::new("radar_settings")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                ui.label("Location");
                let mut custom = draft.lat.is_some() && draft.lon.is_some();
                if ui.checkbox(&mut custom, "Custom").changed() {
                    changed = true;
                    if custom {
                        draft.lat = Some(self.home.0);
                        draft.lon = Some(self.home.1);
                    } else {
                        draft.lat = None;
                        draft.lon = None;
                    }
                }
                ui.end_row();

                if let (Some(lat), Some(lon)) = (draft.lat.as_mut(), draft.lon.as_mut()) {
                    ui.label("Latitude");
                    changed |= ui
                        .add(egui::DragValue::new(lat).speed(0.01).range(-90.0..=90.0).max_decimals(4))
                        .changed();
                    ui.end_row();

                    ui.label("Longitude");
                    changed |= ui
                        .add(egui::DragValue::new(lon).speed(0.01).range(-180.0..=180.0).max_decimals(4))
                        .changed();
                    ui.end_row();
                }

                ui.label("Zoom");
                changed |= ui.add(egui::Slider::new(&mut draft.zoom, MIN_ZOOM..=MAX_ZOOM)).changed();
                ui.end_row();

                ui.label("Opacity");
                changed |= ui.add(egui::Slider::new(&mut draft.opacity, 0.0..=1.0)).changed();
                ui.end_row();

                ui.label("Frame time (ms)");
                changed |= ui
                    .add(egui::DragValue::new(&mut draft.animation_speed).range(MIN_ANIMATION_SPEED_MS..=5000))
                    .changed();
                ui.end_row();

                ui.label("Time offset (min)");
                changed |= ui
                    .add(egui::DragValue::new(&mut draft.time_offset).range(-60..=180))
                    .changed();
                ui.end_row();

                ui.label("Refresh (min)");
                changed |= ui
                    .add(egui::DragValue::new(&mut draft.refresh_interval).range(MIN_REFRESH_INTERVAL_MINUTES..=1440))
                    .changed();
                ui.end_row();

                ui.label("Autoplay");
                changed |= ui.checkbox(&mut draft.autoplay, "").changed();
                ui.end_row();

                ui.label("Show marker");
                changed |= ui.checkbox(&mut draft.show_marker, "").changed();
                ui.end_row();
            });

        ui.separator();
        if ui.button("Reset to defaults").clicked() {
            *draft = CardConfig::stub();
            changed = true;
        }

        changed
    }
}
