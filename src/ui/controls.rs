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

//! Playback controls and the status banner.

use egui::{Color32, Rect, Sense};
use radar_client::{CardStatus, FrameView};

const TRACK: Color32 = Color32::from_rgb(60, 64, 70);
const PROGRESS: Color32 = Color32::from_rgb(3, 169, 244);
const ERROR: Color32 = Color32::from_rgb(220, 50, 50);
const MISSING: Color32 = Color32::from_gray(120);

/// User intent from one frame of the control bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    TogglePlay,
    Seek(f32),
    DragSeek(f32),
    Refresh,
    OpenSettings,
}

/// Fraction of the timeline under a pointer x position.
pub fn timeline_fraction(track: Rect, x: f32) -> f32 {
    if track.width() <= 0.0 {
        return 0.0;
    }
    ((x - track.left()) / track.width()).clamp(0.0, 1.0)
}

/// Time label for the active frame, and whether its image failed to load.
pub fn frame_label(frame: Option<&FrameView>) -> (&str, bool) {
    match frame {
        Some(frame) => (frame.label.as_str(), !frame.loaded),
        None => ("--:--", false),
    }
}

/// Play button, timeline and time label. Returns what the user did.
pub fn show_controls(ui: &mut egui::Ui, frame: Option<&FrameView>, playing: bool) -> Vec<ControlAction> {
    let mut actions = Vec::new();

    ui.horizontal(|ui| {
        let icon = if playing { "⏸" } else { "▶" };
        if ui
            .add_enabled(frame.is_some(), egui::Button::new(icon).min_size(egui::vec2(32.0, 24.0)))
            .on_hover_text(if playing { "Pause" } else { "Play" })
            .clicked()
        {
            actions.push(ControlAction::TogglePlay);
        }

        let (label, missing) = frame_label(frame);
        let label_width = 48.0;
        let buttons_width = 64.0;
        let track_width = (ui.available_width() - label_width - buttons_width).max(40.0);

        let (track, response) = ui.allocate_exact_size(egui::vec2(track_width, 24.0), Sense::click_and_drag());
        let painter = ui.painter_at(track);
        let bar = Rect::from_center_size(track.center(), egui::vec2(track.width(), 6.0));
        painter.rect_filled(bar, 3.0, TRACK);

        if let Some(frame) = frame {
            let mut fill = bar;
            fill.set_right(bar.left() + bar.width() * frame.position);
            painter.rect_filled(fill, 3.0, PROGRESS);
            painter.circle_filled(egui::pos2(fill.right(), bar.center().y), 6.0, Color32::WHITE);

            if let Some(pos) = response.interact_pointer_pos() {
                let fraction = timeline_fraction(bar, pos.x);
                if response.dragged() {
                    actions.push(ControlAction::DragSeek(fraction));
                } else if response.clicked() {
                    actions.push(ControlAction::Seek(fraction));
                }
            }
        }

        let mut text = egui::RichText::new(label).monospace();
        if missing {
            text = text.color(MISSING).italics();
        }
        let response = ui.add_sized(egui::vec2(label_width, 24.0), egui::Label::new(text));
        if missing {
            response.on_hover_text("No radar image for this time");
        }

        if ui.small_button("⟳").on_hover_text("Check for a newer run").clicked() {
            actions.push(ControlAction::Refresh);
        }
        if ui.small_button("⚙").on_hover_text("Settings").clicked() {
            actions.push(ControlAction::OpenSettings);
        }
    });

    actions
}

/// Centered message over the map while loading or after an error.
pub fn draw_status(painter: &egui::Painter, rect: Rect, status: &CardStatus) {
    let Some(message) = status.message() else {
        return;
    };

    let (fill, text) = if status.is_error() {
        (ERROR, Color32::WHITE)
    } else {
        (Color32::from_rgba_unmultiplied(25, 30, 35, 220), Color32::from_gray(230))
    };

    let font = egui::FontId::proportional(14.0);
    let galley = painter.layout_no_wrap(message.clone(), font.clone(), text);
    let padding = egui::vec2(14.0, 8.0);
    let bubble = Rect::from_center_size(rect.center(), galley.size() + padding * 2.0);

    painter.rect_filled(bubble, 6.0, fill);
    painter.text(rect.center(), egui::Align2::CENTER_CENTER, message, font, text);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_fraction() {
        let track = Rect::from_min_max(egui::pos2(100.0, 0.0), egui::pos2(300.0, 10.0));
        assert!((timeline_fraction(track, 200.0) - 0.5).abs() < f32::EPSILON);
        assert!(timeline_fraction(track, 50.0).abs() < f32::EPSILON);
        assert!((timeline_fraction(track, 400.0) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_frame_label_flags_missing_images() {
        let mut view = FrameView {
            index: 3,
            total: 37,
            timestamp: chrono::DateTime::<chrono::Utc>::default(),
            label: "10:20".to_string(),
            position: 0.25,
            url: "https://radar.test/a.png".to_string(),
            loaded: true,
        };
        assert_eq!(frame_label(Some(&view)), ("10:20", false));
        view.loaded = false;
        assert_eq!(frame_label(Some(&view)), ("10:20", true));
        assert_eq!(frame_label(None), ("--:--", false));
    }

    #[test]
    fn test_empty_track() {
        let track = Rect::from_min_max(egui::pos2(10.0, 0.0), egui::pos2(10.0, 10.0));
        assert!(timeline_fraction(track, 10.0).abs() < f32::EPSILON);
    }
}
