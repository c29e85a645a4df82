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

//! Interactive map: basemap tiles, radar overlay and home marker.

use super::overlay::OverlayTextures;
use super::projection::Viewport;
use super::surface::SharedScene;
use super::tiles::{visible_tiles, TileManager, ATTRIBUTION};
use egui::{Color32, Pos2, Rect, Sense, Stroke};
use radar_client::config::{MAX_ZOOM, MIN_ZOOM};
use radar_client::{GeoBounds, RADAR_BOUNDS};

const BACKGROUND: Color32 = Color32::from_rgb(14, 14, 14);
const MARKER_FILL: Color32 = Color32::from_rgb(3, 169, 244);
const FULL_UV: Rect = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));

/// Camera state owned by the UI thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
}

impl MapView {
    pub fn new(lat: f64, lon: f64, zoom: u8) -> Self {
        let mut view = Self {
            center_lat: lat,
            center_lon: lon,
            zoom: f64::from(zoom),
        };
        view.constrain();
        view
    }

    /// Keep the camera over the radar coverage and inside the zoom range.
    fn constrain(&mut self) {
        let (lat, lon) = RADAR_BOUNDS.clamp(self.center_lat, self.center_lon);
        self.center_lat = lat;
        self.center_lon = lon;
        self.zoom = self.zoom.clamp(f64::from(MIN_ZOOM), f64::from(MAX_ZOOM));
    }

    fn viewport(&self, rect: Rect) -> Viewport {
        Viewport {
            center_lat: self.center_lat,
            center_lon: self.center_lon,
            zoom: self.zoom,
            origin: (rect.center().x, rect.center().y),
        }
    }

    /// Move the centre so the map follows a pointer drag of `delta` points.
    pub fn pan(&mut self, rect: Rect, delta: egui::Vec2) {
        let center = rect.center() - delta;
        let (lat, lon) = self.viewport(rect).unproject(center.x, center.y);
        self.center_lat = lat;
        self.center_lon = lon;
        self.constrain();
    }

    pub fn zoom_by(&mut self, levels: f64) {
        self.zoom += levels;
        self.constrain();
    }

    /// Draw the map into all remaining space of `ui`.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        scene: &SharedScene,
        tiles: &TileManager,
        overlays: &mut OverlayTextures,
    ) -> egui::Response {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;
        let ctx = ui.ctx().clone();

        let (overlay, marker) = match scene.lock() {
            Ok(mut scene) => {
                if let Some(request) = scene.pending_view.take() {
                    *self = Self::new(request.lat, request.lon, request.zoom);
                }
                (scene.overlay().cloned(), scene.marker().copied())
            }
            Err(_) => (None, None),
        };

        if response.dragged() {
            self.pan(rect, response.drag_delta());
        }
        if response.hovered() {
            let (zoom_delta, scroll) = ui.input(|i| (i.zoom_delta(), i.smooth_scroll_delta.y));
            let levels = f64::from(zoom_delta).log2() + f64::from(scroll) / 200.0;
            if levels.abs() > f64::EPSILON {
                self.zoom_by(levels);
            }
        }

        painter.rect_filled(rect, 0.0, BACKGROUND);

        let center = rect.center();
        for tile in visible_tiles(self.center_lat, self.center_lon, self.zoom, rect.width(), rect.height()) {
            let Some(texture) = tiles.get_tile(tile.coord, &ctx) else {
                continue;
            };
            let tile_rect = Rect::from_min_size(
                center + egui::vec2(tile.offset_x, tile.offset_y),
                egui::vec2(tile.size, tile.size),
            );
            if rect.intersects(tile_rect) {
                painter.image(texture.id(), tile_rect, FULL_UV, Color32::WHITE);
            }
        }

        let viewport = self.viewport(rect);
        if let Some(overlay) = overlay {
            if let Some(texture) = overlays.get(&ctx, &overlay.url) {
                let tint = Color32::WHITE.gamma_multiply(overlay.opacity);
                painter.image(texture.id(), bounds_rect(&viewport, overlay.bounds), FULL_UV, tint);
            }
        }

        if let Some(marker) = marker {
            let (x, y) = viewport.project(marker.lat, marker.lon);
            let pos = Pos2::new(x, y);
            if rect.contains(pos) {
                painter.circle_filled(pos, 7.0, MARKER_FILL);
                painter.circle_stroke(pos, 7.0, Stroke::new(2.0, Color32::WHITE));
            }
        }

        painter.text(
            rect.right_bottom() + egui::vec2(-6.0, -4.0),
            egui::Align2::RIGHT_BOTTOM,
            ATTRIBUTION,
            egui::FontId::proportional(10.0),
            Color32::from_gray(160),
        );

        if tiles.error_count() > 0 {
            painter.text(
                rect.left_bottom() + egui::vec2(6.0, -4.0),
                egui::Align2::LEFT_BOTTOM,
                format!("Failed to load {} map tiles", tiles.error_count()),
                egui::FontId::proportional(10.0),
                Color32::from_rgb(220, 120, 120),
            );
        } else if tiles.has_loading_tiles() {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }

        response
    }
}

/// Screen rectangle of a geographic bounding box.
fn bounds_rect(viewport: &Viewport, bounds: GeoBounds) -> Rect {
    let (left, top) = viewport.project(bounds.north, bounds.west);
    let (right, bottom) = viewport.project(bounds.south, bounds.east);
    Rect::from_min_max(Pos2::new(left, top), Pos2::new(right, bottom))
}
