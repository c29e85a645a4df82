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

//! Presentation surface backed by the egui map view.
//!
//! The card task mutates a shared [`MapScene`]; the UI thread reads it on the
//! next repaint. Every mutation requests that repaint.

use radar_client::{GeoBounds, ImageOverlay, MapMarker, MarkerIcon, PresentationSurface};
use std::sync::{Arc, Mutex};

/// Camera position requested by the card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRequest {
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayState {
    pub url: String,
    pub bounds: GeoBounds,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerState {
    pub lat: f64,
    pub lon: f64,
    pub icon: MarkerIcon,
}

/// Everything the card has placed on the map.
#[derive(Debug, Default)]
pub struct MapScene {
    /// Consumed by the view on its next frame.
    pub pending_view: Option<ViewRequest>,
    overlay: Option<(u64, OverlayState)>,
    marker: Option<(u64, MarkerState)>,
    next_id: u64,
}

impl MapScene {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref().map(|(_, overlay)| overlay)
    }

    pub fn marker(&self) -> Option<&MarkerState> {
        self.marker.as_ref().map(|(_, marker)| marker)
    }
}

pub type SharedScene = Arc<Mutex<MapScene>>;

fn update_scene(scene: &SharedScene, ctx: &egui::Context, update: impl FnOnce(&mut MapScene)) {
    if let Ok(mut scene) = scene.lock() {
        update(&mut scene);
    }
    ctx.request_repaint();
}

#[derive(Debug, Clone)]
pub struct MapSurface {
    scene: SharedScene,
    ctx: egui::Context,
}

impl MapSurface {
    pub fn new(scene: SharedScene, ctx: egui::Context) -> Self {
        Self { scene, ctx }
    }
}

impl PresentationSurface for MapSurface {
    fn set_view(&mut self, lat: f64, lon: f64, zoom: u8) {
        update_scene(&self.scene, &self.ctx, |scene| {
            scene.pending_view = Some(ViewRequest { lat, lon, zoom });
        });
    }

    fn add_image_overlay(&mut self, url: &str, bounds: GeoBounds, opacity: f32) -> Box<dyn ImageOverlay> {
        let mut id = 0;
        update_scene(&self.scene, &self.ctx, |scene| {
            id = scene.allocate_id();
            scene.overlay = Some((
                id,
                OverlayState {
                    url: url.to_string(),
                    bounds,
                    opacity,
                },
            ));
        });
        Box::new(OverlayHandle {
            id,
            scene: Arc::clone(&self.scene),
            ctx: self.ctx.clone(),
        })
    }

    fn add_marker(&mut self, lat: f64, lon: f64, icon: MarkerIcon) -> Box<dyn MapMarker> {
        let mut id = 0;
        update_scene(&self.scene, &self.ctx, |scene| {
            id = scene.allocate_id();
            scene.marker = Some((id, MarkerState { lat, lon, icon }));
        });
        Box::new(MarkerHandle {
            id,
            scene: Arc::clone(&self.scene),
            ctx: self.ctx.clone(),
        })
    }
}

/// Handle edits apply only while their overlay is still the one on the map.
#[derive(Debug)]
struct OverlayHandle {
    id: u64,
    scene: SharedScene,
    ctx: egui::Context,
}

impl OverlayHandle {
    fn edit(&self, edit: impl FnOnce(&mut OverlayState)) {
        update_scene(&self.scene, &self.ctx, |scene| {
            if let Some((id, overlay)) = scene.overlay.as_mut() {
                if *id == self.id {
                    edit(overlay);
                }
            }
        });
    }
}

impl ImageOverlay for OverlayHandle {
    fn set_url(&mut self, url: &str) {
        self.edit(|overlay| url.clone_into(&mut overlay.url));
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.edit(|overlay| overlay.opacity = opacity);
    }
}

#[derive(Debug)]
struct MarkerHandle {
    id: u64,
    scene: SharedScene,
    ctx: egui::Context,
}

impl MapMarker for MarkerHandle {
    fn remove(&mut self) {
        update_scene(&self.scene, &self.ctx, |scene| {
            if scene.marker.as_ref().is_some_and(|(id, _)| *id == self.id) {
                scene.marker = None;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_client::RADAR_BOUNDS;

    fn surface() -> (MapSurface, SharedScene) {
        let scene = SharedScene::default();
        (MapSurface::new(Arc::clone(&scene), egui::Context::default()), scene)
    }

    #[test]
    fn test_set_view_is_pending_until_taken() {
        let (mut surface, scene) = surface();
        surface.set_view(52.0, 5.0, 9);

        let request = scene.lock().unwrap().pending_view.take();
        assert_eq!(request, Some(ViewRequest { lat: 52.0, lon: 5.0, zoom: 9 }));
        assert!(scene.lock().unwrap().pending_view.is_none());
    }

    #[test]
    fn test_overlay_handle_updates_scene() {
        let (mut surface, scene) = surface();
        let mut overlay = surface.add_image_overlay("a.png", RADAR_BOUNDS, 0.7);
        overlay.set_url("b.png");
        overlay.set_opacity(0.3);

        let scene = scene.lock().unwrap();
        let state = scene.overlay().unwrap();
        assert_eq!(state.url, "b.png");
        assert!((state.opacity - 0.3).abs() < f32::EPSILON);
        assert_eq!(state.bounds, RADAR_BOUNDS);
    }

    #[test]
    fn test_stale_handles_are_ignored() {
        let (mut surface, scene) = surface();
        let mut old_marker = surface.add_marker(52.0, 5.0, MarkerIcon::Home);
        let mut old_overlay = surface.add_image_overlay("a.png", RADAR_BOUNDS, 0.7);
        let _marker = surface.add_marker(53.0, 6.0, MarkerIcon::Home);
        let _overlay = surface.add_image_overlay("c.png", RADAR_BOUNDS, 0.7);

        old_marker.remove();
        old_overlay.set_url("stale.png");

        let scene = scene.lock().unwrap();
        assert_eq!(scene.marker().map(|m| m.lat), Some(53.0));
        assert_eq!(scene.overlay().map(|o| o.url.as_str()), Some("c.png"));
    }

    #[test]
    fn test_marker_remove() {
        let (mut surface, scene) = surface();
        let mut marker = surface.add_marker(52.0, 5.0, MarkerIcon::Home);
        marker.remove();
        assert!(scene.lock().unwrap().marker().is_none());
    }
}
