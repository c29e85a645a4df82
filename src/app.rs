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

//! The eframe application tying the radar card to the map window.

use crate::config::AppConfig;
use crate::map::{MapSurface, MapView, OverlayTextures, SharedScene, TileManager};
use crate::ui::{draw_status, show_controls, ConfigEditor, ConfigEvent, ControlAction};
use log::{info, warn};
use radar_client::{Client, ClientConfig, FrameCache, HttpSource, SystemClock};
use std::sync::Arc;
use std::time::Duration;

pub type AppError = Box<dyn std::error::Error + Send + Sync>;

pub struct RadarApp {
    client: Client,
    config: AppConfig,
    scene: SharedScene,
    view: MapView,
    tiles: TileManager,
    overlays: OverlayTextures,
    editor: ConfigEditor,
    /// Worker threads behind `client` and `tiles`.
    _runtime: tokio::runtime::Runtime,
}

impl std::fmt::Debug for RadarApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadarApp")
            .field("client", &self.client)
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

impl RadarApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig, base_url: String) -> Result<Self, AppError> {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("radar-worker")
            .enable_all()
            .build()?;

        let cache = FrameCache::in_user_cache().unwrap_or_else(|e| {
            warn!("Frame disk cache unavailable, keeping frames in memory: {}", e);
            FrameCache::in_memory()
        });

        let scene = SharedScene::default();
        let surface = MapSurface::new(Arc::clone(&scene), cc.egui_ctx.clone());
        let source = Arc::new(HttpSource::new()?);

        let (lat, lon) = config.card.location(config.home());
        info!("Starting radar card at {:.4}, {:.4} from {}", lat, lon, base_url);

        let client = {
            let _guard = runtime.enter();
            Client::spawn(
                ClientConfig {
                    card: config.card.clone(),
                    home: config.home(),
                    base_url,
                    cache: cache.clone(),
                    clock: Arc::new(SystemClock),
                },
                Box::new(surface),
                source,
            )
        };

        Ok(Self {
            client,
            view: MapView::new(lat, lon, config.card.zoom),
            editor: ConfigEditor::new(config.card.clone(), config.home()),
            config,
            scene,
            tiles: TileManager::new(runtime.handle().clone()),
            overlays: OverlayTextures::new(cache),
            _runtime: runtime,
        })
    }

    fn apply(&mut self, action: ControlAction) {
        match action {
            ControlAction::TogglePlay => self.client.toggle_play(),
            ControlAction::Seek(fraction) => self.client.seek(fraction),
            ControlAction::DragSeek(fraction) => self.client.drag_seek(fraction),
            ControlAction::Refresh => self.client.refresh_now(),
            ControlAction::OpenSettings => self.editor.open = !self.editor.open,
        }
    }

    fn on_config_event(&mut self, event: ConfigEvent) {
        match event {
            ConfigEvent::Changed(card) => {
                self.config.card = card.clone();
                if let Err(e) = self.config.save() {
                    warn!("Failed to save configuration: {}", e);
                }
                self.client.update_config(card);
            }
        }
    }
}

impl eframe::App for RadarApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Status changes arrive without a surface update; poll for them.
        ctx.request_repaint_after(Duration::from_millis(500));

        let status = self.client.status();
        let frame = self.client.frame();
        let playing = self.client.is_playing();

        let mut actions = Vec::new();
        egui::TopBottomPanel::bottom("controls")
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(8.0))
            .show(ctx, |ui| {
                actions = show_controls(ui, frame.as_ref(), playing);
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let response = self.view.show(ui, &self.scene, &self.tiles, &mut self.overlays);
                draw_status(&ui.painter_at(response.rect), response.rect, &status);
            });

        if let Some(event) = self.editor.show(ctx) {
            self.on_config_event(event);
        }

        for action in actions {
            self.apply(action);
        }
    }
}

impl Drop for RadarApp {
    fn drop(&mut self) {
        self.client.shutdown();
        info!("Radar card stopped");
    }
}
