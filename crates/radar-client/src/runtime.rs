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

//! The card task: refresh policy and command handling.
//!
//! All mutable state (schedule, playback, overlay handle, timers) is owned by
//! one task, so nothing here needs a lock. Network waits are the only
//! suspension points besides timer ticks.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::cache::FrameCache;
use crate::clock::Clock;
use crate::config::CardConfig;
use crate::playback::{FrameDisplay, FrameView, PeriodicTimer, PlaybackController, SeekMode};
use crate::preload::Preloader;
use crate::resolver::RunResolver;
use crate::schedule::Schedule;
use crate::source::RadarSource;
use crate::surface::{ImageOverlay, MapMarker, MarkerIcon, PresentationSurface, RADAR_BOUNDS};
use crate::CardStatus;

pub(crate) const RUN_NOT_FOUND_MESSAGE: &str = "Could not load radar data";

#[derive(Debug)]
pub(crate) enum Command {
    Play,
    Pause,
    TogglePlay,
    Seek { fraction: f32, mode: SeekMode },
    Refresh,
    UpdateConfig(CardConfig),
}

/// Forwards the active frame to the overlay and to frame watchers.
struct SurfaceDisplay {
    overlay: Option<Box<dyn ImageOverlay>>,
    frame_tx: watch::Sender<Option<FrameView>>,
}

impl std::fmt::Debug for SurfaceDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceDisplay")
            .field("has_overlay", &self.overlay.is_some())
            .finish_non_exhaustive()
    }
}

impl FrameDisplay for SurfaceDisplay {
    fn show_frame(&mut self, view: &FrameView) {
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.set_url(&view.url);
        }
        self.frame_tx.send_replace(Some(view.clone()));
    }
}

pub(crate) struct CardRuntime {
    config: CardConfig,
    home: (f64, f64),
    clock: Arc<dyn Clock>,
    resolver: RunResolver,
    preloader: Preloader,
    playback: PlaybackController<SurfaceDisplay>,
    surface: Box<dyn PresentationSurface>,
    marker: Option<Box<dyn MapMarker>>,
    status_tx: watch::Sender<CardStatus>,
    playing_tx: watch::Sender<bool>,
    refresh_timer: PeriodicTimer,
    autoplay_pending: bool,
}

impl CardRuntime {
    #[allow(clippy::too_many_arguments, reason = "assembled once by Client::spawn")]
    pub(crate) fn new(
        config: CardConfig,
        home: (f64, f64),
        base_url: String,
        clock: Arc<dyn Clock>,
        source: Arc<dyn RadarSource>,
        cache: FrameCache,
        surface: Box<dyn PresentationSurface>,
        status_tx: watch::Sender<CardStatus>,
        playing_tx: watch::Sender<bool>,
        frame_tx: watch::Sender<Option<FrameView>>,
    ) -> Self {
        let config = config.validated();
        let display = SurfaceDisplay {
            overlay: None,
            frame_tx,
        };

        Self {
            home,
            clock,
            resolver: RunResolver::new(Arc::clone(&source), base_url),
            preloader: Preloader::new(source, cache),
            playback: PlaybackController::new(display, config.animation_period()),
            surface,
            marker: None,
            status_tx,
            playing_tx,
            refresh_timer: PeriodicTimer::new(),
            autoplay_pending: config.autoplay,
            config,
        }
    }

    pub(crate) async fn run(
        mut self,
        mut command_rx: mpsc::UnboundedReceiver<Command>,
        cancel_token: CancellationToken,
    ) {
        self.apply_view();
        if !self.refresh_or_cancel(&cancel_token).await {
            return;
        }
        self.refresh_timer.start(self.config.refresh_period());

        loop {
            tokio::select! {
                () = cancel_token.cancelled() => {
                    info!("Radar client cancelled");
                    return;
                }
                command = command_rx.recv() => {
                    let Some(command) = command else {
                        info!("Radar client handle dropped");
                        return;
                    };
                    if !self.handle_command(command, &cancel_token).await {
                        return;
                    }
                    self.publish_playing();
                }
                () = self.playback.next_tick() => self.playback.tick(),
                () = self.refresh_timer.tick() => {
                    if !self.refresh_or_cancel(&cancel_token).await {
                        return;
                    }
                }
            }
        }
    }

    async fn handle_command(&mut self, command: Command, cancel_token: &CancellationToken) -> bool {
        debug!("Handling {:?}", command);
        match command {
            Command::Play => self.playback.play(),
            Command::Pause => self.playback.pause(),
            Command::TogglePlay => self.playback.toggle(),
            Command::Seek { fraction, mode } => {
                self.playback.seek(fraction, mode);
            }
            Command::Refresh => {
                self.refresh_timer.start(self.config.refresh_period());
                return self.refresh_or_cancel(cancel_token).await;
            }
            Command::UpdateConfig(config) => self.update_config(config),
        }
        true
    }

    async fn refresh_or_cancel(&mut self, cancel_token: &CancellationToken) -> bool {
        tokio::select! {
            () = self.refresh() => true,
            () = cancel_token.cancelled() => {
                info!("Radar client cancelled during refresh");
                false
            }
        }
    }

    /// Resolve, build and preload the latest run, then swap it in.
    ///
    /// On failure the installed schedule and playback state stay as they are.
    async fn refresh(&mut self) {
        let Some(run) = self.resolver.resolve_latest(self.clock.now()).await else {
            if self.playback.schedule().is_empty() {
                self.status_tx
                    .send_replace(CardStatus::Error(RUN_NOT_FOUND_MESSAGE.to_string()));
            } else {
                warn!("No newer radar run found, keeping the current one");
            }
            return;
        };

        if self.playback.schedule().run() == Some(&run) {
            debug!("Run {} is already installed", run.run_id());
            if !self.playback.is_playing() {
                let target = self.clock.now() + self.config.time_offset();
                if let Some(index) = self.playback.schedule().nearest_frame(target) {
                    if index != self.playback.current_index() {
                        self.playback.show(index);
                    }
                }
            }
            return;
        }

        let first_load = self.playback.schedule().is_empty();
        let schedule = Schedule::build(run, self.resolver.base_url());
        if first_load {
            self.status_tx.send_replace(CardStatus::Loading {
                loaded: 0,
                total: schedule.len(),
            });
        }

        // No frame advances while the new run downloads
        self.playback.suspend();
        let status_tx = &self.status_tx;
        let schedule = self
            .preloader
            .preload(schedule, |loaded, total| {
                if first_load {
                    status_tx.send_replace(CardStatus::Loading { loaded, total });
                }
            })
            .await;

        let target = self.clock.now() + self.config.time_offset();
        self.playback.install(schedule, target);
        self.preloader.cache().retain_schedule(self.playback.schedule());
        self.ensure_overlay();
        self.playback.resume();
        self.status_tx.send_replace(CardStatus::Ready);

        if self.autoplay_pending {
            self.autoplay_pending = false;
            self.playback.play();
        }
        self.publish_playing();
    }

    fn publish_playing(&self) {
        let playing = self.playback.is_playing();
        self.playing_tx.send_if_modified(|current| {
            let changed = *current != playing;
            *current = playing;
            changed
        });
    }

    fn ensure_overlay(&mut self) {
        if self.playback.display().overlay.is_some() {
            return;
        }
        let Some(view) = self.playback.current_view() else {
            return;
        };
        let overlay = self
            .surface
            .add_image_overlay(&view.url, RADAR_BOUNDS, self.config.opacity);
        self.playback.display_mut().overlay = Some(overlay);
    }

    fn apply_view(&mut self) {
        let (lat, lon) = self.config.location(self.home);
        self.surface.set_view(lat, lon, self.config.zoom);

        if let Some(mut marker) = self.marker.take() {
            marker.remove();
        }
        if self.config.show_marker {
            self.marker = Some(self.surface.add_marker(lat, lon, MarkerIcon::Home));
        }
    }

    fn update_config(&mut self, config: CardConfig) {
        let previous = std::mem::replace(&mut self.config, config.validated());

        let view_changed = previous.location(self.home) != self.config.location(self.home)
            || previous.zoom != self.config.zoom
            || previous.show_marker != self.config.show_marker;
        if view_changed {
            self.apply_view();
        }

        if previous.animation_speed != self.config.animation_speed {
            self.playback.set_speed(self.config.animation_period());
        }

        if (previous.opacity - self.config.opacity).abs() > f32::EPSILON {
            if let Some(overlay) = self.playback.display_mut().overlay.as_mut() {
                overlay.set_opacity(self.config.opacity);
            }
        }

        if previous.refresh_interval != self.config.refresh_interval {
            self.refresh_timer.start(self.config.refresh_period());
        }

        if previous.time_offset != self.config.time_offset && !self.playback.is_playing() {
            let target = self.clock.now() + self.config.time_offset();
            if let Some(index) = self.playback.schedule().nearest_frame(target) {
                self.playback.show(index);
            }
        }

        if self.config.autoplay && !previous.autoplay {
            if self.playback.schedule().is_empty() {
                self.autoplay_pending = true;
            } else {
                self.playback.play();
            }
        }

        info!("Card configuration updated");
    }
}
