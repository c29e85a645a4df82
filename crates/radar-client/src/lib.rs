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

//! Rain radar client library.
//!
//! Discovers the most recently published precipitation forecast run, expands
//! it into a schedule of frame images, preloads them and drives an animated
//! playback over any map that implements [`PresentationSurface`].
//!
//! - **Run layer** ([`resolver`]): probes candidate run times backwards from now
//! - **Schedule layer** ([`schedule`]): pure frame/URL/timestamp arithmetic
//! - **Preload layer** ([`preload`], [`cache`]): concurrent fetch into a shared cache
//! - **Playback layer** ([`playback`]): paused/playing state machine with a single timer
//! - **Client**: wires everything into one task with periodic refresh
//!
//! # Building a schedule
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use radar_client::schedule::{Run, Schedule};
//! use radar_client::DEFAULT_BASE_URL;
//!
//! let run = Run::new(Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap());
//! let schedule = Schedule::build(run, DEFAULT_BASE_URL);
//!
//! assert_eq!(schedule.len(), 37);
//! let target = Utc.with_ymd_and_hms(2024, 1, 1, 10, 25, 0).unwrap();
//! assert_eq!(schedule.nearest_frame(target), Some(4));
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod playback;
pub mod preload;
pub mod resolver;
pub mod schedule;
pub mod source;
pub mod surface;

mod runtime;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

pub use cache::FrameCache;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CardConfig, CARD_SIZE};
pub use error::{RadarError, Result};
pub use playback::{FrameDisplay, FrameView, PlaybackController, SeekMode};
pub use preload::Preloader;
pub use resolver::RunResolver;
pub use schedule::{Frame, Run, Schedule};
pub use source::{HttpSource, RadarSource, DEFAULT_BASE_URL};
pub use surface::{GeoBounds, ImageOverlay, MapMarker, MarkerIcon, PresentationSurface, RADAR_BOUNDS};

use runtime::{CardRuntime, Command};

/// De Bilt, used when neither the card nor the host supply a location.
pub const DEFAULT_HOME: (f64, f64) = (52.1, 5.18);

/// User-visible state of the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardStatus {
    /// Frames are being preloaded.
    Loading { loaded: usize, total: usize },
    /// A schedule is installed.
    Ready,
    /// Nothing can be shown; the message stays until a refresh succeeds.
    Error(String),
}

impl CardStatus {
    /// Text for a status banner, `None` when there is nothing to say.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Loading { loaded, total } if *total > 0 => Some(format!(
                "Loading radar... {}%",
                (loaded * 100 + total / 2) / total
            )),
            Self::Loading { .. } => Some("Loading radar...".to_string()),
            Self::Ready => None,
            Self::Error(message) => Some(message.clone()),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Configuration for [`Client::spawn`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Card options (location, playback, refresh).
    pub card: CardConfig,
    /// Fallback location when the card has none.
    pub home: (f64, f64),
    /// Run directory on the radar origin.
    pub base_url: String,
    /// Where preloaded frames are stored.
    pub cache: FrameCache,
    /// Time source for run discovery and frame selection.
    pub clock: Arc<dyn Clock>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            card: CardConfig::default(),
            home: DEFAULT_HOME,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache: FrameCache::in_memory(),
            clock: Arc::new(SystemClock),
        }
    }
}

/// Handle to a running radar card.
///
/// The card runs in a background task on the current Tokio runtime. All
/// command methods are synchronous and may be called from any thread, e.g. a
/// UI event loop.
pub struct Client {
    command_tx: mpsc::UnboundedSender<Command>,
    status_rx: watch::Receiver<CardStatus>,
    frame_rx: watch::Receiver<Option<FrameView>>,
    playing_rx: watch::Receiver<bool>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("status", &*self.status_rx.borrow())
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Spawn the card task. Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(
        config: ClientConfig,
        surface: Box<dyn PresentationSurface>,
        source: Arc<dyn RadarSource>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(CardStatus::Loading { loaded: 0, total: 0 });
        let (frame_tx, frame_rx) = watch::channel(None);
        let (playing_tx, playing_rx) = watch::channel(false);
        let cancel_token = CancellationToken::new();

        let runtime = CardRuntime::new(
            config.card,
            config.home,
            config.base_url,
            config.clock,
            source,
            config.cache,
            surface,
            status_tx,
            playing_tx,
            frame_tx,
        );
        tokio::spawn(runtime.run(command_rx, cancel_token.clone()));

        Self {
            command_tx,
            status_rx,
            frame_rx,
            playing_rx,
            cancel_token,
        }
    }

    fn send(&self, command: Command) {
        let _ = self.command_tx.send(command);
    }

    pub fn play(&self) {
        self.send(Command::Play);
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn toggle_play(&self) {
        self.send(Command::TogglePlay);
    }

    /// Jump to a timeline position (0.0 - 1.0) without changing play state.
    pub fn seek(&self, fraction: f32) {
        self.send(Command::Seek {
            fraction,
            mode: SeekMode::Click,
        });
    }

    /// Jump to a timeline position while dragging; pauses playback.
    pub fn drag_seek(&self, fraction: f32) {
        self.send(Command::Seek {
            fraction,
            mode: SeekMode::Drag,
        });
    }

    /// Check for a newer run now and restart the refresh interval.
    pub fn refresh_now(&self) {
        self.send(Command::Refresh);
    }

    /// Apply edited card options.
    pub fn update_config(&self, config: CardConfig) {
        self.send(Command::UpdateConfig(config));
    }

    #[must_use]
    pub fn status(&self) -> CardStatus {
        self.status_rx.borrow().clone()
    }

    /// The active frame, once a schedule is installed.
    #[must_use]
    pub fn frame(&self) -> Option<FrameView> {
        self.frame_rx.borrow().clone()
    }

    /// Whether playback is currently playing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        *self.playing_rx.borrow()
    }

    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<CardStatus> {
        self.status_rx.clone()
    }

    #[must_use]
    pub fn subscribe_frames(&self) -> watch::Receiver<Option<FrameView>> {
        self.frame_rx.clone()
    }

    /// Stop the card task.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::candidate_runs;
    use crate::testing::{MockSource, MockSurface, SurfaceCall};
    use chrono::{DateTime, TimeZone, Utc};
    use std::time::Duration;

    const BASE: &str = "https://radar.test/runs";

    fn ten_past_ten() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 10, 0).unwrap()
    }

    fn client_config(clock: Arc<FixedClock>, card: CardConfig) -> ClientConfig {
        ClientConfig {
            card,
            home: DEFAULT_HOME,
            base_url: BASE.to_string(),
            cache: FrameCache::in_memory(),
            clock,
        }
    }

    async fn wait_ready(client: &Client) {
        client
            .subscribe_status()
            .wait_for(|s| *s == CardStatus::Ready)
            .await
            .unwrap();
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(
            CardStatus::Loading { loaded: 1, total: 37 }.message().as_deref(),
            Some("Loading radar... 3%")
        );
        assert_eq!(
            CardStatus::Loading { loaded: 37, total: 37 }.message().as_deref(),
            Some("Loading radar... 100%")
        );
        assert_eq!(CardStatus::Ready.message(), None);
        assert!(CardStatus::Error("x".into()).is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_shows_frame_nearest_offset() {
        let clock = Arc::new(FixedClock::new(ten_past_ten()));
        // 10:05 is the first candidate for 10:10
        let source = Arc::new(MockSource::new().with_run(&candidate_runs(ten_past_ten())[0], BASE));
        let surface = MockSurface::default();

        let client = Client::spawn(
            client_config(clock, CardConfig::default()),
            Box::new(surface.clone()),
            source,
        );
        wait_ready(&client).await;

        let frame = client.frame().unwrap();
        assert_eq!(frame.index, 4);
        assert_eq!(
            surface.overlay_url().as_deref(),
            Some("https://radar.test/runs/202401011005/202401011025.png")
        );
        let calls = surface.calls();
        assert_eq!(
            calls[0],
            SurfaceCall::SetView {
                lat: DEFAULT_HOME.0,
                lon: DEFAULT_HOME.1,
                zoom: 7
            }
        );
        assert!(calls.contains(&SurfaceCall::AddOverlay {
            url: frame.url.clone(),
            opacity: 0.7
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_run_reports_error() {
        let clock = Arc::new(FixedClock::new(ten_past_ten()));
        let surface = MockSurface::default();
        let client = Client::spawn(
            client_config(clock, CardConfig::default()),
            Box::new(surface.clone()),
            Arc::new(MockSource::new()),
        );

        let status = client
            .subscribe_status()
            .wait_for(CardStatus::is_error)
            .await
            .unwrap()
            .clone();

        assert_eq!(status.message().as_deref(), Some("Could not load radar data"));
        assert!(client.frame().is_none());
        assert!(surface.overlay_url().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_advances_frames() {
        let clock = Arc::new(FixedClock::new(ten_past_ten()));
        let source = Arc::new(MockSource::new().with_run(&candidate_runs(ten_past_ten())[0], BASE));
        let client = Client::spawn(
            client_config(clock, CardConfig::default()),
            Box::new(MockSurface::default()),
            source,
        );
        wait_ready(&client).await;

        client.toggle_play();
        let mut frames = client.subscribe_frames();
        frames
            .wait_for(|f| f.as_ref().map(|v| v.index) == Some(6))
            .await
            .unwrap();

        assert!(client.is_playing());

        client.drag_seek(0.0);
        frames
            .wait_for(|f| f.as_ref().map(|v| v.index) == Some(0))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(client.frame().unwrap().index, 0);
        assert!(!client.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autoplay_starts_after_first_load() {
        let clock = Arc::new(FixedClock::new(ten_past_ten()));
        let source = Arc::new(MockSource::new().with_run(&candidate_runs(ten_past_ten())[0], BASE));
        let card = CardConfig {
            autoplay: true,
            ..CardConfig::default()
        };
        let client = Client::spawn(
            client_config(clock, card),
            Box::new(MockSurface::default()),
            source,
        );

        client
            .subscribe_frames()
            .wait_for(|f| f.as_ref().map(|v| v.index) == Some(5))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_installs_newer_run() {
        let clock = Arc::new(FixedClock::new(ten_past_ten()));
        let later = Utc.with_ymd_and_hms(2024, 1, 1, 10, 40, 0).unwrap();
        let source = Arc::new(
            MockSource::new()
                .with_run(&candidate_runs(ten_past_ten())[0], BASE)
                .with_run(&candidate_runs(later)[0], BASE),
        );
        let surface = MockSurface::default();
        let client = Client::spawn(
            client_config(Arc::clone(&clock), CardConfig::default()),
            Box::new(surface.clone()),
            source,
        );
        wait_ready(&client).await;

        clock.set(later);
        client.refresh_now();

        // run 10:35, target 10:55
        let expected = "https://radar.test/runs/202401011035/202401011055.png";
        client
            .subscribe_frames()
            .wait_for(|f| f.as_ref().is_some_and(|v| v.url == expected))
            .await
            .unwrap();
        assert_eq!(client.frame().unwrap().index, 4);
        assert_eq!(surface.overlay_url().as_deref(), Some(expected));
        let overlays = surface
            .calls()
            .iter()
            .filter(|c| matches!(c, SurfaceCall::AddOverlay { .. }))
            .count();
        assert_eq!(overlays, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_while_playing_keeps_playing() {
        let clock = Arc::new(FixedClock::new(ten_past_ten()));
        let later = Utc.with_ymd_and_hms(2024, 1, 1, 10, 40, 0).unwrap();
        let source = Arc::new(
            MockSource::new()
                .with_run(&candidate_runs(ten_past_ten())[0], BASE)
                .with_run(&candidate_runs(later)[0], BASE),
        );
        let client = Client::spawn(
            client_config(Arc::clone(&clock), CardConfig::default()),
            Box::new(MockSurface::default()),
            source,
        );
        wait_ready(&client).await;

        client.play();
        let mut frames = client.subscribe_frames();
        frames
            .wait_for(|f| f.as_ref().map(|v| v.index) == Some(6))
            .await
            .unwrap();

        clock.set(later);
        client.refresh_now();
        frames
            .wait_for(|f| f.as_ref().is_some_and(|v| v.url.contains("/202401011035/")))
            .await
            .unwrap();
        assert!(client.is_playing());

        let installed = client.frame().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let advanced = client.frame().unwrap();
        assert!(advanced.url.contains("/202401011035/"));
        assert_ne!(advanced.index, installed.index);
        assert!(client.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_of_installed_run_reselects_frame() {
        let clock = Arc::new(FixedClock::new(ten_past_ten()));
        let source = Arc::new(MockSource::new().with_run(&candidate_runs(ten_past_ten())[0], BASE));
        let client = Client::spawn(
            client_config(Arc::clone(&clock), CardConfig::default()),
            Box::new(MockSurface::default()),
            source.clone(),
        );
        wait_ready(&client).await;
        assert_eq!(client.frame().unwrap().index, 4);
        let fetches = source.fetches().len();

        // still run 10:05; target 10:29 is nearest to frame 5 (10:30)
        clock.set(Utc.with_ymd_and_hms(2024, 1, 1, 10, 14, 0).unwrap());
        client.refresh_now();
        client
            .subscribe_frames()
            .wait_for(|f| f.as_ref().map(|v| v.index) == Some(5))
            .await
            .unwrap();

        assert_eq!(source.fetches().len(), fetches);
        assert!(!client.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_schedule() {
        let clock = Arc::new(FixedClock::new(ten_past_ten()));
        let source = Arc::new(MockSource::new().with_run(&candidate_runs(ten_past_ten())[0], BASE));
        let client = Client::spawn(
            client_config(Arc::clone(&clock), CardConfig::default()),
            Box::new(MockSurface::default()),
            source.clone(),
        );
        wait_ready(&client).await;
        let before = client.frame().unwrap();

        source.set_available(false);
        clock.set(Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap());
        let probes_before = source.probes().len();
        client.refresh_now();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(source.probes().len(), probes_before + 6);
        assert_eq!(client.status(), CardStatus::Ready);
        assert_eq!(client.frame().unwrap(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_update_drives_surface() {
        let clock = Arc::new(FixedClock::new(ten_past_ten()));
        let source = Arc::new(MockSource::new().with_run(&candidate_runs(ten_past_ten())[0], BASE));
        let surface = MockSurface::default();
        let client = Client::spawn(
            client_config(clock, CardConfig::default()),
            Box::new(surface.clone()),
            source,
        );
        wait_ready(&client).await;

        client.update_config(CardConfig {
            lat: Some(51.9),
            lon: Some(4.5),
            opacity: 0.4,
            show_marker: true,
            time_offset: 0,
            ..CardConfig::default()
        });
        client
            .subscribe_frames()
            .wait_for(|f| f.as_ref().map(|v| v.index) == Some(1))
            .await
            .unwrap();

        let calls = surface.calls();
        assert!(calls.contains(&SurfaceCall::SetView {
            lat: 51.9,
            lon: 4.5,
            zoom: 7
        }));
        assert!(calls.contains(&SurfaceCall::AddMarker { lat: 51.9, lon: 4.5 }));
        assert!(calls.contains(&SurfaceCall::SetOpacity(0.4)));
    }
}
