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

//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{RadarError, Result};
use crate::schedule::Run;
use crate::source::RadarSource;
use crate::surface::{GeoBounds, ImageOverlay, MapMarker, MarkerIcon, PresentationSurface};

/// In-memory radar origin.
#[derive(Debug)]
pub(crate) struct MockSource {
    existing: HashSet<String>,
    probe_errors: HashSet<String>,
    missing_frames: HashSet<String>,
    delays: HashMap<String, Duration>,
    available: AtomicBool,
    probes: Mutex<Vec<String>>,
    fetches: Mutex<Vec<String>>,
}

impl MockSource {
    pub(crate) fn new() -> Self {
        Self {
            existing: HashSet::new(),
            probe_errors: HashSet::new(),
            missing_frames: HashSet::new(),
            delays: HashMap::new(),
            available: AtomicBool::new(true),
            probes: Mutex::new(Vec::new()),
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_run(mut self, run: &Run, base_url: &str) -> Self {
        self.existing.insert(run.probe_url(base_url));
        self
    }

    pub(crate) fn with_probe_error(mut self, url: &str) -> Self {
        self.probe_errors.insert(url.to_string());
        self
    }

    pub(crate) fn with_missing_frame(mut self, url: &str) -> Self {
        self.missing_frames.insert(url.to_string());
        self
    }

    pub(crate) fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// Make every probe report "not published" (or restore).
    pub(crate) fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub(crate) fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    pub(crate) fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RadarSource for MockSource {
    async fn exists(&self, url: &str) -> Result<bool> {
        self.probes.lock().unwrap().push(url.to_string());
        if self.probe_errors.contains(url) {
            return Err(RadarError::Status {
                status: 503,
                url: url.to_string(),
            });
        }
        Ok(self.available.load(Ordering::SeqCst) && self.existing.contains(url))
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.fetches.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        if self.missing_frames.contains(url) {
            return Err(RadarError::Status {
                status: 404,
                url: url.to_string(),
            });
        }
        Ok(b"\x89PNG".to_vec())
    }
}

/// Calls received by [`MockSurface`] and its handles.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SurfaceCall {
    SetView { lat: f64, lon: f64, zoom: u8 },
    AddOverlay { url: String, opacity: f32 },
    SetUrl(String),
    SetOpacity(f32),
    AddMarker { lat: f64, lon: f64 },
    RemoveMarker,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockSurface {
    calls: Arc<Mutex<Vec<SurfaceCall>>>,
}

impl MockSurface {
    pub(crate) fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    /// URL currently shown by the overlay, if one was added.
    pub(crate) fn overlay_url(&self) -> Option<String> {
        self.calls().into_iter().rev().find_map(|call| match call {
            SurfaceCall::AddOverlay { url, .. } | SurfaceCall::SetUrl(url) => Some(url),
            _ => None,
        })
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PresentationSurface for MockSurface {
    fn set_view(&mut self, lat: f64, lon: f64, zoom: u8) {
        self.record(SurfaceCall::SetView { lat, lon, zoom });
    }

    fn add_image_overlay(&mut self, url: &str, _bounds: GeoBounds, opacity: f32) -> Box<dyn ImageOverlay> {
        self.record(SurfaceCall::AddOverlay {
            url: url.to_string(),
            opacity,
        });
        Box::new(self.clone())
    }

    fn add_marker(&mut self, lat: f64, lon: f64, _icon: MarkerIcon) -> Box<dyn MapMarker> {
        self.record(SurfaceCall::AddMarker { lat, lon });
        Box::new(self.clone())
    }
}

impl ImageOverlay for MockSurface {
    fn set_url(&mut self, url: &str) {
        self.record(SurfaceCall::SetUrl(url.to_string()));
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.record(SurfaceCall::SetOpacity(opacity));
    }
}

impl MapMarker for MockSurface {
    fn remove(&mut self) {
        self.record(SurfaceCall::RemoveMarker);
    }
}
