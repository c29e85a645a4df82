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

//! Concurrent frame preloading.
//!
//! Every frame of a schedule is fetched at once (a run is only 37 images)
//! and the schedule is handed back only after each request has settled, so
//! playback never starts on a half-loaded run.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info};

use crate::cache::FrameCache;
use crate::schedule::Schedule;
use crate::source::RadarSource;

/// Fetches schedule frames into a [`FrameCache`].
pub struct Preloader {
    source: Arc<dyn RadarSource>,
    cache: FrameCache,
}

impl std::fmt::Debug for Preloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preloader")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Preloader {
    pub fn new(source: Arc<dyn RadarSource>, cache: FrameCache) -> Self {
        Self { source, cache }
    }

    #[must_use]
    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    /// Load every frame of `schedule`.
    ///
    /// `on_progress(settled, total)` fires once per settled frame in
    /// completion order, so treat it as a counter rather than a frame index.
    /// Failed frames stay in the schedule with `loaded == false`.
    pub async fn preload<F>(&self, mut schedule: Schedule, mut on_progress: F) -> Schedule
    where
        F: FnMut(usize, usize),
    {
        let total = schedule.len();
        let mut pending: FuturesUnordered<_> = schedule
            .frames()
            .iter()
            .map(|frame| {
                let index = frame.index;
                let url = frame.url.clone();
                let source = Arc::clone(&self.source);
                let cache = self.cache.clone();
                async move {
                    if cache.contains(&url) {
                        return (index, true);
                    }
                    match source.fetch(&url).await {
                        Ok(bytes) => {
                            cache.insert(&url, bytes);
                            (index, true)
                        }
                        Err(e) => {
                            debug!("Frame {} failed to load: {}", url, e);
                            (index, false)
                        }
                    }
                }
            })
            .collect();

        let mut settled = 0;
        while let Some((index, loaded)) = pending.next().await {
            schedule.set_loaded(index, loaded);
            settled += 1;
            on_progress(settled, total);
        }

        let loaded = schedule.loaded_count();
        if loaded < total {
            info!("Preloaded {}/{} radar frames ({} failed)", loaded, total, total - loaded);
        } else {
            info!("Preloaded {} radar frames", total);
        }

        schedule
    }
}
