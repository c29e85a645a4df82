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

//! Radar frame textures decoded from the preloaded frame cache.

use super::tiles::decode_texture;
use egui::TextureHandle;
use log::debug;
use radar_client::schedule::FRAME_COUNT;
use radar_client::FrameCache;
use std::collections::HashMap;

/// Decoded frames kept alive; twice a run so a refresh can overlap the old one.
const MAX_TEXTURES: usize = FRAME_COUNT * 2;

/// Decodes frame images lazily, once per URL.
pub struct OverlayTextures {
    cache: FrameCache,
    /// `None` marks a frame that failed to load; it is drawn blank.
    textures: HashMap<String, Option<TextureHandle>>,
}

impl std::fmt::Debug for OverlayTextures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayTextures")
            .field("decoded", &self.textures.len())
            .finish_non_exhaustive()
    }
}

impl OverlayTextures {
    pub fn new(cache: FrameCache) -> Self {
        Self {
            cache,
            textures: HashMap::new(),
        }
    }

    pub fn get(&mut self, ctx: &egui::Context, url: &str) -> Option<TextureHandle> {
        if let Some(texture) = self.textures.get(url) {
            return texture.clone();
        }

        if self.textures.len() >= MAX_TEXTURES {
            self.evict_stale();
        }

        let texture = self
            .cache
            .get(url)
            .and_then(|bytes| decode_texture(ctx, url, &bytes));
        if texture.is_none() {
            debug!("No image for radar frame {}", url);
        }
        self.textures.insert(url.to_string(), texture.clone());
        texture
    }

    /// Drop textures whose frames left the in-memory cache with their run.
    fn evict_stale(&mut self) {
        let cache = &self.cache;
        self.textures.retain(|url, _| cache.is_resident(url));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use radar_client::{Run, Schedule};
    use std::path::PathBuf;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rainradar-overlay-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn schedule(minute: u32) -> Schedule {
        let run = Run::new(Utc.with_ymd_and_hms(2024, 1, 1, 10, minute, 0).unwrap());
        Schedule::build(run, "https://radar.test/runs")
    }

    #[test]
    fn test_eviction_keeps_only_installed_run() {
        let dir = scratch_dir();
        let cache = FrameCache::with_disk_dir(&dir).unwrap();
        let old = schedule(5);
        let new = schedule(35);

        let mut overlays = OverlayTextures::new(cache.clone());
        for frame in old.frames().iter().chain(new.frames()) {
            cache.insert(&frame.url, vec![0]);
            overlays.textures.insert(frame.url.clone(), None);
        }

        cache.retain_schedule(&new);
        overlays.evict_stale();

        assert_eq!(overlays.textures.len(), new.len());
        assert!(new.frames().iter().all(|f| overlays.textures.contains_key(&f.url)));
        assert_eq!(cache.len(), new.len(), "eviction must not reload old frames from disk");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
