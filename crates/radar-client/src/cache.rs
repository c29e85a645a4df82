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

//! Frame image cache.
//!
//! Preloaded frame bytes are kept in memory for the lifetime of a schedule
//! and optionally mirrored to disk with SHA-256 based filenames, so a restart
//! within the same forecast window does not download everything again.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use log::{debug, warn};
use sha2::{Digest, Sha256};

use crate::error::{RadarError, Result};
use crate::schedule::Schedule;

/// Frames older than this are useless: the run they belong to has long been
/// superseded.
const MAX_DISK_AGE: Duration = Duration::from_secs(6 * 60 * 60);

/// Shared url -> image bytes store.
///
/// Cloning is cheap; all clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct FrameCache {
    entries: Arc<Mutex<HashMap<String, Arc<Vec<u8>>>>>,
    disk_dir: Option<PathBuf>,
}

impl FrameCache {
    /// Cache that never touches the filesystem.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Cache mirrored into `dir`, pruning stale files on open.
    pub fn with_disk_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let removed = prune_older_than(&dir, MAX_DISK_AGE);
        if removed > 0 {
            debug!("Removed {} stale radar frames from {:?}", removed, dir);
        }

        Ok(Self {
            entries: Arc::default(),
            disk_dir: Some(dir),
        })
    }

    /// Cache under the platform cache directory.
    pub fn in_user_cache() -> Result<Self> {
        let dir = dirs::cache_dir()
            .ok_or(RadarError::CacheUnavailable)?
            .join("rainradar-desktop")
            .join("frames");
        Self::with_disk_dir(dir)
    }

    fn disk_path(&self, url: &str) -> Option<PathBuf> {
        let dir = self.disk_dir.as_ref()?;
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        Some(dir.join(format!("{:x}.png", hasher.finalize())))
    }

    /// Store bytes for `url`. Disk write failures are logged, not returned.
    pub fn insert(&self, url: &str, bytes: Vec<u8>) {
        if let Some(path) = self.disk_path(url) {
            if let Err(e) = fs::write(&path, &bytes) {
                warn!("Failed to write radar frame to {:?}: {}", path, e);
            }
        }

        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(url.to_string(), Arc::new(bytes));
        }
    }

    /// Bytes for `url`, falling back to the disk mirror.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<Arc<Vec<u8>>> {
        if let Some(bytes) = self
            .entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(url).cloned())
        {
            return Some(bytes);
        }

        let bytes = Arc::new(fs::read(self.disk_path(url)?).ok()?);
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(url.to_string(), Arc::clone(&bytes));
        }
        Some(bytes)
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.get(url).is_some()
    }

    /// Whether `url` is held in memory. Never reads the disk mirror.
    #[must_use]
    pub fn is_resident(&self, url: &str) -> bool {
        self.entries
            .lock()
            .is_ok_and(|entries| entries.contains_key(url))
    }

    /// Drop in-memory entries that do not belong to `schedule`.
    pub fn retain_schedule(&self, schedule: &Schedule) {
        let keep: HashSet<&str> = schedule.frames().iter().map(|f| f.url.as_str()).collect();
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|url, _| keep.contains(url.as_str()));
        }
    }

    /// Number of entries held in memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn prune_older_than(dir: &Path, max_age: Duration) -> usize {
    let now = SystemTime::now();
    let mut removed = 0;

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let expired = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > max_age);
            if expired && fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Run;
    use chrono::{TimeZone, Utc};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("radar-client-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_memory_roundtrip() {
        let cache = FrameCache::in_memory();
        assert!(!cache.contains("https://radar.test/a.png"));

        cache.insert("https://radar.test/a.png", vec![1, 2, 3]);

        assert_eq!(cache.get("https://radar.test/a.png").unwrap().as_slice(), &[1, 2, 3]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = FrameCache::in_memory();
        let other = cache.clone();
        other.insert("u", vec![9]);
        assert!(cache.contains("u"));
    }

    #[test]
    fn test_disk_mirror_survives_new_instance() {
        let dir = scratch_dir("mirror");
        FrameCache::with_disk_dir(&dir).unwrap().insert("https://radar.test/b.png", vec![7, 7]);

        let reopened = FrameCache::with_disk_dir(&dir).unwrap();
        assert!(reopened.is_empty());
        assert_eq!(reopened.get("https://radar.test/b.png").unwrap().as_slice(), &[7, 7]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_retain_schedule_drops_old_frames() {
        let cache = FrameCache::in_memory();
        let run = Run::new(Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap());
        let schedule = Schedule::build(run, "https://radar.test");
        cache.insert(&schedule.frames()[0].url, vec![1]);
        cache.insert("https://radar.test/old/frame.png", vec![2]);

        cache.retain_schedule(&schedule);

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&schedule.frames()[0].url));
    }

    #[test]
    fn test_retained_disk_frames_are_not_resident() {
        let dir = scratch_dir("resident");
        let cache = FrameCache::with_disk_dir(&dir).unwrap();
        let old = Schedule::build(Run::new(Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap()), "https://radar.test");
        let new = Schedule::build(Run::new(Utc.with_ymd_and_hms(2024, 1, 1, 10, 35, 0).unwrap()), "https://radar.test");
        for frame in old.frames().iter().chain(new.frames()) {
            cache.insert(&frame.url, vec![1]);
        }

        cache.retain_schedule(&new);

        assert!(old.frames().iter().all(|f| !cache.is_resident(&f.url)));
        assert!(new.frames().iter().all(|f| cache.is_resident(&f.url)));
        assert_eq!(cache.len(), new.len());

        let _ = fs::remove_dir_all(&dir);
    }
}
