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

//! Carto dark basemap tiles with a disk cache.

use super::projection::{WebMercator, TILE_SIZE};
use egui::{ColorImage, TextureHandle, TextureOptions};
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;

const CACHE_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Attribution the Carto terms require next to the map.
pub const ATTRIBUTION: &str = "© OpenStreetMap contributors © CARTO";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    /// Tile URL on the Carto CDN, balanced across subdomains a-d
    pub fn url(&self) -> String {
        let subdomain = ['a', 'b', 'c', 'd'][((self.x + self.y) % 4) as usize];
        format!(
            "https://{}.basemaps.cartocdn.com/dark_all/{}/{}/{}.png",
            subdomain, self.zoom, self.x, self.y
        )
    }

    fn cache_filename(&self) -> String {
        format!("{:x}.png", Sha256::digest(self.url().as_bytes()))
    }

    fn texture_name(&self) -> String {
        format!("tile_{}_{}/{}", self.zoom, self.x, self.y)
    }
}

/// A tile placed relative to the viewport centre, in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedTile {
    pub coord: TileCoord,
    pub offset_x: f32,
    pub offset_y: f32,
    pub size: f32,
}

enum TileState {
    Loading,
    Loaded(TextureHandle),
    Failed,
}

pub struct TileManager {
    cache_dir: PathBuf,
    tiles: Arc<Mutex<HashMap<TileCoord, TileState>>>,
    client: reqwest::Client,
    runtime: Handle,
}

impl std::fmt::Debug for TileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileManager")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

impl TileManager {
    /// Downloads run on `runtime`; decoded tiles become textures of the UI context.
    pub fn new(runtime: Handle) -> Self {
        let cache_dir = Self::cache_dir();

        if let Err(e) = fs::create_dir_all(&cache_dir) {
            warn!("Failed to create tile cache directory {:?}: {}", cache_dir, e);
        }
        Self::cleanup_old_tiles(&cache_dir);

        Self {
            cache_dir,
            tiles: Arc::default(),
            client: reqwest::Client::new(),
            runtime,
        }
    }

    fn cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("rainradar-desktop")
            .join("tiles")
    }

    fn cleanup_old_tiles(cache_dir: &Path) {
        let now = SystemTime::now();
        let Ok(entries) = fs::read_dir(cache_dir) else {
            return;
        };

        for entry in entries.flatten() {
            let expired = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > CACHE_DURATION);
            if expired && fs::remove_file(entry.path()).is_ok() {
                debug!("Removed old tile cache: {:?}", entry.path());
            }
        }
    }

    /// Texture for `coord`, starting a load when it is not known yet.
    pub fn get_tile(&self, coord: TileCoord, ctx: &egui::Context) -> Option<TextureHandle> {
        let Ok(mut tiles) = self.tiles.lock() else {
            return None;
        };

        match tiles.get(&coord) {
            Some(TileState::Loaded(texture)) => return Some(texture.clone()),
            Some(TileState::Loading | TileState::Failed) => return None,
            None => {}
        }

        let cache_path = self.cache_dir.join(coord.cache_filename());
        if let Ok(bytes) = fs::read(&cache_path) {
            if let Some(texture) = decode_texture(ctx, &coord.texture_name(), &bytes) {
                tiles.insert(coord, TileState::Loaded(texture.clone()));
                return Some(texture);
            }
            warn!("Discarding unreadable cached tile {:?}", cache_path);
        }

        tiles.insert(coord, TileState::Loading);
        drop(tiles);
        self.spawn_download(coord, cache_path, ctx.clone());
        None
    }

    fn spawn_download(&self, coord: TileCoord, cache_path: PathBuf, ctx: egui::Context) {
        let client = self.client.clone();
        let tiles = Arc::clone(&self.tiles);

        self.runtime.spawn(async move {
            let state = match download(&client, &coord.url()).await {
                Ok(bytes) => {
                    if let Err(e) = fs::write(&cache_path, &bytes) {
                        warn!("Failed to save tile to cache: {}", e);
                    }
                    match decode_texture(&ctx, &coord.texture_name(), &bytes) {
                        Some(texture) => TileState::Loaded(texture),
                        None => {
                            warn!("Failed to decode tile {}", coord.url());
                            TileState::Failed
                        }
                    }
                }
                Err(e) => {
                    warn!("Failed to fetch tile {}: {}", coord.url(), e);
                    TileState::Failed
                }
            };

            if let Ok(mut tiles) = tiles.lock() {
                tiles.insert(coord, state);
            }
            ctx.request_repaint();
        });
    }

    pub fn has_loading_tiles(&self) -> bool {
        self.tiles
            .lock()
            .is_ok_and(|tiles| tiles.values().any(|state| matches!(state, TileState::Loading)))
    }

    pub fn error_count(&self) -> usize {
        self.tiles.lock().map_or(0, |tiles| {
            tiles
                .values()
                .filter(|state| matches!(state, TileState::Failed))
                .count()
        })
    }
}

async fn download(client: &reqwest::Client, url: &str) -> reqwest::Result<Vec<u8>> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Decode PNG/JPEG bytes into a texture of the UI context.
pub fn decode_texture(ctx: &egui::Context, name: &str, bytes: &[u8]) -> Option<TextureHandle> {
    let rgba = image::load_from_memory(bytes).ok()?.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let color_image = ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
    Some(ctx.load_texture(name, color_image, TextureOptions::LINEAR))
}

/// Tiles covering a viewport of `width` x `height` points centred on a coordinate.
///
/// Tiles come from the integer zoom below `zoom` and are scaled up to fill the
/// fractional remainder.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    reason = "tile indices at zoom <= 19 fit in i32"
)]
pub fn visible_tiles(
    center_lat: f64,
    center_lon: f64,
    zoom: f64,
    width: f32,
    height: f32,
) -> Vec<PlacedTile> {
    let tile_zoom = zoom.floor().clamp(0.0, 19.0);
    let size = (TILE_SIZE * 2_f64.powf(zoom - tile_zoom)) as f32;

    let center_x = WebMercator::lon_to_x(center_lon, tile_zoom);
    let center_y = WebMercator::lat_to_y(center_lat, tile_zoom);

    let tiles_wide = (width / size).ceil() as i32 + 2;
    let tiles_high = (height / size).ceil() as i32 + 2;
    let start_x = center_x.floor() as i32 - tiles_wide / 2;
    let start_y = center_y.floor() as i32 - tiles_high / 2;
    let max_tile = 1_i32 << (tile_zoom as u32);

    let mut tiles = Vec::new();
    for tile_y in start_y..start_y + tiles_high {
        if tile_y < 0 || tile_y >= max_tile {
            continue;
        }
        for tile_x in start_x..start_x + tiles_wide {
            let wrapped_x = tile_x.rem_euclid(max_tile);
            tiles.push(PlacedTile {
                coord: TileCoord::new(wrapped_x as u32, tile_y as u32, tile_zoom as u8),
                offset_x: ((f64::from(tile_x) - center_x) * f64::from(size)) as f32,
                offset_y: ((f64::from(tile_y) - center_y) * f64::from(size)) as f32,
                size,
            });
        }
    }
    tiles
}
