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

//! Presentation surface abstraction.
//!
//! The client never owns a map library. It is handed something implementing
//! [`PresentationSurface`] and drives it through these calls only.

/// Geographic rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    #[must_use]
    pub const fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.south..=self.north).contains(&lat) && (self.west..=self.east).contains(&lon)
    }

    /// Nearest point inside the rectangle.
    #[must_use]
    pub fn clamp(&self, lat: f64, lon: f64) -> (f64, f64) {
        (lat.clamp(self.south, self.north), lon.clamp(self.west, self.east))
    }
}

/// Area covered by the forecast images (the Netherlands and surroundings).
pub const RADAR_BOUNDS: GeoBounds = GeoBounds::new(49.5, 0.0, 54.8, 10.0);

/// Marker symbols a surface is expected to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerIcon {
    Home,
}

/// Map able to show a georeferenced image above a basemap.
pub trait PresentationSurface: Send {
    fn set_view(&mut self, lat: f64, lon: f64, zoom: u8);

    fn add_image_overlay(
        &mut self,
        url: &str,
        bounds: GeoBounds,
        opacity: f32,
    ) -> Box<dyn ImageOverlay>;

    fn add_marker(&mut self, lat: f64, lon: f64, icon: MarkerIcon) -> Box<dyn MapMarker>;
}

/// Handle to an overlay added with [`PresentationSurface::add_image_overlay`].
pub trait ImageOverlay: Send {
    fn set_url(&mut self, url: &str);

    fn set_opacity(&mut self, opacity: f32);
}

/// Handle to a marker added with [`PresentationSurface::add_marker`].
pub trait MapMarker: Send {
    fn remove(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radar_bounds() {
        assert!(RADAR_BOUNDS.contains(52.1, 5.18));
        assert!(!RADAR_BOUNDS.contains(48.0, 5.0));
        assert_eq!(RADAR_BOUNDS.clamp(60.0, -3.0), (54.8, 0.0));
    }
}
