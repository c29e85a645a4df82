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

//! Web Mercator projection utilities.

use std::f64::consts::PI;

/// Edge length of a basemap tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Web Mercator projection in tile units at a (possibly fractional) zoom.
#[derive(Debug, Clone, Copy)]
pub struct WebMercator;

impl WebMercator {
    fn world_size(zoom: f64) -> f64 {
        2_f64.powf(zoom)
    }

    /// Convert latitude to a Web Mercator Y coordinate in tiles
    pub fn lat_to_y(lat: f64, zoom: f64) -> f64 {
        let lat_rad = lat.to_radians();
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
        y * Self::world_size(zoom)
    }

    /// Convert longitude to a Web Mercator X coordinate in tiles
    pub fn lon_to_x(lon: f64, zoom: f64) -> f64 {
        (lon + 180.0) / 360.0 * Self::world_size(zoom)
    }

    /// Convert a Y coordinate in tiles back to latitude
    pub fn y_to_lat(y: f64, zoom: f64) -> f64 {
        let n = PI * (1.0 - 2.0 * y / Self::world_size(zoom));
        n.sinh().atan().to_degrees()
    }

    /// Convert an X coordinate in tiles back to longitude
    pub fn x_to_lon(x: f64, zoom: f64) -> f64 {
        x / Self::world_size(zoom) * 360.0 - 180.0
    }
}

/// Maps geographic coordinates onto screen pixels around a centre point.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
    /// Screen position of the centre, in points.
    pub origin: (f32, f32),
}

impl Viewport {
    /// Screen position of a geographic coordinate.
    #[allow(clippy::cast_possible_truncation, reason = "screen offsets fit in f32")]
    pub fn project(&self, lat: f64, lon: f64) -> (f32, f32) {
        let dx = WebMercator::lon_to_x(lon, self.zoom) - WebMercator::lon_to_x(self.center_lon, self.zoom);
        let dy = WebMercator::lat_to_y(lat, self.zoom) - WebMercator::lat_to_y(self.center_lat, self.zoom);
        (
            self.origin.0 + (dx * TILE_SIZE) as f32,
            self.origin.1 + (dy * TILE_SIZE) as f32,
        )
    }

    /// Geographic coordinate under a screen position.
    pub fn unproject(&self, x: f32, y: f32) -> (f64, f64) {
        let tile_x = WebMercator::lon_to_x(self.center_lon, self.zoom)
            + f64::from(x - self.origin.0) / TILE_SIZE;
        let tile_y = WebMercator::lat_to_y(self.center_lat, self.zoom)
            + f64::from(y - self.origin.1) / TILE_SIZE;
        (
            WebMercator::y_to_lat(tile_y, self.zoom),
            WebMercator::x_to_lon(tile_x, self.zoom),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_origin_maps_to_tile_zero() {
        assert!(approx(WebMercator::lon_to_x(-180.0, 3.0), 0.0));
        assert!(approx(WebMercator::lat_to_y(0.0, 1.0), 1.0));
    }

    #[test]
    fn test_inverse_projection() {
        let zoom = 7.5;
        let (lat, lon) = (52.1, 5.18);
        let y = WebMercator::lat_to_y(lat, zoom);
        let x = WebMercator::lon_to_x(lon, zoom);
        assert!(approx(WebMercator::y_to_lat(y, zoom), lat));
        assert!(approx(WebMercator::x_to_lon(x, zoom), lon));
    }

    #[test]
    fn test_viewport_centre_projects_to_origin() {
        let viewport = Viewport {
            center_lat: 52.1,
            center_lon: 5.18,
            zoom: 8.0,
            origin: (400.0, 300.0),
        };
        assert_eq!(viewport.project(52.1, 5.18), (400.0, 300.0));

        let (x, y) = viewport.project(53.0, 6.0);
        assert!(x > 400.0, "east is to the right");
        assert!(y < 300.0, "north is up");

        let (lat, lon) = viewport.unproject(x, y);
        assert!((lat - 53.0).abs() < 1e-3);
        assert!((lon - 6.0).abs() < 1e-3);
    }
}
