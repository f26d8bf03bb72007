//! Geographic center points derived from slippy-map tile coordinates.

use std::f64::consts::PI;

/// A center point in geographic space: `f64` longitude in `[-180, 180]`, `f64` latitude in
/// `[-90, 90]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoCenter {
	pub lon: f64,
	pub lat: f64,
}

impl GeoCenter {
	pub fn new(lon: f64, lat: f64) -> Self {
		GeoCenter { lon, lat }
	}

	/// Derives the geographic center of tile `(z, x, y)` using the standard Web Mercator
	/// inverse projection, sampled at the tile's midpoint.
	///
	/// `lon = 360*(x+0.5)/2^z - 180`, `lat = atan(sinh(pi*(1 - 2*(y+0.5)/2^z))) * 180/pi`.
	pub fn from_tile(z: u8, x: u64, y: u64) -> Self {
		let n = 2f64.powi(z as i32);
		let lon = 360.0 * ((x as f64 + 0.5) / n) - 180.0;
		let lat = (PI * (1.0 - 2.0 * (y as f64 + 0.5) / n)).sinh().atan() * 180.0 / PI;
		GeoCenter { lon, lat }
	}

	pub fn as_array(&self) -> [f64; 2] {
		[self.lon, self.lat]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn center_of_the_single_world_tile_is_the_origin() {
		let c = GeoCenter::from_tile(0, 0, 0);
		assert!(c.lon.abs() < 1e-9);
		assert!(c.lat.abs() < 1e-9);
	}

	#[test]
	fn zoom_one_quadrants_land_on_plus_minus_ninety_longitude() {
		assert!((GeoCenter::from_tile(1, 0, 0).lon - -90.0).abs() < 1e-9);
		assert!((GeoCenter::from_tile(1, 1, 0).lon - 90.0).abs() < 1e-9);
	}

	#[test]
	fn northern_tiles_have_positive_latitude() {
		let c = GeoCenter::from_tile(2, 2, 0);
		assert!(c.lat > 0.0);
	}
}
