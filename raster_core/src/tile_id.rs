//! Parses the two URL shapes the server accepts into a canonical [`TileId`], and converts
//! tile coordinates to geographic centers.

use crate::geo_center::GeoCenter;
use regex::Regex;
use std::sync::OnceLock;

/// The raster image format requested for a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileFormat {
	Png,
	Jpg,
}

impl TileFormat {
	fn from_extension(ext: &str) -> Option<TileFormat> {
		match ext {
			"png" => Some(TileFormat::Png),
			"jpg" | "jpeg" => Some(TileFormat::Jpg),
			_ => None,
		}
	}

	/// The MIME type to advertise for this format. The renderer always emits PNG bytes
	/// regardless of the requested format (§6 of the spec); this only affects the
	/// `Content-Type` header sent to the client.
	pub fn mime_type(&self) -> &'static str {
		match self {
			TileFormat::Png => "image/png",
			TileFormat::Jpg => "image/jpeg",
		}
	}

	pub fn extension(&self) -> &'static str {
		match self {
			TileFormat::Png => "png",
			TileFormat::Jpg => "jpg",
		}
	}
}

/// A canonical identifier for one slippy-map tile request: a named source plus `(z, x, y)`
/// plus the requested output format.
///
/// Full equality (including `name`) is used as the raster-cache key namespace. [`RenderKey`]
/// strips `name` for the render layer, where only the coordinates and format matter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TileId {
	pub name: String,
	pub z: u8,
	pub x: u64,
	pub y: u64,
	pub format: TileFormat,
}

/// The render-layer identity of a tile: everything about `TileId` except the source name.
/// Two `TileId`s with different names but the same coordinates render identically and share
/// a `RenderKey`, which is what `RenderStats` uses to label its min/max observations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderKey {
	pub z: u8,
	pub x: u64,
	pub y: u64,
	pub format: TileFormat,
}

impl TileId {
	pub const MAX_ZOOM: u8 = 22;

	pub fn new(name: impl Into<String>, z: u8, x: u64, y: u64, format: TileFormat) -> Option<TileId> {
		let id = TileId { name: name.into(), z, x, y, format };
		if id.is_valid() { Some(id) } else { None }
	}

	pub fn is_valid(&self) -> bool {
		if self.z > Self::MAX_ZOOM {
			return false;
		}
		let max = 1u64 << self.z;
		self.x < max && self.y < max
	}

	pub fn render_key(&self) -> RenderKey {
		RenderKey { z: self.z, x: self.x, y: self.y, format: self.format }
	}

	/// Derives the geographic center for this tile (§3).
	pub fn to_center(&self) -> GeoCenter {
		GeoCenter::from_tile(self.z, self.x, self.y)
	}

	/// Renders the canonical path form, e.g. `/osm/4/5/6.png`.
	pub fn to_path(&self) -> String {
		format!("/{}/{}/{}/{}.{}", self.name, self.z, self.x, self.y, self.format.extension())
	}

	/// Parses either URL shape described in §4.A. Returns `None` if neither shape matches,
	/// leaving the decision to surface a 404 to the caller.
	pub fn parse(url: &str) -> Option<TileId> {
		parse_path_shape(url).or_else(|| parse_query_shape(url))
	}
}

fn path_regex() -> &'static Regex {
	static RE: OnceLock<Regex> = OnceLock::new();
	RE.get_or_init(|| Regex::new(r"^/([^/]+)/(\d+)/(\d+)/(\d+)(?:\.(png|jpg|jpeg))?$").unwrap())
}

fn parse_path_shape(url: &str) -> Option<TileId> {
	let path = url.split('?').next().unwrap_or(url);
	let caps = path_regex().captures(path)?;
	let name = caps.get(1)?.as_str().to_owned();
	let z: u8 = caps.get(2)?.as_str().parse().ok()?;
	let x: u64 = caps.get(3)?.as_str().parse().ok()?;
	let y: u64 = caps.get(4)?.as_str().parse().ok()?;
	let format = caps
		.get(5)
		.and_then(|m| TileFormat::from_extension(m.as_str()))
		.unwrap_or(TileFormat::Png);
	TileId::new(name, z, x, y, format)
}

fn parse_query_shape(url: &str) -> Option<TileId> {
	let mut parts = url.splitn(2, '?');
	let path = parts.next()?;
	let query = parts.next()?;

	let name = path.trim_start_matches('/').to_owned();
	if name.is_empty() {
		return None;
	}

	let mut x = None;
	let mut y = None;
	let mut z = None;
	for pair in query.split('&') {
		let mut kv = pair.splitn(2, '=');
		let key = kv.next()?;
		let value = kv.next()?;
		match key {
			"x" => x = value.parse::<u64>().ok(),
			"y" => y = value.parse::<u64>().ok(),
			"z" => z = value.parse::<u8>().ok(),
			_ => {}
		}
	}

	TileId::new(name, z?, x?, y?, TileFormat::Png)
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn parses_the_path_shape_with_explicit_png_extension() {
		let id = TileId::parse("/osm/4/5/6.png").unwrap();
		assert_eq!(id, TileId::new("osm", 4, 5, 6, TileFormat::Png).unwrap());
	}

	#[test]
	fn parses_the_path_shape_with_jpg_extension() {
		let id = TileId::parse("/osm/4/5/6.jpg").unwrap();
		assert_eq!(id.format, TileFormat::Jpg);
	}

	#[test]
	fn defaults_to_png_when_the_path_shape_has_no_extension() {
		let id = TileId::parse("/osm/4/5/6").unwrap();
		assert_eq!(id.format, TileFormat::Png);
	}

	#[test]
	fn parses_the_query_shape_and_always_defaults_to_png() {
		let id = TileId::parse("/default?x=3&y=4&z=5").unwrap();
		assert_eq!(id, TileId::new("default", 5, 3, 4, TileFormat::Png).unwrap());
	}

	#[test]
	fn query_shape_is_equivalent_to_the_matching_path_shape() {
		let from_query = TileId::parse("/default?x=3&y=4&z=5").unwrap();
		let from_path = TileId::parse("/default/5/3/4.png").unwrap();
		assert_eq!(from_query, from_path);
	}

	#[test]
	fn rejects_urls_that_match_neither_shape() {
		assert!(TileId::parse("/bogus-path").is_none());
		assert!(TileId::parse("/default?x=3&y=4").is_none());
	}

	#[test]
	fn rejects_out_of_range_zoom_and_coordinates() {
		assert!(TileId::parse("/osm/23/0/0").is_none());
		assert!(TileId::parse("/osm/2/4/0").is_none());
	}

	#[test]
	fn url_round_trip_holds_for_every_valid_tile() {
		for z in 0..=6u8 {
			let n = 1u64 << z;
			for x in 0..n {
				for y in 0..n {
					let id = TileId::new("layer", z, x, y, TileFormat::Png).unwrap();
					let parsed = TileId::parse(&id.to_path()).unwrap();
					assert_eq!(parsed, id);
				}
			}
		}
	}

	#[test]
	fn render_key_drops_the_source_name() {
		let a = TileId::new("alpha", 3, 1, 2, TileFormat::Png).unwrap();
		let b = TileId::new("beta", 3, 1, 2, TileFormat::Png).unwrap();
		assert_ne!(a, b);
		assert_eq!(a.render_key(), b.render_key());
	}
}
