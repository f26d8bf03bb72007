//! Canonical keys for resources held in the persistent cache store (§4.B, §4.C).

use std::fmt;

/// The category of resource a [`ResourceKey`] identifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
	Style,
	Sprite,
	Glyph,
	VectorTile,
	RasterTile,
	Source,
}

impl ResourceKind {
	fn as_str(&self) -> &'static str {
		match self {
			ResourceKind::Style => "style",
			ResourceKind::Sprite => "sprite",
			ResourceKind::Glyph => "glyph",
			ResourceKind::VectorTile => "vector_tile",
			ResourceKind::RasterTile => "raster_tile",
			ResourceKind::Source => "source",
		}
	}
}

/// A tile coordinate attached to a [`ResourceKey`] when the resource is coordinate-addressed
/// (vector tiles, raster tiles); `None` for coordinate-free resources (styles, sprites, glyphs).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyTileCoord {
	pub z: u8,
	pub x: u64,
	pub y: u64,
}

/// The primary key used by the persistent cache store (§4.C): a resource kind, its source
/// URL, an optional tile coordinate, and the pixel ratio it was fetched for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceKey {
	pub kind: ResourceKind,
	pub url: String,
	pub tile_coord: Option<KeyTileCoord>,
	pub pixel_ratio: u8,
}

impl ResourceKey {
	pub fn new(kind: ResourceKind, url: impl Into<String>, pixel_ratio: u8) -> Self {
		ResourceKey { kind, url: url.into(), tile_coord: None, pixel_ratio }
	}

	pub fn with_tile_coord(mut self, z: u8, x: u64, y: u64) -> Self {
		self.tile_coord = Some(KeyTileCoord { z, x, y });
		self
	}

	/// A canonical, process-independent textual fingerprint. This is also the store's
	/// primary-key format (§11): `kind|url|z,x,y|ratio`, with `z,x,y` elided for
	/// coordinate-free resources.
	pub fn fingerprint(&self) -> String {
		format!("{self}")
	}
}

impl fmt::Display for ResourceKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let coord = match self.tile_coord {
			Some(KeyTileCoord { z, x, y }) => format!("{z},{x},{y}"),
			None => String::new(),
		};
		write!(f, "{}|{}|{}|{}", self.kind.as_str(), self.url, coord, self.pixel_ratio)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fingerprint_includes_every_field() {
		let a = ResourceKey::new(ResourceKind::Style, "file:///style.json", 2);
		let b = ResourceKey::new(ResourceKind::Style, "file:///style.json", 1);
		assert_ne!(a.fingerprint(), b.fingerprint());

		let c = a.clone().with_tile_coord(4, 1, 2);
		assert_ne!(a.fingerprint(), c.fingerprint());
	}

	#[test]
	fn fingerprint_is_stable_for_equal_keys() {
		let a = ResourceKey::new(ResourceKind::VectorTile, "https://example.org/tiles", 2).with_tile_coord(3, 1, 1);
		let b = ResourceKey::new(ResourceKind::VectorTile, "https://example.org/tiles", 2).with_tile_coord(3, 1, 1);
		assert_eq!(a.fingerprint(), b.fingerprint());
	}

	#[test]
	fn different_kinds_never_collide() {
		let style = ResourceKey::new(ResourceKind::Style, "u", 1);
		let sprite = ResourceKey::new(ResourceKind::Sprite, "u", 1);
		assert_ne!(style.fingerprint(), sprite.fingerprint());
	}
}
