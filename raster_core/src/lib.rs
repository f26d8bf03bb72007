//! Shared types for the raster-tile server: tile addressing, geographic projection, cache
//! keys and values, the shared error taxonomy, and render timing statistics.
//!
//! This crate has no I/O of its own; `raster_cache` and `raster_render` build on top of it.

pub mod cached_response;
pub mod clock;
pub mod error;
pub mod geo_center;
pub mod resource_key;
pub mod stats;
pub mod tile_id;

pub use cached_response::{CachedError, CachedResponse, ErrorKind};
pub use error::TileError;
pub use geo_center::GeoCenter;
pub use resource_key::{KeyTileCoord, ResourceKey, ResourceKind};
pub use stats::RenderStats;
pub use tile_id::{RenderKey, TileFormat, TileId};
