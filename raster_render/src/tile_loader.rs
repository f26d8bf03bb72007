//! Cache-first-then-render coalescing for a single tile request (§4.I).

use crate::worker::RendererWorker;
use raster_cache::{FileSource, RasterCache};
use raster_core::{TileError, TileId, clock::HOUR_MS, clock::now_ms};
use std::sync::Arc;

/// The resolved outcome of loading one tile.
pub struct Tile {
	pub id: TileId,
	pub data: Vec<u8>,
	pub modified_ms: i64,
	pub expires_ms: i64,
}

/// The reference implementation backdates `modified`/`expires` by a 30-hour TTL.
const EXPIRY_MS: i64 = 30 * HOUR_MS;

/// Loads one tile: a cache hit returns immediately; a miss renders and writes the result back
/// to the cache without waiting on that write to complete.
pub struct TileLoader {
	cache: Arc<RasterCache>,
	worker: Arc<RendererWorker>,
	/// The cache key's pixel ratio (§3): `1` at 256px tiles, `2` at 512px tiles. Keeps caches
	/// populated at different `--tile-size` settings from colliding on the same fingerprint.
	pixel_ratio: u8,
}

impl TileLoader {
	pub fn new(cache: Arc<RasterCache>, worker: Arc<RendererWorker>, pixel_ratio: u8) -> Self {
		TileLoader { cache, worker, pixel_ratio }
	}

	pub async fn load(&self, id: TileId) -> Result<Tile, TileError> {
		let key =
			raster_core::ResourceKey::new(raster_core::ResourceKind::RasterTile, id.name.clone(), self.pixel_ratio)
				.with_tile_coord(id.z, id.x, id.y);

		let cached = FileSource::request(self.cache.as_ref(), key.clone()).await;
		if cached.is_usable() {
			let data = cached.data.clone().unwrap_or_default();
			return Ok(Tile {
				id,
				data,
				modified_ms: cached.modified_ms.unwrap_or_else(now_ms),
				expires_ms: cached.expires_ms.unwrap_or_else(|| now_ms() + EXPIRY_MS),
			});
		}
		// A cache I/O error is treated the same as a miss: fall through to rendering, but
		// log it since it's not supposed to happen in steady state (§7).
		if let Some(error) = &cached.error {
			if error.kind != raster_core::ErrorKind::NotFound {
				log::warn!("cache lookup error for {}, rendering instead: {}", id.to_path(), error.message);
			}
		}

		self.render_and_store(id, key).await
	}

	async fn render_and_store(&self, id: TileId, key: raster_core::ResourceKey) -> Result<Tile, TileError> {
		let bytes = self
			.worker
			.render_tile(id.clone())
			.await
			.map_err(|err| TileError::RenderError(format!("{err:?}")))?;

		let modified_ms = now_ms();
		let expires_ms = modified_ms + EXPIRY_MS;

		let cache = Arc::clone(&self.cache);
		let mut response = raster_core::CachedResponse::with_data(bytes.clone());
		response.modified_ms = Some(modified_ms);
		response.expires_ms = Some(expires_ms);
		response.must_revalidate = false;
		// The loader does not wait on the write landing; a reader that races this put simply
		// re-renders, which is safe and matches the reference's fire-and-forget cache put.
		tokio::spawn(async move {
			FileSource::put(cache.as_ref(), key, response).await;
		});

		Ok(Tile { id, data: bytes, modified_ms, expires_ms })
	}
}
