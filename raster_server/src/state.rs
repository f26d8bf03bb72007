//! Process bootstrap: wires the config into cache stores, a renderer worker pool, and one
//! `TileLoader` per worker, matching the server/RendererWorker cardinality in §5.

use crate::config::Config;
use anyhow::{Context, Result};
use raster_cache::{CacheStore, RasterCache};
use raster_core::clock::now_ms;
use raster_render::{RenderArbiter, RendererWorker, StubRenderer, TileLoader};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct AppState {
	pub name: String,
	pub start_time_ms: i64,
	pub workers: Vec<Arc<RendererWorker>>,
	loaders: Vec<Arc<TileLoader>>,
	next: AtomicUsize,
}

impl AppState {
	pub fn bootstrap(config: &Config) -> Result<Arc<AppState>> {
		let start_time_ms = now_ms();

		let raster_store = Arc::new(
			CacheStore::open(&config.raster_cache, config.raster_cache_limit_bytes)
				.context("opening raster cache store")?,
		);
		let cache = Arc::new(RasterCache::new(raster_store));

		// The vector cache store backs style/sprite/glyph/vector-tile fetches performed by
		// the (opaque, external) rendering engine; holding it open here keeps its lifetime
		// tied to the process the same way the raster cache's is.
		let _vector_store = Arc::new(
			CacheStore::open(&config.vector_cache, config.vector_cache_limit_bytes)
				.context("opening vector cache store")?,
		);

		// §3: the cache key's pixel ratio tracks `--tile-size` (256px -> 1, 512px -> 2), so
		// caches populated at different tile sizes never collide on the same fingerprint.
		let pixel_ratio: u8 = if config.tile_size >= 512 { 2 } else { 1 };

		let arbiter = RenderArbiter::new();
		let mut workers = Vec::with_capacity(config.server_threads);
		let mut loaders = Vec::with_capacity(config.server_threads);
		for id in 0..config.server_threads {
			// StubRenderer stands in for the real vector-to-raster engine, which this crate
			// treats as an opaque external collaborator (§4.F).
			let worker =
				Arc::new(RendererWorker::spawn(id, Box::new(StubRenderer), arbiter.clone(), config.tile_size, start_time_ms));
			loaders.push(Arc::new(TileLoader::new(Arc::clone(&cache), Arc::clone(&worker), pixel_ratio)));
			workers.push(worker);
		}

		Ok(Arc::new(AppState { name: config.name.clone(), start_time_ms, workers, loaders, next: AtomicUsize::new(0) }))
	}

	/// Assigns the next request to a worker round-robin (§4.G).
	pub fn next_loader(&self) -> Arc<TileLoader> {
		let index = self.next.fetch_add(1, Ordering::Relaxed) % self.loaders.len();
		Arc::clone(&self.loaders[index])
	}
}
