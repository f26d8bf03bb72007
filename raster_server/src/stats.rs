//! `StatsAggregator` (§4.K): a read-only snapshot across the registered renderer workers.

use raster_core::{RenderStats, TileFormat};
use raster_render::RendererWorker;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct StatsAggregator {
	name: String,
	start_time_ms: i64,
	workers: Vec<Arc<RendererWorker>>,
}

impl StatsAggregator {
	pub fn new(name: String, start_time_ms: i64, workers: Vec<Arc<RendererWorker>>) -> Self {
		StatsAggregator { name, start_time_ms, workers }
	}

	/// Builds the `/stats` JSON body (§12): one entry per renderer worker, each copied from
	/// that worker's own stats lock independently — there is no cross-worker atomicity.
	pub fn snapshot(&self) -> Value {
		let now_ms = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as i64;
		let uptime_seconds = ((now_ms - self.start_time_ms).max(0)) / 1000;

		let renderers: Vec<Value> =
			self.workers.iter().map(|worker| render_stats_json(worker.id, &worker.stats_snapshot())).collect();

		json!({
			"name": self.name,
			"uptime_seconds": uptime_seconds,
			"renderers": renderers,
		})
	}
}

fn render_stats_json(id: usize, stats: &RenderStats) -> Value {
	json!({
		"id": id,
		"count": stats.count,
		"total_render_ms": (stats.total_render_ns / 1_000_000) as u64,
		"min_render_ms": stats.min_render_ns.map(|ns| ns / 1_000_000),
		"min_tile": stats.min_tile.map(render_key_path),
		"max_render_ms": stats.max_render_ns.map(|ns| ns / 1_000_000),
		"max_tile": stats.max_tile.map(render_key_path),
		"total_encode_ms": (stats.total_encode_ns / 1_000_000) as u64,
	})
}

fn render_key_path(key: raster_core::RenderKey) -> String {
	let ext = match key.format {
		TileFormat::Png => "png",
		TileFormat::Jpg => "jpg",
	};
	format!("{}/{}/{}.{}", key.z, key.x, key.y, ext)
}
