//! A `RendererWorker` owns one renderer instance on a dedicated OS thread, so that map state
//! (center, zoom) is always mutated and read from a single thread, matching the mbgl
//! "thread-confined map" discipline the rendering engine assumes (§4.G).
//!
//! The original design pumps a per-thread event loop until a render completion callback
//! fires. This realization replaces that with the native Rust completion primitive: the
//! worker thread owns an `mpsc::Receiver<RenderJob>`, and `render_tile` hands back a
//! `tokio::sync::oneshot` receiver that the caller `.await`s.

use crate::arbiter::RenderArbiter;
use crate::renderer::Renderer;
use image::{ImageFormat, RgbaImage};
use parking_lot::Mutex;
use raster_core::{RenderStats, TileFormat, TileId};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::time::Instant;
use tokio::sync::oneshot;

/// Raised when a render or encode step fails; carried back through the job's reply channel.
#[derive(Debug, Clone)]
pub enum WorkerError {
	Render(String),
	Encode(String),
}

struct RenderJob {
	tile: TileId,
	reply: oneshot::Sender<Result<Vec<u8>, WorkerError>>,
}

/// A dedicated renderer thread plus its timing statistics, addressable from async code.
pub struct RendererWorker {
	pub id: usize,
	inbox: Sender<RenderJob>,
	stats: Arc<Mutex<RenderStats>>,
	_thread: std::thread::JoinHandle<()>,
}

impl RendererWorker {
	pub fn spawn(id: usize, renderer: Box<dyn Renderer>, arbiter: RenderArbiter, tile_size: u32, start_time_ms: i64) -> Self {
		let (inbox, rx) = mpsc::channel::<RenderJob>();
		let stats = Arc::new(Mutex::new(RenderStats::new(start_time_ms)));
		let thread_stats = Arc::clone(&stats);

		let thread = std::thread::Builder::new()
			.name(format!("renderer-worker-{id}"))
			.spawn(move || run(renderer, arbiter, tile_size, rx, thread_stats))
			.expect("spawning renderer worker thread");

		RendererWorker { id, inbox, stats, _thread: thread }
	}

	/// Enqueues a render and returns once the worker's reply arrives. The worker thread
	/// processes jobs one at a time, so two concurrent calls on the same worker serialize
	/// naturally (§4.I's coalescing note).
	pub async fn render_tile(&self, tile: TileId) -> Result<Vec<u8>, WorkerError> {
		let (reply, rx) = oneshot::channel();
		self.inbox
			.send(RenderJob { tile, reply })
			.map_err(|_| WorkerError::Render("renderer worker thread is gone".into()))?;
		rx.await.map_err(|_| WorkerError::Render("renderer worker dropped the reply".into()))?
	}

	pub fn stats_snapshot(&self) -> RenderStats {
		self.stats.lock().clone()
	}
}

fn run(
	renderer: Box<dyn Renderer>,
	arbiter: RenderArbiter,
	tile_size: u32,
	rx: std::sync::mpsc::Receiver<RenderJob>,
	stats: Arc<Mutex<RenderStats>>,
) {
	for job in rx.iter() {
		let result = render_one(renderer.as_ref(), &arbiter, tile_size, &job.tile, &stats);
		let _ = job.reply.send(result);
	}
}

fn render_one(
	renderer: &dyn Renderer,
	arbiter: &RenderArbiter,
	tile_size: u32,
	tile: &TileId,
	stats: &Mutex<RenderStats>,
) -> Result<Vec<u8>, WorkerError> {
	let center = tile.to_center();
	// Vector tiles are authored in a 512px space; at 256px we back off one zoom level so
	// feature density still matches what the style expects.
	let effective_zoom = if tile_size < 512 { (tile.z as f64 - 1.0).max(0.0) } else { tile.z as f64 };

	let render_start = Instant::now();
	let image = arbiter
		.render_exclusively(|| renderer.render_still(center, effective_zoom, tile_size, tile_size))
		.map_err(|err| WorkerError::Render(err.to_string()))?;
	let render_ns = render_start.elapsed().as_nanos() as u64;

	let encode_start = Instant::now();
	let encoded = encode_png(&image.rgba, image.width, image.height, tile.format)?;
	let encode_ns = encode_start.elapsed().as_nanos() as u64;

	stats.lock().record(tile.render_key(), render_ns, encode_ns);

	Ok(encoded)
}

/// Un-premultiplies alpha (the engine hands us premultiplied RGBA) and PNG-encodes. The
/// requested format only ever affects the `Content-Type` the handler advertises (§6); the
/// bytes themselves are always PNG, matching the reference encoder.
fn encode_png(rgba: &[u8], width: u32, height: u32, _requested: TileFormat) -> Result<Vec<u8>, WorkerError> {
	let mut straight = rgba.to_vec();
	for pixel in straight.chunks_exact_mut(4) {
		let a = pixel[3] as u32;
		if a != 0 && a != 255 {
			pixel[0] = ((pixel[0] as u32 * 255) / a) as u8;
			pixel[1] = ((pixel[1] as u32 * 255) / a) as u8;
			pixel[2] = ((pixel[2] as u32 * 255) / a) as u8;
		}
	}

	let image = RgbaImage::from_raw(width, height, straight)
		.ok_or_else(|| WorkerError::Encode("rendered buffer did not match its declared dimensions".into()))?;

	let mut bytes = Cursor::new(Vec::new());
	image.write_to(&mut bytes, ImageFormat::Png).map_err(|err| WorkerError::Encode(err.to_string()))?;
	Ok(bytes.into_inner())
}
