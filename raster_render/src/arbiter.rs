//! Process-wide exclusive lock around `render_still` (§4.H).
//!
//! The rendering engine's internal worker pool is thread-safe, but its top-level entry point
//! is not reentrant across distinct map instances. One process-wide mutex, held for the
//! duration of `render_still` only (never across encoding), is the simplest correct fix.

use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct RenderArbiter {
	lock: Arc<Mutex<()>>,
}

impl RenderArbiter {
	pub fn new() -> Self {
		RenderArbiter::default()
	}

	/// Runs `f` while holding the arbiter. Blocks the calling (dedicated renderer) thread
	/// until any concurrent render elsewhere in the process has released the lock.
	pub fn render_exclusively<T>(&self, f: impl FnOnce() -> T) -> T {
		let _guard = self.lock.lock();
		f()
	}
}
