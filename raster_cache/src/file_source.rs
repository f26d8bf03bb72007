//! The `FileSource` contract shared by [`crate::RasterCache`] and
//! [`crate::VectorSource`] (§4.D, §4.E, §6 GLOSSARY).

use async_trait::async_trait;
use raster_core::{CachedResponse, ResourceKey};
use tokio::task::JoinHandle;

/// A byte-resource provider. Implementors serve `request` from whatever backing store they
/// own (a persistent cache, an upstream HTTP fetch) and may additionally accept `put` to
/// populate that store.
#[async_trait]
pub trait FileSource: Send + Sync {
	async fn request(&self, key: ResourceKey) -> CachedResponse;

	async fn put(&self, key: ResourceKey, response: CachedResponse);
}

/// The handle returned by [`spawn_request`]: a cancellable, awaitable in-flight request.
///
/// Cancellation is idempotent and a no-op once the request has already completed, matching
/// the native semantics of aborting a Tokio task whose result has already been taken.
pub struct RequestHandle {
	task: JoinHandle<CachedResponse>,
}

impl RequestHandle {
	pub fn cancel(&self) {
		self.task.abort();
	}

	/// Awaits completion. Returns a synthesized I/O-error response if the task was cancelled
	/// or panicked, so callers never need to special-case a join error.
	pub async fn join(self) -> CachedResponse {
		match self.task.await {
			Ok(response) => response,
			Err(_) => CachedResponse::io_error("request was cancelled"),
		}
	}
}

/// Spawns `fut` as a cancellable, independently-running request (§4.D's "cancellable handle").
pub fn spawn_request<F>(fut: F) -> RequestHandle
where
	F: std::future::Future<Output = CachedResponse> + Send + 'static,
{
	RequestHandle { task: tokio::spawn(fut) }
}
