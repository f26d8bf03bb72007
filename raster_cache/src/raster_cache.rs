//! Thin [`FileSource`] facade over the persistent [`CacheStore`] (§4.D).

use crate::file_source::{FileSource, RequestHandle, spawn_request};
use crate::store::CacheStore;
use async_trait::async_trait;
use raster_core::{CachedResponse, ResourceKey};
use std::sync::Arc;

pub struct RasterCache {
	store: Arc<CacheStore>,
}

impl RasterCache {
	pub fn new(store: Arc<CacheStore>) -> Self {
		RasterCache { store }
	}

	/// Looks up `key`, synthesizing a `NotFound` (carrying the stale entry's prior fields for
	/// conditional revalidation) when the stored entry is absent or unusable.
	async fn lookup(&self, key: &ResourceKey) -> CachedResponse {
		let fingerprint = key.fingerprint();
		let stored = match self.store.get(fingerprint).await {
			Ok(stored) => stored,
			Err(err) => return CachedResponse::io_error(err.to_string()),
		};

		match stored {
			None => CachedResponse::not_found("not found in offline database"),
			Some(response) if !response.is_usable() => {
				response.carry_prior_fields().and_not_found("cached resource is unusable")
			}
			Some(response) => response.carry_prior_fields(),
		}
	}

	/// Issues a cancellable, non-blocking lookup, mirroring `request(resource, callback)`.
	pub fn request(self: &Arc<Self>, key: ResourceKey) -> RequestHandle {
		let this = Arc::clone(self);
		spawn_request(async move { this.lookup(&key).await })
	}
}

#[async_trait]
impl FileSource for RasterCache {
	async fn request(&self, key: ResourceKey) -> CachedResponse {
		self.lookup(&key).await
	}

	async fn put(&self, key: ResourceKey, response: CachedResponse) {
		if let Err(err) = self.store.put(key.fingerprint(), response).await {
			log::warn!("raster cache put failed: {err:#}");
		}
	}
}

trait CarryNotFound {
	fn and_not_found(self, message: &str) -> CachedResponse;
}

impl CarryNotFound for CachedResponse {
	/// Replaces a usable-but-stale response's data/error with a synthesized `NotFound`,
	/// while preserving the `prior_*` fields already carried for conditional revalidation.
	fn and_not_found(mut self, message: &str) -> CachedResponse {
		let carried = CachedResponse::not_found(message);
		self.data = carried.data;
		self.no_content = carried.no_content;
		self.error = carried.error;
		self
	}
}
