//! Upstream [`FileSource`] for style/sprite/glyph/vector-tile resources (§4.E): serves from
//! the vector cache store on hit, otherwise fetches over HTTP or from `asset://` and writes
//! the result back.

use crate::file_source::FileSource;
use crate::store::CacheStore;
use async_trait::async_trait;
use raster_core::{CachedResponse, ResourceKey};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct VectorSource {
	store: Arc<CacheStore>,
	asset_root: PathBuf,
	client: reqwest::blocking::Client,
}

impl VectorSource {
	pub fn new(store: Arc<CacheStore>, asset_root: PathBuf) -> Self {
		VectorSource { store, asset_root, client: reqwest::blocking::Client::new() }
	}
}

fn fetch_asset(asset_root: &Path, relative: &str) -> CachedResponse {
	match std::fs::read(asset_root.join(relative)) {
		Ok(data) => CachedResponse::with_data(data),
		Err(err) => CachedResponse::not_found(format!("asset not found: {err}")),
	}
}

fn fetch_http(client: &reqwest::blocking::Client, url: &str) -> CachedResponse {
	let response = match client.get(url).send() {
		Ok(response) => response,
		Err(err) => return CachedResponse::io_error(format!("upstream fetch failed: {err}")),
	};
	if !response.status().is_success() {
		return CachedResponse::not_found(format!("upstream returned {}", response.status()));
	}
	let etag = response.headers().get(reqwest::header::ETAG).and_then(|v| v.to_str().ok()).map(String::from);
	match response.bytes() {
		Ok(bytes) => {
			let mut cached = CachedResponse::with_data(bytes.to_vec());
			cached.etag = etag;
			cached
		}
		Err(err) => CachedResponse::io_error(format!("reading upstream body: {err}")),
	}
}

/// Blocking fetch, run off the async executor via `spawn_blocking` by callers.
fn fetch(client: &reqwest::blocking::Client, asset_root: &Path, url: &str) -> CachedResponse {
	match url.strip_prefix("asset://") {
		Some(relative) => fetch_asset(asset_root, relative),
		None => fetch_http(client, url),
	}
}

#[async_trait]
impl FileSource for VectorSource {
	async fn request(&self, key: ResourceKey) -> CachedResponse {
		let fingerprint = key.fingerprint();
		match self.store.get(fingerprint.clone()).await {
			Ok(Some(cached)) if cached.is_usable() => return cached,
			Ok(_) => {}
			Err(err) => log::warn!("vector cache read failed: {err:#}"),
		}

		let client = self.client.clone();
		let asset_root = self.asset_root.clone();
		let url = key.url.clone();
		let response = tokio::task::spawn_blocking(move || fetch(&client, &asset_root, &url))
			.await
			.unwrap_or_else(|err| CachedResponse::io_error(format!("fetch task panicked: {err}")));

		if response.is_usable() {
			if let Err(err) = self.store.put(fingerprint, response.clone()).await {
				log::warn!("vector cache write failed: {err:#}");
			}
		}
		response
	}

	async fn put(&self, key: ResourceKey, response: CachedResponse) {
		if let Err(err) = self.store.put(key.fingerprint(), response).await {
			log::warn!("vector cache write failed: {err:#}");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use raster_core::ResourceKind;

	fn store() -> Arc<CacheStore> {
		let dir = tempfile::tempdir().unwrap();
		Arc::new(CacheStore::open(&dir.path().join("cache.sqlite"), 0).unwrap())
	}

	// `VectorSource::new` builds a `reqwest::blocking::Client`, which panics if constructed
	// while a tokio runtime is already entered on the current thread. These tests therefore
	// build the source before calling `Runtime::block_on`, rather than using `#[tokio::test]`.

	#[test]
	fn asset_scheme_reads_from_the_asset_root() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("style.json"), b"{}").unwrap();

		let source = VectorSource::new(store(), dir.path().to_path_buf());
		let key = ResourceKey::new(ResourceKind::Style, "asset://style.json", 1);

		let rt = tokio::runtime::Runtime::new().unwrap();
		let response = rt.block_on(FileSource::request(&source, key));
		assert_eq!(response.data, Some(b"{}".to_vec()));
	}

	#[test]
	fn missing_asset_is_reported_as_not_found() {
		let dir = tempfile::tempdir().unwrap();
		let source = VectorSource::new(store(), dir.path().to_path_buf());
		let key = ResourceKey::new(ResourceKind::Style, "asset://missing.json", 1);

		let rt = tokio::runtime::Runtime::new().unwrap();
		let response = rt.block_on(FileSource::request(&source, key));
		assert!(!response.is_usable());
	}

	#[test]
	fn successful_fetch_is_cached_for_the_next_request() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("sprite.png"), [1, 2, 3]).unwrap();
		let shared_store = store();

		let source = VectorSource::new(Arc::clone(&shared_store), dir.path().to_path_buf());
		let key = ResourceKey::new(ResourceKind::Sprite, "asset://sprite.png", 2);

		let rt = tokio::runtime::Runtime::new().unwrap();
		let (first, cached) = rt.block_on(async {
			let first = FileSource::request(&source, key.clone()).await;
			let cached = shared_store.get(key.fingerprint()).await.unwrap();
			(first, cached)
		});
		assert!(first.is_usable());
		assert!(cached.is_some());
	}
}
