//! The value stored in and retrieved from the persistent cache store (§3, §4.C).

use crate::clock::now_ms;

/// The reason a cached resource could not be returned as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
	NotFound,
	Corrupted,
	IoError,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedError {
	pub kind: ErrorKind,
	pub message: String,
}

impl CachedError {
	pub fn not_found(message: impl Into<String>) -> Self {
		CachedError { kind: ErrorKind::NotFound, message: message.into() }
	}
}

/// A resource as stored in (or synthesized for) the cache.
///
/// Invariant: at least one of `data`, `no_content`, `error` is set. Constructors enforce this;
/// there is no public way to build an all-`None`/`false` response.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedResponse {
	pub data: Option<Vec<u8>>,
	pub etag: Option<String>,
	pub modified_ms: Option<i64>,
	pub expires_ms: Option<i64>,
	pub must_revalidate: bool,
	pub no_content: bool,
	pub error: Option<CachedError>,

	/// Fields copied over from a prior (stale or absent) cache entry so that an upstream
	/// fetch can make a conditional request. Not persisted; attached by `RasterCache`/
	/// `VectorSource` when returning a synthesized NotFound (§4.D).
	pub prior_etag: Option<String>,
	pub prior_modified_ms: Option<i64>,
	pub prior_expires_ms: Option<i64>,
	pub prior_data: Option<Vec<u8>>,
}

impl CachedResponse {
	pub fn with_data(data: Vec<u8>) -> Self {
		CachedResponse { data: Some(data), ..Self::empty() }
	}

	pub fn not_found(message: impl Into<String>) -> Self {
		CachedResponse {
			no_content: true,
			error: Some(CachedError::not_found(message)),
			..Self::empty()
		}
	}

	pub fn io_error(message: impl Into<String>) -> Self {
		CachedResponse {
			no_content: true,
			error: Some(CachedError { kind: ErrorKind::IoError, message: message.into() }),
			..Self::empty()
		}
	}

	fn empty() -> Self {
		CachedResponse {
			data: None,
			etag: None,
			modified_ms: None,
			expires_ms: None,
			must_revalidate: false,
			no_content: false,
			error: None,
			prior_etag: None,
			prior_modified_ms: None,
			prior_expires_ms: None,
			prior_data: None,
		}
	}

	/// Copies `modified`/`expires`/`etag`/`data` onto the `prior_*` fields, for conditional
	/// revalidation of the *next* upstream fetch (§4.D).
	pub fn carry_prior_fields(mut self) -> Self {
		self.prior_etag = self.etag.clone();
		self.prior_modified_ms = self.modified_ms;
		self.prior_expires_ms = self.expires_ms;
		self.prior_data = self.data.clone();
		self
	}

	/// `true` iff this response has no error and has not expired under `must_revalidate`.
	pub fn is_usable(&self) -> bool {
		if self.error.is_some() {
			return false;
		}
		match self.expires_ms {
			None => true,
			Some(expires) => expires > now_ms() || !self.must_revalidate,
		}
	}

	/// The number of bytes this response contributes to the cache's size budget (§4.C).
	pub fn data_len(&self) -> usize {
		self.data.as_ref().map_or(0, Vec::len)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clock::HOUR_MS;

	#[test]
	fn fresh_data_is_usable() {
		let resp = CachedResponse::with_data(vec![1, 2, 3]);
		assert!(resp.is_usable());
	}

	#[test]
	fn errored_responses_are_never_usable() {
		let resp = CachedResponse::not_found("missing");
		assert!(!resp.is_usable());
	}

	#[test]
	fn expired_with_must_revalidate_is_unusable() {
		let mut resp = CachedResponse::with_data(vec![1]);
		resp.expires_ms = Some(now_ms() - HOUR_MS);
		resp.must_revalidate = true;
		assert!(!resp.is_usable());
	}

	#[test]
	fn expired_without_must_revalidate_is_still_usable() {
		let mut resp = CachedResponse::with_data(vec![1]);
		resp.expires_ms = Some(now_ms() - HOUR_MS);
		resp.must_revalidate = false;
		assert!(resp.is_usable());
	}

	#[test]
	fn carrying_prior_fields_preserves_the_original_data() {
		let mut resp = CachedResponse::with_data(vec![9, 9]);
		resp.etag = Some("abc".into());
		let carried = resp.carry_prior_fields();
		assert_eq!(carried.prior_etag.as_deref(), Some("abc"));
		assert_eq!(carried.prior_data, Some(vec![9, 9]));
	}
}
