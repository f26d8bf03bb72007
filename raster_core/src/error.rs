//! The error taxonomy shared across the tile production pipeline (cache, render, HTTP).
//!
//! Internal functions return `anyhow::Result<T>` for context-chaining, same as the rest of
//! this workspace; `TileError` is the small set of variants that call sites actually need to
//! branch on (e.g. to decide an HTTP status code).

use thiserror::Error;

/// The taxonomy a request handler needs to distinguish in order to pick an HTTP response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TileError {
	#[error("bad tile address")]
	Parse,

	#[error("not in cache")]
	NotInCache,

	#[error("cache I/O error: {0}")]
	CacheIoError(String),

	#[error("render error: {0}")]
	RenderError(String),

	#[error("encode error: {0}")]
	EncodeError(String),

	#[error("config error: {0}")]
	ConfigError(String),
}

impl TileError {
	/// `true` for the one variant the loader must treat as "render it" rather than as a failure.
	pub fn is_not_in_cache(&self) -> bool {
		matches!(self, TileError::NotInCache)
	}
}
