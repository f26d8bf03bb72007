//! Millisecond-resolution epoch timestamps, used throughout the cache layer so that
//! `CachedResponse` metadata round-trips cleanly through SQLite integer columns.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_ms() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("system clock is before the Unix epoch")
		.as_millis() as i64
}

pub const HOUR_MS: i64 = 3_600_000;
