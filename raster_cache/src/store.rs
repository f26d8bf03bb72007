//! The persistent cache store: a dedicated thread owning a SQLite connection pool, serving
//! `get`/`put` requests off an inbox and evicting the oldest-accessed rows once the store
//! exceeds its configured byte budget (§4.C, §11).

use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use r2d2_sqlite::rusqlite::{OptionalExtension, params};
use raster_core::{CachedError, CachedResponse, ErrorKind, clock::now_ms};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

enum Message {
	Get { fingerprint: String, reply: tokio::sync::oneshot::Sender<Option<CachedResponse>> },
	Put { fingerprint: String, response: CachedResponse, reply: tokio::sync::oneshot::Sender<()> },
	Shutdown,
}

/// A handle to the running store thread. Dropping it (after calling [`CacheStore::shutdown`])
/// joins the worker.
pub struct CacheStore {
	inbox: Sender<Message>,
	worker: Option<JoinHandle<()>>,
}

impl CacheStore {
	/// Opens (creating if absent) a SQLite-backed store at `path`, budgeted to `max_bytes`.
	pub fn open(path: &std::path::Path, max_bytes: u64) -> Result<Self> {
		let manager = SqliteConnectionManager::file(path);
		let pool = Pool::builder()
			.max_size(4)
			.build(manager)
			.context("building sqlite connection pool")?;

		{
			let conn = pool.get().context("getting initial sqlite connection")?;
			conn.execute_batch(
				"CREATE TABLE IF NOT EXISTS resources (
					fingerprint     TEXT PRIMARY KEY,
					data            BLOB,
					etag            TEXT,
					modified_ms     INTEGER,
					expires_ms      INTEGER,
					must_revalidate INTEGER NOT NULL,
					no_content      INTEGER NOT NULL,
					error_kind      TEXT,
					error_message   TEXT,
					accessed_ms     INTEGER NOT NULL
				);
				CREATE INDEX IF NOT EXISTS resources_accessed_ms ON resources (accessed_ms);",
			)
			.context("creating cache schema")?;
		}

		let (inbox, rx) = mpsc::channel();
		let worker = std::thread::Builder::new()
			.name("raster-cache-store".into())
			.spawn(move || run(pool, max_bytes, rx))
			.context("spawning cache store thread")?;

		Ok(CacheStore { inbox, worker: Some(worker) })
	}

	pub async fn get(&self, fingerprint: String) -> Result<Option<CachedResponse>> {
		let (reply, rx) = tokio::sync::oneshot::channel();
		self.inbox
			.send(Message::Get { fingerprint, reply })
			.map_err(|_| anyhow::anyhow!("cache store thread is gone"))?;
		rx.await.context("cache store dropped the reply channel")
	}

	pub async fn put(&self, fingerprint: String, response: CachedResponse) -> Result<()> {
		let (reply, rx) = tokio::sync::oneshot::channel();
		self.inbox
			.send(Message::Put { fingerprint, response, reply })
			.map_err(|_| anyhow::anyhow!("cache store thread is gone"))?;
		rx.await.context("cache store dropped the reply channel")
	}

	pub fn shutdown(&mut self) {
		let _ = self.inbox.send(Message::Shutdown);
		if let Some(worker) = self.worker.take() {
			let _ = worker.join();
		}
	}
}

impl Drop for CacheStore {
	fn drop(&mut self) {
		self.shutdown();
	}
}

fn run(pool: Pool<SqliteConnectionManager>, max_bytes: u64, rx: Receiver<Message>) {
	for message in rx.iter() {
		match message {
			Message::Get { fingerprint, reply } => {
				let result = get_one(&pool, &fingerprint);
				let response = match result {
					Ok(response) => response,
					Err(err) => {
						log::warn!("cache read failed for {fingerprint}: {err:#}");
						Some(CachedResponse::io_error(err.to_string()))
					}
				};
				let _ = reply.send(response);
			}
			Message::Put { fingerprint, response, reply } => {
				if let Err(err) = put_one(&pool, &max_bytes, &fingerprint, &response) {
					log::warn!("cache write failed for {fingerprint}: {err:#}");
				}
				let _ = reply.send(());
			}
			Message::Shutdown => break,
		}
	}
}

fn get_one(pool: &Pool<SqliteConnectionManager>, fingerprint: &str) -> Result<Option<CachedResponse>> {
	let conn = pool.get().context("getting sqlite connection")?;
	let row = conn
		.query_row(
			"SELECT data, etag, modified_ms, expires_ms, must_revalidate, no_content, error_kind, error_message
			 FROM resources WHERE fingerprint = ?1",
			params![fingerprint],
			|row| {
				Ok((
					row.get::<_, Option<Vec<u8>>>(0)?,
					row.get::<_, Option<String>>(1)?,
					row.get::<_, Option<i64>>(2)?,
					row.get::<_, Option<i64>>(3)?,
					row.get::<_, bool>(4)?,
					row.get::<_, bool>(5)?,
					row.get::<_, Option<String>>(6)?,
					row.get::<_, Option<String>>(7)?,
				))
			},
		)
		.optional()
		.context("querying cached resource")?;

	let Some((data, etag, modified_ms, expires_ms, must_revalidate, no_content, error_kind, error_message)) = row
	else {
		return Ok(None);
	};

	conn.execute(
		"UPDATE resources SET accessed_ms = ?1 WHERE fingerprint = ?2",
		params![now_ms(), fingerprint],
	)
	.context("touching accessed_ms")?;

	let error = error_kind.map(|kind| CachedError {
		kind: match kind.as_str() {
			"corrupted" => ErrorKind::Corrupted,
			"io_error" => ErrorKind::IoError,
			_ => ErrorKind::NotFound,
		},
		message: error_message.unwrap_or_default(),
	});

	Ok(Some(CachedResponse {
		data,
		etag,
		modified_ms,
		expires_ms,
		must_revalidate,
		no_content,
		error,
		prior_etag: None,
		prior_modified_ms: None,
		prior_expires_ms: None,
		prior_data: None,
	}))
}

fn put_one(
	pool: &Pool<SqliteConnectionManager>,
	max_bytes: &u64,
	fingerprint: &str,
	response: &CachedResponse,
) -> Result<()> {
	let mut conn = pool.get().context("getting sqlite connection")?;
	let error_kind = response.error.as_ref().map(|e| match e.kind {
		ErrorKind::NotFound => "not_found",
		ErrorKind::Corrupted => "corrupted",
		ErrorKind::IoError => "io_error",
	});
	let error_message = response.error.as_ref().map(|e| e.message.as_str());

	let tx = conn.transaction().context("opening write transaction")?;
	tx.execute(
		"INSERT INTO resources
			(fingerprint, data, etag, modified_ms, expires_ms, must_revalidate, no_content, error_kind, error_message, accessed_ms)
		 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
		 ON CONFLICT(fingerprint) DO UPDATE SET
			data = excluded.data, etag = excluded.etag, modified_ms = excluded.modified_ms,
			expires_ms = excluded.expires_ms, must_revalidate = excluded.must_revalidate,
			no_content = excluded.no_content, error_kind = excluded.error_kind,
			error_message = excluded.error_message, accessed_ms = excluded.accessed_ms",
		params![
			fingerprint,
			response.data,
			response.etag,
			response.modified_ms,
			response.expires_ms,
			response.must_revalidate,
			response.no_content,
			error_kind,
			error_message,
			now_ms(),
		],
	)
	.context("upserting cached resource")?;
	tx.commit().context("committing write transaction")?;

	evict_if_over_budget(&conn, *max_bytes)
}

/// Deletes the least-recently-accessed rows until the store's total blob size is back within
/// `max_bytes`. A `max_bytes` of `0` disables eviction entirely.
fn evict_if_over_budget(conn: &r2d2::PooledConnection<SqliteConnectionManager>, max_bytes: u64) -> Result<()> {
	if max_bytes == 0 {
		return Ok(());
	}

	loop {
		let total: i64 = conn
			.query_row("SELECT COALESCE(SUM(LENGTH(data)), 0) FROM resources", [], |row| row.get(0))
			.context("measuring cache size")?;
		if total as u64 <= max_bytes {
			return Ok(());
		}

		let evicted = conn
			.execute(
				"DELETE FROM resources WHERE fingerprint IN (
					SELECT fingerprint FROM resources ORDER BY accessed_ms ASC LIMIT 16
				)",
				[],
			)
			.context("evicting stale cache entries")?;
		if evicted == 0 {
			// Nothing left to evict but still over budget: a single resource exceeds the
			// whole cache. Nothing more we can do.
			return Ok(());
		}
	}
}
