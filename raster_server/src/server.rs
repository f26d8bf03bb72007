//! Server lifecycle: router assembly, binding, and graceful shutdown (§5, §6).
//!
//! Mirrors the teacher's `TileServer::start`/`stop` shape (an owned exit signal plus a
//! joined task handle) but keeps it to the one surface this domain needs: tile bytes, the
//! `/stats` snapshot, and a `/healthz` probe.

use crate::handlers::{healthz, tile_or_stats};
use crate::state::AppState;
use anyhow::Result;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;

const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct Server {
	bind: String,
	port: u16,
	state: Arc<AppState>,
	exit_signal: Option<oneshot::Sender<()>>,
	join: Option<tokio::task::JoinHandle<()>>,
}

impl Server {
	pub fn new(bind: String, port: u16, state: Arc<AppState>) -> Self {
		Server { bind, port, state, exit_signal: None, join: None }
	}

	/// Binds the listening socket and spawns the serving task. Idempotent: starting an
	/// already-running server stops the previous instance first.
	pub async fn start(&mut self) -> Result<()> {
		if self.exit_signal.is_some() {
			self.stop().await;
		}

		let router = Router::new()
			.route("/healthz", get(healthz))
			.fallback(tile_or_stats)
			.with_state(self.state.clone())
			.layer(ServiceBuilder::new().layer(CatchPanicLayer::new()).layer(TimeoutLayer::new(IDLE_TIMEOUT)));

		let addr = format!("{}:{}", self.bind, self.port);
		let listener = TcpListener::bind(&addr).await?;
		if self.port == 0 {
			self.port = listener.local_addr()?.port();
		}
		log::info!("listening on {}:{}", self.bind, self.port);

		let (tx, rx) = oneshot::channel::<()>();
		let handle = tokio::spawn(async move {
			if let Err(err) =
				axum::serve(listener, router.into_make_service()).with_graceful_shutdown(async { rx.await.ok(); }).await
			{
				log::error!("server task exited with error: {err}");
			}
		});

		self.exit_signal = Some(tx);
		self.join = Some(handle);
		Ok(())
	}

	/// Signals graceful shutdown and waits for in-flight requests to finish. Idempotent.
	pub async fn stop(&mut self) {
		if let Some(tx) = self.exit_signal.take() {
			let _ = tx.send(());
		}
		if let Some(handle) = self.join.take() {
			let _ = handle.await;
		}
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	/// Blocks until a SIGINT or SIGTERM arrives, then triggers a graceful shutdown (§6).
	pub async fn run_until_signal(&mut self) -> Result<()> {
		self.start().await?;
		wait_for_shutdown_signal().await;
		self.stop().await;
		Ok(())
	}
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
	use tokio::signal::unix::{SignalKind, signal};

	let mut sigterm = signal(SignalKind::terminate()).expect("installing SIGTERM handler");
	tokio::select! {
		_ = tokio::signal::ctrl_c() => {}
		_ = sigterm.recv() => {}
	}
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
	let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{Cli, Config};
	use clap::Parser;

	async fn test_state() -> Arc<AppState> {
		let dir = tempfile::tempdir().unwrap();
		let mut cli = Cli::parse_from(["raster-server", "--style", "style.json"]);
		cli.raster_cache = dir.path().join("raster.sqlite");
		cli.vector_cache = dir.path().join("vector.sqlite");
		cli.server_threads = 1;
		cli.tile_size = 256;
		let config = Config::from_cli(cli).unwrap();
		AppState::bootstrap(&config).unwrap()
	}

	/// S5: once the raster cache is over budget, the earliest tile is evicted and a later
	/// request for it re-renders rather than serving a stale hit.
	#[tokio::test]
	async fn evicted_tile_is_re_rendered_on_the_next_request() {
		let dir = tempfile::tempdir().unwrap();
		let mut cli = Cli::parse_from(["raster-server", "--style", "style.json"]);
		cli.raster_cache = dir.path().join("raster.sqlite");
		cli.vector_cache = dir.path().join("vector.sqlite");
		cli.server_threads = 1;
		cli.tile_size = 256;
		cli.raster_cache_limit = 1;
		let config = Config::from_cli(cli).unwrap();
		let mut server = Server::new("127.0.0.1".into(), 0, AppState::bootstrap(&config).unwrap());
		server.start().await.unwrap();
		let port = server.port();

		for (x, y) in [(0u64, 0u64), (1, 0), (0, 1), (1, 1), (2, 0), (2, 1), (2, 2)] {
			reqwest::get(format!("http://127.0.0.1:{port}/default/2/{x}/{y}.png")).await.unwrap();
			tokio::time::sleep(std::time::Duration::from_millis(20)).await;
		}

		let stats: serde_json::Value =
			reqwest::get(format!("http://127.0.0.1:{port}/stats")).await.unwrap().json().await.unwrap();
		let count_before = stats["renderers"][0]["count"].as_u64().unwrap();

		// The earliest tile should have been evicted by now; requesting it again re-renders.
		reqwest::get(format!("http://127.0.0.1:{port}/default/2/0/0.png")).await.unwrap();

		let stats: serde_json::Value =
			reqwest::get(format!("http://127.0.0.1:{port}/stats")).await.unwrap().json().await.unwrap();
		let count_after = stats["renderers"][0]["count"].as_u64().unwrap();
		assert_eq!(count_after, count_before + 1);

		server.stop().await;
	}

	#[tokio::test]
	async fn serves_a_tile_and_shuts_down_cleanly() {
		let mut server = Server::new("127.0.0.1".into(), 0, test_state().await);
		server.start().await.unwrap();
		let port = server.port();

		let body = reqwest::get(format!("http://127.0.0.1:{port}/osm/3/1/2.png"))
			.await
			.unwrap()
			.bytes()
			.await
			.unwrap();
		assert_eq!(&body[0..8], b"\x89PNG\r\n\x1a\n");

		server.stop().await;
		server.stop().await;
	}

	#[tokio::test]
	async fn healthz_is_reachable() {
		let mut server = Server::new("127.0.0.1".into(), 0, test_state().await);
		server.start().await.unwrap();
		let port = server.port();

		let body = reqwest::get(format!("http://127.0.0.1:{port}/healthz")).await.unwrap().text().await.unwrap();
		assert_eq!(body, "ready");

		server.stop().await;
	}

	/// S1: repeat requests for the same tile hit the cache, not the renderer.
	#[tokio::test]
	async fn repeat_request_is_served_from_cache_not_re_rendered() {
		let mut server = Server::new("127.0.0.1".into(), 0, test_state().await);
		server.start().await.unwrap();
		let port = server.port();
		let url = format!("http://127.0.0.1:{port}/default/0/0/0.png");

		let first = reqwest::get(&url).await.unwrap();
		assert_eq!(first.status(), 200);
		let first_body = first.bytes().await.unwrap();
		assert!(!first_body.is_empty());

		// give the fire-and-forget cache write a chance to land
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;

		let second = reqwest::get(&url).await.unwrap();
		assert_eq!(second.status(), 200);
		assert_eq!(second.bytes().await.unwrap(), first_body);

		let stats: serde_json::Value =
			reqwest::get(format!("http://127.0.0.1:{port}/stats")).await.unwrap().json().await.unwrap();
		assert_eq!(stats["renderers"][0]["count"], 1);

		server.stop().await;
	}

	/// S2: two distinct tiles requested concurrently both succeed; the arbiter serializes the
	/// underlying renders but never blocks either request from completing.
	#[tokio::test]
	async fn concurrent_requests_for_distinct_tiles_both_succeed() {
		let mut server = Server::new("127.0.0.1".into(), 0, test_state().await);
		server.start().await.unwrap();
		let port = server.port();

		let (a, b) = tokio::join!(
			reqwest::get(format!("http://127.0.0.1:{port}/default/3/2/1.png")),
			reqwest::get(format!("http://127.0.0.1:{port}/default/3/5/2.png")),
		);
		assert_eq!(a.unwrap().status(), 200);
		assert_eq!(b.unwrap().status(), 200);

		server.stop().await;
	}

	/// S3: an address matching neither accepted URL shape is a 404 with the exact body text.
	#[tokio::test]
	async fn bogus_path_is_a_404_with_the_expected_body() {
		let mut server = Server::new("127.0.0.1".into(), 0, test_state().await);
		server.start().await.unwrap();
		let port = server.port();

		let response = reqwest::get(format!("http://127.0.0.1:{port}/bogus-path")).await.unwrap();
		assert_eq!(response.status(), 404);
		assert_eq!(response.text().await.unwrap(), "Not Found: Bad Tile Address");

		server.stop().await;
	}

	/// S4: the query-string URL shape addresses the same tile (and cache key) as the equivalent
	/// path shape.
	#[tokio::test]
	async fn query_shape_and_path_shape_address_the_same_tile() {
		let mut server = Server::new("127.0.0.1".into(), 0, test_state().await);
		server.start().await.unwrap();
		let port = server.port();

		let from_query =
			reqwest::get(format!("http://127.0.0.1:{port}/default?x=3&y=4&z=5")).await.unwrap().bytes().await.unwrap();
		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
		let from_path =
			reqwest::get(format!("http://127.0.0.1:{port}/default/5/3/4.png")).await.unwrap().bytes().await.unwrap();
		assert_eq!(from_query, from_path);

		server.stop().await;
	}

	/// S6: `/stats` reports the configured name and a renderer entry once a request has landed.
	#[tokio::test]
	async fn stats_reports_the_configured_name_and_a_render_count() {
		let mut server = Server::new("127.0.0.1".into(), 0, test_state().await);
		server.start().await.unwrap();
		let port = server.port();

		reqwest::get(format!("http://127.0.0.1:{port}/default/0/0/0.png")).await.unwrap();

		let stats: serde_json::Value =
			reqwest::get(format!("http://127.0.0.1:{port}/stats")).await.unwrap().json().await.unwrap();
		assert_eq!(stats["name"], "Raster Render Server");
		assert_eq!(stats["renderers"][0]["count"], 1);

		server.stop().await;
	}
}
