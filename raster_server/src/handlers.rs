//! HTTP surface (§6): tile bytes, a `/stats` snapshot (matched by substring, not exact path,
//! per the reference), and a `/healthz` liveness probe.

use crate::stats::StatsAggregator;
use crate::state::AppState;
use axum::extract::{OriginalUri, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use raster_core::TileId;
use std::sync::Arc;

pub async fn tile_or_stats(State(state): State<Arc<AppState>>, OriginalUri(uri): OriginalUri) -> Response {
	let raw = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or(uri.path());

	if raw.contains("/stats") {
		return stats(state).await;
	}

	tile(state, raw).await
}

async fn tile(state: Arc<AppState>, raw: &str) -> Response {
	let Some(id) = TileId::parse(raw) else {
		return (StatusCode::NOT_FOUND, "Not Found: Bad Tile Address").into_response();
	};

	let loader = state.next_loader();
	match loader.load(id.clone()).await {
		Ok(tile) => {
			([(header::CONTENT_TYPE, id.format.mime_type())], tile.data).into_response()
		}
		Err(err) => {
			log::warn!("render failed for {}: {err}", id.to_path());
			(StatusCode::INTERNAL_SERVER_ERROR, "Internal Render Error").into_response()
		}
	}
}

async fn stats(state: Arc<AppState>) -> Response {
	let aggregator = StatsAggregator::new(state.name.clone(), state.start_time_ms, state.workers.clone());
	let body = aggregator.snapshot().to_string();
	([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

pub async fn healthz() -> &'static str {
	"ready"
}
