use std::net::SocketAddr;
use std::num::IntErrorKind;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::crossing;
use crate::db::MetricRepository;
use crate::error::{ApiError, ApiResult};
use crate::models::ArtistCrossings;
use crate::observe;

#[derive(Clone)]
pub struct AppState {
    repo: Arc<dyn MetricRepository>,
}

impl AppState {
    pub fn new(repo: Arc<dyn MetricRepository>) -> Self {
        Self { repo }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(ping).post(ping))
        .route("/metrics", get(metrics))
        .with_state(state)
}

pub async fn serve(listen: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;

    tracing::info!(%listen, "serving crossings");
    axum::serve(listener, build_router(state))
        .await
        .context("server failed")
}

async fn ping() -> &'static str {
    "Server is here"
}

async fn metrics(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<Vec<ArtistCrossings>>> {
    let threshold = parse_threshold(single_param(&pairs, "metric_value")?)?;

    let snapshot = state.repo.fetch_snapshot().await?;
    tracing::debug!(
        threshold,
        artists = snapshot.artists.len(),
        observations = snapshot.observations.len(),
        "snapshot loaded"
    );

    let crossings = observe::timed("detect_crossings", || {
        crossing::detect_snapshot(&snapshot, threshold)
    });
    Ok(Json(crossings))
}

/// Looks up a query parameter that may appear at most once.
fn single_param<'a>(pairs: &'a [(String, String)], name: &str) -> ApiResult<Option<&'a str>> {
    let mut values = pairs
        .iter()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.as_str());

    let first = values.next();
    if values.next().is_some() {
        return Err(ApiError::validation(format!("{name} must be given only once")));
    }
    Ok(first)
}

/// Validates the raw `metric_value` query parameter: present, integral and
/// non-negative.
pub fn parse_threshold(raw: Option<&str>) -> ApiResult<i64> {
    let raw = match raw.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(ApiError::validation("metric_value query parameter is required")),
    };

    let threshold: i64 = raw.parse().map_err(|err: std::num::ParseIntError| {
        let message = match err.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                format!("metric_value must be between 0 and {}", i64::MAX)
            }
            _ => "metric_value must be an integer".to_string(),
        };
        ApiError::validation(message).with_field("metric_value", raw)
    })?;

    if threshold < 0 {
        return Err(ApiError::validation("metric_value must be non-negative")
            .with_field("metric_value", threshold));
    }

    Ok(threshold)
}
