//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{
    domain::{Coordinates, DEFAULT_RADIUS_METERS},
    infrastructure::dto::http::{NearbyPresenceDto, NearbyQuery, PresenceDto, PresenceListDto},
    ui::state::AppState,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Current registry snapshot
pub async fn get_presence(State(state): State<Arc<AppState>>) -> Json<PresenceListDto> {
    let records = state.get_presence_usecase.snapshot().await;

    // Domain Model から DTO への変換
    Json(PresenceListDto {
        online: state.connect_session_usecase.online_count().await,
        located: state.get_presence_usecase.located().await,
        users: records.iter().map(PresenceDto::from).collect(),
    })
}

/// Registry entries within `radius` meters of (`lat`, `lng`), nearest first
pub async fn get_nearby_presence(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbyPresenceDto>>, StatusCode> {
    let center = Coordinates::new(query.lat, query.lng).map_err(|e| {
        tracing::warn!("Rejecting nearby query: {}", e);
        StatusCode::BAD_REQUEST
    })?;
    let radius = query.radius.unwrap_or(DEFAULT_RADIUS_METERS);
    if !radius.is_finite() || radius < 0.0 {
        tracing::warn!("Rejecting nearby query: invalid radius {}", radius);
        return Err(StatusCode::BAD_REQUEST);
    }

    let nearby = state.get_presence_usecase.nearby(&center, radius).await;

    Ok(Json(
        nearby
            .iter()
            .map(|n| NearbyPresenceDto {
                presence: PresenceDto::from(&n.record),
                distance_meters: n.distance_meters,
            })
            .collect(),
    ))
}
