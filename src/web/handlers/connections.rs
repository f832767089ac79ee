//! Connection handlers for Web API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::store::{CloneConnection, NewConnection};
use crate::web::dto::{
    ApiResponse, CloneConnectionRequest, ConnectionResponse, CreateConnectionRequest,
    UpdateConnectionRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /api/feeds/:feed_id/connections - List the connections of a feed.
pub async fn list_connections(
    State(state): State<Arc<AppState>>,
    Path(feed_id): Path<String>,
) -> Json<ApiResponse<Vec<ConnectionResponse>>> {
    let connections = state.connections.list_by_feed(&feed_id).await;
    Json(ApiResponse::new(
        connections.into_iter().map(ConnectionResponse::from).collect(),
    ))
}

/// POST /api/feeds/:feed_id/connections - Create a connection.
pub async fn create_connection(
    State(state): State<Arc<AppState>>,
    Path(feed_id): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateConnectionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ConnectionResponse>>), ApiError> {
    let target = req
        .target()
        .ok_or_else(|| ApiError::unprocessable("Exactly one of channelId and webhook is required"))?;

    let connection = state
        .connections
        .create(NewConnection::new(feed_id, req.name, target))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ConnectionResponse::from(connection))),
    ))
}

/// GET /api/feeds/:feed_id/connections/:id - Get a connection.
pub async fn get_connection(
    State(state): State<Arc<AppState>>,
    Path((feed_id, id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<ConnectionResponse>>, ApiError> {
    let connection = state.connections.get(&feed_id, &id).await?;
    Ok(Json(ApiResponse::new(ConnectionResponse::from(connection))))
}

/// PATCH /api/feeds/:feed_id/connections/:id - Rename or retarget a connection.
pub async fn update_connection(
    State(state): State<Arc<AppState>>,
    Path((feed_id, id)): Path<(String, String)>,
    ValidatedJson(req): ValidatedJson<UpdateConnectionRequest>,
) -> Result<Json<ApiResponse<ConnectionResponse>>, ApiError> {
    let connection = state
        .connections
        .update(&feed_id, &id, req.into_update())
        .await?;
    Ok(Json(ApiResponse::new(ConnectionResponse::from(connection))))
}

/// DELETE /api/feeds/:feed_id/connections/:id - Delete a connection.
pub async fn delete_connection(
    State(state): State<Arc<AppState>>,
    Path((feed_id, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.connections.delete(&feed_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/feeds/:feed_id/connections/:id/clone - Clone a connection.
pub async fn clone_connection(
    State(state): State<Arc<AppState>>,
    Path((feed_id, id)): Path<(String, String)>,
    ValidatedJson(req): ValidatedJson<CloneConnectionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ConnectionResponse>>), ApiError> {
    let copy = state
        .connections
        .clone_connection(
            &feed_id,
            &id,
            CloneConnection {
                name: req.name,
                channel_id: req.channel_id.map(|c| c.trim().to_string()),
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ConnectionResponse::from(copy))),
    ))
}
