//! Definition save handlers for Web API.
//!
//! Both endpoints replace the whole list. Field-level problems come back as
//! a 422 with `details` keyed by field path, and nothing is stored.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::web::dto::{
    ApiResponse, ConnectionResponse, SaveCustomPlaceholdersRequest,
    SaveExternalPropertiesRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// PUT /api/feeds/:feed_id/connections/:id/custom-placeholders
pub async fn save_custom_placeholders(
    State(state): State<Arc<AppState>>,
    Path((feed_id, id)): Path<(String, String)>,
    ValidatedJson(req): ValidatedJson<SaveCustomPlaceholdersRequest>,
) -> Result<Json<ApiResponse<ConnectionResponse>>, ApiError> {
    let connection = state
        .connections
        .save_custom_placeholders(&feed_id, &id, req.custom_placeholders)
        .await?;
    Ok(Json(ApiResponse::new(ConnectionResponse::from(connection))))
}

/// PUT /api/feeds/:feed_id/connections/:id/external-properties
pub async fn save_external_properties(
    State(state): State<Arc<AppState>>,
    Path((feed_id, id)): Path<(String, String)>,
    ValidatedJson(req): ValidatedJson<SaveExternalPropertiesRequest>,
) -> Result<Json<ApiResponse<ConnectionResponse>>, ApiError> {
    let connection = state
        .connections
        .save_external_properties(&feed_id, &id, req.external_properties)
        .await?;
    Ok(Json(ApiResponse::new(ConnectionResponse::from(connection))))
}
