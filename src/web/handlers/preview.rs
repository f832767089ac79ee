//! Preview handler for Web API.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::preview::{PreviewInput, PreviewOutput};
use crate::web::dto::{ApiResponse, PreviewRequest, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// POST /api/feeds/:feed_id/connections/:id/preview - Preview a connection.
///
/// Returns 409 when a newer preview of the same session superseded this one.
pub async fn preview_connection(
    State(state): State<Arc<AppState>>,
    Path((feed_id, id)): Path<(String, String)>,
    ValidatedJson(req): ValidatedJson<PreviewRequest>,
) -> Result<Json<ApiResponse<PreviewOutput>>, ApiError> {
    let input = PreviewInput {
        article_id: req.article_id,
        custom_placeholders: req.custom_placeholders,
        external_properties: req.external_properties,
        select_properties: req.select_properties,
        random: req.random,
        session_id: req.session_id,
        template: req.template,
    };

    let output = state.preview.preview(&feed_id, &id, input).await?;
    Ok(Json(ApiResponse::new(output)))
}
