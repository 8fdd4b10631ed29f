use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::estimates::SharedEstimate, error::AppResult, response::ApiResponse,
    services::estimate_service, state::AppState,
};

/// Client-facing share links; no authentication.
pub fn router() -> Router<AppState> {
    Router::new().route("/estimates/{id}", get(shared_estimate))
}

#[utoipa::path(
    get,
    path = "/api/public/estimates/{id}",
    params(("id" = Uuid, Path, description = "Estimate ID")),
    responses(
        (status = 200, description = "Estimate with studio branding", body = ApiResponse<SharedEstimate>),
        (status = 404, description = "Not Found or still a draft")
    ),
    security(()),
    tag = "Public"
)]
pub async fn shared_estimate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SharedEstimate>>> {
    let resp = estimate_service::get_shared_estimate(&state, id).await?;
    Ok(Json(resp))
}
