use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    routing::{get, patch, put},
};
use uuid::Uuid;

use crate::{
    dto::estimates::{
        CreateEstimateRequest, EstimateList, EstimateStats, UpdateEstimateRequest,
        UpdateEstimateStatusRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Estimate,
    response::ApiResponse,
    routes::params::EstimateListQuery,
    services::estimate_service::{self, MAX_PDF_BYTES},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_estimates).post(create_estimate))
        .route("/stats", get(estimate_stats))
        .route(
            "/{id}",
            get(get_estimate)
                .put(update_estimate)
                .delete(delete_estimate),
        )
        .route("/{id}/status", patch(update_status))
        .route(
            "/{id}/pdf",
            put(upload_pdf).layer(DefaultBodyLimit::max(MAX_PDF_BYTES)),
        )
}

#[utoipa::path(
    get,
    path = "/api/estimates",
    params(EstimateListQuery),
    responses(
        (status = 200, description = "List own estimates", body = ApiResponse<EstimateList>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Estimates"
)]
pub async fn list_estimates(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<EstimateListQuery>,
) -> AppResult<Json<ApiResponse<EstimateList>>> {
    let resp = estimate_service::list_estimates(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/estimates",
    request_body = CreateEstimateRequest,
    responses(
        (status = 201, description = "Create estimate, consuming one credit", body = ApiResponse<Estimate>),
        (status = 400, description = "Invalid line items or adjustments"),
        (status = 402, description = "No credits left"),
        (status = 403, description = "Theme requires a higher plan")
    ),
    security(("bearer_auth" = [])),
    tag = "Estimates"
)]
pub async fn create_estimate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateEstimateRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Estimate>>)> {
    let resp = estimate_service::create_estimate(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/estimates/stats",
    responses(
        (status = 200, description = "Dashboard counters", body = ApiResponse<EstimateStats>)
    ),
    security(("bearer_auth" = [])),
    tag = "Estimates"
)]
pub async fn estimate_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<EstimateStats>>> {
    let resp = estimate_service::estimate_stats(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/estimates/{id}",
    params(("id" = Uuid, Path, description = "Estimate ID")),
    responses(
        (status = 200, description = "Get own estimate", body = ApiResponse<Estimate>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Estimates"
)]
pub async fn get_estimate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Estimate>>> {
    let resp = estimate_service::get_estimate(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/estimates/{id}",
    params(("id" = Uuid, Path, description = "Estimate ID")),
    request_body = UpdateEstimateRequest,
    responses(
        (status = 200, description = "Update estimate and recompute totals", body = ApiResponse<Estimate>),
        (status = 400, description = "Invalid input or estimate already decided"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Estimates"
)]
pub async fn update_estimate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEstimateRequest>,
) -> AppResult<Json<ApiResponse<Estimate>>> {
    let resp = estimate_service::update_estimate(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/estimates/{id}/status",
    params(("id" = Uuid, Path, description = "Estimate ID")),
    request_body = UpdateEstimateStatusRequest,
    responses(
        (status = 200, description = "Move estimate through its lifecycle", body = ApiResponse<Estimate>),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Estimates"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEstimateStatusRequest>,
) -> AppResult<Json<ApiResponse<Estimate>>> {
    let resp = estimate_service::update_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/estimates/{id}",
    params(("id" = Uuid, Path, description = "Estimate ID")),
    responses(
        (status = 200, description = "Delete own estimate"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Estimates"
)]
pub async fn delete_estimate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = estimate_service::delete_estimate(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/estimates/{id}/pdf",
    params(("id" = Uuid, Path, description = "Estimate ID")),
    request_body(content = Vec<u8>, content_type = "application/pdf", description = "Rendered estimate, at most 10 MiB"),
    responses(
        (status = 200, description = "PDF stored and linked", body = ApiResponse<Estimate>),
        (status = 400, description = "Body is not a PDF"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Estimates"
)]
pub async fn upload_pdf(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Estimate>>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let resp = estimate_service::upload_pdf(&state, &user, id, content_type, body).await?;
    Ok(Json(resp))
}
