use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::templates::{CreateTemplateRequest, TemplateList, UpdateTemplateRequest},
    error::AppResult,
    middleware::auth::{AuthUser, MaybeAuthUser},
    models::EstimateTemplate,
    response::ApiResponse,
    routes::params::TemplateListQuery,
    services::template_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route(
            "/{id}",
            get(get_template)
                .put(update_template)
                .delete(delete_template),
        )
}

#[utoipa::path(
    get,
    path = "/api/templates",
    params(TemplateListQuery),
    responses(
        (status = 200, description = "List estimate themes", body = ApiResponse<TemplateList>)
    ),
    security((), ("bearer_auth" = [])),
    tag = "Templates"
)]
pub async fn list_templates(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Query(query): Query<TemplateListQuery>,
) -> AppResult<Json<ApiResponse<TemplateList>>> {
    let resp = template_service::list_templates(&state, caller.as_ref(), query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/templates/{id}",
    params(("id" = Uuid, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Get estimate theme", body = ApiResponse<EstimateTemplate>),
        (status = 404, description = "Not Found")
    ),
    security(()),
    tag = "Templates"
)]
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<EstimateTemplate>>> {
    let resp = template_service::get_template(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/templates",
    request_body = CreateTemplateRequest,
    responses(
        (status = 201, description = "Create estimate theme (admin only)", body = ApiResponse<EstimateTemplate>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Theme key already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Templates"
)]
pub async fn create_template(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTemplateRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<EstimateTemplate>>)> {
    let resp = template_service::create_template(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/templates/{id}",
    params(("id" = Uuid, Path, description = "Template ID")),
    request_body = UpdateTemplateRequest,
    responses(
        (status = 200, description = "Update estimate theme (admin only)", body = ApiResponse<EstimateTemplate>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Theme key already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Templates"
)]
pub async fn update_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTemplateRequest>,
) -> AppResult<Json<ApiResponse<EstimateTemplate>>> {
    let resp = template_service::update_template(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/templates/{id}",
    params(("id" = Uuid, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Delete estimate theme (admin only)"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Templates"
)]
pub async fn delete_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = template_service::delete_template(&state, &user, id).await?;
    Ok(Json(resp))
}
