use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        payments::TransactionList,
        users::{GrantCreditsRequest, UserList},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::UserProfile,
    response::ApiResponse,
    routes::params::{TransactionListQuery, UserListQuery},
    services::{payment_service, user_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}/credits", post(grant_credits))
        .route("/transactions", get(list_all_transactions))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "List studios (admin only)", body = ApiResponse<UserList>),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = user_service::list_users(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/credits",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = GrantCreditsRequest,
    responses(
        (status = 200, description = "Grant credits (admin only)", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid amount"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn grant_credits(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<GrantCreditsRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = user_service::grant_credits(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/transactions",
    params(TransactionListQuery),
    responses(
        (status = 200, description = "All payment transactions (admin only)", body = ApiResponse<TransactionList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TransactionListQuery>,
) -> AppResult<Json<ApiResponse<TransactionList>>> {
    let resp = payment_service::list_all_transactions(&state, &user, query).await?;
    Ok(Json(resp))
}
