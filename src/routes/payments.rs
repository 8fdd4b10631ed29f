use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::payments::{
        CreateOrderRequest, CreateOrderResponse, PlanCatalog, TransactionList,
        VerifyPaymentRequest, VerifyPaymentResponse,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::TransactionListQuery,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/order", post(create_order))
        .route("/verify", post(verify_payment))
        .route("/transactions", get(list_transactions))
}

#[utoipa::path(
    get,
    path = "/api/payments/plans",
    responses(
        (status = 200, description = "Plans and top-up packs with prices in paise", body = ApiResponse<PlanCatalog>)
    ),
    security(()),
    tag = "Payments"
)]
pub async fn list_plans() -> Json<ApiResponse<PlanCatalog>> {
    Json(payment_service::list_plans())
}

#[utoipa::path(
    post,
    path = "/api/payments/order",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Gateway order opened", body = ApiResponse<CreateOrderResponse>),
        (status = 400, description = "Plan cannot be purchased"),
        (status = 502, description = "Payment gateway error")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreateOrderResponse>>)> {
    let resp = payment_service::create_order(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified and credits applied", body = ApiResponse<VerifyPaymentResponse>),
        (status = 400, description = "Signature mismatch"),
        (status = 404, description = "Unknown order"),
        (status = 409, description = "Already verified")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VerifyPaymentRequest>,
) -> AppResult<Json<ApiResponse<VerifyPaymentResponse>>> {
    let resp = payment_service::verify_payment(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/transactions",
    params(TransactionListQuery),
    responses(
        (status = 200, description = "Own payment history", body = ApiResponse<TransactionList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TransactionListQuery>,
) -> AppResult<Json<ApiResponse<TransactionList>>> {
    let resp = payment_service::list_transactions(&state, &user, query).await?;
    Ok(Json(resp))
}
