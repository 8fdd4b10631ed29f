//! Requests that are answered without touching the database.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use quotekaro_api::{app::build_app, services::auth_service::issue_token};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

async fn send(request: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let app = build_app(common::offline_state()?)?;
    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

#[tokio::test]
async fn unknown_route_gets_json_404() -> anyhow::Result<()> {
    let (status, body) = send(Request::get("/api/nope").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");
    assert_eq!(body["data"]["path"], "/api/nope");
    Ok(())
}

#[tokio::test]
async fn health_sets_request_id() -> anyhow::Result<()> {
    let app = build_app(common::offline_state()?)?;
    let response = app
        .oneshot(Request::get("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}

#[tokio::test]
async fn protected_route_requires_bearer() -> anyhow::Result<()> {
    let (status, body) = send(Request::get("/api/users/me").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["data"]["error"].as_str().is_some());
    Ok(())
}

#[tokio::test]
async fn token_signed_with_other_secret_is_rejected() -> anyhow::Result<()> {
    let token = issue_token(Uuid::new_v4(), "user", "some-other-secret")?;
    let (status, _) = send(
        Request::get("/api/estimates")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())?,
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn bad_payment_signature_is_rejected_before_lookup() -> anyhow::Result<()> {
    let token = issue_token(Uuid::new_v4(), "user", common::JWT_SECRET)?;
    let payload = serde_json::json!({
        "razorpay_order_id": "order_abc",
        "razorpay_payment_id": "pay_xyz",
        "razorpay_signature": "deadbeef",
    });
    let (status, body) = send(
        Request::post("/api/payments/verify")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["error"].as_str().is_some());
    Ok(())
}

#[tokio::test]
async fn pdf_upload_rejects_non_pdf_body() -> anyhow::Result<()> {
    let token = issue_token(Uuid::new_v4(), "user", common::JWT_SECRET)?;
    let (status, _) = send(
        Request::put(format!("/api/estimates/{}/pdf", Uuid::new_v4()))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/pdf")
            .body(Body::from("not a pdf"))?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn plan_catalog_is_public() -> anyhow::Result<()> {
    let (status, body) =
        send(Request::get("/api/payments/plans").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["currency"], "INR");
    let plans = body["data"]["plans"].as_array().expect("plans array");
    assert_eq!(plans.len(), 4);
    assert_eq!(plans[0]["plan"], "free");
    assert_eq!(plans[0]["price"], 0);
    assert_eq!(body["data"]["packs"].as_array().map(Vec::len), Some(2));
    Ok(())
}
