mod common;

use quotekaro_api::{
    dto::{
        payments::{CreateOrderRequest, VerifyPaymentRequest},
        users::GrantCreditsRequest,
    },
    error::AppError,
    integrations::razorpay::sign_payment,
    middleware::auth::{ROLE_ADMIN, ROLE_USER},
    plans::{PlanTier, TopupPack},
    routes::params::TransactionListQuery,
    services::{payment_service, user_service},
};

fn signed(order_id: &str, payment_id: &str) -> VerifyPaymentRequest {
    VerifyPaymentRequest {
        razorpay_order_id: order_id.to_string(),
        razorpay_payment_id: payment_id.to_string(),
        razorpay_signature: sign_payment(common::RAZORPAY_SECRET, order_id, payment_id)
            .expect("sign payment"),
    }
}

// Top-up adds to the balance, a subscription resets it, and replays are refused.
#[tokio::test]
async fn topup_then_subscription_updates_credits() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let studio = common::create_user(&state, ROLE_USER, PlanTier::Free, 5).await?;

    let err = payment_service::create_order(
        &state,
        &studio,
        CreateOrderRequest::Subscription {
            plan: PlanTier::Free,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let order = payment_service::create_order(
        &state,
        &studio,
        CreateOrderRequest::Topup {
            pack: TopupPack::TopupSmall,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(order.amount, TopupPack::TopupSmall.price());
    assert_eq!(order.key_id, "rzp_test_key");
    assert_eq!(order.transaction.status, "created");

    // Tampered signature never reaches the ledger.
    let mut forged = signed(&order.order_id, "pay_topup");
    forged.razorpay_payment_id = "pay_other".into();
    let err = payment_service::verify_payment(&state, &studio, forged)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let verified = payment_service::verify_payment(&state, &studio, signed(&order.order_id, "pay_topup"))
        .await?
        .data
        .expect("verified");
    assert_eq!(verified.transaction.status, "paid");
    assert_eq!(verified.transaction.razorpay_payment_id.as_deref(), Some("pay_topup"));
    assert_eq!(verified.user.total_credits, 30);
    assert_eq!(verified.user.left_credits, 30);
    assert_eq!(verified.user.plan, PlanTier::Free);

    let err = payment_service::verify_payment(&state, &studio, signed(&order.order_id, "pay_topup"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let order = payment_service::create_order(
        &state,
        &studio,
        CreateOrderRequest::Subscription {
            plan: PlanTier::Pro,
        },
    )
    .await?
    .data
    .expect("order");
    let verified = payment_service::verify_payment(&state, &studio, signed(&order.order_id, "pay_pro"))
        .await?
        .data
        .expect("verified");
    assert_eq!(verified.user.plan, PlanTier::Pro);
    assert_eq!(verified.user.effective_plan, PlanTier::Pro);
    assert!(verified.user.plan_expires_at.is_some());
    assert_eq!(verified.user.total_credits, PlanTier::Pro.credits());
    assert_eq!(verified.user.left_credits, PlanTier::Pro.credits());
    assert_eq!(verified.user.used_credits, 0);

    let history = payment_service::list_transactions(&state, &studio, TransactionListQuery::default())
        .await?;
    assert_eq!(history.meta.and_then(|m| m.total), Some(2));

    let paid = payment_service::list_transactions(
        &state,
        &studio,
        TransactionListQuery {
            status: Some("paid".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(paid.data.expect("list").items.len(), 2);

    Ok(())
}

#[tokio::test]
async fn orders_cannot_be_claimed_by_another_studio() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let buyer = common::create_user(&state, ROLE_USER, PlanTier::Free, 5).await?;
    let other = common::create_user(&state, ROLE_USER, PlanTier::Free, 5).await?;

    let order = payment_service::create_order(
        &state,
        &buyer,
        CreateOrderRequest::Topup {
            pack: TopupPack::TopupLarge,
        },
    )
    .await?
    .data
    .expect("order");

    let err = payment_service::verify_payment(&state, &other, signed(&order.order_id, "pay_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = payment_service::verify_payment(&state, &buyer, signed("order_missing", "pay_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn admin_grants_credits_and_sees_all_transactions() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let admin = common::create_user(&state, ROLE_ADMIN, PlanTier::Premium, 0).await?;
    let studio = common::create_user(&state, ROLE_USER, PlanTier::Free, 5).await?;

    let err = payment_service::list_all_transactions(&state, &studio, TransactionListQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = user_service::grant_credits(
        &state,
        &studio,
        studio.user_id,
        GrantCreditsRequest {
            credits: 10,
            reason: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = user_service::grant_credits(
        &state,
        &admin,
        studio.user_id,
        GrantCreditsRequest {
            credits: 0,
            reason: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let granted = user_service::grant_credits(
        &state,
        &admin,
        studio.user_id,
        GrantCreditsRequest {
            credits: 10,
            reason: Some("Festival promo".into()),
        },
    )
    .await?
    .data
    .expect("profile");
    assert_eq!(granted.left_credits, 15);
    assert_eq!(granted.total_credits, 15);

    payment_service::list_all_transactions(&state, &admin, TransactionListQuery::default()).await?;
    Ok(())
}
