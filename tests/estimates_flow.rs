mod common;

use axum::body::Bytes;
use quotekaro_api::{
    dto::{
        estimates::{CreateEstimateRequest, UpdateEstimateRequest, UpdateEstimateStatusRequest},
        users::UpdatePreferencesRequest,
    },
    error::AppError,
    middleware::auth::ROLE_USER,
    plans::{EstimateStatus, PlanTier},
    routes::params::EstimateListQuery,
    services::{estimate_service, user_service},
    totals::{Adjustment, LineItemInput},
};
use uuid::Uuid;

fn wedding_request(theme_key: Option<String>) -> CreateEstimateRequest {
    CreateEstimateRequest {
        client_name: "Asha & Rohan".into(),
        client_email: Some("asha@example.com".into()),
        client_phone: None,
        event_type: Some("Wedding".into()),
        event_date: chrono::NaiveDate::from_ymd_opt(2026, 12, 12),
        event_location: Some("Jaipur".into()),
        services: vec![
            LineItemInput {
                name: "Candid photography".into(),
                description: None,
                quantity: 2,
                unit_price: 10_000,
            },
            LineItemInput {
                name: "Album".into(),
                description: Some("40 pages".into()),
                quantity: 1,
                unit_price: 5_000,
            },
        ],
        discount: Adjustment::Percentage(10.0),
        tax: Adjustment::Percentage(18.0),
        notes: None,
        terms: None,
        theme_key,
    }
}

// Studio spends credits on estimates, moves one through its lifecycle and shares it.
#[tokio::test]
async fn estimate_lifecycle_consumes_credits_and_shares() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, store) = common::setup_state(&database_url).await?;
    let studio = common::create_user(&state, ROLE_USER, PlanTier::Free, 2).await?;
    let pro_theme = common::create_theme(&state, PlanTier::Pro).await?;
    let free_theme = common::create_theme(&state, PlanTier::Free).await?;

    // Plan-gated theme is refused without spending a credit.
    let err = estimate_service::create_estimate(&state, &studio, wedding_request(Some(pro_theme)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    user_service::update_preferences(
        &state,
        &studio,
        studio.user_id,
        UpdatePreferencesRequest {
            selected_estimate_theme: free_theme.clone(),
        },
    )
    .await?;

    let created = estimate_service::create_estimate(&state, &studio, wedding_request(None))
        .await?
        .data
        .expect("estimate");
    assert_eq!(created.status, EstimateStatus::Draft);
    assert_eq!(created.theme_key.as_deref(), Some(free_theme.as_str()));
    assert_eq!(created.subtotal, 25_000);
    assert_eq!(created.discount_amount, 2_500);
    assert_eq!(created.tax_amount, 4_050);
    assert_eq!(created.net_total, 26_550);
    assert_eq!(created.services[0].total, 20_000);

    // Drafts are not shareable.
    let err = estimate_service::get_shared_estimate(&state, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // Fixed discount reprices the estimate.
    let updated = estimate_service::update_estimate(
        &state,
        &studio,
        created.id,
        UpdateEstimateRequest {
            discount: Some(Adjustment::Fixed(5_000)),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("estimate");
    assert_eq!(updated.discount_amount, 5_000);
    assert_eq!(updated.tax_amount, 3_600);
    assert_eq!(updated.net_total, 23_600);

    let err = estimate_service::update_status(
        &state,
        &studio,
        created.id,
        UpdateEstimateStatusRequest {
            status: EstimateStatus::Approved,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let sent = estimate_service::update_status(
        &state,
        &studio,
        created.id,
        UpdateEstimateStatusRequest {
            status: EstimateStatus::Sent,
        },
    )
    .await?
    .data
    .expect("estimate");
    assert!(sent.sent_at.is_some());

    let shared = estimate_service::get_shared_estimate(&state, created.id)
        .await?
        .data
        .expect("shared");
    assert_eq!(shared.studio.studio_name, "Test Studio");
    assert_eq!(shared.theme_key.as_deref(), Some(free_theme.as_str()));

    let pdf = Bytes::from_static(b"%PDF-1.7\n%test\n");
    let with_pdf = estimate_service::upload_pdf(
        &state,
        &studio,
        created.id,
        Some("application/pdf"),
        pdf.clone(),
    )
    .await?
    .data
    .expect("estimate");
    let key = format!("estimates/{}/{}.pdf", studio.user_id, created.id);
    assert_eq!(with_pdf.pdf_url, Some(format!("memory://{key}")));
    assert_eq!(store.get(&key).map(|(_, body)| body), Some(pdf));

    estimate_service::update_status(
        &state,
        &studio,
        created.id,
        UpdateEstimateStatusRequest {
            status: EstimateStatus::Approved,
        },
    )
    .await?;

    // Decided estimates are frozen.
    let err = estimate_service::update_estimate(
        &state,
        &studio,
        created.id,
        UpdateEstimateRequest {
            client_name: Some("Someone else".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Second credit, then the account is out.
    estimate_service::create_estimate(&state, &studio, wedding_request(None)).await?;
    let err = estimate_service::create_estimate(&state, &studio, wedding_request(None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PaymentRequired(_)));

    let stats = estimate_service::estimate_stats(&state, &studio)
        .await?
        .data
        .expect("stats");
    assert_eq!(stats.total_estimates, 2);
    assert_eq!(stats.by_status.approved, 1);
    assert_eq!(stats.by_status.draft, 1);
    assert_eq!(stats.approved_value, 23_600);
    assert_eq!(stats.quoted_value, 23_600 + 26_550);
    assert_eq!(stats.left_credits, 0);
    assert_eq!(stats.used_credits, 2);

    let listed = estimate_service::list_estimates(
        &state,
        &studio,
        EstimateListQuery {
            status: Some(EstimateStatus::Approved),
            ..Default::default()
        },
    )
    .await?;
    let items = listed.data.expect("list").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, created.id);

    Ok(())
}

#[tokio::test]
async fn estimates_are_private_to_their_studio() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let owner = common::create_user(&state, ROLE_USER, PlanTier::Free, 1).await?;
    let other = common::create_user(&state, ROLE_USER, PlanTier::Free, 1).await?;

    let created = estimate_service::create_estimate(&state, &owner, wedding_request(None))
        .await?
        .data
        .expect("estimate");

    let err = estimate_service::get_estimate(&state, &other, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = estimate_service::delete_estimate(&state, &other, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = estimate_service::get_estimate(&state, &owner, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    estimate_service::delete_estimate(&state, &owner, created.id).await?;
    Ok(())
}

// Two decisions racing on a sent estimate: exactly one lands.
#[tokio::test]
async fn concurrent_decisions_on_a_sent_estimate_do_not_both_apply() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let studio = common::create_user(&state, ROLE_USER, PlanTier::Free, 5).await?;

    for _ in 0..5 {
        let created = estimate_service::create_estimate(&state, &studio, wedding_request(None))
            .await?
            .data
            .expect("estimate");
        estimate_service::update_status(
            &state,
            &studio,
            created.id,
            UpdateEstimateStatusRequest {
                status: EstimateStatus::Sent,
            },
        )
        .await?;

        let (approve, reject) = tokio::join!(
            estimate_service::update_status(
                &state,
                &studio,
                created.id,
                UpdateEstimateStatusRequest {
                    status: EstimateStatus::Approved,
                },
            ),
            estimate_service::update_status(
                &state,
                &studio,
                created.id,
                UpdateEstimateStatusRequest {
                    status: EstimateStatus::Rejected,
                },
            ),
        );

        let winner = match (approve, reject) {
            (Ok(_), Err(AppError::BadRequest(_))) => EstimateStatus::Approved,
            (Err(AppError::BadRequest(_)), Ok(_)) => EstimateStatus::Rejected,
            (a, r) => panic!("expected exactly one decision, got {a:?} / {r:?}"),
        };

        let stored = estimate_service::get_estimate(&state, &studio, created.id)
            .await?
            .data
            .expect("estimate");
        assert_eq!(stored.status, winner);
    }
    Ok(())
}

#[tokio::test]
async fn client_search_treats_wildcards_literally() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, _) = common::setup_state(&database_url).await?;
    let studio = common::create_user(&state, ROLE_USER, PlanTier::Free, 2).await?;

    let mut discounted = wedding_request(None);
    discounted.client_name = "Mehta 100% Candid".into();
    let discounted = estimate_service::create_estimate(&state, &studio, discounted)
        .await?
        .data
        .expect("estimate");
    estimate_service::create_estimate(&state, &studio, wedding_request(None)).await?;

    for term in ["%", "100%", "_"] {
        let listed = estimate_service::list_estimates(
            &state,
            &studio,
            EstimateListQuery {
                q: Some(term.into()),
                ..Default::default()
            },
        )
        .await?
        .data
        .expect("list");
        let expected: Vec<Uuid> = if term == "_" { vec![] } else { vec![discounted.id] };
        let ids: Vec<Uuid> = listed.items.iter().map(|e| e.id).collect();
        assert_eq!(ids, expected, "search term {term:?}");
    }
    Ok(())
}
