use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::payments::{
        CreateOrderRequest, CreateOrderResponse, PackInfo, PlanCatalog, PlanInfo, TransactionList,
        VerifyPaymentRequest, VerifyPaymentResponse,
    },
    entity::{
        transactions::{ActiveModel as TxActive, Column as TxCol, Entity as Transactions},
        users::{ActiveModel as UserActive, Entity as Users},
    },
    error::{AppError, AppResult},
    integrations::razorpay::{OrderRequest, verify_payment_signature},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Transaction, UserProfile, parse_stored},
    plans::{
        CURRENCY, CreditBalance, PLAN_PERIOD_DAYS, PlanTier, Purchase, TopupPack, TransactionKind,
    },
    response::{ApiResponse, Meta},
    routes::params::TransactionListQuery,
    state::AppState,
};

pub const STATUS_CREATED: &str = "created";
pub const STATUS_PAID: &str = "paid";

pub fn list_plans() -> ApiResponse<PlanCatalog> {
    let plans = PlanTier::ALL
        .iter()
        .map(|plan| PlanInfo {
            plan: *plan,
            price: plan.price(),
            credits: plan.credits(),
            period_days: (*plan != PlanTier::Free).then_some(PLAN_PERIOD_DAYS),
        })
        .collect();
    let packs = TopupPack::ALL
        .iter()
        .map(|pack| PackInfo {
            pack: *pack,
            price: pack.price(),
            credits: pack.credits(),
        })
        .collect();

    ApiResponse::success(
        "Plans",
        PlanCatalog {
            currency: CURRENCY.to_string(),
            plans,
            packs,
        },
        None,
    )
}

/// What a checkout is for, priced from the catalog.
struct PricedPurchase {
    kind: TransactionKind,
    plan: Option<PlanTier>,
    pack: Option<TopupPack>,
    credits: i32,
    amount: i64,
}

fn price(request: &CreateOrderRequest) -> AppResult<PricedPurchase> {
    match *request {
        CreateOrderRequest::Subscription { plan } => {
            if plan == PlanTier::Free {
                return Err(AppError::BadRequest("The free plan cannot be purchased".into()));
            }
            Ok(PricedPurchase {
                kind: TransactionKind::Subscription,
                plan: Some(plan),
                pack: None,
                credits: plan.credits(),
                amount: plan.price(),
            })
        }
        CreateOrderRequest::Topup { pack } => Ok(PricedPurchase {
            kind: TransactionKind::Topup,
            plan: None,
            pack: Some(pack),
            credits: pack.credits(),
            amount: pack.price(),
        }),
    }
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<CreateOrderResponse>> {
    let priced = price(&payload)?;
    Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let transaction_id = Uuid::new_v4();
    let order = state
        .payments
        .create_order(&OrderRequest {
            amount: priced.amount,
            currency: CURRENCY.to_string(),
            receipt: format!("qk_{}", transaction_id.simple()),
            notes: serde_json::json!({
                "user_id": user.user_id,
                "transaction_id": transaction_id,
                "kind": priced.kind.as_str(),
                "plan": priced.plan.map(|p| p.as_str()),
                "pack": priced.pack.map(|p| p.as_str()),
            }),
        })
        .await?;

    if order.amount != priced.amount {
        return Err(AppError::Upstream(format!(
            "gateway order amount {} does not match {}",
            order.amount, priced.amount
        )));
    }

    let transaction = TxActive {
        id: Set(transaction_id),
        user_id: Set(user.user_id),
        kind: Set(priced.kind.as_str().to_string()),
        plan: Set(priced.plan.map(|p| p.as_str().to_string())),
        pack: Set(priced.pack.map(|p| p.as_str().to_string())),
        credits: Set(priced.credits),
        amount: Set(priced.amount),
        currency: Set(order.currency.clone()),
        razorpay_order_id: Set(order.id.clone()),
        razorpay_payment_id: Set(None),
        status: Set(STATUS_CREATED.to_string()),
        paid_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "payment_order",
        "transactions",
        serde_json::json!({
            "transaction_id": transaction.id,
            "order_id": transaction.razorpay_order_id,
            "amount": transaction.amount,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        CreateOrderResponse {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
            key_id: state.config.razorpay.key_id.clone(),
            transaction: Transaction::from(transaction),
        },
        Some(Meta::empty()),
    ))
}

pub async fn verify_payment(
    state: &AppState,
    user: &AuthUser,
    payload: VerifyPaymentRequest,
) -> AppResult<ApiResponse<VerifyPaymentResponse>> {
    if let Err(err) = verify_payment_signature(
        &state.config.razorpay.key_secret,
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
    ) {
        tracing::warn!(
            user_id = %user.user_id,
            order_id = %payload.razorpay_order_id,
            error = %err,
            "payment signature rejected"
        );
        return Err(err.into());
    }

    let txn = state.orm.begin().await?;

    let transaction = Transactions::find()
        .filter(TxCol::RazorpayOrderId.eq(payload.razorpay_order_id.as_str()))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .filter(|t| t.user_id == user.user_id)
        .ok_or(AppError::NotFound)?;

    if transaction.status == STATUS_PAID {
        return Err(AppError::Conflict("Payment already verified".into()));
    }

    let owner = Users::find_by_id(user.user_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let now = Utc::now();
    let kind: TransactionKind = transaction.kind.parse()?;
    let purchase = match kind {
        TransactionKind::Subscription => {
            let plan_name = transaction.plan.as_deref().ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("subscription transaction without plan"))
            })?;
            Purchase::Subscription(parse_stored(plan_name, "transactions.plan")?)
        }
        TransactionKind::Topup => Purchase::Topup(transaction.credits),
    };

    let balance = CreditBalance {
        total: owner.total_credits,
        left: owner.left_credits,
        used: owner.used_credits,
    }
    .apply(purchase);

    let mut owner_active: UserActive = owner.into();
    if let Purchase::Subscription(plan) = purchase {
        owner_active.plan = Set(plan.as_str().to_string());
        owner_active.plan_expires_at = Set(plan.expiry_from(now).map(Into::into));
    }
    owner_active.total_credits = Set(balance.total);
    owner_active.left_credits = Set(balance.left);
    owner_active.used_credits = Set(balance.used);
    owner_active.updated_at = Set(now.into());
    let owner = owner_active.update(&txn).await?;

    let mut tx_active: TxActive = transaction.into();
    tx_active.status = Set(STATUS_PAID.to_string());
    tx_active.razorpay_payment_id = Set(Some(payload.razorpay_payment_id.clone()));
    tx_active.paid_at = Set(Some(now.into()));
    tx_active.updated_at = Set(now.into());
    let transaction = tx_active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        user_id = %user.user_id,
        order_id = %transaction.razorpay_order_id,
        kind = kind.as_str(),
        left_credits = balance.left,
        "payment verified"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "payment_verified",
        "transactions",
        serde_json::json!({
            "transaction_id": transaction.id,
            "payment_id": transaction.razorpay_payment_id,
            "kind": kind.as_str(),
            "credits": transaction.credits,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment verified",
        VerifyPaymentResponse {
            transaction: Transaction::from(transaction),
            user: UserProfile::try_from(owner)?,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_transactions(
    state: &AppState,
    user: &AuthUser,
    query: TransactionListQuery,
) -> AppResult<ApiResponse<TransactionList>> {
    let condition = Condition::all().add(TxCol::UserId.eq(user.user_id));
    paged_transactions(state, condition, query).await
}

pub async fn list_all_transactions(
    state: &AppState,
    user: &AuthUser,
    query: TransactionListQuery,
) -> AppResult<ApiResponse<TransactionList>> {
    ensure_admin(user)?;
    paged_transactions(state, Condition::all(), query).await
}

async fn paged_transactions(
    state: &AppState,
    mut condition: Condition,
    query: TransactionListQuery,
) -> AppResult<ApiResponse<TransactionList>> {
    let (page, limit, offset) = query.pagination().normalize();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(TxCol::Status.eq(status.clone()));
    }

    let finder = Transactions::find()
        .filter(condition)
        .order_by_desc(TxCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Transaction::from)
        .collect();

    Ok(ApiResponse::paged(
        "Transactions",
        TransactionList { items },
        page,
        limit,
        total,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriptions_are_priced_from_catalog() {
        let priced = price(&CreateOrderRequest::Subscription {
            plan: PlanTier::Pro,
        })
        .unwrap();
        assert_eq!(priced.kind, TransactionKind::Subscription);
        assert_eq!(priced.amount, PlanTier::Pro.price());
        assert_eq!(priced.credits, PlanTier::Pro.credits());
        assert_eq!(priced.pack, None);
    }

    #[test]
    fn free_plan_cannot_be_bought() {
        assert!(matches!(
            price(&CreateOrderRequest::Subscription {
                plan: PlanTier::Free
            }),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn topups_are_priced_from_catalog() {
        let priced = price(&CreateOrderRequest::Topup {
            pack: TopupPack::TopupLarge,
        })
        .unwrap();
        assert_eq!(priced.kind, TransactionKind::Topup);
        assert_eq!(priced.amount, 699_00);
        assert_eq!(priced.credits, 100);
        assert_eq!(priced.plan, None);
    }

    #[test]
    fn catalog_lists_every_tier_and_pack() {
        let catalog = list_plans().data.unwrap();
        assert_eq!(catalog.plans.len(), PlanTier::ALL.len());
        assert_eq!(catalog.packs.len(), TopupPack::ALL.len());
        let free = catalog
            .plans
            .iter()
            .find(|p| p.plan == PlanTier::Free)
            .unwrap();
        assert_eq!(free.period_days, None);
    }
}
