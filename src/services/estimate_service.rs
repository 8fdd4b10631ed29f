use axum::body::Bytes;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    db::contains_pattern,
    dto::estimates::{
        CreateEstimateRequest, EstimateList, EstimateStats, SharedEstimate, StatusCounts,
        UpdateEstimateRequest, UpdateEstimateStatusRequest,
    },
    entity::{
        estimates::{
            ActiveModel as EstimateActive, Column as EstCol, Entity as Estimates,
            Model as EstimateModel,
        },
        users::{ActiveModel as UserActive, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Estimate, StudioPublicProfile, parse_stored},
    plans::{EstimateStatus, PlanTier},
    response::{ApiResponse, Meta},
    routes::params::{EstimateListQuery, EstimateSortBy, SortOrder},
    services::template_service::resolve_theme,
    state::AppState,
    totals::{self, Computed, LineItemInput},
};

pub const MAX_PDF_BYTES: usize = 10 * 1024 * 1024;
const CREDITS_PER_ESTIMATE: i32 = 1;

pub async fn create_estimate(
    state: &AppState,
    user: &AuthUser,
    payload: CreateEstimateRequest,
) -> AppResult<ApiResponse<Estimate>> {
    let client_name = required_client_name(&payload.client_name)?;
    let computed = totals::compute(&payload.services, payload.discount, payload.tax)?;
    let services = services_json(&computed)?;

    let txn = state.orm.begin().await?;

    let owner = Users::find_by_id(user.user_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let requested_theme = payload
        .theme_key
        .or_else(|| owner.selected_estimate_theme.clone());
    let theme_key = match requested_theme {
        Some(key) => Some(resolve_theme(&txn, &key, effective_plan(&owner)?).await?.theme_key),
        None => None,
    };

    if owner.left_credits < CREDITS_PER_ESTIMATE {
        return Err(AppError::PaymentRequired(
            "No credits left; renew your plan or buy a top-up".into(),
        ));
    }

    let left_credits = owner.left_credits - CREDITS_PER_ESTIMATE;
    let used_credits = owner.used_credits + CREDITS_PER_ESTIMATE;
    let mut owner_active: UserActive = owner.into();
    owner_active.left_credits = Set(left_credits);
    owner_active.used_credits = Set(used_credits);
    owner_active.updated_at = Set(Utc::now().into());
    owner_active.update(&txn).await?;

    let id = Uuid::new_v4();
    let estimate = EstimateActive {
        id: Set(id),
        user_id: Set(user.user_id),
        estimate_number: Set(build_estimate_number(id)),
        client_name: Set(client_name),
        client_email: Set(payload.client_email),
        client_phone: Set(payload.client_phone),
        event_type: Set(payload.event_type),
        event_date: Set(payload.event_date),
        event_location: Set(payload.event_location),
        services: Set(services),
        discount_type: Set(payload.discount.kind().to_string()),
        discount_value: Set(payload.discount.value()),
        tax_type: Set(payload.tax.kind().to_string()),
        tax_value: Set(payload.tax.value()),
        subtotal: Set(computed.totals.subtotal),
        discount_amount: Set(computed.totals.discount_amount),
        tax_amount: Set(computed.totals.tax_amount),
        net_total: Set(computed.totals.net_total),
        notes: Set(payload.notes),
        terms: Set(payload.terms),
        theme_key: Set(theme_key),
        status: Set(EstimateStatus::Draft.as_str().to_string()),
        pdf_url: Set(None),
        sent_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "estimate_create",
        "estimates",
        serde_json::json!({
            "estimate_id": estimate.id,
            "net_total": estimate.net_total,
            "left_credits": left_credits,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Estimate created",
        Estimate::try_from(estimate)?,
        Some(Meta::empty()),
    ))
}

pub async fn list_estimates(
    state: &AppState,
    user: &AuthUser,
    query: EstimateListQuery,
) -> AppResult<ApiResponse<EstimateList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(EstCol::UserId.eq(user.user_id));

    if let Some(status) = query.status {
        condition = condition.add(EstCol::Status.eq(status.as_str()));
    }
    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(Expr::col(EstCol::ClientName).ilike(pattern));
    }

    let sort_col = match query.sort_by.unwrap_or(EstimateSortBy::CreatedAt) {
        EstimateSortBy::CreatedAt => EstCol::CreatedAt,
        EstimateSortBy::EventDate => EstCol::EventDate,
        EstimateSortBy::NetTotal => EstCol::NetTotal,
    };

    let mut finder = Estimates::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Estimate::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::paged(
        "Estimates",
        EstimateList { items },
        page,
        limit,
        total,
    ))
}

pub async fn get_estimate(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Estimate>> {
    let estimate = find_owned(&state.orm, user.user_id, id).await?;
    Ok(ApiResponse::success(
        "Estimate",
        Estimate::try_from(estimate)?,
        None,
    ))
}

pub async fn update_estimate(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateEstimateRequest,
) -> AppResult<ApiResponse<Estimate>> {
    let txn = state.orm.begin().await?;
    let existing = find_owned_for_update(&txn, user.user_id, id).await?;
    let status: EstimateStatus = parse_stored(&existing.status, "estimates.status")?;
    if !status.is_editable() {
        return Err(AppError::BadRequest(format!(
            "A {} estimate can no longer be edited",
            status.as_str()
        )));
    }

    let repriced = if payload.touches_pricing() {
        let current = Estimate::try_from(existing.clone())?;
        let inputs: Vec<LineItemInput> = match &payload.services {
            Some(services) => services.clone(),
            None => current.services.iter().map(LineItemInput::from).collect(),
        };
        let discount = payload.discount.unwrap_or(current.discount);
        let tax = payload.tax.unwrap_or(current.tax);
        Some((totals::compute(&inputs, discount, tax)?, discount, tax))
    } else {
        None
    };

    let theme_key = match &payload.theme_key {
        Some(key) => {
            let owner = Users::find_by_id(user.user_id)
                .one(&txn)
                .await?
                .ok_or(AppError::NotFound)?;
            Some(resolve_theme(&txn, key, effective_plan(&owner)?).await?.theme_key)
        }
        None => None,
    };

    let mut active: EstimateActive = existing.into();
    if let Some(name) = &payload.client_name {
        active.client_name = Set(required_client_name(name)?);
    }
    if let Some(email) = payload.client_email {
        active.client_email = Set(Some(email));
    }
    if let Some(phone) = payload.client_phone {
        active.client_phone = Set(Some(phone));
    }
    if let Some(event_type) = payload.event_type {
        active.event_type = Set(Some(event_type));
    }
    if let Some(date) = payload.event_date {
        active.event_date = Set(Some(date));
    }
    if let Some(location) = payload.event_location {
        active.event_location = Set(Some(location));
    }
    if let Some(notes) = payload.notes {
        active.notes = Set(Some(notes));
    }
    if let Some(terms) = payload.terms {
        active.terms = Set(Some(terms));
    }
    if let Some(key) = theme_key {
        active.theme_key = Set(Some(key));
    }
    if let Some((computed, discount, tax)) = repriced {
        active.services = Set(services_json(&computed)?);
        active.discount_type = Set(discount.kind().to_string());
        active.discount_value = Set(discount.value());
        active.tax_type = Set(tax.kind().to_string());
        active.tax_value = Set(tax.value());
        active.subtotal = Set(computed.totals.subtotal);
        active.discount_amount = Set(computed.totals.discount_amount);
        active.tax_amount = Set(computed.totals.tax_amount);
        active.net_total = Set(computed.totals.net_total);
    }
    active.updated_at = Set(Utc::now().into());

    let estimate = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "estimate_update",
        "estimates",
        serde_json::json!({ "estimate_id": estimate.id, "net_total": estimate.net_total }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Estimate::try_from(estimate)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateEstimateStatusRequest,
) -> AppResult<ApiResponse<Estimate>> {
    // Row lock serializes concurrent transitions so each sees the committed status.
    let txn = state.orm.begin().await?;
    let existing = find_owned_for_update(&txn, user.user_id, id).await?;
    let current: EstimateStatus = parse_stored(&existing.status, "estimates.status")?;
    let next = payload.status;
    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot move estimate from {} to {}",
            current.as_str(),
            next.as_str()
        )));
    }

    let now = Utc::now();
    let mut active: EstimateActive = existing.into();
    active.status = Set(next.as_str().to_string());
    if next == EstimateStatus::Sent {
        active.sent_at = Set(Some(now.into()));
    }
    active.updated_at = Set(now.into());
    let estimate = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "estimate_status",
        "estimates",
        serde_json::json!({
            "estimate_id": estimate.id,
            "from": current.as_str(),
            "to": next.as_str(),
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Status updated",
        Estimate::try_from(estimate)?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_estimate(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Estimates::delete_many()
        .filter(
            Condition::all()
                .add(EstCol::Id.eq(id))
                .add(EstCol::UserId.eq(user.user_id)),
        )
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "estimate_delete",
        "estimates",
        serde_json::json!({ "estimate_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn upload_pdf(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    content_type: Option<&str>,
    body: Bytes,
) -> AppResult<ApiResponse<Estimate>> {
    validate_pdf(content_type, &body)?;
    let existing = find_owned(&state.orm, user.user_id, id).await?;

    let key = format!("estimates/{}/{}.pdf", user.user_id, id);
    let url = state.storage.put(&key, body, "application/pdf").await?;

    let mut active: EstimateActive = existing.into();
    active.pdf_url = Set(Some(url));
    active.updated_at = Set(Utc::now().into());
    let estimate = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "estimate_pdf",
        "estimates",
        serde_json::json!({ "estimate_id": estimate.id, "key": key }),
    )
    .await;

    Ok(ApiResponse::success(
        "PDF stored",
        Estimate::try_from(estimate)?,
        Some(Meta::empty()),
    ))
}

pub async fn estimate_stats(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<EstimateStats>> {
    let owner = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let rows: Vec<(String, i64, i64)> = Estimates::find()
        .select_only()
        .column(EstCol::Status)
        .column_as(Expr::cust("COUNT(*)"), "count")
        .column_as(Expr::cust("COALESCE(SUM(net_total), 0)::BIGINT"), "value")
        .filter(EstCol::UserId.eq(user.user_id))
        .group_by(EstCol::Status)
        .into_tuple()
        .all(&state.orm)
        .await?;

    let mut by_status = StatusCounts::default();
    let mut total_estimates = 0;
    let mut quoted_value = 0;
    let mut approved_value = 0;
    for (status, count, value) in rows {
        total_estimates += count;
        quoted_value += value;
        match parse_stored::<EstimateStatus>(&status, "estimates.status")? {
            EstimateStatus::Draft => by_status.draft = count,
            EstimateStatus::Sent => by_status.sent = count,
            EstimateStatus::Approved => {
                by_status.approved = count;
                approved_value = value;
            }
            EstimateStatus::Rejected => by_status.rejected = count,
        }
    }

    Ok(ApiResponse::success(
        "Estimate stats",
        EstimateStats {
            total_estimates,
            by_status,
            quoted_value,
            approved_value,
            total_credits: owner.total_credits,
            left_credits: owner.left_credits,
            used_credits: owner.used_credits,
        },
        Some(Meta::empty()),
    ))
}

/// Client-facing view; drafts stay private.
pub async fn get_shared_estimate(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<SharedEstimate>> {
    let estimate = Estimates::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let estimate = Estimate::try_from(estimate)?;
    if !estimate.status.is_shareable() {
        return Err(AppError::NotFound);
    }

    let studio = Users::find_by_id(estimate.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let theme_key = estimate
        .theme_key
        .clone()
        .or_else(|| studio.selected_estimate_theme.clone());

    Ok(ApiResponse::success(
        "Shared estimate",
        SharedEstimate {
            estimate,
            studio: StudioPublicProfile::from(studio),
            theme_key,
        },
        None,
    ))
}

async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    id: Uuid,
) -> AppResult<EstimateModel> {
    Estimates::find()
        .filter(
            Condition::all()
                .add(EstCol::UserId.eq(user_id))
                .add(EstCol::Id.eq(id)),
        )
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

async fn find_owned_for_update<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    id: Uuid,
) -> AppResult<EstimateModel> {
    Estimates::find()
        .filter(
            Condition::all()
                .add(EstCol::UserId.eq(user_id))
                .add(EstCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)
}

fn effective_plan(owner: &UserModel) -> AppResult<PlanTier> {
    let plan: PlanTier = parse_stored(&owner.plan, "users.plan")?;
    Ok(plan.effective(
        owner.plan_expires_at.map(|dt| dt.with_timezone(&Utc)),
        Utc::now(),
    ))
}

fn services_json(computed: &Computed) -> AppResult<serde_json::Value> {
    serde_json::to_value(&computed.items).map_err(|e| AppError::Internal(e.into()))
}

fn required_client_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Client name is required".into()));
    }
    Ok(name.to_string())
}

pub fn validate_pdf(content_type: Option<&str>, body: &[u8]) -> AppResult<()> {
    let is_pdf_type = content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|ct| ct.trim().eq_ignore_ascii_case("application/pdf"));
    if !is_pdf_type {
        return Err(AppError::BadRequest(
            "Content-Type must be application/pdf".into(),
        ));
    }
    if body.len() > MAX_PDF_BYTES {
        return Err(AppError::BadRequest("PDF exceeds 10 MiB".into()));
    }
    if !body.starts_with(b"%PDF") {
        return Err(AppError::BadRequest("Body is not a PDF document".into()));
    }
    Ok(())
}

fn build_estimate_number(id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = id.simple().to_string();
    format!("EST-{}-{}", date, &suffix[..8]).to_uppercase()
}
