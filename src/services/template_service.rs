use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    db::contains_pattern,
    dto::templates::{CreateTemplateRequest, TemplateList, UpdateTemplateRequest},
    entity::estimate_templates::{
        ActiveModel as TemplateActive, Column as TemplateCol, Entity as Templates,
        Model as TemplateModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{EstimateTemplate, parse_stored},
    plans::PlanTier,
    response::{ApiResponse, Meta},
    routes::params::TemplateListQuery,
    state::AppState,
};

const MAX_THEME_KEY_LEN: usize = 64;

pub async fn list_templates(
    state: &AppState,
    caller: Option<&AuthUser>,
    query: TemplateListQuery,
) -> AppResult<ApiResponse<TemplateList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    let is_admin = caller.is_some_and(AuthUser::is_admin);
    match (is_admin, query.active) {
        (true, Some(active)) => condition = condition.add(TemplateCol::IsActive.eq(active)),
        (true, None) => {}
        (false, _) => condition = condition.add(TemplateCol::IsActive.eq(true)),
    }

    if let Some(tier) = query.plan_tier {
        condition = condition.add(TemplateCol::PlanTier.eq(tier.as_str()));
    }
    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(TemplateCol::ThemeKey).ilike(pattern.clone()))
                .add(Expr::col(TemplateCol::Name).ilike(pattern)),
        );
    }

    let finder = Templates::find()
        .filter(condition)
        .order_by(
            Expr::cust(
                "CASE plan_tier WHEN 'free' THEN 0 WHEN 'basic' THEN 1 WHEN 'pro' THEN 2 ELSE 3 END",
            ),
            Order::Asc,
        )
        .order_by_asc(TemplateCol::Name);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(EstimateTemplate::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::paged(
        "Templates",
        TemplateList { items },
        page,
        limit,
        total,
    ))
}

pub async fn get_template(state: &AppState, id: Uuid) -> AppResult<ApiResponse<EstimateTemplate>> {
    let template = Templates::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Template",
        EstimateTemplate::try_from(template)?,
        None,
    ))
}

pub async fn create_template(
    state: &AppState,
    user: &AuthUser,
    payload: CreateTemplateRequest,
) -> AppResult<ApiResponse<EstimateTemplate>> {
    ensure_admin(user)?;
    let theme_key = validate_theme_key(&payload.theme_key)?;
    let name = required_name(&payload.name)?;
    ensure_key_free(state, &theme_key, None).await?;

    let template = TemplateActive {
        id: Set(Uuid::new_v4()),
        theme_key: Set(theme_key),
        name: Set(name),
        description: Set(payload.description),
        plan_tier: Set(payload.plan_tier.as_str().to_string()),
        preview_image_url: Set(payload.preview_image_url),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "template_create",
        "estimate_templates",
        serde_json::json!({ "template_id": template.id, "theme_key": template.theme_key }),
    )
    .await;

    Ok(ApiResponse::success(
        "Template created",
        EstimateTemplate::try_from(template)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_template(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateTemplateRequest,
) -> AppResult<ApiResponse<EstimateTemplate>> {
    ensure_admin(user)?;
    let existing = Templates::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: TemplateActive = existing.clone().into();
    if let Some(key) = payload.theme_key {
        let key = validate_theme_key(&key)?;
        if key != existing.theme_key {
            ensure_key_free(state, &key, Some(id)).await?;
            active.theme_key = Set(key);
        }
    }
    if let Some(name) = payload.name {
        active.name = Set(required_name(&name)?);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(tier) = payload.plan_tier {
        active.plan_tier = Set(tier.as_str().to_string());
    }
    if let Some(url) = payload.preview_image_url {
        active.preview_image_url = Set(Some(url));
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());

    let template = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "template_update",
        "estimate_templates",
        serde_json::json!({ "template_id": template.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        EstimateTemplate::try_from(template)?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_template(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Templates::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "template_delete",
        "estimate_templates",
        serde_json::json!({ "template_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Look up a theme a studio on `plan` wants to use.
pub async fn resolve_theme<C: ConnectionTrait>(
    conn: &C,
    theme_key: &str,
    plan: PlanTier,
) -> AppResult<TemplateModel> {
    let template = Templates::find()
        .filter(TemplateCol::ThemeKey.eq(theme_key))
        .one(conn)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| AppError::BadRequest(format!("Theme '{theme_key}' is not available")))?;

    let required: PlanTier = parse_stored(&template.plan_tier, "estimate_templates.plan_tier")?;
    if !plan.can_use(required) {
        return Err(AppError::Forbidden);
    }
    Ok(template)
}

async fn ensure_key_free(state: &AppState, theme_key: &str, except: Option<Uuid>) -> AppResult<()> {
    let existing = Templates::find()
        .filter(TemplateCol::ThemeKey.eq(theme_key))
        .one(&state.orm)
        .await?;
    match existing {
        Some(t) if Some(t.id) != except => Err(AppError::Conflict(format!(
            "Theme key '{theme_key}' already exists"
        ))),
        _ => Ok(()),
    }
}

fn required_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Template name is required".into()));
    }
    Ok(name.to_string())
}

pub fn validate_theme_key(raw: &str) -> AppResult<String> {
    let key = raw.trim();
    let valid = !key.is_empty()
        && key.len() <= MAX_THEME_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !valid {
        return Err(AppError::BadRequest(
            "theme_key must be 1-64 chars of a-z, 0-9, '_' or '-'".into(),
        ));
    }
    Ok(key.to_string())
}
