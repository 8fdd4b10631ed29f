use axum::body::Bytes;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    db::contains_pattern,
    dto::users::{GrantCreditsRequest, UpdatePreferencesRequest, UpdateProfileRequest, UserList},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_self_or_admin},
    models::UserProfile,
    response::{ApiResponse, Meta},
    routes::params::UserListQuery,
    services::template_service::resolve_theme,
    state::AppState,
};

pub const MAX_LOGO_BYTES: usize = 2 * 1024 * 1024;
const MAX_GRANT: i32 = 10_000;

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserProfile>> {
    let model = find_user(state, user.user_id).await?;
    Ok(ApiResponse::success(
        "Profile",
        UserProfile::try_from(model)?,
        None,
    ))
}

pub async fn get_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_self_or_admin(user, id)?;
    let model = find_user(state, id).await?;
    Ok(ApiResponse::success(
        "Profile",
        UserProfile::try_from(model)?,
        None,
    ))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_self_or_admin(user, id)?;
    let existing = find_user(state, id).await?;

    let mut active: UserActive = existing.into();
    if let Some(name) = payload.studio_name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("Studio name is required".into()));
        }
        active.studio_name = Set(name);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(blank_to_none(phone));
    }
    if let Some(address) = payload.address {
        active.address = Set(blank_to_none(address));
    }
    if let Some(url) = payload.website_url {
        active.website_url = Set(link(url, "website_url")?);
    }
    if let Some(url) = payload.instagram_url {
        active.instagram_url = Set(link(url, "instagram_url")?);
    }
    if let Some(url) = payload.facebook_url {
        active.facebook_url = Set(link(url, "facebook_url")?);
    }
    if let Some(url) = payload.youtube_url {
        active.youtube_url = Set(link(url, "youtube_url")?);
    }
    active.updated_at = Set(Utc::now().into());

    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "profile_update",
        "users",
        serde_json::json!({ "user_id": updated.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        UserProfile::try_from(updated)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_preferences(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdatePreferencesRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_self_or_admin(user, id)?;
    let existing = find_user(state, id).await?;
    let profile = UserProfile::try_from(existing.clone())?;

    let template = resolve_theme(
        &state.orm,
        payload.selected_estimate_theme.trim(),
        profile.effective_plan,
    )
    .await?;

    let mut active: UserActive = existing.into();
    active.selected_estimate_theme = Set(Some(template.theme_key.clone()));
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "theme_select",
        "users",
        serde_json::json!({ "user_id": updated.id, "theme_key": template.theme_key }),
    )
    .await;

    Ok(ApiResponse::success(
        "Preferences updated",
        UserProfile::try_from(updated)?,
        Some(Meta::empty()),
    ))
}

pub async fn upload_logo(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    content_type: Option<&str>,
    body: Bytes,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_self_or_admin(user, id)?;
    let (mime, ext) = logo_format(content_type)?;
    if body.is_empty() || body.len() > MAX_LOGO_BYTES {
        return Err(AppError::BadRequest("Logo must be between 1 byte and 2 MiB".into()));
    }
    let existing = find_user(state, id).await?;

    let key = format!("logos/{}.{}", id, ext);
    let url = state.storage.put(&key, body, mime).await?;

    let mut active: UserActive = existing.into();
    active.logo_url = Set(Some(url));
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "logo_upload",
        "users",
        serde_json::json!({ "user_id": updated.id, "key": key }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logo updated",
        UserProfile::try_from(updated)?,
        Some(Meta::empty()),
    ))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(UserCol::Email).ilike(pattern.clone()))
                .add(Expr::col(UserCol::StudioName).ilike(pattern)),
        );
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(UserCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(UserProfile::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::paged("Users", UserList { items }, page, limit, total))
}

pub async fn grant_credits(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
    payload: GrantCreditsRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_admin(admin)?;
    if payload.credits < 1 || payload.credits > MAX_GRANT {
        return Err(AppError::BadRequest(format!(
            "credits must be between 1 and {MAX_GRANT}"
        )));
    }

    let txn = state.orm.begin().await?;
    let target = Users::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let total_credits = target.total_credits.saturating_add(payload.credits);
    let left_credits = target.left_credits.saturating_add(payload.credits);
    let mut active: UserActive = target.into();
    active.total_credits = Set(total_credits);
    active.left_credits = Set(left_credits);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(user_id = %id, credits = payload.credits, "credits granted");
    audit::record(
        &state.pool,
        admin.user_id,
        "credits_grant",
        "users",
        serde_json::json!({
            "user_id": id,
            "credits": payload.credits,
            "reason": payload.reason,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Credits granted",
        UserProfile::try_from(updated)?,
        Some(Meta::empty()),
    ))
}

async fn find_user(state: &AppState, id: Uuid) -> AppResult<UserModel> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

fn blank_to_none(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Social/website links: empty clears, otherwise must be http(s).
fn link(value: String, field: &str) -> AppResult<Option<String>> {
    match blank_to_none(value) {
        None => Ok(None),
        Some(url) if url.starts_with("https://") || url.starts_with("http://") => Ok(Some(url)),
        Some(_) => Err(AppError::BadRequest(format!(
            "{field} must start with http:// or https://"
        ))),
    }
}

fn logo_format(content_type: Option<&str>) -> AppResult<(&'static str, &'static str)> {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    match mime.as_deref() {
        Some("image/png") => Ok(("image/png", "png")),
        Some("image/jpeg") | Some("image/jpg") => Ok(("image/jpeg", "jpg")),
        Some("image/webp") => Ok(("image/webp", "webp")),
        _ => Err(AppError::BadRequest(
            "Logo must be image/png, image/jpeg or image/webp".into(),
        )),
    }
}
