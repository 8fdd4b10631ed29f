use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{estimate_templates, estimates, transactions, users},
    error::{AppError, AppResult},
    plans::{EstimateStatus, PlanTier},
    totals::{Adjustment, LineItem},
};

/// Studio account as returned by the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub firebase_uid: Option<String>,
    pub role: String,
    pub studio_name: String,
    pub phone: Option<String>,
    pub logo_url: Option<String>,
    pub address: Option<String>,
    pub website_url: Option<String>,
    pub instagram_url: Option<String>,
    pub facebook_url: Option<String>,
    pub youtube_url: Option<String>,
    pub plan: PlanTier,
    /// `plan` after expiry is taken into account.
    pub effective_plan: PlanTier,
    pub plan_expires_at: Option<DateTime<Utc>>,
    pub total_credits: i32,
    pub left_credits: i32,
    pub used_credits: i32,
    pub selected_estimate_theme: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a client sees about the studio on a shared estimate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudioPublicProfile {
    pub studio_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub logo_url: Option<String>,
    pub address: Option<String>,
    pub website_url: Option<String>,
    pub instagram_url: Option<String>,
    pub facebook_url: Option<String>,
    pub youtube_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EstimateTemplate {
    pub id: Uuid,
    pub theme_key: String,
    pub name: String,
    pub description: Option<String>,
    pub plan_tier: PlanTier,
    pub preview_image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Estimate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub estimate_number: String,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub event_type: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_location: Option<String>,
    pub services: Vec<LineItem>,
    pub discount: Adjustment,
    pub tax: Adjustment,
    pub subtotal: i64,
    pub discount_amount: i64,
    pub tax_amount: i64,
    pub net_total: i64,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub theme_key: Option<String>,
    pub status: EstimateStatus,
    pub pdf_url: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub plan: Option<String>,
    pub pack: Option<String>,
    pub credits: i32,
    pub amount: i64,
    pub currency: String,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: Option<String>,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Parse a value read back from the database; bad data is a server fault.
pub(crate) fn parse_stored<T: FromStr>(value: &str, column: &str) -> AppResult<T> {
    value.parse::<T>().map_err(|_| {
        AppError::Internal(anyhow::anyhow!("invalid stored {column} value '{value}'"))
    })
}

impl TryFrom<users::Model> for UserProfile {
    type Error = AppError;

    fn try_from(model: users::Model) -> AppResult<Self> {
        let plan: PlanTier = parse_stored(&model.plan, "users.plan")?;
        let plan_expires_at = model.plan_expires_at.map(|dt| dt.with_timezone(&Utc));
        Ok(Self {
            id: model.id,
            email: model.email,
            firebase_uid: model.firebase_uid,
            role: model.role,
            studio_name: model.studio_name,
            phone: model.phone,
            logo_url: model.logo_url,
            address: model.address,
            website_url: model.website_url,
            instagram_url: model.instagram_url,
            facebook_url: model.facebook_url,
            youtube_url: model.youtube_url,
            plan,
            effective_plan: plan.effective(plan_expires_at, Utc::now()),
            plan_expires_at,
            total_credits: model.total_credits,
            left_credits: model.left_credits,
            used_credits: model.used_credits,
            selected_estimate_theme: model.selected_estimate_theme,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

impl From<users::Model> for StudioPublicProfile {
    fn from(model: users::Model) -> Self {
        Self {
            studio_name: model.studio_name,
            email: model.email,
            phone: model.phone,
            logo_url: model.logo_url,
            address: model.address,
            website_url: model.website_url,
            instagram_url: model.instagram_url,
            facebook_url: model.facebook_url,
            youtube_url: model.youtube_url,
        }
    }
}

impl TryFrom<estimate_templates::Model> for EstimateTemplate {
    type Error = AppError;

    fn try_from(model: estimate_templates::Model) -> AppResult<Self> {
        Ok(Self {
            id: model.id,
            plan_tier: parse_stored(&model.plan_tier, "estimate_templates.plan_tier")?,
            theme_key: model.theme_key,
            name: model.name,
            description: model.description,
            preview_image_url: model.preview_image_url,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

impl TryFrom<estimates::Model> for Estimate {
    type Error = AppError;

    fn try_from(model: estimates::Model) -> AppResult<Self> {
        let services: Vec<LineItem> = serde_json::from_value(model.services).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("invalid stored estimates.services: {e}"))
        })?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            estimate_number: model.estimate_number,
            client_name: model.client_name,
            client_email: model.client_email,
            client_phone: model.client_phone,
            event_type: model.event_type,
            event_date: model.event_date,
            event_location: model.event_location,
            services,
            discount: Adjustment::from_parts(&model.discount_type, model.discount_value),
            tax: Adjustment::from_parts(&model.tax_type, model.tax_value),
            subtotal: model.subtotal,
            discount_amount: model.discount_amount,
            tax_amount: model.tax_amount,
            net_total: model.net_total,
            notes: model.notes,
            terms: model.terms,
            theme_key: model.theme_key,
            status: parse_stored(&model.status, "estimates.status")?,
            pdf_url: model.pdf_url,
            sent_at: model.sent_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

impl From<transactions::Model> for Transaction {
    fn from(model: transactions::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            kind: model.kind,
            plan: model.plan,
            pack: model.pack,
            credits: model.credits,
            amount: model.amount,
            currency: model.currency,
            razorpay_order_id: model.razorpay_order_id,
            razorpay_payment_id: model.razorpay_payment_id,
            status: model.status,
            paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
