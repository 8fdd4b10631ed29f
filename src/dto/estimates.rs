use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::{Estimate, StudioPublicProfile},
    plans::EstimateStatus,
    totals::{Adjustment, LineItemInput},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEstimateRequest {
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub event_type: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_location: Option<String>,
    pub services: Vec<LineItemInput>,
    #[serde(default)]
    pub discount: Adjustment,
    #[serde(default)]
    pub tax: Adjustment,
    pub notes: Option<String>,
    pub terms: Option<String>,
    /// Falls back to the studio's selected theme.
    pub theme_key: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateEstimateRequest {
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub event_type: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_location: Option<String>,
    pub services: Option<Vec<LineItemInput>>,
    pub discount: Option<Adjustment>,
    pub tax: Option<Adjustment>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub theme_key: Option<String>,
}

impl UpdateEstimateRequest {
    pub fn touches_pricing(&self) -> bool {
        self.services.is_some() || self.discount.is_some() || self.tax.is_some()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEstimateStatusRequest {
    pub status: EstimateStatus,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct EstimateList {
    #[schema(value_type = Vec<Estimate>)]
    pub items: Vec<Estimate>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct StatusCounts {
    pub draft: i64,
    pub sent: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EstimateStats {
    pub total_estimates: i64,
    pub by_status: StatusCounts,
    /// Sum of `net_total` over all estimates, paise.
    pub quoted_value: i64,
    /// Sum of `net_total` over approved estimates, paise.
    pub approved_value: i64,
    pub total_credits: i32,
    pub left_credits: i32,
    pub used_credits: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SharedEstimate {
    pub estimate: Estimate,
    pub studio: StudioPublicProfile,
    pub theme_key: Option<String>,
}
