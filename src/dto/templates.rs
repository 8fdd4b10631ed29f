use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{models::EstimateTemplate, plans::PlanTier};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTemplateRequest {
    pub theme_key: String,
    pub name: String,
    pub description: Option<String>,
    pub plan_tier: PlanTier,
    pub preview_image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateTemplateRequest {
    pub theme_key: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub plan_tier: Option<PlanTier>,
    pub preview_image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TemplateList {
    #[schema(value_type = Vec<EstimateTemplate>)]
    pub items: Vec<EstimateTemplate>,
}
