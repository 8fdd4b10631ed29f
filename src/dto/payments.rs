use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::{Transaction, UserProfile},
    plans::{PlanTier, TopupPack},
};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CreateOrderRequest {
    Subscription { plan: PlanTier },
    Topup { pack: TopupPack },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    /// Public key the checkout widget needs.
    pub key_id: String,
    pub transaction: Transaction,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub transaction: Transaction,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TransactionList {
    #[schema(value_type = Vec<Transaction>)]
    pub items: Vec<Transaction>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlanInfo {
    pub plan: PlanTier,
    pub price: i64,
    pub credits: i32,
    pub period_days: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PackInfo {
    pub pack: TopupPack,
    pub price: i64,
    pub credits: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlanCatalog {
    pub currency: String,
    pub plans: Vec<PlanInfo>,
    pub packs: Vec<PackInfo>,
}
