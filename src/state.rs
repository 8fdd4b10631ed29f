use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
    integrations::{razorpay::PaymentGateway, storage::ObjectStore},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: AppConfig,
    pub storage: Arc<dyn ObjectStore>,
    pub payments: Arc<dyn PaymentGateway>,
}
