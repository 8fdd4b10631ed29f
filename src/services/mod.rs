pub mod auth_service;
pub mod estimate_service;
pub mod payment_service;
pub mod template_service;
pub mod user_service;
