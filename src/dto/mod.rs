pub mod auth;
pub mod estimates;
pub mod payments;
pub mod templates;
pub mod users;
