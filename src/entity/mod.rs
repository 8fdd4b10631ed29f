pub mod audit_logs;
pub mod estimate_templates;
pub mod estimates;
pub mod transactions;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use estimate_templates::Entity as EstimateTemplates;
pub use estimates::Entity as Estimates;
pub use transactions::Entity as Transactions;
pub use users::Entity as Users;
