use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        estimates::{
            CreateEstimateRequest, EstimateList, EstimateStats, SharedEstimate, StatusCounts,
            UpdateEstimateRequest, UpdateEstimateStatusRequest,
        },
        payments::{
            CreateOrderRequest, CreateOrderResponse, PackInfo, PlanCatalog, PlanInfo,
            TransactionList, VerifyPaymentRequest, VerifyPaymentResponse,
        },
        templates::{CreateTemplateRequest, TemplateList, UpdateTemplateRequest},
        users::{GrantCreditsRequest, UpdatePreferencesRequest, UpdateProfileRequest, UserList},
    },
    models::{Estimate, EstimateTemplate, StudioPublicProfile, Transaction, UserProfile},
    plans::{EstimateStatus, PlanTier, TopupPack, TransactionKind},
    response::{ApiResponse, Meta},
    routes::{admin, auth, estimates, health, params, payments, public, templates, users},
    totals::{Adjustment, LineItem, LineItemInput, Totals},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "QuoteKaro API", description = "Estimates, themes and credits for photography studios"),
    paths(
        health::health_check,
        auth::register,
        auth::login,
        users::me,
        users::get_user,
        users::update_profile,
        users::update_preferences,
        users::upload_logo,
        templates::list_templates,
        templates::get_template,
        templates::create_template,
        templates::update_template,
        templates::delete_template,
        estimates::list_estimates,
        estimates::create_estimate,
        estimates::estimate_stats,
        estimates::get_estimate,
        estimates::update_estimate,
        estimates::update_status,
        estimates::delete_estimate,
        estimates::upload_pdf,
        public::shared_estimate,
        payments::list_plans,
        payments::create_order,
        payments::verify_payment,
        payments::list_transactions,
        admin::list_users,
        admin::grant_credits,
        admin::list_all_transactions
    ),
    components(
        schemas(
            UserProfile,
            StudioPublicProfile,
            EstimateTemplate,
            Estimate,
            Transaction,
            PlanTier,
            TopupPack,
            TransactionKind,
            EstimateStatus,
            Adjustment,
            LineItem,
            LineItemInput,
            Totals,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            UpdatePreferencesRequest,
            GrantCreditsRequest,
            UserList,
            CreateTemplateRequest,
            UpdateTemplateRequest,
            TemplateList,
            CreateEstimateRequest,
            UpdateEstimateRequest,
            UpdateEstimateStatusRequest,
            EstimateList,
            StatusCounts,
            EstimateStats,
            SharedEstimate,
            CreateOrderRequest,
            CreateOrderResponse,
            VerifyPaymentRequest,
            VerifyPaymentResponse,
            TransactionList,
            PlanInfo,
            PackInfo,
            PlanCatalog,
            params::Pagination,
            params::SortOrder,
            params::EstimateSortBy,
            Meta,
            ApiResponse<UserProfile>,
            ApiResponse<Estimate>,
            ApiResponse<EstimateList>,
            ApiResponse<TemplateList>,
            ApiResponse<PlanCatalog>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Users", description = "Studio profile endpoints"),
        (name = "Templates", description = "Estimate theme endpoints"),
        (name = "Estimates", description = "Estimate endpoints"),
        (name = "Public", description = "Client share links"),
        (name = "Payments", description = "Plans, orders and credits"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
