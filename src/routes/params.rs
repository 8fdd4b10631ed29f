use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::plans::{EstimateStatus, PlanTier};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Pages past this are empty for any realistic tenant.
pub const MAX_PAGE: i64 = 1_000_000;

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSortBy {
    CreatedAt,
    EventDate,
    NetTotal,
}

// Query structs keep page fields inline: serde(flatten) breaks numeric
// parsing under urlencoded query strings.

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EstimateListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<EstimateStatus>,
    /// Case-insensitive match on client name.
    pub q: Option<String>,
    pub sort_by: Option<EstimateSortBy>,
    pub sort_order: Option<SortOrder>,
}

impl EstimateListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TemplateListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Admins only; everyone else sees active templates.
    pub active: Option<bool>,
    pub plan_tier: Option<PlanTier>,
    /// Case-insensitive match on theme key or name.
    pub q: Option<String>,
}

impl TemplateListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Matches email or studio name.
    pub q: Option<String>,
}

impl UserListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
}

impl TransactionListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::Uri};

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        let p = Pagination {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(), (1, 100, 0));
        let p = Pagination {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(p.normalize(), (3, 10, 20));
    }

    #[test]
    fn huge_page_numbers_are_capped() {
        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(100),
        };
        assert_eq!(p.normalize(), (MAX_PAGE, 100, (MAX_PAGE - 1) * 100));

        let uri: Uri = "/api/admin/users?page=9223372036854775807&per_page=9223372036854775807"
            .parse()
            .unwrap();
        let Query(query) = Query::<UserListQuery>::try_from_uri(&uri).unwrap();
        let (page, per_page, offset) = query.pagination().normalize();
        assert_eq!((page, per_page), (MAX_PAGE, 100));
        assert!(offset >= 0);
    }

    #[test]
    fn estimate_query_parses_from_uri() {
        let uri: Uri = "/api/estimates?page=2&per_page=5&status=sent&sort_by=net_total&sort_order=asc"
            .parse()
            .unwrap();
        let Query(query) = Query::<EstimateListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.pagination().normalize(), (2, 5, 5));
        assert_eq!(query.status, Some(EstimateStatus::Sent));
        assert!(matches!(query.sort_by, Some(EstimateSortBy::NetTotal)));
        assert!(matches!(query.sort_order, Some(SortOrder::Asc)));
    }

    #[test]
    fn template_query_parses_bool_and_tier() {
        let uri: Uri = "/api/templates?active=false&plan_tier=pro&q=gold".parse().unwrap();
        let Query(query) = Query::<TemplateListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.active, Some(false));
        assert_eq!(query.plan_tier, Some(PlanTier::Pro));
        assert_eq!(query.q.as_deref(), Some("gold"));
    }
}
