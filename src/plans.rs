//! Plan catalog, credit packs and estimate status rules.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

pub const PLAN_PERIOD_DAYS: i64 = 30;
pub const CURRENCY: &str = "INR";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Basic,
    Pro,
    Premium,
}

impl PlanTier {
    pub const ALL: [PlanTier; 4] = [
        PlanTier::Free,
        PlanTier::Basic,
        PlanTier::Pro,
        PlanTier::Premium,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Basic => "basic",
            PlanTier::Pro => "pro",
            PlanTier::Premium => "premium",
        }
    }

    /// Price per period in paise.
    pub fn price(&self) -> i64 {
        match self {
            PlanTier::Free => 0,
            PlanTier::Basic => 499_00,
            PlanTier::Pro => 999_00,
            PlanTier::Premium => 1_999_00,
        }
    }

    /// Credits granted when the plan starts or renews.
    pub fn credits(&self) -> i32 {
        match self {
            PlanTier::Free => 5,
            PlanTier::Basic => 50,
            PlanTier::Pro => 150,
            PlanTier::Premium => 500,
        }
    }

    pub fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            PlanTier::Free => None,
            _ => Some(now + Duration::days(PLAN_PERIOD_DAYS)),
        }
    }

    /// The tier that counts for access checks; lapsed paid plans fall back to free.
    pub fn effective(&self, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> PlanTier {
        match expires_at {
            Some(expiry) if *self != PlanTier::Free && expiry <= now => PlanTier::Free,
            _ => *self,
        }
    }

    pub fn can_use(&self, required: PlanTier) -> bool {
        *self >= required
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(PlanTier::Free),
            "basic" => Ok(PlanTier::Basic),
            "pro" => Ok(PlanTier::Pro),
            "premium" => Ok(PlanTier::Premium),
            other => Err(AppError::BadRequest(format!("unknown plan '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TopupPack {
    TopupSmall,
    TopupLarge,
}

impl TopupPack {
    pub const ALL: [TopupPack; 2] = [TopupPack::TopupSmall, TopupPack::TopupLarge];

    pub fn as_str(&self) -> &'static str {
        match self {
            TopupPack::TopupSmall => "topup_small",
            TopupPack::TopupLarge => "topup_large",
        }
    }

    pub fn price(&self) -> i64 {
        match self {
            TopupPack::TopupSmall => 199_00,
            TopupPack::TopupLarge => 699_00,
        }
    }

    pub fn credits(&self) -> i32 {
        match self {
            TopupPack::TopupSmall => 25,
            TopupPack::TopupLarge => 100,
        }
    }
}

impl FromStr for TopupPack {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "topup_small" => Ok(TopupPack::TopupSmall),
            "topup_large" => Ok(TopupPack::TopupLarge),
            other => Err(AppError::BadRequest(format!("unknown top-up pack '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Subscription,
    Topup,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Subscription => "subscription",
            TransactionKind::Topup => "topup",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription" => Ok(TransactionKind::Subscription),
            "topup" => Ok(TransactionKind::Topup),
            other => Err(AppError::Internal(anyhow::anyhow!(
                "unknown transaction kind '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStatus {
    Draft,
    Sent,
    Approved,
    Rejected,
}

impl EstimateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateStatus::Draft => "draft",
            EstimateStatus::Sent => "sent",
            EstimateStatus::Approved => "approved",
            EstimateStatus::Rejected => "rejected",
        }
    }

    pub fn can_transition_to(&self, next: EstimateStatus) -> bool {
        use EstimateStatus::*;
        matches!(
            (self, next),
            (Draft, Sent) | (Sent, Approved) | (Sent, Rejected) | (Sent, Draft) | (Rejected, Draft)
        )
    }

    /// Content (client, services, pricing) may only change before a decision.
    pub fn is_editable(&self) -> bool {
        matches!(self, EstimateStatus::Draft | EstimateStatus::Sent)
    }

    /// Whether the client-facing share link resolves.
    pub fn is_shareable(&self) -> bool {
        !matches!(self, EstimateStatus::Draft)
    }
}

impl FromStr for EstimateStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EstimateStatus::Draft),
            "sent" => Ok(EstimateStatus::Sent),
            "approved" => Ok(EstimateStatus::Approved),
            "rejected" => Ok(EstimateStatus::Rejected),
            other => Err(AppError::BadRequest(format!("unknown status '{other}'"))),
        }
    }
}

/// Credit counters on a studio account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditBalance {
    pub total: i32,
    pub left: i32,
    pub used: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purchase {
    Subscription(PlanTier),
    Topup(i32),
}

impl CreditBalance {
    /// A subscription resets the allotment; a top-up adds to it.
    pub fn apply(self, purchase: Purchase) -> CreditBalance {
        match purchase {
            Purchase::Subscription(plan) => CreditBalance {
                total: plan.credits(),
                left: plan.credits(),
                used: 0,
            },
            Purchase::Topup(credits) => CreditBalance {
                total: self.total.saturating_add(credits),
                left: self.left.saturating_add(credits),
                used: self.used,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered() {
        assert!(PlanTier::Free < PlanTier::Basic);
        assert!(PlanTier::Basic < PlanTier::Pro);
        assert!(PlanTier::Pro < PlanTier::Premium);
        assert!(PlanTier::Pro.can_use(PlanTier::Basic));
        assert!(!PlanTier::Basic.can_use(PlanTier::Premium));
    }

    #[test]
    fn tiers_parse_from_their_names() {
        for tier in PlanTier::ALL {
            assert_eq!(tier.as_str().parse::<PlanTier>().unwrap(), tier);
        }
        assert!("gold".parse::<PlanTier>().is_err());
    }

    #[test]
    fn lapsed_paid_plan_counts_as_free() {
        let now = Utc::now();
        let past = now - Duration::days(1);
        let future = now + Duration::days(1);
        assert_eq!(PlanTier::Pro.effective(Some(past), now), PlanTier::Free);
        assert_eq!(PlanTier::Pro.effective(Some(future), now), PlanTier::Pro);
        assert_eq!(PlanTier::Basic.effective(None, now), PlanTier::Basic);
    }

    #[test]
    fn only_paid_plans_expire() {
        let now = Utc::now();
        assert_eq!(PlanTier::Free.expiry_from(now), None);
        assert_eq!(
            PlanTier::Basic.expiry_from(now),
            Some(now + Duration::days(PLAN_PERIOD_DAYS))
        );
    }

    #[test]
    fn packs_parse_and_price() {
        for pack in TopupPack::ALL {
            assert_eq!(pack.as_str().parse::<TopupPack>().unwrap(), pack);
            assert!(pack.price() > 0);
            assert!(pack.credits() > 0);
        }
    }

    #[test]
    fn status_transitions() {
        use EstimateStatus::*;
        assert!(Draft.can_transition_to(Sent));
        assert!(Sent.can_transition_to(Approved));
        assert!(Sent.can_transition_to(Rejected));
        assert!(Rejected.can_transition_to(Draft));
        assert!(!Draft.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Draft));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Sent.can_transition_to(Sent));
    }

    #[test]
    fn decided_estimates_are_locked() {
        assert!(EstimateStatus::Draft.is_editable());
        assert!(EstimateStatus::Sent.is_editable());
        assert!(!EstimateStatus::Approved.is_editable());
        assert!(!EstimateStatus::Rejected.is_editable());
        assert!(!EstimateStatus::Draft.is_shareable());
    }

    #[test]
    fn subscription_resets_credits() {
        let before = CreditBalance {
            total: 50,
            left: 3,
            used: 47,
        };
        let after = before.apply(Purchase::Subscription(PlanTier::Pro));
        assert_eq!(
            after,
            CreditBalance {
                total: 150,
                left: 150,
                used: 0
            }
        );
    }

    #[test]
    fn topup_adds_to_existing_credits() {
        let before = CreditBalance {
            total: 50,
            left: 3,
            used: 47,
        };
        let after = before.apply(Purchase::Topup(TopupPack::TopupSmall.credits()));
        assert_eq!(
            after,
            CreditBalance {
                total: 75,
                left: 28,
                used: 47
            }
        );
    }
}
