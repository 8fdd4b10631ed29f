//! Estimate arithmetic.
//!
//! Every path that persists an estimate goes through [`compute`], so stored
//! `subtotal`/`discount_amount`/`tax_amount`/`net_total` always agree with the
//! stored line items. Amounts are paise; percentages are resolved to basis
//! points and rounded half-up.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::error::AppError;

const MAX_ITEMS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Adjustment {
    /// Percentage in `0..=100`.
    Percentage(f64),
    /// Absolute amount in paise.
    Fixed(i64),
}

impl Default for Adjustment {
    fn default() -> Self {
        Adjustment::Fixed(0)
    }
}

impl Adjustment {
    pub fn kind(&self) -> &'static str {
        match self {
            Adjustment::Percentage(_) => "percentage",
            Adjustment::Fixed(_) => "fixed",
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Adjustment::Percentage(pct) => *pct,
            Adjustment::Fixed(amount) => *amount as f64,
        }
    }

    /// Rebuild from the `(type, value)` column pair.
    pub fn from_parts(kind: &str, value: f64) -> Self {
        match kind {
            "percentage" => Adjustment::Percentage(value),
            _ => Adjustment::Fixed(value.round() as i64),
        }
    }

    fn validate(&self) -> Result<(), TotalsError> {
        match *self {
            Adjustment::Percentage(pct) => {
                if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
                    return Err(TotalsError::PercentageOutOfRange(pct));
                }
            }
            Adjustment::Fixed(amount) => {
                if amount < 0 {
                    return Err(TotalsError::NegativeAmount(amount));
                }
            }
        }
        Ok(())
    }

    /// Amount this adjustment represents against `base`.
    fn amount_on(&self, base: i64) -> Result<i64, TotalsError> {
        match *self {
            Adjustment::Percentage(pct) => percent_of(base, pct),
            Adjustment::Fixed(amount) => Ok(amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct LineItemInput {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    /// Paise.
    pub unit_price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Totals {
    pub subtotal: i64,
    pub discount_amount: i64,
    pub tax_amount: i64,
    pub net_total: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Computed {
    pub items: Vec<LineItem>,
    pub totals: Totals,
}

#[derive(Debug, Error, PartialEq)]
pub enum TotalsError {
    #[error("at least one service is required")]
    NoItems,
    #[error("too many services (max 200)")]
    TooManyItems,
    #[error("service #{0} has an empty name")]
    EmptyName(usize),
    #[error("service #{0} must have a quantity of at least 1")]
    InvalidQuantity(usize),
    #[error("service #{0} has a negative price")]
    NegativePrice(usize),
    #[error("percentage {0} must be between 0 and 100")]
    PercentageOutOfRange(f64),
    #[error("amount {0} must not be negative")]
    NegativeAmount(i64),
    #[error("amount is too large")]
    Overflow,
}

impl From<TotalsError> for AppError {
    fn from(err: TotalsError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

pub fn compute(
    inputs: &[LineItemInput],
    discount: Adjustment,
    tax: Adjustment,
) -> Result<Computed, TotalsError> {
    if inputs.is_empty() {
        return Err(TotalsError::NoItems);
    }
    if inputs.len() > MAX_ITEMS {
        return Err(TotalsError::TooManyItems);
    }
    discount.validate()?;
    tax.validate()?;

    let mut items = Vec::with_capacity(inputs.len());
    let mut subtotal: i64 = 0;
    for (idx, input) in inputs.iter().enumerate() {
        let position = idx + 1;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(TotalsError::EmptyName(position));
        }
        if input.quantity < 1 {
            return Err(TotalsError::InvalidQuantity(position));
        }
        if input.unit_price < 0 {
            return Err(TotalsError::NegativePrice(position));
        }
        let total = input
            .unit_price
            .checked_mul(i64::from(input.quantity))
            .ok_or(TotalsError::Overflow)?;
        subtotal = subtotal.checked_add(total).ok_or(TotalsError::Overflow)?;
        items.push(LineItem {
            name: name.to_string(),
            description: input
                .description
                .as_ref()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            quantity: input.quantity,
            unit_price: input.unit_price,
            total,
        });
    }

    let discount_amount = discount.amount_on(subtotal)?.clamp(0, subtotal);
    let after_discount = subtotal - discount_amount;
    let tax_amount = tax.amount_on(after_discount)?;
    let net_total = after_discount
        .checked_add(tax_amount)
        .ok_or(TotalsError::Overflow)?
        .max(0);

    Ok(Computed {
        items,
        totals: Totals {
            subtotal,
            discount_amount,
            tax_amount,
            net_total,
        },
    })
}

/// `base * pct / 100`, with `pct` resolved to basis points.
fn percent_of(base: i64, pct: f64) -> Result<i64, TotalsError> {
    let bps = (pct * 100.0).round() as i128;
    let scaled = i128::from(base) * bps;
    let rounded = (scaled + 5_000) / 10_000;
    i64::try_from(rounded).map_err(|_| TotalsError::Overflow)
}

impl From<&LineItem> for LineItemInput {
    fn from(item: &LineItem) -> Self {
        Self {
            name: item.name.clone(),
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}
