//! Payout categories, resolved rate outcomes and payout values.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed procedure categories with hardcoded payout formulas.
///
/// These are checked before any rulebook lookup.
///
/// # Example
///
/// ```
/// use commission_engine::models::PayoutCategory;
///
/// assert_eq!(PayoutCategory::from_label("СТРИЖКИ"), Some(PayoutCategory::HaircutStyling));
/// assert_eq!(PayoutCategory::from_label("УКЛАДКИ"), Some(PayoutCategory::HaircutStyling));
/// assert_eq!(PayoutCategory::from_label("МАНИКЮР"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutCategory {
    /// Services rendered to staff: the full gross price is paid out.
    ServiceToStaff,
    /// Retail products: 5% of the gross price.
    RetailProduct,
    /// Haircuts and styling: 50% of the gross price.
    HaircutStyling,
    /// Hair coloring and treatments: 50% of the gross price less 10%.
    ColorTreatment,
    /// Lashes and makeup: 50% of the gross price.
    LashesMakeup,
}

impl PayoutCategory {
    /// Every category, in declaration order.
    pub const ALL: [PayoutCategory; 5] = [
        PayoutCategory::ServiceToStaff,
        PayoutCategory::RetailProduct,
        PayoutCategory::HaircutStyling,
        PayoutCategory::ColorTreatment,
        PayoutCategory::LashesMakeup,
    ];

    /// The procedure labels that select this category.
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            PayoutCategory::ServiceToStaff => &["УСЛУГИ СОТРУДНИКАМ"],
            PayoutCategory::RetailProduct => &["ТОВАРЫ НА ПРОДАЖУ"],
            PayoutCategory::HaircutStyling => &["СТРИЖКИ", "УКЛАДКИ"],
            PayoutCategory::ColorTreatment => &["ОКРАШИВАНИЕ ВОЛОС", "УХОДЫ ДЛЯ ВОЛОС"],
            PayoutCategory::LashesMakeup => &["РЕСНИЦЫ", "ВИЗАЖ"],
        }
    }

    /// Looks up the category for an exact procedure label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.labels().contains(&label))
    }
}

/// The outcome of rate resolution for one procedure.
///
/// Produced by the rate resolver and consumed exhaustively by the payout
/// calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RateOutcome {
    /// A hardcoded category formula applies.
    FixedCategory(PayoutCategory),
    /// A numeric rate up to 100, applied as a fraction of the gross price.
    PercentOfPrice(Decimal),
    /// A numeric rate above 100, applied per unit sold.
    PerUnit(Decimal),
    /// A textual rate carrying an embedded per-unit amount.
    TextAmount(String),
    /// No rate could be found.
    Unresolved,
}

/// A computed payout or the blank marker.
///
/// Blank means "not computed" and is distinct from zero: it stays empty in
/// the output sheet and is excluded from the file total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payout {
    /// A computed amount.
    Amount(Decimal),
    /// Not computed.
    Blank,
}

impl Payout {
    /// Returns the amount, or `None` when blank.
    pub fn amount(self) -> Option<Decimal> {
        match self {
            Payout::Amount(amount) => Some(amount),
            Payout::Blank => None,
        }
    }

    /// Returns `true` for [`Payout::Blank`].
    pub fn is_blank(self) -> bool {
        matches!(self, Payout::Blank)
    }
}

impl From<Option<Decimal>> for Payout {
    fn from(value: Option<Decimal>) -> Self {
        value.map_or(Payout::Blank, Payout::Amount)
    }
}

/// The strategy that produced a [`RateOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Hardcoded category label.
    Category,
    /// Exact specialization match.
    Exact,
    /// Alias table, then exact match.
    Alias,
    /// Nearest specialization by string similarity.
    Fuzzy,
    /// Nothing matched.
    Unresolved,
    /// The row lacks a procedure name or quantity.
    NotPayable,
}

impl ResolutionStrategy {
    /// A stable identifier used in audit steps.
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionStrategy::Category => "category",
            ResolutionStrategy::Exact => "exact",
            ResolutionStrategy::Alias => "alias",
            ResolutionStrategy::Fuzzy => "fuzzy",
            ResolutionStrategy::Unresolved => "unresolved",
            ResolutionStrategy::NotPayable => "not_payable",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
