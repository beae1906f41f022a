//! Rate resolution for a single procedure name.
//!
//! Resolution is an ordered chain of named strategies; the first strategy
//! that returns a [`Resolution`] wins:
//!
//! 1. [`resolve_category`]: hardcoded [`PayoutCategory`] labels, rulebook skipped
//! 2. [`resolve_exact`]: exact specialization lookup
//! 3. [`resolve_alias`]: alias table, then exact lookup of the canonical label
//! 4. [`resolve_fuzzy`]: most similar specialization above the threshold
//!
//! When every strategy misses, the outcome is [`RateOutcome::Unresolved`].

use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::models::{PayoutCategory, RateOutcome, RateValue, ResolutionStrategy};

use super::similarity::similarity;

/// Numeric rates above this value are per-unit amounts; rates at or below it
/// are fractions of the gross price.
pub const PER_UNIT_RATE_THRESHOLD: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Colloquial labels and the canonical rulebook specialization they stand for.
pub const SPECIALIZATION_ALIASES: [(&str, &str); 5] = [
    ("МАНИКЮР", "МАНИКЮР-ПЕДИКЮР"),
    ("ПЕДИКЮР", "МАНИКЮР-ПЕДИКЮР"),
    ("ВИЗАЖ", "РЕСНИЦЫ, ВИЗАЖ"),
    ("РЕСНИЦЫ", "РЕСНИЦЫ, ВИЗАЖ"),
    ("МАССАЖ", "МАССАЖ лица"),
];

/// Returns the canonical specialization for a colloquial label.
pub fn alias_for(label: &str) -> Option<&'static str> {
    SPECIALIZATION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == label)
        .map(|(_, canonical)| *canonical)
}

/// The rates available to one employee plus the fuzzy-match threshold.
#[derive(Debug, Clone)]
pub struct RateContext {
    /// Specialization to rate mapping of the matched employee.
    pub rates: IndexMap<String, RateValue>,
    /// Minimum similarity for [`resolve_fuzzy`], exclusive.
    pub threshold: f64,
}

impl RateContext {
    /// Creates a context from a rate mapping and a similarity threshold.
    pub fn new(rates: IndexMap<String, RateValue>, threshold: f64) -> Self {
        Self { rates, threshold }
    }
}

/// The result of resolving one procedure name.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The resolved outcome.
    pub outcome: RateOutcome,
    /// The strategy that produced it.
    pub strategy: ResolutionStrategy,
    /// The specialization key used, for table-based strategies.
    pub matched_key: Option<String>,
    /// The similarity score, for the fuzzy strategy.
    pub score: Option<f64>,
}

/// A single resolution strategy.
pub type ResolverFn = fn(&str, &RateContext) -> Option<Resolution>;

/// The resolution chain in priority order.
pub const RESOLUTION_CHAIN: [(ResolutionStrategy, ResolverFn); 4] = [
    (ResolutionStrategy::Category, resolve_category),
    (ResolutionStrategy::Exact, resolve_exact),
    (ResolutionStrategy::Alias, resolve_alias),
    (ResolutionStrategy::Fuzzy, resolve_fuzzy),
];

/// Classifies a rulebook value into a [`RateOutcome`].
///
/// # Example
///
/// ```
/// use commission_engine::calculation::classify_rate;
/// use commission_engine::models::{RateOutcome, RateValue};
/// use rust_decimal::Decimal;
///
/// assert_eq!(
///     classify_rate(&RateValue::Number(Decimal::from(150))),
///     RateOutcome::PerUnit(Decimal::from(150))
/// );
/// assert_eq!(
///     classify_rate(&RateValue::Number(Decimal::from(100))),
///     RateOutcome::PercentOfPrice(Decimal::from(100))
/// );
/// ```
pub fn classify_rate(value: &RateValue) -> RateOutcome {
    match value {
        RateValue::Number(rate) if *rate > PER_UNIT_RATE_THRESHOLD => RateOutcome::PerUnit(*rate),
        RateValue::Number(rate) => RateOutcome::PercentOfPrice(*rate),
        RateValue::Text(text) => RateOutcome::TextAmount(text.clone()),
    }
}

fn table_hit(strategy: ResolutionStrategy, key: &str, value: &RateValue) -> Resolution {
    Resolution {
        outcome: classify_rate(value),
        strategy,
        matched_key: Some(key.to_string()),
        score: None,
    }
}

/// Hardcoded category labels short-circuit the rulebook.
pub fn resolve_category(procedure: &str, _context: &RateContext) -> Option<Resolution> {
    PayoutCategory::from_label(procedure).map(|category| Resolution {
        outcome: RateOutcome::FixedCategory(category),
        strategy: ResolutionStrategy::Category,
        matched_key: None,
        score: None,
    })
}

/// Exact lookup of the procedure name among the employee's specializations.
pub fn resolve_exact(procedure: &str, context: &RateContext) -> Option<Resolution> {
    context
        .rates
        .get_key_value(procedure)
        .map(|(key, value)| table_hit(ResolutionStrategy::Exact, key, value))
}

/// Alias lookup followed by an exact lookup of the canonical label.
pub fn resolve_alias(procedure: &str, context: &RateContext) -> Option<Resolution> {
    let canonical = alias_for(procedure)?;
    context
        .rates
        .get_key_value(canonical)
        .map(|(key, value)| table_hit(ResolutionStrategy::Alias, key, value))
}

/// Picks the specialization most similar to the procedure name.
///
/// Only scores strictly above the threshold qualify. On equal scores the key
/// met first in mapping order wins.
pub fn resolve_fuzzy(procedure: &str, context: &RateContext) -> Option<Resolution> {
    let mut best: Option<(&String, &RateValue, f64)> = None;
    let mut best_score = context.threshold;

    for (key, value) in &context.rates {
        let score = similarity(procedure, key);
        if score > best_score {
            best_score = score;
            best = Some((key, value, score));
        }
    }

    best.map(|(key, value, score)| Resolution {
        score: Some(score),
        ..table_hit(ResolutionStrategy::Fuzzy, key, value)
    })
}

/// Runs the resolution chain for one procedure name.
///
/// # Example
///
/// ```
/// use commission_engine::calculation::{RateContext, resolve_rate};
/// use commission_engine::models::{RateOutcome, RateValue, ResolutionStrategy};
/// use indexmap::IndexMap;
/// use rust_decimal::Decimal;
///
/// let mut rates = IndexMap::new();
/// rates.insert("МАНИКЮР-ПЕДИКЮР".to_string(), RateValue::Number(Decimal::new(4, 1)));
/// let context = RateContext::new(rates, 0.8);
///
/// let resolution = resolve_rate("МАНИКЮР", &context);
/// assert_eq!(resolution.strategy, ResolutionStrategy::Alias);
/// assert_eq!(resolution.outcome, RateOutcome::PercentOfPrice(Decimal::new(4, 1)));
/// ```
pub fn resolve_rate(procedure: &str, context: &RateContext) -> Resolution {
    RESOLUTION_CHAIN
        .iter()
        .find_map(|(_, resolver)| resolver(procedure, context))
        .unwrap_or(Resolution {
            outcome: RateOutcome::Unresolved,
            strategy: ResolutionStrategy::Unresolved,
            matched_key: None,
            score: None,
        })
}
