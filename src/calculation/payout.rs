//! Payout calculation functionality.
//!
//! This module turns a [`RateOutcome`] into a [`Payout`] for one line item and
//! records the decision as an [`AuditStep`].

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::models::{
    AuditStep, LineItem, LinePayout, Payout, PayoutCategory, RateOutcome, ResolutionStrategy,
};

use super::rate_resolver::{RateContext, resolve_rate};

/// Share of the gross price paid on retail products (5%).
pub const RETAIL_SHARE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);
/// Share of the gross price paid on hair and lash services (50%).
pub const SERVICE_SHARE: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
/// Material deduction taken before the coloring share (10%).
pub const MATERIALS_DEDUCTION: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// The result of calculating one line item, including the audit step.
#[derive(Debug, Clone)]
pub struct LinePayoutResult {
    /// The payout line.
    pub line: LinePayout,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Applies a fixed category formula to a gross price.
///
/// # Example
///
/// ```
/// use commission_engine::calculation::category_payout;
/// use commission_engine::models::PayoutCategory;
/// use rust_decimal::Decimal;
///
/// let payout = category_payout(PayoutCategory::ColorTreatment, Decimal::from(1000));
/// assert_eq!(payout, Decimal::from(450));
/// ```
pub fn category_payout(category: PayoutCategory, gross_price: Decimal) -> Decimal {
    match category {
        PayoutCategory::ServiceToStaff => gross_price,
        PayoutCategory::RetailProduct => gross_price * RETAIL_SHARE,
        PayoutCategory::HaircutStyling => gross_price * SERVICE_SHARE,
        PayoutCategory::ColorTreatment => {
            (gross_price - gross_price * MATERIALS_DEDUCTION) * SERVICE_SHARE
        }
        PayoutCategory::LashesMakeup => gross_price * SERVICE_SHARE,
    }
}

/// Extracts the per-unit amount embedded in a textual rate.
///
/// All ASCII digits are concatenated and parsed as an integer; text without
/// digits yields `None`.
///
/// # Example
///
/// ```
/// use commission_engine::calculation::extract_amount;
/// use rust_decimal::Decimal;
///
/// assert_eq!(extract_amount("300 руб"), Some(Decimal::from(300)));
/// assert_eq!(extract_amount("по договоренности"), None);
/// ```
pub fn extract_amount(text: &str) -> Option<Decimal> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    Decimal::from_str(&digits).ok()
}

/// Calculates the payout for a resolved rate.
///
/// Formulas that need a gross price produce [`Payout::Blank`] when the price
/// is missing. A product outside the decimal range is also blank.
///
/// # Arguments
///
/// * `outcome` - The resolved rate
/// * `quantity` - Units sold on the row
/// * `gross_price` - The row's gross revenue, if present
///
/// # Examples
///
/// ```
/// use commission_engine::calculation::calculate_payout;
/// use commission_engine::models::{Payout, RateOutcome};
/// use rust_decimal::Decimal;
///
/// let payout = calculate_payout(
///     &RateOutcome::PerUnit(Decimal::from(150)),
///     Decimal::from(3),
///     None,
/// );
/// assert_eq!(payout, Payout::Amount(Decimal::from(450)));
/// ```
pub fn calculate_payout(
    outcome: &RateOutcome,
    quantity: Decimal,
    gross_price: Option<Decimal>,
) -> Payout {
    match outcome {
        RateOutcome::FixedCategory(category) => gross_price
            .map(|price| category_payout(*category, price))
            .into(),
        RateOutcome::PercentOfPrice(rate) => {
            gross_price.and_then(|price| rate.checked_mul(price)).into()
        }
        RateOutcome::PerUnit(rate) => rate.checked_mul(quantity).into(),
        RateOutcome::TextAmount(text) => extract_amount(text)
            .and_then(|amount| amount.checked_mul(quantity))
            .into(),
        RateOutcome::Unresolved => Payout::Blank,
    }
}

fn rule_name(strategy: ResolutionStrategy) -> &'static str {
    match strategy {
        ResolutionStrategy::Category => "Fixed Category Formula",
        ResolutionStrategy::Exact => "Exact Specialization Match",
        ResolutionStrategy::Alias => "Specialization Alias",
        ResolutionStrategy::Fuzzy => "Nearest Specialization",
        ResolutionStrategy::Unresolved => "No Rate Found",
        ResolutionStrategy::NotPayable => "Row Not Payable",
    }
}

fn describe_outcome(outcome: &RateOutcome) -> String {
    match outcome {
        RateOutcome::FixedCategory(category) => format!("category {:?}", category),
        RateOutcome::PercentOfPrice(rate) => format!("{} of gross price", rate.normalize()),
        RateOutcome::PerUnit(rate) => format!("{} per unit", rate.normalize()),
        RateOutcome::TextAmount(text) => format!("text rate '{}'", text),
        RateOutcome::Unresolved => "no rate".to_string(),
    }
}

fn payout_json(payout: Payout) -> serde_json::Value {
    match payout {
        Payout::Amount(amount) => serde_json::json!(amount.normalize().to_string()),
        Payout::Blank => serde_json::Value::Null,
    }
}

/// Resolves the rate and calculates the payout for one line item.
///
/// Rows without a procedure name or quantity are not payable and get a blank
/// payout without consulting the resolver.
///
/// # Arguments
///
/// * `item` - The transaction row
/// * `context` - The matched employee's rates and the fuzzy threshold
/// * `step_number` - The step number for audit trail sequencing
pub fn calculate_line_payout(
    item: &LineItem,
    context: &RateContext,
    step_number: u32,
) -> LinePayoutResult {
    let input = serde_json::json!({
        "row": item.row_index + 1,
        "procedure": item.procedure_name,
        "quantity": item.quantity.map(|q| q.normalize().to_string()),
        "gross_price": item.gross_price.map(|p| p.normalize().to_string()),
    });

    let (procedure, quantity) = match (&item.procedure_name, item.quantity) {
        (Some(procedure), Some(quantity)) if item.is_payable() => (procedure, quantity),
        _ => {
            let line = LinePayout {
                row_index: item.row_index,
                procedure_name: item.procedure_name.clone(),
                payout: Payout::Blank,
                strategy: ResolutionStrategy::NotPayable,
                matched_key: None,
            };
            let audit_step = AuditStep {
                step_number,
                rule_id: ResolutionStrategy::NotPayable.as_str().to_string(),
                rule_name: rule_name(ResolutionStrategy::NotPayable).to_string(),
                input,
                output: serde_json::json!({ "payout": null }),
                reasoning: "Row has no procedure name or quantity; payout left blank".to_string(),
            };
            return LinePayoutResult { line, audit_step };
        }
    };

    let resolution = resolve_rate(procedure, context);
    let payout = calculate_payout(&resolution.outcome, quantity, item.gross_price);

    let reasoning = match (&resolution.matched_key, resolution.score) {
        (Some(key), Some(score)) => format!(
            "'{}' matched '{}' (similarity {:.3}): {}",
            procedure,
            key,
            score,
            describe_outcome(&resolution.outcome)
        ),
        (Some(key), None) => format!(
            "'{}' matched '{}': {}",
            procedure,
            key,
            describe_outcome(&resolution.outcome)
        ),
        (None, _) => format!("'{}': {}", procedure, describe_outcome(&resolution.outcome)),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: resolution.strategy.as_str().to_string(),
        rule_name: rule_name(resolution.strategy).to_string(),
        input,
        output: serde_json::json!({
            "outcome": resolution.outcome,
            "matched_key": resolution.matched_key,
            "payout": payout_json(payout),
        }),
        reasoning,
    };

    LinePayoutResult {
        line: LinePayout {
            row_index: item.row_index,
            procedure_name: Some(procedure.clone()),
            payout,
            strategy: resolution.strategy,
            matched_key: resolution.matched_key,
        },
        audit_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RateValue;
    use indexmap::IndexMap;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(procedure: Option<&str>, quantity: Option<&str>, price: Option<&str>) -> LineItem {
        LineItem {
            row_index: 1,
            procedure_name: procedure.map(str::to_string),
            quantity: quantity.map(dec),
            gross_price: price.map(dec),
        }
    }

    fn context() -> RateContext {
        let mut rates = IndexMap::new();
        rates.insert("МАНИКЮР-ПЕДИКЮР".to_string(), RateValue::Number(dec("0.4")));
        rates.insert("ПИЛИНГ".to_string(), RateValue::Number(dec("150")));
        rates.insert("МАССАЖ лица".to_string(), RateValue::Text("300 руб".to_string()));
        RateContext::new(rates, 0.8)
    }

    /// PC-001: haircut category pays half the gross price
    #[test]
    fn test_haircut_category() {
        let payout = calculate_payout(
            &RateOutcome::FixedCategory(PayoutCategory::HaircutStyling),
            dec("1"),
            Some(dec("1000")),
        );
        assert_eq!(payout, Payout::Amount(dec("500")));
    }

    /// PC-002: coloring deducts materials before the half share
    #[test]
    fn test_color_category() {
        let payout = calculate_payout(
            &RateOutcome::FixedCategory(PayoutCategory::ColorTreatment),
            dec("1"),
            Some(dec("1000")),
        );
        assert_eq!(payout, Payout::Amount(dec("450")));
    }

    /// PC-003: rate above 100 is per unit
    #[test]
    fn test_per_unit_rate() {
        let payout = calculate_payout(&RateOutcome::PerUnit(dec("150")), dec("3"), Some(dec("9999")));
        assert_eq!(payout, Payout::Amount(dec("450")));
    }

    /// PC-004: rate up to 100 is a fraction of gross price
    #[test]
    fn test_percent_rate() {
        let payout = calculate_payout(
            &RateOutcome::PercentOfPrice(dec("0.4")),
            dec("2"),
            Some(dec("1000")),
        );
        assert_eq!(payout, Payout::Amount(dec("400")));
    }

    /// PC-005: textual rate carries a per-unit amount
    #[test]
    fn test_text_rate() {
        let payout = calculate_payout(
            &RateOutcome::TextAmount("300 руб".to_string()),
            dec("2"),
            None,
        );
        assert_eq!(payout, Payout::Amount(dec("600")));
    }

    /// PC-006: text without digits is blank
    #[test]
    fn test_text_rate_without_digits_is_blank() {
        let payout = calculate_payout(
            &RateOutcome::TextAmount("бесплатно".to_string()),
            dec("2"),
            Some(dec("1000")),
        );
        assert_eq!(payout, Payout::Blank);
    }

    /// PC-009: a product out of decimal range is blank
    #[test]
    fn test_overflowing_product_is_blank() {
        let long_text = "9".repeat(28);
        assert!(extract_amount(&long_text).is_some());
        let payout = calculate_payout(&RateOutcome::TextAmount(long_text), dec("10"), None);
        assert_eq!(payout, Payout::Blank);

        let payout = calculate_payout(&RateOutcome::PerUnit(Decimal::MAX), dec("2"), None);
        assert_eq!(payout, Payout::Blank);

        let payout = calculate_payout(
            &RateOutcome::PercentOfPrice(dec("100")),
            dec("1"),
            Some(Decimal::MAX),
        );
        assert_eq!(payout, Payout::Blank);
    }

    /// PC-007: unresolved is blank, not zero
    #[test]
    fn test_unresolved_is_blank() {
        let payout = calculate_payout(&RateOutcome::Unresolved, dec("1"), Some(dec("1000")));
        assert_eq!(payout, Payout::Blank);
    }

    #[test]
    fn test_remaining_categories() {
        let price = Some(dec("1000"));
        let pay = |category| calculate_payout(&RateOutcome::FixedCategory(category), dec("1"), price);
        assert_eq!(pay(PayoutCategory::ServiceToStaff), Payout::Amount(dec("1000")));
        assert_eq!(pay(PayoutCategory::RetailProduct), Payout::Amount(dec("50")));
        assert_eq!(pay(PayoutCategory::LashesMakeup), Payout::Amount(dec("500")));
    }

    #[test]
    fn test_category_without_price_is_blank() {
        let payout = calculate_payout(
            &RateOutcome::FixedCategory(PayoutCategory::HaircutStyling),
            dec("1"),
            None,
        );
        assert_eq!(payout, Payout::Blank);
    }

    #[test]
    fn test_extract_amount_concatenates_digits() {
        assert_eq!(extract_amount("1 500 руб."), Some(dec("1500")));
        assert_eq!(extract_amount(""), None);
    }

    /// PC-008: empty quantity is blank regardless of name and price
    #[test]
    fn test_line_without_quantity_is_blank() {
        let result = calculate_line_payout(&item(Some("СТРИЖКИ"), None, Some("1000")), &context(), 1);
        assert_eq!(result.line.payout, Payout::Blank);
        assert_eq!(result.line.strategy, ResolutionStrategy::NotPayable);
        assert_eq!(result.audit_step.rule_id, "not_payable");
    }

    #[test]
    fn test_line_through_alias_records_audit() {
        let result = calculate_line_payout(&item(Some("МАНИКЮР"), Some("1"), Some("2000")), &context(), 7);
        assert_eq!(result.line.payout, Payout::Amount(dec("800")));
        assert_eq!(result.line.strategy, ResolutionStrategy::Alias);
        assert_eq!(result.line.matched_key.as_deref(), Some("МАНИКЮР-ПЕДИКЮР"));
        assert_eq!(result.audit_step.step_number, 7);
        assert_eq!(result.audit_step.rule_id, "alias");
        assert_eq!(result.audit_step.output["payout"].as_str().unwrap(), "800");
        assert!(result.audit_step.reasoning.contains("МАНИКЮР-ПЕДИКЮР"));
    }

    #[test]
    fn test_line_category_ignores_rulebook() {
        let result = calculate_line_payout(&item(Some("ОКРАШИВАНИЕ ВОЛОС"), Some("1"), Some("1000")), &context(), 1);
        assert_eq!(result.line.payout, Payout::Amount(dec("450")));
        assert_eq!(result.line.strategy, ResolutionStrategy::Category);
    }

    #[test]
    fn test_line_unresolved_has_null_payout_in_audit() {
        let result = calculate_line_payout(&item(Some("ЭПИЛЯЦИЯ"), Some("1"), Some("1000")), &context(), 1);
        assert_eq!(result.line.payout, Payout::Blank);
        assert_eq!(result.line.strategy, ResolutionStrategy::Unresolved);
        assert!(result.audit_step.output["payout"].is_null());
    }
}
