//! Pairwise compatibility evaluation over a rule snapshot.
//!
//! Evaluation order:
//! 1. class vs class, every pair of known classes, both directions;
//! 2. group vs group;
//! 3. class vs group, each item's classes against the other item's groups;
//! 4. conditions of every rule matched above.
//!
//! Nothing short-circuits: the verdict lists every objection and caveat.
//! Only an `INCOMPATIBLE_PROHIBITED` reason makes a pair incompatible.

use serde::Serialize;

use crate::item::DangerousGoodsItem;
use crate::profile::HazardProfile;
use crate::rules::{CompatibilityStatus, ConditionType, Operand, RuleType, SegregationRule};
use crate::store::RuleStore;

/// Verdict used when no rule relates a pair at all. Callers can tell this
/// case apart through `rules_matched == 0`.
pub const DEFAULT_WHEN_UNSPECIFIED: CompatibilityStatus = CompatibilityStatus::Compatible;

const NO_REASON_PROVIDED: &str = "No specific reason provided";

/// One itemized objection or caveat.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Reason {
    pub rule_type: RuleType,
    pub primary: Operand,
    pub secondary: Operand,
    pub status: CompatibilityStatus,
    /// Set when this reason comes from a triggered rule condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_regulation: Option<String>,
    pub message: String,
}

impl Reason {
    pub fn is_prohibition(&self) -> bool {
        self.status.is_prohibition()
    }
}

/// Result of evaluating one pair. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityVerdict {
    pub compatible: bool,
    pub reasons: Vec<Reason>,
    /// Distinct rules that related the pair, including `COMPATIBLE` ones.
    pub rules_matched: usize,
}

impl CompatibilityVerdict {
    pub fn prohibitions(&self) -> impl Iterator<Item = &Reason> {
        self.reasons.iter().filter(|r| r.is_prohibition())
    }

    /// Caveats that do not by themselves block the pair.
    pub fn warnings(&self) -> impl Iterator<Item = &Reason> {
        self.reasons.iter().filter(|r| !r.is_prohibition())
    }

    pub fn has_caveats(&self) -> bool {
        self.warnings().next().is_some()
    }

    /// Compatible with nothing to report.
    pub fn is_clean(&self) -> bool {
        self.compatible && self.reasons.is_empty()
    }

    /// Reasons in canonical order, for comparing verdicts of `(A, B)` and `(B, A)`.
    pub fn sorted_reasons(&self) -> Vec<&Reason> {
        let mut reasons: Vec<&Reason> = self.reasons.iter().collect();
        reasons.sort();
        reasons
    }
}

/// Stateless evaluator bound to one rule snapshot.
#[derive(Debug, Clone, Copy)]
pub struct CompatibilityEvaluator<'a> {
    store: &'a RuleStore,
}

impl<'a> CompatibilityEvaluator<'a> {
    pub fn new(store: &'a RuleStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a RuleStore {
        self.store
    }

    pub fn evaluate_items(&self, a: &DangerousGoodsItem, b: &DangerousGoodsItem) -> CompatibilityVerdict {
        self.evaluate(&HazardProfile::from_item(a), &HazardProfile::from_item(b))
    }

    pub fn evaluate(&self, a: &HazardProfile, b: &HazardProfile) -> CompatibilityVerdict {
        let matched = self.matching_rules(a, b);

        let mut reasons: Vec<Reason> = matched
            .iter()
            .filter(|rule| rule.compatibility_status.raises_reason())
            .map(|rule| self.status_reason(rule))
            .collect();

        reasons.extend(
            matched
                .iter()
                .filter(|rule| condition_holds(rule, a, b))
                .map(|rule| self.condition_reason(rule)),
        );

        let compatible = if matched.is_empty() {
            tracing::trace!(
                a = %a.un_number,
                b = %b.un_number,
                default = %DEFAULT_WHEN_UNSPECIFIED,
                "No segregation rule relates pair"
            );
            !DEFAULT_WHEN_UNSPECIFIED.is_prohibition()
        } else {
            !reasons.iter().any(Reason::is_prohibition)
        };

        CompatibilityVerdict {
            compatible,
            reasons,
            rules_matched: matched.len(),
        }
    }

    /// Rules relating the pair, in evaluation-step order, each listed once.
    fn matching_rules(&self, a: &HazardProfile, b: &HazardProfile) -> Vec<&'a SegregationRule> {
        let mut matched: Vec<&'a SegregationRule> = Vec::new();
        let mut record = |rules: Vec<&'a SegregationRule>| {
            for rule in rules {
                if !matched.iter().any(|m| std::ptr::eq(*m, rule)) {
                    matched.push(rule);
                }
            }
        };

        for ca in a.known_classes() {
            for cb in b.known_classes() {
                record(self.store.class_rules(ca, cb));
            }
        }

        for ga in &a.groups {
            for gb in &b.groups {
                record(self.store.group_rules(ga, gb));
            }
        }

        for ca in a.known_classes() {
            for gb in &b.groups {
                record(self.store.class_group_rules(ca, gb));
            }
        }
        for cb in b.known_classes() {
            for ga in &a.groups {
                record(self.store.class_group_rules(cb, ga));
            }
        }

        matched
    }

    fn status_reason(&self, rule: &SegregationRule) -> Reason {
        let primary = self.describe(&rule.primary);
        let secondary = self.describe(&rule.secondary);
        let notes = rule.notes.as_deref().unwrap_or(NO_REASON_PROVIDED);
        let status = rule.compatibility_status;

        let message = match status {
            CompatibilityStatus::IncompatibleProhibited => format!(
                "{} is incompatible with {secondary} ({}): {notes}",
                capitalize(&primary),
                status.label()
            ),
            CompatibilityStatus::ConditionalNotes => format!(
                "{} vs {secondary} requires special consideration: {notes}",
                capitalize(&primary)
            ),
            CompatibilityStatus::AwayFrom | CompatibilityStatus::SeparatedFrom => format!(
                "{} must be {} {secondary}: {notes}",
                capitalize(&primary),
                status.label().to_lowercase()
            ),
            CompatibilityStatus::Compatible => format!(
                "{} is compatible with {secondary}",
                capitalize(&primary)
            ),
        };

        self.reason(rule, status, None, message)
    }

    fn condition_reason(&self, rule: &SegregationRule) -> Reason {
        let notes = rule.notes.as_deref().unwrap_or(NO_REASON_PROVIDED);
        let mut message = format!(
            "{} ({} vs {}): {notes}",
            rule.condition_type.label(),
            self.describe(&rule.primary),
            self.describe(&rule.secondary)
        );
        if let Some(value) = &rule.condition_value {
            message.push_str(&format!(" [{value}]"));
        }
        self.reason(
            rule,
            CompatibilityStatus::ConditionalNotes,
            Some(rule.condition_type),
            message,
        )
    }

    fn reason(
        &self,
        rule: &SegregationRule,
        status: CompatibilityStatus,
        condition: Option<ConditionType>,
        message: String,
    ) -> Reason {
        Reason {
            rule_type: rule.rule_type,
            primary: rule.primary.clone(),
            secondary: rule.secondary.clone(),
            status,
            condition,
            condition_value: condition.and(rule.condition_value.clone()),
            source_regulation: rule.source_regulation.clone(),
            message,
        }
    }

    fn describe(&self, operand: &Operand) -> String {
        match operand {
            Operand::Class(class) => format!("class {class}"),
            Operand::Group(code) => {
                let name = self.store.group_name(code);
                if name == code.as_str() {
                    format!("group {code}")
                } else {
                    format!("group {name} ({code})")
                }
            }
        }
    }
}

/// Whether `profile` sits on the `operand` side of a rule.
fn on_side(profile: &HazardProfile, operand: &Operand) -> bool {
    match operand {
        Operand::Class(class) => profile.carries(class),
        Operand::Group(code) => profile.in_group(code),
    }
}

/// `(primary-side item, secondary-side item)` assignments consistent with the rule.
fn orientations<'p>(
    rule: &SegregationRule,
    a: &'p HazardProfile,
    b: &'p HazardProfile,
) -> Vec<(&'p HazardProfile, &'p HazardProfile)> {
    let mut out = Vec::with_capacity(2);
    if on_side(a, &rule.primary) && on_side(b, &rule.secondary) {
        out.push((a, b));
    }
    if on_side(b, &rule.primary) && on_side(a, &rule.secondary) {
        out.push((b, a));
    }
    out
}

fn condition_holds(rule: &SegregationRule, a: &HazardProfile, b: &HazardProfile) -> bool {
    match rule.condition_type {
        ConditionType::None => false,
        ConditionType::BothBulk => a.is_bulk && b.is_bulk,
        ConditionType::EitherBulk => a.is_bulk || b.is_bulk,
        ConditionType::PrimaryFireRisk => orientations(rule, a, b)
            .iter()
            .any(|(primary, _)| primary.is_fire_risk),
        ConditionType::SecondaryFireRisk => orientations(rule, a, b)
            .iter()
            .any(|(_, secondary)| secondary.is_fire_risk),
        ConditionType::Class9LithiumFireRisk => a.is_lithium_battery || b.is_lithium_battery,
        ConditionType::AwayFromFoodstuffs => a.is_food_sensitive() || b.is_food_sensitive(),
        ConditionType::Class1Legislation => a.is_explosive() || b.is_explosive(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazard::HazardClass;
    use crate::item::SegregationGroup;
    use crate::rules::CompatibilityStatus::*;

    fn hc(s: &str) -> HazardClass {
        s.parse().unwrap()
    }

    fn store(rules: Vec<SegregationRule>) -> RuleStore {
        let mut builder = RuleStore::empty().to_builder();
        builder.register_group(SegregationGroup::new("SGG1a", "Strong acids"));
        builder.register_group(SegregationGroup::new("SGG18", "Alkalis"));
        builder.register_group(SegregationGroup::new("FOOD", "Foodstuffs"));
        for rule in rules {
            builder.overwrite(rule);
        }
        builder.build()
    }

    fn item(un: &str, class: &str) -> DangerousGoodsItem {
        DangerousGoodsItem::new(un, class)
    }

    #[test]
    fn no_rules_defaults_to_compatible() {
        let store = store(vec![]);
        let verdict = CompatibilityEvaluator::new(&store)
            .evaluate_items(&item("UN1203", "3"), &item("UN1830", "8"));
        assert!(verdict.compatible);
        assert!(verdict.is_clean());
        assert_eq!(verdict.rules_matched, 0);
    }

    #[test]
    fn prohibition_makes_pair_incompatible() {
        let store = store(vec![SegregationRule::classes(hc("1"), hc("3"), IncompatibleProhibited)]);
        let verdict = CompatibilityEvaluator::new(&store)
            .evaluate_items(&item("UN1203", "3"), &item("UN0081", "1.1D"));
        assert!(!verdict.compatible);
        assert_eq!(verdict.prohibitions().count(), 1);
        assert_eq!(
            verdict.reasons[0].message,
            "Class 1 is incompatible with class 3 (Incompatible - Prohibited): No specific reason provided"
        );
    }

    #[test]
    fn compatible_rule_raises_no_reason() {
        let store = store(vec![SegregationRule::classes(hc("3"), hc("8"), Compatible)]);
        let verdict = CompatibilityEvaluator::new(&store)
            .evaluate_items(&item("UN1203", "3"), &item("UN1830", "8"));
        assert!(verdict.is_clean());
        assert_eq!(verdict.rules_matched, 1);
    }

    #[test]
    fn warnings_do_not_block() {
        let store = store(vec![
            SegregationRule::classes(hc("6.1"), hc("8"), SeparatedFrom).with_notes("3 m minimum")
        ]);
        let verdict = CompatibilityEvaluator::new(&store)
            .evaluate_items(&item("UN1830", "8"), &item("UN1692", "6.1"));
        assert!(verdict.compatible);
        assert!(verdict.has_caveats());
        assert_eq!(
            verdict.reasons[0].message,
            "Class 6.1 must be separated from class 8: 3 m minimum"
        );
    }

    #[test]
    fn does_not_short_circuit() {
        let store = store(vec![
            SegregationRule::classes(hc("1"), hc("3"), IncompatibleProhibited),
            SegregationRule::classes(hc("1"), hc("8"), AwayFrom),
            SegregationRule::groups("SGG1a", "SGG18", IncompatibleProhibited),
        ]);
        let a = item("UN0081", "1.1D").with_groups(&["SGG1a"]);
        let b = item("UN2924", "3").with_subsidiary_risks(&["8"]).with_groups(&["SGG18"]);
        let verdict = CompatibilityEvaluator::new(&store).evaluate_items(&a, &b);
        assert!(!verdict.compatible);
        assert_eq!(verdict.reasons.len(), 3);
        assert_eq!(verdict.prohibitions().count(), 2);
        assert_eq!(verdict.warnings().count(), 1);
    }

    #[test]
    fn group_rule_message_uses_group_name() {
        let store = store(vec![SegregationRule::groups("SGG1a", "SGG18", ConditionalNotes)
            .with_notes("neutralisation risk")]);
        let a = item("UN1830", "8").with_groups(&["SGG1a"]);
        let b = item("UN1823", "8").with_groups(&["SGG18"]);
        let verdict = CompatibilityEvaluator::new(&store).evaluate_items(&b, &a);
        assert_eq!(
            verdict.reasons[0].message,
            "Group Strong acids (SGG1a) vs group Alkalis (SGG18) requires special consideration: neutralisation risk"
        );
    }

    #[test]
    fn class_group_rule_either_side() {
        let store = store(vec![SegregationRule::class_group(hc("6.1"), "FOOD", AwayFrom)]);
        let toxic = item("UN1692", "6.1");
        let food = item("UN9999", "9").with_groups(&["FOOD"]);
        let evaluator = CompatibilityEvaluator::new(&store);
        assert_eq!(evaluator.evaluate_items(&toxic, &food).reasons.len(), 1);
        assert_eq!(evaluator.evaluate_items(&food, &toxic).reasons.len(), 1);
    }

    #[test]
    fn class_group_requires_cross_item_match() {
        let store = store(vec![SegregationRule::class_group(hc("6.1"), "FOOD", AwayFrom)]);
        // The 6.1 class and the FOOD membership belong to the same item.
        let a = item("UN1692", "6.1").with_groups(&["FOOD"]);
        let b = item("UN1203", "3");
        let verdict = CompatibilityEvaluator::new(&store).evaluate_items(&a, &b);
        assert_eq!(verdict.rules_matched, 0);
    }

    #[test]
    fn rule_matched_through_several_classes_reports_once() {
        let store = store(vec![SegregationRule::classes(hc("1"), hc("3"), IncompatibleProhibited)]);
        let a = item("UN0081", "1.1").with_subsidiary_risks(&["1.4"]);
        let verdict = CompatibilityEvaluator::new(&store).evaluate_items(&a, &item("UN1203", "3"));
        assert_eq!(verdict.reasons.len(), 1);
    }

    #[test]
    fn both_bulk_condition_fires_on_compatible_rule() {
        let store = store(vec![SegregationRule::classes(hc("2.1"), hc("3"), Compatible)
            .with_condition(ConditionType::BothBulk, Some("segregate by compartment"))
            .with_notes("bulk flammables")]);
        let gas = item("UN1075", "2.1");
        let liquid = item("UN1203", "3");
        let evaluator = CompatibilityEvaluator::new(&store);

        assert!(evaluator.evaluate_items(&gas, &liquid).is_clean());
        assert!(evaluator.evaluate_items(&gas.clone().bulk(), &liquid).is_clean());

        let verdict = evaluator.evaluate_items(&gas.bulk(), &liquid.bulk());
        assert!(verdict.compatible);
        assert_eq!(verdict.reasons.len(), 1);
        let reason = &verdict.reasons[0];
        assert_eq!(reason.condition, Some(ConditionType::BothBulk));
        assert_eq!(reason.status, ConditionalNotes);
        assert_eq!(reason.condition_value.as_deref(), Some("segregate by compartment"));
        assert!(reason.message.starts_with("Both items are bulk"));
    }

    #[test]
    fn condition_adds_to_base_reason() {
        let store = store(vec![SegregationRule::classes(hc("2.1"), hc("3"), IncompatibleProhibited)
            .with_condition(ConditionType::EitherBulk, None)]);
        let verdict = CompatibilityEvaluator::new(&store)
            .evaluate_items(&item("UN1075", "2.1").bulk(), &item("UN1203", "3"));
        assert!(!verdict.compatible);
        assert_eq!(verdict.reasons.len(), 2);
    }

    #[test]
    fn primary_fire_risk_follows_orientation() {
        let store = store(vec![SegregationRule::classes(hc("6.1"), hc("5.1"), Compatible)
            .with_condition(ConditionType::PrimaryFireRisk, None)]);
        let evaluator = CompatibilityEvaluator::new(&store);
        let oxidizer = item("UN1942", "5.1").fire_risk();
        let toxic = item("UN1692", "6.1");

        // Only the secondary-side item is flagged.
        assert!(evaluator.evaluate_items(&toxic, &oxidizer).is_clean());
        assert!(evaluator.evaluate_items(&oxidizer, &toxic).is_clean());

        let verdict = evaluator.evaluate_items(&toxic.fire_risk(), &item("UN1942", "5.1"));
        assert_eq!(verdict.reasons.len(), 1);
    }

    #[test]
    fn secondary_fire_risk_follows_orientation() {
        let store = store(vec![SegregationRule::classes(hc("6.1"), hc("5.1"), Compatible)
            .with_condition(ConditionType::SecondaryFireRisk, None)]);
        let evaluator = CompatibilityEvaluator::new(&store);
        let verdict = evaluator.evaluate_items(&item("UN1942", "5.1").fire_risk(), &item("UN1692", "6.1"));
        assert_eq!(verdict.reasons.len(), 1);
    }

    #[test]
    fn lithium_condition() {
        let store = store(vec![SegregationRule::classes(hc("9"), hc("5.1"), Compatible)
            .with_condition(ConditionType::Class9LithiumFireRisk, None)]);
        let evaluator = CompatibilityEvaluator::new(&store);
        let oxidizer = item("UN1942", "5.1");
        assert!(evaluator.evaluate_items(&item("UN3077", "9"), &oxidizer).is_clean());
        assert_eq!(
            evaluator.evaluate_items(&item("UN3480", "9"), &oxidizer).reasons.len(),
            1
        );
    }

    #[test]
    fn foodstuffs_and_explosives_conditions() {
        let store = store(vec![
            SegregationRule::class_group(hc("8"), "FOOD", Compatible)
                .with_condition(ConditionType::AwayFromFoodstuffs, None),
            SegregationRule::classes(hc("1"), hc("3"), Compatible)
                .with_condition(ConditionType::Class1Legislation, None),
        ]);
        let evaluator = CompatibilityEvaluator::new(&store);
        let food = item("UN9999", "9").with_groups(&["FOOD"]);
        let verdict = evaluator.evaluate_items(&item("UN1830", "8"), &food);
        assert_eq!(verdict.reasons[0].condition, Some(ConditionType::AwayFromFoodstuffs));

        let verdict = evaluator.evaluate_items(&item("UN0012", "1.4S"), &item("UN1203", "3"));
        assert_eq!(verdict.reasons[0].condition, Some(ConditionType::Class1Legislation));
    }

    #[test]
    fn unknown_tokens_match_nothing() {
        let store = store(vec![SegregationRule::classes(hc("6.2"), hc("3"), IncompatibleProhibited)]);
        let verdict = CompatibilityEvaluator::new(&store)
            .evaluate_items(&item("UN3373", "6.2/I"), &item("UN1203", "3"));
        assert!(verdict.is_clean());
    }

    #[test]
    fn swapped_pair_has_same_reasons() {
        let store = store(vec![
            SegregationRule::classes(hc("1"), hc("3"), IncompatibleProhibited),
            SegregationRule::class_group(hc("3"), "SGG1a", SeparatedFrom),
        ]);
        let a = item("UN0081", "1.1").with_groups(&["SGG1a"]);
        let b = item("UN1203", "3");
        let evaluator = CompatibilityEvaluator::new(&store);
        let ab = evaluator.evaluate_items(&a, &b);
        let ba = evaluator.evaluate_items(&b, &a);
        assert_eq!(ab.compatible, ba.compatible);
        assert_eq!(ab.sorted_reasons(), ba.sorted_reasons());
    }

    #[test]
    fn capitalize_first_char() {
        assert_eq!(capitalize("class 3"), "Class 3");
        assert_eq!(capitalize(""), "");
    }
}
