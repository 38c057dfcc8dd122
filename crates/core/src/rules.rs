//! Segregation rule atoms: rule families, statuses, conditions and operands.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hazard::HazardClass;
use crate::types::GroupCode;

// ---------------------------------------------------------------------------
// Rule type
// ---------------------------------------------------------------------------

/// Which operand kinds a rule relates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    ClassToClass,
    GroupToGroup,
    ClassToGroup,
}

/// Canonical rule type tokens.
pub const VALID_RULE_TYPES: &[&str] = &["CLASS_TO_CLASS", "GROUP_TO_GROUP", "CLASS_TO_GROUP"];

impl RuleType {
    /// Canonical token, e.g. `CLASS_TO_CLASS`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassToClass => "CLASS_TO_CLASS",
            Self::GroupToGroup => "GROUP_TO_GROUP",
            Self::ClassToGroup => "CLASS_TO_GROUP",
        }
    }

    /// Parse a rule type token. Short database codes (`CLASS_CLASS`) are
    /// accepted as well.
    pub fn from_token(s: &str) -> Option<Self> {
        match s.trim() {
            "CLASS_TO_CLASS" | "CLASS_CLASS" => Some(Self::ClassToClass),
            "GROUP_TO_GROUP" | "GROUP_GROUP" => Some(Self::GroupToGroup),
            "CLASS_TO_GROUP" | "CLASS_GROUP" => Some(Self::ClassToGroup),
            _ => None,
        }
    }

    /// Whether the operand pair has the kinds this rule type requires.
    pub fn accepts(&self, primary: &Operand, secondary: &Operand) -> bool {
        match (self, primary, secondary) {
            (Self::ClassToClass, Operand::Class(_), Operand::Class(_)) => true,
            (Self::GroupToGroup, Operand::Group(_), Operand::Group(_)) => true,
            (Self::ClassToGroup, Operand::Class(_), Operand::Group(_)) => true,
            (Self::ClassToGroup, Operand::Group(_), Operand::Class(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Compatibility status
// ---------------------------------------------------------------------------

/// Required segregation between two operands.
///
/// Variants are declared from least to most restrictive so the derived
/// ordering doubles as a severity ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompatibilityStatus {
    Compatible,
    ConditionalNotes,
    AwayFrom,
    SeparatedFrom,
    IncompatibleProhibited,
}

/// Compatibility status tokens, least to most severe.
pub const VALID_STATUSES: &[&str] = &[
    "COMPATIBLE",
    "CONDITIONAL_NOTES",
    "AWAY_FROM",
    "SEPARATED_FROM",
    "INCOMPATIBLE_PROHIBITED",
];

impl CompatibilityStatus {
    /// Canonical token, e.g. `SEPARATED_FROM`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compatible => "COMPATIBLE",
            Self::ConditionalNotes => "CONDITIONAL_NOTES",
            Self::AwayFrom => "AWAY_FROM",
            Self::SeparatedFrom => "SEPARATED_FROM",
            Self::IncompatibleProhibited => "INCOMPATIBLE_PROHIBITED",
        }
    }

    /// Parse a status token. Unknown tokens yield `None`.
    pub fn from_token(s: &str) -> Option<Self> {
        match s.trim() {
            "COMPATIBLE" => Some(Self::Compatible),
            "CONDITIONAL_NOTES" => Some(Self::ConditionalNotes),
            "AWAY_FROM" => Some(Self::AwayFrom),
            "SEPARATED_FROM" => Some(Self::SeparatedFrom),
            "INCOMPATIBLE_PROHIBITED" => Some(Self::IncompatibleProhibited),
            _ => None,
        }
    }

    /// Human-readable label, as printed in regulatory tables.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Compatible => "Compatible",
            Self::ConditionalNotes => "Conditional - See Notes",
            Self::AwayFrom => "Away From",
            Self::SeparatedFrom => "Separated From",
            Self::IncompatibleProhibited => "Incompatible - Prohibited",
        }
    }

    /// Only a prohibition makes a pair incompatible.
    pub fn is_prohibition(&self) -> bool {
        match self {
            Self::IncompatibleProhibited => true,
            Self::Compatible | Self::ConditionalNotes | Self::AwayFrom | Self::SeparatedFrom => false,
        }
    }

    /// Whether a matched rule with this status produces a reason.
    pub fn raises_reason(&self) -> bool {
        match self {
            Self::Compatible => false,
            Self::ConditionalNotes
            | Self::AwayFrom
            | Self::SeparatedFrom
            | Self::IncompatibleProhibited => true,
        }
    }

    /// The more severe of two statuses.
    pub fn strictest(self, other: Self) -> Self {
        self.max(other)
    }
}

impl fmt::Display for CompatibilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Condition type
// ---------------------------------------------------------------------------

/// Additional advisory attached to a rule, evaluated against the item pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionType {
    #[default]
    None,
    BothBulk,
    EitherBulk,
    PrimaryFireRisk,
    SecondaryFireRisk,
    #[serde(rename = "CLASS_9_LITHIUM_FIRE_RISK")]
    Class9LithiumFireRisk,
    AwayFromFoodstuffs,
    #[serde(rename = "CLASS_1_LEGISLATION")]
    Class1Legislation,
}

/// Condition type tokens.
pub const VALID_CONDITIONS: &[&str] = &[
    "NONE",
    "BOTH_BULK",
    "EITHER_BULK",
    "PRIMARY_FIRE_RISK",
    "SECONDARY_FIRE_RISK",
    "CLASS_9_LITHIUM_FIRE_RISK",
    "AWAY_FROM_FOODSTUFFS",
    "CLASS_1_LEGISLATION",
];

impl ConditionType {
    /// Canonical token, e.g. `BOTH_BULK`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::BothBulk => "BOTH_BULK",
            Self::EitherBulk => "EITHER_BULK",
            Self::PrimaryFireRisk => "PRIMARY_FIRE_RISK",
            Self::SecondaryFireRisk => "SECONDARY_FIRE_RISK",
            Self::Class9LithiumFireRisk => "CLASS_9_LITHIUM_FIRE_RISK",
            Self::AwayFromFoodstuffs => "AWAY_FROM_FOODSTUFFS",
            Self::Class1Legislation => "CLASS_1_LEGISLATION",
        }
    }

    /// Parse a condition token. Blank means `NONE`.
    pub fn from_token(s: &str) -> Option<Self> {
        match s.trim() {
            "" | "NONE" => Some(Self::None),
            "BOTH_BULK" => Some(Self::BothBulk),
            "EITHER_BULK" => Some(Self::EitherBulk),
            "PRIMARY_FIRE_RISK" => Some(Self::PrimaryFireRisk),
            "SECONDARY_FIRE_RISK" => Some(Self::SecondaryFireRisk),
            "CLASS_9_LITHIUM_FIRE_RISK" => Some(Self::Class9LithiumFireRisk),
            "AWAY_FROM_FOODSTUFFS" => Some(Self::AwayFromFoodstuffs),
            "CLASS_1_LEGISLATION" => Some(Self::Class1Legislation),
            _ => None,
        }
    }

    /// Description used in condition reason messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "No specific condition",
            Self::BothBulk => "Both items are bulk",
            Self::EitherBulk => "One or both items are bulk",
            Self::PrimaryFireRisk => "Primary item is a fire risk",
            Self::SecondaryFireRisk => "Secondary item is a fire risk",
            Self::Class9LithiumFireRisk => "Class 9 lithium battery fire risk",
            Self::AwayFromFoodstuffs => "Away from foodstuffs",
            Self::Class1Legislation => "Refer to explosives legislation",
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Operands and rules
// ---------------------------------------------------------------------------

/// One side of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Operand {
    Class(HazardClass),
    Group(GroupCode),
}

impl Operand {
    pub fn class(&self) -> Option<&HazardClass> {
        match self {
            Operand::Class(c) => Some(c),
            Operand::Group(_) => None,
        }
    }

    pub fn group(&self) -> Option<&str> {
        match self {
            Operand::Class(_) => None,
            Operand::Group(g) => Some(g),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Class(c) => write!(f, "class {c}"),
            Operand::Group(g) => write!(f, "group {g}"),
        }
    }
}

/// A single segregation rule, in the orientation it was authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegregationRule {
    pub rule_type: RuleType,
    pub primary: Operand,
    pub secondary: Operand,
    pub compatibility_status: CompatibilityStatus,
    #[serde(default)]
    pub condition_type: ConditionType,
    #[serde(default)]
    pub condition_value: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub source_regulation: Option<String>,
}

impl SegregationRule {
    pub fn new(
        rule_type: RuleType,
        primary: Operand,
        secondary: Operand,
        compatibility_status: CompatibilityStatus,
    ) -> Self {
        Self {
            rule_type,
            primary,
            secondary,
            compatibility_status,
            condition_type: ConditionType::None,
            condition_value: None,
            notes: None,
            source_regulation: None,
        }
    }

    pub fn classes(primary: HazardClass, secondary: HazardClass, status: CompatibilityStatus) -> Self {
        Self::new(
            RuleType::ClassToClass,
            Operand::Class(primary),
            Operand::Class(secondary),
            status,
        )
    }

    pub fn groups(primary: &str, secondary: &str, status: CompatibilityStatus) -> Self {
        Self::new(
            RuleType::GroupToGroup,
            Operand::Group(primary.to_string()),
            Operand::Group(secondary.to_string()),
            status,
        )
    }

    pub fn class_group(class: HazardClass, group: &str, status: CompatibilityStatus) -> Self {
        Self::new(
            RuleType::ClassToGroup,
            Operand::Class(class),
            Operand::Group(group.to_string()),
            status,
        )
    }

    pub fn with_condition(mut self, condition: ConditionType, value: Option<&str>) -> Self {
        self.condition_type = condition;
        self.condition_value = value.map(str::to_string);
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source_regulation = Some(source.to_string());
        self
    }

    pub fn key(&self) -> RuleKey {
        RuleKey::new(self.rule_type, self.primary.clone(), self.secondary.clone())
    }

    pub fn has_condition(&self) -> bool {
        self.condition_type != ConditionType::None
    }
}

/// Order-independent identity of a rule: `(A, B)` and `(B, A)` share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleKey {
    pub rule_type: RuleType,
    low: Operand,
    high: Operand,
}

impl RuleKey {
    pub fn new(rule_type: RuleType, a: Operand, b: Operand) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            rule_type,
            low,
            high,
        }
    }

    pub fn operands(&self) -> (&Operand, &Operand) {
        (&self.low, &self.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hc(s: &str) -> HazardClass {
        s.parse().unwrap()
    }

    #[test]
    fn status_tokens_round_trip_through_as_str() {
        for token in VALID_STATUSES {
            let status = CompatibilityStatus::from_token(token).unwrap();
            assert_eq!(status.as_str(), *token);
        }
        assert!(CompatibilityStatus::from_token("SEP_LONG").is_none());
    }

    #[test]
    fn condition_tokens_round_trip_through_as_str() {
        for token in VALID_CONDITIONS {
            let condition = ConditionType::from_token(token).unwrap();
            assert_eq!(condition.as_str(), *token);
        }
        assert_eq!(ConditionType::from_token(""), Some(ConditionType::None));
        assert!(ConditionType::from_token("IF_RAINING").is_none());
    }

    #[test]
    fn rule_type_accepts_short_codes() {
        for token in VALID_RULE_TYPES {
            assert_eq!(RuleType::from_token(token).unwrap().as_str(), *token);
        }
        assert_eq!(RuleType::from_token("CLASS_GROUP"), Some(RuleType::ClassToGroup));
        assert!(RuleType::from_token("UN_UN").is_none());
    }

    #[test]
    fn severity_ordering() {
        use CompatibilityStatus::*;
        assert!(Compatible < ConditionalNotes);
        assert!(ConditionalNotes < AwayFrom);
        assert!(AwayFrom < SeparatedFrom);
        assert!(SeparatedFrom < IncompatibleProhibited);
        assert_eq!(Compatible.strictest(SeparatedFrom), SeparatedFrom);
        assert!(IncompatibleProhibited.is_prohibition());
        assert!(!SeparatedFrom.is_prohibition());
        assert!(!Compatible.raises_reason());
    }

    #[test]
    fn key_is_order_independent() {
        let ab = SegregationRule::classes(hc("3"), hc("8"), CompatibilityStatus::Compatible);
        let ba = SegregationRule::classes(hc("8"), hc("3"), CompatibilityStatus::Compatible);
        assert_eq!(ab.key(), ba.key());

        let cg = SegregationRule::class_group(hc("8"), "SGG1a", CompatibilityStatus::AwayFrom);
        let gc = SegregationRule::new(
            RuleType::ClassToGroup,
            Operand::Group("SGG1a".into()),
            Operand::Class(hc("8")),
            CompatibilityStatus::AwayFrom,
        );
        assert_eq!(cg.key(), gc.key());
    }

    #[test]
    fn rule_type_operand_kinds() {
        let class = Operand::Class(hc("3"));
        let group = Operand::Group("SGG1a".into());
        assert!(RuleType::ClassToClass.accepts(&class, &class));
        assert!(!RuleType::ClassToClass.accepts(&class, &group));
        assert!(RuleType::ClassToGroup.accepts(&group, &class));
        assert!(!RuleType::GroupToGroup.accepts(&class, &group));
    }

    #[test]
    fn serde_tokens() {
        assert_eq!(
            serde_json::to_string(&CompatibilityStatus::IncompatibleProhibited).unwrap(),
            "\"INCOMPATIBLE_PROHIBITED\""
        );
        assert_eq!(
            serde_json::to_string(&ConditionType::Class9LithiumFireRisk).unwrap(),
            "\"CLASS_9_LITHIUM_FIRE_RISK\""
        );
        assert_eq!(
            serde_json::to_string(&RuleType::ClassToGroup).unwrap(),
            "\"CLASS_TO_GROUP\""
        );
    }
}
