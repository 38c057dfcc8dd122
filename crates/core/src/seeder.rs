//! Rule seeding from declarative tables.
//!
//! Two paths:
//!
//! - [`seed_matrix`] materializes a class compatibility matrix (per primary
//!   class: compatible, incompatible and conditional lists) with
//!   upsert-by-natural-key semantics, so re-applying a matrix is a no-op.
//! - [`seed_regulatory_table`] loads fully specified entries (status, condition
//!   and notes per operand pair) and overwrites whatever rule held the pair.
//!
//! Both validate the entire input before touching anything and return a new
//! store; the base store is never modified. [`RuleSeeder`] wraps them in a
//! [`SharedRuleStore`] transaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::hazard::{HazardClass, InvalidHazardClass};
use crate::item::{validate_group_code, SegregationGroup};
use crate::rules::{
    CompatibilityStatus, ConditionType, Operand, RuleKey, RuleType, SegregationRule,
    VALID_CONDITIONS, VALID_RULE_TYPES, VALID_STATUSES,
};
use crate::store::{RuleStore, RuleStoreBuilder, SharedRuleStore};
use crate::types::UpsertOutcome;

/// Provenance recorded on rules from [`canonical_matrix`].
pub const CANONICAL_SOURCE: &str = "Canonical class compatibility matrix";

/// Status a conditional matrix entry materializes as.
pub const CONDITIONAL_MATRIX_STATUS: CompatibilityStatus = CompatibilityStatus::SeparatedFrom;

/// Seeding-domain error. Any variant aborts the whole seeding call.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Unknown compatibility status '{token}' at {at} (expected one of {})", VALID_STATUSES.join(", "))]
    UnknownStatus { token: String, at: String },

    #[error("Unknown condition type '{token}' at {at} (expected one of {})", VALID_CONDITIONS.join(", "))]
    UnknownCondition { token: String, at: String },

    #[error("Unknown rule type '{token}' at {at} (expected one of {})", VALID_RULE_TYPES.join(", "))]
    UnknownRuleType { token: String, at: String },

    #[error("Invalid hazard class at {at}: {source}")]
    InvalidClass {
        at: String,
        #[source]
        source: InvalidHazardClass,
    },

    #[error("Unknown segregation group '{code}' at {at}")]
    UnknownGroup { code: String, at: String },

    #[error("Operands at {at} do not fit rule type {rule_type}")]
    OperandMismatch { rule_type: RuleType, at: String },

    #[error("Conflicting entries for {primary} / {secondary}: {first} and {second}")]
    ConflictingEntries {
        primary: String,
        secondary: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Store(#[from] CoreError),
}

/// Counts of rules touched by one seeding call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SeedSummary {
    /// Rules created or updated.
    pub fn changed(&self) -> usize {
        self.created + self.updated
    }

    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Path 1: class compatibility matrix
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityMatrix {
    #[serde(default)]
    pub source_regulation: Option<String>,
    pub rows: Vec<MatrixRow>,
}

/// One primary class and the raw class tokens it relates to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub primary: String,
    #[serde(default)]
    pub compatible: Vec<String>,
    #[serde(default)]
    pub incompatible: Vec<String>,
    #[serde(default)]
    pub conditional: Vec<String>,
}

impl MatrixRow {
    /// `(token, status, list name)` for every entry of the row.
    fn entries(&self) -> Vec<(&str, CompatibilityStatus, &'static str)> {
        let lists = [
            (&self.compatible, CompatibilityStatus::Compatible, "compatible"),
            (&self.incompatible, CompatibilityStatus::IncompatibleProhibited, "incompatible"),
            (&self.conditional, CONDITIONAL_MATRIX_STATUS, "conditional"),
        ];
        lists
            .into_iter()
            .flat_map(|(tokens, status, list)| tokens.iter().map(move |t| (t.as_str(), status, list)))
            .collect()
    }
}

type CanonicalRow = (&'static str, &'static [&'static str], &'static [&'static str], &'static [&'static str]);

#[rustfmt::skip]
const CANONICAL_ROWS: &[CanonicalRow] = &[
    ("1",   &["1"], &["2.1", "2.2", "2.3", "3", "4.1", "4.2", "4.3", "5.1", "5.2", "6.1", "7", "8", "9"], &[]),
    ("2.1", &["2.1", "2.2", "2.3", "6.1", "8", "9"], &["1", "4.1", "4.2", "4.3", "5.1", "5.2", "7"], &["3"]),
    ("2.2", &["2.1", "2.2", "2.3", "3", "4.1", "4.3", "5.1", "6.1", "7", "8", "9"], &["1", "4.2", "5.2"], &[]),
    ("2.3", &["2.2", "2.3", "4.1", "4.3", "6.1", "7", "8", "9"], &["1", "3", "4.2", "5.1", "5.2"], &["2.1"]),
    ("3",   &["2.1", "2.2", "2.3", "3", "4.1", "4.3", "6.1", "8", "9"], &["1", "4.2", "5.1", "5.2", "7"], &["6.1"]),
    ("4.1", &["2.2", "2.3", "3", "4.1", "4.3", "6.1", "8", "9"], &["1", "2.1", "4.2", "5.1", "5.2", "7"], &[]),
    ("4.2", &["4.2", "4.3", "6.1", "8", "9"], &["1", "2.1", "2.2", "2.3", "3", "4.1", "5.1", "5.2", "7"], &[]),
    ("4.3", &["2.2", "2.3", "3", "4.1", "4.2", "4.3", "6.1", "9"], &["1", "2.2", "5.1", "5.2", "7", "8"], &[]),
    ("5.1", &["2.2", "5.1", "6.1"], &["1", "2.1", "2.3", "3", "4.1", "4.2", "4.3", "5.2", "7", "8"], &["9"]),
    ("5.2", &["5.2", "6.1"], &["1", "2.1", "2.2", "2.3", "3", "4.1", "4.2", "4.3", "5.1", "7", "8"], &["9"]),
    ("6.1", &["2.1", "2.2", "2.3", "3", "4.1", "4.2", "4.3", "6.1", "7", "9"], &["1"], &["3", "5.1", "5.2", "8"]),
    ("7",   &["2.1", "2.2", "2.3", "6.1", "9"], &["1", "3", "4.1", "4.2", "4.3", "5.1", "5.2", "7", "8"], &[]),
    ("8",   &["2.1", "2.2", "2.3", "3", "4.1", "4.2", "6.1", "7", "9"], &["1", "4.3", "5.1", "5.2", "8"], &[]),
    ("9",   &["2.1", "2.2", "2.3", "3", "4.1", "4.2", "4.3", "6.1", "7", "8", "9"], &["1"], &["5.1", "5.2"]),
];

/// The built-in class compatibility matrix.
pub fn canonical_matrix() -> CompatibilityMatrix {
    let owned = |tokens: &[&str]| -> Vec<String> { tokens.iter().map(|t| t.to_string()).collect() };
    CompatibilityMatrix {
        source_regulation: Some(CANONICAL_SOURCE.to_string()),
        rows: CANONICAL_ROWS
            .iter()
            .map(|&(primary, compatible, incompatible, conditional)| MatrixRow {
                primary: primary.to_string(),
                compatible: owned(compatible),
                incompatible: owned(incompatible),
                conditional: owned(conditional),
            })
            .collect(),
    }
}

/// Resolve a matrix into one rule per unordered class pair.
///
/// When a pair is listed more than once (both directions, or two lists of the
/// same row) the strictest status wins; the first listing fixes orientation.
pub fn resolve_matrix(matrix: &CompatibilityMatrix) -> Result<Vec<SegregationRule>, SeedError> {
    let mut resolved: BTreeMap<RuleKey, SegregationRule> = BTreeMap::new();

    for (index, row) in matrix.rows.iter().enumerate() {
        let primary = parse_class(&row.primary, || format!("row {index} primary"))?;

        for (token, status, list) in row.entries() {
            let secondary = parse_class(token, || format!("row {index} ('{}') {list} list", row.primary))?;
            if primary == secondary {
                continue;
            }

            let mut rule = SegregationRule::classes(primary, secondary, status);
            rule.source_regulation = matrix.source_regulation.clone();
            resolved
                .entry(rule.key())
                .and_modify(|existing| {
                    existing.compatibility_status = existing.compatibility_status.strictest(status);
                })
                .or_insert(rule);
        }
    }

    Ok(resolved.into_values().collect())
}

/// Seed a compatibility matrix onto `base`.
///
/// Existing rules keep their orientation, condition and notes; only the
/// status and provenance are refreshed. Rules attributed to another source,
/// such as a regulatory overlay, are counted as unchanged.
pub fn seed_matrix(
    base: &RuleStore,
    matrix: &CompatibilityMatrix,
) -> Result<(RuleStore, SeedSummary), SeedError> {
    let rules = resolve_matrix(matrix)?;

    let mut builder = base.to_builder();
    let mut summary = SeedSummary::default();
    for rule in rules {
        summary.record(builder.upsert_status(rule));
    }

    let store = builder.build();
    tracing::info!(
        source = matrix.source_regulation.as_deref().unwrap_or("unspecified"),
        rows = matrix.rows.len(),
        created = summary.created,
        updated = summary.updated,
        unchanged = summary.unchanged,
        version = store.version(),
        "Seeded compatibility matrix"
    );
    Ok((store, summary))
}

// ---------------------------------------------------------------------------
// Path 2: regulatory table
// ---------------------------------------------------------------------------

/// A fully specified rule table, e.g. a national dangerous-goods code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatoryTable {
    pub source_regulation: String,
    /// Groups the entries may reference, registered before the rules.
    #[serde(default)]
    pub groups: Vec<SegregationGroup>,
    pub entries: Vec<RegulatoryEntry>,
}

/// One table row, as raw tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatoryEntry {
    pub rule_type: String,
    pub primary: String,
    pub secondary: String,
    pub status: String,
    #[serde(default)]
    pub condition_type: Option<String>,
    #[serde(default)]
    pub condition_value: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Seed a regulatory table onto `base`, overwriting prior rules for each pair.
pub fn seed_regulatory_table(
    base: &RuleStore,
    table: &RegulatoryTable,
) -> Result<(RuleStore, SeedSummary), SeedError> {
    let mut builder = base.to_builder();
    for group in &table.groups {
        validate_group_code(&group.code)?;
        builder.register_group(group.clone());
    }

    let mut resolved: BTreeMap<RuleKey, (usize, SegregationRule)> = BTreeMap::new();
    for (index, entry) in table.entries.iter().enumerate() {
        let mut rule = parse_entry(&builder, index, entry)?;
        rule.source_regulation = Some(table.source_regulation.clone());

        let key = rule.key();
        if let Some((first, existing)) = resolved.get(&key) {
            if !same_requirement(existing, &rule) {
                return Err(SeedError::ConflictingEntries {
                    primary: rule.primary.to_string(),
                    secondary: rule.secondary.to_string(),
                    first: format!("entry {first}"),
                    second: format!("entry {index}"),
                });
            }
            continue;
        }
        resolved.insert(key, (index, rule));
    }

    let mut summary = SeedSummary::default();
    for (_, rule) in resolved.into_values() {
        summary.record(builder.overwrite(rule));
    }

    let store = builder.build();
    tracing::info!(
        source = %table.source_regulation,
        entries = table.entries.len(),
        groups = table.groups.len(),
        created = summary.created,
        updated = summary.updated,
        unchanged = summary.unchanged,
        version = store.version(),
        "Seeded regulatory table"
    );
    Ok((store, summary))
}

fn parse_entry(
    builder: &RuleStoreBuilder,
    index: usize,
    entry: &RegulatoryEntry,
) -> Result<SegregationRule, SeedError> {
    let at = || format!("entry {index}");

    let rule_type = RuleType::from_token(&entry.rule_type).ok_or_else(|| SeedError::UnknownRuleType {
        token: entry.rule_type.clone(),
        at: at(),
    })?;
    let status = CompatibilityStatus::from_token(&entry.status).ok_or_else(|| SeedError::UnknownStatus {
        token: entry.status.clone(),
        at: at(),
    })?;
    let condition_token = entry.condition_type.as_deref().unwrap_or("");
    let condition = ConditionType::from_token(condition_token).ok_or_else(|| SeedError::UnknownCondition {
        token: condition_token.to_string(),
        at: at(),
    })?;

    let primary = parse_operand(builder, rule_type, &entry.primary, || format!("entry {index} primary"))?;
    let secondary = parse_operand(builder, rule_type, &entry.secondary, || format!("entry {index} secondary"))?;
    if !rule_type.accepts(&primary, &secondary) {
        return Err(SeedError::OperandMismatch { rule_type, at: at() });
    }

    let mut rule = SegregationRule::new(rule_type, primary, secondary, status);
    rule.condition_type = condition;
    rule.condition_value = non_blank(entry.condition_value.as_deref());
    rule.notes = non_blank(entry.notes.as_deref());
    Ok(rule)
}

/// Class-to-group operands are told apart by whether the token is a class.
fn parse_operand(
    builder: &RuleStoreBuilder,
    rule_type: RuleType,
    token: &str,
    at: impl Fn() -> String,
) -> Result<Operand, SeedError> {
    let token = token.trim();
    let as_group = |code: &str| {
        if builder.has_group(code) {
            Ok(Operand::Group(code.to_string()))
        } else {
            Err(SeedError::UnknownGroup {
                code: code.to_string(),
                at: at(),
            })
        }
    };

    match rule_type {
        RuleType::ClassToClass => Ok(Operand::Class(parse_class(token, &at)?)),
        RuleType::GroupToGroup => as_group(token),
        RuleType::ClassToGroup => match token.parse::<HazardClass>() {
            Ok(class) => Ok(Operand::Class(class)),
            Err(_) => as_group(token),
        },
    }
}

fn parse_class(token: &str, at: impl Fn() -> String) -> Result<HazardClass, SeedError> {
    token
        .parse()
        .map_err(|source| SeedError::InvalidClass { at: at(), source })
}

fn same_requirement(a: &SegregationRule, b: &SegregationRule) -> bool {
    a.compatibility_status == b.compatibility_status
        && a.condition_type == b.condition_type
        && a.condition_value == b.condition_value
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Register segregation groups so rules and messages can refer to them.
pub fn register_groups<'g>(
    base: &RuleStore,
    groups: impl IntoIterator<Item = &'g SegregationGroup>,
) -> Result<(RuleStore, SeedSummary), SeedError> {
    let mut builder = base.to_builder();
    let mut summary = SeedSummary::default();
    for group in groups {
        validate_group_code(&group.code)?;
        summary.record(builder.register_group(group.clone()));
    }
    let store = builder.build();
    tracing::info!(
        created = summary.created,
        updated = summary.updated,
        unchanged = summary.unchanged,
        version = store.version(),
        "Registered segregation groups"
    );
    Ok((store, summary))
}

// ---------------------------------------------------------------------------
// Transactional front end
// ---------------------------------------------------------------------------

/// Seeds a shared store; each call publishes a new snapshot or nothing.
#[derive(Debug, Clone, Copy)]
pub struct RuleSeeder<'a> {
    shared: &'a SharedRuleStore,
}

impl<'a> RuleSeeder<'a> {
    pub fn new(shared: &'a SharedRuleStore) -> Self {
        Self { shared }
    }

    pub fn seed(&self, matrix: &CompatibilityMatrix) -> Result<(Arc<RuleStore>, SeedSummary), SeedError> {
        self.shared.apply(|base| seed_matrix(base, matrix))
    }

    pub fn seed_canonical(&self) -> Result<(Arc<RuleStore>, SeedSummary), SeedError> {
        self.seed(&canonical_matrix())
    }

    pub fn seed_regulatory(
        &self,
        table: &RegulatoryTable,
    ) -> Result<(Arc<RuleStore>, SeedSummary), SeedError> {
        self.shared.apply(|base| seed_regulatory_table(base, table))
    }

    pub fn register_groups<'g>(
        &self,
        groups: impl IntoIterator<Item = &'g SegregationGroup>,
    ) -> Result<(Arc<RuleStore>, SeedSummary), SeedError> {
        self.shared.apply(|base| register_groups(base, groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::CompatibilityStatus::*;
    use assert_matches::assert_matches;

    fn hc(s: &str) -> HazardClass {
        s.parse().unwrap()
    }

    fn status_of(store: &RuleStore, a: &str, b: &str) -> Option<CompatibilityStatus> {
        store
            .find(RuleType::ClassToClass, &Operand::Class(hc(a)), &Operand::Class(hc(b)))
            .map(|r| r.compatibility_status)
    }

    fn row(primary: &str, compatible: &[&str], incompatible: &[&str], conditional: &[&str]) -> MatrixRow {
        let owned = |t: &[&str]| -> Vec<String> { t.iter().map(|s| s.to_string()).collect() };
        MatrixRow {
            primary: primary.into(),
            compatible: owned(compatible),
            incompatible: owned(incompatible),
            conditional: owned(conditional),
        }
    }

    fn entry(rule_type: &str, primary: &str, secondary: &str, status: &str) -> RegulatoryEntry {
        RegulatoryEntry {
            rule_type: rule_type.into(),
            primary: primary.into(),
            secondary: secondary.into(),
            status: status.into(),
            condition_type: None,
            condition_value: None,
            notes: None,
        }
    }

    fn table(entries: Vec<RegulatoryEntry>) -> RegulatoryTable {
        RegulatoryTable {
            source_regulation: "ADG Code 7.8".into(),
            groups: vec![
                SegregationGroup::new("SGG1a", "Strong acids"),
                SegregationGroup::new("SGG18", "Alkalis"),
            ],
            entries,
        }
    }

    #[test]
    fn canonical_matrix_has_fourteen_rows() {
        let matrix = canonical_matrix();
        assert_eq!(matrix.rows.len(), 14);
        assert!(resolve_matrix(&matrix).is_ok());
    }

    #[test]
    fn canonical_seed_resolves_known_pairs() {
        let (store, summary) = seed_matrix(&RuleStore::empty(), &canonical_matrix()).unwrap();
        assert_eq!(summary.created, store.len());
        assert_eq!(summary.updated + summary.unchanged, 0);

        assert_eq!(status_of(&store, "1", "3"), Some(IncompatibleProhibited));
        assert_eq!(status_of(&store, "3", "8"), Some(Compatible));
        assert_eq!(status_of(&store, "8", "6.1"), Some(SeparatedFrom));
        assert_eq!(status_of(&store, "1", "1"), None);
    }

    #[test]
    fn strictest_listing_wins() {
        // 4.3 lists 2.2 as both compatible and incompatible.
        let (store, _) = seed_matrix(&RuleStore::empty(), &canonical_matrix()).unwrap();
        assert_eq!(status_of(&store, "4.3", "2.2"), Some(IncompatibleProhibited));
    }

    #[test]
    fn reseeding_is_unchanged() {
        let matrix = canonical_matrix();
        let (first, _) = seed_matrix(&RuleStore::empty(), &matrix).unwrap();
        let (second, summary) = seed_matrix(&first, &matrix).unwrap();
        assert_eq!(summary.changed(), 0);
        assert_eq!(summary.unchanged, first.len());
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn unknown_class_fails_whole_matrix() {
        let matrix = CompatibilityMatrix {
            source_regulation: None,
            rows: vec![row("3", &["8"], &[], &[]), row("3", &[], &["10.1"], &[])],
        };
        let err = seed_matrix(&RuleStore::empty(), &matrix).unwrap_err();
        assert_matches!(err, SeedError::InvalidClass { .. });
    }

    #[test]
    fn matrix_upsert_keeps_condition() {
        let mut builder = RuleStore::empty().to_builder();
        builder.overwrite(
            SegregationRule::classes(hc("3"), hc("8"), Compatible)
                .with_condition(ConditionType::BothBulk, Some("hold separation"))
                .with_notes("bulk only"),
        );
        let base = builder.build();

        let matrix = CompatibilityMatrix {
            source_regulation: Some("test".into()),
            rows: vec![row("8", &[], &["3"], &[])],
        };
        let (store, summary) = seed_matrix(&base, &matrix).unwrap();
        assert_eq!(summary.updated, 1);
        let rule = store
            .find(RuleType::ClassToClass, &Operand::Class(hc("3")), &Operand::Class(hc("8")))
            .unwrap();
        assert_eq!(rule.compatibility_status, IncompatibleProhibited);
        assert_eq!(rule.condition_type, ConditionType::BothBulk);
        assert_eq!(rule.notes.as_deref(), Some("bulk only"));
        assert_eq!(rule.source_regulation.as_deref(), Some("test"));
    }

    #[test]
    fn regulatory_table_overwrites() {
        let (base, _) = seed_matrix(&RuleStore::empty(), &canonical_matrix()).unwrap();
        let mut e = entry("CLASS_TO_CLASS", "3", "8", "AWAY_FROM");
        e.notes = Some("  ".into());
        e.condition_type = Some("EITHER_BULK".into());
        let (store, summary) = seed_regulatory_table(&base, &table(vec![e])).unwrap();

        assert_eq!(summary.updated, 1);
        let rule = store
            .find(RuleType::ClassToClass, &Operand::Class(hc("8")), &Operand::Class(hc("3")))
            .unwrap();
        assert_eq!(rule.compatibility_status, AwayFrom);
        assert_eq!(rule.condition_type, ConditionType::EitherBulk);
        assert_eq!(rule.notes, None);
        assert_eq!(rule.source_regulation.as_deref(), Some("ADG Code 7.8"));
    }

    #[test]
    fn regulatory_table_groups_and_class_group() {
        let entries = vec![
            entry("GROUP_TO_GROUP", "SGG1a", "SGG18", "SEPARATED_FROM"),
            entry("CLASS_GROUP", "SGG1a", "4.3", "INCOMPATIBLE_PROHIBITED"),
            entry("GROUP_TO_GROUP", "SGG1a", "SGG1a", "COMPATIBLE"),
        ];
        let (store, summary) = seed_regulatory_table(&RuleStore::empty(), &table(entries)).unwrap();
        assert_eq!(summary.created, 3);
        assert_eq!(store.group_name("SGG18"), "Alkalis");
        assert_eq!(store.class_group_rules(&hc("4.3"), "SGG1a").len(), 1);
    }

    #[test]
    fn regulatory_table_rejects_bad_tokens() {
        let base = RuleStore::empty();
        let cases = [
            entry("CLASS_TO_CLASS", "3", "8", "SOMETIMES"),
            entry("UN_TO_UN", "3", "8", "COMPATIBLE"),
            entry("CLASS_TO_CLASS", "3", "SGG1a", "COMPATIBLE"),
            entry("GROUP_TO_GROUP", "SGG1a", "SGG99", "COMPATIBLE"),
            entry("CLASS_TO_GROUP", "3", "8", "COMPATIBLE"),
        ];
        let errors: Vec<SeedError> = cases
            .into_iter()
            .map(|e| seed_regulatory_table(&base, &table(vec![e])).unwrap_err())
            .collect();

        assert_matches!(errors[0], SeedError::UnknownStatus { .. });
        assert_matches!(errors[1], SeedError::UnknownRuleType { .. });
        assert_matches!(errors[2], SeedError::InvalidClass { .. });
        assert_matches!(errors[3], SeedError::UnknownGroup { .. });
        assert_matches!(errors[4], SeedError::OperandMismatch { .. });

        let mut e = entry("CLASS_TO_CLASS", "3", "8", "COMPATIBLE");
        e.condition_type = Some("WHEN_WET".into());
        assert_matches!(
            seed_regulatory_table(&base, &table(vec![e])),
            Err(SeedError::UnknownCondition { .. })
        );
    }

    #[test]
    fn contradictory_directions_conflict() {
        let entries = vec![
            entry("CLASS_TO_CLASS", "3", "8", "COMPATIBLE"),
            entry("CLASS_TO_CLASS", "8", "3", "AWAY_FROM"),
        ];
        assert_matches!(
            seed_regulatory_table(&RuleStore::empty(), &table(entries)),
            Err(SeedError::ConflictingEntries { .. })
        );

        let agreeing = vec![
            entry("CLASS_TO_CLASS", "3", "8", "AWAY_FROM"),
            entry("CLASS_TO_CLASS", "8", "3", "AWAY_FROM"),
        ];
        let (store, summary) = seed_regulatory_table(&RuleStore::empty(), &table(agreeing)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(summary.created, 1);
    }

    #[test]
    fn registered_groups_validate_later_tables() {
        let shared = SharedRuleStore::default();
        let seeder = RuleSeeder::new(&shared);
        let groups = [SegregationGroup::new("SGG1a", "Strong acids")];
        let (_, summary) = seeder.register_groups(&groups).unwrap();
        assert_eq!(summary.created, 1);

        let overlay = RegulatoryTable {
            source_regulation: "IMDG".into(),
            groups: vec![],
            entries: vec![entry("CLASS_TO_GROUP", "4.3", "SGG1a", "SEPARATED_FROM")],
        };
        let (store, summary) = seeder.seed_regulatory(&overlay).unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(store.version(), 2);

        assert_matches!(
            seeder.register_groups(&[SegregationGroup::new("", "blank")]),
            Err(SeedError::Store(CoreError::Validation(_)))
        );
    }

    #[test]
    fn seeder_publishes_only_on_success() {
        let shared = SharedRuleStore::default();
        let seeder = RuleSeeder::new(&shared);

        let (store, summary) = seeder.seed_canonical().unwrap();
        assert_eq!(store.version(), 1);
        assert!(summary.created > 0);

        let bad = table(vec![entry("CLASS_TO_CLASS", "3", "8", "MAYBE")]);
        assert!(seeder.seed_regulatory(&bad).is_err());
        assert_eq!(shared.snapshot().unwrap().version(), 1);
    }
}
