//! Rule storage: immutable versioned snapshots and their copy-on-write builder.
//!
//! A [`RuleStore`] never changes once built. Seeding works on a
//! [`RuleStoreBuilder`] cloned from the current snapshot, and
//! [`SharedRuleStore`] swaps the finished store in atomically, so readers
//! holding an `Arc<RuleStore>` never observe a half-applied rule set.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;

use crate::error::CoreError;
use crate::hazard::HazardClass;
use crate::item::SegregationGroup;
use crate::rules::{Operand, RuleKey, RuleType, SegregationRule};
use crate::types::{GroupCode, Timestamp, UpsertOutcome};

/// An immutable, versioned set of segregation rules.
#[derive(Debug, Clone)]
pub struct RuleStore {
    version: u64,
    built_at: Timestamp,
    rules: HashMap<RuleKey, SegregationRule>,
    groups: BTreeMap<GroupCode, SegregationGroup>,
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl RuleStore {
    /// Version 0: no rules, no groups.
    pub fn empty() -> Self {
        Self {
            version: 0,
            built_at: Utc::now(),
            rules: HashMap::new(),
            groups: BTreeMap::new(),
        }
    }

    pub fn to_builder(&self) -> RuleStoreBuilder {
        RuleStoreBuilder {
            base_version: self.version,
            rules: self.rules.clone(),
            groups: self.groups.clone(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn built_at(&self) -> Timestamp {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, key: &RuleKey) -> Option<&SegregationRule> {
        self.rules.get(key)
    }

    /// Look up a rule by operands in either order.
    pub fn find(&self, rule_type: RuleType, a: &Operand, b: &Operand) -> Option<&SegregationRule> {
        self.get(&RuleKey::new(rule_type, a.clone(), b.clone()))
    }

    /// All rules, sorted by key for stable output.
    pub fn rules(&self) -> Vec<&SegregationRule> {
        let mut keyed: Vec<(&RuleKey, &SegregationRule)> = self.rules.iter().collect();
        keyed.sort_by(|a, b| a.0.cmp(b.0));
        keyed.into_iter().map(|(_, rule)| rule).collect()
    }

    pub fn group(&self, code: &str) -> Option<&SegregationGroup> {
        self.groups.get(code)
    }

    pub fn groups(&self) -> impl Iterator<Item = &SegregationGroup> {
        self.groups.values()
    }

    /// Display name of a group, falling back to its code.
    pub fn group_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.groups.get(code).map(|g| g.name.as_str()).unwrap_or(code)
    }

    /// Class-to-class rules relating an item class `a` to an item class `b`.
    ///
    /// Whole-class operands cover their divisions, so up to four keys are
    /// probed. Each matching rule is returned once.
    pub fn class_rules(&self, a: &HazardClass, b: &HazardClass) -> Vec<&SegregationRule> {
        let mut keys = Vec::with_capacity(4);
        for ka in a.lookup_keys() {
            for kb in b.lookup_keys() {
                push_unique(
                    &mut keys,
                    RuleKey::new(RuleType::ClassToClass, Operand::Class(ka), Operand::Class(kb)),
                );
            }
        }
        self.collect(keys)
    }

    pub fn group_rules(&self, a: &str, b: &str) -> Vec<&SegregationRule> {
        let key = RuleKey::new(
            RuleType::GroupToGroup,
            Operand::Group(a.to_string()),
            Operand::Group(b.to_string()),
        );
        self.collect(vec![key])
    }

    pub fn class_group_rules(&self, class: &HazardClass, group: &str) -> Vec<&SegregationRule> {
        let keys = class
            .lookup_keys()
            .into_iter()
            .map(|k| {
                RuleKey::new(
                    RuleType::ClassToGroup,
                    Operand::Class(k),
                    Operand::Group(group.to_string()),
                )
            })
            .collect();
        self.collect(keys)
    }

    fn collect(&self, keys: Vec<RuleKey>) -> Vec<&SegregationRule> {
        keys.iter().filter_map(|k| self.rules.get(k)).collect()
    }
}

fn push_unique(keys: &mut Vec<RuleKey>, key: RuleKey) {
    if !keys.contains(&key) {
        keys.push(key);
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Mutable working copy of a store. Dropping it discards every change.
#[derive(Debug, Clone)]
pub struct RuleStoreBuilder {
    base_version: u64,
    rules: HashMap<RuleKey, SegregationRule>,
    groups: BTreeMap<GroupCode, SegregationGroup>,
}

impl RuleStoreBuilder {
    pub fn register_group(&mut self, group: SegregationGroup) -> UpsertOutcome {
        let outcome = match self.groups.get(&group.code) {
            None => UpsertOutcome::Created,
            Some(existing) if *existing == group => return UpsertOutcome::Unchanged,
            Some(_) => UpsertOutcome::Updated,
        };
        self.groups.insert(group.code.clone(), group);
        outcome
    }

    pub fn has_group(&self, code: &str) -> bool {
        self.groups.contains_key(code)
    }

    pub fn get(&self, key: &RuleKey) -> Option<&SegregationRule> {
        self.rules.get(key)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Upsert by natural key, touching only status and provenance.
    ///
    /// An existing rule keeps its authored orientation, condition and notes.
    /// A rule already attributed to a different source is left as it is.
    pub fn upsert_status(&mut self, rule: SegregationRule) -> UpsertOutcome {
        let key = rule.key();
        if let Some(existing) = self.rules.get_mut(&key) {
            if existing.source_regulation.is_some()
                && existing.source_regulation != rule.source_regulation
            {
                return UpsertOutcome::Unchanged;
            }
            if existing.compatibility_status == rule.compatibility_status
                && existing.source_regulation == rule.source_regulation
            {
                return UpsertOutcome::Unchanged;
            }
            existing.compatibility_status = rule.compatibility_status;
            existing.source_regulation = rule.source_regulation;
            return UpsertOutcome::Updated;
        }
        self.rules.insert(key, rule);
        UpsertOutcome::Created
    }

    /// Replace whatever rule holds this operand pair.
    pub fn overwrite(&mut self, rule: SegregationRule) -> UpsertOutcome {
        let key = rule.key();
        let outcome = match self.rules.get(&key) {
            None => UpsertOutcome::Created,
            Some(existing) if *existing == rule => return UpsertOutcome::Unchanged,
            Some(_) => UpsertOutcome::Updated,
        };
        self.rules.insert(key, rule);
        outcome
    }

    /// Freeze into the next store version.
    pub fn build(self) -> RuleStore {
        RuleStore {
            version: self.base_version + 1,
            built_at: Utc::now(),
            rules: self.rules,
            groups: self.groups,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Process-wide holder of the current rule snapshot.
///
/// Readers clone the `Arc` and keep evaluating against it for as long as they
/// like. Writers are serialized and replace the snapshot in one swap.
#[derive(Debug)]
pub struct SharedRuleStore {
    current: RwLock<Arc<RuleStore>>,
    writer: Mutex<()>,
}

impl Default for SharedRuleStore {
    fn default() -> Self {
        Self::new(RuleStore::empty())
    }
}

impl SharedRuleStore {
    pub fn new(store: RuleStore) -> Self {
        Self {
            current: RwLock::new(Arc::new(store)),
            writer: Mutex::new(()),
        }
    }

    /// The snapshot current at the time of the call.
    pub fn snapshot(&self) -> Result<Arc<RuleStore>, CoreError> {
        self.current
            .read()
            .map(|guard| Arc::clone(&*guard))
            .map_err(|_| CoreError::Internal("rule store lock poisoned".to_string()))
    }

    /// Replace the current snapshot. The new store must be a later version.
    pub fn publish(&self, store: RuleStore) -> Result<Arc<RuleStore>, CoreError> {
        let _writer = self.lock_writer()?;
        self.swap(store)
    }

    /// Run a seeding transaction against the current snapshot and publish
    /// its result. Nothing is published if `f` fails.
    pub fn apply<T, E, F>(&self, f: F) -> Result<(Arc<RuleStore>, T), E>
    where
        F: FnOnce(&RuleStore) -> Result<(RuleStore, T), E>,
        E: From<CoreError>,
    {
        let _writer = self.lock_writer()?;
        let base = self.snapshot()?;
        let (next, output) = f(&base)?;
        let published = self.swap(next)?;
        Ok((published, output))
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, ()>, CoreError> {
        self.writer
            .lock()
            .map_err(|_| CoreError::Internal("rule store writer lock poisoned".to_string()))
    }

    fn swap(&self, store: RuleStore) -> Result<Arc<RuleStore>, CoreError> {
        let mut guard = self
            .current
            .write()
            .map_err(|_| CoreError::Internal("rule store lock poisoned".to_string()))?;
        if store.version <= guard.version {
            return Err(CoreError::Conflict(format!(
                "rule store version {} is not newer than current version {}",
                store.version, guard.version
            )));
        }
        let store = Arc::new(store);
        *guard = Arc::clone(&store);
        tracing::info!(
            version = store.version,
            rules = store.len(),
            "Published rule store snapshot"
        );
        Ok(store)
    }
}
