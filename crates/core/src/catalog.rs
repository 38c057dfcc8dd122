//! In-memory reference-data registry of items and segregation groups.
//!
//! Imports are idempotent: upserting the same record twice reports
//! [`UpsertOutcome::Unchanged`] the second time. Group membership lives on the
//! item (its `segregation_groups` codes); the catalog keeps the reverse index.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::item::{validate_group_code, validate_un_number, DangerousGoodsItem, SegregationGroup};
use crate::profile::HazardProfile;
use crate::types::{GroupCode, UnNumber, UpsertOutcome};

/// Serialized form of a reference-data import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub groups: Vec<SegregationGroup>,
    #[serde(default)]
    pub items: Vec<DangerousGoodsItem>,
}

/// Counters reported by [`ItemCatalog::import`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub groups_created: usize,
    pub groups_updated: usize,
    pub items_created: usize,
    pub items_updated: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    groups: BTreeMap<GroupCode, SegregationGroup>,
    items: BTreeMap<UnNumber, DangerousGoodsItem>,
    members: BTreeMap<GroupCode, BTreeSet<UnNumber>>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from an import, groups first so items can reference them.
    pub fn from_reference_data(data: &ReferenceData) -> Result<Self, CoreError> {
        let mut catalog = Self::new();
        catalog.import(data)?;
        Ok(catalog)
    }

    /// Apply an import. The catalog is left untouched if any record is invalid.
    pub fn import(&mut self, data: &ReferenceData) -> Result<ImportSummary, CoreError> {
        let mut staged = self.clone();
        let mut summary = ImportSummary::default();

        for group in &data.groups {
            match staged.upsert_group(group.clone())? {
                UpsertOutcome::Created => summary.groups_created += 1,
                UpsertOutcome::Updated => summary.groups_updated += 1,
                UpsertOutcome::Unchanged => summary.unchanged += 1,
            }
        }
        for item in &data.items {
            match staged.upsert_item(item.clone())? {
                UpsertOutcome::Created => summary.items_created += 1,
                UpsertOutcome::Updated => summary.items_updated += 1,
                UpsertOutcome::Unchanged => summary.unchanged += 1,
            }
        }

        *self = staged;
        Ok(summary)
    }

    pub fn upsert_group(&mut self, group: SegregationGroup) -> Result<UpsertOutcome, CoreError> {
        validate_group_code(&group.code)?;
        let outcome = match self.groups.get(&group.code) {
            None => UpsertOutcome::Created,
            Some(existing) if *existing == group => return Ok(UpsertOutcome::Unchanged),
            Some(_) => UpsertOutcome::Updated,
        };
        self.members.entry(group.code.clone()).or_default();
        self.groups.insert(group.code.clone(), group);
        Ok(outcome)
    }

    /// Insert or replace an item, keyed by UN number.
    ///
    /// Every group code the item lists must already be registered.
    pub fn upsert_item(&mut self, mut item: DangerousGoodsItem) -> Result<UpsertOutcome, CoreError> {
        validate_un_number(&item.un_number)?;
        if let Some(unknown) = item
            .segregation_groups
            .iter()
            .find(|code| !self.groups.contains_key(*code))
        {
            return Err(CoreError::Validation(format!(
                "{} references unknown segregation group '{unknown}'",
                item.un_number
            )));
        }
        item.segregation_groups.sort();
        item.segregation_groups.dedup();

        let outcome = match self.items.get(&item.un_number) {
            None => UpsertOutcome::Created,
            Some(existing) if *existing == item => return Ok(UpsertOutcome::Unchanged),
            Some(existing) => {
                for code in &existing.segregation_groups {
                    if let Some(members) = self.members.get_mut(code) {
                        members.remove(&item.un_number);
                    }
                }
                UpsertOutcome::Updated
            }
        };

        for code in &item.segregation_groups {
            self.members
                .entry(code.clone())
                .or_default()
                .insert(item.un_number.clone());
        }
        self.items.insert(item.un_number.clone(), item);
        Ok(outcome)
    }

    /// Add a list of existing items to a group. Returns how many were newly added.
    pub fn assign_to_group(&mut self, code: &str, un_numbers: &[&str]) -> Result<usize, CoreError> {
        if !self.groups.contains_key(code) {
            return Err(CoreError::NotFound {
                entity: "segregation_group",
                key: code.to_string(),
            });
        }
        if let Some(missing) = un_numbers.iter().find(|un| !self.items.contains_key(**un)) {
            return Err(CoreError::NotFound {
                entity: "dangerous_good",
                key: missing.to_string(),
            });
        }

        let mut added = 0;
        for un in un_numbers {
            if let Some(item) = self.items.get_mut(*un) {
                if !item.is_member_of(code) {
                    item.segregation_groups.push(code.to_string());
                    item.segregation_groups.sort();
                    added += 1;
                }
            }
            self.members
                .entry(code.to_string())
                .or_default()
                .insert(un.to_string());
        }
        Ok(added)
    }

    pub fn item(&self, un_number: &str) -> Option<&DangerousGoodsItem> {
        self.items.get(un_number)
    }

    pub fn group(&self, code: &str) -> Option<&SegregationGroup> {
        self.groups.get(code)
    }

    pub fn items(&self) -> impl Iterator<Item = &DangerousGoodsItem> {
        self.items.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &SegregationGroup> {
        self.groups.values()
    }

    /// UN numbers of the items belonging to `code`, sorted.
    pub fn members_of(&self, code: &str) -> Vec<&str> {
        self.members
            .get(code)
            .map(|m| m.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn profile_for(&self, un_number: &str) -> Result<HazardProfile, CoreError> {
        self.items
            .get(un_number)
            .map(HazardProfile::from_item)
            .ok_or_else(|| CoreError::NotFound {
                entity: "dangerous_good",
                key: un_number.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
