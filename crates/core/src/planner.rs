//! Pairwise segregation planning over a shipment's item set.
//!
//! A planner pins one rule snapshot for its whole lifetime. Items whose
//! profiles share a [`ProfileSignature`] are indistinguishable to the
//! evaluator, so verdicts are cached per signature pair and reused across
//! every batch evaluated against the snapshot.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::catalog::ItemCatalog;
use crate::evaluator::{CompatibilityEvaluator, CompatibilityVerdict};
use crate::item::DangerousGoodsItem;
use crate::profile::{HazardProfile, ProfileSignature};
use crate::store::RuleStore;
use crate::types::{Timestamp, UnNumber};

/// A pair that is incompatible or carries caveats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairVerdict<'a> {
    pub first: &'a DangerousGoodsItem,
    pub second: &'a DangerousGoodsItem,
    pub verdict: CompatibilityVerdict,
}

/// Serialized form of a [`PairVerdict`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairFinding {
    pub first: UnNumber,
    pub second: UnNumber,
    #[serde(flatten)]
    pub verdict: CompatibilityVerdict,
}

impl From<PairVerdict<'_>> for PairFinding {
    fn from(pair: PairVerdict<'_>) -> Self {
        Self {
            first: pair.first.un_number.clone(),
            second: pair.second.un_number.clone(),
            verdict: pair.verdict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentReport {
    /// No prohibited pair and every UN number resolved.
    pub is_compatible: bool,
    pub rule_store_version: u64,
    pub evaluated_at: Timestamp,
    pub items: usize,
    pub pairs_evaluated: usize,
    pub prohibited_pairs: usize,
    pub caveated_pairs: usize,
    /// UN numbers not present in the catalog.
    pub unresolved: Vec<UnNumber>,
    pub pairs: Vec<PairFinding>,
}

#[derive(Debug)]
pub struct BatchSegregationPlanner {
    store: Arc<RuleStore>,
    cache: HashMap<(ProfileSignature, ProfileSignature), CompatibilityVerdict>,
    cache_hits: usize,
}

impl BatchSegregationPlanner {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self {
            store,
            cache: HashMap::new(),
            cache_hits: 0,
        }
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    /// Distinct signature pairs evaluated so far.
    pub fn cached_verdicts(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    /// Evaluate every unordered pair (i < j), returning only pairs that are
    /// incompatible or carry caveats.
    pub fn evaluate_batch<'a>(&mut self, items: &'a [DangerousGoodsItem]) -> Vec<PairVerdict<'a>> {
        let refs: Vec<&'a DangerousGoodsItem> = items.iter().collect();
        self.evaluate_refs(&refs)
    }

    /// Resolve `un_numbers` against `catalog` and evaluate the resulting set.
    ///
    /// UN numbers match case-insensitively and repeats are evaluated once.
    /// Unknown ones are listed in [`ShipmentReport::unresolved`] and do not
    /// stop the remaining pairs.
    pub fn plan_shipment(&mut self, catalog: &ItemCatalog, un_numbers: &[String]) -> ShipmentReport {
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut items = Vec::new();
        let mut unresolved = Vec::new();

        for un in un_numbers.iter().map(|un| un.trim().to_ascii_uppercase()) {
            if seen.contains(&un) {
                continue;
            }
            match catalog.item(&un) {
                Some(item) => items.push(item),
                None => unresolved.push(un.clone()),
            }
            seen.insert(un);
        }
        if !unresolved.is_empty() {
            tracing::warn!(count = unresolved.len(), unresolved = ?unresolved, "Shipment references unknown UN numbers");
        }

        let pairs = self.evaluate_refs(&items);
        let prohibited_pairs = pairs.iter().filter(|p| !p.verdict.compatible).count();
        let caveated_pairs = pairs.iter().filter(|p| p.verdict.has_caveats()).count();

        ShipmentReport {
            is_compatible: prohibited_pairs == 0 && unresolved.is_empty(),
            rule_store_version: self.store.version(),
            evaluated_at: Utc::now(),
            items: items.len(),
            pairs_evaluated: pair_count(items.len()),
            prohibited_pairs,
            caveated_pairs,
            unresolved,
            pairs: pairs.into_iter().map(PairFinding::from).collect(),
        }
    }

    fn evaluate_refs<'a>(&mut self, items: &[&'a DangerousGoodsItem]) -> Vec<PairVerdict<'a>> {
        let profiles: Vec<HazardProfile> = items.iter().map(|item| HazardProfile::from_item(item)).collect();
        let signatures: Vec<ProfileSignature> = profiles.iter().map(HazardProfile::signature).collect();
        let hits_before = self.cache_hits;

        let mut findings = Vec::new();
        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                let verdict = self.verdict_for(&profiles[i], &profiles[j], &signatures[i], &signatures[j]);
                if !verdict.is_clean() {
                    findings.push(PairVerdict {
                        first: items[i],
                        second: items[j],
                        verdict,
                    });
                }
            }
        }

        tracing::debug!(
            items = items.len(),
            pairs = pair_count(items.len()),
            findings = findings.len(),
            cache_hits = self.cache_hits - hits_before,
            version = self.store.version(),
            "Evaluated segregation batch"
        );
        findings
    }

    fn verdict_for(
        &mut self,
        a: &HazardProfile,
        b: &HazardProfile,
        sig_a: &ProfileSignature,
        sig_b: &ProfileSignature,
    ) -> CompatibilityVerdict {
        let key = (sig_a.clone(), sig_b.clone());
        if let Some(verdict) = self.cache.get(&key) {
            self.cache_hits += 1;
            return verdict.clone();
        }
        let verdict = CompatibilityEvaluator::new(&self.store).evaluate(a, b);
        self.cache.insert(key, verdict.clone());
        verdict
    }
}

fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}
