//! Normalized hazard profile of an item: everything the evaluator needs.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::hazard::{HazardClass, HazardToken, EXPLOSIVES, LITHIUM_BATTERY_UN_NUMBERS, MISCELLANEOUS};
use crate::item::{parse_subsidiary_risks, DangerousGoodsItem};
use crate::types::{GroupCode, UnNumber};

/// The evaluator's view of one item.
///
/// Construction is total: empty or malformed class tokens never fail, they
/// either vanish (blank) or become [`HazardToken::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HazardProfile {
    pub un_number: UnNumber,
    /// Primary class plus all subsidiary risks, deduplicated.
    pub classes: BTreeSet<HazardToken>,
    pub groups: BTreeSet<GroupCode>,
    pub is_bulk: bool,
    pub is_fire_risk: bool,
    pub is_lithium_battery: bool,
}

/// The parts of a profile that influence a verdict. Two items with equal
/// signatures are indistinguishable to the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProfileSignature {
    classes: Vec<HazardToken>,
    groups: Vec<GroupCode>,
    is_bulk: bool,
    is_fire_risk: bool,
    is_lithium_battery: bool,
}

impl HazardProfile {
    pub fn from_item(item: &DangerousGoodsItem) -> Self {
        let classes: BTreeSet<HazardToken> = std::iter::once(item.hazard_class.as_str())
            .chain(item.subsidiary_risks.iter().map(String::as_str))
            .flat_map(parse_subsidiary_risks)
            .map(|token| HazardToken::parse(&token))
            .collect();

        let groups = item
            .segregation_groups
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect();

        let is_fire_risk = item.is_fire_risk || known(&classes).any(|c| c.is_fire_risk());
        let is_lithium_battery = known(&classes).any(|c| MISCELLANEOUS.covers(c))
            && LITHIUM_BATTERY_UN_NUMBERS.contains(&item.un_number.as_str());

        Self {
            un_number: item.un_number.clone(),
            classes,
            groups,
            is_bulk: item.is_bulk_transport_allowed,
            is_fire_risk,
            is_lithium_battery,
        }
    }

    /// Known classes only; unrecognized tokens never match a rule.
    pub fn known_classes(&self) -> impl Iterator<Item = &HazardClass> {
        known(&self.classes)
    }

    pub fn carries(&self, operand: &HazardClass) -> bool {
        self.known_classes().any(|c| operand.covers(c))
    }

    pub fn is_explosive(&self) -> bool {
        self.carries(&EXPLOSIVES)
    }

    pub fn is_food_sensitive(&self) -> bool {
        self.known_classes().any(|c| c.is_food_sensitive())
    }

    pub fn in_group(&self, code: &str) -> bool {
        self.groups.contains(code)
    }

    pub fn signature(&self) -> ProfileSignature {
        ProfileSignature {
            classes: self.classes.iter().cloned().collect(),
            groups: self.groups.iter().cloned().collect(),
            is_bulk: self.is_bulk,
            is_fire_risk: self.is_fire_risk,
            is_lithium_battery: self.is_lithium_battery,
        }
    }
}

fn known(classes: &BTreeSet<HazardToken>) -> impl Iterator<Item = &HazardClass> {
    classes.iter().filter_map(HazardToken::as_class)
}
