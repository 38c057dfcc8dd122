//! Dangerous-goods reference records: items and segregation groups.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;
use crate::types::{GroupCode, UnNumber};

/// UN numbers are `UN` followed by exactly four digits.
static UN_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^UN\d{4}$").expect("valid UN number pattern"));

/// Regulatory severity tier, independent of hazard class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackingGroup {
    I,
    II,
    III,
    #[default]
    #[serde(rename = "NONE", alias = "")]
    None,
}

impl PackingGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::I => "I",
            Self::II => "II",
            Self::III => "III",
            Self::None => "NONE",
        }
    }
}

/// A dangerous-goods entry as supplied by reference-data import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DangerousGoodsItem {
    pub un_number: UnNumber,
    #[serde(default)]
    pub proper_shipping_name: String,
    /// Primary hazard class token, e.g. `3` or `1.4S`. Blank when missing.
    #[serde(default, deserialize_with = "deserialize_hazard_class")]
    pub hazard_class: String,
    /// Accepts a JSON array, a comma-separated string or a bare number.
    #[serde(default, deserialize_with = "deserialize_subsidiary_risks")]
    pub subsidiary_risks: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_packing_group")]
    pub packing_group: PackingGroup,
    #[serde(default)]
    pub is_bulk_transport_allowed: bool,
    #[serde(default)]
    pub is_fire_risk: bool,
    /// Codes of the segregation groups this item belongs to.
    #[serde(default)]
    pub segregation_groups: Vec<GroupCode>,
}

impl DangerousGoodsItem {
    /// Minimal constructor used by tests and tooling.
    pub fn new(un_number: impl Into<String>, hazard_class: impl Into<String>) -> Self {
        Self {
            un_number: un_number.into(),
            proper_shipping_name: String::new(),
            hazard_class: hazard_class.into(),
            subsidiary_risks: Vec::new(),
            packing_group: PackingGroup::None,
            is_bulk_transport_allowed: false,
            is_fire_risk: false,
            segregation_groups: Vec::new(),
        }
    }

    pub fn with_subsidiary_risks(mut self, risks: &[&str]) -> Self {
        self.subsidiary_risks = risks.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.segregation_groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn bulk(mut self) -> Self {
        self.is_bulk_transport_allowed = true;
        self
    }

    pub fn fire_risk(mut self) -> Self {
        self.is_fire_risk = true;
        self
    }

    pub fn is_member_of(&self, group: &str) -> bool {
        self.segregation_groups.iter().any(|g| g == group)
    }
}

/// A named bucket of items governed by group-level rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegregationGroup {
    pub code: GroupCode,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl SegregationGroup {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: None,
        }
    }
}

/// Split a raw subsidiary-risk list on commas, dropping blanks.
pub fn parse_subsidiary_risks(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validate the `UN####` format.
pub fn validate_un_number(un_number: &str) -> Result<(), CoreError> {
    if !UN_NUMBER_RE.is_match(un_number) {
        return Err(CoreError::Validation(format!(
            "UN number must be 'UN' followed by four digits, got '{un_number}'"
        )));
    }
    Ok(())
}

/// Validate a segregation group code.
pub fn validate_group_code(code: &str) -> Result<(), CoreError> {
    if code.trim().is_empty() {
        return Err(CoreError::Validation(
            "Segregation group code must not be empty".to_string(),
        ));
    }
    if code.trim() != code {
        return Err(CoreError::Validation(format!(
            "Segregation group code must not have surrounding whitespace: '{code}'"
        )));
    }
    Ok(())
}

/// Any JSON shape a reference-data field may arrive in. Shapes that carry no
/// usable token fall into `Other`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawField {
    Text(String),
    Integer(i64),
    Float(f64),
    List(Vec<RawField>),
    Other(IgnoredAny),
}

impl RawField {
    fn into_tokens(self) -> Vec<String> {
        match self {
            Self::Text(raw) => parse_subsidiary_risks(&raw),
            Self::Integer(n) => vec![n.to_string()],
            Self::Float(n) => vec![n.to_string()],
            Self::List(items) => items.into_iter().flat_map(Self::into_tokens).collect(),
            Self::Other(_) => Vec::new(),
        }
    }
}

/// Numbers become class tokens; anything unusable becomes an empty class.
fn deserialize_hazard_class<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let class = match RawField::deserialize(deserializer)? {
        RawField::Text(raw) => raw.trim().to_string(),
        RawField::Integer(n) => n.to_string(),
        RawField::Float(n) => n.to_string(),
        RawField::List(_) | RawField::Other(_) => String::new(),
    };
    Ok(class)
}

fn deserialize_subsidiary_risks<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(RawField::deserialize(deserializer)?.into_tokens())
}

/// Unknown or blank packing groups degrade to `NONE`.
fn deserialize_packing_group<'de, D>(deserializer: D) -> Result<PackingGroup, D::Error>
where
    D: Deserializer<'de>,
{
    let group = match RawField::deserialize(deserializer)? {
        RawField::Text(raw) => match raw.trim().to_ascii_uppercase().as_str() {
            "I" | "1" => PackingGroup::I,
            "II" | "2" => PackingGroup::II,
            "III" | "3" => PackingGroup::III,
            _ => PackingGroup::None,
        },
        RawField::Integer(1) => PackingGroup::I,
        RawField::Integer(2) => PackingGroup::II,
        RawField::Integer(3) => PackingGroup::III,
        _ => PackingGroup::None,
    };
    Ok(group)
}
