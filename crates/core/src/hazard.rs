//! Hazard class tokens and the policy tables keyed on them.
//!
//! Rule operands are always a validated [`HazardClass`]. Items carry
//! [`HazardToken`]s, which tolerate anything a reference-data import may
//! contain: tokens outside the closed class set are kept verbatim and simply
//! never match a rule.
//!
//! Matching is "major class implies all divisions": an operand without a
//! division (`3`, `1`) covers every division of that class (`1.1`, `1.4`),
//! while an operand with a division covers only itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Closed class set
// ---------------------------------------------------------------------------

/// Highest valid major class.
const MAX_MAJOR: u8 = 9;

/// Number of divisions defined for each major class (index = major).
/// Zero means the class has no divisions.
const DIVISIONS_PER_CLASS: [u8; 10] = [0, 6, 3, 0, 3, 2, 2, 0, 0, 0];

/// A regulatory hazard class, optionally refined to a division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HazardClass {
    major: u8,
    division: Option<u8>,
}

impl HazardClass {
    /// Build a class, rejecting anything outside the closed set.
    pub fn new(major: u8, division: Option<u8>) -> Result<Self, InvalidHazardClass> {
        let valid_major = (1..=MAX_MAJOR).contains(&major);
        let valid_division = match division {
            None => true,
            Some(d) => valid_major && d >= 1 && d <= DIVISIONS_PER_CLASS[major as usize],
        };
        if !valid_major || !valid_division {
            let token = match division {
                Some(d) => format!("{major}.{d}"),
                None => major.to_string(),
            };
            return Err(InvalidHazardClass(token));
        }
        Ok(Self { major, division })
    }

    /// Major class number (`4` for `4.3`).
    pub fn major(&self) -> u8 {
        self.major
    }

    /// Division number, `None` for a whole class.
    pub fn division(&self) -> Option<u8> {
        self.division
    }

    /// The whole class this token belongs to (`1.4` -> `1`).
    pub fn major_class(&self) -> Self {
        Self {
            major: self.major,
            division: None,
        }
    }

    /// Whether a rule operand `self` applies to an item carrying `item_class`.
    pub fn covers(&self, item_class: &HazardClass) -> bool {
        match self.division {
            None => self.major == item_class.major,
            Some(_) => self == item_class,
        }
    }

    /// Operand keys a rule lookup must try for this item class: the class
    /// itself and, when it is a division, its whole class.
    pub fn lookup_keys(&self) -> Vec<HazardClass> {
        match self.division {
            Some(_) => vec![*self, self.major_class()],
            None => vec![*self],
        }
    }

    /// Class carries a fire risk for the fire-risk conditions.
    pub fn is_fire_risk(&self) -> bool {
        FIRE_RISK_CLASSES.iter().any(|c| c.covers(self))
    }

    /// Class must be kept away from foodstuffs.
    pub fn is_food_sensitive(&self) -> bool {
        FOOD_SENSITIVE_CLASSES.iter().any(|c| c.covers(self))
    }
}

impl fmt::Display for HazardClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.division {
            Some(d) => write!(f, "{}.{d}", self.major),
            None => write!(f, "{}", self.major),
        }
    }
}

/// Error for a token that is not one of the known hazard classes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown hazard class: '{0}'")]
pub struct InvalidHazardClass(pub String);

impl FromStr for HazardClass {
    type Err = InvalidHazardClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || InvalidHazardClass(s.to_string());

        let (major, division) = match trimmed.split_once('.') {
            Some((major, division)) => (major, Some(division)),
            None => (trimmed, None),
        };
        if major.is_empty() || !major.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let major: u8 = major.parse().map_err(|_| invalid())?;
        let division = match division {
            Some(d) if !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()) => {
                Some(d.parse::<u8>().map_err(|_| invalid())?)
            }
            Some(_) => return Err(invalid()),
            None => None,
        };
        HazardClass::new(major, division).map_err(|_| invalid())
    }
}

impl TryFrom<String> for HazardClass {
    type Error = InvalidHazardClass;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HazardClass> for String {
    fn from(value: HazardClass) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Item-side tokens
// ---------------------------------------------------------------------------

/// A hazard class as carried by an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HazardToken {
    Known(HazardClass),
    /// Kept verbatim; matches no rule.
    Unrecognized(String),
}

impl HazardToken {
    /// Tolerant parse. Never fails.
    ///
    /// Strips an explosive compatibility-group suffix (`1.4S` -> `1.4`)
    /// before matching against the closed class set.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let candidate = strip_compatibility_group(trimmed);
        match candidate.parse::<HazardClass>() {
            Ok(class) => HazardToken::Known(class),
            Err(_) => HazardToken::Unrecognized(trimmed.to_string()),
        }
    }

    pub fn as_class(&self) -> Option<&HazardClass> {
        match self {
            HazardToken::Known(class) => Some(class),
            HazardToken::Unrecognized(_) => None,
        }
    }
}

fn strip_compatibility_group(token: &str) -> &str {
    match token.strip_suffix(|c: char| ('A'..='S').contains(&c)) {
        Some(stripped) if stripped.starts_with("1.") => stripped,
        _ => token,
    }
}

impl fmt::Display for HazardToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HazardToken::Known(class) => class.fmt(f),
            HazardToken::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

impl From<String> for HazardToken {
    fn from(value: String) -> Self {
        HazardToken::parse(&value)
    }
}

impl From<HazardToken> for String {
    fn from(value: HazardToken) -> Self {
        value.to_string()
    }
}

impl From<HazardClass> for HazardToken {
    fn from(value: HazardClass) -> Self {
        HazardToken::Known(value)
    }
}

// ---------------------------------------------------------------------------
// Policy tables
// ---------------------------------------------------------------------------

const fn class(major: u8, division: Option<u8>) -> HazardClass {
    HazardClass { major, division }
}

/// Flammable liquids, flammable solids, spontaneously combustible and
/// dangerous-when-wet substances.
pub const FIRE_RISK_CLASSES: &[HazardClass] = &[
    class(3, None),
    class(4, Some(1)),
    class(4, Some(2)),
    class(4, Some(3)),
];

/// Classes that must be kept away from foodstuffs.
pub const FOOD_SENSITIVE_CLASSES: &[HazardClass] = &[
    class(2, Some(3)),
    class(6, Some(1)),
    class(6, Some(2)),
    class(7, None),
    class(8, None),
];

/// Class 1 (explosives), all divisions.
pub const EXPLOSIVES: HazardClass = class(1, None);

/// Class 9 (miscellaneous), the class lithium batteries ship under.
pub const MISCELLANEOUS: HazardClass = class(9, None);

/// UN numbers of lithium cells and batteries.
pub const LITHIUM_BATTERY_UN_NUMBERS: &[&str] = &["UN3090", "UN3091", "UN3480", "UN3481", "UN3536"];
