use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

const ACCOUNT_NUMBER_WIDTH: usize = 13;

/// Unique assessor account identifier.
///
/// All-digit identifiers are zero-padded to the assessor's 13 character width so lookups
/// match stored records regardless of how the caller typed them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    pub fn new(raw: &str) -> Self {
        let compact: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
        if !compact.is_empty() && compact.chars().all(|ch| ch.is_ascii_digit()) {
            Self(format!("{compact:0>width$}", width = ACCOUNT_NUMBER_WIDTH))
        } else {
            Self(compact)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AccountNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(&raw))
    }
}

/// Assessor construction-quality tier (e.g. `B+`, `C`, `X-`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Grade(String);

impl Grade {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Position of the tier in the quality ordering, higher is better.
    ///
    /// Letter tiers rank `X > A > B > C > D > E > F` with `+`/`-` refinements; purely numeric
    /// codes rank by value. Returns `None` for codes outside both schemes.
    pub fn rank(&self) -> Option<i32> {
        if let Ok(value) = self.0.parse::<i32>() {
            return Some(value);
        }

        let mut chars = self.0.chars();
        let base = match chars.next()? {
            'X' => 6,
            'A' => 5,
            'B' => 4,
            'C' => 3,
            'D' => 2,
            'E' => 1,
            'F' => 0,
            _ => return None,
        };
        let modifier = match (chars.next(), chars.next()) {
            (None, _) => 1,
            (Some('+'), None) => 2,
            (Some('-'), None) => 0,
            _ => return None,
        };

        Some(base * 3 + modifier)
    }
}

impl PartialOrd for Grade {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.rank(), other.rank()) {
            (Some(left), Some(right)) => Some(left.cmp(&right)),
            _ if self == other => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(&raw))
    }
}

/// Read-only assessor record for a single property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub account_number: AccountNumber,
    pub street_address: String,
    pub year_built: Option<i32>,
    pub cdu: f64,
    pub grade: Option<Grade>,
    pub building_area: f64,
    pub total_appraised_value: f64,
    pub building_value: f64,
    pub extra_features_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_value: Option<f64>,
}

impl Property {
    pub fn has_usable_area(&self) -> bool {
        self.building_area.is_finite() && self.building_area > 0.0
    }
}

/// A pool member together with the values derived for it during an analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparableCandidate {
    #[serde(flatten)]
    pub property: Property,
    pub cdu_factor: f64,
    pub grade_factor: f64,
    pub cdu_adjusted_value: f64,
    pub price_per_sqft: f64,
}

/// Summary statistics over a ranked comparable pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueAnalysis {
    pub(crate) lowest_five_comps: Vec<Arc<ComparableCandidate>>,
    pub(crate) median_price_per_sqft: Option<f64>,
    pub(crate) final_adjusted_value: Option<f64>,
    pub(crate) potential_reduction: Option<f64>,
}

impl ValueAnalysis {
    pub fn lowest_five_comps(&self) -> &[Arc<ComparableCandidate>] {
        &self.lowest_five_comps
    }

    pub fn median_price_per_sqft(&self) -> Option<f64> {
        self.median_price_per_sqft
    }

    pub fn final_adjusted_value(&self) -> Option<f64> {
        self.final_adjusted_value
    }

    pub fn potential_reduction(&self) -> Option<f64> {
        self.potential_reduction
    }
}

/// Immutable result of a single comparable analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub(crate) reference_property: Property,
    pub(crate) comparable_properties: Vec<Arc<ComparableCandidate>>,
    pub(crate) value_analysis: ValueAnalysis,
    pub(crate) num_comps_found: usize,
}

impl AnalysisResult {
    pub fn reference_property(&self) -> &Property {
        &self.reference_property
    }

    pub fn comparable_properties(&self) -> &[Arc<ComparableCandidate>] {
        &self.comparable_properties
    }

    pub fn value_analysis(&self) -> &ValueAnalysis {
        &self.value_analysis
    }

    pub fn num_comps_found(&self) -> usize {
        self.num_comps_found
    }
}
