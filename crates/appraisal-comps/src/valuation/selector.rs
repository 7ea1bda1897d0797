use std::fmt;

use serde::{Deserialize, Serialize};

use super::domain::Property;

/// Similarity bounds a candidate must fall within relative to the reference property.
///
/// `None` disables the corresponding bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWindow {
    pub area_tolerance_pct: Option<f64>,
    /// Only applied when the reference has a known, positive land area.
    pub land_area_tolerance_pct: Option<f64>,
    pub year_built_tolerance: Option<u32>,
    pub cdu_tolerance: Option<f64>,
}

impl Default for SimilarityWindow {
    fn default() -> Self {
        Self {
            area_tolerance_pct: Some(20.0),
            land_area_tolerance_pct: None,
            year_built_tolerance: None,
            cdu_tolerance: None,
        }
    }
}

impl SimilarityWindow {
    fn admits(&self, reference: &Property, candidate: &Property) -> bool {
        if let Some(pct) = self.area_tolerance_pct {
            if reference.has_usable_area() {
                let band = reference.building_area * pct / 100.0;
                let min = reference.building_area - band;
                let max = reference.building_area + band;
                if candidate.building_area < min || candidate.building_area > max {
                    return false;
                }
            }
        }

        if let (Some(pct), Some(land_area)) = (self.land_area_tolerance_pct, reference.land_area) {
            if land_area > 0.0 {
                let band = land_area * pct / 100.0;
                let within = candidate
                    .land_area
                    .map(|candidate_land| {
                        candidate_land >= land_area - band && candidate_land <= land_area + band
                    })
                    .unwrap_or(false);
                if !within {
                    return false;
                }
            }
        }

        if let (Some(tolerance), Some(year)) = (self.year_built_tolerance, reference.year_built) {
            let within = candidate
                .year_built
                .map(|candidate_year| (candidate_year - year).unsigned_abs() <= tolerance)
                .unwrap_or(false);
            if !within {
                return false;
            }
        }

        if let Some(tolerance) = self.cdu_tolerance {
            if (candidate.cdu - reference.cdu).abs() > tolerance {
                return false;
            }
        }

        true
    }

    fn widened(self, year: bool, cdu: bool, area: bool) -> Self {
        Self {
            area_tolerance_pct: self
                .area_tolerance_pct
                .map(|pct| if area { pct * 2.0 } else { pct }),
            land_area_tolerance_pct: self
                .land_area_tolerance_pct
                .map(|pct| if area { pct * 2.0 } else { pct }),
            year_built_tolerance: self
                .year_built_tolerance
                .map(|years| if year { years.saturating_mul(2) } else { years }),
            cdu_tolerance: self
                .cdu_tolerance
                .map(|tolerance| if cdu { tolerance * 2.0 } else { tolerance }),
        }
    }
}

/// Comparable pool policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub window: SimilarityWindow,
    pub grade_must_match: bool,
    pub neighborhood_must_match: bool,
    /// Pool size below which the expansion windows are tried.
    pub minimum_comps: usize,
    pub expansions: Vec<SimilarityWindow>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            window: SimilarityWindow::default(),
            grade_must_match: false,
            neighborhood_must_match: false,
            minimum_comps: 5,
            expansions: Vec::new(),
        }
    }
}

impl SelectionConfig {
    /// Adds three progressively wider windows: a doubled year band, then also a doubled CDU
    /// band, then also doubled building and land area bands.
    pub fn with_progressive_expansion(mut self) -> Self {
        let base = self.window;
        self.expansions = vec![
            base.widened(true, false, false),
            base.widened(true, true, false),
            base.widened(true, true, true),
        ];
        self
    }
}

/// Which window produced the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTier {
    Initial,
    Expansion(usize),
}

impl fmt::Display for SelectionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionTier::Initial => write!(f, "initial"),
            SelectionTier::Expansion(step) => write!(f, "expansion_{step}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolSelection {
    pub pool: Vec<Property>,
    pub tier: SelectionTier,
}

/// Narrows a candidate universe to properties comparable with the reference.
pub struct ComparableSelector {
    config: SelectionConfig,
}

impl ComparableSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Applies the base window only.
    pub fn select_pool(&self, reference: &Property, universe: &[Property]) -> Vec<Property> {
        self.filter(reference, universe, &self.config.window)
    }

    /// Applies the base window, widening through the configured expansions while the pool is
    /// smaller than `minimum_comps`. Falls back to the widest attempt.
    pub fn select(&self, reference: &Property, universe: &[Property]) -> PoolSelection {
        let mut selection = PoolSelection {
            pool: self.select_pool(reference, universe),
            tier: SelectionTier::Initial,
        };

        for (index, window) in self.config.expansions.iter().enumerate() {
            if selection.pool.len() >= self.config.minimum_comps {
                break;
            }
            selection = PoolSelection {
                pool: self.filter(reference, universe, window),
                tier: SelectionTier::Expansion(index + 1),
            };
        }

        tracing::debug!(
            account = %reference.account_number,
            tier = %selection.tier,
            pool = selection.pool.len(),
            "comparable pool selected"
        );
        selection
    }

    fn filter(
        &self,
        reference: &Property,
        universe: &[Property],
        window: &SimilarityWindow,
    ) -> Vec<Property> {
        universe
            .iter()
            .filter(|candidate| candidate.account_number != reference.account_number)
            .filter(|candidate| candidate.has_usable_area())
            .filter(|candidate| !self.config.grade_must_match || candidate.grade == reference.grade)
            .filter(|candidate| {
                !self.config.neighborhood_must_match
                    || reference.neighborhood_code.is_none()
                    || candidate.neighborhood_code == reference.neighborhood_code
            })
            .filter(|candidate| window.admits(reference, candidate))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::domain::Grade;
    use crate::valuation::tests::common::property;

    fn accounts(pool: &[Property]) -> Vec<&str> {
        pool.iter()
            .map(|candidate| candidate.account_number.as_str())
            .collect()
    }

    fn reference() -> Property {
        property("1", 2000.0, 30.0, 200_000.0)
    }

    #[test]
    fn excludes_reference_and_unusable_areas() {
        let universe = vec![
            reference(),
            property("2", 2000.0, 30.0, 200_000.0),
            property("3", 0.0, 30.0, 200_000.0),
            property("4", -10.0, 30.0, 200_000.0),
        ];
        let selector = ComparableSelector::new(SelectionConfig {
            window: SimilarityWindow {
                area_tolerance_pct: None,
                ..SimilarityWindow::default()
            },
            ..SelectionConfig::default()
        });

        let pool = selector.select_pool(&reference(), &universe);
        assert_eq!(accounts(&pool), vec!["0000000000002"]);
    }

    #[test]
    fn area_band_is_inclusive_twenty_percent_by_default() {
        let universe = vec![
            property("2", 1600.0, 30.0, 1.0),
            property("3", 2400.0, 30.0, 1.0),
            property("4", 1599.0, 30.0, 1.0),
            property("5", 2401.0, 30.0, 1.0),
        ];
        let selector = ComparableSelector::new(SelectionConfig::default());

        let pool = selector.select_pool(&reference(), &universe);
        assert_eq!(accounts(&pool), vec!["0000000000002", "0000000000003"]);
    }

    #[test]
    fn year_band_drops_candidates_without_year() {
        let mut reference = reference();
        reference.year_built = Some(2000);
        let mut near = property("2", 2000.0, 30.0, 1.0);
        near.year_built = Some(2003);
        let mut far = property("3", 2000.0, 30.0, 1.0);
        far.year_built = Some(1990);
        let mut unknown = property("4", 2000.0, 30.0, 1.0);
        unknown.year_built = None;

        let selector = ComparableSelector::new(SelectionConfig {
            window: SimilarityWindow {
                year_built_tolerance: Some(3),
                ..SimilarityWindow::default()
            },
            ..SelectionConfig::default()
        });

        let pool = selector.select_pool(&reference, &[near, far, unknown]);
        assert_eq!(accounts(&pool), vec!["0000000000002"]);
    }

    #[test]
    fn land_band_applies_only_when_reference_land_is_known() {
        let mut reference = reference();
        reference.land_area = Some(6_000.0);
        let mut inside = property("2", 2000.0, 30.0, 1.0);
        inside.land_area = Some(6_500.0);
        let mut outside = property("3", 2000.0, 30.0, 1.0);
        outside.land_area = Some(7_000.0);
        let unknown = property("4", 2000.0, 30.0, 1.0);
        let universe = vec![inside, outside, unknown];

        let selector = ComparableSelector::new(SelectionConfig {
            window: SimilarityWindow {
                land_area_tolerance_pct: Some(10.0),
                ..SimilarityWindow::default()
            },
            ..SelectionConfig::default()
        });

        let pool = selector.select_pool(&reference, &universe);
        assert_eq!(accounts(&pool), vec!["0000000000002"]);

        reference.land_area = None;
        let pool = selector.select_pool(&reference, &universe);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn widest_expansion_doubles_land_band_and_saturates_years() {
        let window = SimilarityWindow {
            land_area_tolerance_pct: Some(10.0),
            year_built_tolerance: Some(u32::MAX - 1),
            ..SimilarityWindow::default()
        };
        let config = SelectionConfig {
            window,
            ..SelectionConfig::default()
        }
        .with_progressive_expansion();

        assert_eq!(config.expansions[1].land_area_tolerance_pct, Some(10.0));
        let widest = config.expansions[2];
        assert_eq!(widest.land_area_tolerance_pct, Some(20.0));
        assert_eq!(widest.area_tolerance_pct, Some(40.0));
        assert_eq!(widest.year_built_tolerance, Some(u32::MAX));
    }

    #[test]
    fn grade_and_neighborhood_gates_apply_when_enabled() {
        let mut reference = reference();
        reference.neighborhood_code = Some("8401".to_string());
        let mut same = property("2", 2000.0, 30.0, 1.0);
        same.neighborhood_code = Some("8401".to_string());
        let mut other_grade = same.clone();
        other_grade.account_number = crate::valuation::domain::AccountNumber::new("3");
        other_grade.grade = Some(Grade::new("A"));
        let mut other_area = same.clone();
        other_area.account_number = crate::valuation::domain::AccountNumber::new("4");
        other_area.neighborhood_code = Some("9900".to_string());

        let selector = ComparableSelector::new(SelectionConfig {
            grade_must_match: true,
            neighborhood_must_match: true,
            ..SelectionConfig::default()
        });

        let pool = selector.select_pool(&reference, &[same, other_grade, other_area]);
        assert_eq!(accounts(&pool), vec!["0000000000002"]);
    }

    #[test]
    fn expansion_widens_until_minimum_is_met() {
        let mut reference = reference();
        reference.year_built = Some(2000);
        let universe: Vec<Property> = (2..=7)
            .map(|index| {
                let mut candidate = property(&index.to_string(), 2000.0, 30.0, 1.0);
                candidate.year_built = Some(2000 + index);
                candidate
            })
            .collect();

        let selector = ComparableSelector::new(
            SelectionConfig {
                window: SimilarityWindow {
                    year_built_tolerance: Some(3),
                    ..SimilarityWindow::default()
                },
                ..SelectionConfig::default()
            }
            .with_progressive_expansion(),
        );

        let selection = selector.select(&reference, &universe);
        assert_eq!(selection.tier, SelectionTier::Expansion(1));
        assert_eq!(selection.pool.len(), 5);
        assert_eq!(selection.tier.to_string(), "expansion_1");
    }

    #[test]
    fn expansion_falls_back_to_widest_attempt() {
        let universe = vec![property("2", 2000.0, 30.0, 1.0)];
        let selector =
            ComparableSelector::new(SelectionConfig::default().with_progressive_expansion());

        let selection = selector.select(&reference(), &universe);
        assert_eq!(selection.tier, SelectionTier::Expansion(3));
        assert_eq!(selection.pool.len(), 1);
    }

    #[test]
    fn empty_pool_is_not_an_error() {
        let selector = ComparableSelector::new(SelectionConfig::default());
        let selection = selector.select(&reference(), &[reference()]);
        assert!(selection.pool.is_empty());
        assert_eq!(selection.tier, SelectionTier::Initial);
    }
}
