//! Regional partitioning of localities and natural cities.
//!
//! A regionalization groups INEGI state codes into named regions. Each
//! feature is assigned to the region of the state polygon containing its
//! centroid, so every feature lands in at most one region and its
//! attributes are never split across regions.

use std::path::Path;

use natural_cities_analytics::analysis::{AnalysisOptions, PowerLawAnalysis, analyze};
use natural_cities_analytics::describe::describe;
use natural_cities_analytics::{AnalyticsError, SizeSample};
use natural_cities_analytics_models::DescriptiveSummary;
use natural_cities_geography_models::{Regionalization, inegi};
use natural_cities_spatial::{ComponentIndex, Locality, area, centroid};

use crate::GeographyError;

/// Id of the default regionalization.
pub const DEFAULT_REGIONALIZATION: &str = "perez_campuzano_2015";

/// Number of built-in regionalizations. Enforced by a test.
#[cfg(test)]
const EXPECTED_REGIONALIZATION_COUNT: usize = 1;

/// Embedded TOML regionalizations.
const REGIONALIZATION_TOMLS: &[(&str, &str)] = &[(
    "perez_campuzano_2015",
    include_str!("../regions/perez_campuzano_2015.toml"),
)];

/// Square metres per square kilometre.
const M2_PER_KM2: f64 = 1_000_000.0;

/// Returns all built-in regionalizations.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests.
#[must_use]
pub fn all_regionalizations() -> Vec<Regionalization> {
    REGIONALIZATION_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse regionalization '{name}': {e}"))
        })
        .collect()
}

/// Looks up a built-in regionalization by id.
#[must_use]
pub fn builtin(id: &str) -> Option<Regionalization> {
    all_regionalizations().into_iter().find(|r| r.id == id)
}

/// Resolves `name` as a built-in id, falling back to a TOML file path.
///
/// # Errors
///
/// Returns [`GeographyError`] if `name` is neither a built-in id nor a
/// readable regionalization file.
pub fn resolve(name: &str) -> Result<Regionalization, GeographyError> {
    if let Some(regionalization) = builtin(name) {
        return Ok(regionalization);
    }
    let content = std::fs::read_to_string(Path::new(name))?;
    let regionalization: Regionalization = toml::de::from_str(&content)?;

    for code in unknown_states(&regionalization) {
        log::warn!("Regionalization '{}' lists unknown state code '{code}'", regionalization.id);
    }
    for code in uncovered_states(&regionalization) {
        log::warn!(
            "Regionalization '{}' leaves {} ({code}) outside every region",
            regionalization.id,
            inegi::state_name(code)
        );
    }

    Ok(regionalization)
}

/// State codes listed by `regionalization` that are not INEGI state codes.
#[must_use]
pub fn unknown_states(regionalization: &Regionalization) -> Vec<&str> {
    regionalization
        .regions
        .iter()
        .flat_map(|r| r.states.iter().map(String::as_str))
        .filter(|code| !inegi::STATE_CODES.contains(code))
        .collect()
}

/// INEGI state codes that belong to no region of `regionalization`.
#[must_use]
pub fn uncovered_states(regionalization: &Regionalization) -> Vec<&'static str> {
    inegi::STATE_CODES
        .iter()
        .copied()
        .filter(|code| regionalization.region_of(code).is_none())
        .collect()
}

/// State polygons indexed for centroid lookups.
pub struct StateIndex {
    codes: Vec<String>,
    index: ComponentIndex,
}

impl StateIndex {
    /// Indexes state polygons keyed by their two-digit code.
    ///
    /// On a shared border the state with the lowest code wins.
    #[must_use]
    pub fn new(states: &[Locality]) -> Self {
        let mut sorted: Vec<&Locality> = states.iter().collect();
        sorted.sort_by(|a, b| a.key.cmp(&b.key));

        let codes: Vec<String> = sorted.iter().map(|s| s.key.clone()).collect();
        let index = ComponentIndex::new(sorted.iter().enumerate().flat_map(|(i, state)| {
            let id = u32::try_from(i).unwrap_or(u32::MAX);
            state.geometry.0.iter().cloned().map(move |polygon| (id, polygon))
        }));

        Self { codes, index }
    }

    /// Code of the state containing `locality`'s centroid.
    ///
    /// # Errors
    ///
    /// Returns [`GeographyError::Spatial`] if the centroid is undefined.
    pub fn state_of(&self, locality: &Locality) -> Result<Option<&str>, GeographyError> {
        let point = centroid(locality)?;
        Ok(self
            .index
            .lookup(&point)
            .and_then(|id| self.codes.get(id as usize))
            .map(String::as_str))
    }
}

/// Features of one region.
#[derive(Debug, Clone)]
pub struct RegionPartition<'a> {
    /// Region name.
    pub name: String,
    /// Features whose centroid lies in one of the region's states.
    pub members: Vec<&'a Locality>,
}

/// Assigns every feature to a region by the state containing its
/// centroid. Regions keep their declaration order; features outside
/// every region are counted and logged.
///
/// # Errors
///
/// Returns [`GeographyError::Spatial`] if a feature has no centroid.
pub fn partition<'a>(
    features: &'a [Locality],
    states: &StateIndex,
    regionalization: &Regionalization,
) -> Result<Vec<RegionPartition<'a>>, GeographyError> {
    let mut partitions: Vec<RegionPartition<'a>> = regionalization
        .regions
        .iter()
        .map(|r| RegionPartition {
            name: r.name.clone(),
            members: Vec::new(),
        })
        .collect();

    let mut unassigned = 0usize;
    for feature in features {
        let region = states
            .state_of(feature)?
            .and_then(|code| regionalization.region_of(code))
            .and_then(|region| partitions.iter_mut().find(|p| p.name == region.name));
        match region {
            Some(partition) => partition.members.push(feature),
            None => unassigned += 1,
        }
    }

    if unassigned > 0 {
        log::warn!(
            "{unassigned} of {} features fall outside every region of '{}'",
            features.len(),
            regionalization.id
        );
    }
    for p in &partitions {
        log::info!("Region {}: {} features", p.name, p.members.len());
    }

    Ok(partitions)
}

/// Statistics of one region.
#[derive(Debug)]
pub struct RegionalResult {
    /// Region name.
    pub region: String,
    /// Descriptive statistics, with the total member area in km².
    pub descriptive: Result<DescriptiveSummary, AnalyticsError>,
    /// Power-law analysis.
    pub power_law: Result<PowerLawAnalysis, AnalyticsError>,
}

/// Runs descriptive statistics and the power-law analysis of `attribute`
/// for every region.
///
/// A region whose data cannot be analysed keeps its error in the result
/// and the remaining regions still run.
#[must_use]
pub fn regional_analysis(
    partitions: &[RegionPartition<'_>],
    attribute: &str,
    options: &AnalysisOptions,
) -> Vec<RegionalResult> {
    partitions
        .iter()
        .map(|p| {
            let values: Vec<f64> = p
                .members
                .iter()
                .filter_map(|l| l.attribute(attribute))
                .collect();
            if values.len() < p.members.len() {
                log::warn!(
                    "Region {}: {} features lack '{attribute}'",
                    p.name,
                    p.members.len() - values.len()
                );
            }

            let area_km2 =
                p.members.iter().map(|l| area(&l.geometry)).sum::<f64>() / M2_PER_KM2;
            let descriptive = describe(&values, attribute, Some(area_km2));
            let power_law = SizeSample::new(&values).and_then(|sample| analyze(&sample, options));

            if let Err(e) = &power_law {
                log::warn!("Region {}: power-law analysis skipped: {e}", p.name);
            }

            RegionalResult {
                region: p.name.clone(),
                descriptive,
                power_law,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use geo::{MultiPolygon, Rect, coord};

    use super::*;

    fn square(key: &str, x: f64, y: f64, size: f64, population: f64) -> Locality {
        Locality {
            key: key.to_string(),
            projection: 6372,
            geometry: MultiPolygon(vec![
                Rect::new(coord! { x: x, y: y }, coord! { x: x + size, y: y + size }).to_polygon(),
            ]),
            attributes: BTreeMap::from([("POBTOT".to_string(), population)]),
        }
    }

    fn regionalization() -> Regionalization {
        toml::de::from_str(
            r#"
            id = "test"
            name = "Test"

            [[regions]]
            name = "west"
            states = ["01"]

            [[regions]]
            name = "east"
            states = ["02"]
            "#,
        )
        .unwrap()
    }

    fn states() -> Vec<Locality> {
        vec![square("02", 100.0, 0.0, 100.0, 0.0), square("01", 0.0, 0.0, 100.0, 0.0)]
    }

    #[test]
    fn loads_builtin_regionalizations() {
        let all = all_regionalizations();
        assert_eq!(
            all.len(),
            EXPECTED_REGIONALIZATION_COUNT,
            "Update EXPECTED_REGIONALIZATION_COUNT after adding/removing regionalizations."
        );
    }

    #[test]
    fn default_regionalization_covers_every_state_once() {
        let regionalization = builtin(DEFAULT_REGIONALIZATION).unwrap();
        let names: Vec<&str> = regionalization.regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["northern", "south", "center"]);

        let mut seen = BTreeSet::new();
        for region in &regionalization.regions {
            for state in &region.states {
                assert!(seen.insert(state.as_str()), "state {state} listed twice");
            }
        }
        assert!(unknown_states(&regionalization).is_empty());
        assert!(uncovered_states(&regionalization).is_empty());
    }

    #[test]
    fn reports_gaps_in_a_regionalization() {
        let mut partial = regionalization();
        partial.regions[1].states.push("40".to_string());

        assert_eq!(unknown_states(&partial), vec!["40"]);
        let uncovered = uncovered_states(&partial);
        assert_eq!(uncovered.len(), 30);
        assert!(!uncovered.contains(&"01"));
        assert!(uncovered.contains(&"32"));
    }

    #[test]
    fn assigns_by_centroid_state() {
        let states = StateIndex::new(&states());
        let features = vec![
            square("a", 10.0, 10.0, 5.0, 100.0),
            // Straddles the border; centroid at x = 102 is in state 02.
            square("b", 96.0, 10.0, 12.0, 50.0),
            square("c", 150.0, 50.0, 5.0, 20.0),
            square("far", 500.0, 500.0, 5.0, 1.0),
        ];

        let partitions = partition(&features, &states, &regionalization()).unwrap();
        let keys = |i: usize| -> Vec<&str> {
            partitions[i].members.iter().map(|l| l.key.as_str()).collect()
        };
        assert_eq!(partitions[0].name, "west");
        assert_eq!(keys(0), vec!["a"]);
        assert_eq!(keys(1), vec!["b", "c"]);
    }

    #[test]
    fn shared_border_goes_to_lowest_code() {
        let states = StateIndex::new(&states());
        // Centroid exactly on x = 100.
        let on_border = square("edge", 95.0, 40.0, 10.0, 1.0);
        assert_eq!(states.state_of(&on_border).unwrap(), Some("01"));
    }

    #[test]
    fn regional_analysis_keeps_going_after_degenerate_region() {
        let states = StateIndex::new(&states());
        let mut features = vec![square("only", 10.0, 10.0, 5.0, 7.0)];
        for (i, population) in [1.0, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 40.0, 120.0, 500.0]
            .into_iter()
            .enumerate()
        {
            #[allow(clippy::cast_precision_loss)]
            let offset = i as f64 * 8.0;
            features.push(square(&format!("e{i}"), 105.0 + offset, 10.0, 5.0, population));
        }

        let partitions = partition(&features, &states, &regionalization()).unwrap();
        let options = AnalysisOptions {
            test: false,
            ..AnalysisOptions::default()
        };
        let results = regional_analysis(&partitions, "POBTOT", &options);

        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0].power_law,
            Err(AnalyticsError::InsufficientData { .. })
        ));
        let west = results[0].descriptive.as_ref().unwrap();
        assert_eq!(west.count, 1);
        assert!((west.area_km2.unwrap() - 25.0 / 1_000_000.0).abs() < 1e-12);

        let east = results[1].power_law.as_ref().unwrap();
        assert!(east.model.alpha > 1.0);
        assert_eq!(results[1].descriptive.as_ref().unwrap().count, 10);
    }
}
