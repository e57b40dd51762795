#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census locality records and regionalization types.
//!
//! These types describe the tabular side of the input data (census
//! attributes keyed by `CVEGEO`) and the regional groupings of states
//! used for regional analysis. They carry no geometry.

pub mod inegi;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of the census attribute holding total population.
pub const TOTAL_POPULATION: &str = "POBTOT";

/// Name of the census attribute holding total housing units.
pub const TOTAL_HOUSING: &str = "VIVTOT";

/// Name of the census attribute holding inhabited housing units.
pub const INHABITED_HOUSING: &str = "TVIVHAB";

/// Name of the SUN-2018 attribute holding the 2018 population estimate.
pub const SUN_POPULATION: &str = "POB_2018";

/// One row of the locality census after filtering and key construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CensusLocality {
    /// Nine-digit `CVEGEO` key (entity + municipality + locality).
    pub key: String,
    /// Numeric census attributes by column name (e.g. `"POBTOT"`).
    pub attributes: BTreeMap<String, f64>,
}

impl CensusLocality {
    /// Returns the value of an attribute, if present.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).copied()
    }
}

/// A named grouping of states into regions, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regionalization {
    /// Unique identifier (e.g., `"perez_campuzano_2015"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Bibliographic source of the grouping.
    pub source: Option<String>,
    /// Regions in declaration order.
    pub regions: Vec<RegionDefinition>,
}

impl Regionalization {
    /// Returns the region that a state code belongs to, if any.
    #[must_use]
    pub fn region_of(&self, state_code: &str) -> Option<&RegionDefinition> {
        self.regions
            .iter()
            .find(|r| r.states.iter().any(|s| s == state_code))
    }
}

/// A single region: a name plus the INEGI state codes it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDefinition {
    /// Region name (e.g., `"northern"`).
    pub name: String,
    /// Two-digit INEGI state codes.
    pub states: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_of_finds_state() {
        let regionalization: Regionalization = toml::from_str(
            r#"
            id = "test"
            name = "Test"

            [[regions]]
            name = "north"
            states = ["02", "03"]

            [[regions]]
            name = "south"
            states = ["07"]
            "#,
        )
        .unwrap();

        assert_eq!(
            regionalization.region_of("03").map(|r| r.name.as_str()),
            Some("north")
        );
        assert_eq!(
            regionalization.region_of("07").map(|r| r.name.as_str()),
            Some("south")
        );
        assert!(regionalization.region_of("09").is_none());
        assert!(regionalization.source.is_none());
    }

    #[test]
    fn census_locality_attribute_lookup() {
        let locality = CensusLocality {
            key: "010010001".to_string(),
            attributes: BTreeMap::from([(TOTAL_POPULATION.to_string(), 948_990.0)]),
        };
        assert_eq!(locality.attribute(TOTAL_POPULATION), Some(948_990.0));
        assert_eq!(locality.attribute(TOTAL_HOUSING), None);
    }
}
