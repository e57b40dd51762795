#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! City Clustering Algorithm by Convex Envelope Intersections (CCA-CEI).
//!
//! Groups locality polygons into "natural cities":
//!
//! 1. Build the convex hull of every locality.
//! 2. Dissolve all hulls; each connected component of the union becomes a
//!    candidate city, numbered from 1 in ascending centroid (x, y) order.
//! 3. Assign every locality to the component containing its centroid
//!    (boundary inclusive, lowest id on ties).
//! 4. For each component with at least one member, union the member
//!    geometries and sum the requested attributes.
//!
//! A locality whose centroid falls outside every component is left
//! unassigned, excluded from the sums, and reported in
//! [`ClusteringOutcome::unmatched`]. A centroid always lies inside its own
//! hull, so this only happens when the hull union loses precision at the
//! boundary; no well-formed input in the tests below reaches it.

use std::collections::{BTreeMap, BTreeSet};

use geo::{MultiPolygon, Polygon};
use natural_cities_spatial::{
    ComponentIndex, Locality, SpatialError, centroid, convex_hull, union_all, union_geometries,
};

/// Identifier of a natural city (1-based, stable within one run).
pub type ClusterId = u32;

/// Errors that can occur while clustering.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// A geometry operation failed on an input polygon.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// Input polygons are not all in the same projection.
    #[error("Locality '{key}' is in EPSG:{found}, expected EPSG:{expected}")]
    MixedProjection {
        /// External key of the offending polygon.
        key: String,
        /// Projection of the first polygon.
        expected: u32,
        /// Projection of the offending polygon.
        found: u32,
    },
}

/// One natural city: a hull-union component and the localities inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct NaturalCity {
    /// Component id (`id_convex`).
    pub id: ClusterId,
    /// EPSG code shared by all members.
    pub projection: u32,
    /// Boundary of the hull-union component.
    pub boundary: Polygon<f64>,
    /// Union of the member locality geometries.
    pub footprint: MultiPolygon<f64>,
    /// Requested attributes summed over members.
    pub attributes: BTreeMap<String, f64>,
    /// Keys of the member localities, in input order.
    pub members: Vec<String>,
}

impl NaturalCity {
    /// Returns the value of a summed attribute, if it was requested.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).copied()
    }

    /// Converts the city into a single clustering input keyed by its id,
    /// with the component boundary as geometry.
    #[must_use]
    pub fn to_locality(&self) -> Locality {
        Locality {
            key: self.id.to_string(),
            projection: self.projection,
            geometry: MultiPolygon(vec![self.boundary.clone()]),
            attributes: self.attributes.clone(),
        }
    }
}

/// An input locality tagged with the city it was assigned to.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedLocality {
    /// The original locality.
    pub locality: Locality,
    /// Assigned city, or `None` if its centroid matched no component.
    pub cluster_id: Option<ClusterId>,
}

/// Result of a clustering run.
#[derive(Debug, Clone, Default)]
pub struct ClusteringOutcome {
    /// Natural cities in ascending id order.
    pub cities: Vec<NaturalCity>,
    /// Every input locality, in input order, tagged with its city.
    pub grouped: Vec<GroupedLocality>,
    /// Keys of localities whose centroid matched no component.
    pub unmatched: Vec<String>,
}

impl ClusteringOutcome {
    /// Looks up a city by id.
    #[must_use]
    pub fn city(&self, id: ClusterId) -> Option<&NaturalCity> {
        self.cities
            .binary_search_by_key(&id, |c| c.id)
            .ok()
            .map(|i| &self.cities[i])
    }
}

/// Groups localities into natural cities with CCA-CEI.
///
/// `attributes` names the attributes to sum per city. A locality that
/// lacks one (INEGI withholds confidential census cells) adds nothing to
/// that sum; the number of such localities is logged per attribute.
///
/// # Errors
///
/// * [`ClusterError::MixedProjection`] if the inputs disagree on projection.
/// * [`ClusterError::Spatial`] if a polygon is empty or degenerate.
pub fn cluster(
    localities: Vec<Locality>,
    attributes: &BTreeSet<String>,
) -> Result<ClusteringOutcome, ClusterError> {
    let Some(first) = localities.first() else {
        return Ok(ClusteringOutcome::default());
    };
    let projection = first.projection;

    for locality in &localities {
        if locality.projection != projection {
            return Err(ClusterError::MixedProjection {
                key: locality.key.clone(),
                expected: projection,
                found: locality.projection,
            });
        }
    }

    for attribute in attributes {
        let absent = localities
            .iter()
            .filter(|l| !l.attributes.contains_key(attribute))
            .count();
        if absent > 0 {
            log::warn!(
                "{absent} of {} localities have no '{attribute}'; summed as 0",
                localities.len()
            );
        }
    }

    log::info!("Building convex hulls for {} localities", localities.len());
    let hulls = localities
        .iter()
        .map(convex_hull)
        .collect::<Result<Vec<_>, _>>()?;

    let components = union_all(&hulls);
    drop(hulls);
    log::info!("Hull union has {} components", components.len());

    let index = ComponentIndex::new(
        components
            .iter()
            .cloned()
            .zip(1..)
            .map(|(polygon, id)| (id, polygon)),
    );

    let mut assignments: Vec<Option<ClusterId>> = Vec::with_capacity(localities.len());
    let mut unmatched = Vec::new();
    let mut groups: BTreeMap<ClusterId, Vec<usize>> = BTreeMap::new();

    for (i, locality) in localities.iter().enumerate() {
        let point = centroid(locality)?;
        let id = index.lookup(&point);
        match id {
            Some(id) => groups.entry(id).or_default().push(i),
            None => unmatched.push(locality.key.clone()),
        }
        assignments.push(id);
    }

    if !unmatched.is_empty() {
        log::warn!(
            "{} localities have a centroid outside every hull component and were excluded",
            unmatched.len()
        );
    }

    let cities: Vec<NaturalCity> = groups
        .into_iter()
        .map(|(id, members)| {
            let footprint = union_geometries(members.iter().map(|&i| &localities[i].geometry));
            let sums = attributes
                .iter()
                .map(|name| {
                    let total: f64 = members
                        .iter()
                        .filter_map(|&i| localities[i].attribute(name))
                        .sum();
                    (name.clone(), total)
                })
                .collect();

            NaturalCity {
                id,
                projection,
                boundary: components[(id - 1) as usize].clone(),
                footprint,
                attributes: sums,
                members: members.iter().map(|&i| localities[i].key.clone()).collect(),
            }
        })
        .collect();

    log::info!(
        "Formed {} natural cities from {} localities",
        cities.len(),
        localities.len()
    );

    let grouped = localities
        .into_iter()
        .zip(assignments)
        .map(|(locality, cluster_id)| GroupedLocality {
            locality,
            cluster_id,
        })
        .collect();

    Ok(ClusteringOutcome {
        cities,
        grouped,
        unmatched,
    })
}

/// Keeps the cities whose attribute is strictly above `xmin` (the
/// "natural city system" cut at the fitted power-law cutoff).
#[must_use]
pub fn natural_city_system<'a>(
    cities: &'a [NaturalCity],
    attribute: &str,
    xmin: f64,
) -> Vec<&'a NaturalCity> {
    cities
        .iter()
        .filter(|c| c.attribute(attribute).is_some_and(|v| v > xmin))
        .collect()
}
