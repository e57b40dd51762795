#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Planar geometry for locality polygons.
//!
//! Holds the [`Locality`] polygon type consumed by clustering, the pure
//! geometry operations it needs (convex hull, union, point-in-polygon,
//! centroid, area) and an R-tree backed [`ComponentIndex`] for fast
//! centroid-to-component lookups. All operations work in a single shared
//! planar projection; reprojection happens before data reaches this crate.

pub mod geometry;
pub mod index;

use std::collections::BTreeMap;

use geo::MultiPolygon;

pub use geometry::{area, centroid, convex_hull, union_all, union_geometries, within};
pub use index::ComponentIndex;

/// Mexico ITRF2008 / LCC, the projection used for the national
/// geostatistical framework.
pub const MEXICO_ITRF2008: u32 = 6372;

/// Errors raised by geometry operations.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// A degenerate or empty geometry reached an operation that cannot
    /// produce a meaningful result for it.
    #[error("Undefined geometry for '{key}' during {operation}")]
    UndefinedGeometry {
        /// External key of the offending polygon.
        key: String,
        /// Operation that failed (e.g. `"convex hull"`).
        operation: &'static str,
    },
}

/// A polygon (or multi-polygon) with an external key and numeric
/// attributes, in a known planar projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Locality {
    /// External key (e.g. the `CVEGEO` locality code).
    pub key: String,
    /// EPSG code of the coordinate reference system.
    pub projection: u32,
    /// Geometry in projected planar coordinates.
    pub geometry: MultiPolygon<f64>,
    /// Attribute name -> numeric value (e.g. `"POBTOT"`).
    pub attributes: BTreeMap<String, f64>,
}

impl Locality {
    /// Returns the value of an attribute, if present.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).copied()
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
///
/// Returns `None` for non-areal geometry types.
#[must_use]
pub fn geometry_to_multipolygon(geom: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}
