//! Pure planar geometry operations.
//!
//! Thin wrappers over the `geo` kernel that fix the conventions the
//! clustering step depends on: boundary-inclusive point-in-polygon tests
//! and a canonical order for the components of a union.

use geo::{Area, Centroid, ConvexHull, Intersects, MultiPolygon, Point, Polygon};

use crate::{Locality, SpatialError};

/// Computes the convex hull of a locality's geometry.
///
/// # Errors
///
/// Returns [`SpatialError::UndefinedGeometry`] if the hull has no area
/// (empty input, or all vertices collinear).
pub fn convex_hull(locality: &Locality) -> Result<Polygon<f64>, SpatialError> {
    let hull = locality.geometry.convex_hull();
    let hull_area = hull.unsigned_area();

    if !hull_area.is_finite() || hull_area <= 0.0 {
        return Err(SpatialError::UndefinedGeometry {
            key: locality.key.clone(),
            operation: "convex hull",
        });
    }

    Ok(hull)
}

/// Dissolves a set of polygons and returns the disjoint components of
/// the union.
///
/// Components are ordered by ascending centroid x, then ascending
/// centroid y, so that ids derived from their position are reproducible
/// across runs. Components without a centroid (empty rings produced by
/// the overlay) are dropped.
#[must_use]
pub fn union_all(polygons: &[Polygon<f64>]) -> Vec<Polygon<f64>> {
    let merged = geo::unary_union(polygons);

    let mut components: Vec<(Point<f64>, Polygon<f64>)> = merged
        .0
        .into_iter()
        .filter_map(|p| p.centroid().map(|c| (c, p)))
        .collect();

    components.sort_by(|(a, _), (b, _)| a.x().total_cmp(&b.x()).then(a.y().total_cmp(&b.y())));

    components.into_iter().map(|(_, p)| p).collect()
}

/// Unions a group of geometries into one multi-polygon.
#[must_use]
pub fn union_geometries<'a>(
    geometries: impl IntoIterator<Item = &'a MultiPolygon<f64>>,
) -> MultiPolygon<f64> {
    geo::unary_union(geometries)
}

/// Point-in-polygon test. Points on the boundary count as inside.
#[must_use]
pub fn within(point: &Point<f64>, polygon: &Polygon<f64>) -> bool {
    point.intersects(polygon)
}

/// Computes the area-weighted centroid of a locality.
///
/// # Errors
///
/// Returns [`SpatialError::UndefinedGeometry`] if the geometry is empty.
pub fn centroid(locality: &Locality) -> Result<Point<f64>, SpatialError> {
    locality
        .geometry
        .centroid()
        .filter(|c| c.x().is_finite() && c.y().is_finite())
        .ok_or_else(|| SpatialError::UndefinedGeometry {
            key: locality.key.clone(),
            operation: "centroid",
        })
}

/// Area in squared projection units.
#[must_use]
pub fn area(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.unsigned_area()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use geo::{Rect, coord, polygon};

    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        Rect::new(coord! { x: x, y: y }, coord! { x: x + size, y: y + size }).to_polygon()
    }

    fn locality(key: &str, geometry: MultiPolygon<f64>) -> Locality {
        Locality {
            key: key.to_string(),
            projection: crate::MEXICO_ITRF2008,
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn hull_fills_concavity() {
        let l_shape = polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 4.0),
            (x: 0.0, y: 4.0),
            (x: 0.0, y: 0.0),
        ];
        let hull = convex_hull(&locality("L", MultiPolygon(vec![l_shape]))).unwrap();
        // 4x4 square minus the triangle cut off by the (4,1)-(1,4) edge.
        assert!((hull.unsigned_area() - 11.5).abs() < 1e-9);
    }

    #[test]
    fn hull_spans_multipolygon_parts() {
        let parts = MultiPolygon(vec![square(0.0, 0.0, 1.0), square(9.0, 0.0, 1.0)]);
        let hull = convex_hull(&locality("two", parts)).unwrap();
        assert!((hull.unsigned_area() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn hull_of_empty_geometry_is_undefined() {
        let err = convex_hull(&locality("empty", MultiPolygon(vec![]))).unwrap_err();
        assert!(matches!(
            err,
            SpatialError::UndefinedGeometry { ref key, operation: "convex hull" } if key == "empty"
        ));
    }

    #[test]
    fn centroid_of_empty_geometry_is_undefined() {
        assert!(centroid(&locality("empty", MultiPolygon(vec![]))).is_err());
    }

    #[test]
    fn centroid_of_square() {
        let c = centroid(&locality("sq", MultiPolygon(vec![square(2.0, 4.0, 2.0)]))).unwrap();
        assert!((c.x() - 3.0).abs() < 1e-12);
        assert!((c.y() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn union_merges_overlapping_and_orders_components() {
        let polygons = vec![
            square(100.0, 0.0, 2.0),
            square(0.0, 0.0, 2.0),
            square(1.0, 1.0, 2.0),
            square(50.0, 10.0, 2.0),
        ];
        let components = union_all(&polygons);
        assert_eq!(components.len(), 3);

        let xs: Vec<f64> = components
            .iter()
            .map(|p| p.centroid().unwrap().x())
            .collect();
        assert!(xs.windows(2).all(|w| w[0] <= w[1]), "not sorted: {xs:?}");
        assert!((components[0].unsigned_area() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn union_of_nothing_is_empty() {
        assert!(union_all(&[]).is_empty());
    }

    #[test]
    fn within_is_boundary_inclusive() {
        let sq = square(0.0, 0.0, 2.0);
        assert!(within(&Point::new(1.0, 1.0), &sq));
        assert!(within(&Point::new(2.0, 1.0), &sq));
        assert!(within(&Point::new(0.0, 0.0), &sq));
        assert!(!within(&Point::new(2.5, 1.0), &sq));
    }

    #[test]
    fn area_sums_parts() {
        let mp = MultiPolygon(vec![square(0.0, 0.0, 2.0), square(5.0, 5.0, 3.0)]);
        assert!((area(&mp) - 13.0).abs() < 1e-9);
    }

    #[test]
    fn union_geometries_dissolves_overlap() {
        let a = MultiPolygon(vec![square(0.0, 0.0, 2.0)]);
        let b = MultiPolygon(vec![square(1.0, 0.0, 2.0)]);
        let merged = union_geometries([&a, &b]);
        assert_eq!(merged.0.len(), 1);
        assert!((area(&merged) - 6.0).abs() < 1e-9);
    }
}
