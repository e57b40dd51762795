//! R-tree index over hull-union components.
//!
//! Components of a dissolved union are disjoint, so a centroid normally
//! matches at most one entry. A centroid lying exactly on a point shared
//! by two touching components matches both; the lowest id wins.

use geo::{BoundingRect, Point, Polygon};
use rstar::{AABB, RTree, RTreeObject};

use crate::geometry::within;

/// A component polygon stored in the R-tree with its id.
struct ComponentEntry {
    id: u32,
    envelope: AABB<[f64; 2]>,
    polygon: Polygon<f64>,
}

impl RTreeObject for ComponentEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index of numbered component polygons.
pub struct ComponentIndex {
    components: RTree<ComponentEntry>,
}

impl ComponentIndex {
    /// Bulk-loads `(id, polygon)` pairs into an R-tree.
    #[must_use]
    pub fn new(components: impl IntoIterator<Item = (u32, Polygon<f64>)>) -> Self {
        let entries: Vec<ComponentEntry> = components
            .into_iter()
            .map(|(id, polygon)| ComponentEntry {
                id,
                envelope: compute_envelope(&polygon),
                polygon,
            })
            .collect();

        log::debug!("Indexed {} components", entries.len());

        Self {
            components: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.size()
    }

    /// Whether the index holds no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.size() == 0
    }

    /// Look up the id of the component containing a point (boundary
    /// inclusive).
    #[must_use]
    pub fn lookup(&self, point: &Point<f64>) -> Option<u32> {
        let query_env = AABB::from_point([point.x(), point.y()]);

        self.components
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| within(point, &entry.polygon))
            .map(|entry| entry.id)
            .min()
    }
}

/// Compute the bounding box envelope for a [`Polygon`].
fn compute_envelope(polygon: &Polygon<f64>) -> AABB<[f64; 2]> {
    polygon.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
