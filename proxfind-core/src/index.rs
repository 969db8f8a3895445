//! Per-layer spatial index.
//!
//! An R-tree over the bounding rectangles of a layer's features, bulk-loaded
//! once per layer and reused across all distance bands (target layers are
//! immutable during a run). Queries return candidate feature ids whose
//! envelope intersects a query rectangle; exactness is restored downstream by
//! the matcher's intersection and distance checks.

use geo_types::Rect;
use rstar::{
    primitives::{GeomWithData, Rectangle},
    RTree, AABB,
};

use crate::feature::Layer;
use crate::geometry;

type IndexEntry = GeomWithData<Rectangle<[f64; 2]>, u64>;

/// R-tree over a layer's feature envelopes.
pub struct SpatialIndex {
    tree: RTree<IndexEntry>,
    skipped: Vec<u64>,
}

impl SpatialIndex {
    /// Bulk-load the index from a layer.
    ///
    /// Features without a computable envelope (empty geometries) are left out
    /// of the tree and reported via [`skipped`](Self::skipped).
    pub fn build(layer: &Layer) -> Self {
        let mut entries = Vec::with_capacity(layer.features.len());
        let mut skipped = Vec::new();
        for feature in &layer.features {
            match geometry::bounding_rect(&feature.geometry) {
                Ok(rect) => entries.push(GeomWithData::new(
                    Rectangle::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    feature.id,
                )),
                Err(_) => skipped.push(feature.id),
            }
        }
        SpatialIndex {
            tree: RTree::bulk_load(entries),
            skipped,
        }
    }

    /// Ids of features whose envelope intersects `rect`.
    pub fn query(&self, rect: &Rect<f64>) -> Vec<u64> {
        let envelope = AABB::from_corners(
            [rect.min().x, rect.min().y],
            [rect.max().x, rect.max().y],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .collect()
    }

    /// Features that could not be indexed (empty geometries).
    pub fn skipped(&self) -> &[u64] {
        &self.skipped
    }

    /// Number of indexed features.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
