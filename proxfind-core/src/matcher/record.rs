//! Match records and run diagnostics.

use std::collections::HashMap;

use geo_types::Geometry;
use serde::{Deserialize, Serialize};

use crate::feature::Attributes;

/// Zone label for a band width, e.g. `"500m zone"`.
pub fn zone_label(band: f64) -> String {
    if band.fract() == 0.0 {
        format!("{}m zone", band as i64)
    } else {
        format!("{}m zone", band)
    }
}

/// A single accepted match.
///
/// Created at most once per (target layer, target feature) pair across an
/// entire run; never mutated after creation. Carries snapshots of the
/// target's attributes and geometry so downstream consumers (reports, map
/// export, persistence) do not reach back into the input layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub source_id: u64,
    pub source_layer: String,
    pub target_layer: String,
    pub target_id: u64,
    /// Display name extracted from the target's attributes, if available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<String>,
    /// Measured source-to-target distance.
    pub distance: f64,
    /// Width of the band that captured the feature.
    pub band: f64,
    /// Zone label, e.g. `"500m zone"`.
    pub zone: String,
    /// Snapshot of the target's attributes at match time.
    pub attributes: Attributes,
    /// Snapshot of the target's geometry at match time.
    pub geometry: Geometry<f64>,
}

/// Per-candidate and per-slice diagnostics collected during a run.
///
/// These are explicit outcome values, not exceptions: none of them abort the
/// run, and the record set alone never tells the full story of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Warning {
    /// A source feature had an empty geometry and was skipped for all bands.
    EmptySourceGeometry { source_id: u64 },
    /// A target feature could not be indexed (empty geometry); it can never
    /// match.
    UnindexedTarget { target_layer: String, target_id: u64 },
    /// Buffer construction failed for one (source, band) slice; that slice
    /// yields no results.
    BufferFailed {
        source_id: u64,
        band: f64,
        reason: String,
    },
    /// Distance measurement failed for one candidate. Depending on the
    /// configured [`ErrorPolicy`](super::ErrorPolicy) the candidate was
    /// either matched at distance 0.0 or dropped.
    MeasurementFailed {
        source_id: u64,
        target_layer: String,
        target_id: u64,
        band: f64,
        reason: String,
        matched_at_zero: bool,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::EmptySourceGeometry { source_id } => {
                write!(f, "source feature {} has an empty geometry, skipped", source_id)
            }
            Warning::UnindexedTarget {
                target_layer,
                target_id,
            } => write!(
                f,
                "target {}:{} has an empty geometry and was not indexed",
                target_layer, target_id
            ),
            Warning::BufferFailed {
                source_id,
                band,
                reason,
            } => write!(
                f,
                "buffer at {} m around source {} failed: {}",
                band, source_id, reason
            ),
            Warning::MeasurementFailed {
                source_id,
                target_layer,
                target_id,
                band,
                reason,
                matched_at_zero,
            } => write!(
                f,
                "distance from source {} to {}:{} at {} m failed ({}); {}",
                source_id,
                target_layer,
                target_id,
                band,
                reason,
                if *matched_at_zero {
                    "matched at 0.0"
                } else {
                    "candidate dropped"
                }
            ),
        }
    }
}

/// Tracks which (target layer, target feature) pairs have been captured, and
/// by which band. Owned by a single run; grows monotonically; the sole
/// mechanism enforcing zone exclusivity.
pub type ProcessedSet = HashMap<(String, u64), f64>;

/// Output of one matcher run.
#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    pub records: Vec<MatchRecord>,
    pub warnings: Vec<Warning>,
    /// The processed-set after the run, for inspection.
    pub processed: ProcessedSet,
}
