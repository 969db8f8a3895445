//! Exclusive-Zone Proximity Matching
//!
//! This module determines, for each target feature, the single closest
//! qualifying distance band around a set of source features. Bands are
//! processed smallest-first, and a (target layer, target feature) pair that
//! matched at a smaller band is never revisited at a larger one, so each
//! target appears in at most one zone.
//!
//! # Example
//!
//! ```rust,ignore
//! use proxfind_core::{ExclusiveZoneMatcher, Layer, MatcherConfig};
//!
//! let matcher = ExclusiveZoneMatcher::new(MatcherConfig::default());
//! let report = matcher.run(&sources, &[roads, schools], &[100.0, 500.0]);
//!
//! for record in &report.records {
//!     println!("{} -> {} at {:.1} m ({})",
//!         record.source_id, record.target_id, record.distance, record.zone);
//! }
//! ```

mod engine;
mod record;

pub use engine::{DistanceMode, ErrorPolicy, ExclusiveZoneMatcher, MatcherConfig};
pub use record::{zone_label, MatchRecord, MatchReport, ProcessedSet, Warning};
