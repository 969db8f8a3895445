//! Exclusive-zone proximity analysis.
//!
//! `proxfind-core` determines which target features fall within successive
//! exclusive distance bands (buffer zones) around a set of source features.
//! Bands are processed smallest-first, and each target feature is attributed
//! only to the closest band that captures it, so no feature ever appears in
//! more than one zone.
//!
//! The crate is platform-independent: no file or network I/O, no clocks.
//! Frontends (CLI, services) feed it [`Layer`] values and consume the
//! returned [`MatchReport`].
//!
//! # Architecture
//!
//! - **feature**: feature / layer / attribute model
//! - **geometry**: buffer construction and measurement over the `geo` stack
//! - **index**: per-layer R-tree over feature envelopes
//! - **matcher**: the exclusive-zone matching engine
//! - **summary**: per (target layer, band) statistics
//!
//! # Example
//!
//! ```rust,ignore
//! use proxfind_core::{summarize, ExclusiveZoneMatcher, Layer};
//!
//! let matcher = ExclusiveZoneMatcher::with_defaults();
//! let report = matcher.run(&sources, &[roads, schools], &[100.0, 500.0]);
//!
//! for warning in &report.warnings {
//!     eprintln!("warning: {}", warning);
//! }
//! let summaries = summarize(&report.records);
//! ```

pub mod error;
pub mod feature;
pub mod geometry;
pub mod index;
pub mod matcher;
pub mod summary;

pub use error::GeomError;
pub use feature::{AttributeValue, Attributes, Feature, Layer};
pub use index::SpatialIndex;
pub use matcher::{
    zone_label, DistanceMode, ErrorPolicy, ExclusiveZoneMatcher, MatchRecord, MatchReport,
    MatcherConfig, ProcessedSet, Warning,
};
pub use summary::{summarize, ZoneSummary};
