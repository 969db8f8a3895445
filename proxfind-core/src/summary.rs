//! Per (target layer, band) summary statistics.
//!
//! Aggregates match records into the rows of the analysis summary: feature
//! count, distance spread, and the total area / length of the matched
//! geometries.

use geo::{Area, Distance, Euclidean};
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::matcher::MatchRecord;

/// Summary row for one (target layer, band) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSummary {
    pub target_layer: String,
    pub band: f64,
    pub total_count: u64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub avg_distance: f64,
    /// Total area of matched polygonal geometries.
    pub total_area: f64,
    /// Total length of matched linear geometries.
    pub total_length: f64,
}

#[derive(Default)]
struct Accumulator {
    count: u64,
    min: f64,
    max: f64,
    sum: f64,
    area: f64,
    length: f64,
}

/// Aggregate match records into summaries, ordered by target layer then band.
pub fn summarize(records: &[MatchRecord]) -> Vec<ZoneSummary> {
    // Bands are positive, so their bit patterns order like their values.
    let mut groups: BTreeMap<(String, u64), Accumulator> = BTreeMap::new();

    for record in records {
        let key = (record.target_layer.clone(), record.band.to_bits());
        let acc = groups.entry(key).or_insert_with(|| Accumulator {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            ..Accumulator::default()
        });
        acc.count += 1;
        acc.min = acc.min.min(record.distance);
        acc.max = acc.max.max(record.distance);
        acc.sum += record.distance;
        acc.area += record.geometry.unsigned_area();
        acc.length += length_of(&record.geometry);
    }

    groups
        .into_iter()
        .map(|((target_layer, band_bits), acc)| ZoneSummary {
            target_layer,
            band: f64::from_bits(band_bits),
            total_count: acc.count,
            min_distance: acc.min,
            max_distance: acc.max,
            avg_distance: acc.sum / acc.count as f64,
            total_area: acc.area,
            total_length: acc.length,
        })
        .collect()
}

fn length_of(g: &Geometry<f64>) -> f64 {
    match g {
        Geometry::Line(line) => Euclidean.distance(line.start_point(), line.end_point()),
        Geometry::LineString(ls) => ls
            .lines()
            .map(|l| Euclidean.distance(l.start_point(), l.end_point()))
            .sum(),
        Geometry::MultiLineString(mls) => mls
            .iter()
            .map(|ls| length_of(&Geometry::LineString(ls.clone())))
            .sum(),
        Geometry::GeometryCollection(gc) => gc.iter().map(length_of).sum(),
        _ => 0.0,
    }
}
