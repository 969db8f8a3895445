//! The exclusive-zone matching engine.

use geo_types::Geometry;
use serde::{Deserialize, Serialize};

use super::record::{zone_label, MatchRecord, MatchReport, Warning};
use crate::error::Result;
use crate::feature::{Feature, Layer};
use crate::geometry::{self, DEFAULT_QUADRANT_SEGMENTS};
use crate::index::SpatialIndex;

/// How per-candidate measurement failures are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Keep the candidate, recording a distance of 0.0. This is the
    /// historical behavior of the tool and the default.
    MatchAtZero,
    /// Drop the candidate, keeping only the warning.
    Skip,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        ErrorPolicy::MatchAtZero
    }
}

/// Distance measurement mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMode {
    /// Euclidean geometry-to-geometry distance in the layer's planar units.
    Planar,
    /// For lon/lat data: great-circle centroid-to-centroid measurement when
    /// either geometry is a point, planar geometry-to-geometry otherwise.
    Geodesic,
}

impl Default for DistanceMode {
    fn default() -> Self {
        DistanceMode::Planar
    }
}

/// Matcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatcherConfig {
    /// Segments per quarter-circle for buffer approximation.
    pub quadrant_segments: u32,
    pub distance_mode: DistanceMode,
    pub error_policy: ErrorPolicy,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig {
            quadrant_segments: DEFAULT_QUADRANT_SEGMENTS,
            distance_mode: DistanceMode::default(),
            error_policy: ErrorPolicy::default(),
        }
    }
}

/// The exclusive-zone proximity matcher.
///
/// One instance can run any number of analyses; all per-run state (the
/// processed-set, records, warnings) lives in the [`MatchReport`] returned by
/// [`run`](Self::run).
pub struct ExclusiveZoneMatcher {
    config: MatcherConfig,
}

impl ExclusiveZoneMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        ExclusiveZoneMatcher { config }
    }

    pub fn with_defaults() -> Self {
        ExclusiveZoneMatcher::new(MatcherConfig::default())
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Run one full analysis: every band x every source feature over all
    /// target layers.
    ///
    /// Bands are sorted ascending and deduplicated before processing; the
    /// ascending order is what makes exclusivity a single pass, since a
    /// feature captured at a smaller band is never revisited. Non-positive
    /// and non-finite band values are ignored.
    ///
    /// Tie-break: a target equidistant from several source features within
    /// the same band is attributed to the first source in iteration order.
    /// The processed-set key has no source component, so the record count is
    /// unaffected either way.
    pub fn run(&self, source: &Layer, targets: &[Layer], bands: &[f64]) -> MatchReport {
        let mut bands: Vec<f64> = bands
            .iter()
            .copied()
            .filter(|d| d.is_finite() && *d > 0.0)
            .collect();
        bands.sort_by(|a, b| a.total_cmp(b));
        bands.dedup();

        let mut report = MatchReport::default();

        // One index per target layer, reused across all bands; target layers
        // are immutable for the duration of the run.
        let indexes: Vec<SpatialIndex> = targets.iter().map(SpatialIndex::build).collect();
        for (layer, index) in targets.iter().zip(&indexes) {
            for &id in index.skipped() {
                report.warnings.push(Warning::UnindexedTarget {
                    target_layer: layer.name.clone(),
                    target_id: id,
                });
            }
        }

        for (band_pos, &band) in bands.iter().enumerate() {
            for src in &source.features {
                if geometry::is_empty(&src.geometry) {
                    if band_pos == 0 {
                        report
                            .warnings
                            .push(Warning::EmptySourceGeometry { source_id: src.id });
                    }
                    continue;
                }

                let buffer = match geometry::buffer(&src.geometry, band, self.config.quadrant_segments)
                {
                    Ok(b) => Geometry::MultiPolygon(b),
                    Err(e) => {
                        report.warnings.push(Warning::BufferFailed {
                            source_id: src.id,
                            band,
                            reason: e.to_string(),
                        });
                        continue;
                    }
                };
                let bbox = match geometry::bounding_rect(&buffer) {
                    Ok(rect) => rect,
                    Err(e) => {
                        report.warnings.push(Warning::BufferFailed {
                            source_id: src.id,
                            band,
                            reason: e.to_string(),
                        });
                        continue;
                    }
                };

                for (layer, index) in targets.iter().zip(&indexes) {
                    for target_id in index.query(&bbox) {
                        let key = (layer.name.clone(), target_id);
                        if report.processed.contains_key(&key) {
                            continue;
                        }
                        let Some(target) = layer.get(target_id) else {
                            continue;
                        };
                        // The bbox query over-approximates; require true
                        // intersection with the buffer region.
                        if !geometry::intersects(&buffer, &target.geometry) {
                            continue;
                        }
                        match self.measure(&src.geometry, &target.geometry) {
                            Ok(distance) if distance <= band => {
                                report.processed.insert(key, band);
                                report
                                    .records
                                    .push(make_record(src, &source.name, layer, target, distance, band));
                            }
                            // Inside the (over-approximated) buffer but past
                            // the true threshold.
                            Ok(_) => {}
                            Err(e) => {
                                let matched_at_zero =
                                    self.config.error_policy == ErrorPolicy::MatchAtZero;
                                report.warnings.push(Warning::MeasurementFailed {
                                    source_id: src.id,
                                    target_layer: layer.name.clone(),
                                    target_id,
                                    band,
                                    reason: e.to_string(),
                                    matched_at_zero,
                                });
                                if matched_at_zero {
                                    report.processed.insert(key, band);
                                    report
                                        .records
                                        .push(make_record(src, &source.name, layer, target, 0.0, band));
                                }
                            }
                        }
                    }
                }
            }
        }

        report
    }

    fn measure(&self, a: &Geometry<f64>, b: &Geometry<f64>) -> Result<f64> {
        match self.config.distance_mode {
            DistanceMode::Planar => geometry::distance(a, b),
            DistanceMode::Geodesic => {
                let point_involved =
                    matches!(a, Geometry::Point(_)) || matches!(b, Geometry::Point(_));
                if point_involved {
                    let ca = geometry::centroid(a)?;
                    let cb = geometry::centroid(b)?;
                    geometry::haversine_distance(ca, cb)
                } else {
                    geometry::distance(a, b)
                }
            }
        }
    }
}

fn make_record(
    src: &Feature,
    source_layer: &str,
    layer: &Layer,
    target: &Feature,
    distance: f64,
    band: f64,
) -> MatchRecord {
    MatchRecord {
        source_id: src.id,
        source_layer: source_layer.to_string(),
        target_layer: layer.name.clone(),
        target_id: target.id,
        feature_name: target.display_name().map(str::to_string),
        distance,
        band,
        zone: zone_label(band),
        attributes: target.attributes.clone(),
        geometry: target.geometry.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeomError;
    use approx::assert_relative_eq;
    use geo_types::{LineString, Point};

    fn point_layer(name: &str, coords: &[(f64, f64)]) -> Layer {
        let features = coords
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Feature::new(i as u64 + 1, Geometry::Point(Point::new(x, y))))
            .collect();
        Layer::with_features(name, features)
    }

    fn run_default(source: &Layer, targets: &[Layer], bands: &[f64]) -> MatchReport {
        ExclusiveZoneMatcher::with_defaults().run(source, targets, bands)
    }

    #[test]
    fn test_scenario_a_matches_larger_band() {
        let source = point_layer("sources", &[(0.0, 0.0)]);
        let targets = [point_layer("targets", &[(300.0, 0.0)])];

        let report = run_default(&source, &targets, &[100.0, 500.0]);
        assert_eq!(report.records.len(), 1);
        let rec = &report.records[0];
        assert_relative_eq!(rec.band, 500.0);
        assert_relative_eq!(rec.distance, 300.0, epsilon = 1e-9);
        assert_eq!(rec.zone, "500m zone");
    }

    #[test]
    fn test_scenario_b_smallest_band_wins() {
        let source = point_layer("sources", &[(0.0, 0.0)]);
        let targets = [point_layer("targets", &[(50.0, 0.0)])];

        let report = run_default(&source, &targets, &[100.0, 500.0]);
        assert_eq!(report.records.len(), 1);
        let rec = &report.records[0];
        assert_relative_eq!(rec.band, 100.0);
        assert_relative_eq!(rec.distance, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_scenario_c_one_record_for_two_sources() {
        let source = point_layer("sources", &[(0.0, 0.0), (1000.0, 0.0)]);
        let targets = [point_layer("targets", &[(500.0, 0.0)])];

        let report = run_default(&source, &targets, &[600.0]);
        assert_eq!(report.records.len(), 1);
        // First source in iteration order wins the tie.
        assert_eq!(report.records[0].source_id, 1);
    }

    #[test]
    fn test_scenario_d_empty_target_geometry() {
        let source = point_layer("sources", &[(0.0, 0.0)]);
        let mut target_layer = Layer::new("targets");
        target_layer.push(Feature::new(7, Geometry::LineString(LineString::new(vec![]))));

        let report = run_default(&source, &[target_layer], &[100.0]);
        assert!(report.records.is_empty());
        assert_eq!(
            report.warnings,
            vec![Warning::UnindexedTarget {
                target_layer: "targets".to_string(),
                target_id: 7,
            }]
        );
    }

    #[test]
    fn test_bands_sorted_and_deduplicated() {
        let source = point_layer("sources", &[(0.0, 0.0)]);
        let targets = [point_layer("targets", &[(50.0, 0.0)])];

        // Unsorted input with duplicates and junk values.
        let report = run_default(&source, &targets, &[500.0, 100.0, 100.0, -3.0, f64::NAN]);
        assert_eq!(report.records.len(), 1);
        assert_relative_eq!(report.records[0].band, 100.0);
    }

    #[test]
    fn test_boundary_distance_is_inclusive() {
        let source = point_layer("sources", &[(0.0, 0.0)]);
        let targets = [point_layer("targets", &[(100.0, 0.0)])];

        let report = run_default(&source, &targets, &[100.0]);
        assert_eq!(report.records.len(), 1);
        assert_relative_eq!(report.records[0].distance, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_exclusivity_across_bands() {
        let source = point_layer("sources", &[(0.0, 0.0)]);
        let coords: Vec<(f64, f64)> = (1..=10).map(|i| (i as f64 * 90.0, 0.0)).collect();
        let targets = [point_layer("targets", &coords)];
        let bands = [100.0, 300.0, 600.0];

        let report = run_default(&source, &targets, &bands);
        let mut seen = std::collections::HashSet::new();
        for rec in &report.records {
            assert!(
                seen.insert((rec.target_layer.clone(), rec.target_id)),
                "target {} matched twice",
                rec.target_id
            );
            assert!(rec.distance <= rec.band);
            // The recorded band is the smallest band covering the distance.
            let smallest = bands.iter().copied().find(|b| rec.distance <= *b).unwrap();
            assert_relative_eq!(rec.band, smallest);
        }
        // Targets at 90..=540 m are within the largest band; 630+ are not.
        assert_eq!(report.records.len(), 6);
    }

    #[test]
    fn test_same_id_in_different_layers_matches_per_layer() {
        let source = point_layer("sources", &[(0.0, 0.0)]);
        let targets = [
            point_layer("roads", &[(50.0, 0.0)]),
            point_layer("schools", &[(60.0, 0.0)]),
        ];

        let report = run_default(&source, &targets, &[100.0]);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.processed.len(), 2);
        assert_eq!(report.processed.get(&("roads".to_string(), 1)), Some(&100.0));
    }

    #[test]
    fn test_empty_source_geometry_warns_once() {
        let mut source = Layer::new("sources");
        source.push(Feature::new(1, Geometry::LineString(LineString::new(vec![]))));
        let targets = [point_layer("targets", &[(50.0, 0.0)])];

        let report = run_default(&source, &targets, &[100.0, 500.0]);
        assert!(report.records.is_empty());
        assert_eq!(
            report.warnings,
            vec![Warning::EmptySourceGeometry { source_id: 1 }]
        );
    }

    #[test]
    fn test_idempotence() {
        let source = point_layer("sources", &[(0.0, 0.0), (400.0, 0.0)]);
        let targets = [
            point_layer("roads", &[(50.0, 0.0), (350.0, 0.0), (900.0, 0.0)]),
            point_layer("schools", &[(120.0, 40.0)]),
        ];
        let bands = [100.0, 250.0, 500.0];

        let sort_key = |r: &MatchRecord| (r.target_layer.clone(), r.target_id);
        let mut first = run_default(&source, &targets, &bands).records;
        let mut second = run_default(&source, &targets, &bands).records;
        first.sort_by_key(sort_key);
        second.sort_by_key(sort_key);
        assert_eq!(first, second);
    }

    #[test]
    fn test_attributes_and_name_snapshot() {
        use crate::feature::AttributeValue;

        let source = point_layer("sources", &[(0.0, 0.0)]);
        let mut target = Feature::new(1, Geometry::Point(Point::new(50.0, 0.0)));
        target
            .attributes
            .insert("name".to_string(), AttributeValue::Text("Clinic".to_string()));
        target
            .attributes
            .insert("beds".to_string(), AttributeValue::Integer(12));
        let targets = [Layer::with_features("clinics", vec![target])];

        let report = run_default(&source, &targets, &[100.0]);
        let rec = &report.records[0];
        assert_eq!(rec.feature_name.as_deref(), Some("Clinic"));
        assert_eq!(
            rec.attributes.get("beds"),
            Some(&AttributeValue::Integer(12))
        );
        assert_eq!(rec.source_layer, "sources");
    }

    #[test]
    fn test_polygon_source_buffer_matching() {
        let mut source = Layer::new("parcels");
        source.push(Feature::new(
            1,
            Geometry::Polygon(geo_types::Polygon::new(
                LineString::from(vec![
                    (0.0, 0.0),
                    (100.0, 0.0),
                    (100.0, 100.0),
                    (0.0, 100.0),
                    (0.0, 0.0),
                ]),
                vec![],
            )),
        ));
        // 40 m from the parcel edge, 140 m from its centroid.
        let targets = [point_layer("targets", &[(140.0, 50.0)])];

        let report = run_default(&source, &targets, &[50.0]);
        assert_eq!(report.records.len(), 1);
        assert_relative_eq!(report.records[0].distance, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_measure_geodesic_points() {
        let matcher = ExclusiveZoneMatcher::new(MatcherConfig {
            distance_mode: DistanceMode::Geodesic,
            ..MatcherConfig::default()
        });
        let a = Geometry::Point(Point::new(0.0, 0.0));
        let b = Geometry::Point(Point::new(1.0, 0.0));
        let dist = matcher.measure(&a, &b).unwrap();
        assert!((dist - 111_195.0).abs() < 500.0, "got {}", dist);
    }

    #[test]
    fn test_measure_non_finite_is_error() {
        let matcher = ExclusiveZoneMatcher::with_defaults();
        let a = Geometry::Point(Point::new(f64::NAN, 0.0));
        let b = Geometry::Point(Point::new(1.0, 0.0));
        assert_eq!(matcher.measure(&a, &b), Err(GeomError::NonFiniteDistance));
    }

    #[test]
    fn test_error_policy_default_is_match_at_zero() {
        assert_eq!(ErrorPolicy::default(), ErrorPolicy::MatchAtZero);
        assert_eq!(
            MatcherConfig::default().quadrant_segments,
            DEFAULT_QUADRANT_SEGMENTS
        );
    }
}
