//! Styled GeoJSON map output.
//!
//! Two files per run: `proximity_matches.geojson` (every matched feature,
//! carrying its zone and a graduated color as properties) and
//! `proximity_zones.geojson` (the dissolved buffer outline of each zone
//! around all source features). Styling lives in feature properties so any
//! GeoJSON-aware viewer can render the result.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geojson::{Feature as GjFeature, FeatureCollection, JsonObject};
use serde_json::json;

use proxfind_core::{geometry, zone_label, Layer, MatchRecord};

/// Graduated zone color: the closest zone renders red, the farthest green,
/// with the hue interpolated in between.
pub fn zone_color(zone_index: usize, zone_count: usize) -> String {
    let t = if zone_count <= 1 {
        0.0
    } else {
        zone_index as f64 / (zone_count - 1) as f64
    };
    let hue = 120.0 * t;
    hsv_to_hex(hue, 0.85, 0.9)
}

fn hsv_to_hex(hue: f64, saturation: f64, value: f64) -> String {
    let c = value * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = value - c;
    let (r, g, b) = match hue as u32 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    format!(
        "#{:02x}{:02x}{:02x}",
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8
    )
}

/// Write both map files into `dir`, returning the paths written.
pub fn write_map(
    dir: &Path,
    source: &Layer,
    records: &[MatchRecord],
    bands: &[f64],
    quadrant_segments: u32,
) -> Result<Vec<PathBuf>> {
    // The matcher sorts and deduplicates bands the same way; the zone color
    // index must follow the sorted order, not the order given on the
    // command line.
    let mut bands: Vec<f64> = bands
        .iter()
        .copied()
        .filter(|d| d.is_finite() && *d > 0.0)
        .collect();
    bands.sort_by(|a, b| a.total_cmp(b));
    bands.dedup();

    let matches_path = dir.join("proximity_matches.geojson");
    write_collection(&matches_path, match_features(records, &bands))?;

    let zones_path = dir.join("proximity_zones.geojson");
    write_collection(
        &zones_path,
        zone_features(source, &bands, quadrant_segments)?,
    )?;

    Ok(vec![matches_path, zones_path])
}

fn match_features(records: &[MatchRecord], bands: &[f64]) -> Vec<GjFeature> {
    records
        .iter()
        .map(|record| {
            let zone_index = bands
                .iter()
                .position(|b| *b == record.band)
                .unwrap_or_default();

            let mut properties = JsonObject::new();
            properties.insert("sourceId".to_string(), json!(record.source_id));
            properties.insert("targetLayer".to_string(), json!(record.target_layer));
            properties.insert("targetId".to_string(), json!(record.target_id));
            if let Some(name) = &record.feature_name {
                properties.insert("featureName".to_string(), json!(name));
            }
            properties.insert("distance".to_string(), json!(record.distance));
            properties.insert("bufferDistance".to_string(), json!(record.band));
            properties.insert("zone".to_string(), json!(record.zone));
            properties.insert(
                "zoneColor".to_string(),
                json!(zone_color(zone_index, bands.len())),
            );

            GjFeature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(
                    &record.geometry,
                ))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect()
}

/// One dissolved buffer polygon per zone, drawn around every source feature.
fn zone_features(
    source: &Layer,
    bands: &[f64],
    quadrant_segments: u32,
) -> Result<Vec<GjFeature>> {
    let mut features = Vec::with_capacity(bands.len());
    for (zone_index, &band) in bands.iter().enumerate() {
        let region = geometry::dissolved_buffer(
            source.features.iter().map(|f| &f.geometry),
            band,
            quadrant_segments,
        )
        .with_context(|| format!("building the {} outline", zone_label(band)))?;
        if region.0.is_empty() {
            continue;
        }

        let mut properties = JsonObject::new();
        properties.insert("zone".to_string(), json!(zone_label(band)));
        properties.insert("bufferDistance".to_string(), json!(band));
        properties.insert(
            "zoneColor".to_string(),
            json!(zone_color(zone_index, bands.len())),
        );

        features.push(GjFeature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&region))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }
    Ok(features)
}

fn write_collection(path: &Path, features: Vec<GjFeature>) -> Result<()> {
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    let text = serde_json::to_string_pretty(&collection)?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, Point};
    use proxfind_core::{Attributes, Feature};

    fn record(target_id: u64, band: f64) -> MatchRecord {
        MatchRecord {
            source_id: 1,
            source_layer: "sites".to_string(),
            target_layer: "roads".to_string(),
            target_id,
            feature_name: None,
            distance: band / 2.0,
            band,
            zone: zone_label(band),
            attributes: Attributes::new(),
            geometry: Geometry::Point(Point::new(1.0, 2.0)),
        }
    }

    #[test]
    fn test_zone_color_endpoints() {
        // Closest zone is red, farthest is green.
        assert_eq!(zone_color(0, 3), "#e62222");
        assert_eq!(zone_color(2, 3), "#22e622");
        // A single zone is always red.
        assert_eq!(zone_color(0, 1), "#e62222");
    }

    #[test]
    fn test_zone_color_midpoint_is_yellow() {
        assert_eq!(zone_color(1, 3), "#e6e622");
    }

    #[test]
    fn test_write_map_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let source = Layer::with_features(
            "sites",
            vec![Feature::new(1, Geometry::Point(Point::new(0.0, 0.0)))],
        );
        let records = vec![record(10, 100.0), record(11, 500.0)];

        // Bands deliberately unsorted; the color index follows sorted order.
        let written =
            write_map(dir.path(), &source, &records, &[500.0, 100.0], 16).unwrap();
        assert_eq!(written.len(), 2);

        let matches: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[0]).unwrap()).unwrap();
        let features = matches["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["properties"]["zone"], "100m zone");
        assert_eq!(features[0]["properties"]["zoneColor"], "#e62222");
        assert_eq!(features[1]["properties"]["zoneColor"], "#22e622");

        let zones: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[1]).unwrap()).unwrap();
        let zone_features = zones["features"].as_array().unwrap();
        assert_eq!(zone_features.len(), 2);
        assert_eq!(zone_features[0]["properties"]["bufferDistance"], 100.0);
        assert_eq!(zone_features[0]["geometry"]["type"], "MultiPolygon");
    }

    #[test]
    fn test_zone_features_skip_empty_source() {
        let source = Layer::new("sites");
        let features = zone_features(&source, &[100.0], 16).unwrap();
        assert!(features.is_empty());
    }
}
