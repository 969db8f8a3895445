//! GeoJSON layer loading.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use geojson::GeoJson;
use proxfind_core::{AttributeValue, Attributes, Feature, Layer};

/// Load a GeoJSON FeatureCollection as a layer named after the file stem.
///
/// Features without a geometry are dropped (they can never match). Feature
/// ids are taken from the GeoJSON `id` member when it is a non-negative
/// integer; otherwise the 1-based position in the collection is used.
pub fn load_layer(path: &Path) -> Result<Layer> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("layer")
        .to_string();

    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let geojson: GeoJson = text
        .parse()
        .with_context(|| format!("parsing {}", path.display()))?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => bail!("{} is not a GeoJSON FeatureCollection", path.display()),
    };

    let mut layer = Layer::new(name);
    for (position, gj_feature) in collection.features.into_iter().enumerate() {
        let id = match &gj_feature.id {
            Some(geojson::feature::Id::Number(n)) => n.as_u64(),
            _ => None,
        }
        .unwrap_or(position as u64 + 1);

        let Some(gj_geometry) = gj_feature.geometry else {
            continue;
        };
        let geometry = geo_types::Geometry::<f64>::try_from(gj_geometry).with_context(|| {
            format!("feature {} of {}: unsupported geometry", id, path.display())
        })?;

        let mut attributes = Attributes::new();
        if let Some(properties) = gj_feature.properties {
            for (field, value) in properties {
                attributes.insert(field, AttributeValue::from(value));
            }
        }

        layer.push(Feature::with_attributes(id, geometry, attributes));
    }
    Ok(layer)
}
