//! SQLite persistence for analysis runs.
//!
//! Three tables: `analyses` (one row per run), `results` (match records with
//! attribute and geometry snapshots), `summaries` (per zone statistics).
//! Geometry snapshots are stored as GeoJSON text so other tools can read the
//! database directly.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use proxfind_core::{zone_label, Attributes, MatchRecord, ZoneSummary};

use crate::report::AnalysisMetadata;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS analyses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    source_layer TEXT NOT NULL,
    created_at TEXT NOT NULL,
    distance_bands TEXT NOT NULL,
    total_source_features INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    analysis_id INTEGER NOT NULL REFERENCES analyses(id),
    source_id INTEGER NOT NULL,
    source_layer TEXT NOT NULL,
    target_layer TEXT NOT NULL,
    target_id INTEGER NOT NULL,
    feature_name TEXT,
    distance REAL NOT NULL,
    band REAL NOT NULL,
    attributes TEXT NOT NULL,
    geometry TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    analysis_id INTEGER NOT NULL REFERENCES analyses(id),
    target_layer TEXT NOT NULL,
    band REAL NOT NULL,
    total_count INTEGER NOT NULL,
    min_distance REAL NOT NULL,
    max_distance REAL NOT NULL,
    avg_distance REAL NOT NULL,
    total_area REAL NOT NULL,
    total_length REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_results_analysis ON results (analysis_id, source_id);
CREATE INDEX IF NOT EXISTS idx_summaries_analysis ON summaries (analysis_id);
"#;

pub struct AnalysisStore {
    conn: Connection,
}

impl AnalysisStore {
    /// Open (and if needed create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn =
            Connection::open(path).with_context(|| format!("opening {}", path.display()))?;
        conn.execute_batch(SCHEMA).context("initializing schema")?;
        Ok(AnalysisStore { conn })
    }

    /// Open an existing database without creating one.
    ///
    /// Reading paths (`proxfind report`) must not leave an empty database
    /// behind when given a wrong path.
    pub fn open_existing(path: &Path) -> Result<Self> {
        anyhow::ensure!(path.exists(), "database {} does not exist", path.display());
        Self::open(path)
    }

    pub fn create_analysis(&mut self, meta: &AnalysisMetadata) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO analyses (name, source_layer, created_at, distance_bands, total_source_features)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                meta.name,
                meta.source_layer,
                meta.created_at,
                serde_json::to_string(&meta.bands)?,
                meta.total_source_features as i64,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_records(&mut self, analysis_id: i64, records: &[MatchRecord]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO results (analysis_id, source_id, source_layer, target_layer,
                                      target_id, feature_name, distance, band, attributes, geometry)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for record in records {
                let geometry =
                    geojson::Geometry::new(geojson::Value::from(&record.geometry));
                stmt.execute(params![
                    analysis_id,
                    record.source_id as i64,
                    record.source_layer,
                    record.target_layer,
                    record.target_id as i64,
                    record.feature_name,
                    record.distance,
                    record.band,
                    serde_json::to_string(&record.attributes)?,
                    serde_json::to_string(&geometry)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_summaries(&mut self, analysis_id: i64, summaries: &[ZoneSummary]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO summaries (analysis_id, target_layer, band, total_count,
                                        min_distance, max_distance, avg_distance,
                                        total_area, total_length)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for summary in summaries {
                stmt.execute(params![
                    analysis_id,
                    summary.target_layer,
                    summary.band,
                    summary.total_count as i64,
                    summary.min_distance,
                    summary.max_distance,
                    summary.avg_distance,
                    summary.total_area,
                    summary.total_length,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Id of the most recently created analysis, if any.
    pub fn latest_analysis_id(&self) -> Result<Option<i64>> {
        let id = self
            .conn
            .query_row("SELECT MAX(id) FROM analyses", [], |row| row.get(0))
            .optional()?
            .flatten();
        Ok(id)
    }

    pub fn metadata(&self, analysis_id: i64) -> Result<AnalysisMetadata> {
        let (name, source_layer, created_at, bands_json, total): (String, String, String, String, i64) =
            self.conn
                .query_row(
                    "SELECT name, source_layer, created_at, distance_bands, total_source_features
                     FROM analyses WHERE id = ?1",
                    [analysis_id],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                        ))
                    },
                )
                .with_context(|| format!("analysis {} not found", analysis_id))?;
        Ok(AnalysisMetadata {
            name,
            source_layer,
            created_at,
            bands: serde_json::from_str(&bands_json).context("decoding distance bands")?,
            total_source_features: total as usize,
        })
    }

    pub fn summaries(&self, analysis_id: i64) -> Result<Vec<ZoneSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT target_layer, band, total_count, min_distance, max_distance,
                    avg_distance, total_area, total_length
             FROM summaries WHERE analysis_id = ?1
             ORDER BY target_layer, band",
        )?;
        let rows = stmt.query_map([analysis_id], |row| {
            Ok(ZoneSummary {
                target_layer: row.get(0)?,
                band: row.get(1)?,
                total_count: row.get::<_, i64>(2)? as u64,
                min_distance: row.get(3)?,
                max_distance: row.get(4)?,
                avg_distance: row.get(5)?,
                total_area: row.get(6)?,
                total_length: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Match records of an analysis, rebuilt from their stored snapshots.
    pub fn records(&self, analysis_id: i64) -> Result<Vec<MatchRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_id, source_layer, target_layer, target_id, feature_name,
                    distance, band, attributes, geometry
             FROM results WHERE analysis_id = ?1
             ORDER BY source_id, target_layer, distance",
        )?;
        let rows = stmt.query_map([analysis_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (source_id, source_layer, target_layer, target_id, feature_name, distance, band, attributes, geometry) =
                row?;
            let attributes: Attributes =
                serde_json::from_str(&attributes).context("decoding attribute snapshot")?;
            let gj: geojson::Geometry =
                serde_json::from_str(&geometry).context("decoding geometry snapshot")?;
            let geometry = geo_types::Geometry::<f64>::try_from(gj)
                .context("rebuilding geometry snapshot")?;
            records.push(MatchRecord {
                source_id: source_id as u64,
                source_layer,
                target_layer,
                target_id: target_id as u64,
                feature_name,
                distance,
                band,
                zone: zone_label(band),
                attributes,
                geometry,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, Point};
    use proxfind_core::AttributeValue;

    fn sample_record() -> MatchRecord {
        let mut attributes = Attributes::new();
        attributes.insert("name".to_string(), AttributeValue::Text("Depot".to_string()));
        attributes.insert("lanes".to_string(), AttributeValue::Integer(2));
        MatchRecord {
            source_id: 1,
            source_layer: "sites".to_string(),
            target_layer: "roads".to_string(),
            target_id: 42,
            feature_name: Some("Depot".to_string()),
            distance: 73.5,
            band: 100.0,
            zone: zone_label(100.0),
            attributes,
            geometry: Geometry::Point(Point::new(3.0, 4.0)),
        }
    }

    fn sample_summary() -> ZoneSummary {
        ZoneSummary {
            target_layer: "roads".to_string(),
            band: 100.0,
            total_count: 1,
            min_distance: 73.5,
            max_distance: 73.5,
            avg_distance: 73.5,
            total_area: 0.0,
            total_length: 0.0,
        }
    }

    fn open_temp() -> (tempfile::TempDir, AnalysisStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = AnalysisStore::open(&dir.path().join("analyses.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_round_trip() {
        let (_dir, mut store) = open_temp();
        let meta = AnalysisMetadata::new("test run", "sites", vec![100.0, 500.0], 3);
        let id = store.create_analysis(&meta).unwrap();
        store.insert_records(id, &[sample_record()]).unwrap();
        store.insert_summaries(id, &[sample_summary()]).unwrap();

        let back = store.metadata(id).unwrap();
        assert_eq!(back.name, "test run");
        assert_eq!(back.bands, vec![100.0, 500.0]);
        assert_eq!(back.total_source_features, 3);

        let summaries = store.summaries(id).unwrap();
        assert_eq!(summaries, vec![sample_summary()]);

        let records = store.records(id).unwrap();
        assert_eq!(records, vec![sample_record()]);
    }

    #[test]
    fn test_latest_analysis_id() {
        let (_dir, mut store) = open_temp();
        assert_eq!(store.latest_analysis_id().unwrap(), None);

        let meta = AnalysisMetadata::new("a", "sites", vec![100.0], 1);
        let first = store.create_analysis(&meta).unwrap();
        let second = store.create_analysis(&meta).unwrap();
        assert!(second > first);
        assert_eq!(store.latest_analysis_id().unwrap(), Some(second));
    }

    #[test]
    fn test_open_existing_does_not_create_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        assert!(AnalysisStore::open_existing(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_open_existing_opens_created_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyses.db");
        drop(AnalysisStore::open(&path).unwrap());

        let store = AnalysisStore::open_existing(&path).unwrap();
        assert_eq!(store.latest_analysis_id().unwrap(), None);
    }

    #[test]
    fn test_missing_analysis() {
        let (_dir, store) = open_temp();
        assert!(store.metadata(99).is_err());
        assert!(store.records(99).unwrap().is_empty());
    }
}
