//! CSV and HTML report generation.
//!
//! Both reports share the same layout: a header block with the run metadata,
//! a summary table (one row per target layer and zone), and a detailed table
//! of every matched feature grouped by source feature.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use proxfind_core::{MatchRecord, ZoneSummary};

/// Run metadata shown in report headers and persisted with each analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub name: String,
    pub source_layer: String,
    /// Local wall-clock time of the run, `YYYY-MM-DD HH:MM:SS`.
    pub created_at: String,
    pub bands: Vec<f64>,
    pub total_source_features: usize,
}

impl AnalysisMetadata {
    pub fn new(
        name: &str,
        source_layer: &str,
        bands: Vec<f64>,
        total_source_features: usize,
    ) -> Self {
        AnalysisMetadata {
            name: name.to_string(),
            source_layer: source_layer.to_string(),
            created_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            bands,
            total_source_features,
        }
    }
}

const SUMMARY_HEADER: [&str; 8] = [
    "Target Layer",
    "Buffer Distance (m)",
    "Total Count",
    "Min Distance (m)",
    "Max Distance (m)",
    "Avg Distance (m)",
    "Total Area (m2)",
    "Total Length (m)",
];

const DETAIL_HEADER: [&str; 7] = [
    "Source Feature ID",
    "Target Layer",
    "Target Feature ID",
    "Feature Name",
    "Distance (m)",
    "Buffer Distance (m)",
    "Zone",
];

/// Write the CSV report: metadata preamble, summary table, detail table.
pub fn write_csv(
    path: &Path,
    meta: &AnalysisMetadata,
    summaries: &[ZoneSummary],
    records: &[MatchRecord],
) -> Result<()> {
    let mut text = String::new();
    text.push_str("Proximity Analysis Report\n");
    let _ = writeln!(text, "Analysis:,{}", meta.name);
    let _ = writeln!(text, "Generated:,{}", meta.created_at);
    let _ = writeln!(text, "Source Layer:,{}", meta.source_layer);
    let _ = writeln!(text, "Source Features:,{}", meta.total_source_features);
    text.push('\n');

    text.push_str("Summary Statistics\n");
    text.push_str(&summary_table(summaries)?);
    text.push('\n');

    text.push_str("Detailed Results\n");
    text.push_str(&detail_table(records)?);

    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn summary_table(summaries: &[ZoneSummary]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(SUMMARY_HEADER)?;
    for s in summaries {
        writer.write_record([
            s.target_layer.clone(),
            format!("{}", s.band),
            s.total_count.to_string(),
            format!("{:.2}", s.min_distance),
            format!("{:.2}", s.max_distance),
            format!("{:.2}", s.avg_distance),
            format!("{:.2}", s.total_area),
            format!("{:.2}", s.total_length),
        ])?;
    }
    table_string(writer)
}

fn detail_table(records: &[MatchRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(DETAIL_HEADER)?;
    for r in records {
        writer.write_record([
            r.source_id.to_string(),
            r.target_layer.clone(),
            r.target_id.to_string(),
            r.feature_name.clone().unwrap_or_default(),
            format!("{:.2}", r.distance),
            format!("{}", r.band),
            r.zone.clone(),
        ])?;
    }
    table_string(writer)
}

fn table_string(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing csv table: {}", e))?;
    String::from_utf8(bytes).context("csv table is not utf-8")
}

/// Write the HTML report.
pub fn write_html(
    path: &Path,
    meta: &AnalysisMetadata,
    summaries: &[ZoneSummary],
    records: &[MatchRecord],
) -> Result<()> {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape(&meta.name));
    html.push_str(
        "<style>\n\
         body { font-family: sans-serif; margin: 2em; color: #222; }\n\
         h1 { border-bottom: 2px solid #4a7ba6; padding-bottom: 0.3em; }\n\
         .meta { background: #f0f4f8; padding: 1em; border-radius: 4px; }\n\
         table { border-collapse: collapse; margin: 1em 0; width: 100%; }\n\
         th, td { border: 1px solid #ccc; padding: 0.4em 0.8em; text-align: left; }\n\
         th { background: #4a7ba6; color: white; }\n\
         tr:nth-child(even) { background: #f7f7f7; }\n\
         .num { text-align: right; }\n\
         </style>\n</head>\n<body>\n",
    );

    let _ = writeln!(html, "<h1>{}</h1>", escape(&meta.name));
    html.push_str("<div class=\"meta\">\n");
    let _ = writeln!(html, "<p>Generated: {}</p>", escape(&meta.created_at));
    let _ = writeln!(html, "<p>Source layer: {}</p>", escape(&meta.source_layer));
    let _ = writeln!(
        html,
        "<p>Source features: {}</p>",
        meta.total_source_features
    );
    let bands = meta
        .bands
        .iter()
        .map(|b| format!("{} m", b))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(html, "<p>Distance zones: {}</p>", escape(&bands));
    let _ = writeln!(html, "<p>Features identified: {}</p>", records.len());
    html.push_str("</div>\n");

    html.push_str("<h2>Summary Statistics</h2>\n<table>\n<tr>");
    for header in SUMMARY_HEADER {
        let _ = write!(html, "<th>{}</th>", header);
    }
    html.push_str("</tr>\n");
    for s in summaries {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td>\
             <td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td>\
             <td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td></tr>",
            escape(&s.target_layer),
            s.band,
            s.total_count,
            s.min_distance,
            s.max_distance,
            s.avg_distance,
            s.total_area,
            s.total_length,
        );
    }
    html.push_str("</table>\n");

    html.push_str("<h2>Detailed Results</h2>\n");
    let mut current_source: Option<u64> = None;
    for r in records {
        if current_source != Some(r.source_id) {
            if current_source.is_some() {
                html.push_str("</table>\n");
            }
            let _ = writeln!(html, "<h3>Source feature {}</h3>", r.source_id);
            html.push_str("<table>\n<tr>");
            // Source column is redundant inside a per-source section.
            for header in &DETAIL_HEADER[1..] {
                let _ = write!(html, "<th>{}</th>", header);
            }
            html.push_str("</tr>\n");
            current_source = Some(r.source_id);
        }
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td class=\"num\">{}</td><td>{}</td>\
             <td class=\"num\">{:.2}</td><td class=\"num\">{}</td><td>{}</td></tr>",
            escape(&r.target_layer),
            r.target_id,
            escape(r.feature_name.as_deref().unwrap_or("")),
            r.distance,
            r.band,
            escape(&r.zone),
        );
    }
    if current_source.is_some() {
        html.push_str("</table>\n");
    }
    if records.is_empty() {
        html.push_str("<p>No features matched.</p>\n");
    }

    html.push_str("</body>\n</html>\n");
    fs::write(path, html).with_context(|| format!("writing {}", path.display()))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, Point};
    use proxfind_core::{zone_label, Attributes};

    fn meta() -> AnalysisMetadata {
        AnalysisMetadata {
            name: "Schools near depots".to_string(),
            source_layer: "depots".to_string(),
            created_at: "2026-08-29 10:00:00".to_string(),
            bands: vec![100.0, 500.0],
            total_source_features: 2,
        }
    }

    fn record(source_id: u64, target_id: u64, distance: f64, band: f64) -> MatchRecord {
        MatchRecord {
            source_id,
            source_layer: "depots".to_string(),
            target_layer: "schools".to_string(),
            target_id,
            feature_name: Some("North <Primary>".to_string()),
            distance,
            band,
            zone: zone_label(band),
            attributes: Attributes::new(),
            geometry: Geometry::Point(Point::new(0.0, 0.0)),
        }
    }

    fn summary() -> ZoneSummary {
        ZoneSummary {
            target_layer: "schools".to_string(),
            band: 100.0,
            total_count: 2,
            min_distance: 40.0,
            max_distance: 80.0,
            avg_distance: 60.0,
            total_area: 0.0,
            total_length: 0.0,
        }
    }

    #[test]
    fn test_csv_report_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        write_csv(
            &path,
            &meta(),
            &[summary()],
            &[record(1, 10, 40.0, 100.0), record(1, 11, 80.0, 100.0)],
        )
        .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Proximity Analysis Report"));
        assert!(text.contains("Analysis:,Schools near depots"));
        assert!(text.contains("Target Layer,Buffer Distance (m),Total Count"));
        assert!(text.contains("schools,100,2,40.00,80.00,60.00"));
        assert!(text.contains("1,schools,10,North <Primary>,40.00,100,100m zone"));
    }

    #[test]
    fn test_html_report_groups_and_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");
        write_html(
            &path,
            &meta(),
            &[summary()],
            &[record(1, 10, 40.0, 100.0), record(2, 11, 80.0, 100.0)],
        )
        .unwrap();

        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("<h3>Source feature 1</h3>"));
        assert!(html.contains("<h3>Source feature 2</h3>"));
        assert!(html.contains("North &lt;Primary&gt;"));
        assert!(!html.contains("North <Primary>"));
    }

    #[test]
    fn test_html_report_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");
        write_html(&path, &meta(), &[], &[]).unwrap();
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("No features matched."));
    }
}
