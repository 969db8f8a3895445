//! `proxfind` command line frontend.
//!
//! Loads GeoJSON layers, runs the exclusive-zone matcher from
//! `proxfind-core`, and writes the outputs: CSV/HTML reports, styled GeoJSON
//! map files, and (optionally) a SQLite database from which reports can be
//! regenerated later with the `report` subcommand.

mod export;
mod layers;
mod report;
mod store;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use log::{info, warn};

use proxfind_core::{
    summarize, DistanceMode, ErrorPolicy, ExclusiveZoneMatcher, Layer, MatcherConfig,
};

use report::AnalysisMetadata;

#[derive(Parser)]
#[command(
    name = "proxfind",
    version,
    about = "Find features inside exclusive distance zones around source features"
)]
struct Cli {
    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a proximity analysis over GeoJSON layers
    Run(RunArgs),
    /// Regenerate reports from a previously stored analysis
    Report(ReportArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Source layer (GeoJSON FeatureCollection)
    #[arg(long)]
    source: PathBuf,

    /// Target layer (GeoJSON FeatureCollection); repeat for multiple layers
    #[arg(long = "target", required = true)]
    targets: Vec<PathBuf>,

    /// Distance bands in meters, comma separated (e.g. 100,200,500)
    #[arg(long)]
    distances: String,

    /// Directory for reports and map output
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// SQLite database to persist the analysis into
    #[arg(long)]
    db: Option<PathBuf>,

    /// Analysis name recorded in the database and report headers
    #[arg(long, default_value = "Proximity analysis")]
    name: String,

    /// Skip the CSV report
    #[arg(long)]
    no_csv: bool,

    /// Skip the HTML report
    #[arg(long)]
    no_html: bool,

    /// Skip the styled GeoJSON map output
    #[arg(long)]
    no_map: bool,

    /// Segments per quarter-circle for buffer approximation
    #[arg(long, default_value_t = proxfind_core::geometry::DEFAULT_QUADRANT_SEGMENTS)]
    segments: u32,

    /// Treat coordinates as lon/lat and measure point distances great-circle
    #[arg(long)]
    geodesic: bool,

    /// Drop candidates whose distance measurement fails instead of matching
    /// them at 0.0
    #[arg(long)]
    skip_measurement_errors: bool,
}

#[derive(Args)]
struct ReportArgs {
    /// SQLite database written by a previous `run --db`
    #[arg(long)]
    db: PathBuf,

    /// Analysis id to report on (defaults to the most recent)
    #[arg(long)]
    analysis_id: Option<i64>,

    /// Directory for the regenerated reports
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    #[arg(long)]
    no_csv: bool,

    #[arg(long)]
    no_html: bool,
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    let result = match cli.command {
        Command::Run(args) => run(args),
        Command::Report(args) => report(args),
    };
    if let Err(err) = result {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(args: RunArgs) -> Result<()> {
    let distances = parse_distances(&args.distances)?;

    let source = layers::load_layer(&args.source)?;
    let targets: Vec<Layer> = args
        .targets
        .iter()
        .map(|path| layers::load_layer(path))
        .collect::<Result<_>>()?;

    info!(
        "analyzing {} source feature(s) against {} target layer(s) in {} zone(s)",
        source.len(),
        targets.len(),
        distances.len()
    );

    let config = MatcherConfig {
        quadrant_segments: args.segments,
        distance_mode: if args.geodesic {
            DistanceMode::Geodesic
        } else {
            DistanceMode::Planar
        },
        error_policy: if args.skip_measurement_errors {
            ErrorPolicy::Skip
        } else {
            ErrorPolicy::MatchAtZero
        },
    };
    let matcher = ExclusiveZoneMatcher::new(config);
    let outcome = matcher.run(&source, &targets, &distances);

    for warning in &outcome.warnings {
        warn!("{}", warning);
    }

    let summaries = summarize(&outcome.records);
    let meta = AnalysisMetadata::new(&args.name, &source.name, distances.clone(), source.len());

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    if let Some(db_path) = &args.db {
        let mut db = store::AnalysisStore::open(db_path)?;
        let analysis_id = db.create_analysis(&meta)?;
        db.insert_records(analysis_id, &outcome.records)?;
        db.insert_summaries(analysis_id, &summaries)?;
        info!("stored analysis {} in {}", analysis_id, db_path.display());
    }

    if !args.no_csv {
        let path = args.output_dir.join("proximity_report.csv");
        report::write_csv(&path, &meta, &summaries, &outcome.records)?;
        info!("wrote {}", path.display());
    }
    if !args.no_html {
        let path = args.output_dir.join("proximity_report.html");
        report::write_html(&path, &meta, &summaries, &outcome.records)?;
        info!("wrote {}", path.display());
    }
    if !args.no_map {
        let written = export::write_map(
            &args.output_dir,
            &source,
            &outcome.records,
            &distances,
            args.segments,
        )?;
        for path in written {
            info!("wrote {}", path.display());
        }
    }

    info!(
        "analysis complete: {} matched feature(s), {} warning(s)",
        outcome.records.len(),
        outcome.warnings.len()
    );
    Ok(())
}

fn report(args: ReportArgs) -> Result<()> {
    let db = store::AnalysisStore::open_existing(&args.db)?;
    let analysis_id = match args.analysis_id {
        Some(id) => id,
        None => db
            .latest_analysis_id()?
            .context("database contains no analyses")?,
    };

    let meta = db.metadata(analysis_id)?;
    let summaries = db.summaries(analysis_id)?;
    let records = db.records(analysis_id)?;
    info!(
        "analysis {} (\"{}\"): {} record(s)",
        analysis_id,
        meta.name,
        records.len()
    );

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    if !args.no_csv {
        let path = args.output_dir.join("proximity_report.csv");
        report::write_csv(&path, &meta, &summaries, &records)?;
        info!("wrote {}", path.display());
    }
    if !args.no_html {
        let path = args.output_dir.join("proximity_report.html");
        report::write_html(&path, &meta, &summaries, &records)?;
        info!("wrote {}", path.display());
    }
    Ok(())
}

/// Parse a comma separated distance list. Values must be positive; order is
/// irrelevant since the matcher sorts bands itself.
fn parse_distances(text: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let value: f64 = part
            .parse()
            .with_context(|| format!("invalid distance value '{}'", part))?;
        if !value.is_finite() || value <= 0.0 {
            bail!("distances must be positive numbers (got '{}')", part);
        }
        out.push(value);
    }
    if out.is_empty() {
        bail!("no distance values given");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distances() {
        assert_eq!(
            parse_distances("100, 200,500").unwrap(),
            vec![100.0, 200.0, 500.0]
        );
        assert_eq!(parse_distances("250.5").unwrap(), vec![250.5]);
    }

    #[test]
    fn test_parse_distances_rejects_bad_input() {
        assert!(parse_distances("").is_err());
        assert!(parse_distances("abc").is_err());
        assert!(parse_distances("100,-5").is_err());
        assert!(parse_distances("0").is_err());
    }

    #[test]
    fn test_parse_distances_keeps_order() {
        // Sorting is the matcher's job, not the parser's.
        assert_eq!(
            parse_distances("500,100").unwrap(),
            vec![500.0, 100.0]
        );
    }
}
