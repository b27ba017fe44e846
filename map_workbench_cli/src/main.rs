use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use map_workbench::analysis::AnalysisRequest;
use map_workbench::dataset::AttributeValue;
use map_workbench::engine::QueryTarget;
use map_workbench::query::{Criterion, CriterionOp, QueryGroup};
use map_workbench::styles::{default_analysis_styles, HighlightStyle};
use map_workbench::units::LinearUnit;
use map_workbench::Workbench;

mod dataset_io;
mod planar;

use dataset_io::load_geojson_dataset;
use planar::{LogSurface, PlanarCapability};

/// Spatial query and analysis against GeoJSON datasets.
#[derive(Parser)]
#[command(name = "map_workbench_cli")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints the schema and feature count of a dataset.
    Info { path: String },
    /// Runs a single-criterion attribute query against a dataset.
    Query {
        path: String,
        field: String,
        /// contains, not-contains, equals, not-equals, starts-with,
        /// ends-with, greater-than, less-than, greater-or-equal,
        /// less-or-equal
        op: String,
        value: String,
    },
    /// Buffers every feature in a dataset.
    Buffer {
        path: String,
        distance: f64,
        #[arg(long, default_value = "meters")]
        unit: String,
        #[arg(long)]
        dissolve: bool,
    },
    /// Straight-line distance between two features.
    Distance { path: String, id_a: u64, id_b: u64 },
    /// Total polygon area of a dataset.
    Area { path: String },
    /// Pairwise intersections between two datasets.
    Intersect {
        path_a: String,
        path_b: String,
        #[arg(long)]
        keep_non_intersecting: bool,
    },
}

fn workbench() -> Workbench {
    Workbench::new(Arc::new(PlanarCapability::new()), Arc::new(LogSurface::new()))
}

fn parse_value(raw: &str) -> AttributeValue {
    if let Ok(b) = raw.parse::<bool>() {
        return AttributeValue::Boolean(b);
    }
    if let Ok(n) = raw.parse::<f64>() {
        return AttributeValue::Number(n);
    }
    AttributeValue::text(raw)
}

fn analysis_style(name_prefix: &str) -> HighlightStyle {
    default_analysis_styles()
        .into_iter()
        .find(|(name, _)| name.starts_with(name_prefix))
        .map(|(_, style)| style)
        .unwrap_or_default()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { path } => {
            let dataset = load_geojson_dataset(&path, "dataset")?;
            println!(
                "{}: {:?} dataset with {} features",
                dataset.id, dataset.geometry_kind, dataset.len()
            );
            for field in &dataset.fields {
                println!("  {} ({:?})", field.name, field.field_type);
            }
        }
        Commands::Query {
            path,
            field,
            op,
            value,
        } => {
            let dataset = load_geojson_dataset(&path, "dataset")?;
            let total = dataset.len();
            let mut wb = workbench();
            wb.register_dataset(dataset);
            let op: CriterionOp = op.parse().map_err(|e: String| anyhow!(e))?;
            let group = QueryGroup::with(Criterion::new(&field, op, parse_value(&value)));
            let result = wb
                .run_query(&group, &QueryTarget::Dataset("dataset".to_string()))
                .await?;
            println!("Matched {} of {} features", result.total_count(), total);
            for hit in &result.hits {
                for feature in &hit.features {
                    println!("  feature {}", feature.id);
                }
            }
        }
        Commands::Buffer {
            path,
            distance,
            unit,
            dissolve,
        } => {
            let dataset = load_geojson_dataset(&path, "dataset")?;
            let sources = dataset.features().iter().map(|f| f.geometry.clone()).collect();
            let mut wb = workbench();
            let request = AnalysisRequest::Buffer {
                sources,
                distance,
                unit: unit.parse::<LinearUnit>().map_err(|e| anyhow!(e))?,
                dissolve,
                style: analysis_style("Buffer"),
            };
            let result = wb.run_analysis(&request).await?;
            println!(
                "Buffer {}: {} geometries ({} skipped)",
                result.summary,
                result.outputs.len(),
                result.skipped
            );
        }
        Commands::Distance { path, id_a, id_b } => {
            let dataset = load_geojson_dataset(&path, "dataset")?;
            let source = |id: u64| {
                dataset
                    .feature(id)
                    .map(|f| f.geometry.clone())
                    .ok_or_else(|| anyhow!("no feature with id {id}"))
            };
            let request = AnalysisRequest::Distance {
                sources: vec![source(id_a)?, source(id_b)?],
                style: analysis_style("Measurement"),
            };
            let mut wb = workbench();
            let result = wb.run_analysis(&request).await?;
            println!("Distance: {}", result.summary);
        }
        Commands::Area { path } => {
            let dataset = load_geojson_dataset(&path, "dataset")?;
            let sources = dataset.features().iter().map(|f| f.geometry.clone()).collect();
            let request = AnalysisRequest::Area {
                sources,
                style: analysis_style("Measurement"),
            };
            let mut wb = workbench();
            let result = wb.run_analysis(&request).await?;
            println!("Area: {}", result.summary);
        }
        Commands::Intersect {
            path_a,
            path_b,
            keep_non_intersecting,
        } => {
            let a = load_geojson_dataset(&path_a, "a")?;
            let b = load_geojson_dataset(&path_b, "b")?;
            let request = AnalysisRequest::Intersect {
                set_a: a.features().iter().map(|f| f.geometry.clone()).collect(),
                set_b: b.features().iter().map(|f| f.geometry.clone()).collect(),
                keep_non_intersecting,
                style: analysis_style("Intersection"),
            };
            let mut wb = workbench();
            let result = wb.run_analysis(&request).await?;
            println!(
                "Intersections: {} geometries ({} skipped), combined area {}",
                result.outputs.len(),
                result.skipped,
                result.summary
            );
        }
    }
    Ok(())
}
