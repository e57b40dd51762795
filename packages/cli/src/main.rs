#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Natural cities of Mexico.
//!
//! Groups census localities into natural cities with the City Clustering
//! Algorithm by Convex Envelope Intersections, then tests whether the
//! sizes of localities and natural cities follow a power law, for the
//! whole country and region by region.
//!
//! Settings come from a TOML file (`natural_cities.toml` unless
//! `--config` is given) and are overridden by flags. Uses
//! `indicatif-log-bridge` (via [`natural_cities_cli_utils::init_logger`])
//! so log lines and progress bars share the terminal.

mod config;
mod pipeline;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use natural_cities_cli_utils::MultiProgress;
use natural_cities_geography::export::CLUSTER_ID_PROPERTY;
use natural_cities_geography::ingest::{LOCALITY_KEY, SUN_KEY};

use crate::config::{Overrides, PipelineConfig};

#[derive(Parser)]
#[command(
    name = "natural_cities",
    about = "Natural city clustering and city-size power-law analysis"
)]
struct Cli {
    /// TOML config file (defaults to `natural_cities.toml` if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join localities with the census and cluster them into natural cities,
    /// and dissolve the SUN-2018 metropolitan areas
    Cluster,
    /// Descriptive statistics and power-law analysis of a feature collection
    ///
    /// Without `--input`, analyses the localities, natural cities and
    /// SUN-2018 areas written by `cluster`.
    Analyze(Dataset),
    /// Per-region statistics of a feature collection
    ///
    /// Without `--input`, analyses the localities, natural cities and
    /// SUN-2018 areas written by `cluster`.
    Regional(Dataset),
    /// Run clustering, analysis, the natural city system and the regional
    /// analysis in one go
    Pipeline,
}

/// A feature collection to analyse.
#[derive(Args)]
struct Dataset {
    /// `GeoJSON` feature collection to analyse
    #[arg(long)]
    input: Option<PathBuf>,

    /// Property holding each feature's key
    #[arg(long, default_value = LOCALITY_KEY)]
    key: String,

    /// Prefix of the output files (defaults to the input file stem)
    #[arg(long)]
    name: Option<String>,
}

/// A dataset resolved against the config.
struct Source {
    name: String,
    path: PathBuf,
    key: String,
    attribute: String,
}

impl Dataset {
    /// Resolves the datasets to read. The SUN-2018 areas are included only
    /// when `cluster` has written them.
    fn resolve(&self, config: &PipelineConfig) -> Vec<Source> {
        if let Some(path) = &self.input {
            return vec![Source {
                name: self.name.clone().unwrap_or_else(|| stem(path)),
                path: path.clone(),
                key: self.key.clone(),
                attribute: config.size_attribute.clone(),
            }];
        }

        let mut sources = vec![
            Source {
                name: pipeline::LOCALITIES.to_string(),
                path: config.output(&config.files.localities_output),
                key: LOCALITY_KEY.to_string(),
                attribute: config.size_attribute.clone(),
            },
            Source {
                name: pipeline::NATURAL_CITIES.to_string(),
                path: config.output(&config.files.natural_cities_output),
                key: CLUSTER_ID_PROPERTY.to_string(),
                attribute: config.size_attribute.clone(),
            },
        ];
        let sun = config.output(&config.files.sun2018_output);
        if sun.exists() {
            sources.push(Source {
                name: pipeline::SUN2018.to_string(),
                path: sun,
                key: SUN_KEY.to_string(),
                attribute: config.sun_size_attribute.clone(),
            });
        }
        sources
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "dataset".to_string(), |s| s.to_string_lossy().into_owned())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = natural_cities_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    config.apply(cli.overrides);

    match cli.command {
        Commands::Cluster => {
            pipeline::cluster_stage(&config)?;
            pipeline::sun_stage(&config)?;
        }
        Commands::Analyze(dataset) => analyze(&config, &multi, &dataset)?,
        Commands::Regional(dataset) => regional(&config, &multi, &dataset)?,
        Commands::Pipeline => pipeline::run(&config, &multi)?,
    }

    Ok(())
}

fn analyze(
    config: &PipelineConfig,
    multi: &MultiProgress,
    dataset: &Dataset,
) -> Result<(), Box<dyn std::error::Error>> {
    for source in dataset.resolve(config) {
        let features = pipeline::read_dataset(config, &source.path, &source.key)?;
        pipeline::analysis_stage(config, multi, &source.name, &source.attribute, &features)?;
    }
    Ok(())
}

fn regional(
    config: &PipelineConfig,
    multi: &MultiProgress,
    dataset: &Dataset,
) -> Result<(), Box<dyn std::error::Error>> {
    let states = pipeline::read_states(config)?;
    for source in dataset.resolve(config) {
        let features = pipeline::read_dataset(config, &source.path, &source.key)?;
        pipeline::regional_stage(
            config,
            multi,
            &source.name,
            &source.attribute,
            &features,
            &states,
        )?;
    }
    Ok(())
}
