//! Pipeline stages.
//!
//! Each subcommand runs one or more of these stages: clustering the
//! census localities into natural cities, dissolving the SUN-2018
//! metropolitan areas, analysing a set of features, and analysing the same
//! features region by region. [`run`] chains them all.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use natural_cities_analytics::SizeSample;
use natural_cities_analytics::analysis::{AnalysisOptions, PowerLawAnalysis, analyze};
use natural_cities_analytics::ccdf::{empirical_ccdf, model_ccdf};
use natural_cities_analytics::describe::describe;
use natural_cities_analytics::progress::ProgressCallback;
use natural_cities_cli_utils::{IndicatifProgress, MultiProgress};
use natural_cities_cluster::{ClusteringOutcome, NaturalCity, cluster, natural_city_system};
use natural_cities_geography::dissolve::dissolve_by_key;
use natural_cities_geography::export::{
    assignments_collection, grouped_collection, localities_collection, natural_cities_collection,
    write_ccdf_file, write_feature_collection, write_field_values_file,
};
use natural_cities_geography::ingest::{
    LOCALITY_KEY, STATE_KEY, SUN_KEY, join_census, read_census, read_features,
};
use natural_cities_geography::regions::{self, StateIndex, partition, regional_analysis};
use natural_cities_spatial::Locality;

use crate::config::PipelineConfig;

/// Name of the locality dataset in output file names.
pub const LOCALITIES: &str = "Localities";

/// Name of the natural-city dataset in output file names.
pub const NATURAL_CITIES: &str = "NaturalCities";

/// Name of the SUN-2018 dataset in output file names.
pub const SUN2018: &str = "SUN2018";

/// Subdirectory of the output directory for whole-country statistics.
const STATISTICS_DIR: &str = "statistics";

/// Subdirectory of the output directory for per-region statistics.
const REGIONAL_DIR: &str = "regional";

type BoxError = Box<dyn std::error::Error>;

/// Joined localities and the natural cities built from them.
pub struct Clustered {
    /// Census-joined localities with a positive size attribute.
    pub localities: Vec<Locality>,
    /// Clustering result.
    pub outcome: ClusteringOutcome,
}

impl Clustered {
    /// Natural cities as plain features keyed by their id.
    #[must_use]
    pub fn city_features(&self) -> Vec<Locality> {
        self.outcome.cities.iter().map(NaturalCity::to_locality).collect()
    }
}

/// Reads the locality polygons and census, joins them, clusters them into
/// natural cities, and writes the `GeoJSON` outputs.
///
/// # Errors
///
/// Returns an error if an input cannot be read, clustering fails, or an
/// output cannot be written.
pub fn cluster_stage(config: &PipelineConfig) -> Result<Clustered, BoxError> {
    let polygons = read_features(
        &config.input(&config.files.localities),
        LOCALITY_KEY,
        config.projection,
    )?;
    let census = read_census(&config.input(&config.files.census), &config.attributes)?;
    let localities = join_census(polygons, census, &config.size_attribute);

    let attributes: BTreeSet<String> = config.attributes.iter().cloned().collect();
    let outcome = cluster(localities.clone(), &attributes)?;
    log::info!(
        "Clustered {} localities into {} natural cities ({} unmatched)",
        localities.len(),
        outcome.cities.len(),
        outcome.unmatched.len()
    );

    std::fs::create_dir_all(&config.output_dir)?;
    write_feature_collection(
        &config.output(&config.files.localities_output),
        &localities_collection(&localities, LOCALITY_KEY),
    )?;
    write_feature_collection(
        &config.output(&config.files.grouped_output),
        &grouped_collection(&outcome.cities),
    )?;
    write_feature_collection(
        &config.output(&config.files.assignments_output),
        &assignments_collection(&outcome.grouped),
    )?;
    write_feature_collection(
        &config.output(&config.files.natural_cities_output),
        &natural_cities_collection(&outcome.cities),
    )?;

    Ok(Clustered {
        localities,
        outcome,
    })
}

/// Dissolves the SUN-2018 municipality polygons into one feature per
/// metropolitan area, rounding the population first, and writes them out.
///
/// Returns `None` when the SUN-2018 input file does not exist.
///
/// # Errors
///
/// Returns an error if the input cannot be read or the output cannot be
/// written.
pub fn sun_stage(config: &PipelineConfig) -> Result<Option<Vec<Locality>>, BoxError> {
    let path = config.input(&config.files.sun2018);
    if !path.exists() {
        log::warn!("No SUN-2018 input at {}, skipping that city system", path.display());
        return Ok(None);
    }

    let municipalities = read_features(&path, SUN_KEY, config.projection)?;
    let areas = dissolve_by_key(municipalities, &[config.sun_size_attribute.as_str()]);

    std::fs::create_dir_all(&config.output_dir)?;
    write_feature_collection(
        &config.output(&config.files.sun2018_output),
        &localities_collection(&areas, SUN_KEY),
    )?;

    Ok(Some(areas))
}

/// Builds the analysis options of one dataset from the config.
fn analysis_options(config: &PipelineConfig, progress: Arc<dyn ProgressCallback>) -> AnalysisOptions {
    AnalysisOptions {
        estimator: config.estimator,
        iterations: config.bootstrap_iterations,
        seed: config.seed,
        progress,
        ..AnalysisOptions::default()
    }
}

fn size_values(features: &[Locality], attribute: &str) -> Vec<f64> {
    features
        .iter()
        .filter_map(|f| f.attribute(attribute))
        .collect()
}

/// Descriptive statistics, power-law analysis and CCDF curves of
/// `attribute` over `features`, written under `<output>/statistics` with
/// `name` as the file prefix.
///
/// # Errors
///
/// Returns an error if the sample cannot be analysed or an output cannot
/// be written.
pub fn analysis_stage(
    config: &PipelineConfig,
    multi: &MultiProgress,
    name: &str,
    attribute: &str,
    features: &[Locality],
) -> Result<PowerLawAnalysis, BoxError> {
    let dir = config.output_dir.join(STATISTICS_DIR);
    std::fs::create_dir_all(&dir)?;

    let values = size_values(features, attribute);
    let descriptive = describe(&values, attribute, None)?;
    write_field_values_file(
        &dir.join(format!("{name}_DescriptiveStatistics.csv")),
        &descriptive.to_rows(),
    )?;

    let sample = SizeSample::new(&values)?;
    let progress = IndicatifProgress::iterations_bar(multi, &format!("{name} bootstrap"));
    let analysis = analyze(&sample, &analysis_options(config, progress))?;
    write_field_values_file(
        &dir.join(format!("{name}_PowerLaw.csv")),
        &analysis.summary.to_rows(),
    )?;

    let full = empirical_ccdf(&sample, None);
    let tail = empirical_ccdf(&sample, Some(analysis.model.xmin));
    let fitted = model_ccdf(&analysis.model, sample.tail(analysis.model.xmin));
    write_ccdf_file(
        &dir.join(format!("{name}_CCDF.csv")),
        &[
            ("full_sample", full.as_slice()),
            ("above_xmin", tail.as_slice()),
            ("power_law", fitted.as_slice()),
        ],
    )?;

    Ok(analysis)
}

/// Writes the natural cities whose size exceeds the fitted cutoff.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
#[allow(clippy::cast_precision_loss)]
pub fn natural_city_system_stage(
    config: &PipelineConfig,
    cities: &[NaturalCity],
    analysis: &PowerLawAnalysis,
) -> Result<usize, BoxError> {
    let system = natural_city_system(cities, &config.size_attribute, analysis.model.xmin as f64);
    log::info!(
        "Natural city system: {} of {} cities above xmin={}",
        system.len(),
        cities.len(),
        analysis.model.xmin
    );
    write_feature_collection(
        &config.output(&config.files.natural_city_system_output),
        &natural_cities_collection(system.iter().copied()),
    )?;
    Ok(system.len())
}

/// Per-region descriptive statistics and power-law analysis of
/// `attribute` over `features`, written under `<output>/regional`.
///
/// A region whose sample cannot be analysed is logged and skipped.
///
/// # Errors
///
/// Returns an error if the states or the regionalization cannot be read,
/// a feature has no centroid, or an output cannot be written.
pub fn regional_stage(
    config: &PipelineConfig,
    multi: &MultiProgress,
    name: &str,
    attribute: &str,
    features: &[Locality],
    states: &StateIndex,
) -> Result<(), BoxError> {
    let regionalization = regions::resolve(&config.regionalization)?;
    let dir = config.output_dir.join(REGIONAL_DIR);
    std::fs::create_dir_all(&dir)?;

    let partitions = partition(features, states, &regionalization)?;
    let progress = IndicatifProgress::iterations_bar(multi, &format!("{name} regional bootstrap"));
    let results = regional_analysis(
        &partitions,
        attribute,
        &analysis_options(config, progress),
    );

    for result in results {
        let prefix = format!("{name}_{}", result.region);
        match result.descriptive {
            Ok(summary) => write_field_values_file(
                &dir.join(format!("{prefix}_DescriptiveStatistics.csv")),
                &summary.to_rows(),
            )?,
            Err(e) => log::warn!("{prefix}: no descriptive statistics: {e}"),
        }
        match result.power_law {
            Ok(analysis) => write_field_values_file(
                &dir.join(format!("{prefix}_PowerLaw.csv")),
                &analysis.summary.to_rows(),
            )?,
            Err(e) => log::warn!("{prefix}: no power-law analysis: {e}"),
        }
    }

    Ok(())
}

/// Reads and indexes the state polygons.
///
/// # Errors
///
/// Returns an error if the state file cannot be read.
pub fn read_states(config: &PipelineConfig) -> Result<StateIndex, BoxError> {
    let states = read_features(
        &config.input(&config.files.states),
        STATE_KEY,
        config.projection,
    )?;
    Ok(StateIndex::new(&states))
}

/// Reads a previously written feature collection.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_dataset(
    config: &PipelineConfig,
    path: &Path,
    key_property: &str,
) -> Result<Vec<Locality>, BoxError> {
    Ok(read_features(path, key_property, config.projection)?)
}

/// Runs every stage: clustering, the SUN-2018 dissolve, whole-country
/// analysis of localities, natural cities and SUN-2018 areas, the natural
/// city system, and the regional analysis.
///
/// # Errors
///
/// Returns the first stage error.
pub fn run(config: &PipelineConfig, multi: &MultiProgress) -> Result<(), BoxError> {
    let start = Instant::now();
    let stages = IndicatifProgress::stages_bar(multi, "Pipeline", 4);

    stages.set_message("[1/4] Clustering".to_string());
    let clustered = cluster_stage(config)?;
    let sun = sun_stage(config)?;
    let cities = clustered.city_features();
    stages.inc(1);

    let size = config.size_attribute.as_str();
    let mut datasets = vec![
        (LOCALITIES, size, clustered.localities.as_slice()),
        (NATURAL_CITIES, size, cities.as_slice()),
    ];
    if let Some(areas) = &sun {
        datasets.push((SUN2018, config.sun_size_attribute.as_str(), areas.as_slice()));
    }

    stages.set_message("[2/4] Power-law analysis".to_string());
    analysis_stage(config, multi, LOCALITIES, size, &clustered.localities)?;
    let city_analysis = analysis_stage(config, multi, NATURAL_CITIES, size, &cities)?;
    if let Some(areas) = &sun {
        analysis_stage(config, multi, SUN2018, &config.sun_size_attribute, areas)?;
    }
    stages.inc(1);

    stages.set_message("[3/4] Natural city system".to_string());
    natural_city_system_stage(config, &clustered.outcome.cities, &city_analysis)?;
    stages.inc(1);

    stages.set_message("[4/4] Regional analysis".to_string());
    let states = read_states(config)?;
    for &(name, attribute, features) in &datasets {
        regional_stage(config, multi, name, attribute, features, &states)?;
    }
    stages.inc(1);

    stages.finish("Pipeline complete".to_string());
    log::info!("Pipeline complete in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}
