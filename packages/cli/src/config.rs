//! Pipeline configuration.
//!
//! Loaded from a TOML file where every field is optional, then overridden
//! by command-line flags.

use std::path::{Path, PathBuf};

use natural_cities_analytics_models::Estimator;
use natural_cities_geography::regions::DEFAULT_REGIONALIZATION;
use natural_cities_geography_models::{
    INHABITED_HOUSING, SUN_POPULATION, TOTAL_HOUSING, TOTAL_POPULATION,
};
use natural_cities_spatial::MEXICO_ITRF2008;
use serde::{Deserialize, Serialize};

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "natural_cities.toml";

/// Settings shared by every subcommand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory holding the input files.
    pub input_dir: PathBuf,
    /// Directory the outputs are written to. Created if missing.
    pub output_dir: PathBuf,
    /// EPSG code of the input polygons.
    pub projection: u32,
    /// Census attributes carried onto polygons and summed per city.
    pub attributes: Vec<String>,
    /// Attribute whose distribution is analysed.
    pub size_attribute: String,
    /// Size attribute of the SUN-2018 metropolitan areas.
    pub sun_size_attribute: String,
    /// Bootstrap iterations of the goodness-of-fit test.
    pub bootstrap_iterations: u64,
    /// Bootstrap seed.
    pub seed: u64,
    /// Power-law exponent estimator.
    pub estimator: Estimator,
    /// Built-in regionalization id or path to a regionalization TOML file.
    pub regionalization: String,
    /// Input and output file names.
    pub files: FileNames,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            projection: MEXICO_ITRF2008,
            attributes: vec![
                TOTAL_POPULATION.to_string(),
                TOTAL_HOUSING.to_string(),
                INHABITED_HOUSING.to_string(),
            ],
            size_attribute: TOTAL_POPULATION.to_string(),
            sun_size_attribute: SUN_POPULATION.to_string(),
            bootstrap_iterations: 1,
            seed: 42,
            estimator: Estimator::default(),
            regionalization: DEFAULT_REGIONALIZATION.to_string(),
            files: FileNames::default(),
        }
    }
}

/// File names, relative to [`PipelineConfig::input_dir`] or
/// [`PipelineConfig::output_dir`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileNames {
    /// Locality polygons (`GeoJSON`, keyed by `CVEGEO`).
    pub localities: String,
    /// Locality census (CSV).
    pub census: String,
    /// State polygons (`GeoJSON`, keyed by `CVE_ENT`).
    pub states: String,
    /// SUN-2018 municipality polygons (`GeoJSON`, keyed by `CVE_SUN`).
    /// Optional; the SUN-2018 system is skipped when it is absent.
    pub sun2018: String,
    /// Joined localities.
    pub localities_output: String,
    /// Member localities dissolved per natural city.
    pub grouped_output: String,
    /// Localities tagged with their natural city.
    pub assignments_output: String,
    /// Natural cities.
    pub natural_cities_output: String,
    /// Natural cities above the fitted cutoff.
    pub natural_city_system_output: String,
    /// SUN-2018 metropolitan areas dissolved by key.
    pub sun2018_output: String,
}

impl Default for FileNames {
    fn default() -> Self {
        Self {
            localities: "localities.geojson".to_string(),
            census: "census_localities.csv".to_string(),
            states: "states.geojson".to_string(),
            sun2018: "sun2018.geojson".to_string(),
            localities_output: "localities_data.geojson".to_string(),
            grouped_output: "localities_grouped.geojson".to_string(),
            assignments_output: "localities_assigned.geojson".to_string(),
            natural_cities_output: "natural_cities.geojson".to_string(),
            natural_city_system_output: "natural_city_system.geojson".to_string(),
            sun2018_output: "sun2018_data.geojson".to_string(),
        }
    }
}

/// Command-line overrides for [`PipelineConfig`].
#[derive(Debug, Default, Clone, clap::Args)]
pub struct Overrides {
    /// Directory holding the input files
    #[arg(long, global = true)]
    pub input_dir: Option<PathBuf>,

    /// Directory the outputs are written to
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Attribute whose distribution is analysed
    #[arg(long, global = true)]
    pub size_attribute: Option<String>,

    /// Bootstrap iterations of the goodness-of-fit test
    #[arg(long, global = true)]
    pub iterations: Option<u64>,

    /// Bootstrap seed
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Power-law exponent estimator (approximate or exact)
    #[arg(long, global = true)]
    pub estimator: Option<Estimator>,

    /// Built-in regionalization id or path to a regionalization TOML file
    #[arg(long, global = true)]
    pub regionalization: Option<String>,
}

impl PipelineConfig {
    /// Parses a TOML document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML or has an
    /// unknown field.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::de::from_str(content)
    }

    /// Loads the config at `path`, or [`DEFAULT_CONFIG_FILE`] when `path`
    /// is `None`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        log::info!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// Replaces every field that has an override.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(dir) = overrides.input_dir {
            self.input_dir = dir;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if let Some(attribute) = overrides.size_attribute {
            self.size_attribute = attribute;
        }
        if let Some(iterations) = overrides.iterations {
            self.bootstrap_iterations = iterations;
        }
        if let Some(seed) = overrides.seed {
            self.seed = seed;
        }
        if let Some(estimator) = overrides.estimator {
            self.estimator = estimator;
        }
        if let Some(regionalization) = overrides.regionalization {
            self.regionalization = regionalization;
        }
    }

    /// Path of an input file.
    #[must_use]
    pub fn input(&self, name: &str) -> PathBuf {
        self.input_dir.join(name)
    }

    /// Path of an output file.
    #[must_use]
    pub fn output(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}
