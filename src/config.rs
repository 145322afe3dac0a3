use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    backend::Backend,
    device,
    driver::{BenchmarkDriver, DriverBuilder},
    error::{Error, Result},
    method::ConvMethod,
    problem::ProblemSet,
};

pub const APP_NAME: &str = "convbench";
pub const DEEP_BENCH: &str = "deep_bench";

/// Where the problems of a benchmark come from: the built-in catalog or a
/// JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProblemSource {
    #[default]
    DeepBench,
    File(PathBuf),
}

impl From<String> for ProblemSource {
    fn from(value: String) -> Self {
        if value == DEEP_BENCH {
            ProblemSource::DeepBench
        } else {
            ProblemSource::File(PathBuf::from(value))
        }
    }
}

impl From<ProblemSource> for String {
    fn from(source: ProblemSource) -> Self {
        match source {
            ProblemSource::DeepBench => DEEP_BENCH.to_string(),
            ProblemSource::File(path) => path.to_string_lossy().into_owned(),
        }
    }
}

impl ProblemSource {
    pub fn load(&self) -> Result<Arc<ProblemSet>> {
        match self {
            ProblemSource::DeepBench => Ok(ProblemSet::deep_bench()),
            ProblemSource::File(path) => ProblemSet::from_json_file(path).map(Arc::new),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub method: ConvMethod,
    pub repeats: u32,
    pub devices: Vec<u32>,
    pub problems: ProblemSource,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            method: ConvMethod::Forward,
            repeats: 100,
            devices: vec![0],
            problems: ProblemSource::DeepBench,
        }
    }
}

impl BenchConfig {
    /// `<config dir>/convbench/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.yaml"))
    }

    /// Loads a JSON (`.json`) or YAML (`.yaml`, `.yml`) configuration file.
    /// Other extensions are rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<BenchConfig> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                debug!("loading json config from {:?}", path);
                BenchConfig::from_json_str(&fs::read_to_string(path)?)
            }
            Some("yaml" | "yml") => {
                debug!("loading yaml config from {:?}", path);
                BenchConfig::from_yaml_str(&fs::read_to_string(path)?)
            }
            _ => Err(Error::Config(format!(
                "couldn't load configuration file {path:?}: expected .json, .yaml or .yml"
            ))),
        }
    }

    pub fn from_json_str(json: &str) -> Result<BenchConfig> {
        Ok(serde_json::from_str(json)?)
    }

    /// An empty document yields the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<BenchConfig> {
        if yaml.trim().is_empty() {
            return Ok(BenchConfig::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads the config from its default location, falling back to the
    /// defaults when there is none. Device ids from the environment take
    /// precedence over the file.
    pub fn load_or_default() -> Result<BenchConfig> {
        let mut config = match BenchConfig::default_path() {
            Some(path) if path.exists() => BenchConfig::load(&path)?,
            path => {
                warn!("no config file at {:?}, using defaults", path);
                BenchConfig::default()
            }
        };

        if let Some(devices) = device::devices_from_env()? {
            info!("using devices {:?} from {}", devices, device::DEVICES_ENV);
            config.devices = devices;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.repeats == 0 {
            return Err(Error::Config("repeats must be at least 1".to_string()));
        }
        if self.devices.is_empty() {
            return Err(Error::Config("devices must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn build_driver<B: Backend>(&self, backend: B) -> Result<BenchmarkDriver<B>> {
        self.validate()?;
        let problems = self.problems.load()?;
        DriverBuilder::new(self.method, problems)
            .repeats(self.repeats)
            .devices(self.devices.clone())
            .build(backend)
    }
}
