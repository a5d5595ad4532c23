// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)

//! Run configuration: a TOML file plus environment overrides.
//!
//! ```toml
//! [enumeration]
//! path = "length_9_wds.txt"
//! groups = [{ length = 8, start = 1085905, end = 7579441 }]
//!
//! [execution]
//! threads = 0
//! chunk_size = 65536
//! sequential = false
//!
//! [output]
//! dir = "results"
//!
//! [criterion]
//! dim = 3
//! parameter = 0.7
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use spaced_core::enumeration::{LengthGroup, DEFAULT_CHUNK_SIZE};
use spaced_core::criterion::{DEFAULT_DIM, DEFAULT_PARAMETER};
use spaced_core::BatchConfig;

pub const CONFIG_ENV: &str = "SPACED_CONFIG";
pub const THREADS_ENV: &str = "SPACED_THREADS";
pub const SEQUENTIAL_ENV: &str = "SPACED_SEQUENTIAL";

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnumerationConfig {
    /// Word list, one word per line, grouped by length.
    pub path: Option<PathBuf>,
    /// Line-index boundaries of each length group.
    pub groups: Vec<LengthGroup>,
}

impl EnumerationConfig {
    pub fn group(&self, length: usize) -> Option<LengthGroup> {
        self.groups.iter().copied().find(|group| group.length == length)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Worker threads, `0` for the rayon default.
    pub threads: usize,
    /// Words per streamed chunk.
    pub chunk_size: usize,
    pub sequential: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sequential: false,
        }
    }
}

impl ExecutionConfig {
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            threads: self.threads,
            sequential: self.sequential,
            ..BatchConfig::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CriterionConfig {
    pub dim: usize,
    pub parameter: f64,
}

impl Default for CriterionConfig {
    fn default() -> Self {
        Self {
            dim: DEFAULT_DIM,
            parameter: DEFAULT_PARAMETER,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub enumeration: EnumerationConfig,
    pub execution: ExecutionConfig,
    pub output: OutputConfig,
    pub criterion: CriterionConfig,
}

impl RunConfig {
    /// Loads `path`, or the file named by `SPACED_CONFIG`, then applies the
    /// environment overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_ENV)
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);
        let path = path.map(Path::to_path_buf).or(from_env);

        let mut config = match path {
            Some(path) => Self::from_file(&path)?.unwrap_or_default(),
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file; `Ok(None)` when it does not exist.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
            .map(Some)
            .map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies `SPACED_THREADS` and `SPACED_SEQUENTIAL` as looked up by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(THREADS_ENV) {
            self.execution.threads = raw.trim().parse().map_err(|_| ConfigError::Env {
                var: THREADS_ENV,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(SEQUENTIAL_ENV) {
            self.execution.sequential = match raw.trim() {
                "1" | "true" | "True" | "on" | "ON" => true,
                "0" | "false" | "False" | "off" | "OFF" | "" => false,
                _ => {
                    return Err(ConfigError::Env {
                        var: SEQUENTIAL_ENV,
                        value: raw,
                    })
                }
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.execution.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "execution.chunk_size must be positive".to_string(),
            ));
        }
        for (index, group) in self.enumeration.groups.iter().enumerate() {
            if group.end < group.start {
                return Err(ConfigError::Invalid(format!(
                    "group for length {} ends at {} before it starts at {}",
                    group.length, group.end, group.start
                )));
            }
            if self.enumeration.groups[..index]
                .iter()
                .any(|other| other.length == group.length)
            {
                return Err(ConfigError::Invalid(format!(
                    "length {} is configured more than once",
                    group.length
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML {path:?}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
