//! Configuration management.

use crate::analyzer::ParameterTable;
use crate::error::EngineError;
use crate::protocol::DEFAULT_PORT;
use config::Config;
use serde::Deserialize;
use std::path::Path;

/// Application settings, loaded from an optional TOML file layered over the
/// built-in defaults.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub server: ServerSettings,
    pub analyzer: AnalyzerSettings,
}

/// TCP listener settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Identity and parameter table of the simulated analyzer.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalyzerSettings {
    /// Human-readable model name reported by `GetAnalyzerVisibleName`.
    pub visible_name: String,
    /// Device parameters exposed over the protocol.
    pub parameters: ParameterTable,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerSettings::default(),
            analyzer: AnalyzerSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            visible_name: "KREIOS 150".to_string(),
            parameters: ParameterTable::builtin(),
        }
    }
}

impl Settings {
    /// Loads settings, merging `path` over the defaults when given.
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let merged = builder.build()?;
        merged.try_deserialize().map_err(EngineError::from)
    }
}
