use msidh_crypto::config::GenerationConfig;
use msidh_crypto::errors::MsidhError;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable holding the path of the settings file.
pub const SETTINGS_VAR: &str = "MSIDH_SETTINGS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeKind {
    Classic,
    Sidh,
    Msidh,
}

impl std::fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemeKind::Classic => write!(f, "classic"),
            SchemeKind::Sidh => write!(f, "sidh"),
            SchemeKind::Msidh => write!(f, "msidh"),
        }
    }
}

/// Where the isogeny parameters come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSource {
    Preset(String),
    SecurityLevel(u32),
    Snapshot(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    pub scheme: SchemeKind,
    pub parameters: ParameterSource,
    pub rounds: usize,
    /// Fixed seed for parameter generation; fresh entropy when absent.
    pub seed: Option<u64>,
    pub save_snapshot: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub classic_modulus: u64,
    /// Miller–Rabin rounds of the reference provider.
    pub primality_rounds: usize,
    pub generation: GenerationConfig,
    pub debug: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            scheme: SchemeKind::Msidh,
            parameters: ParameterSource::Preset("toy".to_string()),
            rounds: 10,
            seed: None,
            save_snapshot: None,
            timeout_secs: None,
            classic_modulus: 7919,
            primality_rounds: 24,
            generation: GenerationConfig::default(),
            debug: false,
        }
    }
}

impl RunnerSettings {
    /// Reads the file named by `MSIDH_SETTINGS`, or falls back to the defaults.
    pub fn from_env() -> Result<Self, MsidhError> {
        match std::env::var_os(SETTINGS_VAR) {
            Some(path) => Self::from_json(&std::fs::read_to_string(path)?),
            None => Ok(Self::default()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, MsidhError> {
        Ok(serde_json::from_str(json)?)
    }
}
