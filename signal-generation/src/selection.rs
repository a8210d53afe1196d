// Signal engine selection
// Picks the numeric or learned engine at startup from configuration

use crate::hammer::{HammerConfig, NumericHammerEngine};
use crate::learned::LearnedSignalEngine;
use crate::model::LogisticModel;
use crate::raster::RasterRenderer;
use crate::signals::SignalEngine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

pub type BoxedSignalEngine = Box<dyn SignalEngine + Send + Sync>;

/// Which engine the loop should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineSelector {
    Numeric,
    /// Learned classifier; holds on every candle when the model is missing
    #[serde(alias = "cv")]
    Learned,
    /// Learned classifier when its model loads, numeric otherwise
    Auto,
}

impl FromStr for EngineSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" => Ok(EngineSelector::Numeric),
            "learned" | "cv" => Ok(EngineSelector::Learned),
            "auto" => Ok(EngineSelector::Auto),
            other => Err(format!("unsupported signal engine '{other}'")),
        }
    }
}

impl fmt::Display for EngineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineSelector::Numeric => f.write_str("numeric"),
            EngineSelector::Learned => f.write_str("learned"),
            EngineSelector::Auto => f.write_str("auto"),
        }
    }
}

/// Configuration for signal generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_engine")]
    pub engine: EngineSelector,

    /// Minimum classifier probability for a BUY (0.0 to 1.0)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// JSON artifact for the learned engine
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default)]
    pub hammer: HammerConfig,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            confidence_threshold: default_confidence_threshold(),
            model_path: default_model_path(),
            hammer: HammerConfig::default(),
        }
    }
}

fn default_engine() -> EngineSelector {
    EngineSelector::Auto
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/hammer_cv.json")
}

/// Build the engine named by `config.engine`.
///
/// Never fails: an unloadable model either degrades the learned engine to
/// permanent HOLD (`learned`) or falls back to the numeric engine (`auto`).
pub fn build_engine(config: &SignalConfig) -> BoxedSignalEngine {
    match config.engine {
        EngineSelector::Numeric => {
            info!("Using numeric hammer signal engine");
            Box::new(NumericHammerEngine::new(config.hammer.clone()))
        }
        EngineSelector::Learned => match LogisticModel::load(&config.model_path) {
            Ok(model) => learned_engine(model, config.confidence_threshold),
            Err(e) => {
                warn!(
                    path = %config.model_path.display(),
                    error = %e,
                    "Learned model unavailable, signal engine will hold on every candle"
                );
                Box::new(LearnedSignalEngine::unavailable(
                    Box::new(RasterRenderer::default()),
                    config.confidence_threshold,
                ))
            }
        },
        EngineSelector::Auto => match LogisticModel::load(&config.model_path) {
            Ok(model) => {
                info!(path = %config.model_path.display(), "Auto-detected learned model");
                learned_engine(model, config.confidence_threshold)
            }
            Err(e) => {
                info!(error = %e, "No usable learned model, using numeric hammer signal engine");
                Box::new(NumericHammerEngine::new(config.hammer.clone()))
            }
        },
    }
}

fn learned_engine(model: LogisticModel, threshold: f64) -> BoxedSignalEngine {
    let renderer = RasterRenderer::new(model.rows, model.cols);
    Box::new(LearnedSignalEngine::new(Box::new(renderer), Box::new(model), threshold))
}
