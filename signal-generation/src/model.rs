//! Logistic classifier loaded from a JSON artifact.

use crate::learned::{ChartScorer, ScorerError};
use crate::raster::ChartRaster;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Weights over a rendered chart plus a bias, scored through a sigmoid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub rows: usize,
    pub cols: usize,
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl LogisticModel {
    /// Load and validate an artifact file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScorerError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let model: LogisticModel = serde_json::from_str(&content)?;
        model.validate()?;
        info!(
            path = %path.as_ref().display(),
            rows = model.rows,
            cols = model.cols,
            "Loaded hammer classifier"
        );
        Ok(model)
    }

    fn validate(&self) -> Result<(), ScorerError> {
        // the renderer needs at least two price rows
        if self.rows < 2 || self.cols == 0 {
            return Err(ScorerError::InvalidArtifact(format!(
                "raster must be at least 2x1, found {}x{}",
                self.rows, self.cols
            )));
        }
        if self.weights.len() != self.rows * self.cols {
            return Err(ScorerError::InvalidArtifact(format!(
                "expected {} weights, found {}",
                self.rows * self.cols,
                self.weights.len()
            )));
        }
        if !self.bias.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(ScorerError::InvalidArtifact("non-finite parameter".into()));
        }
        Ok(())
    }
}

impl ChartScorer for LogisticModel {
    fn probability(&self, chart: &ChartRaster) -> Result<f64, ScorerError> {
        if chart.rows != self.rows || chart.cols != self.cols {
            return Err(ScorerError::ShapeMismatch {
                rows: self.rows,
                cols: self.cols,
                got_rows: chart.rows,
                got_cols: chart.cols,
            });
        }

        let logit: f64 = self
            .weights
            .iter()
            .zip(&chart.cells)
            .map(|(w, x)| f64::from(*w) * f64::from(*x))
            .sum::<f64>()
            + f64::from(self.bias);

        Ok(1.0 / (1.0 + (-logit).exp()))
    }
}
