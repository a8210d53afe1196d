//! Classifier-backed hammer detection.
//!
//! The engine renders the window, hands the rendering to a scorer and compares
//! the returned probability against a threshold. It fails closed: anything
//! that prevents a score produces HOLD.

use crate::raster::ChartRaster;
use crate::signals::SignalEngine;
use common::{CandleWindow, Signal, SignalAction, SignalSource};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),
    #[error("chart rendering failed: {0}")]
    Render(String),
    #[error("chart is {got_rows}x{got_cols}, model expects {rows}x{cols}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        got_rows: usize,
        got_cols: usize,
    },
}

/// Turns a candle window into the representation a scorer consumes.
pub trait ChartRenderer {
    fn render(&self, window: &CandleWindow) -> Result<ChartRaster, ScorerError>;
}

/// Opaque classifier: probability that a rendered chart ends in a hammer.
pub trait ChartScorer {
    fn probability(&self, chart: &ChartRaster) -> Result<f64, ScorerError>;
}

pub struct LearnedSignalEngine {
    renderer: Box<dyn ChartRenderer + Send + Sync>,
    scorer: Option<Box<dyn ChartScorer + Send + Sync>>,
    threshold: f64,
}

impl LearnedSignalEngine {
    pub fn new(
        renderer: Box<dyn ChartRenderer + Send + Sync>,
        scorer: Box<dyn ChartScorer + Send + Sync>,
        threshold: f64,
    ) -> Self {
        info!(threshold, "Initialized learned signal engine");
        Self {
            renderer,
            scorer: Some(scorer),
            threshold,
        }
    }

    /// An engine whose scorer could not be loaded. Every evaluation is HOLD.
    pub fn unavailable(renderer: Box<dyn ChartRenderer + Send + Sync>, threshold: f64) -> Self {
        Self {
            renderer,
            scorer: None,
            threshold,
        }
    }

    pub fn is_available(&self) -> bool {
        self.scorer.is_some()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn score(&self, window: &CandleWindow) -> Result<Option<f64>, ScorerError> {
        let Some(scorer) = &self.scorer else {
            return Ok(None);
        };
        let chart = self.renderer.render(window)?;
        let probability = scorer.probability(&chart)?;
        Ok(probability.is_finite().then_some(probability))
    }
}

impl SignalEngine for LearnedSignalEngine {
    fn evaluate(&self, window: &CandleWindow) -> Signal {
        if window.len() < self.min_window() {
            return Signal::hold(SignalSource::Cv);
        }

        let probability = match self.score(window) {
            Ok(Some(p)) => p.clamp(0.0, 1.0),
            Ok(None) => {
                debug!("Learned scorer unavailable, holding");
                return Signal::hold(SignalSource::Cv);
            }
            Err(e) => {
                warn!(error = %e, "Learned signal failed, holding");
                return Signal::hold(SignalSource::Cv);
            }
        };

        let is_buy = probability >= self.threshold;
        info!(
            hammer_prob = probability,
            threshold = self.threshold,
            is_buy,
            "CV signal"
        );

        if is_buy {
            let reference_low = window.latest().map(|c| c.low);
            Signal::buy(SignalSource::Cv, probability, reference_low)
        } else {
            Signal {
                action: SignalAction::Hold,
                confidence: probability,
                reference_low: None,
                source: SignalSource::Cv,
            }
        }
    }

    fn source(&self) -> SignalSource {
        SignalSource::Cv
    }

    fn min_window(&self) -> usize {
        1
    }
}
