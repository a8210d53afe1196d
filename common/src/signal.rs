use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the signal engine wants the loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalAction {
    Buy,
    Hold,
}

/// Which engine produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalSource {
    Numeric,
    Cv,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSource::Numeric => f.write_str("numeric"),
            SignalSource::Cv => f.write_str("cv"),
        }
    }
}

/// Verdict for one loop iteration. Built fresh every time, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub action: SignalAction,
    /// 0.0 to 1.0
    pub confidence: f64,
    /// Low of the pattern candle, used for stop placement
    pub reference_low: Option<Decimal>,
    pub source: SignalSource,
}

impl Signal {
    pub fn buy(source: SignalSource, confidence: f64, reference_low: Option<Decimal>) -> Self {
        Self {
            action: SignalAction::Buy,
            confidence: confidence.clamp(0.0, 1.0),
            reference_low,
            source,
        }
    }

    pub fn hold(source: SignalSource) -> Self {
        Self {
            action: SignalAction::Hold,
            confidence: 0.0,
            reference_low: None,
            source,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.action == SignalAction::Buy
    }
}
