// Signal Generation
// Turns a candle window into a BUY/HOLD verdict

pub mod hammer;
pub mod learned;
pub mod model;
pub mod raster;
pub mod selection;
pub mod signals;

#[cfg(test)]
mod testing;

pub use hammer::{HammerConfig, NumericHammerEngine};
pub use learned::{ChartRenderer, ChartScorer, LearnedSignalEngine, ScorerError};
pub use model::LogisticModel;
pub use raster::{ChartRaster, RasterRenderer};
pub use selection::{build_engine, BoxedSignalEngine, EngineSelector, SignalConfig};
pub use signals::SignalEngine;
