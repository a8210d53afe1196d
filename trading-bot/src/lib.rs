// Trading Bot
// Configuration, trade cooldown and the polling loop that ties signal,
// risk and execution together.

pub mod config;
pub mod cooldown;
pub mod orchestrator;

pub use config::{BotConfig, ConfigError, PriceSource};
pub use cooldown::{CooldownGuard, CooldownState};
pub use orchestrator::{IterationOutcome, LoopSettings, LoopState, Orchestrator, SkipReason};
