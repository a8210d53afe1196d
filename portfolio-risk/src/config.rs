//! Risk management configuration

use crate::risk::RiskError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Per-trade risk budget and stop placement settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Fraction of the available balance put at risk per trade (0.02 = 2%)
    #[serde(default = "default_risk_percent")]
    pub risk_percent: Decimal,

    /// Minimum stop distance as a fraction of the entry price
    #[serde(default = "default_stop_loss_percent")]
    pub stop_loss_percent: Decimal,

    /// Smallest tradable size step in base-asset units
    #[serde(default = "default_size_increment")]
    pub size_increment: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_percent: default_risk_percent(),
            stop_loss_percent: default_stop_loss_percent(),
            size_increment: default_size_increment(),
        }
    }
}

impl RiskConfig {
    /// Reject percentages outside (0, 1) and non-positive increments.
    pub fn validate(&self) -> Result<(), RiskError> {
        let unit = |name: &'static str, value: Decimal| {
            if value <= Decimal::ZERO || value >= Decimal::ONE {
                Err(RiskError::InvalidConfig {
                    field: name,
                    value,
                    reason: "must be between 0 and 1 (exclusive)",
                })
            } else {
                Ok(())
            }
        };

        unit("risk_percent", self.risk_percent)?;
        unit("stop_loss_percent", self.stop_loss_percent)?;

        if self.size_increment <= Decimal::ZERO {
            return Err(RiskError::InvalidConfig {
                field: "size_increment",
                value: self.size_increment,
                reason: "must be positive",
            });
        }

        Ok(())
    }
}

fn default_risk_percent() -> Decimal {
    dec!(0.02)
}

fn default_stop_loss_percent() -> Decimal {
    dec!(0.02)
}

fn default_size_increment() -> Decimal {
    dec!(0.001)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RiskConfig::default();
        assert_eq!(config.risk_percent, dec!(0.02));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = RiskConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: RiskConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: RiskConfig = toml::from_str("risk_percent = 0.01").unwrap();
        assert_eq!(config.risk_percent, dec!(0.01));
        assert_eq!(config.stop_loss_percent, dec!(0.02));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = RiskConfig {
            risk_percent: dec!(1.5),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RiskConfig {
            size_increment: Decimal::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
