//! Example usage of the risk manager

use common::{AccountBalance, Signal, SignalSource};
use portfolio_risk::{RiskConfig, RiskManager, Sizing};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Risk Sizing Example ===\n");

    let manager = RiskManager::new(RiskConfig {
        size_increment: dec!(1),
        ..Default::default()
    })?;

    // Hammer at 102 with its low at 90: the pattern stop (12) is wider than 2% (2.04)
    let signal = Signal::buy(SignalSource::Numeric, 0.9, Some(dec!(90)));

    for available in [dec!(100), dec!(1000), dec!(25000)] {
        let balance = AccountBalance::new(available, "USD");
        match manager.size("BTCUSD", &balance, &signal, dec!(102))? {
            Sizing::Trade(order) => println!(
                "  balance {:>6}: buy {} @ {} stop {:?}",
                available, order.size, order.entry_price, order.stop_price
            ),
            Sizing::NoTrade(reason) => println!("  balance {:>6}: no trade ({})", available, reason),
        }
    }

    Ok(())
}
