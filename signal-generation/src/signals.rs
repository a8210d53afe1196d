use common::{CandleWindow, Signal, SignalSource};

/// A source of buy/hold verdicts over a candle window.
///
/// Implementations never fail: a window that is too short, a missing model or
/// any internal problem resolves to a HOLD signal.
pub trait SignalEngine {
    fn evaluate(&self, window: &CandleWindow) -> Signal;

    fn source(&self) -> SignalSource;

    /// Smallest window the engine can judge
    fn min_window(&self) -> usize;
}

impl<T: SignalEngine + ?Sized> SignalEngine for Box<T> {
    fn evaluate(&self, window: &CandleWindow) -> Signal {
        (**self).evaluate(window)
    }

    fn source(&self) -> SignalSource {
        (**self).source()
    }

    fn min_window(&self) -> usize {
        (**self).min_window()
    }
}
