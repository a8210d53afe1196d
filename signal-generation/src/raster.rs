//! Candle window rasterization for the learned engine.
//!
//! The grid is a coarse stand-in for a rendered chart image: one column per
//! candle (newest on the right), rows spanning the window's high/low range.

use crate::learned::{ChartRenderer, ScorerError};
use common::CandleWindow;
use rust_decimal::prelude::*;

const WICK_CELL: f32 = 0.5;
const BODY_CELL: f32 = 1.0;

/// Row-major occupancy grid, row 0 at the top (highest price).
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRaster {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<f32>,
}

impl ChartRaster {
    pub fn blank(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0.0; rows * cols],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.cells[row * self.cols + col]
    }

    fn fill(&mut self, col: usize, top: usize, bottom: usize, value: f32) {
        for row in top..=bottom {
            let cell = &mut self.cells[row * self.cols + col];
            *cell = cell.max(value);
        }
    }
}

/// Draws the last `cols` candles into a `rows` x `cols` grid.
#[derive(Debug, Clone)]
pub struct RasterRenderer {
    rows: usize,
    cols: usize,
}

impl RasterRenderer {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows: rows.max(2),
            cols: cols.max(1),
        }
    }
}

impl Default for RasterRenderer {
    fn default() -> Self {
        Self::new(32, 40)
    }
}

impl ChartRenderer for RasterRenderer {
    fn render(&self, window: &CandleWindow) -> Result<ChartRaster, ScorerError> {
        let candles = window.tail(self.cols);
        if candles.is_empty() {
            return Err(ScorerError::Render("empty window".into()));
        }

        let high = candles.iter().map(|c| c.high).max().unwrap_or_default();
        let low = candles.iter().map(|c| c.low).min().unwrap_or_default();
        let span = (high - low).to_f64().unwrap_or(0.0);
        if span <= 0.0 {
            return Err(ScorerError::Render("window has no price range".into()));
        }

        let scale = (self.rows - 1) as f64;
        let row_of = |price: Decimal| -> usize {
            let offset = (high - price).to_f64().unwrap_or(0.0);
            ((offset / span) * scale).round().clamp(0.0, scale) as usize
        };

        let mut raster = ChartRaster::blank(self.rows, self.cols);
        let first_col = self.cols - candles.len();
        for (i, candle) in candles.iter().enumerate() {
            let col = first_col + i;
            raster.fill(col, row_of(candle.high), row_of(candle.low), WICK_CELL);
            raster.fill(
                col,
                row_of(candle.open.max(candle.close)),
                row_of(candle.open.min(candle.close)),
                BODY_CELL,
            );
        }

        Ok(raster)
    }
}
