//! Synthetic progress for a batch call that reports no progress of its own.
//!
//! Each batch owns a window `[start, end)` of the 0..=100 scale. While the
//! call is in flight a ticker nudges the displayed value forward, but never
//! past `cap_fraction` of the window. Only the real completion signal
//! (`stop`) moves the value to `end`.

use crate::config::Config;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressWindow {
    pub start: f64,
    pub end: f64,
}

impl ProgressWindow {
    /// Window for batch `index` of `total` equally weighted batches.
    pub fn for_batch(index: usize, total: usize) -> Self {
        if total == 0 {
            return Self {
                start: 100.0,
                end: 100.0,
            };
        }
        let total = total as f64;
        Self {
            start: 100.0 * index as f64 / total,
            end: 100.0 * (index + 1) as f64 / total,
        }
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    pub fn ceiling(&self, cap_fraction: f64) -> f64 {
        self.start + cap_fraction * self.span()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EstimatorSettings {
    pub tick: Duration,
    pub step_percent: f64,
    pub cap_fraction: f64,
}

impl EstimatorSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            tick: Duration::from_millis(cfg.progress.tick_millis),
            step_percent: cfg.progress.step_percent,
            cap_fraction: cfg.progress.cap_fraction,
        }
    }
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(2000),
            step_percent: 2.0,
            cap_fraction: 0.9,
        }
    }
}

/// One estimator per batch; nothing carries over between windows.
pub struct ProgressEstimator {
    window: ProgressWindow,
    settings: EstimatorSettings,
    counter: f64,
    current: f64,
    ticker: Option<Interval>,
}

impl ProgressEstimator {
    /// Starts the ticker. The first tick fires one period from now.
    pub fn start(window: ProgressWindow, settings: EstimatorSettings) -> Self {
        let mut ticker = tokio::time::interval_at(Instant::now() + settings.tick, settings.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            window,
            settings,
            counter: 0.0,
            current: window.start,
            ticker: Some(ticker),
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    /// Waits for the next tick and returns the advanced value.
    /// Pends forever once the ticker is stopped or the cap is reached.
    pub async fn tick(&mut self) -> f64 {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
        self.advance()
    }

    fn advance(&mut self) -> f64 {
        self.counter += self.settings.step_percent;
        let ceiling = self.window.ceiling(self.settings.cap_fraction);
        let next = self.window.start + self.window.span() * self.counter / 100.0;
        if next >= ceiling {
            self.current = ceiling;
            self.ticker = None;
        } else {
            self.current = next.max(self.current);
        }
        self.current
    }

    /// Real completion: stops the ticker and jumps to the window end.
    pub fn stop(&mut self) -> f64 {
        self.ticker = None;
        self.current = self.window.end;
        self.current
    }
}
