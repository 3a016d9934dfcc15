//! Simulated progress for the live gauge.
//!
//! Neither transfer reports byte-level progress, so while a timed phase is in
//! flight the gauge follows a randomized ramp that decelerates into a ceiling.
//! It is an approximation that only signals activity; the real rate replaces it
//! once the phase finishes.

use std::sync::Arc;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

use super::MeasurementState;
use crate::constants::{PROGRESS_CEILING, PROGRESS_MAX_STEP, PROGRESS_TICK};

/// Non-decreasing estimate bounded by [`PROGRESS_CEILING`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressEstimate {
    value: f64,
}

impl ProgressEstimate {
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Applies one tick: a uniform step in `[0, PROGRESS_MAX_STEP)` while below the ceiling.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        if self.value < PROGRESS_CEILING {
            let step = rng.random_range(0.0..PROGRESS_MAX_STEP);
            self.value = (self.value + step).min(PROGRESS_CEILING);
        }
        self.value
    }
}

/// Background task feeding [`ProgressEstimate`] ticks into the shared state.
///
/// Bound to the lifetime of one phase: [`ProgressTicker::stop`] aborts and joins
/// the task, and dropping the ticker aborts it, so it never outlives the phase.
pub struct ProgressTicker {
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    pub fn spawn(state: Arc<watch::Sender<MeasurementState>>) -> Self {
        Self::spawn_with_rng(state, StdRng::from_os_rng())
    }

    pub fn spawn_with_rng<R>(state: Arc<watch::Sender<MeasurementState>>, mut rng: R) -> Self
    where
        R: Rng + Send + 'static,
    {
        let handle: JoinHandle<()> = tokio::spawn(async move {
            let mut ticker = interval(PROGRESS_TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            let mut estimate = ProgressEstimate::default();
            loop {
                ticker.tick().await;
                let previous = estimate.value();
                let value = estimate.advance(&mut rng);
                if value != previous {
                    state.send_modify(|s| s.progress = value);
                }
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Cancels the task and waits until it can no longer write.
    pub async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
