use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, warn};

use super::{
    MeasurementPhase, MeasurementState,
    progress::ProgressTicker,
    rate::{gauge_position, latency_ms, rate_from_outcome},
    transfer::{Transfer, TransferPlan, TransferSpec},
};
use crate::report::{MeasurementReport, PhaseKind, PhaseResult, SequencerError};

/// Runs ping, download and upload in order and publishes every state change.
///
/// A failed phase records 0 and the run moves on; every run ends in
/// [`MeasurementPhase::Complete`]. Only one run may be active at a time.
pub struct Sequencer<T> {
    transfer: T,
    plan: TransferPlan,
    state: Arc<watch::Sender<MeasurementState>>,
    running: AtomicBool,
}

impl<T: Transfer> Sequencer<T> {
    pub fn new(transfer: T, plan: TransferPlan) -> Self {
        let (state, _) = watch::channel(MeasurementState::default());
        Self {
            transfer,
            plan,
            state: Arc::new(state),
            running: AtomicBool::new(false),
        }
    }

    /// Receives the current state and every later change.
    pub fn subscribe(&self) -> watch::Receiver<MeasurementState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> MeasurementState {
        self.state.borrow().clone()
    }

    pub fn plan(&self) -> &TransferPlan {
        &self.plan
    }

    /// Runs one full measurement and returns the final report.
    ///
    /// Returns [`SequencerError::Busy`] without touching the state if a run is
    /// already in progress.
    pub async fn start(&self) -> Result<MeasurementReport, SequencerError> {
        let _guard = RunGuard::acquire(&self.running, &self.state)?;

        self.state.send_modify(|s| {
            s.phase = MeasurementPhase::Ping;
            s.report = MeasurementReport::default();
            s.progress = 0.0;
        });
        info!("Starting measurement");

        let ping = match self.transfer.run(&self.plan.ping).await {
            Ok(elapsed) => latency_ms(elapsed),
            Err(e) => {
                warn!("Ping failed: {e}");
                0.0
            }
        };
        self.state.send_modify(|s| {
            s.report.record(PhaseResult::new(PhaseKind::Ping, ping));
        });
        info!("Ping: {ping} ms");

        self.enter(MeasurementPhase::Download);
        let download = self.run_timed_phase(&self.plan.download).await;
        info!("Download: {download} Mbps");

        self.enter(MeasurementPhase::Upload);
        let upload = self.run_timed_phase(&self.plan.upload).await;
        info!("Upload: {upload} Mbps");

        self.state.send_modify(|s| {
            s.phase = MeasurementPhase::Complete;
            s.progress = 0.0;
            s.report.completed_at = Some(Utc::now());
        });
        info!("Measurement complete");

        Ok(self.state.borrow().report.clone())
    }

    fn enter(&self, phase: MeasurementPhase) {
        self.state.send_modify(|s| {
            s.phase = phase;
            s.progress = 0.0;
        });
    }

    /// Runs a transfer with the progress ticker alongside. The ticker is joined
    /// before the final rate is published, so it cannot overwrite it.
    async fn run_timed_phase(&self, spec: &TransferSpec) -> f64 {
        let ticker = ProgressTicker::spawn(Arc::clone(&self.state));
        let outcome = self.transfer.run(spec).await;
        ticker.stop().await;

        if let Err(e) = &outcome {
            warn!("{} failed: {e}", spec.kind);
        }
        let rate = rate_from_outcome(spec.size_bits, &outcome);

        self.state.send_modify(|s| {
            s.report.record(PhaseResult::new(spec.kind, rate));
            s.progress = gauge_position(rate);
        });
        rate
    }
}

/// Marks a run as active. Released on drop; a run dropped before completion
/// leaves the state idle.
struct RunGuard<'a> {
    running: &'a AtomicBool,
    state: &'a watch::Sender<MeasurementState>,
}

impl<'a> RunGuard<'a> {
    fn acquire(
        running: &'a AtomicBool,
        state: &'a watch::Sender<MeasurementState>,
    ) -> Result<Self, SequencerError> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SequencerError::Busy)?;
        Ok(Self { running, state })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.send_if_modified(|s| {
            if s.phase.is_running() {
                s.phase = MeasurementPhase::Idle;
                s.progress = 0.0;
                true
            } else {
                false
            }
        });
        self.running.store(false, Ordering::Release);
    }
}
