use std::fmt;

use serde::{Deserialize, Serialize};

use crate::report::{MeasurementReport, PhaseKind};

pub mod progress;
pub mod rate;
pub mod sequencer;
pub mod transfer;

pub use progress::{ProgressEstimate, ProgressTicker};
pub use rate::{compute_rate_mbps, gauge_position, latency_ms};
pub use sequencer::Sequencer;
pub use transfer::{ByteSource, HttpTransfer, Transfer, TransferPlan, TransferSpec};

/// Overall status of the sequencer. Runs strictly in declaration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementPhase {
    #[default]
    Idle,
    Ping,
    Download,
    Upload,
    Complete,
}

impl MeasurementPhase {
    pub fn is_running(self) -> bool {
        matches!(
            self,
            MeasurementPhase::Ping | MeasurementPhase::Download | MeasurementPhase::Upload
        )
    }

    pub fn status_text(self) -> &'static str {
        match self {
            MeasurementPhase::Idle => "Ready",
            MeasurementPhase::Ping => "Testing Latency...",
            MeasurementPhase::Download => "Downloading Target File...",
            MeasurementPhase::Upload => "Uploading Data...",
            MeasurementPhase::Complete => "Analysis Complete",
        }
    }
}

impl From<PhaseKind> for MeasurementPhase {
    fn from(kind: PhaseKind) -> Self {
        match kind {
            PhaseKind::Ping => MeasurementPhase::Ping,
            PhaseKind::Download => MeasurementPhase::Download,
            PhaseKind::Upload => MeasurementPhase::Upload,
        }
    }
}

impl fmt::Display for MeasurementPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeasurementPhase::Idle => "idle",
            MeasurementPhase::Ping => "ping",
            MeasurementPhase::Download => "download",
            MeasurementPhase::Upload => "upload",
            MeasurementPhase::Complete => "complete",
        };
        write!(f, "{name}")
    }
}

/// Everything a presentation layer observes: the phase, the results so far and
/// the live gauge sample in `[0, 100]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementState {
    pub phase: MeasurementPhase,
    pub report: MeasurementReport,
    pub progress: f64,
}
