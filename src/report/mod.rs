use std::fmt;

use chrono::{DateTime, Utc};
use colored::*;
use serde::{Deserialize, Serialize};

pub use errors::*;
pub use result::*;

mod errors;
mod result;

/// Results of one measurement run, one slot per phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementReport {
    pub ping: PhaseResult,
    pub download: PhaseResult,
    pub upload: PhaseResult,
    /// Set once the run reaches completion
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for MeasurementReport {
    fn default() -> Self {
        Self {
            ping: PhaseResult::zero(PhaseKind::Ping),
            download: PhaseResult::zero(PhaseKind::Download),
            upload: PhaseResult::zero(PhaseKind::Upload),
            completed_at: None,
        }
    }
}

impl MeasurementReport {
    pub fn get(&self, kind: PhaseKind) -> &PhaseResult {
        match kind {
            PhaseKind::Ping => &self.ping,
            PhaseKind::Download => &self.download,
            PhaseKind::Upload => &self.upload,
        }
    }

    /// Overwrites the slot matching the result's kind.
    pub fn record(&mut self, result: PhaseResult) {
        match result.kind() {
            PhaseKind::Ping => self.ping = result,
            PhaseKind::Download => self.download = result,
            PhaseKind::Upload => self.upload = result,
        }
    }

    /// Ping, download and upload values in phase order.
    pub fn values(&self) -> [f64; 3] {
        PhaseKind::ALL.map(|kind| self.get(kind).value())
    }

    pub fn is_zeroed(&self) -> bool {
        self.values().iter().all(|v| *v == 0.0)
    }
}

impl fmt::Display for MeasurementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=== Measurement Results ===".bold().blue())?;
        for kind in PhaseKind::ALL {
            writeln!(f, "{}", self.get(kind))?;
        }
        if let Some(completed_at) = self.completed_at {
            writeln!(
                f,
                "  {}: {}",
                "Timestamp".bright_green().bold(),
                completed_at
                    .format("%Y-%m-%d %H:%M:%S UTC")
                    .to_string()
                    .blue()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_report_is_zeroed() {
        let report = MeasurementReport::default();
        assert!(report.is_zeroed());
        assert_eq!(report.completed_at, None);
        for kind in PhaseKind::ALL {
            assert_eq!(report.get(kind).kind(), kind);
        }
    }

    #[test]
    fn test_record_overwrites_matching_slot() {
        let mut report = MeasurementReport::default();
        report.record(PhaseResult::new(PhaseKind::Download, 83.9));
        report.record(PhaseResult::new(PhaseKind::Ping, 12.0));
        report.record(PhaseResult::new(PhaseKind::Download, 80.1));

        assert_eq!(report.values(), [12.0, 80.1, 0.0]);
    }
}
