use std::fmt;

use colored::*;
use serde::{Deserialize, Serialize};

/// The three measured phases, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Ping,
    Download,
    Upload,
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 3] = [PhaseKind::Ping, PhaseKind::Download, PhaseKind::Upload];

    pub fn unit(self) -> Unit {
        match self {
            PhaseKind::Ping => Unit::Ms,
            PhaseKind::Download | PhaseKind::Upload => Unit::Mbps,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PhaseKind::Ping => "Ping",
            PhaseKind::Download => "Download",
            PhaseKind::Upload => "Upload",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label().to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "ms")]
    Ms,
    #[serde(rename = "Mbps")]
    Mbps,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Ms => write!(f, "ms"),
            Unit::Mbps => write!(f, "Mbps"),
        }
    }
}

/// Final value of one phase. A failed or not-yet-run phase holds 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    kind: PhaseKind,
    value: f64,
    unit: Unit,
}

impl PhaseResult {
    /// Negative and non-finite values are stored as 0.
    pub fn new(kind: PhaseKind, value: f64) -> Self {
        let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
        Self {
            kind,
            value,
            unit: kind.unit(),
        }
    }

    pub fn zero(kind: PhaseKind) -> Self {
        Self::new(kind, 0.0)
    }

    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }
}

impl fmt::Display for PhaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self.unit {
            Unit::Ms => format!("{:.0}", self.value),
            Unit::Mbps => format!("{:.1}", self.value),
        };
        write!(
            f,
            "  {}: {} {}",
            self.kind.label().bright_green().bold(),
            value.cyan(),
            self.unit.to_string().white()
        )
    }
}
