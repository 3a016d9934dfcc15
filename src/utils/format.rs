use humansize::{BINARY, ToF64, Unsigned, format_size};

use crate::report::{PhaseResult, Unit};

pub fn format_bytes(bytes: impl ToF64 + Unsigned) -> String {
    format_size(bytes, BINARY)
}

pub fn format_bandwidth(mbps: f64) -> String {
    if mbps >= 1000.0 {
        format!("{:.2} Gbps", mbps / 1000.0)
    } else {
        format!("{mbps:.1} Mbps")
    }
}

/// Value of a phase result as shown next to the gauge.
pub fn format_result(result: &PhaseResult) -> String {
    match result.unit() {
        Unit::Ms => format!("{:.0} ms", result.value()),
        Unit::Mbps => format_bandwidth(result.value()),
    }
}
