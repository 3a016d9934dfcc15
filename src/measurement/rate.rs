use std::time::Duration;

use crate::{constants::GAUGE_MAX, report::TransferError};

/// Returns throughput in megabits per second, rounded to one decimal place.
///
/// A zero, negative or non-finite duration yields 0 rather than infinity or NaN,
/// the same value a failed transfer records.
pub fn compute_rate_mbps(size_bits: u64, duration_secs: f64) -> f64 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return 0.0;
    }

    round_to_tenth(size_bits as f64 / duration_secs / 1_000_000.0)
}

/// Rate for a finished transfer; 0 when the transfer failed.
pub fn rate_from_outcome(size_bits: u64, outcome: &Result<Duration, TransferError>) -> f64 {
    match outcome {
        Ok(duration) => compute_rate_mbps(size_bits, duration.as_secs_f64()),
        Err(_) => 0.0,
    }
}

/// Round-trip time in whole milliseconds.
pub fn latency_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round()
}

/// Position of the live gauge for a final rate. Display only.
pub fn gauge_position(rate_mbps: f64) -> f64 {
    if rate_mbps.is_finite() {
        rate_mbps.clamp(0.0, GAUGE_MAX)
    } else {
        0.0
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
