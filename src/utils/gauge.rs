use eyre::{Context, Result};
use indicatif::ProgressStyle;
use tokio::sync::watch;
use tracing::info_span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::{
    constants::GAUGE_MAX,
    measurement::{MeasurementPhase, MeasurementState},
    report::PhaseKind,
    utils::format::format_result,
};

fn gauge_style(phase: MeasurementPhase) -> Result<ProgressStyle> {
    let color = match phase {
        MeasurementPhase::Download => "cyan/blue",
        MeasurementPhase::Upload => "magenta/blue",
        _ => "green/blue",
    };

    Ok(ProgressStyle::default_bar()
        .template(&format!("{{bar:40.{color}}} {{pos:>3}}/{{len}} {{msg}}"))
        .context("Invalid gauge template")?
        .progress_chars("##-"))
}

/// Text beside the gauge: the phase status, plus the phase's value once known.
pub fn gauge_message(state: &MeasurementState) -> String {
    let status = state.phase.status_text();
    let kind = match state.phase {
        MeasurementPhase::Ping => PhaseKind::Ping,
        MeasurementPhase::Download => PhaseKind::Download,
        MeasurementPhase::Upload => PhaseKind::Upload,
        MeasurementPhase::Idle | MeasurementPhase::Complete => return status.to_string(),
    };

    let result = state.report.get(kind);
    if result.value() > 0.0 {
        format!("{status} {}", format_result(result))
    } else {
        status.to_string()
    }
}

/// Draws the live gauge until the sequencer publishing `rx` is dropped.
pub async fn render_gauge(mut rx: watch::Receiver<MeasurementState>) -> Result<()> {
    let mut styled_for = rx.borrow().phase;

    let span = info_span!("gauge");
    span.pb_set_style(&gauge_style(styled_for)?);
    span.pb_set_length(GAUGE_MAX as u64);
    span.pb_start();

    loop {
        {
            let state = rx.borrow_and_update();
            if state.phase != styled_for {
                span.pb_set_style(&gauge_style(state.phase)?);
                styled_for = state.phase;
            }
            span.pb_set_position(state.progress.round() as u64);
            span.pb_set_message(&gauge_message(&state));
        }

        if rx.changed().await.is_err() {
            break;
        }
    }

    Ok(())
}
