use std::path::Path;

use thiserror::Error;

use crate::report::MeasurementReport;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub async fn export_report_json(
    report: &MeasurementReport,
    filename: &Path,
) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(filename, json).await?;
    Ok(())
}
