use std::path::PathBuf;

use colored::*;
use eyre::{Context, Result};
use tracing::info;
use url::Url;

use crate::{
    constants::{DOWNLOAD_SIZE_BYTES, UPLOAD_SIZE_BYTES},
    export::export_report_json,
    measurement::{HttpTransfer, Sequencer, TransferPlan},
    utils::{format::format_bytes, gauge::render_gauge},
};

#[derive(Debug)]
pub struct ClientConfig {
    pub server_url: String,
    pub json: bool,
    pub export_file: Option<PathBuf>,
}

pub async fn run_client(config: ClientConfig) -> Result<()> {
    let base = Url::parse(&config.server_url)
        .wrap_err_with(|| format!("Invalid server URL: {}", config.server_url))?;
    let plan = TransferPlan::for_server(&base)?;
    let sequencer = Sequencer::new(HttpTransfer::new()?, plan);

    if !config.json {
        println!(
            "Testing against {} ({} down, {} up)",
            base.as_str().cyan(),
            format_bytes(DOWNLOAD_SIZE_BYTES).yellow(),
            format_bytes(UPLOAD_SIZE_BYTES).yellow()
        );
    }

    let renderer = (!config.json).then(|| tokio::spawn(render_gauge(sequencer.subscribe())));

    let report = sequencer.start().await?;

    // Closing the state channel ends the renderer
    drop(sequencer);
    if let Some(renderer) = renderer {
        renderer.await.context("Gauge renderer panicked")??;
    }

    if config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("\n{report}");
    }

    if let Some(path) = &config.export_file {
        export_report_json(&report, path).await?;
        info!("Report exported to {}", path.display());
    }

    Ok(())
}
