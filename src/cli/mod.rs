pub mod commands;

use clap::Parser;
pub use commands::*;

#[derive(Parser, Debug)]
#[command(name = "speedgauge")]
#[command(about = "Measures HTTP latency, download and upload speed against a speed server")]
#[command(
    long_about = "Runs a single-connection speed test in three phases:\n• Ping: round trip of a minimal POST\n• Download: fixed 10 MiB payload\n• Upload: fixed 2 MiB random payload\n\nThe `serve` command runs a compatible speed server."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}
