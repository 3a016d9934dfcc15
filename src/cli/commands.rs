use std::path::PathBuf;

use clap::Subcommand;

use crate::constants::DEFAULT_HTTP_PORT;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one measurement against a speed server
    Run {
        /// Server base URL (e.g., http://localhost:8080)
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,

        /// Print the final report as JSON instead of the summary
        #[arg(long)]
        json: bool,

        /// Export the final report to a JSON file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Run the speed server
    Serve {
        /// Listen port
        #[arg(short, long, default_value_t = DEFAULT_HTTP_PORT)]
        port: u16,

        /// Bind to specific interface
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,

        /// Disable CORS headers
        #[arg(long)]
        no_cors: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::{CommandFactory, Parser};

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["speedgauge", "run"]);
        match cli.command {
            Commands::Run { url, json, export } => {
                assert_eq!(url, "http://localhost:8080");
                assert!(!json);
                assert!(export.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_serve_arguments() {
        let cli = Cli::parse_from(["speedgauge", "serve", "-p", "9000", "--no-cors"]);
        match cli.command {
            Commands::Serve {
                port,
                bind,
                no_cors,
            } => {
                assert_eq!(port, 9000);
                assert_eq!(bind, "0.0.0.0");
                assert!(no_cors);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
