use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use std::net::{IpAddr, SocketAddr};

use speedgauge::{
    cli::{Cli, Commands},
    client::{ClientConfig, run_client},
    server::{ServerConfig, run_server},
    utils::logging::init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { url, json, export } => {
            let config = ClientConfig {
                server_url: url,
                json,
                export_file: export,
            };
            run_client(config).await?;
        }

        Commands::Serve {
            port,
            bind,
            no_cors,
        } => {
            println!("{}", "Starting speed server...".blue().bold());
            let ip: IpAddr = bind
                .parse()
                .wrap_err_with(|| format!("Invalid bind address: {bind}"))?;
            let config = ServerConfig {
                bind_addr: SocketAddr::new(ip, port),
                enable_cors: !no_cors,
            };
            run_server(config).await?;
        }
    }

    Ok(())
}
