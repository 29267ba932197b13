mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use starpay_core::Dashboard;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands never touch the API or the session
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        cmd => {
            let cfg = resolve_config(&cli.global)?;
            let dashboard_config = cfg.to_dashboard_config()?;
            let dashboard = Dashboard::new(dashboard_config)?;

            if dashboard.hydrate()? {
                tracing::debug!("restored persisted session");
            }

            tracing::debug!(command = ?cmd, base_url = %cfg.base_url, "dispatching command");
            commands::dispatch(cmd, &dashboard, &cli.global)
                .await
                .map_err(|e| e.with_endpoint(&cfg.base_url, cfg.timeout_ms))
        }
    }
}

/// Config file and environment, then command-line overrides on top.
fn resolve_config(global: &GlobalOpts) -> Result<starpay_config::Config, CliError> {
    let mut cfg = starpay_config::load_config()?;
    if let Some(ref url) = global.base_url {
        cfg.base_url.clone_from(url);
    }
    if let Some(ms) = global.timeout_ms {
        cfg.timeout_ms = ms;
    }
    Ok(cfg)
}
