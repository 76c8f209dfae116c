// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use clap::Parser;

mod cli;
mod config;
mod dispatcher;
mod live_processor;
mod logging;
mod output;
mod state;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = cli::Cli::parse();
    let verbose = cli.verbose;
    logging::init_logging(verbose);

    let config = match config::Config::from_cli(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fatal: {err}");
            return std::process::ExitCode::from(1);
        }
    };

    match dispatcher::run(config).await {
        Ok(code) => std::process::ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            tracing::error!(error = %err, "dispatcher exited with an error");
            std::process::ExitCode::from(1)
        }
    }
}
