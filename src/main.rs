mod cli;
mod commands;
mod config;
mod error;
mod output;
mod pipeline;
mod runner;
mod status;
mod workspace;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting glci - GitLab CI local runner");
    let succeeded = cli.execute().await?;

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
