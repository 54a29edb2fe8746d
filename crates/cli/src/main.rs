mod commands;
mod config;
mod error;
mod output;

use std::process::ExitCode;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "persfin", about = "Personal finance from the terminal", disable_version_flag = true)]
struct Cli {
    #[command(flatten)]
    config: config::Overrides,
    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = match config::load(&cli.config) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "persfin={level},persfin_cli={level},client={level},engine={level}",
            level = settings.level
        ))
        .with_writer(std::io::stderr)
        .init();

    match commands::run(cli.command, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("command failed: {err:?}");
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}
