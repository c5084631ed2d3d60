use clap::Parser;
use std::process::ExitCode;
use vocab_flashcards::cli::{self, Cli};
use vocab_flashcards::{AppError, Config, logger};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logger::init(&config.log) {
        eprintln!("Cannot open log file: {}", e);
    }

    match cli::run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Session(e)) if e.is_informational() => {
            println!("{}", e);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
