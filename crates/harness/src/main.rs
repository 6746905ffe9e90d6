use std::process::ExitCode;

use clap::Parser;

use harness::cli::Cli;
use harness::runtime::{boot, run};

#[tokio::main]
async fn main() -> ExitCode {
    boot::init_logging();

    let cli = Cli::parse();
    let config = match boot::load_config(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let output = config.output;
    match run::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            run::report_error(&err, output);
            ExitCode::FAILURE
        }
    }
}
