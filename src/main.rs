mod api;
mod cli;
mod error;
mod logging;
mod model;
mod orchestrator;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = cli::Cli::parse();
    let headless = args.is_headless();

    let target = if headless {
        logging::LogTarget::Stderr
    } else {
        logging::LogTarget::File
    };
    let log_path = match logging::init(target, &args.log_level) {
        Ok(path) => path,
        Err(e) => {
            // The dashboard still works without logs.
            eprintln!("logging disabled: {e}");
            None
        }
    };

    let res = cli::run(args, log_path).await;
    if res.is_ok() && headless {
        // Explicitly exit with code 0 on success for non-TUI modes
        std::process::exit(0);
    }
    res
}
