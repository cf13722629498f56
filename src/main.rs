//! Cartwheel CLI entry point.
//!
//! Parses command-line arguments, installs logging, and executes the
//! selected command. Errors reaching this level are rendered through
//! [`cartwheel::core::user_friendly_error`] with colored output and
//! actionable suggestions.

use anyhow::Result;
use cartwheel::cli::Cli;
use cartwheel::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cartwheel::init_logging(cli.log_directive());

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(error) => {
            let context = user_friendly_error(error);
            context.display();
            std::process::exit(1);
        }
    }
}
