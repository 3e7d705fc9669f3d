//! dtmetrics CLI entry point.

use dtmetrics::cli::{self, Cli};
use dtmetrics::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse_args();

    // Execute the command
    cli::execute(cli).await
}
