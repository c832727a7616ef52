use anyhow::{Context, Result};
use dmhandler::app;
use std::env::args;
use tokio::fs::read_to_string;
use tokio::io::{stdin, AsyncReadExt};
use tracing::error;

/// Run the handler once, outside of Lambda, against a notification
/// payload read from the given file or from standard input. The
/// summary is printed to standard output.
#[tokio::main]
async fn main() -> Result<()> {
    // Configuration errors are logged at the default level.
    let init_result = app::init();
    tracing_subscriber::fmt()
        .with_max_level(app::log_level())
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
    if let Err(e) = init_result {
        error!("Failed to initialize from the environment: {:#}", e);
        return Err(e);
    }

    let body = if let Some(path) = args().nth(1) {
        read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read event payload from {:?}", path))?
    } else {
        let mut body = String::new();
        stdin()
            .read_to_string(&mut body)
            .await
            .context("Failed to read event payload from stdin")?;
        body
    };

    let summary = app::current().handle_raw(&body);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
