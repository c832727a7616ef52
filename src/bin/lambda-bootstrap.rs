use anyhow::{anyhow, Result};
use dmhandler::app;
use lambda_runtime::{run, service_fn};
use tracing::error;

/// Run an AWS Lambda function that listens to S3 object-creation
/// notifications and logs the bucket and key of each created object.
#[tokio::main]
async fn main() -> Result<()> {
    // Configuration errors are logged at the default level.
    let init_result = app::init();
    tracing_subscriber::fmt()
        .with_max_level(app::log_level())
        .with_target(false)
        .without_time()
        .init();
    if let Err(e) = init_result {
        error!("Failed to initialize from the environment: {:#}", e);
        return Err(e);
    }

    run(service_fn(app::function_handler))
        .await
        .map_err(|e| anyhow!("{:?}", e))
}
