use dotenvy::dotenv;
use iiot_transformer::config::TransformConfig;
use iiot_transformer::handler::function_handler;
use iiot_transformer::services::router::BatchRouter;
use iiot_transformer::services::storage::S3Storage;
use lambda_runtime::{run, service_fn};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iiot_transformer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    info!("🚀 Starting IIoT transformer...");

    let config = TransformConfig::from_env()?;
    info!(
        "🪣 Buckets: raw={} processed={}",
        config.raw_bucket, config.processed_bucket
    );

    // One S3 client per container lifecycle, shared across invocations
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let s3_client = aws_sdk_s3::Client::new(&aws_config);
    let router = BatchRouter::new(Arc::new(S3Storage::new(s3_client)), config);

    run(service_fn(|event| function_handler(&router, event)))
        .await
        .map_err(|e| anyhow::anyhow!(e))
}
