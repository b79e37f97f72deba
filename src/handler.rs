//! Invocation boundary: event shapes and the Lambda handler.

use crate::services::router::BatchRouter;
use lambda_runtime::{Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Batch payload delivered by the Step Functions DistributedMap.
#[derive(Debug, Deserialize)]
pub struct TransformEvent {
    #[serde(rename = "Items", default)]
    pub items: Vec<SourceItem>,
}

/// One raw-bucket object reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    #[serde(rename = "Key")]
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct TransformResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

/// Errors are logged once here and re-raised so the platform reports a
/// failed invocation.
pub async fn function_handler(
    router: &BatchRouter,
    event: LambdaEvent<TransformEvent>,
) -> Result<TransformResponse, Error> {
    let items = event.payload.items;
    info!("Received batch of {} items", items.len());

    match router.process(&items).await {
        Ok(summary) => Ok(TransformResponse {
            status_code: 200,
            body: serde_json::to_string(&format!("Processed event: {summary}"))?,
        }),
        Err(e) => {
            error!("Invocation failed: {e}");
            Err(e.into())
        }
    }
}
