//! Per-batch routing: download, convert, classify, upload, clean up.

use crate::config::TransformConfig;
use crate::error::Result;
use crate::handler::SourceItem;
use crate::services::convert;
use crate::services::storage::ObjectStorage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Filename prefixes that route a converted file to a destination subpath.
const CATEGORY_PREFIXES: [&str; 3] = ["Hubbox_Sensordata", "Towerbox_Sensordata", "SCADA_Data"];

pub struct BatchRouter {
    storage: Arc<dyn ObjectStorage>,
    config: TransformConfig,
}

impl BatchRouter {
    pub fn new(storage: Arc<dyn ObjectStorage>, config: TransformConfig) -> Self {
        Self { storage, config }
    }

    /// Process one batch of object keys in input order.
    ///
    /// A key ending in `/` is a directory marker: the matching scratch
    /// directory is created if absent and nothing else happens. Any other
    /// key is downloaded, converted, routed and removed from scratch
    /// storage. The first error aborts the batch; already-uploaded items
    /// stand.
    pub async fn process(&self, items: &[SourceItem]) -> Result<String> {
        for item in items {
            let local_path = scratch_path(&self.config.scratch_dir, &item.key);

            if item.key.ends_with('/') {
                if !local_path.exists() {
                    tokio::fs::create_dir_all(&local_path).await?;
                    info!("Created scratch directory {}", local_path.display());
                }
                continue;
            }

            if let Some(parent) = local_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            info!("Downloading key {} to {}", item.key, local_path.display());
            self.storage
                .download(&self.config.raw_bucket, &item.key, &local_path)
                .await?;

            let converted = convert::convert(&local_path)?;

            let file_name = local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            match classify(&file_name) {
                Some(category) => {
                    let dest_key = format!("{}/{}-converted.csv", category, item.key);
                    info!("Uploading {} as {}", converted.display(), dest_key);
                    self.storage
                        .upload(&converted, &self.config.processed_bucket, &dest_key)
                        .await?;
                }
                None => {
                    warn!("No category matches '{}', skipping upload", file_name);
                }
            }

            tokio::fs::remove_file(&local_path).await?;
            if !self.config.keep_converted {
                tokio::fs::remove_file(&converted).await?;
            }
        }

        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        Ok(format!("Processed items: {:?}", keys))
    }
}

/// Keys are bucket-relative: leading separators are stripped before
/// joining so an absolute-looking key cannot resolve outside the scratch
/// root.
pub fn scratch_path(root: &Path, key: &str) -> PathBuf {
    root.join(key.trim_start_matches('/'))
}

/// Best-match category for a file name: the longest matching prefix wins,
/// so overlapping prefixes can never cause more than one upload.
pub fn classify(file_name: &str) -> Option<&'static str> {
    CATEGORY_PREFIXES
        .iter()
        .filter(|prefix| file_name.starts_with(*prefix))
        .max_by_key(|prefix| prefix.len())
        .copied()
}
