use crate::Config;
use crate::portfolio::PortfolioStore;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create uploads directory: {0}")]
    UploadsDirectoryCreationFailed(#[source] std::io::Error),

    #[error("Failed to create temp upload directory: {0}")]
    TempDirectoryCreationFailed(#[source] std::io::Error),

    #[error("Failed to create records directory: {0}")]
    RecordsDirectoryCreationFailed(#[source] std::io::Error),

    #[error("No API key configured; privileged routes will refuse every request")]
    ApiKeyMissing,

    #[error("{0} unfinished portfolio items found; run `repair` to remove them")]
    PendingItems(usize),
}

impl StartupCheckError {
    /// Whether the server cannot do its job without this being fixed.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            StartupCheckError::UploadsDirectoryCreationFailed(_)
                | StartupCheckError::TempDirectoryCreationFailed(_)
                | StartupCheckError::RecordsDirectoryCreationFailed(_)
        )
    }
}

async fn ensure_directory(label: &str, dir: &Path) -> Result<(), std::io::Error> {
    if dir.exists() {
        info!("{} directory exists: {:?}", label, dir);
        return Ok(());
    }
    info!("{} directory does not exist, creating: {:?}", label, dir);
    tokio::fs::create_dir_all(dir).await.inspect_err(|e| {
        error!("Failed to create {} directory {:?}: {}", label, dir, e);
    })
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    if let Err(e) = ensure_directory("Uploads", &config.storage.uploads_directory).await {
        errors.push(StartupCheckError::UploadsDirectoryCreationFailed(e));
    }
    if let Err(e) = ensure_directory("Temp upload", &config.storage.temp_directory).await {
        errors.push(StartupCheckError::TempDirectoryCreationFailed(e));
    }

    if let Some(parent) = config
        .records
        .database
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        && let Err(e) = ensure_directory("Records", parent).await
    {
        errors.push(StartupCheckError::RecordsDirectoryCreationFailed(e));
    }

    if config
        .app
        .api_key
        .as_deref()
        .is_none_or(|key| key.trim().is_empty())
    {
        warn!("API key is not set; uploads, edits and deletes will be refused");
        errors.push(StartupCheckError::ApiKeyMissing);
    }

    let pending = PortfolioStore::new(config.storage.clone()).find_pending_items();
    if !pending.is_empty() {
        for item in &pending {
            warn!("Unfinished portfolio item: {}", item);
        }
        errors.push(StartupCheckError::PendingItems(pending.len()));
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
