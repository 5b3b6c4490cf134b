// Portfolio module - before/after media items stored per category on disk
mod error;
mod handlers;
mod maintenance;
mod paths;
mod serve;
mod staging;
mod store;
mod types;
pub mod validation;

// Re-export public items
pub use error::PortfolioError;
pub use handlers::{
    count_handler, create_item_handler, delete_item_handler, delete_item_variant_handler,
    edit_item_handler, file_handler, list_all_handler, list_category_handler,
};
pub use maintenance::{RepairOptions, RepairReport};
pub use paths::{StagingGuard, ensure_file_name, ensure_folder_name};
pub use types::*;

use crate::StorageConfig;
use std::sync::Arc;

/// Marker file present in an item folder while its files are still being moved in.
pub const PENDING_MARKER: &str = ".pending";

pub type SharedPortfolioStore = Arc<PortfolioStore>;

pub struct PortfolioStore {
    pub(crate) config: StorageConfig,
    pub(crate) guard: StagingGuard,
}

impl PortfolioStore {
    pub fn new(config: StorageConfig) -> Self {
        let guard = StagingGuard::new(&config.temp_directory);
        Self { config, guard }
    }

    pub fn get_config(&self) -> &StorageConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests;
