//! Folder resolution for subscription placement.

use std::sync::Arc;
use tracing::info;

use crate::ratings_api::{ApiError, Folder, RatingsApi};

/// Resolves portfolio folder names to folders, creating them on demand.
pub struct FolderResolver {
    api: Arc<dyn RatingsApi>,
}

impl FolderResolver {
    pub fn new(api: Arc<dyn RatingsApi>) -> Self {
        Self { api }
    }

    /// Find a folder by name. Matching is case-insensitive and ignores
    /// surrounding whitespace; no folder is ever created.
    pub async fn resolve(&self, name: &str) -> Result<Option<Folder>, ApiError> {
        let wanted = name.trim().to_lowercase();
        let folders = self.api.list_folders().await?;
        Ok(folders
            .into_iter()
            .find(|f| f.name.trim().to_lowercase() == wanted))
    }

    /// Find a folder by name, creating it if absent.
    pub async fn resolve_or_create(&self, name: &str) -> Result<Folder, ApiError> {
        if let Some(folder) = self.resolve(name).await? {
            return Ok(folder);
        }
        let folder = self.api.create_folder(name.trim()).await?;
        info!(folder = %folder.name, guid = %folder.guid, "Created portfolio folder");
        Ok(folder)
    }
}
