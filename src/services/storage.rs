use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::fs;
use uuid::Uuid;

use crate::error::AppError;

/// Filesystem store for uploaded avatars. Files land under the configured
/// root with uuid names and are served back at `/avatars/<name>`.
#[derive(Clone)]
pub struct StorageService {
    root: Arc<PathBuf>,
}

impl StorageService {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_structure(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root()).await?;
        Ok(())
    }

    /// Persist an avatar and return its public path.
    pub async fn save_avatar(&self, extension: &str, data: &[u8]) -> Result<String, AppError> {
        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        fs::write(self.root().join(&file_name), data).await?;
        Ok(format!("/avatars/{file_name}"))
    }
}
