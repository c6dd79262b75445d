use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Prefix under which stored photos are referenced.
pub const PUBLIC_PREFIX: &str = "uploads";

const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Stores INC photos as files under one upload directory.
#[derive(Debug, Clone)]
pub struct PhotoStorage {
    root: PathBuf,
}

impl PhotoStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_allowed(filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                ALLOWED_EXTENSIONS
                    .iter()
                    .any(|allowed| ext.eq_ignore_ascii_case(allowed))
            })
            .unwrap_or(false)
    }

    /// Writes `bytes` under a collision-free name and returns the public
    /// path, or `None` when the extension is not an accepted image type.
    pub async fn store(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<Option<String>, ServiceError> {
        if !Self::is_allowed(original_name) {
            debug!(filename = %original_name, "Ignoring upload with unsupported extension");
            return Ok(None);
        }

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            ServiceError::StorageError(format!("cannot create upload directory: {}", e))
        })?;

        let name = format!("{}_{}", Uuid::new_v4().simple(), sanitize_filename(original_name));
        tokio::fs::write(self.root.join(&name), bytes)
            .await
            .map_err(|e| ServiceError::StorageError(format!("cannot store photo: {}", e)))?;

        Ok(Some(format!("{}/{}", PUBLIC_PREFIX, name)))
    }

    /// Deletes the file behind a stored path. Returns whether a file was
    /// removed. Paths that do not name a plain file inside the upload
    /// directory are left alone.
    pub async fn remove(&self, stored_path: &str) -> Result<bool, ServiceError> {
        let Some(file) = self.resolve(stored_path) else {
            warn!(path = %stored_path, "Refusing to delete photo outside upload directory");
            return Ok(false);
        };

        match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ServiceError::StorageError(format!(
                "cannot delete photo: {}",
                e
            ))),
        }
    }

    fn resolve(&self, stored_path: &str) -> Option<PathBuf> {
        let relative = stored_path
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(stored_path);
        let name = Path::new(relative).file_name()?.to_str()?;
        if name != relative || name.starts_with('.') {
            return None;
        }
        Some(self.root.join(name))
    }
}

/// Keeps only the final path component, with anything but ASCII
/// alphanumerics, `.`, `-` and `_` replaced by `_`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}
