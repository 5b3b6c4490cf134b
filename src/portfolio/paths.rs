use super::PortfolioError;
use std::path::{Component, Path, PathBuf};

fn is_plain_segment(name: &str) -> bool {
    !name.is_empty() && !name.contains("..") && !name.contains('/') && !name.contains('\\')
}

/// Accepts a caller-supplied item folder identifier, trimmed.
pub fn ensure_folder_name(name: &str) -> Result<&str, PortfolioError> {
    let name = name.trim();
    if is_plain_segment(name) {
        Ok(name)
    } else {
        Err(PortfolioError::InvalidFolderName)
    }
}

pub fn ensure_file_name(name: &str) -> Result<&str, PortfolioError> {
    let name = name.trim();
    if is_plain_segment(name) {
        Ok(name)
    } else {
        Err(PortfolioError::InvalidFileName)
    }
}

/// Absolute form of `path` with `.` and `..` folded away. Purely lexical: the
/// path does not have to exist.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Confirms that files about to be moved into the uploads tree really come
/// from the temp staging directory.
#[derive(Debug, Clone)]
pub struct StagingGuard {
    root: PathBuf,
}

impl StagingGuard {
    pub fn new(temp_directory: &Path) -> Self {
        Self {
            root: normalize(temp_directory),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_staged(&self, path: &Path) -> Result<PathBuf, PortfolioError> {
        let resolved = normalize(path);
        if resolved != self.root && resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            tracing::warn!("Rejected file outside staging directory: {:?}", path);
            Err(PortfolioError::InvalidUploadPath)
        }
    }
}
