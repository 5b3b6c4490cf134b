use super::{MediaRole, PortfolioError, PortfolioStore, StagedFile, StagedUpload};
use axum::extract::Multipart;
use axum::extract::multipart::Field;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const NEW_CATEGORY_FIELD: &str = "newCategory";

impl PortfolioStore {
    /// Streams the file parts of a multipart body into the temp directory. On
    /// failure nothing staged by this call is left behind.
    pub async fn stage(&self, mut multipart: Multipart) -> Result<StagedUpload, PortfolioError> {
        tokio::fs::create_dir_all(&self.config.temp_directory).await?;

        let mut upload = StagedUpload::default();
        match self.stage_fields(&mut multipart, &mut upload).await {
            Ok(()) => Ok(upload),
            Err(e) => {
                self.discard(&upload).await;
                Err(e)
            }
        }
    }

    async fn stage_fields(
        &self,
        multipart: &mut Multipart,
        upload: &mut StagedUpload,
    ) -> Result<(), PortfolioError> {
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();

            if let Some(role) = MediaRole::from_field(&name) {
                if upload.get(role).is_some() {
                    return Err(PortfolioError::DuplicateField(name));
                }
                let staged = self.stage_file(field).await?;
                *upload.slot_mut(role) = Some(staged);
            } else if name == NEW_CATEGORY_FIELD {
                upload.new_category = Some(field.text().await?);
            } else {
                debug!("Ignoring multipart field '{}'", name);
            }
        }
        Ok(())
    }

    async fn stage_file(&self, mut field: Field<'_>) -> Result<StagedFile, PortfolioError> {
        let original_name = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let (path, mut file) = self.create_temp_file(&original_name).await?;
        let mut staged = StagedFile {
            original_name,
            content_type,
            size: None,
            path,
        };

        let mut size: u64 = 0;
        let written = async {
            while let Some(chunk) = field.chunk().await? {
                file.write_all(&chunk).await?;
                size += chunk.len() as u64;
            }
            file.flush().await?;
            Ok::<(), PortfolioError>(())
        }
        .await;

        if let Err(e) = written {
            drop(file);
            remove_quietly(&staged.path).await;
            return Err(e);
        }

        staged.size = Some(size);
        debug!(
            "Staged '{}' ({} bytes) at {:?}",
            staged.original_name, size, staged.path
        );
        Ok(staged)
    }

    /// Creates `{epoch-millis}-{name}` in the temp directory, bumping the
    /// timestamp when two parts of one request share a name.
    async fn create_temp_file(
        &self,
        original_name: &str,
    ) -> Result<(PathBuf, tokio::fs::File), PortfolioError> {
        let mut stamp = chrono::Utc::now().timestamp_millis();
        loop {
            let path = self
                .config
                .temp_directory
                .join(format!("{}-{}", stamp, original_name));
            self.guard.ensure_staged(&path)?;

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => stamp += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Best-effort removal of whatever is still sitting in the temp directory.
    /// Paths outside it are left alone.
    pub async fn discard(&self, upload: &StagedUpload) {
        for (_, file) in upload.files() {
            if self.guard.ensure_staged(&file.path).is_ok() {
                remove_quietly(&file.path).await;
            }
        }
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed temp file {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove temp file {:?}: {}", path, e),
    }
}
