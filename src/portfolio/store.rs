use super::{
    Category, CreatedFiles, CreatedItem, DeleteOutcome, DeleteStrategy, EditedItem, FileLink,
    FileRef, FolderListing, MediaRole, PENDING_MARKER, PortfolioError, PortfolioStore,
    StagedUpload, UpdatedFiles, UploadCounts, ensure_folder_name, validation,
};
use super::maintenance::REPLACED_SUFFIX;
use futures::future::join_all;
use rand::Rng;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

/// One step of a multi-file move, decided before anything is touched.
#[derive(Debug)]
struct PlannedMove {
    role: MediaRole,
    src: PathBuf,
    dst: PathBuf,
    filename: String,
}

/// An existing role file set aside while its replacement is moved in.
#[derive(Debug)]
struct Stash {
    original: PathBuf,
    backup: PathBuf,
}

impl PortfolioStore {
    pub fn uploads_root(&self) -> &Path {
        &self.config.uploads_directory
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.config.uploads_directory.join(category.as_str())
    }

    pub fn item_dir(&self, category: Category, folder: &str) -> PathBuf {
        self.category_dir(category).join(folder)
    }

    pub fn file_url(&self, category: Category, folder: &str, filename: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.config.public_prefix.trim_end_matches('/'),
            category,
            folder,
            filename
        )
    }

    /// `{epoch-millis}_{8 base36 chars}`.
    pub fn generate_folder_name() -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut rng = rand::rng();
        let suffix: String = (0..8)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        format!("{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
    }

    fn ensure_staged_paths(&self, upload: &StagedUpload) -> Result<(), PortfolioError> {
        for (_, file) in upload.files() {
            self.guard.ensure_staged(&file.path)?;
        }
        Ok(())
    }

    /// Validates and stores a new before/after item. Staged files are consumed
    /// on success and removed on any failure.
    pub async fn create_item(
        &self,
        category: &str,
        upload: StagedUpload,
    ) -> Result<CreatedItem, PortfolioError> {
        let result = self.create_item_inner(category, &upload).await;
        if result.is_err() {
            self.discard(&upload).await;
        }
        result
    }

    async fn create_item_inner(
        &self,
        category: &str,
        upload: &StagedUpload,
    ) -> Result<CreatedItem, PortfolioError> {
        let category = Category::parse(category)
            .ok_or(PortfolioError::InvalidCategory("Invalid category name."))?;

        if upload.before.is_none() || upload.after.is_none() {
            return Err(PortfolioError::MissingRequiredFiles);
        }
        self.ensure_staged_paths(upload)?;
        let accepted = validation::validate_upload(upload, category, true)?;

        let category_dir = self.category_dir(category);
        fs::create_dir_all(&category_dir)
            .await
            .map_err(PortfolioError::StorageFailed)?;

        let folder = Self::generate_folder_name();
        let item_dir = category_dir.join(&folder);
        fs::create_dir(&item_dir)
            .await
            .map_err(PortfolioError::StorageFailed)?;

        let marker = item_dir.join(PENDING_MARKER);
        if let Err(e) = fs::write(&marker, b"").await {
            let _ = fs::remove_dir_all(&item_dir).await;
            return Err(PortfolioError::StorageFailed(e));
        }

        let plan: Vec<PlannedMove> = accepted
            .into_iter()
            .filter_map(|(role, file)| {
                let staged = upload.get(role)?;
                let filename = role.stored_name(&file.extension);
                Some(PlannedMove {
                    role,
                    src: staged.path.clone(),
                    dst: item_dir.join(&filename),
                    filename,
                })
            })
            .collect();

        let results = join_all(plan.iter().map(|step| move_file(&step.src, &step.dst))).await;
        let mut failure = results.into_iter().find_map(Result::err);
        if failure.is_none() {
            failure = fs::remove_file(&marker).await.err();
        }

        if let Some(e) = failure {
            error!(
                "Failed to move uploaded files into {}/{}: {}",
                category, folder, e
            );
            for step in &plan {
                let _ = fs::remove_file(&step.dst).await;
            }
            if let Err(cleanup) = fs::remove_dir_all(&item_dir).await {
                warn!("Could not remove partial item {:?}: {}", item_dir, cleanup);
            }
            return Err(PortfolioError::StorageFailed(e));
        }

        info!(
            "Stored portfolio item {}/{} ({} files)",
            category,
            folder,
            plan.len()
        );

        let link_for = |role: MediaRole| {
            plan.iter().find(|step| step.role == role).map(|step| FileLink {
                filename: step.filename.clone(),
                link: self.file_url(category, &folder, &step.filename),
            })
        };

        let (Some(after), Some(before)) = (link_for(MediaRole::After), link_for(MediaRole::Before))
        else {
            return Err(PortfolioError::MissingRequiredFiles);
        };
        let thumbnail = link_for(MediaRole::Thumbnail);

        Ok(CreatedItem {
            category,
            folder: folder.clone(),
            files: CreatedFiles {
                after,
                before,
                thumbnail,
            },
        })
    }

    /// Replaces any subset of an item's files and optionally moves the item to
    /// another category. Everything is validated before the first mutation.
    pub async fn edit_item(
        &self,
        category: &str,
        folder: &str,
        upload: StagedUpload,
    ) -> Result<EditedItem, PortfolioError> {
        let result = self.edit_item_inner(category, folder, &upload).await;
        if result.is_err() {
            self.discard(&upload).await;
        }
        result
    }

    async fn edit_item_inner(
        &self,
        category: &str,
        folder: &str,
        upload: &StagedUpload,
    ) -> Result<EditedItem, PortfolioError> {
        let source = Category::parse(category)
            .ok_or(PortfolioError::InvalidCategory("Invalid source category."))?;
        let folder = ensure_folder_name(folder)?;

        let source_dir = self.item_dir(source, folder);
        match fs::metadata(&source_dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(PortfolioError::NotAFolder),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PortfolioError::NotFound("Source folder not found."));
            }
            Err(e) => return Err(e.into()),
        }

        let destination = match upload
            .new_category
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            Some(name) => Category::parse(name)
                .ok_or(PortfolioError::InvalidCategory("Invalid destination category."))?,
            None => source,
        };

        self.ensure_staged_paths(upload)?;
        let accepted = validation::validate_upload(upload, destination, false)?;

        let dest_dir = self.item_dir(destination, folder);
        let moved = destination != source;
        if moved {
            if fs::try_exists(&dest_dir).await? {
                return Err(PortfolioError::FolderConflict(folder.to_string()));
            }
            fs::create_dir_all(self.category_dir(destination))
                .await
                .map_err(PortfolioError::StorageFailed)?;
            fs::rename(&source_dir, &dest_dir)
                .await
                .map_err(PortfolioError::StorageFailed)?;
            info!(
                "Moved portfolio item {} from {} to {}",
                folder, source, destination
            );
        }

        let plan: Vec<PlannedMove> = accepted
            .into_iter()
            .filter_map(|(role, file)| {
                let staged = upload.get(role)?;
                let filename = role.stored_name(&file.extension);
                Some(PlannedMove {
                    role,
                    src: staged.path.clone(),
                    dst: dest_dir.join(&filename),
                    filename,
                })
            })
            .collect();

        let mut stashes: Vec<Stash> = Vec::new();
        let mut placed: Vec<PathBuf> = Vec::new();
        let mut failure: Option<io::Error> = None;

        for step in &plan {
            match stash_role_files(&dest_dir, step.role).await {
                Ok(mut set_aside) => stashes.append(&mut set_aside),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
            if let Err(e) = move_file(&step.src, &step.dst).await {
                failure = Some(e);
                break;
            }
            placed.push(step.dst.clone());
        }

        if let Some(e) = failure {
            error!("Failed to update portfolio item {}: {}", folder, e);
            for path in &placed {
                let _ = fs::remove_file(path).await;
            }
            for stash in stashes.iter().rev() {
                if let Err(restore) = fs::rename(&stash.backup, &stash.original).await {
                    warn!("Could not restore {:?}: {}", stash.original, restore);
                }
            }
            if moved && let Err(back) = fs::rename(&dest_dir, &source_dir).await {
                warn!("Could not move {:?} back to {:?}: {}", dest_dir, source_dir, back);
            }
            return Err(PortfolioError::StorageFailed(e));
        }

        for stash in &stashes {
            if let Err(e) = fs::remove_file(&stash.backup).await {
                warn!("Could not remove replaced file {:?}: {}", stash.backup, e);
            }
        }

        let mut files = UpdatedFiles::default();
        for step in &plan {
            files.set(
                step.role,
                FileRef {
                    filename: step.filename.clone(),
                    url: self.file_url(destination, folder, &step.filename),
                },
            );
        }

        info!(
            "Updated portfolio item {}/{} ({} files replaced)",
            destination,
            folder,
            plan.len()
        );

        Ok(EditedItem {
            category: destination,
            folder: folder.to_string(),
            files,
        })
    }

    pub async fn list_category(
        &self,
        category: &str,
    ) -> Result<Vec<FolderListing>, PortfolioError> {
        let category =
            Category::parse(category).ok_or(PortfolioError::NotFound("Category not found"))?;
        let dir = self.category_dir(category);
        if !fs::try_exists(&dir).await? {
            return Err(PortfolioError::NotFound("Category not found"));
        }
        self.read_category(category).await
    }

    /// Listings for every known category that exists on disk.
    pub async fn list_all(&self) -> Result<BTreeMap<String, Vec<FolderListing>>, PortfolioError> {
        let mut uploads = BTreeMap::new();
        for category in Category::ALL {
            if fs::try_exists(self.category_dir(category)).await? {
                uploads.insert(category.to_string(), self.read_category(category).await?);
            }
        }
        Ok(uploads)
    }

    pub async fn count(&self) -> Result<UploadCounts, PortfolioError> {
        let mut counts_by_category = BTreeMap::new();
        let mut total_count = 0;

        for category in Category::ALL {
            let dir = self.category_dir(category);
            if !fs::try_exists(&dir).await? {
                continue;
            }
            let count = visible_item_folders(&dir).await?.len();
            counts_by_category.insert(category.to_string(), count);
            total_count += count;
        }

        Ok(UploadCounts {
            total_count,
            counts_by_category,
        })
    }

    async fn read_category(
        &self,
        category: Category,
    ) -> Result<Vec<FolderListing>, PortfolioError> {
        let dir = self.category_dir(category);
        let mut listings = Vec::new();

        for folder in visible_item_folders(&dir).await? {
            let mut names = Vec::new();
            let mut entries = fs::read_dir(dir.join(&folder)).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().to_string();
                if !name.starts_with('.') && entry.file_type().await?.is_file() {
                    names.push(name);
                }
            }
            names.sort();

            let has = |role: MediaRole| {
                names
                    .iter()
                    .any(|name| MediaRole::of_stored_file(name) == Some(role))
            };
            let complete = has(MediaRole::Before) && has(MediaRole::After);

            let files = names
                .iter()
                .map(|name| FileRef {
                    filename: name.clone(),
                    url: self.file_url(category, &folder, name),
                })
                .collect();

            listings.push(FolderListing {
                folder,
                files,
                complete,
            });
        }

        debug!("Listed {} items in {}", listings.len(), category);
        Ok(listings)
    }

    pub async fn delete_item(
        &self,
        category: &str,
        folder: &str,
        strategy: DeleteStrategy,
    ) -> Result<DeleteOutcome, PortfolioError> {
        let category = Category::parse(category)
            .ok_or(PortfolioError::InvalidCategory("Invalid category name."))?;
        let folder = ensure_folder_name(folder)?;
        let target = self.item_dir(category, folder);

        let meta = fs::metadata(&target).await.map_err(classify_delete_error)?;
        if !meta.is_dir() {
            return Err(PortfolioError::NotAFolder);
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&target).await.map_err(classify_delete_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(classify_delete_error)? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }

        let (files_deleted, failed_files) = match strategy {
            DeleteStrategy::Recursive => {
                fs::remove_dir_all(&target)
                    .await
                    .map_err(classify_delete_error)?;
                (names.len(), Vec::new())
            }
            DeleteStrategy::FileByFile => {
                let mut deleted = 0;
                let mut failed = Vec::new();
                for name in names {
                    match fs::remove_file(target.join(&name)).await {
                        Ok(()) => deleted += 1,
                        Err(e) => {
                            warn!("Failed to delete file {:?}: {}", target.join(&name), e);
                            failed.push(name);
                        }
                    }
                }

                if let Err(e) = fs::remove_dir(&target).await {
                    warn!("Failed to remove folder {:?}: {}", target, e);
                    return Err(PortfolioError::PartialDelete {
                        deleted_files: deleted,
                        failed_files: failed,
                    });
                }
                (deleted, failed)
            }
        };

        info!(
            "Successfully deleted portfolio item: {}/{} ({} files)",
            category, folder, files_deleted
        );

        Ok(DeleteOutcome {
            deleted_folder: folder.to_string(),
            deleted_category: category,
            files_deleted,
            failed_files,
        })
    }
}

/// Names of the item folders in a category directory, sorted. Hidden entries
/// and folders still carrying the pending marker are left out.
async fn visible_item_folders(category_dir: &Path) -> Result<Vec<String>, PortfolioError> {
    let mut folders = Vec::new();
    let mut entries = fs::read_dir(category_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || !entry.file_type().await?.is_dir() {
            continue;
        }
        if fs::try_exists(entry.path().join(PENDING_MARKER)).await? {
            debug!("Skipping pending item {:?}", entry.path());
            continue;
        }
        folders.push(name);
    }
    folders.sort();
    Ok(folders)
}

/// Renames `src` to `dst`, falling back to copy and remove across filesystems.
pub(crate) async fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(src, dst).await?;
            fs::remove_file(src).await
        }
        Err(e) => Err(e),
    }
}

/// Moves existing files of `role` (any extension) aside as hidden backups.
async fn stash_role_files(dir: &Path, role: MediaRole) -> io::Result<Vec<Stash>> {
    let mut stashes = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || MediaRole::of_stored_file(&name) != Some(role) {
            continue;
        }
        let original = entry.path();
        let backup = dir.join(format!(".{}{}", name, REPLACED_SUFFIX));
        fs::rename(&original, &backup).await?;
        stashes.push(Stash { original, backup });
    }
    Ok(stashes)
}

fn classify_delete_error(e: io::Error) -> PortfolioError {
    match e.kind() {
        io::ErrorKind::NotFound => PortfolioError::NotFound("Portfolio item not found."),
        io::ErrorKind::PermissionDenied => PortfolioError::PermissionDenied(e),
        _ => PortfolioError::DeleteFailed(e),
    }
}
