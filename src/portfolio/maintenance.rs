use super::{Category, MediaRole, PENDING_MARKER, PortfolioError, PortfolioStore};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Suffix of a role file set aside during an edit.
pub(crate) const REPLACED_SUFFIX: &str = ".replaced";

#[derive(Debug, Clone)]
pub struct RepairOptions {
    pub dry_run: bool,
    /// Staged temp files older than this are considered abandoned.
    pub max_temp_age_minutes: u64,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_temp_age_minutes: 60,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct RepairReport {
    /// `category/folder` of items removed because they never finished.
    pub removed_pending: Vec<String>,
    pub removed_temp: Vec<PathBuf>,
    /// Backups of replaced files, restored or removed.
    pub resolved_backups: Vec<PathBuf>,
    /// Finished items missing their before or after file. Reported only.
    pub incomplete: Vec<String>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.removed_pending.is_empty()
            && self.removed_temp.is_empty()
            && self.resolved_backups.is_empty()
            && self.incomplete.is_empty()
    }
}

impl PortfolioStore {
    /// Item folders still carrying the pending marker, as `category/folder`.
    pub fn find_pending_items(&self) -> Vec<String> {
        self.item_folders()
            .filter(|(_, _, path)| path.join(PENDING_MARKER).exists())
            .map(|(category, folder, _)| format!("{}/{}", category, folder))
            .collect()
    }

    fn item_folders(&self) -> impl Iterator<Item = (Category, String, PathBuf)> + '_ {
        Category::ALL.into_iter().flat_map(move |category| {
            WalkDir::new(self.category_dir(category))
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .flatten()
                .filter(|entry| entry.file_type().is_dir())
                .filter_map(move |entry| {
                    let folder = entry.file_name().to_str()?.to_string();
                    if folder.starts_with('.') {
                        return None;
                    }
                    Some((category, folder, entry.into_path()))
                })
        })
    }

    /// Cleans up what an interrupted create or edit can leave behind.
    pub async fn repair(&self, options: &RepairOptions) -> Result<RepairReport, PortfolioError> {
        let mut report = RepairReport::default();
        let verb = if options.dry_run { "Would remove" } else { "Removing" };

        let items: Vec<_> = self.item_folders().collect();
        for (category, folder, path) in items {
            let label = format!("{}/{}", category, folder);

            if path.join(PENDING_MARKER).exists() {
                info!("{} unfinished item {}", verb, label);
                if !options.dry_run {
                    tokio::fs::remove_dir_all(&path).await?;
                }
                report.removed_pending.push(label);
                continue;
            }

            let mut resolved = resolve_backups(&path, options.dry_run).await?;
            report.resolved_backups.append(&mut resolved);

            if !has_pair(&path) {
                warn!("Item {} is missing its before or after file", label);
                report.incomplete.push(label);
            }
        }

        let cutoff = SystemTime::now()
            .checked_sub(Duration::from_secs(options.max_temp_age_minutes.saturating_mul(60)))
            .unwrap_or(SystemTime::UNIX_EPOCH);
        for entry in WalkDir::new(&self.config.temp_directory)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .flatten()
            .filter(|entry| entry.file_type().is_file())
        {
            let stale = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .is_some_and(|modified| modified < cutoff);
            if !stale {
                continue;
            }
            info!("{} abandoned temp file {:?}", verb, entry.path());
            if !options.dry_run {
                tokio::fs::remove_file(entry.path()).await?;
            }
            report.removed_temp.push(entry.into_path());
        }

        Ok(report)
    }
}

fn has_pair(item: &Path) -> bool {
    let roles: Vec<MediaRole> = WalkDir::new(item)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .flatten()
        .filter_map(|entry| MediaRole::of_stored_file(entry.file_name().to_str()?))
        .collect();
    roles.contains(&MediaRole::Before) && roles.contains(&MediaRole::After)
}

/// A backup whose role has no live file is moved back; otherwise it is stale.
async fn resolve_backups(item: &Path, dry_run: bool) -> Result<Vec<PathBuf>, PortfolioError> {
    let backups: Vec<(PathBuf, String)> = WalkDir::new(item)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?;
            let original = name.strip_prefix('.')?.strip_suffix(REPLACED_SUFFIX)?;
            Some((entry.path().to_path_buf(), original.to_string()))
        })
        .collect();

    let mut resolved = Vec::new();
    for (backup, original) in backups {
        let Some(role) = MediaRole::of_stored_file(&original) else {
            continue;
        };
        let live = WalkDir::new(item)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .flatten()
            .any(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(MediaRole::of_stored_file)
                    == Some(role)
            });

        if dry_run {
            debug!("Would resolve backup {:?}", backup);
        } else if live {
            tokio::fs::remove_file(&backup).await?;
        } else {
            info!("Restoring {:?} from backup", original);
            tokio::fs::rename(&backup, item.join(&original)).await?;
        }
        resolved.push(backup);
    }
    Ok(resolved)
}
