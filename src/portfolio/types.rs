use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    VideoEditing,
    MotionGraphics,
    Thumbnail,
    Shorts,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::VideoEditing,
        Category::MotionGraphics,
        Category::Thumbnail,
        Category::Shorts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::VideoEditing => "video-editing",
            Category::MotionGraphics => "motion-graphics",
            Category::Thumbnail => "thumbnail",
            Category::Shorts => "shorts",
        }
    }

    /// Parses a category name as supplied in a URL, ignoring surrounding whitespace.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    pub fn is_thumbnail(&self) -> bool {
        matches!(self, Category::Thumbnail)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MediaRole {
    Before,
    After,
    Thumbnail,
}

impl MediaRole {
    /// Order in which roles are checked and reported.
    pub const ALL: [MediaRole; 3] = [MediaRole::After, MediaRole::Before, MediaRole::Thumbnail];

    pub fn field_name(&self) -> &'static str {
        match self {
            MediaRole::Before => "before",
            MediaRole::After => "after",
            MediaRole::Thumbnail => "thumbnail",
        }
    }

    /// Fixed base name of the stored file, e.g. `Before` in `Before.mp4`.
    pub fn stem(&self) -> &'static str {
        match self {
            MediaRole::Before => "Before",
            MediaRole::After => "After",
            MediaRole::Thumbnail => "Thumbnail",
        }
    }

    pub fn from_field(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.field_name() == name)
    }

    /// Role of a stored file, judged by its base name.
    pub fn of_stored_file(file_name: &str) -> Option<Self> {
        let stem = Path::new(file_name).file_stem()?.to_str()?;
        Self::ALL.into_iter().find(|r| r.stem() == stem)
    }

    pub fn stored_name(&self, extension: &str) -> String {
        format!("{}{}", self.stem(), extension)
    }
}

impl fmt::Display for MediaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    Image,
    Video,
}

/// A file part written to the temp staging directory, not yet validated.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub original_name: String,
    pub content_type: String,
    pub size: Option<u64>,
    pub path: PathBuf,
}

/// Everything a create or edit request carried in its multipart body.
#[derive(Debug, Clone, Default)]
pub struct StagedUpload {
    pub before: Option<StagedFile>,
    pub after: Option<StagedFile>,
    pub thumbnail: Option<StagedFile>,
    pub new_category: Option<String>,
}

impl StagedUpload {
    pub fn get(&self, role: MediaRole) -> Option<&StagedFile> {
        match role {
            MediaRole::Before => self.before.as_ref(),
            MediaRole::After => self.after.as_ref(),
            MediaRole::Thumbnail => self.thumbnail.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, role: MediaRole) -> &mut Option<StagedFile> {
        match role {
            MediaRole::Before => &mut self.before,
            MediaRole::After => &mut self.after,
            MediaRole::Thumbnail => &mut self.thumbnail,
        }
    }

    /// Supplied files in role order.
    pub fn files(&self) -> impl Iterator<Item = (MediaRole, &StagedFile)> {
        MediaRole::ALL
            .into_iter()
            .filter_map(|role| self.get(role).map(|file| (role, file)))
    }

    pub fn is_empty(&self) -> bool {
        self.files().next().is_none()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileLink {
    pub filename: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileRef {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedFiles {
    pub after: FileLink,
    pub before: FileLink,
    pub thumbnail: Option<FileLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedItem {
    pub category: Category,
    pub folder: String,
    pub files: CreatedFiles,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdatedFiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<FileRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<FileRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<FileRef>,
}

impl UpdatedFiles {
    pub fn set(&mut self, role: MediaRole, file: FileRef) {
        match role {
            MediaRole::Before => self.before = Some(file),
            MediaRole::After => self.after = Some(file),
            MediaRole::Thumbnail => self.thumbnail = Some(file),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EditedItem {
    pub category: Category,
    pub folder: String,
    pub files: UpdatedFiles,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderListing {
    pub folder: String,
    pub files: Vec<FileRef>,
    /// Both a Before and an After file are present.
    pub complete: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCounts {
    pub total_count: usize,
    pub counts_by_category: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStrategy {
    /// Remove the whole tree in one call.
    Recursive,
    /// Unlink each file, tolerate failures, then remove the empty folder.
    FileByFile,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub deleted_folder: String,
    pub deleted_category: Category,
    pub files_deleted: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<String>,
}
