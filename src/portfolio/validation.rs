//! Admission rules for uploaded media. Everything here is a pure decision over
//! file metadata; nothing touches the filesystem.

use super::{Category, MediaClass, MediaRole, PortfolioError, StagedFile, StagedUpload};
use std::path::Path;

pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp", ".gif"];
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".mkv", ".webm", ".avi"];
pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];
pub const VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/x-matroska",
    "video/webm",
    "video/x-msvideo",
];

pub const MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;
pub const MAX_VIDEO_BYTES: u64 = 500 * 1024 * 1024;
pub const MAX_THUMBNAIL_BYTES: u64 = 15 * 1024 * 1024;

/// The metadata a decision is made on.
#[derive(Debug, Clone, Copy)]
pub struct FileMeta<'a> {
    pub original_name: &'a str,
    pub content_type: &'a str,
    pub size: Option<u64>,
}

impl<'a> From<&'a StagedFile> for FileMeta<'a> {
    fn from(file: &'a StagedFile) -> Self {
        Self {
            original_name: &file.original_name,
            content_type: &file.content_type,
            size: file.size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedFile {
    /// Lowercased extension including the dot, used for the stored file name.
    pub extension: String,
    pub class: MediaClass,
}

/// Lowercased extension with its leading dot, or an empty string.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

/// Both the extension and the declared MIME type have to agree on a class.
pub fn classify(meta: &FileMeta<'_>) -> Option<MediaClass> {
    let ext = extension_of(meta.original_name);
    let mime = meta.content_type.trim().to_lowercase();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) && IMAGE_MIME_TYPES.contains(&mime.as_str()) {
        Some(MediaClass::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str())
        && VIDEO_MIME_TYPES.contains(&mime.as_str())
    {
        Some(MediaClass::Video)
    } else {
        None
    }
}

pub fn validate_file(
    role: MediaRole,
    meta: &FileMeta<'_>,
    category: Category,
) -> Result<AcceptedFile, String> {
    let class = classify(meta);
    let image_only = role == MediaRole::Thumbnail || category.is_thumbnail();

    let (class, max_size) = match class {
        Some(MediaClass::Image) if image_only => (MediaClass::Image, MAX_THUMBNAIL_BYTES),
        Some(MediaClass::Image) => (MediaClass::Image, MAX_IMAGE_BYTES),
        Some(MediaClass::Video) if !image_only => (MediaClass::Video, MAX_VIDEO_BYTES),
        _ if role == MediaRole::Thumbnail => {
            return Err(format!(
                "thumbnail must be an image ({})",
                IMAGE_EXTENSIONS.join(", ")
            ));
        }
        _ if category.is_thumbnail() => {
            return Err(format!(
                "{} must be an image ({}) for category 'thumbnail'.",
                role,
                IMAGE_EXTENSIONS.join(", ")
            ));
        }
        _ => {
            let allowed: Vec<&str> = IMAGE_EXTENSIONS
                .iter()
                .chain(VIDEO_EXTENSIONS.iter())
                .copied()
                .collect();
            return Err(format!(
                "{} must be an image or video ({})",
                role,
                allowed.join(", ")
            ));
        }
    };

    if let Some(size) = meta.size
        && size > max_size
    {
        return Err(format!("{} exceeds max size of {} bytes", role, max_size));
    }

    Ok(AcceptedFile {
        extension: extension_of(meta.original_name),
        class,
    })
}

/// Checks every supplied file against `category`. With `require_pair` both
/// before and after must be present. All failures are collected; the first one
/// in role order becomes the error message.
pub fn validate_upload(
    upload: &StagedUpload,
    category: Category,
    require_pair: bool,
) -> Result<Vec<(MediaRole, AcceptedFile)>, PortfolioError> {
    if require_pair && (upload.before.is_none() || upload.after.is_none()) {
        return Err(PortfolioError::MissingRequiredFiles);
    }

    let mut accepted = Vec::new();
    let mut failures = Vec::new();

    for (role, file) in upload.files() {
        match validate_file(role, &FileMeta::from(file), category) {
            Ok(ok) => accepted.push((role, ok)),
            Err(reason) => failures.push(reason),
        }
    }

    if let Some(first) = failures.first() {
        return Err(PortfolioError::Rejected {
            message: first.clone(),
            details: failures,
        });
    }

    Ok(accepted)
}
