//! Local stand-in for the upload service.
//!
//! The workflow core never touches files; it only needs an id and a
//! display URL per image. For the CLI, this module walks a directory and
//! reports each image file as an [`UploadedImage`] whose id is the path
//! relative to the directory and whose URL is a `file://` URL.

use crate::types::UploadedImage;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Upload directory not found: {0}")]
    NotFound(String),
}

/// Collect the image files under `dir`, sorted by path.
pub fn scan_upload_dir(dir: &Path) -> Result<Vec<UploadedImage>, UploadError> {
    if !dir.is_dir() {
        return Err(UploadError::NotFound(dir.display().to_string()));
    }
    let root = dir.canonicalize()?;

    let mut images = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_image(path) {
            continue;
        }
        let id = path
            .strip_prefix(&root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        images.push(UploadedImage {
            id,
            display_url: format!("file://{}", path.display()),
        });
    }
    Ok(images)
}

/// Build upload entries from explicit file paths, keeping their order.
pub fn uploads_from_paths<P: AsRef<Path>>(paths: &[P]) -> Vec<UploadedImage> {
    paths
        .iter()
        .map(|p| {
            let path = p.as_ref();
            UploadedImage {
                id: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
                display_url: format!("file://{}", path.display()),
            }
        })
        .collect()
}

fn is_image(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}
