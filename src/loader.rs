use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::pool::ImageRef;

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff", "avif", "heic",
];

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Turns user-selected files and folders into image handles.
///
/// Folders are walked recursively in name order. Anything that is not an
/// image file is skipped without error.
pub fn load_images<P: AsRef<Path>>(paths: &[P]) -> Vec<ImageRef> {
    let mut images = Vec::new();
    for path in paths {
        collect(path.as_ref(), &mut images);
    }
    debug!("loaded {} image(s)", images.len());
    images
}

fn collect(path: &Path, images: &mut Vec<ImageRef>) {
    if path.is_dir() {
        let mut entries: Vec<PathBuf> = match fs::read_dir(path) {
            Ok(rd) => rd.filter_map(|e| e.ok().map(|e| e.path())).collect(),
            Err(e) => {
                warn!("cannot read folder {}: {}", path.display(), e);
                return;
            }
        };
        entries.sort();
        for entry in entries {
            if is_symlinked_dir(&entry) {
                debug!("not following folder link {}", entry.display());
                continue;
            }
            collect(&entry, images);
        }
    } else if path.is_file() && is_image_path(path) {
        images.push(ImageRef::from_path(path));
    } else {
        debug!("skipping {}", path.display());
    }
}

/// A link to a folder found while walking. Folders named directly by the user
/// are followed even when they are links.
fn is_symlinked_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
        && path.is_dir()
}
