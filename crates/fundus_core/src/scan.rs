use crate::error::{FundusError, Result};
use crate::model::{EyeImagePair, ImageRef};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// List supported images directly inside `dir`, sorted by file name.
pub fn scan_images(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let root = dir.as_ref();
    if !root.is_dir() {
        return Err(FundusError::InvalidFolder(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("walkdir error: {}", e);
                continue;
            }
        };
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort_by_key(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });
    Ok(files)
}

/// Pair the images of a left-eye folder with those of a right-eye folder.
///
/// Both listings are sorted by file name and matched by position; surplus
/// images on the longer side are skipped.
pub fn pair_folders(
    left_dir: impl AsRef<Path>,
    right_dir: impl AsRef<Path>,
) -> Result<Vec<EyeImagePair>> {
    let left = scan_images(left_dir.as_ref())?;
    let right = scan_images(right_dir.as_ref())?;

    if left.len() != right.len() {
        tracing::warn!(
            "Left folder has {} images, right folder has {}; pairing the first {}",
            left.len(),
            right.len(),
            left.len().min(right.len())
        );
    }

    let pairs: Vec<EyeImagePair> = left
        .into_iter()
        .zip(right)
        .enumerate()
        .map(|(idx, (l, r))| {
            EyeImagePair::new(
                format!("pair_{}", idx + 1),
                ImageRef::from_path(l),
                ImageRef::from_path(r),
            )
        })
        .collect();

    tracing::debug!("Paired {} image pairs", pairs.len());
    Ok(pairs)
}

pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn scan_images_filters_and_sorts() -> anyhow::Result<()> {
        let dir = tempdir()?;
        File::create(dir.path().join("b.PNG"))?;
        File::create(dir.path().join("a.jpg"))?;
        File::create(dir.path().join("c.bmp"))?;
        File::create(dir.path().join("notes.txt"))?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;
        File::create(nested.join("d.jpg"))?;

        let names: Vec<String> = scan_images(dir.path())?
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.bmp"]);
        Ok(())
    }

    #[test]
    fn pair_folders_matches_by_position() -> anyhow::Result<()> {
        let left = tempdir()?;
        let right = tempdir()?;
        for name in ["L_02.jpg", "L_01.jpg", "L_03.jpg"] {
            File::create(left.path().join(name))?;
        }
        for name in ["R_01.jpg", "R_02.jpg"] {
            File::create(right.path().join(name))?;
        }

        let pairs = pair_folders(left.path(), right.path())?;
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].id, "pair_1");
        assert_eq!(pairs[0].left.name, "L_01.jpg");
        assert_eq!(pairs[0].right.name, "R_01.jpg");
        assert_eq!(pairs[1].id, "pair_2");
        assert_eq!(pairs[1].left.name, "L_02.jpg");
        assert_eq!(pairs[1].right.name, "R_02.jpg");
        Ok(())
    }

    #[test]
    fn empty_folders_give_no_pairs() -> anyhow::Result<()> {
        let left = tempdir()?;
        let right = tempdir()?;
        assert!(pair_folders(left.path(), right.path())?.is_empty());
        Ok(())
    }

    #[test]
    fn missing_folder_is_rejected() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let missing = dir.path().join("gone");
        assert!(matches!(
            pair_folders(&missing, dir.path()),
            Err(FundusError::InvalidFolder(p)) if p == missing
        ));
        Ok(())
    }
}
