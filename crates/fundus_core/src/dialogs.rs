use std::path::PathBuf;

/// Display name plus allowed extensions for a native file dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn new(name: impl Into<String>, extensions: &[&str]) -> Self {
        Self {
            name: name.into(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn images() -> Self {
        Self::new("Images", crate::scan::IMAGE_EXTENSIONS)
    }

    pub fn csv() -> Self {
        Self::new("CSV", &["csv"])
    }
}

/// Access to the host's native open/save dialogs.
///
/// Every method returns `None` when the user cancels.
pub trait Dialogs {
    fn pick_file(&self, filters: &[FileFilter], title: &str) -> Option<PathBuf>;

    fn pick_directory(&self, title: &str) -> Option<PathBuf>;

    fn pick_save_path(
        &self,
        default_name: &str,
        filters: &[FileFilter],
        title: &str,
    ) -> Option<PathBuf>;
}
