//! Native dialogs backed by `rfd`.

use fundus_core::{Dialogs, FileFilter};
use rfd::FileDialog;
use std::path::PathBuf;

pub(crate) struct RfdDialogs;

fn with_filters(mut dialog: FileDialog, filters: &[FileFilter]) -> FileDialog {
    for filter in filters {
        dialog = dialog.add_filter(filter.name.as_str(), filter.extensions.as_slice());
    }
    dialog
}

impl Dialogs for RfdDialogs {
    fn pick_file(&self, filters: &[FileFilter], title: &str) -> Option<PathBuf> {
        with_filters(FileDialog::new().set_title(title), filters).pick_file()
    }

    fn pick_directory(&self, title: &str) -> Option<PathBuf> {
        FileDialog::new()
            .set_title(title)
            .set_directory(".")
            .pick_folder()
    }

    fn pick_save_path(
        &self,
        default_name: &str,
        filters: &[FileFilter],
        title: &str,
    ) -> Option<PathBuf> {
        with_filters(
            FileDialog::new().set_title(title).set_file_name(default_name),
            filters,
        )
        .save_file()
    }
}
