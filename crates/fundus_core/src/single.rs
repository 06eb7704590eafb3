use crate::dialogs::{Dialogs, FileFilter};
use crate::model::{Eye, EyeImagePair, ImageRef};

/// Left/right selection for diagnosing a single pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingleSession {
    left: Option<ImageRef>,
    right: Option<ImageRef>,
}

impl SingleSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self, eye: Eye) -> Option<&ImageRef> {
        match eye {
            Eye::Left => self.left.as_ref(),
            Eye::Right => self.right.as_ref(),
        }
    }

    pub fn set(&mut self, eye: Eye, image: ImageRef) {
        match eye {
            Eye::Left => self.left = Some(image),
            Eye::Right => self.right = Some(image),
        }
    }

    /// Ask the user for one eye's image. Returns `true` when an image was
    /// picked; a cancelled dialog leaves the session untouched.
    pub fn select(&mut self, eye: Eye, dialogs: &dyn Dialogs) -> bool {
        let title = format!("Select {} image", eye.label().to_lowercase());
        match dialogs.pick_file(&[FileFilter::images()], &title) {
            Some(path) => {
                tracing::debug!("{} image selected: {}", eye.label(), path.display());
                self.set(eye, ImageRef::from_path(path));
                true
            }
            None => false,
        }
    }

    pub fn can_diagnose(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    pub fn can_clear(&self) -> bool {
        self.left.is_some() || self.right.is_some()
    }

    pub fn clear(&mut self) {
        self.left = None;
        self.right = None;
    }

    /// The pair to diagnose, once both eyes are selected.
    pub fn pair(&self) -> Option<EyeImagePair> {
        match (&self.left, &self.right) {
            (Some(l), Some(r)) => Some(EyeImagePair::new("single", l.clone(), r.clone())),
            _ => None,
        }
    }
}
