//! Directory-backed resource bundle.

use std::path::{Path, PathBuf};

use htmltext_types::error::{HtmlTextError, Result};

use crate::{ResourceBundle, validate_path};

/// Serves resources from a directory on the host file system.
#[derive(Debug, Clone)]
pub struct DirBundle {
    root: PathBuf,
}

impl DirBundle {
    /// Create a bundle rooted at `root`. The directory must exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(HtmlTextError::Bundle(format!(
                "not a directory: {}",
                root.display()
            )));
        }
        log::debug!("opened resource bundle at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn host_path(&self, path: &str) -> Result<PathBuf> {
        validate_path(path)?;
        let mut full = self.root.clone();
        for seg in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            full.push(seg);
        }
        Ok(full)
    }
}

impl ResourceBundle for DirBundle {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.host_path(path)?;
        std::fs::read(&full).map_err(|e| {
            HtmlTextError::Bundle(format!("cannot read {}: {e}", full.display()))
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.host_path(path).is_ok_and(|p| p.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, DirBundle) {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("images")).unwrap();
        std::fs::write(tmp.path().join("images/dot.bmp"), b"BMdata").unwrap();
        let bundle = DirBundle::open(tmp.path()).unwrap();
        (tmp, bundle)
    }

    #[test]
    fn reads_files_under_root() {
        let (_tmp, bundle) = fixture();
        assert_eq!(bundle.read("images/dot.bmp").unwrap(), b"BMdata");
        assert!(bundle.exists("images/dot.bmp"));
        assert!(bundle.exists("./images/dot.bmp"));
    }

    #[test]
    fn directories_are_not_resources() {
        let (_tmp, bundle) = fixture();
        assert!(!bundle.exists("images"));
        assert!(bundle.read("images").is_err());
    }

    #[test]
    fn traversal_is_rejected() {
        let (_tmp, bundle) = fixture();
        assert!(bundle.read("../etc/passwd").is_err());
        assert!(!bundle.exists("images/../../etc/passwd"));
    }

    #[test]
    fn open_missing_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(DirBundle::open(tmp.path().join("nope")).is_err());
    }
}
