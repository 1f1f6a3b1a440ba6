//! Bundled-resource namespace.
//!
//! A [`ResourceBundle`] maps slash-separated resource paths (for example
//! `images/logo.png` or `raw/help.html`) to bytes. The local image
//! resolver and `set_html_from_resource` both read through this trait, so
//! the host decides where bundled resources actually live.

mod dir;
mod memory;

pub use dir::DirBundle;
pub use memory::MemoryBundle;

use htmltext_types::error::{HtmlTextError, Result};

/// Read-only access to bundled resources.
pub trait ResourceBundle {
    /// Read the resource at `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Check whether a resource exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Read the resource at `path` as UTF-8 text.
    fn read_to_string(&self, path: &str) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes)
            .map_err(|e| HtmlTextError::Bundle(format!("{path} is not valid UTF-8: {e}")))
    }

    /// Find the best match for `name` inside directory `dir`, preferring a
    /// locale-qualified directory (`raw-de/help.html` over `raw/help.html`).
    ///
    /// `locales` is searched in order; the unqualified directory is the
    /// final fallback.
    fn localized_path(&self, dir: &str, name: &str, locales: &[&str]) -> Option<String> {
        locales
            .iter()
            .map(|loc| format!("{dir}-{loc}/{name}"))
            .chain(std::iter::once(format!("{dir}/{name}")))
            .find(|candidate| self.exists(candidate))
    }
}

impl<B: ResourceBundle + ?Sized> ResourceBundle for &B {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        (**self).read(path)
    }

    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }
}

impl<B: ResourceBundle + ?Sized> ResourceBundle for Box<B> {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        (**self).read(path)
    }

    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }
}

/// Reject resource paths that try to climb out of the bundle.
pub fn validate_path(path: &str) -> Result<()> {
    if path.split(['/', '\\']).any(|seg| seg == "..") {
        return Err(HtmlTextError::Bundle(format!(
            "path traversal not allowed: {path}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_dotdot() {
        assert!(validate_path("images/../secret").is_err());
        assert!(validate_path("..").is_err());
        assert!(validate_path("images\\..\\secret").is_err());
    }

    #[test]
    fn validate_accepts_dotted_names() {
        assert!(validate_path("images/logo.v2.png").is_ok());
        assert!(validate_path("raw/..hidden").is_ok());
    }

    #[test]
    fn localized_path_prefers_locale() {
        let mut bundle = MemoryBundle::new();
        bundle.insert("raw/help.html", b"en".to_vec());
        bundle.insert("raw-de/help.html", b"de".to_vec());
        assert_eq!(
            bundle.localized_path("raw", "help.html", &["de"]),
            Some("raw-de/help.html".to_string())
        );
        assert_eq!(
            bundle.localized_path("raw", "help.html", &["fr"]),
            Some("raw/help.html".to_string())
        );
        assert_eq!(bundle.localized_path("raw", "missing.html", &[]), None);
    }

    #[test]
    fn read_to_string_rejects_invalid_utf8() {
        let mut bundle = MemoryBundle::new();
        bundle.insert("raw/bad.html", vec![0xFFu8, 0xFE]);
        assert!(bundle.read_to_string("raw/bad.html").is_err());
    }

    #[test]
    fn boxed_bundle_delegates() {
        let mut bundle = MemoryBundle::new();
        bundle.insert("a.txt", b"x".to_vec());
        let boxed: Box<dyn ResourceBundle> = Box::new(bundle);
        assert!(boxed.exists("a.txt"));
        assert_eq!(boxed.read("a.txt").unwrap(), b"x");
    }
}
