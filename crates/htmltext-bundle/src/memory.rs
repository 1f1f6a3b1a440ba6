//! In-memory resource bundle.
//!
//! Useful for unit tests and for hosts that embed their resources with
//! `include_bytes!`. Keys are normalized relative paths.

use std::borrow::Cow;
use std::collections::BTreeMap;

use htmltext_types::error::{HtmlTextError, Result};

use crate::{ResourceBundle, validate_path};

/// A fully in-memory resource bundle.
#[derive(Debug, Clone, Default)]
pub struct MemoryBundle {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a resource.
    pub fn insert(&mut self, path: &str, data: impl Into<Vec<u8>>) {
        self.entries.insert(normalize(path).into_owned(), data.into());
    }

    /// Builder-style [`MemoryBundle::insert`].
    pub fn with(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resource paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Check whether a path is already in normal form (relative, no `//`,
/// no leading or trailing `/`).
fn is_normalized(path: &str) -> bool {
    !path.starts_with('/') && !path.ends_with('/') && !path.contains("//")
}

/// Normalize a resource path: strip leading and trailing `/` and collapse
/// `//`. Returns the input unchanged (zero-alloc) when already normal.
fn normalize(path: &str) -> Cow<'_, str> {
    if is_normalized(path) {
        return Cow::Borrowed(path);
    }
    let joined = path
        .split('/')
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    Cow::Owned(joined)
}

impl ResourceBundle for MemoryBundle {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        validate_path(path)?;
        let path = normalize(path);
        self.entries
            .get(path.as_ref())
            .cloned()
            .ok_or_else(|| HtmlTextError::Bundle(format!("no such resource: {path}")))
    }

    fn exists(&self, path: &str) -> bool {
        validate_path(path).is_ok() && self.entries.contains_key(normalize(path).as_ref())
    }
}
