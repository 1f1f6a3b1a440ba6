//! htmltext core.
//!
//! Converts HTML markup into styled text for a text-rendering surface:
//! a tokenizer and base parser, interception of extended tags (tables,
//! internal links), pluggable image resolution, post-processing passes,
//! and routing of pointer gestures to link regions.

// Re-exports from the foundation crates.
pub use htmltext_bundle as bundle;
pub use htmltext_types::color;
pub use htmltext_types::error;
pub use htmltext_types::input;

pub mod config;
pub mod html;
pub mod image;
pub mod markup;
pub mod pipeline;
pub mod pointer;
pub mod resolve;
pub mod styled;
pub mod surface;
pub mod symbols;
pub mod tags;
pub mod widget;

#[cfg(test)]
pub(crate) mod test_utils;
