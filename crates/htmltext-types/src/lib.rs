//! Foundation types for htmltext.
//!
//! This crate holds the platform-agnostic types shared by every htmltext
//! crate: the error type, pointer input events, and colors.

pub mod color;
pub mod error;
pub mod input;
