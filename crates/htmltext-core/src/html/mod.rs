//! HTML tokenizer and character references.

pub mod entities;
pub mod tokenizer;
