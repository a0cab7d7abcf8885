//! Shared utility functions.
//!
//! - `text`: DOM text normalization and display helpers

mod text;

pub use text::{collapse_whitespace, element_text, format_size, truncate_display};
