//! Data models for roadcap.

mod media;
mod record;

pub use media::{CapturedMedia, TransportType};
pub use record::Record;
