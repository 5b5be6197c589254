//! Embedded image representation and format detection.

mod types;

pub use types::{EmbeddedImage, ImageFormat};
