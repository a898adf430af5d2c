//! Direct downloads that bypass the extraction tool

pub mod image;

pub use image::{is_direct_image_url, ImageFetcher};
