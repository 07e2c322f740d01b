//! Image inputs.

mod types;

pub use types::{split_data_url, to_data_url, ImageAsset, ImageFormat};
