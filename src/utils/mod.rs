//! Utility functions for images and geometry.

pub mod image;
pub mod transform;

pub use self::image::{
    dark_pixel_count, dark_ratio, decode_gray_image, dynamic_to_gray, enforce_dark_on_light,
    load_gray_image,
};
pub use transform::{Point2f, warp_to_square};
