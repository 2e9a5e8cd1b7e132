//! Utility functions for converting between raster images and bit grids

use crate::error::Result;
use crate::grid::{BinaryImage, BLACK, WHITE};
use image::{DynamicImage, GrayImage, Luma, RgbImage};

/// Luminance below this value is black
pub const LUMINANCE_THRESHOLD: f64 = 128.0;

/// Channel value below this is read back as a black subpixel
pub const RASTER_THRESHOLD: u8 = 128;

/// ITU-R BT.601 luma of an RGB pixel
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// Threshold an RGB grid into a secret image (1 = black)
pub fn binarize(pixels: &RgbImage) -> Result<BinaryImage> {
    let bits = pixels
        .pixels()
        .map(|p| u8::from(luminance(p[0], p[1], p[2]) < LUMINANCE_THRESHOLD))
        .collect();
    BinaryImage::from_bits(pixels.width() as usize, pixels.height() as usize, bits)
}

/// Convert any decoded image to a secret image
pub fn binarize_image(image: &DynamicImage) -> Result<BinaryImage> {
    binarize(&image.to_rgb8())
}

/// Render a bit grid as an 8-bit greyscale raster (black = 0, white = 255)
pub fn to_luma_image(grid: &BinaryImage) -> GrayImage {
    GrayImage::from_fn(grid.width() as u32, grid.height() as u32, |x, y| {
        Luma([if grid.is_black(x as usize, y as usize) {
            0
        } else {
            255
        }])
    })
}

/// Read a share raster back into subpixels. Only the red channel is
/// inspected, as shares are written in pure black and white.
pub fn from_raster(image: &DynamicImage) -> Result<BinaryImage> {
    let rgb = image.to_rgb8();
    let bits = rgb
        .pixels()
        .map(|p| if p[0] < RASTER_THRESHOLD { BLACK } else { WHITE })
        .collect();
    BinaryImage::from_bits(rgb.width() as usize, rgb.height() as usize, bits)
}

/// Copy one basis-matrix row into a share row at the given subpixel offset
pub fn apply_pattern(row: &mut [u8], offset: usize, pattern: impl IntoIterator<Item = u8>) {
    for (slot, value) in row[offset..].iter_mut().zip(pattern) {
        *slot = value;
    }
}
