//! Binary pixel grids shared by secrets, shares and reconstructions

use crate::error::{Result, VCError};
use std::fmt;

/// Bit value of a black pixel or subpixel
pub const BLACK: u8 = 1;
/// Bit value of a white pixel or subpixel
pub const WHITE: u8 = 0;

/// A height x width grid of bits stored row major (0 = white, 1 = black)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    width: usize,
    height: usize,
    bits: Vec<u8>,
}

impl BinaryImage {
    /// Create an all-white image
    pub fn new(width: usize, height: usize) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            bits: vec![WHITE; width * height],
        })
    }

    /// Wrap a row-major bit buffer. Any non-zero value is treated as black.
    pub fn from_bits(width: usize, height: usize, bits: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        if bits.len() != width * height {
            return Err(VCError::InvalidConfiguration(format!(
                "buffer holds {} bits, expected {}x{} = {}",
                bits.len(),
                width,
                height,
                width * height
            )));
        }
        let bits = bits.into_iter().map(|b| u8::from(b != WHITE)).collect();
        Ok(Self {
            width,
            height,
            bits,
        })
    }

    /// Build an image from equal-length rows
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if let Some(row) = rows.iter().find(|r| r.len() != width) {
            return Err(VCError::InvalidConfiguration(format!(
                "ragged rows: expected width {}, found a row of {}",
                width,
                row.len()
            )));
        }
        Self::from_bits(width, height, rows.concat())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// (width, height), matching the `image` crate's ordering
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.bits[y * self.width + x]
    }

    pub fn is_black(&self, x: usize, y: usize) -> bool {
        self.get(x, y) == BLACK
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.bits[y * self.width + x] = u8::from(value != WHITE);
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.bits[y * self.width..(y + 1) * self.width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.bits.chunks(self.width)
    }

    pub fn as_bits(&self) -> &[u8] {
        &self.bits
    }

    /// Number of black pixels in the whole grid
    pub fn count_black(&self) -> usize {
        self.bits.iter().filter(|&&b| b == BLACK).count()
    }
}

fn check_dimensions(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(VCError::InvalidConfiguration(format!(
            "image dimensions must be at least 1x1, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

impl fmt::Display for BinaryImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            let line: String = row
                .iter()
                .map(|&b| if b == BLACK { '#' } else { '.' })
                .collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let img = BinaryImage::from_rows(&[vec![1, 0, 1], vec![0, 0, 1]]).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert!(img.is_black(0, 0));
        assert!(!img.is_black(1, 1));
        assert_eq!(img.row(1), &[0, 0, 1]);
        assert_eq!(img.count_black(), 3);
    }

    #[test]
    fn test_rejects_bad_geometry() {
        assert!(BinaryImage::new(0, 4).is_err());
        assert!(BinaryImage::from_rows(&[]).is_err());
        assert!(BinaryImage::from_rows(&[vec![1, 0], vec![1]]).is_err());
        assert!(BinaryImage::from_bits(2, 2, vec![1, 0, 1]).is_err());
    }

    #[test]
    fn test_bits_are_normalised() {
        let img = BinaryImage::from_bits(2, 1, vec![255, 0]).unwrap();
        assert_eq!(img.as_bits(), &[1, 0]);
    }

    #[test]
    fn test_display() {
        let img = BinaryImage::from_rows(&[vec![1, 0], vec![0, 1]]).unwrap();
        assert_eq!(img.to_string(), "#.\n.#\n");
    }
}
