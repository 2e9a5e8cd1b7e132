//! Share management for visual secret sharing

use crate::algorithms::MIN_THRESHOLD;
use crate::error::{Result, VCError};
use crate::grid::{BinaryImage, BLACK};
use crate::matrix::MAX_THRESHOLD;
use crate::utils::to_luma_image;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Scheme parameters recorded with every share so that decoding never has
/// to guess the subpixel layout from pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareMetadata {
    /// Participant index, 1..=total_shares
    pub index: usize,
    /// Number of shares generated (n)
    pub total_shares: usize,
    /// Shares needed to reconstruct (k)
    pub threshold: usize,
    /// Subpixels per segment, 2^(k-1)
    pub subpixels: usize,
    /// Row-assignment segments per pixel block
    pub segments: usize,
    /// Secret dimensions before expansion
    pub original_width: usize,
    pub original_height: usize,
}

impl ShareMetadata {
    /// Subpixels each secret pixel expands into (segments * subpixels)
    pub fn block_width(&self) -> usize {
        self.segments.saturating_mul(self.subpixels)
    }

    /// Check the scheme parameters are consistent with each other. Metadata
    /// read back from a manifest is not trusted until this passes.
    pub fn validate(&self) -> Result<()> {
        if self.threshold < MIN_THRESHOLD || self.threshold > MAX_THRESHOLD {
            return Err(VCError::InvalidConfiguration(format!(
                "threshold {} outside {}..={}",
                self.threshold, MIN_THRESHOLD, MAX_THRESHOLD
            )));
        }
        if self.threshold > self.total_shares {
            return Err(VCError::InvalidConfiguration(format!(
                "threshold {} exceeds number of shares {}",
                self.threshold, self.total_shares
            )));
        }
        if self.subpixels != 1 << (self.threshold - 1) {
            return Err(VCError::InvalidConfiguration(format!(
                "{} subpixels per segment, threshold {} requires {}",
                self.subpixels,
                self.threshold,
                1usize << (self.threshold - 1)
            )));
        }
        if self.segments == 0 {
            return Err(VCError::InvalidConfiguration(
                "share layout has no segments".to_string(),
            ));
        }
        if self.index == 0 || self.index > self.total_shares {
            return Err(VCError::InvalidConfiguration(format!(
                "share index {} outside 1..={}",
                self.index, self.total_shares
            )));
        }
        Ok(())
    }

    /// Everything except the participant index matches
    pub fn same_scheme(&self, other: &ShareMetadata) -> bool {
        self.total_shares == other.total_shares
            && self.threshold == other.threshold
            && self.subpixels == other.subpixels
            && self.segments == other.segments
            && self.original_width == other.original_width
            && self.original_height == other.original_height
    }
}

/// A single participant's share
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    /// Subpixel grid, original_height x (original_width * block_width)
    pub grid: BinaryImage,
    pub metadata: ShareMetadata,
}

impl Share {
    /// Pair a grid with its metadata, checking the parameters and that the
    /// geometry agrees
    pub fn new(grid: BinaryImage, metadata: ShareMetadata) -> Result<Self> {
        metadata.validate()?;

        let expected_width = metadata
            .segments
            .checked_mul(metadata.subpixels)
            .and_then(|block| block.checked_mul(metadata.original_width))
            .ok_or_else(|| {
                VCError::DimensionMismatch(format!(
                    "share {} layout overflows: {} segments of {} subpixels for width {}",
                    metadata.index,
                    metadata.segments,
                    metadata.subpixels,
                    metadata.original_width
                ))
            })?;
        if grid.dimensions() != (expected_width, metadata.original_height) {
            return Err(VCError::DimensionMismatch(format!(
                "share {} is {}x{}, metadata implies {}x{}",
                metadata.index,
                grid.width(),
                grid.height(),
                expected_width,
                metadata.original_height
            )));
        }
        Ok(Self { grid, metadata })
    }

    /// 1-based participant index
    pub fn index(&self) -> usize {
        self.metadata.index
    }

    /// Dimensions of the share grid (width, height)
    pub fn dimensions(&self) -> (usize, usize) {
        self.grid.dimensions()
    }

    /// Check if this share can be stacked with another
    pub fn is_compatible(&self, other: &Share) -> bool {
        self.dimensions() == other.dimensions() && self.metadata.same_scheme(&other.metadata)
    }

    /// Black subpixels in the block of secret pixel (x, y)
    pub fn block_weight(&self, x: usize, y: usize) -> usize {
        let width = self.metadata.block_width();
        self.grid.row(y)[x * width..(x + 1) * width]
            .iter()
            .filter(|&&b| b == BLACK)
            .count()
    }

    /// Render the share as a black and white raster
    pub fn to_image(&self) -> DynamicImage {
        DynamicImage::ImageLuma8(to_luma_image(&self.grid))
    }

    /// Save the share as PNG; lossy formats would corrupt subpixel edges
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_image()
            .save_with_format(path.as_ref(), ImageFormat::Png)?;
        Ok(())
    }
}

impl fmt::Display for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Share {}/{} (k={}): {}x{} (original: {}x{}, subpixels: {}x{})",
            self.metadata.index,
            self.metadata.total_shares,
            self.metadata.threshold,
            self.grid.width(),
            self.grid.height(),
            self.metadata.original_width,
            self.metadata.original_height,
            self.metadata.segments,
            self.metadata.subpixels
        )
    }
}

/// Overlay shares subpixel by subpixel with OR, as stacking transparencies
/// would. Returns `None` for an empty or incompatible set.
pub fn stack_shares(shares: &[Share]) -> Option<BinaryImage> {
    let first = shares.first()?;
    if shares.iter().skip(1).any(|share| !first.is_compatible(share)) {
        return None;
    }
    stack_grids(shares.iter().map(|s| &s.grid))
}

/// OR together equally sized grids
pub fn stack_grids<'a>(grids: impl IntoIterator<Item = &'a BinaryImage>) -> Option<BinaryImage> {
    let mut grids = grids.into_iter();
    let first = grids.next()?;
    let mut bits = first.as_bits().to_vec();

    for grid in grids {
        if grid.dimensions() != first.dimensions() {
            return None;
        }
        for (acc, &b) in bits.iter_mut().zip(grid.as_bits()) {
            *acc |= b;
        }
    }

    BinaryImage::from_bits(first.width(), first.height(), bits).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(index: usize) -> ShareMetadata {
        ShareMetadata {
            index,
            total_shares: 3,
            threshold: 2,
            subpixels: 2,
            segments: 2,
            original_width: 2,
            original_height: 1,
        }
    }

    #[test]
    fn test_share_creation() {
        let grid = BinaryImage::new(8, 1).unwrap();
        let share = Share::new(grid, metadata(1)).unwrap();

        assert_eq!(share.index(), 1);
        assert_eq!(share.metadata.block_width(), 4);
        assert_eq!(share.dimensions(), (8, 1));
    }

    #[test]
    fn test_share_geometry_is_checked() {
        let grid = BinaryImage::new(6, 1).unwrap();
        assert!(matches!(
            Share::new(grid, metadata(1)),
            Err(VCError::DimensionMismatch(_))
        ));

        let grid = BinaryImage::new(8, 1).unwrap();
        assert!(Share::new(grid.clone(), metadata(0)).is_err());
        assert!(Share::new(grid, metadata(4)).is_err());
    }

    #[test]
    fn test_inconsistent_metadata_is_rejected() {
        let grid = BinaryImage::new(8, 1).unwrap();

        // k=2 needs 2 subpixels per segment
        let wrong_subpixels = ShareMetadata {
            subpixels: 4,
            segments: 1,
            ..metadata(1)
        };
        assert!(matches!(
            Share::new(grid.clone(), wrong_subpixels),
            Err(VCError::InvalidConfiguration(_))
        ));

        let too_many = ShareMetadata {
            threshold: MAX_THRESHOLD + 1,
            total_shares: MAX_THRESHOLD + 1,
            ..metadata(1)
        };
        assert!(matches!(
            Share::new(grid.clone(), too_many),
            Err(VCError::InvalidConfiguration(_))
        ));

        let above_n = ShareMetadata {
            threshold: 4,
            subpixels: 8,
            ..metadata(1)
        };
        assert!(matches!(
            Share::new(grid.clone(), above_n),
            Err(VCError::InvalidConfiguration(_))
        ));

        let no_segments = ShareMetadata {
            segments: 0,
            ..metadata(1)
        };
        assert!(Share::new(grid, no_segments).is_err());
    }

    #[test]
    fn test_overflowing_layout_is_an_error() {
        let grid = BinaryImage::new(4, 1).unwrap();
        let huge = ShareMetadata {
            segments: usize::MAX / 2 + 1,
            ..metadata(1)
        };
        assert!(matches!(
            Share::new(grid, huge),
            Err(VCError::DimensionMismatch(_))
        ));
        assert_eq!(huge.block_width(), usize::MAX);
    }

    #[test]
    fn test_share_compatibility() {
        let share1 = Share::new(BinaryImage::new(8, 1).unwrap(), metadata(1)).unwrap();
        let share2 = Share::new(BinaryImage::new(8, 1).unwrap(), metadata(2)).unwrap();
        let other = ShareMetadata {
            threshold: 3,
            subpixels: 4,
            segments: 1,
            ..metadata(3)
        };
        let share3 = Share::new(BinaryImage::new(8, 1).unwrap(), other).unwrap();

        assert!(share1.is_compatible(&share2));
        assert!(!share1.is_compatible(&share3));
        assert!(stack_shares(&[share1, share3]).is_none());
    }

    #[test]
    fn test_stack_is_or() {
        let a = BinaryImage::from_rows(&[vec![1, 0, 0, 1, 0, 0, 0, 0]]).unwrap();
        let b = BinaryImage::from_rows(&[vec![0, 1, 0, 1, 0, 0, 1, 0]]).unwrap();
        let shares = [
            Share::new(a, metadata(1)).unwrap(),
            Share::new(b, metadata(2)).unwrap(),
        ];

        let stacked = stack_shares(&shares).unwrap();
        assert_eq!(stacked.as_bits(), &[1, 1, 0, 1, 0, 0, 1, 0]);
        assert_eq!(shares[0].block_weight(0, 0), 2);
        assert_eq!(shares[1].block_weight(1, 0), 1);
        assert!(stack_shares(&[]).is_none());
    }

    #[test]
    fn test_metadata_serialises() {
        let json = serde_json::to_string(&metadata(2)).unwrap();
        let back: ShareMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata(2));
    }
}
