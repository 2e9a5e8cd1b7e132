//! Visual Secret Sharing Library
//!
//! This library implements a (k,n) threshold visual secret sharing scheme
//! for binary images:
//! - Basis matrices built from the even and odd subsets of k participants
//! - A participant-to-row table so that any k of n shares decode exactly
//! - Reconstruction by OR-stacking shares, with or without recorded metadata
//! - PNG persistence of shares and a per-session manifest
//!
//! ```no_run
//! use visual_secret_sharing::{BinaryImage, VCConfig, VisualCryptography};
//!
//! let secret = BinaryImage::from_rows(&[vec![1, 0], vec![0, 1]])?;
//! let vc = VisualCryptography::new(VCConfig { num_shares: 3, threshold: 2 })?;
//! let shares = vc.generate_shares(&secret, &mut rand::rng())?;
//! assert_eq!(vc.decrypt(&shares[1..])?, secret);
//! # Ok::<(), visual_secret_sharing::VCError>(())
//! ```

pub mod algorithms;
pub mod assignment;
pub mod config;
pub mod error;
pub mod grid;
pub mod matrix;
pub mod raster;
pub mod share;
pub mod utils;

pub use algorithms::{
    generate_shares, infer_subpixels, reconstruct_from_grids, reconstruct_image, DecodeWarning,
    Reconstruction,
};
pub use assignment::RowAssignment;
pub use error::{Result, VCError};
pub use grid::BinaryImage;
pub use matrix::{build_basis_matrices, BasisMatrices};
pub use share::{stack_shares, Share, ShareMetadata};
pub use utils::binarize;

// Re-export common types
pub use image::{DynamicImage, RgbImage};

use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

/// Block widths above this many subpixels are logged as a warning, since
/// every share is that many times wider than the secret
pub const WIDE_BLOCK_WARNING: usize = 256;

/// Configuration for visual secret sharing operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VCConfig {
    /// Number of shares to generate (n)
    pub num_shares: usize,
    /// Minimum shares needed to reconstruct (k in (k,n) scheme)
    pub threshold: usize,
}

impl Default for VCConfig {
    fn default() -> Self {
        Self {
            num_shares: 2,
            threshold: 2,
        }
    }
}

/// A validated (k,n) scheme. The basis matrices and row assignment are
/// computed once here and reused for every pixel of every image.
#[derive(Debug, Clone)]
pub struct VisualCryptography {
    config: VCConfig,
    basis: Arc<BasisMatrices>,
    assignment: Arc<RowAssignment>,
}

impl VisualCryptography {
    /// Create a new instance, rejecting invalid thresholds up front
    pub fn new(config: VCConfig) -> Result<Self> {
        algorithms::validate_parameters(config.threshold, config.num_shares)?;
        let basis = build_basis_matrices(config.threshold)?;
        let assignment = RowAssignment::new(config.threshold, config.num_shares)?;

        info!(
            "({},{}) scheme: {} segment(s) of {} subpixels per pixel",
            config.threshold,
            config.num_shares,
            assignment.segments(),
            basis.subpixels()
        );
        let block_width = assignment.segments() * basis.subpixels();
        if block_width > WIDE_BLOCK_WARNING {
            warn!(
                "({},{}) scheme expands each pixel into {} subpixels; shares will be {}x wider than the secret",
                config.threshold, config.num_shares, block_width, block_width
            );
        }

        Ok(Self {
            config,
            basis: Arc::new(basis),
            assignment: Arc::new(assignment),
        })
    }

    pub fn config(&self) -> &VCConfig {
        &self.config
    }

    pub fn basis(&self) -> &BasisMatrices {
        &self.basis
    }

    pub fn assignment(&self) -> &RowAssignment {
        &self.assignment
    }

    /// Subpixels each secret pixel expands into in every share
    pub fn block_width(&self) -> usize {
        self.assignment.segments() * self.basis.subpixels()
    }

    /// Split a binary secret using the supplied randomness
    pub fn generate_shares<R: Rng>(&self, image: &BinaryImage, rng: &mut R) -> Result<Vec<Share>> {
        algorithms::encode(image, &self.basis, &self.assignment, rng)
    }

    /// Binarize an image and split it using the thread-local CSPRNG
    pub fn encrypt(&self, image: &DynamicImage) -> Result<Vec<Share>> {
        let binary = utils::binarize_image(image)?;
        self.generate_shares(&binary, &mut rand::rng())
    }

    /// Reconstruct the secret from shares of this scheme
    pub fn decrypt(&self, shares: &[Share]) -> Result<BinaryImage> {
        if shares.len() < self.config.threshold {
            return Err(VCError::InsufficientShares {
                required: self.config.threshold,
                provided: shares.len(),
            });
        }
        algorithms::decode(shares, &self.assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_config_validation() {
        // Valid config
        let config = VCConfig {
            num_shares: 3,
            threshold: 2,
        };
        assert!(VisualCryptography::new(config).is_ok());

        // Invalid: threshold > num_shares
        let config = VCConfig {
            num_shares: 2,
            threshold: 3,
        };
        assert!(VisualCryptography::new(config).is_err());

        // Invalid: degenerate threshold
        let config = VCConfig {
            threshold: 1,
            ..Default::default()
        };
        assert!(VisualCryptography::new(config).is_err());

        // Invalid: no shares
        let config = VCConfig {
            num_shares: 0,
            threshold: 0,
        };
        assert!(VisualCryptography::new(config).is_err());
    }

    #[test]
    fn test_boundary_schemes() {
        let secret = BinaryImage::from_rows(&[vec![1, 0, 1, 1], vec![0, 0, 1, 0]]).unwrap();
        let mut rng = StdRng::seed_from_u64(8);

        // k = n and k = 2
        for (threshold, num_shares) in [(4, 4), (2, 5)] {
            let vc = VisualCryptography::new(VCConfig {
                num_shares,
                threshold,
            })
            .unwrap();
            let shares = vc.generate_shares(&secret, &mut rng).unwrap();
            assert_eq!(shares.len(), num_shares);
            assert_eq!(shares[0].dimensions(), (4 * vc.block_width(), 2));
            assert_eq!(vc.decrypt(&shares[num_shares - threshold..]).unwrap(), secret);
        }
    }

    #[test]
    fn test_block_width_growth() {
        let width = |threshold, num_shares| {
            VisualCryptography::new(VCConfig {
                num_shares,
                threshold,
            })
            .unwrap()
            .block_width()
        };
        assert_eq!(width(2, 3), 4);
        assert_eq!(width(3, 3), 4);
        assert!(width(4, 10) > WIDE_BLOCK_WARNING);
    }

    #[test]
    fn test_decrypt_requires_threshold() {
        let vc = VisualCryptography::new(VCConfig {
            num_shares: 4,
            threshold: 3,
        })
        .unwrap();
        let secret = BinaryImage::from_rows(&[vec![1]]).unwrap();
        let shares = vc
            .generate_shares(&secret, &mut StdRng::seed_from_u64(1))
            .unwrap();

        assert!(matches!(
            vc.decrypt(&shares[..2]),
            Err(VCError::InsufficientShares {
                required: 3,
                provided: 2
            })
        ));
    }

    #[test]
    fn test_decrypt_rejects_other_scheme() {
        let vc = VisualCryptography::new(VCConfig {
            num_shares: 3,
            threshold: 2,
        })
        .unwrap();
        let other = VisualCryptography::new(VCConfig {
            num_shares: 2,
            threshold: 2,
        })
        .unwrap();
        let secret = BinaryImage::from_rows(&[vec![1, 0]]).unwrap();
        let shares = other
            .generate_shares(&secret, &mut StdRng::seed_from_u64(2))
            .unwrap();

        assert!(matches!(
            vc.decrypt(&shares),
            Err(VCError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_encrypt_from_raster() {
        let mut img = RgbImage::from_pixel(3, 2, Rgb([255, 255, 255]));
        img.put_pixel(1, 0, Rgb([0, 0, 0]));
        img.put_pixel(2, 1, Rgb([20, 40, 60]));

        let vc = VisualCryptography::new(VCConfig::default()).unwrap();
        let shares = vc.encrypt(&DynamicImage::ImageRgb8(img)).unwrap();
        let decoded = vc.decrypt(&shares).unwrap();

        assert_eq!(
            decoded,
            BinaryImage::from_rows(&[vec![0, 1, 0], vec![0, 0, 1]]).unwrap()
        );
    }
}
