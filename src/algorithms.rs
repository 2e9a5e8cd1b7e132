//! Share generation and reconstruction for the (k,n) threshold scheme

use crate::{
    assignment::RowAssignment,
    error::{Result, VCError},
    grid::{BinaryImage, BLACK},
    matrix::{build_basis_matrices, BasisMatrices},
    share::{Share, ShareMetadata},
    utils::apply_pattern,
};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use rayon::prelude::*;
use std::fmt;
use tracing::{debug, warn};

/// Smallest threshold the scheme supports
pub const MIN_THRESHOLD: usize = 2;

/// Check (k, n) before any work is done
pub fn validate_parameters(threshold: usize, num_shares: usize) -> Result<()> {
    if num_shares == 0 {
        return Err(VCError::InvalidConfiguration(
            "Number of shares must be greater than 0".to_string(),
        ));
    }
    if threshold < MIN_THRESHOLD {
        return Err(VCError::InvalidConfiguration(format!(
            "Threshold must be at least {}, got {}",
            MIN_THRESHOLD, threshold
        )));
    }
    if threshold > num_shares {
        return Err(VCError::InvalidConfiguration(format!(
            "Threshold ({}) cannot be greater than number of shares ({})",
            threshold, num_shares
        )));
    }
    Ok(())
}

/// Split a binary secret into `n` shares, any `k` of which reconstruct it
pub fn generate_shares<R: Rng>(
    image: &BinaryImage,
    k: usize,
    n: usize,
    rng: &mut R,
) -> Result<Vec<Share>> {
    validate_parameters(k, n)?;
    let basis = build_basis_matrices(k)?;
    let assignment = RowAssignment::new(k, n)?;
    encode(image, &basis, &assignment, rng)
}

/// Encode with precomputed basis matrices and row assignment
pub(crate) fn encode<R: Rng>(
    image: &BinaryImage,
    basis: &BasisMatrices,
    assignment: &RowAssignment,
    rng: &mut R,
) -> Result<Vec<Share>> {
    let n = assignment.participants();
    let (width, height) = image.dimensions();
    let m = basis.subpixels();
    let block = assignment.segments() * m;

    debug!(
        "encoding {}x{} secret into {} shares (k={}, {} subpixels per pixel)",
        width,
        height,
        n,
        basis.threshold(),
        block
    );

    // one generator per row, seeded in order from the caller's rng
    let row_rngs: Vec<StdRng> = (0..height).map(|_| StdRng::from_rng(&mut *rng)).collect();

    let encoded_rows: Vec<Vec<Vec<u8>>> = row_rngs
        .into_par_iter()
        .enumerate()
        .map(|(y, mut row_rng)| encode_row(image.row(y), basis, assignment, block, &mut row_rng))
        .collect();

    let metadata = |index| ShareMetadata {
        index,
        total_shares: n,
        threshold: basis.threshold(),
        subpixels: m,
        segments: assignment.segments(),
        original_width: width,
        original_height: height,
    };

    (0..n)
        .map(|p| {
            let bits: Vec<u8> = encoded_rows
                .iter()
                .flat_map(|rows| rows[p].iter().copied())
                .collect();
            let grid = BinaryImage::from_bits(width * block, height, bits)?;
            Share::new(grid, metadata(p + 1))
        })
        .collect()
}

/// Encode one secret row into one subpixel row per participant
fn encode_row(
    secret_row: &[u8],
    basis: &BasisMatrices,
    assignment: &RowAssignment,
    block: usize,
    rng: &mut StdRng,
) -> Vec<Vec<u8>> {
    let m = basis.subpixels();
    let mut rows = vec![vec![0u8; secret_row.len() * block]; assignment.participants()];
    let mut permutation: Vec<usize> = (0..m).collect();

    for (x, &bit) in secret_row.iter().enumerate() {
        let matrix = basis.for_pixel(bit == BLACK);

        for segment in 0..assignment.segments() {
            // fresh column permutation per pixel and segment
            permutation.shuffle(rng);
            let offset = x * block + segment * m;

            for (participant, row) in rows.iter_mut().enumerate() {
                let basis_row = assignment.row(segment, participant);
                apply_pattern(
                    row,
                    offset,
                    permutation.iter().map(|&col| matrix[(basis_row, col)]),
                );
            }
        }
    }

    rows
}

/// Reconstruct the secret from shares carrying their metadata
pub fn reconstruct_image(shares: &[Share]) -> Result<BinaryImage> {
    let first = shares.first().ok_or(VCError::InsufficientShares {
        required: MIN_THRESHOLD,
        provided: 0,
    })?;
    let meta = &first.metadata;
    validate_parameters(meta.threshold, meta.total_shares)?;
    let assignment = RowAssignment::new(meta.threshold, meta.total_shares)?;
    decode(shares, &assignment)
}

/// Decode with a precomputed row assignment
pub(crate) fn decode(shares: &[Share], assignment: &RowAssignment) -> Result<BinaryImage> {
    let first = shares.first().ok_or(VCError::InsufficientShares {
        required: assignment.threshold(),
        provided: 0,
    })?;
    let meta = first.metadata;

    if let Some(share) = shares.iter().find(|s| !first.is_compatible(s)) {
        return Err(VCError::DimensionMismatch(format!(
            "share {} ({}) does not match share {} ({})",
            share.index(),
            share,
            first.index(),
            first
        )));
    }
    if meta.threshold != assignment.threshold()
        || meta.total_shares != assignment.participants()
        || meta.segments != assignment.segments()
    {
        return Err(VCError::DimensionMismatch(format!(
            "shares were made for a ({},{}) scheme with {} segments, expected ({},{}) with {}",
            meta.threshold,
            meta.total_shares,
            meta.segments,
            assignment.threshold(),
            assignment.participants(),
            assignment.segments()
        )));
    }

    let mut participants: Vec<usize> = shares.iter().map(|s| s.index() - 1).collect();
    participants.sort_unstable();
    participants.dedup();
    if participants.len() < meta.threshold {
        return Err(VCError::InsufficientShares {
            required: meta.threshold,
            provided: participants.len(),
        });
    }

    let segment = assignment
        .covering_segment(&participants)
        .ok_or(VCError::InsufficientShares {
            required: meta.threshold,
            provided: participants.len(),
        })?;
    debug!(
        "reconstructing from participants {:?} using segment {}",
        participants, segment
    );

    let grids: Vec<&BinaryImage> = shares.iter().map(|s| &s.grid).collect();
    let start = segment * meta.subpixels;
    decode_blocks(
        &grids,
        meta.original_width,
        meta.original_height,
        meta.block_width(),
        start..start + meta.subpixels,
    )
}

/// A pixel is black iff every examined subpixel of its block is black once
/// all grids are OR-stacked. Stacked black blocks are solid, stacked white
/// blocks keep one white subpixel.
fn decode_blocks(
    grids: &[&BinaryImage],
    width: usize,
    height: usize,
    block: usize,
    window: std::ops::Range<usize>,
) -> Result<BinaryImage> {
    let rows: Vec<Vec<u8>> = (0..height)
        .into_par_iter()
        .map(|y| {
            (0..width)
                .map(|x| {
                    let base = x * block;
                    let solid = window.clone().all(|offset| {
                        grids
                            .iter()
                            .any(|grid| grid.row(y)[base + offset] == BLACK)
                    });
                    u8::from(solid)
                })
                .collect()
        })
        .collect();

    BinaryImage::from_bits(width, height, rows.concat())
}

/// Advisory conditions noticed while decoding shares without metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeWarning {
    /// The share (1-based position in the input) has no black subpixel, so
    /// it says nothing about the subpixel layout. An all-white share may
    /// still be legitimate.
    DegenerateShare { share: usize },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::DegenerateShare { share } => write!(
                f,
                "share {} has no black subpixels; its block size cannot be inferred",
                share
            ),
        }
    }
}

/// Result of decoding shares without metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    pub image: BinaryImage,
    /// Subpixels per pixel that were used
    pub subpixels: usize,
    pub warnings: Vec<DecodeWarning>,
}

/// Run-length of black subpixels starting at the first black subpixel found
/// scanning column by column. `None` if the grid is entirely white.
pub fn infer_subpixels(grid: &BinaryImage) -> Option<usize> {
    let (width, height) = grid.dimensions();
    let (x, y) = (0..width)
        .flat_map(|x| (0..height).map(move |y| (x, y)))
        .find(|&(x, y)| grid.is_black(x, y))?;

    Some(grid.row(y)[x..].iter().take_while(|&&b| b == BLACK).count())
}

/// Smallest even block width dividing the grids' width for which every
/// block holds exactly half black subpixels. Shares from this scheme have
/// that balance in every block whatever the secret.
pub fn infer_block_width(grids: &[&BinaryImage]) -> Option<usize> {
    let width = grids.first()?.width();
    (2..=width)
        .step_by(2)
        .filter(|b| width % b == 0)
        .find(|&b| {
            grids.iter().all(|grid| {
                grid.rows().all(|row| {
                    row.chunks(b)
                        .all(|chunk| chunk.iter().filter(|&&s| s == BLACK).count() * 2 == b)
                })
            })
        })
}

/// Reconstruct from bare share rasters (no metadata).
///
/// The block width is taken from the balanced-block layout when one exists,
/// otherwise from the black run-length of the first non-blank share. Exact
/// for shares of a k = n scheme; with more participants than the threshold
/// the layout has several segments that cannot be told apart without
/// metadata.
pub fn reconstruct_from_grids(
    grids: &[BinaryImage],
    threshold: Option<usize>,
) -> Result<Reconstruction> {
    let required = threshold.unwrap_or(1);
    if grids.is_empty() || grids.len() < required {
        return Err(VCError::InsufficientShares {
            required,
            provided: grids.len(),
        });
    }

    let first = &grids[0];
    if let Some((i, grid)) = grids
        .iter()
        .enumerate()
        .find(|(_, g)| g.dimensions() != first.dimensions())
    {
        return Err(VCError::DimensionMismatch(format!(
            "share {} is {}x{}, share 1 is {}x{}",
            i + 1,
            grid.width(),
            grid.height(),
            first.width(),
            first.height()
        )));
    }

    let mut warnings = Vec::new();
    for (i, grid) in grids.iter().enumerate() {
        if grid.count_black() == 0 {
            let warning = DecodeWarning::DegenerateShare { share: i + 1 };
            warn!("{}", warning);
            warnings.push(warning);
        }
    }

    let refs: Vec<&BinaryImage> = grids.iter().collect();
    let subpixels = match infer_block_width(&refs) {
        Some(b) => b,
        None => grids.iter().find_map(infer_subpixels).unwrap_or_else(|| {
            warn!("no share has black subpixels, assuming one subpixel per pixel");
            1
        }),
    };

    if first.width() % subpixels != 0 {
        return Err(VCError::DimensionMismatch(format!(
            "share width {} is not a multiple of the inferred block width {}",
            first.width(),
            subpixels
        )));
    }
    debug!("decoding untagged shares with {} subpixels per pixel", subpixels);

    let image = decode_blocks(
        &refs,
        first.width() / subpixels,
        first.height(),
        subpixels,
        0..subpixels,
    )?;

    Ok(Reconstruction {
        image,
        subpixels,
        warnings,
    })
}
