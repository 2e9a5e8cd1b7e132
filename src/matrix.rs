//! Basis matrix generation for the (k,n) threshold scheme

use crate::error::{Result, VCError};
use nalgebra::DMatrix;

/// Type alias for basis matrices
pub type ShareMatrix = DMatrix<u8>;

/// Largest threshold accepted; columns grow as 2^(k-1)
pub const MAX_THRESHOLD: usize = 20;

/// The pair of basis matrices for a threshold k
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasisMatrices {
    /// White pixel patterns: one column per even-size subset of {0..k-1}
    pub c0: ShareMatrix,
    /// Black pixel patterns: one column per odd-size subset of {0..k-1}
    pub c1: ShareMatrix,
}

impl BasisMatrices {
    /// Threshold k (row count)
    pub fn threshold(&self) -> usize {
        self.c0.nrows()
    }

    /// Subpixel expansion factor m = 2^(k-1) (column count)
    pub fn subpixels(&self) -> usize {
        self.c0.ncols()
    }

    /// Pattern matrix for a secret bit
    pub fn for_pixel(&self, black: bool) -> &ShareMatrix {
        if black {
            &self.c1
        } else {
            &self.c0
        }
    }
}

/// Build C0 and C1 for threshold k.
///
/// Subsets of {0..k-1} are enumerated as bitmasks in increasing order and
/// split by popcount parity. Cell (i, j) is 1 iff participant i belongs to
/// the j-th subset of the matching parity.
pub fn build_basis_matrices(k: usize) -> Result<BasisMatrices> {
    if k < 2 {
        return Err(VCError::InvalidConfiguration(format!(
            "threshold must be at least 2, got {}",
            k
        )));
    }
    if k > MAX_THRESHOLD {
        return Err(VCError::InvalidConfiguration(format!(
            "threshold must be at most {}, got {}",
            MAX_THRESHOLD, k
        )));
    }

    let (even, odd): (Vec<u32>, Vec<u32>) =
        (0..1u32 << k).partition(|mask| mask.count_ones() % 2 == 0);

    Ok(BasisMatrices {
        c0: subset_matrix(k, &even),
        c1: subset_matrix(k, &odd),
    })
}

fn subset_matrix(k: usize, subsets: &[u32]) -> ShareMatrix {
    DMatrix::from_fn(k, subsets.len(), |row, col| {
        ((subsets[col] >> row) & 1) as u8
    })
}

/// OR together the given rows of a matrix
pub fn or_rows(matrix: &ShareMatrix, rows: &[usize]) -> Vec<u8> {
    (0..matrix.ncols())
        .map(|col| rows.iter().fold(0, |acc, &row| acc | matrix[(row, col)]))
        .collect()
}
