//! Participant to basis-row assignment
//!
//! With n > k participants and only k basis rows, a single fixed mapping
//! always sends two members of some k-subset to the same row, and the basis
//! matrices are indistinguishable on fewer than k distinct rows. The table
//! built here holds several maps ("segments") so that every k-subset of
//! participants is sent to k distinct rows by at least one of them. Each
//! segment contributes its own m-wide slice to every subpixel block.

use crate::error::{Result, VCError};

/// Largest number of k-subsets the greedy cover will enumerate
pub const MAX_COMBINATIONS: usize = 1 << 20;

/// A family of maps from participant (0-based) to basis row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowAssignment {
    threshold: usize,
    participants: usize,
    maps: Vec<Vec<usize>>,
}

impl RowAssignment {
    /// Build the table for a (k, n) scheme.
    ///
    /// k-subsets are visited in lexicographic order; an uncovered subset gets
    /// a new map placing its sorted members on rows 0..k-1 and every other
    /// participant p on row `p % k`. The result is a pure function of (k, n).
    pub fn new(k: usize, n: usize) -> Result<Self> {
        if k == 0 || k > n {
            return Err(VCError::InvalidConfiguration(format!(
                "cannot assign rows for k={} and n={}",
                k, n
            )));
        }
        match binomial(n, k) {
            Some(count) if count <= MAX_COMBINATIONS => {}
            _ => {
                return Err(VCError::InvalidConfiguration(format!(
                    "k={} of n={} has more than {} participant subsets",
                    k, n, MAX_COMBINATIONS
                )))
            }
        }

        let mut maps: Vec<Vec<usize>> = Vec::new();
        for subset in Combinations::new(n, k) {
            if maps.iter().any(|map| is_injective_on(map, &subset, k)) {
                continue;
            }
            let mut map: Vec<usize> = (0..n).map(|p| p % k).collect();
            for (row, &p) in subset.iter().enumerate() {
                map[p] = row;
            }
            maps.push(map);
        }

        Ok(Self {
            threshold: k,
            participants: n,
            maps,
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Number of maps, i.e. segments per subpixel block
    pub fn segments(&self) -> usize {
        self.maps.len()
    }

    /// Basis row that participant `p` (0-based) copies in `segment`
    pub fn row(&self, segment: usize, participant: usize) -> usize {
        self.maps[segment][participant]
    }

    /// First segment whose map reaches every basis row from the given
    /// participants (0-based). `None` if fewer than k distinct rows are ever
    /// reached, which means fewer than k distinct participants were given.
    pub fn covering_segment(&self, participants: &[usize]) -> Option<usize> {
        self.maps.iter().position(|map| {
            let mut seen = vec![false; self.threshold];
            for &p in participants {
                if let Some(&row) = map.get(p) {
                    seen[row] = true;
                }
            }
            seen.iter().all(|&s| s)
        })
    }
}

/// C(n, k), or `None` on overflow
fn binomial(n: usize, k: usize) -> Option<usize> {
    let k = k.min(n - k);
    (0..k).try_fold(1usize, |acc, i| Some(acc.checked_mul(n - i)? / (i + 1)))
}

fn is_injective_on(map: &[usize], subset: &[usize], k: usize) -> bool {
    let mut seen = vec![false; k];
    subset.iter().all(|&p| !std::mem::replace(&mut seen[map[p]], true))
}

/// Lexicographic k-combinations of 0..n
struct Combinations {
    n: usize,
    current: Option<Vec<usize>>,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            current: (k <= n).then(|| (0..k).collect()),
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        let k = current.len();

        let mut next = current.clone();
        // rightmost position that can still be advanced
        if let Some(i) = (0..k).rev().find(|&i| next[i] < self.n - k + i) {
            next[i] += 1;
            for j in i + 1..k {
                next[j] = next[j - 1] + 1;
            }
            self.current = Some(next);
        }

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combinations() {
        let all: Vec<Vec<usize>> = Combinations::new(4, 2).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(Combinations::new(5, 5).count(), 1);
        assert_eq!(Combinations::new(6, 3).count(), 20);
    }

    #[test]
    fn test_k_equals_n_is_identity() {
        let assignment = RowAssignment::new(4, 4).unwrap();
        assert_eq!(assignment.segments(), 1);
        for p in 0..4 {
            assert_eq!(assignment.row(0, p), p);
        }
    }

    #[test]
    fn test_k2_n3() {
        let assignment = RowAssignment::new(2, 3).unwrap();
        assert_eq!(assignment.segments(), 2);
        assert_eq!(assignment.covering_segment(&[0, 1]), Some(0));
        assert_eq!(assignment.covering_segment(&[0, 2]), Some(1));
        assert_eq!(assignment.covering_segment(&[1, 2]), Some(0));
        assert_eq!(assignment.covering_segment(&[2]), None);
    }

    #[test]
    fn test_every_subset_is_covered() {
        for n in 2..=7 {
            for k in 2..=n {
                let assignment = RowAssignment::new(k, n).unwrap();
                for subset in Combinations::new(n, k) {
                    let segment = assignment
                        .covering_segment(&subset)
                        .unwrap_or_else(|| panic!("k={} n={} {:?} uncovered", k, n, subset));
                    let mut rows: Vec<usize> =
                        subset.iter().map(|&p| assignment.row(segment, p)).collect();
                    rows.sort();
                    assert_eq!(rows, (0..k).collect::<Vec<_>>());
                }
            }
        }
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(RowAssignment::new(4, 3).is_err());
        assert!(RowAssignment::new(0, 3).is_err());
    }

    #[test]
    fn test_subset_count_is_capped() {
        assert_eq!(binomial(6, 3), Some(20));
        assert_eq!(binomial(20, 20), Some(1));
        assert_eq!(binomial(usize::MAX, 3), None);

        assert!(matches!(
            RowAssignment::new(10, 10_000),
            Err(VCError::InvalidConfiguration(_))
        ));
        assert!(RowAssignment::new(3, usize::MAX).is_err());
    }
}
