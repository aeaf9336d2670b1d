//! Coordinate Canonicalization
//!
//! The controller-reconstruction formulas assume the feedthrough blocks have
//! the normalized shapes
//!
//! ```text
//!     D12 = [0; I]      D21 = [0  I]
//! ```
//!
//! This module computes invertible input/output changes of coordinates that
//! bring an arbitrary full-rank plant into that form, and keeps the transforms
//! so the controller can be mapped back afterwards.

use ndarray::{s, Array1, Array2, Axis};
use ndarray_linalg::SVD;

use crate::error::{HinfError, Result};
use crate::linalg;
use crate::plant::GeneralizedPlant;

/// Factorization used to compute the scaling transforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScalingMethod {
    /// Orthogonal-triangular factorization
    Qr,
    /// Singular value decomposition
    #[default]
    Svd,
}

/// Left/right transforms for one feedthrough block.
///
/// `left * block * right` is `[0; I]`, `[0 I]` or `I` depending on the shape
/// of the block.
#[derive(Clone, Debug)]
pub struct BlockScaling {
    pub left: Array2<f64>,
    pub right: Array2<f64>,
}

impl BlockScaling {
    /// Apply the transform pair to a block.
    pub fn apply(&self, block: &Array2<f64>) -> Array2<f64> {
        self.left.dot(block).dot(&self.right)
    }
}

/// Plant in canonical coordinates along with the transforms that produced it.
#[derive(Clone, Debug)]
pub struct CanonicalPlant {
    pub plant: GeneralizedPlant,
    /// Transforms for D12 (left acts on z, right on u)
    pub scaling12: BlockScaling,
    /// Transforms for D21 (left acts on y, right on w)
    pub scaling21: BlockScaling,
}

/// The canonical pattern for a `rows × cols` block: `[0; I]`, `[0 I]` or `I`.
pub fn canonical_pattern(rows: usize, cols: usize) -> Array2<f64> {
    let mut pattern = Array2::zeros((rows, cols));
    let k = rows.min(cols);
    for i in 0..k {
        pattern[(rows - k + i, cols - k + i)] = 1.0;
    }
    pattern
}

/// Which side of a block keeps an orthogonal transform.
///
/// The side acting on performance outputs (D12) or disturbance inputs (D21)
/// must be orthogonal so the closed-loop H-infinity norm is unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OrthogonalSide {
    Left,
    Right,
}

/// Compute transforms (Tleft, Tright) that map a full-rank block to its
/// canonical pattern.
///
/// The transform on the longer side of the block is orthogonal (the left
/// one for square blocks).
///
/// # Errors
///
/// [`HinfError::RankDeficiency`] if the block is empty or lacks full rank.
///
/// # Examples
///
/// ```
/// use hinfsyn_rs::canonical::{canonical_pattern, scale_block, ScalingMethod};
/// use ndarray::arr2;
///
/// let d12 = arr2(&[[1.0], [2.0]]);
/// let t = scale_block(&d12, ScalingMethod::Qr).unwrap();
/// let canon = t.apply(&d12);
/// assert!((canon[(0, 0)]).abs() < 1e-12);
/// assert!((canon[(1, 0)] - 1.0).abs() < 1e-12);
/// assert_eq!(canonical_pattern(2, 1), arr2(&[[0.0], [1.0]]));
/// ```
pub fn scale_block(block: &Array2<f64>, method: ScalingMethod) -> Result<BlockScaling> {
    let side = if block.nrows() >= block.ncols() {
        OrthogonalSide::Left
    } else {
        OrthogonalSide::Right
    };
    scale_named_block(block, method, side, "feedthrough block")
}

fn scale_named_block(
    block: &Array2<f64>,
    method: ScalingMethod,
    side: OrthogonalSide,
    name: &'static str,
) -> Result<BlockScaling> {
    let (m, n) = block.dim();
    if m.min(n) == 0 {
        return Err(HinfError::RankDeficiency {
            block: name,
            rank: 0,
            required: 1,
        });
    }

    // Full column rank when the left side is orthogonal, full row rank otherwise
    let required = match side {
        OrthogonalSide::Left => n,
        OrthogonalSide::Right => m,
    };

    let rank = linalg::rank(block, None)?;
    if rank != required {
        return Err(HinfError::RankDeficiency {
            block: name,
            rank,
            required,
        });
    }

    let scale_tall = match method {
        ScalingMethod::Qr => scale_tall_by_qr,
        ScalingMethod::Svd => scale_tall_by_svd,
    };

    match side {
        OrthogonalSide::Left => scale_tall(block),
        OrthogonalSide::Right => {
            // Scale the transpose and transpose back: [0; I]' = [0 I]
            let t = scale_tall(&block.t().to_owned())?;
            Ok(BlockScaling {
                left: t.right.reversed_axes(),
                right: t.left.reversed_axes(),
            })
        }
    }
}

/// Scale an M×N block with M >= N to `[0; I]` using
/// `block = Q [R1; 0]`: left = [Q2'; Q1'], right = inv(R1).
fn scale_tall_by_qr(block: &Array2<f64>) -> Result<BlockScaling> {
    let n = block.ncols();
    let (q, r) = linalg::householder_qr(block);
    let r1_inv = linalg::inverse(&r.slice(s![..n, ..n]).to_owned())?;
    let q1t = q.slice(s![.., ..n]).t().to_owned();
    let q2t = q.slice(s![.., n..]).t().to_owned();
    Ok(BlockScaling {
        left: linalg::vstack(&[&q2t, &q1t])?,
        right: r1_inv,
    })
}

/// Scale an M×N block with M >= N to `[0; I]` using
/// `block = U [S; 0] V'`: left = [U2'; U1'], right = V inv(S).
fn scale_tall_by_svd(block: &Array2<f64>) -> Result<BlockScaling> {
    let n = block.ncols();

    let (u, sv, vt) = block.svd(true, true)?;
    let (u, vt) = match (u, vt) {
        (Some(u), Some(vt)) => (u, vt),
        _ => return Err(HinfError::conditioning("SVD returned no singular vectors")),
    };

    let inv_sv: Array1<f64> = sv.slice(s![..n]).mapv(|s| 1.0 / s);
    let right = vt.reversed_axes() * &inv_sv.insert_axis(Axis(0));

    let u1t = u.slice(s![.., ..n]).t().to_owned();
    let u2t = u.slice(s![.., n..]).t().to_owned();
    Ok(BlockScaling {
        left: linalg::vstack(&[&u2t, &u1t])?,
        right,
    })
}

/// Bring a plant into canonical coordinates.
///
/// D12 is scaled to `[0; I]` and D21 to `[0 I]`. The transforms acting on
/// the performance outputs (L12) and disturbance inputs (R21) are orthogonal,
/// so closed-loop gains from w to z are the same in both coordinate systems.
/// The remaining blocks are transformed consistently:
///
/// ```text
///     B1 R21   B2 R12
///     L12 C1   L12 D11 R21   L12 D12 R12
///     L21 C2   L21 D21 R21   L21 D22 R12
/// ```
pub fn transform_plant_to_canonical(
    plant: &GeneralizedPlant,
    method: ScalingMethod,
) -> Result<CanonicalPlant> {
    let scaling12 = scale_named_block(plant.d12(), method, OrthogonalSide::Left, "D12")?;
    let scaling21 = scale_named_block(plant.d21(), method, OrthogonalSide::Right, "D21")?;

    let (l12, r12) = (&scaling12.left, &scaling12.right);
    let (l21, r21) = (&scaling21.left, &scaling21.right);

    let canonical = GeneralizedPlant::new(
        plant.a().clone(),
        plant.b1().dot(r21),
        plant.b2().dot(r12),
        l12.dot(plant.c1()),
        l21.dot(plant.c2()),
        l12.dot(plant.d11()).dot(r21),
        l12.dot(plant.d12()).dot(r12),
        l21.dot(plant.d21()).dot(r21),
        l21.dot(plant.d22()).dot(r12),
    )?;

    Ok(CanonicalPlant {
        plant: canonical,
        scaling12,
        scaling21,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    fn blocks() -> Vec<Array2<f64>> {
        vec![
            arr2(&[[2.0], [1.0], [-1.0]]),
            arr2(&[[1.0, 3.0], [2.0, -1.0], [0.5, 0.5]]),
            arr2(&[[0.3, -2.0, 1.0]]),
            arr2(&[[1.0, 2.0, 0.0, 1.0], [0.0, 1.0, 4.0, -1.0]]),
            arr2(&[[3.0, 1.0], [1.0, 2.0]]),
        ]
    }

    #[test]
    fn test_scale_block_qr_patterns() {
        for block in blocks() {
            let (m, n) = block.dim();
            let t = scale_block(&block, ScalingMethod::Qr).unwrap();
            assert_eq!(t.left.dim(), (m, m));
            assert_eq!(t.right.dim(), (n, n));
            assert_abs_diff_eq!(t.apply(&block), canonical_pattern(m, n), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_scale_block_svd_patterns() {
        for block in blocks() {
            let (m, n) = block.dim();
            let t = scale_block(&block, ScalingMethod::Svd).unwrap();
            assert_eq!(t.left.dim(), (m, m));
            assert_eq!(t.right.dim(), (n, n));
            assert_abs_diff_eq!(t.apply(&block), canonical_pattern(m, n), epsilon = 1e-10);
        }
    }

    #[test]
    fn test_long_side_is_orthogonal() {
        for method in [ScalingMethod::Qr, ScalingMethod::Svd] {
            for block in blocks() {
                let (m, n) = block.dim();
                let t = scale_block(&block, method).unwrap();
                if m >= n {
                    assert_abs_diff_eq!(t.left.dot(&t.left.t()), Array2::<f64>::eye(m), epsilon = 1e-12);
                } else {
                    assert_abs_diff_eq!(t.right.t().dot(&t.right), Array2::<f64>::eye(n), epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_scale_block_rank_deficient() {
        let block = arr2(&[[1.0, 2.0], [2.0, 4.0], [0.0, 0.0]]);
        let err = scale_block(&block, ScalingMethod::Svd).unwrap_err();
        assert!(matches!(
            err,
            HinfError::RankDeficiency {
                rank: 1,
                required: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_scale_block_empty() {
        let block: Array2<f64> = Array2::zeros((2, 0));
        assert!(matches!(
            scale_block(&block, ScalingMethod::Qr).unwrap_err(),
            HinfError::RankDeficiency { .. }
        ));
    }

    #[test]
    fn test_wide_d12_rejected() {
        let plant = GeneralizedPlant::new(
            arr2(&[[-1.0]]),
            arr2(&[[1.0]]),
            arr2(&[[1.0, 0.0]]),
            arr2(&[[1.0]]),
            arr2(&[[1.0]]),
            arr2(&[[0.0]]),
            arr2(&[[1.0, 2.0]]),
            arr2(&[[1.0]]),
            Array2::zeros((1, 2)),
        )
        .unwrap();
        assert!(matches!(
            transform_plant_to_canonical(&plant, ScalingMethod::Svd).unwrap_err(),
            HinfError::RankDeficiency {
                block: "D12",
                rank: 1,
                required: 2
            }
        ));
    }

    #[test]
    fn test_canonical_pattern() {
        assert_eq!(canonical_pattern(3, 1), arr2(&[[0.0], [0.0], [1.0]]));
        assert_eq!(canonical_pattern(1, 3), arr2(&[[0.0, 0.0, 1.0]]));
        assert_eq!(canonical_pattern(2, 2), Array2::<f64>::eye(2));
    }

    #[test]
    fn test_transform_plant_to_canonical() {
        let plant = GeneralizedPlant::new(
            arr2(&[[-1.0, 1.0], [0.0, 2.0]]),
            arr2(&[[1.0, 0.0], [0.0, 1.0]]),
            arr2(&[[0.0], [1.0]]),
            arr2(&[[1.0, 0.0], [0.0, 0.0]]),
            arr2(&[[0.0, 1.0]]),
            Array2::zeros((2, 2)),
            arr2(&[[0.0], [3.0]]),
            arr2(&[[0.0, 0.5]]),
            Array2::zeros((1, 1)),
        )
        .unwrap();

        for method in [ScalingMethod::Qr, ScalingMethod::Svd] {
            let canon = transform_plant_to_canonical(&plant, method).unwrap();
            let p = &canon.plant;
            assert_eq!(p.dims(), plant.dims());
            assert_abs_diff_eq!(*p.a(), *plant.a());
            assert_abs_diff_eq!(*p.d12(), canonical_pattern(2, 1), epsilon = 1e-12);
            assert_abs_diff_eq!(*p.d21(), canonical_pattern(1, 2), epsilon = 1e-12);
            assert_abs_diff_eq!(*p.b2(), plant.b2().dot(&canon.scaling12.right), epsilon = 1e-12);
            assert_abs_diff_eq!(*p.c2(), canon.scaling21.left.dot(plant.c2()), epsilon = 1e-12);
            let l12 = &canon.scaling12.left;
            let r21 = &canon.scaling21.right;
            assert_abs_diff_eq!(l12.t().dot(l12), Array2::<f64>::eye(2), epsilon = 1e-12);
            assert_abs_diff_eq!(r21.t().dot(r21), Array2::<f64>::eye(2), epsilon = 1e-12);
        }
    }
}
