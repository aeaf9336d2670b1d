//! Linear-Algebra Primitives
//!
//! Thin wrappers over LAPACK used by the synthesis routines: linear solves
//! with a conditioning check, SVD-based rank and pseudo-inverse, eigenvalues,
//! a full Householder QR, Cholesky factors, and the ordered real Schur
//! decomposition that the Riccati solver relies on.
//!
//! Every wrapper accepts empty (zero-row or zero-column) operands and returns
//! a correctly shaped empty result, since partitioned synthesis formulas
//! routinely produce empty blocks.

use ndarray::{concatenate, s, Array1, Array2, ArrayView2, Axis, ShapeBuilder};
use ndarray_linalg::{Cholesky, Eig, Factorize, ReciprocalConditionNum, Solve, SVD, UPLO};
use num_complex::Complex;

use crate::error::{HinfError, Result};

/// Reciprocal condition number below which a matrix is treated as singular.
pub const RCOND_MIN: f64 = 1e-14;

/// Solve `A X = B` for X (the `A\B` operator).
///
/// Fails with [`HinfError::NumericalConditioning`] if A is singular to
/// working precision.
pub fn solve(a: &Array2<f64>, b: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(HinfError::DimensionMismatch {
            block: "solve lhs",
            expected: (n, n),
            found: a.dim(),
        });
    }
    if b.nrows() != n {
        return Err(HinfError::DimensionMismatch {
            block: "solve rhs",
            expected: (n, b.ncols()),
            found: b.dim(),
        });
    }
    if n == 0 || b.ncols() == 0 {
        return Ok(Array2::zeros((n, b.ncols())));
    }

    let lu = a
        .factorize()
        .map_err(|e| HinfError::conditioning(format!("LU factorization failed: {}", e)))?;
    let rcond = lu.rcond()?;
    if !(rcond > RCOND_MIN) {
        return Err(HinfError::conditioning(format!(
            "matrix is singular to working precision (rcond = {:e})",
            rcond
        )));
    }

    let mut x = Array2::zeros(b.raw_dim());
    for (j, col) in b.columns().into_iter().enumerate() {
        let xj: Array1<f64> = lu.solve(&col.to_owned())?;
        x.column_mut(j).assign(&xj);
    }
    Ok(x)
}

/// Solve `X A = B` for X (the `B/A` operator).
pub fn solve_right(b: &Array2<f64>, a: &Array2<f64>) -> Result<Array2<f64>> {
    let xt = solve(&a.t().to_owned(), &b.t().to_owned())?;
    Ok(xt.reversed_axes())
}

/// Inverse of a square matrix.
pub fn inverse(a: &Array2<f64>) -> Result<Array2<f64>> {
    solve(a, &Array2::<f64>::eye(a.nrows()))
}

/// Singular values in decreasing order.
pub fn singular_values(a: &Array2<f64>) -> Result<Array1<f64>> {
    if a.is_empty() {
        return Ok(Array1::zeros(0));
    }
    let (_, sv, _) = a.svd(false, false)?;
    Ok(sv)
}

/// Largest singular value (spectral norm); zero for an empty matrix.
pub fn max_singular_value(a: &Array2<f64>) -> Result<f64> {
    Ok(singular_values(a)?.iter().cloned().fold(0.0, f64::max))
}

/// Default rank tolerance: `max(m, n) * eps * sigma_max`.
fn rank_tolerance(shape: (usize, usize), sigma_max: f64) -> f64 {
    (shape.0.max(shape.1) as f64) * f64::EPSILON * sigma_max
}

/// Numerical rank via SVD singular value thresholding.
///
/// `tol` overrides the default `max(m, n) * eps * sigma_max` threshold.
pub fn rank(a: &Array2<f64>, tol: Option<f64>) -> Result<usize> {
    let sv = singular_values(a)?;
    let sigma_max = sv.iter().cloned().fold(0.0, f64::max);
    let tol = tol.unwrap_or_else(|| rank_tolerance(a.dim(), sigma_max));
    Ok(sv.iter().filter(|&&s| s > tol).count())
}

/// Numerical rank of a complex matrix (used for Hautus pencils).
pub fn complex_rank(a: &Array2<Complex<f64>>, tol: Option<f64>) -> Result<usize> {
    if a.is_empty() {
        return Ok(0);
    }
    let (_, sv, _) = a.svd(false, false)?;
    let sigma_max = sv.iter().cloned().fold(0.0, f64::max);
    let tol = tol.unwrap_or_else(|| rank_tolerance(a.dim(), sigma_max));
    Ok(sv.iter().filter(|&&s| s > tol).count())
}

/// Moore-Penrose pseudo-inverse via SVD.
pub fn pinv(a: &Array2<f64>) -> Result<Array2<f64>> {
    let (m, n) = a.dim();
    if a.is_empty() {
        return Ok(Array2::zeros((n, m)));
    }
    let (u, sv, vt) = a.svd(true, true)?;
    let (u, vt) = match (u, vt) {
        (Some(u), Some(vt)) => (u, vt),
        _ => return Err(HinfError::conditioning("SVD returned no singular vectors")),
    };

    let sigma_max = sv.iter().cloned().fold(0.0, f64::max);
    let tol = rank_tolerance((m, n), sigma_max);

    // A+ = V * diag(1/s) * U'
    let mut result = Array2::zeros((n, m));
    for (k, &sk) in sv.iter().enumerate() {
        if sk <= tol {
            continue;
        }
        let v_col = vt.row(k);
        let u_col = u.column(k);
        for i in 0..n {
            for j in 0..m {
                result[(i, j)] += v_col[i] * u_col[j] / sk;
            }
        }
    }
    Ok(result)
}

/// Eigenvalues of a square matrix (DGEEV).
pub fn eigenvalues(a: &Array2<f64>) -> Result<Array1<Complex<f64>>> {
    if a.is_empty() {
        return Ok(Array1::zeros(0));
    }
    let (eigs, _) = a.eig()?;
    Ok(eigs)
}

/// Spectral radius: largest eigenvalue modulus.
pub fn spectral_radius(a: &Array2<f64>) -> Result<f64> {
    Ok(eigenvalues(a)?
        .iter()
        .map(|lambda| lambda.norm())
        .fold(0.0, f64::max))
}

/// Horizontal concatenation `[A B ...]`.
pub fn hstack(blocks: &[&Array2<f64>]) -> Result<Array2<f64>> {
    let views: Vec<ArrayView2<f64>> = blocks.iter().map(|b| b.view()).collect();
    Ok(concatenate(Axis(1), &views)?)
}

/// Vertical concatenation `[A; B; ...]`.
pub fn vstack(blocks: &[&Array2<f64>]) -> Result<Array2<f64>> {
    let views: Vec<ArrayView2<f64>> = blocks.iter().map(|b| b.view()).collect();
    Ok(concatenate(Axis(0), &views)?)
}

/// Assemble a 2×2 block matrix `[A11 A12; A21 A22]`.
pub fn block2x2(
    a11: &Array2<f64>,
    a12: &Array2<f64>,
    a21: &Array2<f64>,
    a22: &Array2<f64>,
) -> Result<Array2<f64>> {
    let top = hstack(&[a11, a12])?;
    let bottom = hstack(&[a21, a22])?;
    vstack(&[&top, &bottom])
}

/// Symmetric part `(A + A') / 2`.
pub fn symmetrize(a: &Array2<f64>) -> Array2<f64> {
    (a + &a.t()) * 0.5
}

/// Largest absolute entry of `A - A'`.
pub fn max_asymmetry(a: &Array2<f64>) -> f64 {
    (a - &a.t())
        .iter()
        .map(|x| x.abs())
        .fold(0.0, f64::max)
}

/// Cholesky factor L with `A = L L'`.
///
/// Fails with [`HinfError::NumericalConditioning`] if A is not positive definite.
pub fn cholesky_lower(a: &Array2<f64>, what: &str) -> Result<Array2<f64>> {
    if a.is_empty() {
        return Ok(Array2::zeros(a.raw_dim()));
    }
    a.cholesky(UPLO::Lower)
        .map_err(|e| HinfError::conditioning(format!("{} is not positive definite: {}", what, e)))
}

/// Cholesky factor U with `A = U' U`.
pub fn cholesky_upper(a: &Array2<f64>, what: &str) -> Result<Array2<f64>> {
    if a.is_empty() {
        return Ok(Array2::zeros(a.raw_dim()));
    }
    a.cholesky(UPLO::Upper)
        .map_err(|e| HinfError::conditioning(format!("{} is not positive definite: {}", what, e)))
}

/// Elementary reflector `H = I - τ v vᵀ` with `H x = β e₁`, in the LAPACK
/// DLARFG convention: `v[0] = 1`, `β = -sign(α) ‖x‖`, `τ = (β - α) / β`.
///
/// On return `x` holds v. Returns `(τ, β)`; τ is zero when x is already a
/// multiple of e₁.
fn elementary_reflector(x: &mut Array1<f64>) -> (f64, f64) {
    if x.is_empty() {
        return (0.0, 0.0);
    }

    let alpha = x[0];
    let tail = x.slice(s![1..]);
    let tail_norm = tail.dot(&tail).sqrt();
    if tail_norm == 0.0 {
        return (0.0, alpha);
    }

    let norm = alpha.hypot(tail_norm);
    let beta = if alpha >= 0.0 { -norm } else { norm };
    let scale = 1.0 / (alpha - beta);
    x.slice_mut(s![1..]).mapv_inplace(|v| v * scale);
    x[0] = 1.0;

    ((beta - alpha) / beta, beta)
}

/// Full Householder QR factorization.
///
/// Returns (Q, R) with Q an M×M orthogonal matrix and R an M×N upper
/// trapezoidal matrix such that `A = Q R`. Unlike the economy factorization,
/// Q includes an orthonormal basis of the orthogonal complement of range(A).
pub fn householder_qr(a: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let (m, n) = a.dim();
    let mut r = a.clone();
    let mut q = Array2::<f64>::eye(m);

    for k in 0..m.min(n) {
        let mut v = r.slice(s![k.., k]).to_owned();
        let (tau, beta) = elementary_reflector(&mut v);
        if tau == 0.0 {
            continue;
        }

        let v_col = v.view().insert_axis(Axis(1));

        // R[k.., k..] -= τ v (vᵀ R[k.., k..])
        let mut r_sub = r.slice_mut(s![k.., k..]);
        let w = r_sub.t().dot(&v).insert_axis(Axis(0));
        r_sub.scaled_add(-tau, &v_col.dot(&w));
        r[(k, k)] = beta;
        r.slice_mut(s![k + 1.., k]).fill(0.0);

        // Q[.., k..] -= τ (Q[.., k..] v) vᵀ
        let mut q_sub = q.slice_mut(s![.., k..]);
        let w = q_sub.dot(&v).insert_axis(Axis(1));
        q_sub.scaled_add(-tau, &w.dot(&v_col.t()));
    }

    (q, r)
}

/// Ordered real Schur decomposition result.
#[derive(Clone, Debug)]
pub struct OrderedSchur {
    /// Orthogonal Schur vectors (N×N); the first `sdim` columns span the
    /// invariant subspace of the selected eigenvalues
    pub z: Array2<f64>,
    /// Quasi-triangular Schur form T with `A = Z T Z'`
    pub t: Array2<f64>,
    /// Number of selected eigenvalues moved to the leading block
    pub sdim: usize,
}

extern "C" fn select_open_left_half(wr: *const f64, _wi: *const f64) -> i32 {
    unsafe { (*wr < 0.0) as i32 }
}

/// Real Schur decomposition with open-left-half-plane eigenvalues leading.
///
/// Wraps LAPACK's DGEES with SORT = 'S'.
pub fn ordered_schur(a: &Array2<f64>) -> Result<OrderedSchur> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(HinfError::DimensionMismatch {
            block: "Schur operand",
            expected: (n, n),
            found: a.dim(),
        });
    }
    if n == 0 {
        return Ok(OrderedSchur {
            z: Array2::zeros((0, 0)),
            t: Array2::zeros((0, 0)),
            sdim: 0,
        });
    }

    let select: lapack::Select2F64 = Some(select_open_left_half);
    let n_i32 = n as i32;

    // Column-major copy for LAPACK
    let mut t: Vec<f64> = a.t().iter().cloned().collect();
    let mut sdim: i32 = 0;
    let mut wr = vec![0.0; n];
    let mut wi = vec![0.0; n];
    let mut vs = vec![0.0; n * n];
    let mut bwork = vec![0; n];
    let mut info: i32 = 0;

    // Workspace query (lwork = -1)
    let mut work_query = [0.0f64];
    unsafe {
        lapack::dgees(
            b'V',
            b'S',
            select,
            n_i32,
            &mut t,
            n_i32,
            &mut sdim,
            &mut wr,
            &mut wi,
            &mut vs,
            n_i32,
            &mut work_query,
            -1,
            &mut bwork,
            &mut info,
        );
    }
    if info != 0 {
        return Err(HinfError::conditioning(format!(
            "DGEES workspace query failed with INFO={}",
            info
        )));
    }

    let optimal_lwork = (work_query[0] as usize).max(3 * n);
    let mut work = vec![0.0f64; optimal_lwork];
    unsafe {
        lapack::dgees(
            b'V',
            b'S',
            select,
            n_i32,
            &mut t,
            n_i32,
            &mut sdim,
            &mut wr,
            &mut wi,
            &mut vs,
            n_i32,
            &mut work,
            optimal_lwork as i32,
            &mut bwork,
            &mut info,
        );
    }
    // INFO = N+1: eigenvalues too close to reorder; N+2: rounding changed
    // the selection. Both leave the subspace untrustworthy.
    if info != 0 {
        return Err(HinfError::conditioning(format!(
            "DGEES failed with INFO={}",
            info
        )));
    }

    Ok(OrderedSchur {
        z: Array2::from_shape_vec((n, n).f(), vs)?,
        t: Array2::from_shape_vec((n, n).f(), t)?,
        sdim: sdim as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_solve_square() {
        let a = arr2(&[[4.0, 1.0], [2.0, 3.0]]);
        let b = arr2(&[[1.0, 0.0], [0.0, 1.0]]);
        let x = solve(&a, &b).unwrap();
        let back = a.dot(&x);
        assert_abs_diff_eq!(back, b, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_singular() {
        let a = arr2(&[[1.0, 2.0], [2.0, 4.0]]);
        let b = Array2::<f64>::eye(2);
        let err = solve(&a, &b).unwrap_err();
        assert!(matches!(err, HinfError::NumericalConditioning(_)));
    }

    #[test]
    fn test_solve_empty() {
        let a: Array2<f64> = Array2::zeros((0, 0));
        let b: Array2<f64> = Array2::zeros((0, 3));
        let x = solve(&a, &b).unwrap();
        assert_eq!(x.dim(), (0, 3));
    }

    #[test]
    fn test_solve_right() {
        let a = arr2(&[[2.0, 0.0], [1.0, 1.0]]);
        let b = arr2(&[[1.0, 2.0]]);
        let x = solve_right(&b, &a).unwrap();
        assert_abs_diff_eq!(x.dot(&a), b, epsilon = 1e-12);
    }

    #[test]
    fn test_block2x2() {
        let a = Array2::<f64>::eye(2);
        let b = Array2::<f64>::zeros((2, 1));
        let c = Array2::<f64>::ones((1, 2));
        let d = arr2(&[[5.0]]);
        let m = block2x2(&a, &b, &c, &d).unwrap();
        assert_eq!(m.dim(), (3, 3));
        assert_eq!(m[(2, 0)], 1.0);
        assert_eq!(m[(2, 2)], 5.0);
        assert_eq!(m[(0, 2)], 0.0);
    }

    #[test]
    fn test_rank() {
        let a = arr2(&[[1.0, 2.0], [2.0, 4.0], [0.0, 0.0]]);
        assert_eq!(rank(&a, None).unwrap(), 1);
        assert_eq!(rank(&Array2::<f64>::eye(3), None).unwrap(), 3);
        assert_eq!(rank(&Array2::<f64>::zeros((2, 2)), None).unwrap(), 0);
    }

    #[test]
    fn test_pinv_full_column_rank() {
        let a = arr2(&[[1.0, 0.0], [0.0, 2.0], [0.0, 0.0]]);
        let p = pinv(&a).unwrap();
        assert_eq!(p.dim(), (2, 3));
        assert_abs_diff_eq!(p.dot(&a), Array2::<f64>::eye(2), epsilon = 1e-12);
    }

    #[test]
    fn test_elementary_reflector() {
        let mut x = arr1(&[3.0, 4.0]);
        let (tau, beta) = elementary_reflector(&mut x);
        assert_abs_diff_eq!(tau, 1.6, epsilon = 1e-15);
        assert_abs_diff_eq!(beta, -5.0, epsilon = 1e-15);
        assert_abs_diff_eq!(x, arr1(&[1.0, 0.5]), epsilon = 1e-15);

        // Already along e1: no reflection
        let mut e = arr1(&[-2.0, 0.0, 0.0]);
        assert_eq!(elementary_reflector(&mut e), (0.0, -2.0));
    }

    #[test]
    fn test_householder_qr_tall() {
        let a = arr2(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let (q, r) = householder_qr(&a);
        assert_eq!(q.dim(), (3, 3));
        assert_eq!(r.dim(), (3, 2));
        assert_abs_diff_eq!(q.dot(&r), a, epsilon = 1e-12);
        assert_abs_diff_eq!(q.t().dot(&q), Array2::<f64>::eye(3), epsilon = 1e-12);
        assert_abs_diff_eq!(r[(1, 0)], 0.0);
        assert_abs_diff_eq!(r[(2, 0)], 0.0);
        assert_abs_diff_eq!(r[(2, 1)], 0.0);
    }

    #[test]
    fn test_householder_qr_wide() {
        let a = arr2(&[[1.0, 2.0, 3.0], [0.5, -1.0, 2.0]]);
        let (q, r) = householder_qr(&a);
        assert_eq!(q.dim(), (2, 2));
        assert_abs_diff_eq!(q.dot(&r), a, epsilon = 1e-12);
        assert_abs_diff_eq!(r[(1, 0)], 0.0);
    }

    #[test]
    fn test_ordered_schur_moves_stable_block_first() {
        let a = arr2(&[[1.0, 0.0, 0.0], [0.0, -2.0, 0.0], [1.0, 0.0, -3.0]]);
        let schur = ordered_schur(&a).unwrap();
        assert_eq!(schur.sdim, 2);

        let z = &schur.z;
        assert_abs_diff_eq!(z.t().dot(z), Array2::<f64>::eye(3), epsilon = 1e-12);
        assert_abs_diff_eq!(z.dot(&schur.t).dot(&z.t()), a, epsilon = 1e-12);
        assert!(schur.t[(0, 0)] < 0.0);
        assert!(schur.t[(1, 1)] < 0.0);
        assert_abs_diff_eq!(schur.t[(2, 2)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_spectral_radius() {
        let a = arr2(&[[0.0, -2.0], [2.0, 0.0]]);
        assert_abs_diff_eq!(spectral_radius(&a).unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = arr2(&[[1.0, 0.0], [0.0, -1.0]]);
        assert!(matches!(
            cholesky_lower(&a, "M").unwrap_err(),
            HinfError::NumericalConditioning(_)
        ));
        let u = cholesky_upper(&arr2(&[[4.0, 2.0], [2.0, 5.0]]), "M").unwrap();
        assert_abs_diff_eq!(
            u.t().dot(&u),
            arr2(&[[4.0, 2.0], [2.0, 5.0]]),
            epsilon = 1e-12
        );
    }
}
