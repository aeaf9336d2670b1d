//! Closed-Loop Analysis
//!
//! Interconnects a generalized plant with a controller and evaluates the
//! resulting system: stability of the state matrix and the gain from the
//! disturbances w to the performance outputs z over frequency.

use ndarray::{s, Array1, Array2};
use ndarray_linalg::{Factorize, ReciprocalConditionNum, Solve, SVD};
use num_complex::Complex64;

use crate::error::{HinfError, Result};
use crate::linalg::{self, RCOND_MIN};
use crate::plant::{GeneralizedPlant, StateSpace};

/// Lower linear-fractional interconnection of `plant` with `controller`.
///
/// The controller closes the loop from y to u. The result maps w to z and
/// has state `[x; x_c]`. With D22 non-zero the loop equation
/// `y = C2 x + D21 w + D22 u` is solved for y, which requires
/// `I - D22 Dc` to be invertible.
///
/// # Errors
///
/// [`HinfError::DimensionMismatch`] if the controller's own blocks disagree
/// or it does not fit the plant's y/u channels, [`HinfError::NumericalConditioning`] if the loop is
/// ill-posed.
pub fn lower_lft(plant: &GeneralizedPlant, controller: &StateSpace) -> Result<StateSpace> {
    controller.validate()?;
    let dims = plant.dims();
    if controller.n_inputs() != dims.p2 || controller.n_outputs() != dims.m2 {
        return Err(HinfError::DimensionMismatch {
            block: "controller D",
            expected: (dims.m2, dims.p2),
            found: controller.d.dim(),
        });
    }

    let (ak, bk, ck, dk) = (&controller.a, &controller.b, &controller.c, &controller.d);

    // y = S (C2 x + D22 Ck xk + D21 w), S = (I - D22 Dk)⁻¹
    let loop_gain = Array2::<f64>::eye(dims.p2) - plant.d22().dot(dk);
    let y_rhs = linalg::hstack(&[plant.c2(), &plant.d22().dot(ck), plant.d21()])?;
    let y_coef = linalg::solve(&loop_gain, &y_rhs).map_err(|e| match e {
        HinfError::NumericalConditioning(msg) => {
            HinfError::conditioning(format!("ill-posed interconnection, I - D22 Dc: {}", msg))
        }
        other => other,
    })?;

    let n = dims.n;
    let nk = controller.n_states();
    let y_x = y_coef.slice(s![.., ..n]).to_owned();
    let y_k = y_coef.slice(s![.., n..n + nk]).to_owned();
    let y_w = y_coef.slice(s![.., n + nk..]).to_owned();

    // u = Ck xk + Dk y
    let u_x = dk.dot(&y_x);
    let u_k = ck + &dk.dot(&y_k);
    let u_w = dk.dot(&y_w);

    let a = linalg::block2x2(
        &(plant.a() + &plant.b2().dot(&u_x)),
        &plant.b2().dot(&u_k),
        &bk.dot(&y_x),
        &(ak + &bk.dot(&y_k)),
    )?;
    let b = linalg::vstack(&[&(plant.b1() + &plant.b2().dot(&u_w)), &bk.dot(&y_w)])?;
    let c = linalg::hstack(&[&(plant.c1() + &plant.d12().dot(&u_x)), &plant.d12().dot(&u_k)])?;
    let d = plant.d11() + &plant.d12().dot(&u_w);

    StateSpace::new(a, b, c, d)
}

impl StateSpace {
    /// True if every eigenvalue of A lies in the open left half-plane.
    pub fn is_stable(&self) -> Result<bool> {
        Ok(linalg::eigenvalues(&self.a)?.iter().all(|l| l.re < 0.0))
    }

    /// Frequency response `C (jωI - A)⁻¹ B + D` at angular frequency `omega`.
    ///
    /// # Errors
    ///
    /// [`HinfError::NumericalConditioning`] if `jω` is (numerically) an
    /// eigenvalue of A.
    pub fn freqresp(&self, omega: f64) -> Result<Array2<Complex64>> {
        let n = self.n_states();
        let to_complex = |m: &Array2<f64>| m.mapv(|v| Complex64::new(v, 0.0));

        let d = to_complex(&self.d);
        if n == 0 {
            return Ok(d);
        }

        let jw = Complex64::new(0.0, omega);
        let resolvent = Array2::from_shape_fn((n, n), |(i, j)| {
            let diag = if i == j { jw } else { Complex64::new(0.0, 0.0) };
            diag - self.a[(i, j)]
        });

        let lu = resolvent.factorize().map_err(|e| {
            HinfError::conditioning(format!("jw = {}j is a pole of the system: {}", omega, e))
        })?;
        let rcond = lu.rcond()?;
        if !(rcond > RCOND_MIN) {
            return Err(HinfError::conditioning(format!(
                "jw = {}j is a pole of the system (rcond = {:e})",
                omega, rcond
            )));
        }

        let b = to_complex(&self.b);
        let mut x = Array2::<Complex64>::zeros((n, b.ncols()));
        for (j, col) in b.columns().into_iter().enumerate() {
            let xj: Array1<Complex64> = lu.solve(&col.to_owned())?;
            x.column_mut(j).assign(&xj);
        }

        Ok(to_complex(&self.c).dot(&x) + d)
    }

    /// Largest singular value of the frequency response over `frequencies`.
    ///
    /// A lower bound on the H-infinity norm for a stable system.
    pub fn peak_gain(&self, frequencies: &[f64]) -> Result<f64> {
        let mut peak = 0.0_f64;
        for &omega in frequencies {
            let g = self.freqresp(omega)?;
            if g.is_empty() {
                continue;
            }
            let (_, sv, _) = g.svd(false, false)?;
            peak = sv.iter().cloned().fold(peak, f64::max);
        }
        Ok(peak)
    }
}
