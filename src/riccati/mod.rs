//! H-infinity Riccati Equations and Feasibility Test
//!
//! For a plant in canonical coordinates and a candidate level γ, the two
//! H-infinity Riccati equations are solved through their Hamiltonian
//! matrices:
//!
//! ```text
//!     R  = D1.' D1. - diag(γ² I_m1, 0)         D1. = [D11 D12]
//!     R~ = D.1 D.1' - diag(γ² I_p1, 0)         D.1 = [D11; D21]
//!
//!     HX = [A 0; -C1'C1 -A'] - [B; -C1'D1.] R⁻¹ [D1.'C1  B']
//!     HY = [A' 0; -B1B1' -A] - [C'; -B1D.1'] R~⁻¹ [D.1B1'  C]
//! ```
//!
//! The stabilizing solution of each is read off the stable invariant
//! subspace of the ordered real Schur form. γ is admissible when both
//! solutions are positive semidefinite and ρ(Xinf Yinf) <= γ².

use ndarray::{s, Array2};

use crate::error::{HinfError, Result};
use crate::linalg;
use crate::plant::GeneralizedPlant;

/// Riccati solutions and state-feedback / output-injection gains at one γ.
#[derive(Clone, Debug)]
pub struct RiccatiCertificate {
    /// Stabilizing solution of the control Riccati equation (N×N)
    pub x: Array2<f64>,
    /// Stabilizing solution of the filter Riccati equation (N×N)
    pub y: Array2<f64>,
    /// State feedback gain, (M1+M2)×N
    pub f: Array2<f64>,
    /// Output injection gain, N×(P1+P2)
    pub h: Array2<f64>,
    /// Performance level the certificate was computed for
    pub gamma: f64,
}

impl RiccatiCertificate {
    /// Apply the feasibility predicate to this certificate.
    pub fn is_feasible(&self, tolerance: f64) -> bool {
        is_feasible(&self.x, &self.y, self.gamma, tolerance)
    }

    /// Largest deviation from symmetry over Xinf and Yinf.
    pub fn max_asymmetry(&self) -> f64 {
        linalg::max_asymmetry(&self.x).max(linalg::max_asymmetry(&self.y))
    }
}

/// Solve the two H-infinity Riccati equations at level `gamma`.
///
/// `plant` must already be in canonical coordinates (see
/// [`crate::canonical::transform_plant_to_canonical`]).
///
/// # Errors
///
/// [`HinfError::NumericalConditioning`] when R or R~ is singular, when a
/// Hamiltonian does not have exactly N stable eigenvalues, or when the
/// leading block of its stable subspace basis cannot be inverted. The
/// γ-search treats all of these as an infeasible γ.
pub fn solve_matrix_equations(plant: &GeneralizedPlant, gamma: f64) -> Result<RiccatiCertificate> {
    let dims = plant.dims();
    let n = dims.n;
    let gamma2 = gamma * gamma;

    let b = plant.b()?;
    let c = plant.c()?;
    let d1_row = plant.d1_row()?;
    let d1_col = plant.d1_col()?;

    // R = [D11 D12]'[D11 D12] - diag(γ²I, 0)
    let mut r = d1_row.t().dot(&d1_row);
    for i in 0..dims.m1 {
        r[(i, i)] -= gamma2;
    }
    // R~ = [D11; D21][D11; D21]' - diag(γ²I, 0)
    let mut r_tilde = d1_col.dot(&d1_col.t());
    for i in 0..dims.p1 {
        r_tilde[(i, i)] -= gamma2;
    }

    // Control Hamiltonian
    let hx_base = linalg::block2x2(
        plant.a(),
        &Array2::zeros((n, n)),
        &(-plant.c1().t().dot(plant.c1())),
        &(-plant.a().t().to_owned()),
    )?;
    let hx_left = linalg::vstack(&[&b, &(-plant.c1().t().dot(&d1_row))])?;
    let hx_right = linalg::hstack(&[&d1_row.t().dot(plant.c1()), &b.t().to_owned()])?;
    let hx = hx_base - hx_left.dot(&linalg::solve(&r, &hx_right)?);

    // Filter Hamiltonian
    let hy_base = linalg::block2x2(
        &plant.a().t().to_owned(),
        &Array2::zeros((n, n)),
        &(-plant.b1().dot(&plant.b1().t())),
        &(-plant.a()),
    )?;
    let hy_left = linalg::vstack(&[&c.t().to_owned(), &(-plant.b1().dot(&d1_col.t()))])?;
    let hy_right = linalg::hstack(&[&d1_col.dot(&plant.b1().t()), &c])?;
    let hy = hy_base - hy_left.dot(&linalg::solve(&r_tilde, &hy_right)?);

    let x = stabilizing_solution(&hx, n, "X")?;
    let y = stabilizing_solution(&hy, n, "Y")?;

    // F = -R⁻¹ (D1.'C1 + B'X)
    let f = -linalg::solve(&r, &(d1_row.t().dot(plant.c1()) + b.t().dot(&x)))?;
    // H = -(B1 D.1' + Y C') R~⁻¹
    let h = -linalg::solve_right(&(plant.b1().dot(&d1_col.t()) + y.dot(&c.t())), &r_tilde)?;

    Ok(RiccatiCertificate {
        x,
        y,
        f,
        h,
        gamma,
    })
}

/// Stabilizing Riccati solution `U21 * inv(U11)` from a 2N×2N Hamiltonian.
fn stabilizing_solution(hamiltonian: &Array2<f64>, n: usize, name: &str) -> Result<Array2<f64>> {
    let schur = linalg::ordered_schur(hamiltonian)?;
    if schur.sdim != n {
        return Err(HinfError::conditioning(format!(
            "Hamiltonian for {} has {} stable eigenvalues, expected {}",
            name, schur.sdim, n
        )));
    }

    let u11 = schur.z.slice(s![..n, ..n]).to_owned();
    let u21 = schur.z.slice(s![n.., ..n]).to_owned();
    let solution = linalg::solve_right(&u21, &u11).map_err(|e| match e {
        HinfError::NumericalConditioning(msg) => HinfError::conditioning(format!(
            "stable subspace of the {} Hamiltonian is ill-conditioned: {}",
            name, msg
        )),
        other => other,
    })?;

    Ok(linalg::symmetrize(&solution))
}

/// Feasibility predicate for a pair of Riccati solutions.
///
/// Both solutions must have eigenvalues with real part `>= -tolerance`, and
/// the spectral radius of `X Y` must not exceed γ². An eigenvalue failure is
/// reported as infeasible.
pub fn is_feasible(x: &Array2<f64>, y: &Array2<f64>, gamma: f64, tolerance: f64) -> bool {
    let nonnegative = |m: &Array2<f64>| -> Result<bool> {
        Ok(linalg::eigenvalues(m)?
            .iter()
            .all(|lambda| lambda.re >= -tolerance))
    };

    let check = || -> Result<bool> {
        if !nonnegative(x)? || !nonnegative(y)? {
            return Ok(false);
        }
        let rho = linalg::spectral_radius(&x.dot(y))?;
        Ok(rho / (gamma * gamma) <= 1.0)
    };

    match check() {
        Ok(feasible) => feasible,
        Err(e) => {
            log::debug!("feasibility test failed at gamma = {}: {}", gamma, e);
            false
        }
    }
}

/// Lower bound on achievable γ from the feedthrough D11.
///
/// With D11 partitioned conformally to the canonical D12 and D21,
///
/// ```text
///     D11 = [D1111 D1112; D1121 D1122]
/// ```
///
/// no controller can achieve a level below
/// `max(σ̄[D1111 D1112], σ̄[D1111; D1121])`.
pub fn feedthrough_bound(plant: &GeneralizedPlant) -> Result<f64> {
    let dims = plant.dims();
    let rows = dims.p1.saturating_sub(dims.m2);
    let cols = dims.m1.saturating_sub(dims.p2);

    let upper_rows = plant.d11().slice(s![..rows, ..]).to_owned();
    let left_cols = plant.d11().slice(s![.., ..cols]).to_owned();

    Ok(linalg::max_singular_value(&upper_rows)?.max(linalg::max_singular_value(&left_cols)?))
}
