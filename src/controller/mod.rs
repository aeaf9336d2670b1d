//! Controller Reconstruction
//!
//! Builds the central H-infinity controller from a feasible Riccati
//! certificate. All formulas work in the canonical coordinates produced by
//! [`crate::canonical`], where D12 = [0; I] and D21 = [0 I]. D11 is
//! partitioned conformally,
//!
//! ```text
//!     D11 = [D1111 D1112]     D1111: (p1-m2) x (m1-p2)
//!           [D1121 D1122]
//! ```
//!
//! and the controller is returned in the caller's original coordinates.

use ndarray::{s, Array2};

use crate::canonical::CanonicalPlant;
use crate::error::{HinfError, Result};
use crate::linalg;
use crate::plant::StateSpace;
use crate::riccati::RiccatiCertificate;

/// Central controller feedthrough terms in canonical coordinates.
struct Feedthrough {
    d11hat: Array2<f64>,
    d12hat: Array2<f64>,
    d21hat: Array2<f64>,
}

/// D11hat, D12hat and D21hat from the partitioned D11.
fn feedthrough_terms(d11: &Array2<f64>, rows: usize, cols: usize, gamma: f64) -> Result<Feedthrough> {
    let gamma2 = gamma * gamma;

    let d1111 = d11.slice(s![..rows, ..cols]).to_owned();
    let d1112 = d11.slice(s![..rows, cols..]).to_owned();
    let d1121 = d11.slice(s![rows.., ..cols]).to_owned();
    let d1122 = d11.slice(s![rows.., cols..]).to_owned();

    // γ²I - D1111 D1111' and γ²I - D1111' D1111
    let gram_rows = Array2::<f64>::eye(rows) * gamma2 - d1111.dot(&d1111.t());
    let gram_cols = Array2::<f64>::eye(cols) * gamma2 - d1111.t().dot(&d1111);

    let rows_solve = linalg::solve(&gram_rows, &d1112)?;

    let d11hat = -d1121.dot(&d1111.t()).dot(&rows_solve) - &d1122;

    let m2 = d1121.nrows();
    let p2 = d1112.ncols();
    let d12hat_sq = Array2::<f64>::eye(m2) - d1121.dot(&linalg::solve(&gram_cols, &d1121.t().to_owned())?);
    let d21hat_sq = Array2::<f64>::eye(p2) - d1112.t().dot(&rows_solve);

    Ok(Feedthrough {
        d11hat,
        d12hat: linalg::cholesky_lower(&d12hat_sq, "I - D1121 (γ²I - D1111'D1111)⁻¹ D1121'")?,
        d21hat: linalg::cholesky_upper(&d21hat_sq, "I - D1112' (γ²I - D1111 D1111')⁻¹ D1112")?,
    })
}

/// Reconstruct the controller `(Ac, Bc, Cc, Dc)` from a feasible certificate.
///
/// The certificate must have been computed on `canonical.plant`. The
/// controller maps measurements y to controls u in the original
/// coordinates of the plant passed to
/// [`crate::canonical::transform_plant_to_canonical`].
///
/// # Errors
///
/// [`HinfError::NumericalConditioning`] if a Cholesky factorization fails or
/// `I - Y X / γ²` is singular.
pub fn synthesize_controller(
    canonical: &CanonicalPlant,
    cert: &RiccatiCertificate,
) -> Result<StateSpace> {
    let plant = &canonical.plant;
    let dims = plant.dims();
    let (n, m1, p1) = (dims.n, dims.m1, dims.p1);
    let gamma = cert.gamma;

    if dims.p1 < dims.m2 || dims.m1 < dims.p2 {
        return Err(HinfError::Unsupported(format!(
            "need p1 >= m2 and m1 >= p2, got p1 = {}, m2 = {}, m1 = {}, p2 = {}",
            dims.p1, dims.m2, dims.m1, dims.p2
        )));
    }
    let rows = p1 - dims.m2;
    let cols = m1 - dims.p2;

    let Feedthrough {
        d11hat,
        d12hat,
        d21hat,
    } = feedthrough_terms(plant.d11(), rows, cols, gamma)?;

    // F = [F11; F12; F2], H = [H11 H12 H2]
    let f12 = cert.f.slice(s![cols..m1, ..]).to_owned();
    let f2 = cert.f.slice(s![m1.., ..]).to_owned();
    let h12 = cert.h.slice(s![.., rows..p1]).to_owned();
    let h2 = cert.h.slice(s![.., p1..]).to_owned();

    // Right division by Zinv applies (I - Y X / γ²)⁻¹ to the C side
    let zinv = Array2::<f64>::eye(n) - cert.y.dot(&cert.x) / (gamma * gamma);
    let z_right = |lhs: &Array2<f64>| {
        linalg::solve_right(lhs, &zinv).map_err(|e| match e {
            HinfError::NumericalConditioning(msg) => HinfError::conditioning(format!(
                "I - Y X / γ² is singular; γ = {} lies on the feasibility boundary ρ(XY) = γ²: {}",
                gamma, msg
            )),
            other => other,
        })
    };

    let b2hat = -(plant.b2() + &h12).dot(&d12hat);
    let c2hat = d21hat.dot(&z_right(&(plant.c2() + &f12))?);
    let b1hat = h2 + b2hat.dot(&linalg::solve(&d12hat, &d11hat)?);
    let c1hat = -z_right(&f2)? + d11hat.dot(&linalg::solve(&d21hat, &c2hat)?);
    let ahat = plant.a() + &cert.h.dot(&plant.c()?) + b2hat.dot(&linalg::solve(&d12hat, &c1hat)?);

    // Undo the input/output scalings: u = R12 u~, y~ = L21 y
    let r12 = &canonical.scaling12.right;
    let l21 = &canonical.scaling21.left;
    StateSpace::new(
        ahat,
        b1hat.dot(l21),
        r12.dot(&c1hat),
        r12.dot(&d11hat).dot(l21),
    )
}
