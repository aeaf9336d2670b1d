//! Synthesis Assumption Checks
//!
//! The Glover-Doyle formulas are only meaningful when the generalized plant
//! satisfies a handful of structural conditions. These checks report, never
//! fail: a violated assumption is logged as a warning and signalled through
//! the return value, and the caller decides whether to continue.

use std::fmt;

use ndarray::Array2;
use num_complex::Complex;

use crate::error::Result;
use crate::linalg;
use crate::plant::GeneralizedPlant;

/// A structural precondition of H-infinity synthesis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assumption {
    /// (A, B2) is stabilizable
    Stabilizable,
    /// (A, C2) is detectable
    Detectable,
    /// D12 has full column rank
    D12FullColumnRank,
    /// D21 has full row rank
    D21FullRowRank,
    /// A - B2 * pinv(D12) * C1 has full rank
    ControlChannelNonsingular,
    /// A - B1 * pinv(D21) * C2 has full rank
    MeasurementChannelNonsingular,
}

impl fmt::Display for Assumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Assumption::Stabilizable => "(A, B2) is not stabilizable",
            Assumption::Detectable => "(A, C2) is not detectable",
            Assumption::D12FullColumnRank => "D12 does not have full column rank",
            Assumption::D21FullRowRank => "D21 does not have full row rank",
            Assumption::ControlChannelNonsingular => {
                "A - B2*pinv(D12)*C1 is rank deficient (invalid zero at the origin)"
            }
            Assumption::MeasurementChannelNonsingular => {
                "A - B1*pinv(D21)*C2 is rank deficient (invalid zero at the origin)"
            }
        };
        write!(f, "{}", text)
    }
}

/// Result of the assumption checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssumptionCheck {
    Satisfied,
    /// First assumption that failed; later checks were not run
    Violated(Assumption),
}

impl AssumptionCheck {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, AssumptionCheck::Satisfied)
    }
}

/// Check all synthesis assumptions, logging a warning for the first failure.
///
/// Returns `true` if every assumption holds. A numerical failure inside one
/// of the checks counts as a violation.
///
/// # Examples
///
/// ```
/// use hinfsyn_rs::assumptions::check_assumptions;
/// use hinfsyn_rs::plant::GeneralizedPlant;
/// use ndarray::{arr2, Array2};
///
/// let plant = GeneralizedPlant::new(
///     arr2(&[[1.0]]),
///     arr2(&[[1.0, 0.0]]),
///     arr2(&[[1.0]]),
///     arr2(&[[1.0], [0.0]]),
///     arr2(&[[1.0]]),
///     Array2::zeros((2, 2)),
///     arr2(&[[0.0], [1.0]]),
///     arr2(&[[0.0, 1.0]]),
///     Array2::zeros((1, 1)),
/// )
/// .unwrap();
/// assert!(check_assumptions(&plant));
/// ```
pub fn check_assumptions(plant: &GeneralizedPlant) -> bool {
    match assess(plant) {
        Ok(AssumptionCheck::Satisfied) => true,
        Ok(AssumptionCheck::Violated(assumption)) => {
            log::warn!("synthesis assumption violated: {}", assumption);
            false
        }
        Err(e) => {
            log::warn!("synthesis assumption check failed: {}", e);
            false
        }
    }
}

/// Run the checks in order and report the first violated assumption.
pub fn assess(plant: &GeneralizedPlant) -> Result<AssumptionCheck> {
    use Assumption::*;

    let dims = plant.dims();

    if !is_stabilizable(plant.a(), plant.b2())? {
        return Ok(AssumptionCheck::Violated(Stabilizable));
    }
    if !is_detectable(plant.a(), plant.c2())? {
        return Ok(AssumptionCheck::Violated(Detectable));
    }
    if linalg::rank(plant.d12(), None)? != dims.m2 {
        return Ok(AssumptionCheck::Violated(D12FullColumnRank));
    }
    if linalg::rank(plant.d21(), None)? != dims.p2 {
        return Ok(AssumptionCheck::Violated(D21FullRowRank));
    }

    let control = plant.a() - &plant.b2().dot(&linalg::pinv(plant.d12())?).dot(plant.c1());
    if linalg::rank(&control, None)? != dims.n {
        return Ok(AssumptionCheck::Violated(ControlChannelNonsingular));
    }
    let measurement = plant.a() - &plant.b1().dot(&linalg::pinv(plant.d21())?).dot(plant.c2());
    if linalg::rank(&measurement, None)? != dims.n {
        return Ok(AssumptionCheck::Violated(MeasurementChannelNonsingular));
    }

    Ok(AssumptionCheck::Satisfied)
}

/// Hautus test for stabilizability of (A, B).
///
/// For every eigenvalue λ of A with Re(λ) >= 0, `[λI - A, B]` must have
/// full row rank.
pub fn is_stabilizable(a: &Array2<f64>, b: &Array2<f64>) -> Result<bool> {
    hautus_test(a, b, false)
}

/// Hautus test for detectability of (A, C).
///
/// For every eigenvalue λ of A with Re(λ) >= 0, `[λI - A; C]` must have
/// full column rank.
pub fn is_detectable(a: &Array2<f64>, c: &Array2<f64>) -> Result<bool> {
    hautus_test(a, c, true)
}

fn hautus_test(a: &Array2<f64>, l: &Array2<f64>, vertical_stack: bool) -> Result<bool> {
    let n = a.nrows();
    if n == 0 {
        return Ok(true);
    }

    for lambda in linalg::eigenvalues(a)?.iter() {
        if lambda.re < 0.0 {
            continue;
        }

        let pencil = if vertical_stack {
            Array2::from_shape_fn((n + l.nrows(), n), |(i, j)| {
                if i < n {
                    shifted_entry(a, *lambda, i, j)
                } else {
                    Complex::new(l[(i - n, j)], 0.0)
                }
            })
        } else {
            Array2::from_shape_fn((n, n + l.ncols()), |(i, j)| {
                if j < n {
                    shifted_entry(a, *lambda, i, j)
                } else {
                    Complex::new(l[(i, j - n)], 0.0)
                }
            })
        };

        if linalg::complex_rank(&pencil, None)? != n {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Entry (i, j) of `λI - A`.
fn shifted_entry(a: &Array2<f64>, lambda: Complex<f64>, i: usize, j: usize) -> Complex<f64> {
    let diag = if i == j { lambda } else { Complex::new(0.0, 0.0) };
    diag - a[(i, j)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_stabilizable_unstable_controllable() {
        let a = arr2(&[[1.0, 1.0], [0.0, 2.0]]);
        let b = arr2(&[[0.0], [1.0]]);
        assert!(is_stabilizable(&a, &b).unwrap());
    }

    #[test]
    fn test_uncontrollable_unstable_mode() {
        // Mode at +1 is not reachable from the input
        let a = arr2(&[[1.0, 0.0], [0.0, -1.0]]);
        let b = arr2(&[[0.0], [1.0]]);
        assert!(!is_stabilizable(&a, &b).unwrap());
    }

    #[test]
    fn test_uncontrollable_stable_mode_is_fine() {
        let a = arr2(&[[-1.0, 0.0], [0.0, 2.0]]);
        let b = arr2(&[[0.0], [1.0]]);
        assert!(is_stabilizable(&a, &b).unwrap());
    }

    #[test]
    fn test_detectable_complex_mode() {
        // Unstable oscillatory mode observed through the first state
        let a = arr2(&[[0.5, 2.0], [-2.0, 0.5]]);
        let c = arr2(&[[1.0, 0.0]]);
        assert!(is_detectable(&a, &c).unwrap());

        let c_blind = arr2(&[[0.0, 0.0]]);
        assert!(!is_detectable(&a, &c_blind).unwrap());
    }

    #[test]
    fn test_singular_d12_rejected() {
        let plant = GeneralizedPlant::new(
            arr2(&[[-1.0]]),
            arr2(&[[1.0, 0.0]]),
            arr2(&[[1.0]]),
            arr2(&[[1.0], [0.0]]),
            arr2(&[[1.0]]),
            Array2::zeros((2, 2)),
            Array2::zeros((2, 1)),
            arr2(&[[0.0, 1.0]]),
            Array2::zeros((1, 1)),
        )
        .unwrap();
        assert_eq!(
            assess(&plant).unwrap(),
            AssumptionCheck::Violated(Assumption::D12FullColumnRank)
        );
        assert!(!check_assumptions(&plant));
    }

    #[test]
    fn test_zero_at_origin_rejected() {
        // A - B2 * pinv(D12) * C1 = 0 for an integrator plant
        let plant = GeneralizedPlant::new(
            arr2(&[[0.0]]),
            arr2(&[[1.0, 0.0]]),
            arr2(&[[1.0]]),
            arr2(&[[1.0], [0.0]]),
            arr2(&[[1.0]]),
            Array2::zeros((2, 2)),
            arr2(&[[0.0], [1.0]]),
            arr2(&[[0.0, 1.0]]),
            Array2::zeros((1, 1)),
        )
        .unwrap();
        assert_eq!(
            assess(&plant).unwrap(),
            AssumptionCheck::Violated(Assumption::ControlChannelNonsingular)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Assumption::D21FullRowRank.to_string(),
            "D21 does not have full row rank"
        );
    }
}
