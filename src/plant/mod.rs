//! Plant and Controller Data Model
//!
//! A generalized plant partitions its inputs into disturbances w (m1) and
//! controls u (m2), and its outputs into performance signals z (p1) and
//! measurements y (p2):
//!
//! ```text
//!     dx/dt = A x + B1 w + B2 u
//!         z = C1 x + D11 w + D12 u
//!         y = C2 x + D21 w + D22 u
//! ```
//!
//! Plants are validated on construction and never mutated afterwards; every
//! transformation in this crate returns a new value.

use ndarray::Array2;

use crate::error::{HinfError, Result};
use crate::linalg;

/// Signal dimensions of a generalized plant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    /// Number of states
    pub n: usize,
    /// Number of disturbance inputs
    pub m1: usize,
    /// Number of control inputs
    pub m2: usize,
    /// Number of performance outputs
    pub p1: usize,
    /// Number of measured outputs
    pub p2: usize,
}

/// Generalized (weighted) plant in state-space form.
///
/// The blocks are private and only reachable through read accessors, so a
/// plant that exists always has consistent block sizes.
#[derive(Clone, Debug)]
pub struct GeneralizedPlant {
    a: Array2<f64>,
    b1: Array2<f64>,
    b2: Array2<f64>,
    c1: Array2<f64>,
    c2: Array2<f64>,
    d11: Array2<f64>,
    d12: Array2<f64>,
    d21: Array2<f64>,
    d22: Array2<f64>,
}

fn check_block(block: &'static str, m: &Array2<f64>, expected: (usize, usize)) -> Result<()> {
    if m.dim() != expected {
        return Err(HinfError::DimensionMismatch {
            block,
            expected,
            found: m.dim(),
        });
    }
    Ok(())
}

impl GeneralizedPlant {
    /// Build a plant, checking every block against the sizes implied by
    /// A (n), B1 (m1), B2 (m2), C1 (p1) and C2 (p2).
    ///
    /// # Examples
    ///
    /// ```
    /// use hinfsyn_rs::plant::GeneralizedPlant;
    /// use ndarray::arr2;
    ///
    /// let plant = GeneralizedPlant::new(
    ///     arr2(&[[1.0]]),
    ///     arr2(&[[1.0, 0.0]]),
    ///     arr2(&[[1.0]]),
    ///     arr2(&[[1.0], [0.0]]),
    ///     arr2(&[[1.0]]),
    ///     arr2(&[[0.0, 0.0], [0.0, 0.0]]),
    ///     arr2(&[[0.0], [1.0]]),
    ///     arr2(&[[0.0, 1.0]]),
    ///     arr2(&[[0.0]]),
    /// )
    /// .unwrap();
    /// assert_eq!(plant.dims().m1, 2);
    /// ```
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        a: Array2<f64>,
        b1: Array2<f64>,
        b2: Array2<f64>,
        c1: Array2<f64>,
        c2: Array2<f64>,
        d11: Array2<f64>,
        d12: Array2<f64>,
        d21: Array2<f64>,
        d22: Array2<f64>,
    ) -> Result<Self> {
        let plant = Self {
            a,
            b1,
            b2,
            c1,
            c2,
            d11,
            d12,
            d21,
            d22,
        };
        plant.validate()?;
        Ok(plant)
    }

    /// Check every block against the sizes implied by A, B1, B2, C1 and C2.
    pub fn validate(&self) -> Result<()> {
        let Dimensions { n, m1, m2, p1, p2 } = self.dims();

        check_block("A", &self.a, (n, n))?;
        check_block("B1", &self.b1, (n, m1))?;
        check_block("B2", &self.b2, (n, m2))?;
        check_block("C1", &self.c1, (p1, n))?;
        check_block("C2", &self.c2, (p2, n))?;
        check_block("D11", &self.d11, (p1, m1))?;
        check_block("D12", &self.d12, (p1, m2))?;
        check_block("D21", &self.d21, (p2, m1))?;
        check_block("D22", &self.d22, (p2, m2))
    }

    pub fn a(&self) -> &Array2<f64> {
        &self.a
    }

    pub fn b1(&self) -> &Array2<f64> {
        &self.b1
    }

    pub fn b2(&self) -> &Array2<f64> {
        &self.b2
    }

    pub fn c1(&self) -> &Array2<f64> {
        &self.c1
    }

    pub fn c2(&self) -> &Array2<f64> {
        &self.c2
    }

    pub fn d11(&self) -> &Array2<f64> {
        &self.d11
    }

    pub fn d12(&self) -> &Array2<f64> {
        &self.d12
    }

    pub fn d21(&self) -> &Array2<f64> {
        &self.d21
    }

    pub fn d22(&self) -> &Array2<f64> {
        &self.d22
    }

    pub fn dims(&self) -> Dimensions {
        Dimensions {
            n: self.a.nrows(),
            m1: self.b1.ncols(),
            m2: self.b2.ncols(),
            p1: self.c1.nrows(),
            p2: self.c2.nrows(),
        }
    }

    /// Stacked input matrix `[B1 B2]`.
    pub fn b(&self) -> Result<Array2<f64>> {
        linalg::hstack(&[&self.b1, &self.b2])
    }

    /// Stacked output matrix `[C1; C2]`.
    pub fn c(&self) -> Result<Array2<f64>> {
        linalg::vstack(&[&self.c1, &self.c2])
    }

    /// Performance-row feedthrough `[D11 D12]`.
    pub fn d1_row(&self) -> Result<Array2<f64>> {
        linalg::hstack(&[&self.d11, &self.d12])
    }

    /// Disturbance-column feedthrough `[D11; D21]`.
    pub fn d1_col(&self) -> Result<Array2<f64>> {
        linalg::vstack(&[&self.d11, &self.d21])
    }
}

/// State-space realization `(A, B, C, D)`.
///
/// Synthesized controllers use this type: `dx_c/dt = A x_c + B y`,
/// `u = C x_c + D y`.
#[derive(Clone, Debug)]
pub struct StateSpace {
    pub a: Array2<f64>,
    pub b: Array2<f64>,
    pub c: Array2<f64>,
    pub d: Array2<f64>,
}

impl StateSpace {
    pub fn new(a: Array2<f64>, b: Array2<f64>, c: Array2<f64>, d: Array2<f64>) -> Result<Self> {
        let ss = Self { a, b, c, d };
        ss.validate()?;
        Ok(ss)
    }

    /// Check B, C and D against A and each other. The fields are public,
    /// so consumers call this before interconnecting.
    pub fn validate(&self) -> Result<()> {
        let n = self.a.nrows();
        let (m, p) = (self.b.ncols(), self.c.nrows());
        check_block("A", &self.a, (n, n))?;
        check_block("B", &self.b, (n, m))?;
        check_block("C", &self.c, (p, n))?;
        check_block("D", &self.d, (p, m))
    }

    pub fn n_states(&self) -> usize {
        self.a.nrows()
    }

    pub fn n_inputs(&self) -> usize {
        self.b.ncols()
    }

    pub fn n_outputs(&self) -> usize {
        self.c.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn scalar_plant() -> GeneralizedPlant {
        GeneralizedPlant::new(
            arr2(&[[1.0]]),
            arr2(&[[1.0, 0.0]]),
            arr2(&[[1.0]]),
            arr2(&[[1.0], [0.0]]),
            arr2(&[[1.0]]),
            Array2::zeros((2, 2)),
            arr2(&[[0.0], [1.0]]),
            arr2(&[[0.0, 1.0]]),
            Array2::zeros((1, 1)),
        )
        .unwrap()
    }

    #[test]
    fn test_plant_dimensions() {
        let plant = scalar_plant();
        assert_eq!(
            plant.dims(),
            Dimensions {
                n: 1,
                m1: 2,
                m2: 1,
                p1: 2,
                p2: 1
            }
        );
        assert_eq!(plant.b().unwrap().dim(), (1, 3));
        assert_eq!(plant.c().unwrap().dim(), (3, 1));
        assert_eq!(plant.d1_row().unwrap().dim(), (2, 3));
        assert_eq!(plant.d1_col().unwrap().dim(), (3, 2));
    }

    #[test]
    fn test_plant_rejects_dimension_mismatch() {
        let err = GeneralizedPlant::new(
            Array2::<f64>::eye(2),
            Array2::zeros((3, 1)), // wrong rows
            Array2::zeros((2, 1)),
            Array2::zeros((1, 2)),
            Array2::zeros((1, 2)),
            Array2::zeros((1, 1)),
            Array2::zeros((1, 1)),
            Array2::zeros((1, 1)),
            Array2::zeros((1, 1)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            HinfError::DimensionMismatch { block: "B1", .. }
        ));
    }

    #[test]
    fn test_plant_rejects_bad_feedthrough() {
        let err = GeneralizedPlant::new(
            Array2::<f64>::eye(1),
            Array2::zeros((1, 1)),
            Array2::zeros((1, 1)),
            Array2::zeros((1, 1)),
            Array2::zeros((1, 1)),
            Array2::zeros((1, 1)),
            Array2::zeros((2, 1)),
            Array2::zeros((1, 1)),
            Array2::zeros((1, 1)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            HinfError::DimensionMismatch { block: "D12", .. }
        ));
    }

    #[test]
    fn test_accessors_expose_blocks() {
        let plant = scalar_plant();
        assert_eq!(plant.a(), &arr2(&[[1.0]]));
        assert_eq!(plant.d12(), &arr2(&[[0.0], [1.0]]));
        assert_eq!(plant.d21(), &arr2(&[[0.0, 1.0]]));
        assert_eq!(plant.d22().dim(), (1, 1));
        assert!(plant.validate().is_ok());
    }

    #[test]
    fn test_plant_rejects_oversized_d11() {
        // p1 = 2, m1 = 2, so a 3x3 D11 never reaches the numerics
        let err = GeneralizedPlant::new(
            arr2(&[[1.0]]),
            arr2(&[[1.0, 0.0]]),
            arr2(&[[1.0]]),
            arr2(&[[1.0], [0.0]]),
            arr2(&[[1.0]]),
            Array2::zeros((3, 3)),
            arr2(&[[0.0], [1.0]]),
            arr2(&[[0.0, 1.0]]),
            Array2::zeros((1, 1)),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            HinfError::DimensionMismatch {
                block: "D11",
                expected: (2, 2),
                found: (3, 3)
            }
        ));
    }

    #[test]
    fn test_hinfsyn_rejects_inconsistent_plant() {
        // Only reachable from inside this module; synthesis must still
        // fail with an error rather than a shape panic
        let plant = GeneralizedPlant {
            d11: Array2::zeros((3, 3)),
            ..scalar_plant()
        };
        let err = crate::synthesis::hinfsyn(&plant, &crate::search::SynthesisOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            HinfError::DimensionMismatch { block: "D11", .. }
        ));
    }

    #[test]
    fn test_state_space_new() {
        let ss = StateSpace::new(
            Array2::<f64>::eye(2),
            Array2::zeros((2, 1)),
            Array2::zeros((3, 2)),
            Array2::zeros((3, 1)),
        )
        .unwrap();
        assert_eq!(ss.n_states(), 2);
        assert_eq!(ss.n_inputs(), 1);
        assert_eq!(ss.n_outputs(), 3);
        assert!(StateSpace::new(
            Array2::<f64>::eye(2),
            Array2::zeros((2, 1)),
            Array2::zeros((3, 2)),
            Array2::zeros((3, 2)),
        )
        .is_err());
    }

    #[test]
    fn test_state_space_validate_after_edit() {
        let mut ss = StateSpace::new(
            Array2::<f64>::eye(1),
            Array2::zeros((1, 1)),
            Array2::zeros((1, 1)),
            Array2::zeros((1, 1)),
        )
        .unwrap();
        ss.d = Array2::zeros((2, 2));
        assert!(matches!(
            ss.validate(),
            Err(HinfError::DimensionMismatch { block: "D", .. })
        ));
    }
}
