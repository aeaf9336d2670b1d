//! H-infinity Synthesis Driver
//!
//! [`hinfsyn`] runs the complete pipeline on a generalized plant:
//!
//! 1. validate options and reject D22 != 0
//! 2. check the synthesis assumptions (diagnostic only)
//! 3. bring the plant into canonical coordinates
//! 4. search γ
//! 5. reconstruct the controller at the best γ
//!
//! Failing to find a feasible γ is a normal outcome and is reported through
//! [`SynthesisResult::success`]. Errors are reserved for invalid input and
//! numerical breakdowns outside the γ-search.

use crate::assumptions::check_assumptions;
use crate::canonical::transform_plant_to_canonical;
use crate::controller::synthesize_controller;
use crate::error::{HinfError, Result};
use crate::plant::{GeneralizedPlant, StateSpace};
use crate::search::{gamma_search, SynthesisOptions};

/// Outcome of [`hinfsyn`].
#[derive(Clone, Debug)]
pub struct SynthesisResult {
    /// A stabilizing controller was found
    pub success: bool,
    /// Controller from measurements y to controls u
    pub controller: Option<StateSpace>,
    /// Achieved closed-loop level
    pub gamma: Option<f64>,
}

impl SynthesisResult {
    fn infeasible() -> Self {
        Self {
            success: false,
            controller: None,
            gamma: None,
        }
    }
}

/// Synthesize an H-infinity controller for `plant`.
///
/// # Errors
///
/// - [`HinfError::InvalidOption`] for out-of-range options
/// - [`HinfError::Unsupported`] if D22 is non-zero
/// - [`HinfError::RankDeficiency`] if D12 or D21 cannot be canonicalized
/// - [`HinfError::NumericalConditioning`] if controller reconstruction fails
///
/// # Examples
///
/// ```
/// use hinfsyn_rs::plant::GeneralizedPlant;
/// use hinfsyn_rs::search::SynthesisOptions;
/// use hinfsyn_rs::synthesis::hinfsyn;
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
///
/// let result = hinfsyn(&plant, &SynthesisOptions::default()).unwrap();
/// assert!(result.success);
/// let gamma = result.gamma.unwrap();
/// assert!((gamma - (1.0 + 3f64.sqrt())).abs() < 1e-3);
/// ```
pub fn hinfsyn(plant: &GeneralizedPlant, options: &SynthesisOptions) -> Result<SynthesisResult> {
    options.validate()?;
    plant.validate()?;

    if plant.d22().iter().any(|v| v.abs() > options.tolerance) {
        return Err(HinfError::Unsupported(
            "D22 must be zero; loop-shift the plant before synthesis".to_string(),
        ));
    }

    if !check_assumptions(plant) {
        log::warn!("continuing synthesis with violated assumptions");
    }

    let canonical = transform_plant_to_canonical(plant, options.scaling)?;

    let cert = match gamma_search(&canonical.plant, options)? {
        Some(cert) => cert,
        None => {
            log::info!(
                "no feasible gamma in ({}, {})",
                options.interval.0,
                options.interval.1
            );
            return Ok(SynthesisResult::infeasible());
        }
    };

    let controller = synthesize_controller(&canonical, &cert)?;
    log::info!(
        "synthesized {}-state controller at gamma = {}",
        controller.n_states(),
        cert.gamma
    );

    Ok(SynthesisResult {
        success: true,
        controller: Some(controller),
        gamma: Some(cert.gamma),
    })
}
