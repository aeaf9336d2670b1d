//! γ-Iteration
//!
//! Searches a bounded interval for the smallest γ at which the Riccati
//! feasibility test passes. The schedule is fixed: starting from the upper
//! bound, iteration k moves γ down by `(hi - lo) / 2^k` after a feasible
//! trial and up by the same amount after an infeasible one. The search stops
//! early if γ is pushed above the upper bound, which only happens when the
//! upper bound itself is infeasible.
//!
//! The returned γ is an upper bound on the optimum, accurate to roughly
//! `(hi - lo) / 2^max_iter`.

use crate::canonical::ScalingMethod;
use crate::error::{HinfError, Result};
use crate::plant::GeneralizedPlant;
use crate::riccati::{feedthrough_bound, solve_matrix_equations, RiccatiCertificate};

/// Options controlling the γ-search and the synthesis that wraps it.
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesisOptions {
    /// Iteration cap
    pub max_iter: usize,
    /// Search bounds (lo, hi) for γ
    pub interval: (f64, f64),
    /// Slack allowed on the semidefiniteness of Xinf and Yinf
    pub tolerance: f64,
    /// Log the γ trace at info level instead of debug
    pub verbose: bool,
    /// Factorization used for coordinate canonicalization
    pub scaling: ScalingMethod,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            max_iter: 20,
            interval: (2.0 / 3.0, 20.0),
            tolerance: 1e-8,
            verbose: false,
            scaling: ScalingMethod::Svd,
        }
    }
}

impl SynthesisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_interval(mut self, lo: f64, hi: f64) -> Self {
        self.interval = (lo, hi);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_scaling(mut self, scaling: ScalingMethod) -> Self {
        self.scaling = scaling;
        self
    }

    /// Reject option values the search cannot run with.
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = self.interval;
        if self.max_iter == 0 {
            return Err(HinfError::InvalidOption(
                "max_iter must be positive".to_string(),
            ));
        }
        if !(lo > 0.0 && hi.is_finite() && lo < hi) {
            return Err(HinfError::InvalidOption(format!(
                "interval must satisfy 0 < lo < hi, got ({}, {})",
                lo, hi
            )));
        }
        if !(self.tolerance > 0.0) {
            return Err(HinfError::InvalidOption(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Search for the smallest feasible γ on a canonical plant.
///
/// Returns the certificate of the best feasible γ found, or `None` when no
/// tried γ was feasible. Numerical failures while solving the Riccati
/// equations count as infeasible trials; any other error is propagated.
///
/// # Examples
///
/// ```
/// use hinfsyn_rs::plant::GeneralizedPlant;
/// use hinfsyn_rs::search::{gamma_search, SynthesisOptions};
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
/// let cert = gamma_search(&plant, &SynthesisOptions::default()).unwrap().unwrap();
/// assert!((cert.gamma - (1.0 + 3f64.sqrt())).abs() < 1e-3);
/// ```
pub fn gamma_search(
    plant: &GeneralizedPlant,
    options: &SynthesisOptions,
) -> Result<Option<RiccatiCertificate>> {
    options.validate()?;

    let (lo, hi) = options.interval;
    let width = hi - lo;
    let bound = feedthrough_bound(plant)?;

    let mut gamma = hi;
    let mut best: Option<RiccatiCertificate> = None;

    for iteration in 1..=options.max_iter {
        let step = width / 2f64.powi(iteration as i32);
        let outcome = try_gamma(plant, gamma, bound, options.tolerance)?;
        trace(options.verbose, iteration, gamma, outcome.is_some());

        match outcome {
            Some(cert) => {
                if best.as_ref().map_or(true, |b| cert.gamma < b.gamma) {
                    best = Some(cert);
                }
                gamma -= step;
            }
            None => {
                gamma += step;
                if gamma > hi {
                    break;
                }
            }
        }
    }

    match &best {
        Some(cert) => log::debug!("gamma search finished at gamma = {}", cert.gamma),
        None => log::debug!("gamma search found no feasible gamma in ({}, {})", lo, hi),
    }
    Ok(best)
}

/// Solve and test a single γ. `None` means infeasible.
fn try_gamma(
    plant: &GeneralizedPlant,
    gamma: f64,
    bound: f64,
    tolerance: f64,
) -> Result<Option<RiccatiCertificate>> {
    if gamma <= bound {
        return Ok(None);
    }

    match solve_matrix_equations(plant, gamma) {
        Ok(cert) if cert.is_feasible(tolerance) => Ok(Some(cert)),
        Ok(_) => Ok(None),
        Err(e) if e.is_recoverable() => {
            log::debug!("gamma = {} treated as infeasible: {}", gamma, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn trace(verbose: bool, iteration: usize, gamma: f64, feasible: bool) {
    let outcome = if feasible { "feasible" } else { "infeasible" };
    if verbose {
        log::info!("iteration {}: gamma = {:.6} ({})", iteration, gamma, outcome);
    } else {
        log::debug!("iteration {}: gamma = {:.6} ({})", iteration, gamma, outcome);
    }
}
