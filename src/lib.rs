//! hinfsyn-rs: H-infinity controller synthesis by γ-iteration
//!
//! Computes a stabilizing output-feedback controller for a generalized
//! plant that keeps the closed-loop gain from disturbances w to performance
//! outputs z below γ, searching for the smallest γ at which the two
//! Glover-Doyle Riccati equations admit a valid solution pair.
//!
//! # Organization
//!
//! - `plant`: generalized plant and state-space types
//! - `assumptions`: structural preconditions (stabilizability, rank, zeros)
//! - `canonical`: scaling D12 and D21 into canonical form
//! - `riccati`: Hamiltonian Riccati solver and feasibility test
//! - `search`: γ-iteration and synthesis options
//! - `controller`: central controller reconstruction
//! - `synthesis`: the [`hinfsyn`] driver
//! - `closed_loop`: interconnection, stability and frequency response
//! - `linalg`: LAPACK-backed primitives shared by the above
//!
//! # Example
//!
//! ```
//! use hinfsyn_rs::{hinfsyn, GeneralizedPlant, SynthesisOptions};
//! use ndarray::{arr2, Array2};
//!
//! // First-order unstable plant with canonical feedthroughs
//! let plant = GeneralizedPlant::new(
//!     arr2(&[[1.0]]),
//!     arr2(&[[1.0, 0.0]]),
//!     arr2(&[[1.0]]),
//!     arr2(&[[1.0], [0.0]]),
//!     arr2(&[[1.0]]),
//!     Array2::zeros((2, 2)),
//!     arr2(&[[0.0], [1.0]]),
//!     arr2(&[[0.0, 1.0]]),
//!     Array2::zeros((1, 1)),
//! )
//! .unwrap();
//!
//! let result = hinfsyn(&plant, &SynthesisOptions::default()).unwrap();
//! assert!(result.success);
//! ```

pub mod assumptions;
pub mod canonical;
pub mod closed_loop;
pub mod controller;
pub mod error;
pub mod linalg;
pub mod plant;
pub mod riccati;
pub mod search;
pub mod synthesis;

pub use canonical::ScalingMethod;
pub use error::{HinfError, Result};
pub use plant::{GeneralizedPlant, StateSpace};
pub use search::SynthesisOptions;
pub use synthesis::{hinfsyn, SynthesisResult};
