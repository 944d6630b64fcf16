//! Verification of analytic derivatives against numerical differentiation.
//!
//! Each test perturbs the inputs of a model, recomputes the value path, and compares the
//! resulting difference quotients against the analytic derivative path. With `f64` the
//! perturbation is a central finite difference; with `Complex<f64>` it is a complex step, which
//! admits much smaller steps and tighter tolerances (see [`DiffScalar`]).
//!
//! Tests never panic on a mismatch: they return a [`VerificationReport`] and, depending on the
//! configured print level, log the offending entries.
use eyre::eyre;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use weakform_traits::DiffScalar;

mod constitutive;
mod model;

pub use constitutive::*;
pub use model::*;

/// Step size, tolerances and verbosity of a verification run.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Step used to perturb the inputs.
    pub step: f64,
    /// An entry passes if its error relative to the larger of the two compared values is below
    /// this tolerance...
    pub rtol: f64,
    /// ... or if its absolute error is below this tolerance.
    pub atol: f64,
    /// 0: silent, 1: log failing entries, 2: log every compared entry.
    pub print_level: u8,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self::for_scalar::<f64>()
    }
}

impl VerificationConfig {
    /// The default regime for the scalar type `T`.
    pub fn for_scalar<T: DiffScalar>() -> Self {
        Self {
            step: T::DEFAULT_STEP,
            rtol: T::DEFAULT_RTOL,
            atol: T::DEFAULT_ATOL,
            print_level: 0,
        }
    }

    pub fn with_step(self, step: f64) -> Self {
        Self { step, ..self }
    }

    pub fn with_tolerances(self, rtol: f64, atol: f64) -> Self {
        Self { rtol, atol, ..self }
    }

    pub fn with_print_level(self, print_level: u8) -> Self {
        Self { print_level, ..self }
    }

    /// Parses a configuration from JSON. Missing fields take their `f64` defaults.
    pub fn from_json_str(json: &str) -> eyre::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        if !(self.step > 0.0 && self.step.is_finite()) {
            return Err(eyre!("step must be positive and finite, got {}", self.step));
        }
        if !(self.rtol >= 0.0 && self.atol >= 0.0) {
            return Err(eyre!("tolerances must be non-negative"));
        }
        Ok(())
    }
}

/// Outcome of a single verification test.
#[derive(Clone, Debug, PartialEq)]
pub struct VerificationReport {
    pub test: &'static str,
    pub passed: bool,
    pub num_compared: usize,
    pub max_abs_err: f64,
    pub max_rel_err: f64,
    /// Index of the entry with the largest relative error.
    pub worst_index: Option<usize>,
}

impl VerificationReport {
    fn empty(test: &'static str) -> Self {
        Self {
            test,
            passed: true,
            num_compared: 0,
            max_abs_err: 0.0,
            max_rel_err: 0.0,
            worst_index: None,
        }
    }

    fn failure(test: &'static str) -> Self {
        Self {
            passed: false,
            ..Self::empty(test)
        }
    }

    /// Combines the reports of several tests into one that passes only if all of them pass.
    pub fn merge(self, other: Self) -> Self {
        let worst_index = if other.max_rel_err > self.max_rel_err {
            other.worst_index
        } else {
            self.worst_index
        };
        Self {
            test: self.test,
            passed: self.passed && other.passed,
            num_compared: self.num_compared + other.num_compared,
            max_abs_err: self.max_abs_err.max(other.max_abs_err),
            max_rel_err: self.max_rel_err.max(other.max_rel_err),
            worst_index,
        }
    }
}

/// Compares analytic values against their numerical approximation entry by entry.
///
/// Slices of different lengths fail the comparison.
pub fn compare_values(
    test: &'static str,
    analytic: &[f64],
    approximate: &[f64],
    config: &VerificationConfig,
) -> VerificationReport {
    if analytic.len() != approximate.len() {
        if config.print_level >= 1 {
            warn!(
                "{test}: cannot compare {} analytic values with {} approximate values",
                analytic.len(),
                approximate.len()
            );
        }
        return VerificationReport::failure(test);
    }
    let mut report = VerificationReport::empty(test);
    report.num_compared = analytic.len();

    for (i, (&a, &fd)) in analytic.iter().zip(approximate).enumerate() {
        let abs_err = (a - fd).abs();
        let scale = a.abs().max(fd.abs());
        let rel_err = if scale > 0.0 { abs_err / scale } else { 0.0 };
        let entry_passed = abs_err <= config.atol || rel_err <= config.rtol;

        if !entry_passed {
            report.passed = false;
            if config.print_level >= 1 {
                warn!(
                    "{test}: entry {i} failed: analytic {a:.10e}, approximate {fd:.10e}, rel. error {rel_err:.3e}"
                );
            }
        } else if config.print_level >= 2 {
            info!("{test}: entry {i}: analytic {a:.10e}, approximate {fd:.10e}, rel. error {rel_err:.3e}");
        }

        report.max_abs_err = report.max_abs_err.max(abs_err);
        if report.worst_index.is_none() || rel_err > report.max_rel_err {
            report.max_rel_err = rel_err;
            report.worst_index = Some(i);
        }
    }

    if config.print_level >= 1 {
        info!(
            "{test}: {} ({} entries, max abs. error {:.3e}, max rel. error {:.3e})",
            if report.passed { "passed" } else { "FAILED" },
            report.num_compared,
            report.max_abs_err,
            report.max_rel_err
        );
    }
    report
}

/// Runs `add` on a sensitivity buffer pre-filled with synthetic values and returns what it added.
///
/// Design sensitivities must be accumulated, so an implementation that overwrites the buffer
/// instead of adding to it shows up as a mismatch.
fn added_sensitivity<T: DiffScalar>(len: usize, add: impl FnOnce(&mut [T])) -> Vec<T> {
    let initial = synthetic_values::<T>(len, 14);
    let mut sens = initial.clone();
    add(&mut sens);
    sens.iter().zip(&initial).map(|(s, s0)| *s - *s0).collect()
}

fn real_parts<T: DiffScalar>(values: &[T]) -> Vec<f64> {
    values.iter().map(|v| v.real()).collect()
}

/// Deterministic, non-degenerate synthetic input values in `[0.25, 0.75]`.
///
/// Used where a test needs state or adjoint values but the caller supplied none. The values are
/// pairwise distinct so that accidental symmetries do not mask transposed derivative entries.
pub fn synthetic_values<T: DiffScalar>(len: usize, seed: u32) -> Vec<T> {
    (0..len)
        .map(|i| {
            let x = 0.5 + 0.25 * ((1.3 * i as f64 + 0.7 * seed as f64 + 0.1).sin());
            T::from_real(x)
        })
        .collect()
}
