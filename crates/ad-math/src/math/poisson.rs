//! Poisson log-pmf and the temperature-rescaled duration law.
//!
//! Length-of-stay distributions are modelled as a Poisson law over a finite
//! support `k = 0 .. L-1`, tempered by an exponent `τ`:
//!
//! ```text
//! p(k) ∝ exp( log Poisson(k | λ) / 10^τ )
//! ```
//!
//! `τ = 0` reproduces the Poisson law renormalized over the support,
//! `τ > 0` flattens it (overdispersion) and `τ < 0` sharpens it.

use super::stable::{log_factorial, softmax};

/// Log probability mass of `k` under Poisson(λ).
///
/// λ = 0 puts all mass at k = 0. Negative or NaN λ yields NaN.
pub fn poisson_log_pmf(k: u64, lambda: f64) -> f64 {
    if lambda.is_nan() || lambda < 0.0 {
        return f64::NAN;
    }
    if lambda == 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    if lambda.is_infinite() {
        return f64::NEG_INFINITY;
    }
    (k as f64) * lambda.ln() - lambda - log_factorial(k)
}

/// Unnormalized tempered log-weights over `k = 0 .. support_len-1`.
pub fn tempered_poisson_log_weights(lambda: f64, tau: f64, support_len: usize) -> Vec<f64> {
    let temperature = 10f64.powf(tau);
    (0..support_len as u64)
        .map(|k| poisson_log_pmf(k, lambda) / temperature)
        .collect()
}

/// Tempered Poisson pmf over `k = 0 .. support_len-1`; entries sum to 1.
pub fn tempered_poisson_pmf(lambda: f64, tau: f64, support_len: usize) -> Vec<f64> {
    softmax(&tempered_poisson_log_weights(lambda, tau, support_len))
}
