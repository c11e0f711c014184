//! Dirichlet distribution over probability simplices.
//!
//! Used to draw multinomial transition probabilities from a concentration
//! vector, e.g. the split of patients leaving a ward between
//! `{Decline, Recover, other}`.
//!
//! Sampling uses the standard construction
//! `p_i = g_i / Σ_j g_j` with `g_i ~ Gamma(α_i, 1)`. Components with
//! `α_i < 1` are drawn in log space via `Gamma(α+1) · U^(1/α)` and the
//! normalization goes through `log_sum_exp`, so very small concentrations
//! cannot underflow every component to zero.

use rand::Rng;
use rand_distr::{Distribution, Gamma};

use super::stable::softmax;

/// Parameters for a Dirichlet distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletParams {
    /// Concentration parameters (all must be > 0)
    pub alpha: Vec<f64>,
}

impl DirichletParams {
    /// Create new Dirichlet parameters with validation.
    ///
    /// Returns None if any parameter is non-positive, non-finite, or if the vector is empty.
    pub fn new(alpha: Vec<f64>) -> Option<Self> {
        if alpha.is_empty() {
            return None;
        }
        for &a in &alpha {
            if !a.is_finite() || a <= 0.0 {
                return None;
            }
        }
        Some(Self { alpha })
    }

    /// Create a symmetric Dirichlet with all α_i = value.
    pub fn symmetric(k: usize, value: f64) -> Option<Self> {
        if k == 0 {
            return None;
        }
        Self::new(vec![value; k])
    }

    /// Number of categories K.
    pub fn k(&self) -> usize {
        self.alpha.len()
    }

    /// Sum of all concentration parameters: α_0 = Σ_i α_i.
    pub fn concentration(&self) -> f64 {
        self.alpha.iter().sum()
    }

    /// Mean of the Dirichlet distribution: E[p_i] = α_i / α_0.
    pub fn mean(&self) -> Vec<f64> {
        let sum = self.concentration();
        self.alpha.iter().map(|a| a / sum).collect()
    }

    /// Variance of component i: Var[p_i] = α_i(α_0 - α_i) / (α_0²(α_0+1)).
    pub fn variance(&self, i: usize) -> f64 {
        if i >= self.alpha.len() {
            return f64::NAN;
        }
        let sum = self.concentration();
        let a_i = self.alpha[i];
        (a_i * (sum - a_i)) / (sum * sum * (sum + 1.0))
    }

    /// Draw one point on the simplex.
    ///
    /// Returns None only if a Gamma sampler cannot be built, which the
    /// constructor's validation rules out.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec<f64>> {
        let mut log_g = Vec::with_capacity(self.alpha.len());
        for &a in &self.alpha {
            log_g.push(log_gamma_variate(a, rng)?);
        }
        Some(softmax(&log_g))
    }

    /// Draw one point and return only component `i`.
    pub fn sample_component<R: Rng + ?Sized>(&self, i: usize, rng: &mut R) -> Option<f64> {
        if i >= self.alpha.len() {
            return None;
        }
        self.sample(rng).map(|p| p[i])
    }
}

/// log of a Gamma(shape, 1) variate.
fn log_gamma_variate<R: Rng + ?Sized>(shape: f64, rng: &mut R) -> Option<f64> {
    if shape >= 1.0 {
        let g = Gamma::new(shape, 1.0).ok()?;
        return Some(g.sample(rng).ln());
    }
    // Boost: Gamma(a) = Gamma(a + 1) * U^(1/a), U in (0, 1].
    let g = Gamma::new(shape + 1.0, 1.0).ok()?;
    let u = 1.0 - rng.random::<f64>();
    Some(g.sample(rng).ln() + u.ln() / shape)
}
