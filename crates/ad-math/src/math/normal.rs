//! Standard normal CDF/quantile and truncated-normal sampling.
//!
//! A truncated normal `N(μ, σ²)` restricted to `[lower, upper]` is handled
//! on the standardized scale: `α = (lower - μ)/σ`, `β = (upper - μ)/σ`.
//! A standard draw `z ∈ [α, β]` maps back as `μ + σ·z`.
//!
//! Draws use the inverse CDF when the interval carries enough mass to be
//! represented accurately. Intervals are mirrored so `Φ` is always evaluated
//! in the lower tail, where `erfc` keeps full relative precision. Intervals
//! deep in a tail fall back to exact rejection sampling (uniform proposal
//! for narrow intervals, Robert's exponential proposal otherwise).

use rand::Rng;
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::SQRT_2;

/// Below this interval mass the inverse CDF loses precision.
const MIN_INVERSE_CDF_MASS: f64 = 1e-12;

/// Safety cap on rejection loops; acceptance rates are high for every branch.
const MAX_REJECTION_ITERS: usize = 100_000;

/// Standard normal CDF Φ(x).
pub fn std_normal_cdf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal quantile Φ⁻¹(p).
///
/// Returns -inf at p = 0, +inf at p = 1 and NaN outside [0, 1].
pub fn std_normal_quantile(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// A normal distribution truncated to the closed interval `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedNormal {
    mean: f64,
    stddev: f64,
    lower: f64,
    upper: f64,
}

impl TruncatedNormal {
    /// Create a truncated normal.
    ///
    /// Returns None unless `stddev > 0`, the mean is finite and `lower < upper`.
    /// Bounds may be infinite.
    pub fn new(mean: f64, stddev: f64, lower: f64, upper: f64) -> Option<Self> {
        if !mean.is_finite() || !stddev.is_finite() || stddev <= 0.0 {
            return None;
        }
        if lower.is_nan() || upper.is_nan() || lower >= upper {
            return None;
        }
        Some(Self {
            mean,
            stddev,
            lower,
            upper,
        })
    }

    /// Create from standardized bounds, `loc` and `scale` (the `α, β, μ, σ` form).
    pub fn from_standardized(alpha: f64, beta: f64, loc: f64, scale: f64) -> Option<Self> {
        Self::new(loc, scale, loc + alpha * scale, loc + beta * scale)
    }

    /// Standardized bounds `(α, β)`.
    pub fn standardized_bounds(&self) -> (f64, f64) {
        (
            (self.lower - self.mean) / self.stddev,
            (self.upper - self.mean) / self.stddev,
        )
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Probability mass of the untruncated normal inside the interval.
    pub fn interval_mass(&self) -> f64 {
        let (a, b) = self.standardized_bounds();
        if a > 0.0 {
            std_normal_cdf(-a) - std_normal_cdf(-b)
        } else {
            std_normal_cdf(b) - std_normal_cdf(a)
        }
    }

    /// Draw one value. Always lies in `[lower, upper]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let (a, b) = self.standardized_bounds();
        let z = sample_standard(a, b, rng);
        (self.mean + self.stddev * z).clamp(self.lower, self.upper)
    }
}

/// Draw z ~ N(0, 1) conditioned on z ∈ [a, b].
fn sample_standard<R: Rng + ?Sized>(a: f64, b: f64, rng: &mut R) -> f64 {
    if a > 0.0 {
        return -sample_standard(-b, -a, rng);
    }
    let pa = std_normal_cdf(a);
    let pb = std_normal_cdf(b);
    let mass = pb - pa;
    if mass > MIN_INVERSE_CDF_MASS {
        let u = rng.random::<f64>();
        return std_normal_quantile(pa + u * mass).clamp(a, b);
    }
    if b <= 0.0 {
        -sample_positive_tail(-b, -a, rng)
    } else {
        sample_uniform_proposal(a, b, 0.0, rng)
    }
}

/// Draw z ~ N(0, 1) conditioned on z ∈ [c, d], with 0 <= c < d.
fn sample_positive_tail<R: Rng + ?Sized>(c: f64, d: f64, rng: &mut R) -> f64 {
    if (d - c) * c.max(1.0) < 1.0 {
        return sample_uniform_proposal(c, d, c, rng);
    }
    let lambda = 0.5 * (c + (c * c + 4.0).sqrt());
    for _ in 0..MAX_REJECTION_ITERS {
        let u = 1.0 - rng.random::<f64>();
        let z = c - u.ln() / lambda;
        if z > d {
            continue;
        }
        let accept = (-0.5 * (z - lambda) * (z - lambda)).exp();
        if rng.random::<f64>() <= accept {
            return z;
        }
    }
    c
}

/// Uniform proposal on [a, b]; `m` is the point of [a, b] closest to zero.
fn sample_uniform_proposal<R: Rng + ?Sized>(a: f64, b: f64, m: f64, rng: &mut R) -> f64 {
    for _ in 0..MAX_REJECTION_ITERS {
        let z = a + (b - a) * rng.random::<f64>();
        let accept = (0.5 * (m * m - z * z)).exp();
        if rng.random::<f64>() <= accept {
            return z;
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn cdf_known_values() {
        assert!(approx_eq(std_normal_cdf(0.0), 0.5, 1e-15));
        assert!(approx_eq(std_normal_cdf(1.959_963_984_540_054), 0.975, 1e-10));
        assert!(approx_eq(std_normal_cdf(-1.0), 0.158_655_253_931_457_05, 1e-10));
        // Deep lower tail keeps relative precision
        let tail = std_normal_cdf(-20.0);
        assert!(tail > 0.0 && tail < 1e-80);
    }

    #[test]
    fn quantile_inverts_cdf() {
        for &p in &[1e-9, 0.001, 0.025, 0.3, 0.5, 0.77, 0.975, 0.999_999] {
            let x = std_normal_quantile(p);
            assert!(approx_eq(std_normal_cdf(x), p, 1e-9 * p.max(1e-3)), "p={}", p);
        }
        assert_eq!(std_normal_quantile(0.0), f64::NEG_INFINITY);
        assert_eq!(std_normal_quantile(1.0), f64::INFINITY);
        assert!(std_normal_quantile(1.5).is_nan());
    }

    #[test]
    fn new_rejects_invalid_parameters() {
        assert!(TruncatedNormal::new(0.0, 0.0, -1.0, 1.0).is_none());
        assert!(TruncatedNormal::new(0.0, -1.0, -1.0, 1.0).is_none());
        assert!(TruncatedNormal::new(0.0, 1.0, 1.0, 1.0).is_none());
        assert!(TruncatedNormal::new(0.0, 1.0, 2.0, 1.0).is_none());
        assert!(TruncatedNormal::new(f64::NAN, 1.0, 0.0, 1.0).is_none());
        assert!(TruncatedNormal::new(0.0, 1.0, f64::NEG_INFINITY, 1.0).is_some());
    }

    #[test]
    fn standardized_round_trip() {
        let t = TruncatedNormal::new(5.0, 2.0, 1.0, 10.0).unwrap();
        let (a, b) = t.standardized_bounds();
        assert!(approx_eq(a, -2.0, 1e-12));
        assert!(approx_eq(b, 2.5, 1e-12));
        let u = TruncatedNormal::from_standardized(a, b, 5.0, 2.0).unwrap();
        assert!(approx_eq(u.lower(), 1.0, 1e-12));
        assert!(approx_eq(u.upper(), 10.0, 1e-12));
    }

    #[test]
    fn draws_stay_inside_bounds() {
        let cases = [
            (5.0, 1.0, 1.0, 10.0),
            (0.0, 1.0, 8.0, 9.0),
            (0.0, 1.0, -40.0, -39.0),
            (0.0, 1.0, 30.0, 1000.0),
            (3.0, 0.5, 2.999_999_9, 3.000_000_1),
        ];
        let mut rng = StdRng::seed_from_u64(99);
        for (m, s, lo, hi) in cases {
            let t = TruncatedNormal::new(m, s, lo, hi).unwrap();
            for _ in 0..500 {
                let x = t.sample(&mut rng);
                assert!(x >= lo && x <= hi, "{} outside [{}, {}]", x, lo, hi);
            }
        }
    }

    #[test]
    fn wide_interval_matches_untruncated_moments() {
        let t = TruncatedNormal::new(5.0, 1.0, -100.0, 100.0).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let n = 20_000;
        let xs: Vec<f64> = (0..n).map(|_| t.sample(&mut rng)).collect();
        let mean = xs.iter().sum::<f64>() / n as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
        assert!(approx_eq(mean, 5.0, 0.03));
        assert!(approx_eq(var, 1.0, 0.05));
    }

    #[test]
    fn one_sided_truncation_shifts_mean() {
        // E[Z | Z > 0] = sqrt(2/pi)
        let t = TruncatedNormal::new(0.0, 1.0, 0.0, f64::INFINITY).unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        let n = 20_000;
        let mean = (0..n).map(|_| t.sample(&mut rng)).sum::<f64>() / n as f64;
        assert!(approx_eq(mean, (2.0 / std::f64::consts::PI).sqrt(), 0.02));
    }

    #[test]
    fn far_tail_mean_is_near_lower_bound() {
        // For large c, E[Z | Z > c] ≈ c + 1/c
        let t = TruncatedNormal::new(0.0, 1.0, 12.0, 50.0).unwrap();
        assert!(t.interval_mass() < MIN_INVERSE_CDF_MASS);
        let mut rng = StdRng::seed_from_u64(23);
        let n = 5_000;
        let mean = (0..n).map(|_| t.sample(&mut rng)).sum::<f64>() / n as f64;
        assert!(approx_eq(mean, 12.0 + 1.0 / 12.0, 0.02));
    }
}
