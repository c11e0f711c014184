//! Prior-predictive sampling.
//!
//! Draws synthetic parameter values from the hierarchical prior document so
//! posterior samples can be compared against what the prior alone implies.
//!
//! Per clinical state:
//! - `proba_Recovering_given_<state>`: second component of a Dirichlet draw
//! - `proba_Die_after_Declining_<state>`: same, skipped for the ventilated state
//! - `pmf_duration_<health>_<state>`: one tempered Poisson pmf per draw, with
//!   `lam ~ TruncNormal(mean, sd; [lower, upper])` and `tau ~ Normal(mean, sd)`

use ad_config::{ClinicalState, DurationPrior, HealthOutcome, PriorSpec, ValidationError};
use ad_math::dirichlet::DirichletParams;
use ad_math::normal::TruncatedNormal;
use ad_math::tempered_poisson_pmf;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::params::ParamKind;

/// Index of the "Recover" component in a transition concentration vector.
const RECOVER_COMPONENT: usize = 1;

/// Errors raised while sampling from the prior.
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("prior configuration error: {0}")]
    Config(#[from] ValidationError),

    #[error("number of draws must be at least 1")]
    NoDraws,

    #[error("cannot sample {parameter}: {message}")]
    Distribution { parameter: String, message: String },
}

pub type SamplerResult<T> = std::result::Result<T, SamplerError>;

/// Row-major N × L matrix of draws.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawMatrix {
    cols: usize,
    data: Vec<f64>,
}

impl DrawMatrix {
    /// Empty matrix with `cols` columns and room for `rows` rows.
    pub fn with_capacity(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            data: Vec::with_capacity(rows * cols),
        }
    }

    /// Like [`DrawMatrix::with_capacity`], but None when `rows × cols`
    /// overflows or cannot be allocated.
    pub fn try_with_capacity(rows: usize, cols: usize) -> Option<Self> {
        let len = rows.checked_mul(cols)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).ok()?;
        Some(Self { cols, data })
    }

    /// Build from rows; None if rows differ in length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut m = Self::with_capacity(rows.len(), cols);
        for row in rows {
            if row.len() != cols {
                return None;
            }
            m.data.extend_from_slice(row);
        }
        Some(m)
    }

    /// Append one row. Panics in debug builds on a length mismatch.
    fn push_row(&mut self, row: &[f64]) {
        debug_assert_eq!(row.len(), self.cols);
        self.data.extend_from_slice(row);
    }

    pub fn rows(&self) -> usize {
        if self.cols == 0 {
            0
        } else {
            self.data.len() / self.cols
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.cols.max(1))
    }

    /// Copy of column `j` (one value per draw).
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.iter_rows().map(|r| r[j]).collect()
    }
}

impl Serialize for DrawMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows()))?;
        for row in self.iter_rows() {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

/// Draws for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PriorDraws {
    /// One value per draw.
    Scalar(Vec<f64>),
    /// One pmf row per draw.
    Matrix(DrawMatrix),
}

impl PriorDraws {
    pub fn num_draws(&self) -> usize {
        match self {
            PriorDraws::Scalar(v) => v.len(),
            PriorDraws::Matrix(m) => m.rows(),
        }
    }
}

/// Prior-predictive draws keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriorPredictiveSet {
    params: BTreeMap<String, PriorDraws>,
}

impl PriorPredictiveSet {
    pub fn get(&self, name: &str) -> Option<&PriorDraws> {
        self.params.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PriorDraws)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    fn insert(&mut self, kind: ParamKind, draws: PriorDraws) {
        self.params.insert(kind.name(), draws);
    }
}

/// Samples parameter values from a prior document.
///
/// Holds no state beyond the borrowed document; randomness comes from the
/// generator passed to each call.
#[derive(Debug, Clone, Copy)]
pub struct PriorPredictiveSampler<'a> {
    spec: &'a PriorSpec,
}

impl<'a> PriorPredictiveSampler<'a> {
    pub fn new(spec: &'a PriorSpec) -> Self {
        Self { spec }
    }

    /// Draw `num_draws` values of every parameter for `states`.
    ///
    /// Each parameter's hyperparameters are validated right before that
    /// parameter is sampled; the first invalid group aborts the pass.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        states: &[ClinicalState],
        num_draws: usize,
        rng: &mut R,
    ) -> SamplerResult<PriorPredictiveSet> {
        if num_draws == 0 {
            return Err(SamplerError::NoDraws);
        }

        let mut set = PriorPredictiveSet::default();
        for kind in ParamKind::sampled_for(states) {
            let draws = match kind {
                ParamKind::Recovering(state) => {
                    PriorDraws::Scalar(self.sample_recovering(state, num_draws, rng)?)
                }
                ParamKind::DieAfterDeclining(state) => {
                    PriorDraws::Scalar(self.sample_death_after_decline(state, num_draws, rng)?)
                }
                ParamKind::Duration(health, state) => {
                    PriorDraws::Matrix(self.sample_duration_pmfs(health, state, num_draws, rng)?)
                }
            };
            tracing::debug!(param = %kind, draws = draws.num_draws(), "sampled prior parameter");
            set.insert(kind, draws);
        }

        tracing::info!(
            parameters = set.len(),
            draws = num_draws,
            "prior-predictive sampling complete"
        );
        Ok(set)
    }

    /// Recovery probabilities for `state`.
    pub fn sample_recovering<R: Rng + ?Sized>(
        &self,
        state: ClinicalState,
        num_draws: usize,
        rng: &mut R,
    ) -> SamplerResult<Vec<f64>> {
        let alpha = self.spec.health_transition(state)?;
        recover_component_draws(ParamKind::Recovering(state), alpha, num_draws, rng)
    }

    /// Death-after-decline probabilities for `state`.
    pub fn sample_death_after_decline<R: Rng + ?Sized>(
        &self,
        state: ClinicalState,
        num_draws: usize,
        rng: &mut R,
    ) -> SamplerResult<Vec<f64>> {
        let alpha = self.spec.death_after_decline(state)?;
        recover_component_draws(ParamKind::DieAfterDeclining(state), alpha, num_draws, rng)
    }

    /// N × floor(upper) matrix of duration pmfs for `health` in `state`.
    pub fn sample_duration_pmfs<R: Rng + ?Sized>(
        &self,
        health: HealthOutcome,
        state: ClinicalState,
        num_draws: usize,
        rng: &mut R,
    ) -> SamplerResult<DrawMatrix> {
        let kind = ParamKind::Duration(health, state);
        let group = self.spec.duration(health, state)?;
        let law = DurationLaw::new(kind, &group)?;

        let mut matrix = DrawMatrix::try_with_capacity(num_draws, law.support_len).ok_or_else(|| {
            SamplerError::Distribution {
                parameter: kind.name(),
                message: format!(
                    "{} draws of a {}-day pmf do not fit in memory",
                    num_draws, law.support_len
                ),
            }
        })?;
        for _ in 0..num_draws {
            let pmf = law.sample_pmf(rng);
            if pmf.iter().any(|p| !p.is_finite()) {
                return Err(SamplerError::Distribution {
                    parameter: kind.name(),
                    message: "duration pmf is not finite; tau prior is too wide".to_string(),
                });
            }
            matrix.push_row(&pmf);
        }
        Ok(matrix)
    }
}

fn recover_component_draws<R: Rng + ?Sized>(
    kind: ParamKind,
    alpha: &[f64],
    num_draws: usize,
    rng: &mut R,
) -> SamplerResult<Vec<f64>> {
    let distribution = || SamplerError::Distribution {
        parameter: kind.name(),
        message: format!("invalid Dirichlet concentration {:?}", alpha),
    };
    let dirichlet = DirichletParams::new(alpha.to_vec()).ok_or_else(distribution)?;
    (0..num_draws)
        .map(|_| {
            dirichlet
                .sample_component(RECOVER_COMPONENT, rng)
                .ok_or_else(distribution)
        })
        .collect()
}

/// Rate and temperature priors of one duration parameter.
struct DurationLaw {
    lam: TruncatedNormal,
    tau: Normal<f64>,
    support_len: usize,
}

impl DurationLaw {
    fn new(kind: ParamKind, group: &DurationPrior) -> SamplerResult<Self> {
        let err = |message: String| SamplerError::Distribution {
            parameter: kind.name(),
            message,
        };
        let lam = TruncatedNormal::new(
            group.lam.mean,
            group.lam.stddev,
            group.lam.lower,
            group.lam.upper,
        )
        .ok_or_else(|| err(format!("invalid rate prior {:?}", group.lam)))?;
        let tau = Normal::new(group.tau.mean, group.tau.stddev)
            .map_err(|e| err(format!("invalid temperature prior: {}", e)))?;
        Ok(Self {
            lam,
            tau,
            support_len: group.support_len(),
        })
    }

    fn sample_pmf<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let lam = self.lam.sample(rng);
        let tau = self.tau.sample(rng);
        tempered_poisson_pmf(lam, tau, self.support_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ad_math::poisson_log_pmf;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spec_json(tau_sd: f64) -> String {
        let duration = format!(
            r#"{{"lam": {{"lower": 1, "upper": 10, "mean": 5, "stddev": 1}},
                "tau": {{"mean": 0, "stddev": {}}}}}"#,
            tau_sd
        );
        let mut doc = String::from("{");
        for state in ClinicalState::ALL {
            doc.push_str(&format!(r#""prior_Health_given_{}": [2.0, 6.0, 2.0],"#, state));
            if !state.is_ventilated() {
                doc.push_str(&format!(
                    r#""prior_Die_after_Declining_{}": [90.0, 5.0, 5.0],"#,
                    state
                ));
            }
            for health in HealthOutcome::ALL {
                doc.push_str(&format!(
                    r#""prior_duration_{}_{}": {},"#,
                    health, state, duration
                ));
            }
        }
        doc.pop();
        doc.push('}');
        doc
    }

    fn spec(tau_sd: f64) -> PriorSpec {
        PriorSpec::from_str(&spec_json(tau_sd)).unwrap()
    }

    #[test]
    fn shapes_match_draw_count() {
        let spec = spec(0.3);
        let mut rng = StdRng::seed_from_u64(7);
        for n in [1, 2, 37] {
            let set = PriorPredictiveSampler::new(&spec)
                .sample(&ClinicalState::ALL, n, &mut rng)
                .unwrap();
            assert_eq!(set.len(), 11);
            for (name, draws) in set.iter() {
                assert_eq!(draws.num_draws(), n, "{}", name);
                if let PriorDraws::Matrix(m) = draws {
                    assert_eq!(m.cols(), 10, "{}", name);
                }
            }
            assert!(set.get("proba_Die_after_Declining_OnVentInICU").is_none());
        }
    }

    #[test]
    fn every_pmf_row_sums_to_one() {
        let spec = spec(0.5);
        let mut rng = StdRng::seed_from_u64(11);
        let m = PriorPredictiveSampler::new(&spec)
            .sample_duration_pmfs(
                HealthOutcome::Declining,
                ClinicalState::OnVentInICU,
                500,
                &mut rng,
            )
            .unwrap();
        for row in m.iter_rows() {
            let total: f64 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "sum = {}", total);
        }
    }

    #[test]
    fn near_zero_temperature_recovers_truncated_poisson() {
        let spec = spec(0.0001);
        let mut rng = StdRng::seed_from_u64(2024);
        let m = PriorPredictiveSampler::new(&spec)
            .sample_duration_pmfs(
                HealthOutcome::Recovering,
                ClinicalState::InGeneralWard,
                2000,
                &mut rng,
            )
            .unwrap();

        let mean_pmf: Vec<f64> = (0..m.cols())
            .map(|j| ad_math::mean(&m.column(j)))
            .collect();

        // Poisson(5) renormalized over [0, 10)
        let weights: Vec<f64> = (0..10u64).map(|k| poisson_log_pmf(k, 5.0).exp()).collect();
        let total: f64 = weights.iter().sum();
        for (k, (got, w)) in mean_pmf.iter().zip(&weights).enumerate() {
            let want = w / total;
            // Rate uncertainty (sd 1) smooths the mean pmf; stay within a few points.
            assert!((got - want).abs() < 0.03, "k={} got={} want={}", k, got, want);
        }
    }

    #[test]
    fn recovery_draws_follow_beta_marginal() {
        let spec = spec(0.1);
        let mut rng = StdRng::seed_from_u64(3);
        let draws = PriorPredictiveSampler::new(&spec)
            .sample_recovering(ClinicalState::OffVentInICU, 5000, &mut rng)
            .unwrap();
        // Marginal of component 1 of Dir(2, 6, 2) has mean 0.6
        assert!((ad_math::mean(&draws) - 0.6).abs() < 0.02);
        assert!(draws.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn same_seed_same_draws() {
        let spec = spec(0.2);
        let a = PriorPredictiveSampler::new(&spec)
            .sample(&ClinicalState::ALL, 5, &mut StdRng::seed_from_u64(99))
            .unwrap();
        let b = PriorPredictiveSampler::new(&spec)
            .sample(&ClinicalState::ALL, 5, &mut StdRng::seed_from_u64(99))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_draws_is_an_error() {
        let spec = spec(0.2);
        let err = PriorPredictiveSampler::new(&spec)
            .sample(&ClinicalState::ALL, 0, &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, SamplerError::NoDraws));
    }

    #[test]
    fn missing_group_fails_before_sampling_that_parameter() {
        let mut spec = spec(0.2);
        spec.insert(
            "prior_duration_Declining_OffVentInICU",
            ad_config::PriorEntry::Other(serde_json::json!({"lam": {"lower": 1}})),
        );
        let sampler = PriorPredictiveSampler::new(&spec);
        let mut rng = StdRng::seed_from_u64(5);

        // Other parameters of the state are unaffected.
        assert!(sampler
            .sample_recovering(ClinicalState::OffVentInICU, 3, &mut rng)
            .is_ok());

        let err = sampler
            .sample(&ClinicalState::ALL, 3, &mut rng)
            .unwrap_err();
        match err {
            SamplerError::Config(ValidationError::InvalidValue { field, .. }) => {
                assert_eq!(field, "prior_duration_Declining_OffVentInICU");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn oversized_matrix_is_an_error_not_a_panic() {
        assert!(DrawMatrix::try_with_capacity(usize::MAX, 2).is_none());
        assert!(DrawMatrix::try_with_capacity(usize::MAX / 4, 1).is_none());
        let m = DrawMatrix::try_with_capacity(3, 4).unwrap();
        assert_eq!(m.cols(), 4);
        assert_eq!(m.rows(), 0);

        let spec = spec(0.2);
        let err = PriorPredictiveSampler::new(&spec)
            .sample_duration_pmfs(
                HealthOutcome::Recovering,
                ClinicalState::InGeneralWard,
                usize::MAX,
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap_err();
        match err {
            SamplerError::Distribution { parameter, .. } => {
                assert_eq!(parameter, "pmf_duration_Recovering_InGeneralWard");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn draw_matrix_serializes_as_rows() {
        let m = DrawMatrix::from_rows(&[vec![0.25, 0.75], vec![0.5, 0.5]]).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.column(1), vec![0.75, 0.5]);
        assert_eq!(
            serde_json::to_string(&m).unwrap(),
            "[[0.25,0.75],[0.5,0.5]]"
        );
        assert!(DrawMatrix::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_none());
    }
}
