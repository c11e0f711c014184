//! Model parameter names.
//!
//! Posterior sample documents and the prior-predictive set share one naming
//! scheme:
//!
//! - `proba_Recovering_given_<state>`
//! - `proba_Die_after_Declining_<state>`
//! - `pmf_duration_<health>_<state>`

use ad_config::{ClinicalState, HealthOutcome};
use std::str::FromStr;

/// Sub-keys of a nested duration value that hold the rate and temperature
/// rather than a per-day probability.
pub const DURATION_SCALAR_KEYS: [&str; 2] = ["lam", "tau"];

/// A parsed model parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKind {
    /// Probability of recovering (second Dirichlet component).
    Recovering(ClinicalState),
    /// Probability of dying once declining.
    DieAfterDeclining(ClinicalState),
    /// Stay-duration pmf.
    Duration(HealthOutcome, ClinicalState),
}

impl ParamKind {
    /// Parameter name as written in sample documents.
    pub fn name(&self) -> String {
        match self {
            ParamKind::Recovering(s) => format!("proba_Recovering_given_{}", s),
            ParamKind::DieAfterDeclining(s) => format!("proba_Die_after_Declining_{}", s),
            ParamKind::Duration(h, s) => format!("pmf_duration_{}_{}", h, s),
        }
    }

    /// Key of the prior group this parameter is drawn from.
    pub fn prior_key(&self) -> String {
        match self {
            ParamKind::Recovering(s) => s.health_prior_key(),
            ParamKind::DieAfterDeclining(s) => s.death_prior_key(),
            ParamKind::Duration(h, s) => s.duration_prior_key(*h),
        }
    }

    pub fn state(&self) -> ClinicalState {
        match self {
            ParamKind::Recovering(s)
            | ParamKind::DieAfterDeclining(s)
            | ParamKind::Duration(_, s) => *s,
        }
    }

    pub fn is_duration(&self) -> bool {
        matches!(self, ParamKind::Duration(..))
    }

    /// Whether the parameter exists in the model at all.
    ///
    /// The ventilated state has no death-after-decline transition, even
    /// though calibration runs may still record a placeholder value for it.
    pub fn is_modelled(&self) -> bool {
        !matches!(self, ParamKind::DieAfterDeclining(s) if s.is_ventilated())
    }

    /// Short plot label, e.g. `rho_G`, `d_I`, `pi^{V,1}`.
    pub fn label(&self) -> String {
        match self {
            ParamKind::Recovering(s) => format!("rho_{}", state_symbol(*s)),
            ParamKind::DieAfterDeclining(s) => format!("d_{}", state_symbol(*s)),
            ParamKind::Duration(h, s) => {
                let outcome = match h {
                    HealthOutcome::Declining => 0,
                    HealthOutcome::Recovering => 1,
                };
                format!("pi^{{{},{}}}", state_symbol(*s), outcome)
            }
        }
    }

    /// Every parameter the sampler produces for `states`, in sampling order.
    pub fn sampled_for(states: &[ClinicalState]) -> Vec<ParamKind> {
        let mut kinds = Vec::new();
        for &state in states {
            kinds.push(ParamKind::Recovering(state));
            if !state.is_ventilated() {
                kinds.push(ParamKind::DieAfterDeclining(state));
            }
            for health in HealthOutcome::ALL {
                kinds.push(ParamKind::Duration(health, state));
            }
        }
        kinds
    }
}

fn state_symbol(state: ClinicalState) -> char {
    match state {
        ClinicalState::InGeneralWard => 'G',
        ClinicalState::OffVentInICU => 'I',
        ClinicalState::OnVentInICU => 'V',
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for ParamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(state) = s.strip_prefix("proba_Recovering_given_") {
            return Ok(ParamKind::Recovering(state.parse()?));
        }
        if let Some(state) = s.strip_prefix("proba_Die_after_Declining_") {
            return Ok(ParamKind::DieAfterDeclining(state.parse()?));
        }
        if let Some(rest) = s.strip_prefix("pmf_duration_") {
            let (health, state) = rest
                .split_once('_')
                .ok_or_else(|| format!("malformed duration parameter: {}", s))?;
            return Ok(ParamKind::Duration(health.parse()?, state.parse()?));
        }
        Err(format!("unknown parameter: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for kind in ParamKind::sampled_for(&ClinicalState::ALL) {
            assert_eq!(kind.name().parse::<ParamKind>().unwrap(), kind);
        }
    }

    #[test]
    fn sampled_set_skips_ventilated_death() {
        let kinds = ParamKind::sampled_for(&ClinicalState::ALL);
        // 3 recovering + 2 death + 6 duration
        assert_eq!(kinds.len(), 11);
        assert!(!kinds.contains(&ParamKind::DieAfterDeclining(ClinicalState::OnVentInICU)));
        assert!(!ParamKind::DieAfterDeclining(ClinicalState::OnVentInICU).is_modelled());
    }

    #[test]
    fn prior_keys_and_labels() {
        let kind: ParamKind = "pmf_duration_Recovering_OffVentInICU".parse().unwrap();
        assert_eq!(kind.prior_key(), "prior_duration_Recovering_OffVentInICU");
        assert_eq!(kind.label(), "pi^{I,1}");
        assert!(kind.is_duration());

        let kind: ParamKind = "proba_Recovering_given_InGeneralWard".parse().unwrap();
        assert_eq!(kind.prior_key(), "prior_Health_given_InGeneralWard");
        assert_eq!(kind.label(), "rho_G");
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!("proba_Recovering_given_Morgue".parse::<ParamKind>().is_err());
        assert!("pmf_duration_Recovering".parse::<ParamKind>().is_err());
        assert!("lam".parse::<ParamKind>().is_err());
    }
}
