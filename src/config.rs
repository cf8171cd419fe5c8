use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// The statistic used to rank candidate edges.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Chi-squared p-value of the likelihood-ratio test, under a multiple-testing correction.
    PValue,
    /// Change in the Bayesian Information Criterion.
    Bic,
    /// Inverse of the entropy gain (Kullback-Leibler divergence to the current model).
    Kl,
    /// Change in minimum message length.
    Mml,
    /// Change in quotient normalized maximum likelihood.
    Qnml,
}

impl Default for Criterion {
    fn default() -> Self {
        Criterion::PValue
    }
}

/// How the p-value threshold is corrected for the number of tests made at each step.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Correction {
    /// Threshold `α / 2^step / tests`.
    SinglePass,
    /// A budget of `α` carried over from step to step, consumed by `p × tests`.
    Stepwise,
    /// A fixed share of the remaining budget is spent at each step.
    BudgetShare,
}

impl Default for Correction {
    fn default() -> Self {
        Correction::Stepwise
    }
}

/// When a p-value equal to its threshold counts as a rejection.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Reject when `p > threshold`.
    Strict,
    /// Reject when `p >= threshold`.
    Inclusive,
}

impl Default for Rejection {
    fn default() -> Self {
        Rejection::Strict
    }
}

/// Settings for one greedy search.
///
/// ```
/// use chordalysis::{Criterion, SearchConfig};
///
/// let config = SearchConfig {
///     criterion: Criterion::Bic,
///     max_clique_size: Some(5),
///     ..SearchConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Statistic used to rank candidate edges.
    pub criterion: Criterion,
    /// Multiple-testing correction for [`Criterion::PValue`].
    pub correction: Correction,
    /// Comparison used by the p-value corrections.
    pub rejection: Rejection,
    /// Family-wise significance level α.
    pub p_value_threshold: f64,
    /// Share of the remaining budget exposed per step by [`Correction::BudgetShare`].
    pub budget_share: f64,
    /// Largest clique an accepted edge may create.
    pub max_clique_size: Option<usize>,
    /// Largest number of edges to add.
    pub max_steps: Option<usize>,
    /// Divides the degrees of freedom by the entropy gain for [`Criterion::Kl`], instead of
    /// using `1 / gain`.
    pub normalise_by_parameters: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            criterion: Criterion::default(),
            correction: Correction::default(),
            rejection: Rejection::default(),
            p_value_threshold: 0.05,
            budget_share: 0.5,
            max_clique_size: None,
            max_steps: None,
            normalise_by_parameters: false,
        }
    }
}

impl SearchConfig {
    /// Checks every field, whichever criterion is selected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.p_value_threshold > 0.0 && self.p_value_threshold < 1.0) {
            return Err(ConfigError::PValueThreshold(self.p_value_threshold));
        }
        if !(self.budget_share > 0.0 && self.budget_share <= 1.0) {
            return Err(ConfigError::BudgetShare(self.budget_share));
        }
        match self.max_clique_size {
            Some(size) if size < 2 => Err(ConfigError::MaxCliqueSize(size)),
            _ => Ok(()),
        }
    }
}

/// Settings for building a [`Lattice`](crate::Lattice).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Adds one extra category to every variable, taken by instances without a value.
    pub has_missing_values: bool,
    /// Largest contingency table the lattice will materialize. Bigger subsets are reported as
    /// unavailable, which the scorers treat as an undefined statistic.
    pub max_cells: usize,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        LatticeConfig {
            has_missing_values: false,
            max_cells: 1 << 24,
        }
    }
}

impl LatticeConfig {
    /// Checks the cell limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cells == 0 {
            return Err(ConfigError::MaxCells);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_values() {
        let bad_threshold = SearchConfig {
            p_value_threshold: 1.0,
            ..SearchConfig::default()
        };
        assert_eq!(
            bad_threshold.validate(),
            Err(ConfigError::PValueThreshold(1.0))
        );

        let bad_share = SearchConfig {
            budget_share: 0.0,
            ..SearchConfig::default()
        };
        assert_eq!(bad_share.validate(), Err(ConfigError::BudgetShare(0.0)));

        let bad_cap = SearchConfig {
            max_clique_size: Some(1),
            ..SearchConfig::default()
        };
        assert_eq!(bad_cap.validate(), Err(ConfigError::MaxCliqueSize(1)));

        let nan = SearchConfig {
            p_value_threshold: f64::NAN,
            ..SearchConfig::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn full_budget_share_is_allowed() {
        let config = SearchConfig {
            budget_share: 1.0,
            ..SearchConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn lattice_needs_cells() {
        let config = LatticeConfig {
            max_cells: 0,
            ..LatticeConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MaxCells));
    }
}
