use crate::config::{Correction, Criterion, Rejection, SearchConfig};
use crate::scorer::ScoredAction;

/// Decides whether the best candidate of a step is good enough to add.
///
/// The p-value policies control the family-wise error rate over the whole search, each in its
/// own way of sharing the significance level between steps; they carry that state from one call
/// of [`accept`](Self::accept) to the next.
#[derive(Clone, Debug, PartialEq)]
pub enum Acceptance {
    /// Halves the significance level after every accepted edge, then divides it among the tests
    /// of the step.
    SinglePass {
        /// The level for the next step.
        level: f64,
        /// How a p-value equal to the threshold is treated.
        rejection: Rejection,
    },
    /// Divides what is left of the significance level among the tests of the step, then spends
    /// `p × tests` of it when the edge is accepted.
    Stepwise {
        /// The unspent significance level.
        remaining: f64,
        /// How a p-value equal to the threshold is treated.
        rejection: Rejection,
    },
    /// Spends a fixed share of what is left of the significance level at every step, whatever
    /// the outcome.
    BudgetShare {
        /// The unspent significance level.
        remaining: f64,
        /// The share spent per step.
        share: f64,
        /// How a p-value equal to the threshold is treated.
        rejection: Rejection,
    },
    /// Accepts scores below zero: the change in a criterion that must decrease.
    Improving,
    /// Accepts any finite score.
    Finite,
}

impl Acceptance {
    /// The policy matching `config`'s criterion and correction.
    pub fn new(config: &SearchConfig) -> Self {
        let alpha = config.p_value_threshold;
        let rejection = config.rejection;
        match config.criterion {
            Criterion::PValue => match config.correction {
                Correction::SinglePass => Acceptance::SinglePass {
                    level: alpha,
                    rejection,
                },
                Correction::Stepwise => Acceptance::Stepwise {
                    remaining: alpha,
                    rejection,
                },
                Correction::BudgetShare => Acceptance::BudgetShare {
                    remaining: alpha,
                    share: config.budget_share,
                    rejection,
                },
            },
            Criterion::Bic | Criterion::Mml | Criterion::Qnml => Acceptance::Improving,
            Criterion::Kl => Acceptance::Finite,
        }
    }

    /// Tests `action`, the best of `tests` candidates, and updates the policy's state.
    pub fn accept(&mut self, action: &ScoredAction, tests: usize) -> bool {
        let tests = tests.max(1) as f64;
        let p = action.score;
        match self {
            Acceptance::SinglePass { level, rejection } => {
                let accepted = !rejection.rejects(p, *level / tests);
                if accepted {
                    *level /= 2.0;
                }
                accepted
            }
            Acceptance::Stepwise {
                remaining,
                rejection,
            } => {
                let accepted = !rejection.rejects(p, *remaining / tests);
                if accepted {
                    *remaining -= p * tests;
                }
                accepted
            }
            Acceptance::BudgetShare {
                remaining,
                share,
                rejection,
            } => {
                let exposed = *share * *remaining;
                *remaining -= exposed;
                !rejection.rejects(p, exposed / tests)
            }
            Acceptance::Improving => action.score < 0.0,
            Acceptance::Finite => action.score < f64::INFINITY,
        }
    }
}

impl Rejection {
    fn rejects(self, p_value: f64, threshold: f64) -> bool {
        if p_value.is_nan() {
            return true;
        }
        match self {
            Rejection::Strict => p_value > threshold,
            Rejection::Inclusive => p_value >= threshold,
        }
    }
}
