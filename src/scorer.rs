//! Ranking candidate edges.
//!
//! Every criterion is arranged so that lower scores are better. An edge the search must never
//! take, because it would exceed the clique-size cap or because a statistic it needs can't be
//! computed, gets the worst score its criterion can give: a p-value of 1, or `+∞`.

use crate::config::{Criterion, SearchConfig};
use crate::graph::Edge;
use crate::model::DecomposableModel;
use crate::stats::{EntropyComputer, MessageLengthComputer, RegretComputer, SubsetStatistic};
use crate::Lattice;
use serde::Serialize;
use statrs::distribution::{ChiSquared, Univariate};
use std::cmp::Ordering;

/// Entropy gains at or below this are treated as no gain at all by [`Criterion::Kl`].
const NEGLIGIBLE_GAIN: f64 = 1e-12;

/// A candidate edge and what adding it to the current model would change.
///
/// Actions sort by score, then by fewer added parameters, then by larger entropy gain, and
/// finally by edge, so the order is total and deterministic.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ScoredAction {
    /// The edge to add.
    pub edge: Edge,
    /// The criterion's score. Lower is better.
    pub score: f64,
    /// The change in the number of free parameters.
    pub degrees_of_freedom: i64,
    /// The conditional mutual information of the endpoints given their separator, in nits.
    /// Zero when it wasn't computed.
    pub entropy_gain: f64,
}

impl Ord for ScoredAction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.degrees_of_freedom.cmp(&other.degrees_of_freedom))
            .then(other.entropy_gain.total_cmp(&self.entropy_gain))
            .then(self.edge.cmp(&other.edge))
    }
}

impl PartialOrd for ScoredAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScoredAction {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredAction {}

/// The upper tail of the chi-squared distribution: the probability of a likelihood-ratio
/// statistic at least as large as `statistic` if the extra `degrees_of_freedom` parameters were
/// useless. Degenerate inputs give 1.
pub(crate) fn chi_squared_p_value(statistic: f64, degrees_of_freedom: i64) -> f64 {
    if degrees_of_freedom <= 0 || statistic.is_nan() || statistic <= 0.0 {
        return 1.0;
    }
    match ChiSquared::new(degrees_of_freedom as f64) {
        Ok(chi2) => (1.0 - chi2.cdf(statistic)).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

#[derive(Debug)]
enum Statistic<'a> {
    PValue,
    Bic,
    Kl { per_parameter: bool },
    Mml(MessageLengthComputer<'a>),
    Qnml(RegretComputer<'a>),
}

/// Scores candidate edges against a model under one [`Criterion`], caching every subset
/// statistic it computes.
#[derive(Debug)]
pub struct Scorer<'a> {
    entropy: EntropyComputer<'a>,
    statistic: Statistic<'a>,
    max_clique_size: Option<usize>,
}

impl<'a> Scorer<'a> {
    /// A scorer for `config.criterion` over the data in `lattice`.
    pub fn new(lattice: &'a Lattice, config: &SearchConfig) -> Self {
        let statistic = match config.criterion {
            Criterion::PValue => Statistic::PValue,
            Criterion::Bic => Statistic::Bic,
            Criterion::Kl => Statistic::Kl {
                per_parameter: config.normalise_by_parameters,
            },
            Criterion::Mml => Statistic::Mml(MessageLengthComputer::new(lattice)),
            Criterion::Qnml => Statistic::Qnml(RegretComputer::new(lattice)),
        };
        Scorer {
            entropy: EntropyComputer::new(lattice),
            statistic,
            max_clique_size: config.max_clique_size,
        }
    }

    /// The criterion this scorer ranks by.
    pub fn criterion(&self) -> Criterion {
        match self.statistic {
            Statistic::PValue => Criterion::PValue,
            Statistic::Bic => Criterion::Bic,
            Statistic::Kl { .. } => Criterion::Kl,
            Statistic::Mml(_) => Criterion::Mml,
            Statistic::Qnml(_) => Criterion::Qnml,
        }
    }

    /// The entropy cache shared by every criterion.
    pub fn entropy(&mut self) -> &mut EntropyComputer<'a> {
        &mut self.entropy
    }

    fn worst(&self) -> f64 {
        match self.statistic {
            Statistic::PValue => 1.0,
            _ => f64::INFINITY,
        }
    }

    /// Scores adding `edge` to `model`.
    pub fn score(&mut self, model: &DecomposableModel, edge: Edge) -> ScoredAction {
        let (a, b) = (edge.a(), edge.b());
        let mut action = ScoredAction {
            edge,
            score: self.worst(),
            degrees_of_freedom: i64::MAX,
            entropy_gain: 0.0,
        };

        let separator = match model.separator(a, b) {
            Some(separator) => separator,
            None => return action,
        };
        let degrees_of_freedom = match model.parameters_diff(&separator, a, b) {
            Some(df) => df,
            None => return action,
        };
        action.degrees_of_freedom = degrees_of_freedom;
        if matches!(self.max_clique_size, Some(max) if separator.len() + 2 > max) {
            return action;
        }
        // No instances, no evidence for any edge.
        if self.entropy.nb_instances() == 0 {
            return action;
        }

        let gain = match self.entropy.interaction_gain(&separator, a, b) {
            Some(gain) => gain,
            None => return action,
        };
        action.entropy_gain = gain;

        let n = self.entropy.nb_instances() as f64;
        let df = degrees_of_freedom as f64;
        let score = match &mut self.statistic {
            Statistic::PValue => Some(chi_squared_p_value(2.0 * n * gain, degrees_of_freedom)),
            Statistic::Bic => Some(-2.0 * n * gain + df * n.ln()),
            Statistic::Kl { per_parameter } => {
                if gain <= NEGLIGIBLE_GAIN {
                    None
                } else if *per_parameter {
                    Some(df / gain)
                } else {
                    Some(1.0 / gain)
                }
            }
            Statistic::Mml(lengths) => lengths
                .interaction_gain(&separator, a, b)
                .map(|shared| df * lengths.parameter_cost() - shared),
            Statistic::Qnml(regrets) => regrets
                .interaction_gain(&separator, a, b)
                .map(|shared| -n * gain - shared),
        };
        if let Some(score) = score.filter(|score| !score.is_nan()) {
            action.score = score;
        }
        action
    }
}
