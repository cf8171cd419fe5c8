use crate::error::GraphError;
use crate::graph::{ChordalGraph, Edge, EdgeListener};
use crate::stats::{EntropyComputer, MessageLengthComputer, RegretComputer, SubsetStatistic};
use crate::{Variable, VariableSet};

/// A decomposable log-linear model: a chordal graph over categorical variables, whose maximal
/// cliques are the interactions the model keeps.
#[derive(Clone, Debug)]
pub struct DecomposableModel {
    graph: ChordalGraph,
    domain_sizes: Vec<usize>,
}

impl DecomposableModel {
    /// The model asserting that every variable is independent of all the others.
    pub fn independence(domain_sizes: &[usize]) -> Self {
        DecomposableModel {
            graph: ChordalGraph::new(domain_sizes.len()),
            domain_sizes: domain_sizes.to_vec(),
        }
    }

    /// The dependency graph.
    pub fn graph(&self) -> &ChordalGraph {
        &self.graph
    }

    /// The number of values of each variable.
    pub fn domain_sizes(&self) -> &[usize] {
        &self.domain_sizes
    }

    /// The number of variables.
    pub fn nb_variables(&self) -> usize {
        self.domain_sizes.len()
    }

    /// Returns `true` if the model links `a` and `b` directly.
    pub fn contains_interaction(&self, a: Variable, b: Variable) -> bool {
        self.graph.has_edge(a, b)
    }

    /// The direct interactions of the model.
    pub fn interactions(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edges()
    }

    /// The separator adding `(a, b)` would create, if it can be added.
    pub fn separator(&self, a: Variable, b: Variable) -> Option<VariableSet> {
        self.graph.separator(a, b)
    }

    /// The size of the clique adding `(a, b)` would create.
    pub fn clique_size_if_adding(&self, a: Variable, b: Variable) -> Option<usize> {
        self.separator(a, b).map(|separator| separator.len() + 2)
    }

    /// The treewidth contribution of the clique adding `(a, b)` would create, i.e. its size
    /// minus one.
    pub fn tree_width_if_adding(&self, a: Variable, b: Variable) -> Option<usize> {
        self.separator(a, b).map(|separator| separator.len() + 1)
    }

    /// The number of free parameters of a table over `variables`: the product of the domain
    /// sizes, minus one. `None` if it overflows.
    fn table_parameters(&self, variables: &VariableSet) -> Option<i64> {
        variables
            .iter()
            .try_fold(1i64, |cells, v| {
                cells.checked_mul(i64::try_from(self.domain_sizes[v]).ok()?)
            })
            .map(|cells| cells - 1)
    }

    /// The change in the number of parameters from adding `(a, b)`.
    pub fn parameters_diff_if_adding(&self, a: Variable, b: Variable) -> Option<i64> {
        let separator = self.separator(a, b)?;
        self.parameters_diff(&separator, a, b)
    }

    pub(crate) fn parameters_diff(
        &self,
        separator: &VariableSet,
        a: Variable,
        b: Variable,
    ) -> Option<i64> {
        let with_a = separator.with(a);
        let with_b = separator.with(b);
        let joined = with_a.with(b);
        let total = self.table_parameters(separator)?
            - self.table_parameters(&with_a)?
            - self.table_parameters(&with_b)?;
        total.checked_add(self.table_parameters(&joined)?)
    }

    /// The entropy the model loses by adding `(a, b)`: the conditional mutual information of
    /// `a` and `b` given their separator.
    pub fn entropy_diff_if_adding(
        &self,
        a: Variable,
        b: Variable,
        computer: &mut EntropyComputer<'_>,
    ) -> Option<f64> {
        let separator = self.separator(a, b)?;
        computer.interaction_gain(&separator, a, b)
    }

    /// The change in total message length from adding `(a, b)`: the cost of stating the new
    /// parameters, plus the change in the cost of stating the data given them.
    pub fn message_length_diff_if_adding(
        &self,
        a: Variable,
        b: Variable,
        computer: &mut MessageLengthComputer<'_>,
    ) -> Option<f64> {
        let separator = self.separator(a, b)?;
        let parameters = self.parameters_diff(&separator, a, b)? as f64;
        let data = -computer.interaction_gain(&separator, a, b)?;
        Some(parameters * computer.parameter_cost() + data)
    }

    /// The change in log minimax regret from adding `(a, b)`.
    pub fn regret_diff_if_adding(
        &self,
        a: Variable,
        b: Variable,
        computer: &mut RegretComputer<'_>,
    ) -> Option<f64> {
        let separator = self.separator(a, b)?;
        Some(-computer.interaction_gain(&separator, a, b)?)
    }

    /// Adds `edge` to the graph, reporting every change to the set of addable edges.
    pub fn add_interaction<L>(&mut self, edge: Edge, listener: &mut L) -> Result<(), GraphError>
    where
        L: EdgeListener + ?Sized,
    {
        self.graph.add_secured_edge(edge.a(), edge.b(), listener)
    }

    /// The number of free parameters of the model: clique parameters minus separator
    /// parameters, over the maximal cliques found by maximum cardinality search. Saturates
    /// instead of overflowing.
    pub fn nb_parameters(&self) -> i64 {
        let size = |set: &VariableSet| self.table_parameters(set).unwrap_or(i64::MAX);
        let cliques = self
            .graph
            .cliques_bfs()
            .iter()
            .fold(0i64, |total, clique| total.saturating_add(size(clique)));
        self.graph
            .separators_bfs()
            .iter()
            .fold(cliques, |total, separator| total.saturating_sub(size(separator)))
    }

    /// Sums a statistic over the cliques, minus the separators.
    fn decomposed<S: SubsetStatistic>(&self, computer: &mut S) -> Option<f64> {
        let mut total = 0.0;
        for clique in self.graph.cliques_bfs() {
            total += computer.value(clique)?;
        }
        for separator in self.graph.separators_bfs() {
            total -= computer.value(separator)?;
        }
        Some(total)
    }

    /// The entropy of the model's maximum-likelihood distribution.
    pub fn entropy(&self, computer: &mut EntropyComputer<'_>) -> Option<f64> {
        self.decomposed(computer)
    }

    /// The length of a message stating the model's parameters and then the data.
    pub fn message_length(&self, computer: &mut MessageLengthComputer<'_>) -> Option<f64> {
        let data = self.decomposed(computer)?;
        Some(self.nb_parameters() as f64 * computer.parameter_cost() + data)
    }

    /// Likelihood-based statistics of the model for the data behind `computer`.
    pub fn evaluate(&self, computer: &mut EntropyComputer<'_>) -> Option<ModelEvaluation> {
        Some(ModelEvaluation {
            entropy: self.entropy(computer)?,
            degrees_of_freedom: self.nb_parameters(),
            sample_size: computer.nb_instances(),
        })
    }
}

/// Summary statistics of a [`DecomposableModel`] fitted to some data.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct ModelEvaluation {
    /// The entropy of the fitted distribution, in nits.
    pub entropy: f64,
    /// The number of free parameters.
    pub degrees_of_freedom: i64,
    /// The number of instances.
    pub sample_size: usize,
}

impl ModelEvaluation {
    /// The natural logarithm of the likelihood of the data under the fitted distribution,
    /// ignoring the multinomial coefficient, which is the same for every model.
    pub fn log_likelihood(&self) -> f64 {
        -(self.sample_size as f64) * self.entropy
    }

    /// The [Akaike Information Criterion][aic]. Lower is better.
    ///
    /// [aic]: https://en.wikipedia.org/wiki/Akaike_information_criterion
    pub fn akaike_information_criterion(&self) -> f64 {
        2.0 * (self.degrees_of_freedom as f64 - self.log_likelihood())
    }

    /// The [Bayesian Information Criterion][bic]. Lower is better.
    ///
    /// [bic]: https://en.wikipedia.org/wiki/Bayesian_information_criterion
    pub fn bayesian_information_criterion(&self) -> f64 {
        let penalty = (self.sample_size as f64).ln() * self.degrees_of_freedom as f64;
        -2.0 * self.log_likelihood() + penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Lattice, LatticeConfig};

    #[test]
    fn independence_parameters() {
        let model = DecomposableModel::independence(&[2, 3, 4]);
        assert_eq!(model.nb_parameters(), 1 + 2 + 3);
        assert_eq!(model.parameters_diff_if_adding(0, 1), Some(5 - 1 - 2));
        assert_eq!(model.clique_size_if_adding(0, 2), Some(2));
        assert_eq!(model.tree_width_if_adding(0, 2), Some(1));
    }

    #[test]
    fn parameter_differences_add_up() {
        let mut model = DecomposableModel::independence(&[2, 3, 2, 4]);
        let mut expected = model.nb_parameters();
        for (a, b) in [(0, 1), (1, 2), (0, 2), (2, 3)] {
            expected += model.parameters_diff_if_adding(a, b).unwrap();
            model.add_interaction(Edge::new(a, b), &mut ()).unwrap();
            assert_eq!(model.nb_parameters(), expected);
        }
        // Cliques {0, 1, 2} and {2, 3} meeting at {2}.
        assert_eq!(expected, 11 + 7 - 1);
    }

    #[test]
    fn entropy_drops_by_the_gain() {
        let rows: Vec<Vec<Option<usize>>> = vec![
            vec![Some(0), Some(0), Some(1)],
            vec![Some(0), Some(1), Some(1)],
            vec![Some(1), Some(1), Some(0)],
            vec![Some(1), Some(1), Some(1)],
            vec![Some(1), Some(0), Some(0)],
        ];
        let lattice = Lattice::from_instances(&[2, 2, 2], &LatticeConfig::default(), rows).unwrap();
        let mut computer = EntropyComputer::new(&lattice);

        let mut model = DecomposableModel::independence(&[2, 2, 2]);
        for (a, b) in [(0, 1), (0, 2)] {
            let before = model.entropy(&mut computer).unwrap();
            let gain = model.entropy_diff_if_adding(a, b, &mut computer).unwrap();
            model.add_interaction(Edge::new(a, b), &mut ()).unwrap();
            let after = model.entropy(&mut computer).unwrap();
            assert!((before - gain - after).abs() < 1e-12);
        }
    }

    #[test]
    fn evaluation_criteria() {
        let evaluation = ModelEvaluation {
            entropy: 0.5,
            degrees_of_freedom: 3,
            sample_size: 100,
        };
        assert_eq!(evaluation.log_likelihood(), -50.0);
        assert_eq!(evaluation.akaike_information_criterion(), 106.0);
        let bic = 100.0 + 3.0 * 100f64.ln();
        assert!((evaluation.bayesian_information_criterion() - bic).abs() < 1e-9);
    }
}
