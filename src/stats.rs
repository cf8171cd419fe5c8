//! Statistics of variable subsets, memoized per subset.
//!
//! Every statistic here is a function of the contingency table of a subset, as provided by the
//! [`Lattice`]. All logarithms are natural, so entropies and lengths are measured in nits.

use crate::{Lattice, Variable, VariableSet};
use statrs::function::factorial::{ln_binomial, ln_factorial};
use std::collections::HashMap;

/// A statistic of variable subsets that can be undefined when the subset's table is too large
/// to build.
pub trait SubsetStatistic {
    /// The value of the statistic for `variables`, or `None` if it can't be computed.
    fn value(&mut self, variables: &VariableSet) -> Option<f64>;

    /// `f(S ∪ {a}) + f(S ∪ {b}) − f(S) − f(S ∪ {a, b})`: how much of the statistic is shared
    /// between `a` and `b` once `separator` is known.
    ///
    /// For entropy this is the conditional mutual information of `a` and `b` given `separator`,
    /// which is the entropy a decomposable model loses by joining `a` and `b` through it.
    fn interaction_gain(
        &mut self,
        separator: &VariableSet,
        a: Variable,
        b: Variable,
    ) -> Option<f64> {
        let with_a = separator.with(a);
        let with_b = separator.with(b);
        let joined = with_a.with(b);
        let shared = self.value(&with_a)? + self.value(&with_b)?;
        Some(shared - self.value(separator)? - self.value(&joined)?)
    }
}

/// Sums the `c ln c` terms of a table. The [entropy] of a table of `n` instances is then
/// `ln n − sum / n`.
///
/// [entropy]: https://en.wikipedia.org/wiki/Entropy_(information_theory)
fn sum_count_log_count(counts: &[u32]) -> f64 {
    counts
        .iter()
        .filter(|count| **count > 0)
        .map(|count| {
            let count = f64::from(*count);
            count * count.ln()
        })
        .sum()
}

/// The empirical joint entropy of variable subsets.
///
/// ```
/// use chordalysis::{EntropyComputer, Lattice, LatticeConfig, SubsetStatistic, VariableSet};
///
/// let rows: Vec<[Option<usize>; 2]> = vec![[Some(0), Some(0)], [Some(1), Some(1)]];
/// let lattice = Lattice::from_instances(&[2, 2], &LatticeConfig::default(), rows).unwrap();
/// let mut entropy = EntropyComputer::new(&lattice);
///
/// let ln2 = std::f64::consts::LN_2;
/// assert!((entropy.value(&VariableSet::new(&[0])).unwrap() - ln2).abs() < 1e-12);
/// // Both variables always agree, so together they carry no more than each alone.
/// let gain = entropy.interaction_gain(&VariableSet::empty(), 0, 1).unwrap();
/// assert!((gain - ln2).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct EntropyComputer<'a> {
    lattice: &'a Lattice,
    lookup: HashMap<VariableSet, Option<f64>>,
}

impl<'a> EntropyComputer<'a> {
    /// An empty cache over `lattice`.
    pub fn new(lattice: &'a Lattice) -> Self {
        EntropyComputer {
            lattice,
            lookup: HashMap::new(),
        }
    }

    /// The number of instances in the lattice.
    pub fn nb_instances(&self) -> usize {
        self.lattice.nb_instances()
    }

    /// The number of subsets computed so far.
    pub fn nb_cached(&self) -> usize {
        self.lookup.len()
    }
}

impl SubsetStatistic for EntropyComputer<'_> {
    fn value(&mut self, variables: &VariableSet) -> Option<f64> {
        if let Some(entropy) = self.lookup.get(variables) {
            return *entropy;
        }
        let n = self.lattice.nb_instances();
        let entropy = self.lattice.node(variables).map(|node| {
            if variables.is_empty() || n == 0 {
                return 0.0;
            }
            let n = n as f64;
            n.ln() - sum_count_log_count(node.counts()) / n
        });
        self.lookup.insert(variables.clone(), entropy);
        entropy
    }
}

/// The length of the message stating which instances fall in each cell of a subset's table,
/// once the cell counts are known: `ln N! − Σ ln c!`.
#[derive(Debug)]
pub struct MessageLengthComputer<'a> {
    lattice: &'a Lattice,
    lookup: HashMap<VariableSet, Option<f64>>,
}

impl<'a> MessageLengthComputer<'a> {
    /// An empty cache over `lattice`.
    pub fn new(lattice: &'a Lattice) -> Self {
        MessageLengthComputer {
            lattice,
            lookup: HashMap::new(),
        }
    }

    /// The number of instances in the lattice.
    pub fn nb_instances(&self) -> usize {
        self.lattice.nb_instances()
    }

    /// The cost of stating one free parameter of a table: `ln(N + 1)`, as every count from 0 to
    /// `N` is equally likely.
    pub fn parameter_cost(&self) -> f64 {
        (self.lattice.nb_instances() as f64 + 1.0).ln()
    }
}

impl SubsetStatistic for MessageLengthComputer<'_> {
    fn value(&mut self, variables: &VariableSet) -> Option<f64> {
        if let Some(length) = self.lookup.get(variables) {
            return *length;
        }
        let length = self.lattice.node(variables).map(|node| {
            let positions = ln_factorial(self.lattice.nb_instances() as u64);
            node.counts()
                .iter()
                .fold(positions, |length, count| length - ln_factorial(u64::from(*count)))
        });
        self.lookup.insert(variables.clone(), length);
        length
    }
}

/// The logarithm of the minimax regret of a multinomial over as many categories as a subset's
/// table has cells, for the lattice's number of instances.
///
/// The regrets `C(K)` are built up once with the recurrence `C(1) = 1`,
/// `C(2) = Σ_r binom(N, r) (r/N)^r ((N−r)/N)^(N−r)` and `C(K) = C(K−1) + N/(K−2) C(K−2)`, and
/// stored in logarithmic form.
#[derive(Debug)]
pub struct RegretComputer<'a> {
    lattice: &'a Lattice,
    log_regrets: Vec<f64>,
    lookup: HashMap<VariableSet, Option<f64>>,
}

impl<'a> RegretComputer<'a> {
    /// An empty cache over `lattice`.
    pub fn new(lattice: &'a Lattice) -> Self {
        let n = lattice.nb_instances();
        // Index 0 is unused: there is no multinomial without categories.
        let log_regrets = vec![0.0, 0.0, log_binary_regret(n)];
        RegretComputer {
            lattice,
            log_regrets,
            lookup: HashMap::new(),
        }
    }

    /// `ln C(K)` for `K = categories`, extending the table as needed.
    pub fn log_regret(&mut self, categories: usize) -> f64 {
        let n = self.lattice.nb_instances() as f64;
        while self.log_regrets.len() <= categories {
            let k = self.log_regrets.len();
            let previous = self.log_regrets[k - 1];
            let before = self.log_regrets[k - 2];
            let step = n / (k - 2) as f64 * (before - previous).exp();
            self.log_regrets.push(previous + step.ln_1p());
        }
        self.log_regrets[categories]
    }
}

/// `ln C(2)`, summed in logarithmic form to stay finite for large `n`.
fn log_binary_regret(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let total = n as f64;
    let terms: Vec<f64> = (0..=n)
        .map(|r| {
            let mut term = ln_binomial(n as u64, r as u64);
            if r > 0 {
                term += r as f64 * (r as f64 / total).ln();
            }
            if r < n {
                term += (n - r) as f64 * ((n - r) as f64 / total).ln();
            }
            term
        })
        .collect();
    let max = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    max + terms.iter().map(|term| (term - max).exp()).sum::<f64>().ln()
}

impl SubsetStatistic for RegretComputer<'_> {
    fn value(&mut self, variables: &VariableSet) -> Option<f64> {
        if let Some(regret) = self.lookup.get(variables) {
            return *regret;
        }
        let regret = self
            .lattice
            .nb_cells(variables)
            .map(|cells| self.log_regret(cells));
        self.lookup.insert(variables.clone(), regret);
        regret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LatticeConfig;

    fn lattice(domain_sizes: &[usize], rows: &[&[usize]]) -> Lattice {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|v| Some(*v)).collect::<Vec<_>>());
        Lattice::from_instances(domain_sizes, &LatticeConfig::default(), rows).unwrap()
    }

    #[test]
    fn entropy_of_uniform_table() {
        let lattice = lattice(&[4], &[&[0], &[1], &[2], &[3]]);
        let mut entropy = EntropyComputer::new(&lattice);
        let h = entropy.value(&VariableSet::new(&[0])).unwrap();
        assert!((h - 4f64.ln()).abs() < 1e-12);
        assert_eq!(entropy.value(&VariableSet::empty()), Some(0.0));
        assert_eq!(entropy.nb_cached(), 2);
    }

    #[test]
    fn independent_variables_share_nothing() {
        let lattice = lattice(&[2, 2], &[&[0, 0], &[0, 1], &[1, 0], &[1, 1]]);
        let mut entropy = EntropyComputer::new(&lattice);
        let gain = entropy
            .interaction_gain(&VariableSet::empty(), 0, 1)
            .unwrap();
        assert!(gain.abs() < 1e-12);
    }

    #[test]
    fn undefined_when_table_is_too_large() {
        let config = LatticeConfig {
            max_cells: 4,
            ..LatticeConfig::default()
        };
        let rows = vec![vec![Some(0); 3]];
        let lattice = Lattice::from_instances(&[2, 2, 2], &config, rows).unwrap();
        let mut entropy = EntropyComputer::new(&lattice);
        assert_eq!(entropy.value(&VariableSet::new(&[0, 1, 2])), None);
        assert_eq!(
            entropy.interaction_gain(&VariableSet::new(&[0]), 1, 2),
            None
        );
        let mut regret = RegretComputer::new(&lattice);
        assert_eq!(regret.value(&VariableSet::new(&[0, 1, 2])), None);
    }

    #[test]
    fn wide_variables_are_undefined_everywhere() {
        let config = LatticeConfig {
            max_cells: 3,
            ..LatticeConfig::default()
        };
        let rows = vec![vec![Some(3), Some(1)], vec![Some(0), Some(1)]];
        let lattice = Lattice::from_instances(&[5, 2], &config, rows).unwrap();
        let wide = VariableSet::new(&[0]);
        let narrow = VariableSet::new(&[1]);
        let mut entropy = EntropyComputer::new(&lattice);
        let mut regret = RegretComputer::new(&lattice);
        let mut length = MessageLengthComputer::new(&lattice);
        assert_eq!(entropy.value(&wide), None);
        assert_eq!(regret.value(&wide), None);
        assert_eq!(length.value(&wide), None);
        assert!(entropy.value(&narrow).is_some());
        assert!(regret.value(&narrow).is_some());
        assert!(length.value(&narrow).is_some());
    }

    #[test]
    fn message_length_counts_arrangements() {
        // Two instances in distinct cells can be ordered in 2! ways.
        let lattice = lattice(&[2], &[&[0], &[1]]);
        let mut length = MessageLengthComputer::new(&lattice);
        let l = length.value(&VariableSet::new(&[0])).unwrap();
        assert!((l - 2f64.ln()).abs() < 1e-12);
        assert!(length.value(&VariableSet::empty()).unwrap().abs() < 1e-12);
        assert!((length.parameter_cost() - 3f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn regret_with_one_instance_counts_categories() {
        let lattice = lattice(&[2], &[&[0]]);
        let mut regret = RegretComputer::new(&lattice);
        for k in 1..10 {
            assert!((regret.log_regret(k) - (k as f64).ln()).abs() < 1e-9, "K = {}", k);
        }
    }

    #[test]
    fn binary_regret_for_two_instances() {
        let lattice = lattice(&[2], &[&[0], &[1]]);
        let mut regret = RegretComputer::new(&lattice);
        assert!((regret.log_regret(2) - 2.5f64.ln()).abs() < 1e-9);
        // C(3) = C(2) + N C(1)
        assert!((regret.log_regret(3) - 4.5f64.ln()).abs() < 1e-9);
    }
}
