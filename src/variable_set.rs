use smallvec::SmallVec;
use sorted_iter::assume::AssumeSortedByItemExt;
use sorted_iter::sorted_iterator::SortedByItem;
use sorted_iter::SortedIterator;
use std::iter;

/// Index of a categorical variable, in `0..n` for a dataset of `n` variables.
pub type Variable = usize;

/// A set of variables, kept sorted and free of duplicates so that it can be used directly as a
/// map key.
///
/// This implementation avoids heap allocations for sets of up to four variables, which covers
/// every separator and clique of a model with a small treewidth.
#[derive(Clone, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VariableSet(SmallVec<[Variable; 4]>);

impl VariableSet {
    /// The set of `variables`, in any order and with repeats allowed.
    pub fn new(variables: &[Variable]) -> Self {
        let mut sorted = SmallVec::from_slice(variables);
        sorted.sort_unstable();
        sorted.dedup();
        VariableSet(sorted)
    }

    /// The set with no variables in it.
    pub fn empty() -> Self {
        VariableSet(SmallVec::new())
    }

    /// The number of variables.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set has no variables.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The variables in ascending order, as a sorted iterator that `sorted_iter` can merge.
    ///
    /// ```
    /// use chordalysis::sorted_iter::SortedIterator;
    /// use chordalysis::VariableSet;
    ///
    /// let clique = VariableSet::new(&[7, 2, 5]);
    /// let separator = VariableSet::new(&[5, 2]);
    /// let private: Vec<usize> = clique.iter().difference(separator.iter()).collect();
    /// assert_eq!(private, [7]);
    /// ```
    pub fn iter(&self) -> impl Iterator<Item = Variable> + SortedByItem + Clone + '_ {
        self.0.iter().copied().assume_sorted_by_item()
    }

    /// The variables in ascending order.
    pub fn as_slice(&self) -> &[Variable] {
        &self.0
    }

    /// Returns `true` if `variable` is in the set.
    pub fn contains(&self, variable: Variable) -> bool {
        self.0.binary_search(&variable).is_ok()
    }

    /// Adds a variable, returning `false` if it was already present.
    pub fn insert(&mut self, variable: Variable) -> bool {
        match self.0.binary_search(&variable) {
            Ok(_) => false,
            Err(at) => {
                self.0.insert(at, variable);
                true
            }
        }
    }

    /// Returns a copy of this set with one more variable.
    ///
    /// ```
    /// use chordalysis::VariableSet;
    ///
    /// let separator = VariableSet::new(&[4]);
    /// assert_eq!(separator.with(1).with(9), VariableSet::new(&[1, 4, 9]));
    /// assert_eq!(separator.with(4), separator);
    /// ```
    pub fn with(&self, variable: Variable) -> Self {
        let mut extended = self.clone();
        extended.insert(variable);
        extended
    }

    /// The variables in either set.
    pub fn union(&self, other: &Self) -> Self {
        VariableSet(self.iter().union(other.iter()).collect())
    }

    /// The variables in both sets.
    pub fn intersection(&self, other: &Self) -> Self {
        VariableSet(self.iter().intersection(other.iter()).collect())
    }

    /// The variables in `self` but not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        VariableSet(self.iter().difference(other.iter()).collect())
    }

    /// Returns `true` if every variable of `self` is in `other`.
    ///
    /// ```
    /// use chordalysis::VariableSet;
    ///
    /// let joined = VariableSet::new(&[0, 1, 2]);
    /// assert!(VariableSet::new(&[0, 2]).is_subset(&joined));
    /// assert!(VariableSet::empty().is_subset(&joined));
    /// assert!(!VariableSet::new(&[2, 3]).is_subset(&joined));
    /// ```
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().difference(other.iter()).next().is_none()
    }

    /// Returns `true` if every variable of `other` is in `self`.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Splits off the largest variable. Returns `None` for the empty set.
    pub(crate) fn split_last(&self) -> Option<(Self, Variable)> {
        let (last, prefix) = self.0.split_last()?;
        Some((VariableSet(SmallVec::from_slice(prefix)), *last))
    }
}

impl std::fmt::Debug for VariableSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Collects variables in any order, with repeats allowed.
impl iter::FromIterator<Variable> for VariableSet {
    fn from_iter<I: IntoIterator<Item = Variable>>(iter: I) -> Self {
        let mut sorted: SmallVec<[Variable; 4]> = iter.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();
        VariableSet(sorted)
    }
}
