/// A set of instance (row) indices in `0..universe`, stored as a dense bitmap.
///
/// One of these exists for every value of every variable, and a 2-variable lattice node keeps
/// one per cell, so the representation stays as flat as possible: 64 instances per word.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct InstanceSet {
    words: Vec<u64>,
    universe: usize,
}

impl InstanceSet {
    /// Creates an empty set able to hold instances `0..universe`.
    pub fn new(universe: usize) -> Self {
        InstanceSet {
            words: vec![0; (universe + 63) / 64],
            universe,
        }
    }

    /// Creates a set containing the given instances.
    ///
    /// ```
    /// use chordalysis::InstanceSet;
    ///
    /// let set = InstanceSet::from_indices(100, vec![3, 70, 3]);
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains(70));
    /// assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 70]);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if any index is not below `universe`.
    pub fn from_indices<I: IntoIterator<Item = usize>>(universe: usize, indices: I) -> Self {
        let mut set = InstanceSet::new(universe);
        for index in indices {
            set.insert(index);
        }
        set
    }

    /// The number of instances this set could hold.
    pub fn universe(&self) -> usize {
        self.universe
    }

    /// Adds an instance to the set.
    ///
    /// # Panics
    ///
    /// Panics if `instance` is not below the universe size.
    pub fn insert(&mut self, instance: usize) {
        assert!(
            instance < self.universe,
            "instance {} outside a universe of {}",
            instance,
            self.universe
        );
        self.words[instance / 64] |= 1 << (instance % 64);
    }

    /// Returns `true` if `instance` is in the set.
    pub fn contains(&self, instance: usize) -> bool {
        instance < self.universe && self.words[instance / 64] & (1 << (instance % 64)) != 0
    }

    /// The number of instances in the set.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns `true` if no instance is in the set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// The instances in both sets.
    pub fn intersection(&self, other: &Self) -> Self {
        debug_assert_eq!(self.universe, other.universe);
        InstanceSet {
            words: self
                .words
                .iter()
                .zip(other.words.iter())
                .map(|(a, b)| a & b)
                .collect(),
            universe: self.universe,
        }
    }

    /// The size of the intersection, without building it.
    pub fn intersection_len(&self, other: &Self) -> usize {
        debug_assert_eq!(self.universe, other.universe);
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & b).count_ones() as usize)
            .sum()
    }

    /// Adds every instance of `other` to this set.
    pub fn union_with(&mut self, other: &Self) {
        debug_assert_eq!(self.universe, other.universe);
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a |= b;
        }
    }

    /// Returns an iterator over the instances in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, word)| {
            let mut word = *word;
            std::iter::from_fn(move || {
                if word == 0 {
                    return None;
                }
                let bit = word.trailing_zeros() as usize;
                word &= word - 1;
                Some(index * 64 + bit)
            })
        })
    }
}

impl std::fmt::Debug for InstanceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_boundaries() {
        let set = InstanceSet::from_indices(130, vec![0, 63, 64, 127, 128, 129]);
        assert_eq!(set.len(), 6);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 63, 64, 127, 128, 129]);
        assert!(!set.contains(130));
    }

    #[test]
    fn intersection_matches_len() {
        let a = InstanceSet::from_indices(200, (0..200).step_by(2));
        let b = InstanceSet::from_indices(200, (0..200).step_by(3));
        let both = a.intersection(&b);
        assert_eq!(both.len(), a.intersection_len(&b));
        assert_eq!(both.iter().collect::<Vec<_>>(), (0..200).step_by(6).collect::<Vec<_>>());
    }

    #[test]
    fn union_with_accumulates() {
        let mut a = InstanceSet::from_indices(10, vec![1, 2]);
        a.union_with(&InstanceSet::from_indices(10, vec![2, 9]));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 2, 9]);
        assert!(InstanceSet::new(10).is_empty());
    }

    #[test]
    #[should_panic]
    fn insert_outside_universe() {
        InstanceSet::new(4).insert(4);
    }
}
