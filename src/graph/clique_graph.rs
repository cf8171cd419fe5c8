use crate::VariableSet;
use std::collections::{BTreeMap, HashMap};

/// Index of a clique in a [`CliqueGraph`]. Indices are never reused, so an index held across
/// edge additions either still names the same clique or names nothing.
pub type CliqueId = usize;

#[derive(Clone, Debug)]
struct Clique {
    variables: VariableSet,
    /// Adjacent cliques and the separator shared with each.
    links: BTreeMap<CliqueId, VariableSet>,
}

/// The maximal cliques of a chordal graph, linked by their separators.
///
/// Two cliques are linked when their intersection is a minimal separator of the variables
/// unique to each, which makes this the union of all the junction trees of the graph. Any
/// spanning tree of maximum total separator size satisfies the running-intersection property.
#[derive(Clone, Debug, Default)]
pub struct CliqueGraph {
    slots: Vec<Option<Clique>>,
    index: HashMap<VariableSet, CliqueId>,
}

impl CliqueGraph {
    /// The number of cliques.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if there are no cliques.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The variables of a clique, if `id` names a live one.
    pub fn get(&self, id: CliqueId) -> Option<&VariableSet> {
        self.slots
            .get(id)
            .and_then(Option::as_ref)
            .map(|clique| &clique.variables)
    }

    /// Looks a clique up by its variables.
    pub fn find(&self, variables: &VariableSet) -> Option<CliqueId> {
        self.index.get(variables).copied()
    }

    /// Every live clique, in creation order.
    pub fn cliques(&self) -> impl Iterator<Item = (CliqueId, &VariableSet)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|clique| (id, &clique.variables)))
    }

    /// The cliques linked to `id`, with the separator of each link.
    pub fn neighbours(&self, id: CliqueId) -> impl Iterator<Item = (CliqueId, &VariableSet)> + '_ {
        self.slots
            .get(id)
            .and_then(Option::as_ref)
            .into_iter()
            .flat_map(|clique| clique.links.iter().map(|(other, sep)| (*other, sep)))
    }

    /// Every link once, as `(smaller id, larger id, separator)`.
    pub fn links(&self) -> impl Iterator<Item = (CliqueId, CliqueId, &VariableSet)> + '_ {
        self.cliques().flat_map(move |(id, _)| {
            self.neighbours(id)
                .filter(move |(other, _)| id < *other)
                .map(move |(other, sep)| (id, other, sep))
        })
    }

    /// The separator of the link between two cliques, if they are linked.
    pub fn separator(&self, first: CliqueId, second: CliqueId) -> Option<&VariableSet> {
        self.slots
            .get(first)
            .and_then(Option::as_ref)
            .and_then(|clique| clique.links.get(&second))
    }

    /// Returns `true` if the two cliques are linked.
    pub fn has_link(&self, first: CliqueId, second: CliqueId) -> bool {
        self.separator(first, second).is_some()
    }

    /// Adds a clique, or returns the existing one with the same variables.
    pub(crate) fn insert_clique(&mut self, variables: VariableSet) -> CliqueId {
        if let Some(id) = self.find(&variables) {
            return id;
        }
        let id = self.slots.len();
        self.index.insert(variables.clone(), id);
        self.slots.push(Some(Clique {
            variables,
            links: BTreeMap::new(),
        }));
        id
    }

    /// Removes a clique and all of its links.
    pub(crate) fn remove_clique(&mut self, id: CliqueId) -> Option<VariableSet> {
        let clique = self.slots.get_mut(id)?.take()?;
        for other in clique.links.keys() {
            if let Some(Some(neighbour)) = self.slots.get_mut(*other) {
                neighbour.links.remove(&id);
            }
        }
        self.index.remove(&clique.variables);
        Some(clique.variables)
    }

    /// Links two live, distinct cliques, labelling the link with their intersection. Returns
    /// `false` if they were already linked or cannot be.
    pub(crate) fn insert_link(&mut self, first: CliqueId, second: CliqueId) -> bool {
        if first == second || self.has_link(first, second) {
            return false;
        }
        let separator = match (self.get(first), self.get(second)) {
            (Some(a), Some(b)) => a.intersection(b),
            _ => return false,
        };
        debug_assert!(!separator.is_empty(), "clique link without a separator");
        if let Some(Some(clique)) = self.slots.get_mut(first) {
            clique.links.insert(second, separator.clone());
        }
        if let Some(Some(clique)) = self.slots.get_mut(second) {
            clique.links.insert(first, separator);
        }
        true
    }

    /// Unlinks two cliques. Returns `false` if they were not linked.
    pub(crate) fn remove_link(&mut self, first: CliqueId, second: CliqueId) -> bool {
        let mut removed = false;
        if let Some(Some(clique)) = self.slots.get_mut(first) {
            removed = clique.links.remove(&second).is_some();
        }
        if let Some(Some(clique)) = self.slots.get_mut(second) {
            clique.links.remove(&first);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_carry_separators() {
        let mut graph = CliqueGraph::default();
        let ab = graph.insert_clique(VariableSet::new(&[0, 1]));
        let bc = graph.insert_clique(VariableSet::new(&[1, 2]));
        assert!(graph.insert_link(ab, bc));
        assert!(!graph.insert_link(bc, ab));
        assert_eq!(graph.separator(bc, ab), Some(&VariableSet::new(&[1])));
        assert_eq!(graph.links().count(), 1);
    }

    #[test]
    fn removal_drops_links_and_keeps_ids() {
        let mut graph = CliqueGraph::default();
        let ab = graph.insert_clique(VariableSet::new(&[0, 1]));
        let bc = graph.insert_clique(VariableSet::new(&[1, 2]));
        graph.insert_link(ab, bc);
        assert_eq!(graph.remove_clique(ab), Some(VariableSet::new(&[0, 1])));
        assert_eq!(graph.neighbours(bc).count(), 0);
        assert_eq!(graph.get(ab), None);
        let cd = graph.insert_clique(VariableSet::new(&[2, 3]));
        assert_ne!(cd, ab);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn duplicate_cliques_share_an_id() {
        let mut graph = CliqueGraph::default();
        let first = graph.insert_clique(VariableSet::new(&[4]));
        let again = graph.insert_clique(VariableSet::new(&[4]));
        assert_eq!(first, again);
        assert_eq!(graph.find(&VariableSet::new(&[4])), Some(first));
    }
}
