use crate::{Variable, VariableSet};

/// Maximal cliques and separators of a chordal graph, read off a maximum cardinality search.
///
/// This is computed from scratch, independently of the clique graph that edge additions maintain
/// incrementally, and is what parameter counts and message lengths are taken from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Decomposition {
    cliques: Vec<VariableSet>,
    separators: Vec<VariableSet>,
    visit_order: Vec<Variable>,
}

impl Decomposition {
    /// Runs a maximum cardinality search over `adjacency`.
    ///
    /// A clique ends whenever the next vertex visited has no more visited neighbours than the
    /// previous one; the visited neighbours of the vertex that starts a new clique form its
    /// separator, unless the vertex starts a new connected component. Ties between equally
    /// labelled vertices go to the smallest index.
    pub(crate) fn new(adjacency: &[VariableSet]) -> Self {
        let n = adjacency.len();
        let mut labels = vec![0usize; n];
        let mut visited = vec![false; n];
        let mut visit_order = Vec::with_capacity(n);
        let mut cliques = Vec::new();
        let mut separators = Vec::new();

        let mut previous: Option<(Variable, usize, VariableSet)> = None;
        while let Some(next) = (0..n)
            .filter(|v| !visited[*v])
            .fold(None, |best: Option<Variable>, v| match best {
                Some(b) if labels[b] >= labels[v] => Some(b),
                _ => Some(v),
            })
        {
            let label = labels[next];
            let earlier: VariableSet = adjacency[next].iter().filter(|u| visited[*u]).collect();

            if let Some((prev, prev_label, prev_earlier)) = previous.take() {
                if label <= prev_label {
                    cliques.push(prev_earlier.with(prev));
                    if !earlier.is_empty() {
                        separators.push(earlier.clone());
                    }
                }
            }

            visited[next] = true;
            visit_order.push(next);
            for u in adjacency[next].iter() {
                if !visited[u] {
                    labels[u] += 1;
                }
            }
            previous = Some((next, label, earlier));
        }

        if let Some((last, _, earlier)) = previous {
            cliques.push(earlier.with(last));
        }

        Decomposition {
            cliques,
            separators,
            visit_order,
        }
    }

    /// The maximal cliques, in the order the search closed them.
    pub fn cliques(&self) -> &[VariableSet] {
        &self.cliques
    }

    /// The separators, one per clique except the first clique of each connected component.
    pub fn separators(&self) -> &[VariableSet] {
        &self.separators
    }

    /// The order in which the search visited the vertices.
    pub fn visit_order(&self) -> &[Variable] {
        &self.visit_order
    }

    /// A perfect elimination ordering: the reverse of the visit order.
    pub fn elimination_ordering(&self) -> Vec<Variable> {
        self.visit_order.iter().rev().copied().collect()
    }

    /// The size of the largest clique, or 0 for a graph without vertices.
    pub fn max_clique_size(&self) -> usize {
        self.cliques.iter().map(VariableSet::len).max().unwrap_or(0)
    }
}

/// An acyclic orientation of a chordal graph. Each vertex's parents are its neighbours visited
/// before it by the maximum cardinality search, which in a chordal graph always form a clique, so
/// moralizing the network gives back the undirected graph.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BayesianNetwork {
    order: Vec<Variable>,
    parents: Vec<VariableSet>,
}

impl BayesianNetwork {
    pub(crate) fn new(adjacency: &[VariableSet], decomposition: &Decomposition) -> Self {
        let mut rank = vec![0; adjacency.len()];
        for (position, v) in decomposition.visit_order().iter().enumerate() {
            rank[*v] = position;
        }
        let parents = adjacency
            .iter()
            .enumerate()
            .map(|(v, neighbours)| neighbours.iter().filter(|u| rank[*u] < rank[v]).collect())
            .collect();
        BayesianNetwork {
            order: decomposition.visit_order().to_vec(),
            parents,
        }
    }

    /// A topological order of the network: parents always come before their children.
    pub fn order(&self) -> &[Variable] {
        &self.order
    }

    /// The parents of `variable`.
    pub fn parents(&self, variable: Variable) -> &VariableSet {
        &self.parents[variable]
    }

    /// Every arc as `(parent, child)`.
    pub fn arcs(&self) -> impl Iterator<Item = (Variable, Variable)> + '_ {
        self.parents
            .iter()
            .enumerate()
            .flat_map(|(child, parents)| parents.iter().map(move |parent| (parent, child)))
    }

    /// The undirected graph obtained by dropping arc directions and marrying the parents of
    /// every vertex, as one neighbour set per vertex.
    pub fn moral_graph(&self) -> Vec<VariableSet> {
        let mut adjacency = vec![VariableSet::empty(); self.parents.len()];
        for (child, parents) in self.parents.iter().enumerate() {
            for parent in parents.iter() {
                adjacency[child].insert(parent);
                adjacency[parent].insert(child);
                for other in parents.iter().filter(|other| *other != parent) {
                    adjacency[parent].insert(other);
                }
            }
        }
        adjacency
    }
}
