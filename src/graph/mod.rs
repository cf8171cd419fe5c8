//! Chordal graphs that stay chordal as edges are added.
//!
//! A [`ChordalGraph`] keeps, next to its adjacency lists, the [`CliqueGraph`] of its maximal
//! cliques and the set of non-edges that could be added without creating a chordless cycle. Both
//! are updated locally around the clique each new edge creates, following Ibarra's dynamic
//! algorithm for chordal graphs, so that a greedy search can keep a priority queue of addable
//! edges in sync with the graph through an [`EdgeListener`].

use crate::error::GraphError;
use crate::{Variable, VariableSet};
use serde::Serialize;
use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use tracing::{trace, warn};

mod clique_graph;
mod decomposition;

pub use clique_graph::{CliqueGraph, CliqueId};
pub use decomposition::{BayesianNetwork, Decomposition};

/// An undirected pair of distinct variables, stored with the smaller index first.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Edge {
    a: Variable,
    b: Variable,
}

impl Edge {
    /// The edge between `x` and `y`, in either order.
    ///
    /// ```
    /// use chordalysis::Edge;
    ///
    /// assert_eq!(Edge::new(3, 1), Edge::new(1, 3));
    /// assert_eq!(Edge::new(3, 1).a(), 1);
    /// ```
    pub fn new(x: Variable, y: Variable) -> Self {
        if x <= y {
            Edge { a: x, b: y }
        } else {
            Edge { a: y, b: x }
        }
    }

    /// The smaller endpoint.
    pub fn a(self) -> Variable {
        self.a
    }

    /// The larger endpoint.
    pub fn b(self) -> Variable {
        self.b
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}

/// Receives every change to the set of addable edges made by
/// [`ChordalGraph::add_secured_edge`].
pub trait EdgeListener {
    /// `edge` became addable.
    fn enable_edge(&mut self, edge: Edge);
    /// `edge` is no longer addable.
    fn disable_edge(&mut self, edge: Edge);
    /// `edge` is still addable, but adding it would now create a different separator.
    fn update_edge(&mut self, edge: Edge);
}

/// Ignores every notification.
impl EdgeListener for () {
    fn enable_edge(&mut self, _edge: Edge) {}
    fn disable_edge(&mut self, _edge: Edge) {}
    fn update_edge(&mut self, _edge: Edge) {}
}

/// What adding an eligible edge would do: join two linked cliques through their separator.
#[derive(Clone, Debug, Eq, PartialEq)]
struct Candidate {
    cliques: (CliqueId, CliqueId),
    separator: VariableSet,
}

/// One optional candidate per unordered pair of vertices, in a packed lower triangle.
#[derive(Clone, Debug)]
struct Eligibility {
    slots: Vec<Option<Candidate>>,
}

impl Eligibility {
    /// Every pair is addable in a graph without edges, joining two singleton cliques whose ids
    /// are the vertices themselves.
    fn new(nb_vertices: usize) -> Self {
        let slots = (0..nb_vertices)
            .flat_map(|b| {
                (0..b).map(move |a| {
                    Some(Candidate {
                        cliques: (a, b),
                        separator: VariableSet::empty(),
                    })
                })
            })
            .collect();
        Eligibility { slots }
    }

    fn index(edge: Edge) -> usize {
        edge.b * (edge.b - 1) / 2 + edge.a
    }

    fn get(&self, edge: Edge) -> Option<&Candidate> {
        if edge.a == edge.b {
            return None;
        }
        self.slots.get(Self::index(edge)).and_then(Option::as_ref)
    }

    fn enable<L: EdgeListener + ?Sized>(
        &mut self,
        edge: Edge,
        candidate: Candidate,
        adjacency: &[VariableSet],
        listener: &mut L,
    ) {
        if edge.a == edge.b || adjacency[edge.a].contains(edge.b) {
            return;
        }
        let slot = &mut self.slots[Self::index(edge)];
        match slot {
            None => {
                *slot = Some(candidate);
                listener.enable_edge(edge);
            }
            Some(current) if *current != candidate => {
                let moved = current.separator != candidate.separator;
                *current = candidate;
                if moved {
                    listener.update_edge(edge);
                }
            }
            Some(_) => {}
        }
    }

    fn disable<L: EdgeListener + ?Sized>(&mut self, edge: Edge, listener: &mut L) {
        if edge.a == edge.b {
            return;
        }
        if self.slots[Self::index(edge)].take().is_some() {
            listener.disable_edge(edge);
        }
    }
}

/// An undirected chordal graph over the variables `0..n`, together with its clique graph and the
/// set of edges that can be added while keeping it chordal.
///
/// ```
/// use chordalysis::{ChordalGraph, VariableSet};
///
/// let mut graph = ChordalGraph::new(4);
/// graph.add_edge(0, 1).unwrap();
/// graph.add_edge(1, 2).unwrap();
/// graph.add_edge(2, 3).unwrap();
///
/// // Closing the 4-cycle would leave it without a chord.
/// assert!(!graph.is_edge_addable(0, 3));
/// assert_eq!(graph.separator(0, 2), Some(VariableSet::new(&[1])));
/// assert_eq!(graph.clique_graph().len(), 3);
/// ```
#[derive(Debug)]
pub struct ChordalGraph {
    adjacency: Vec<VariableSet>,
    nb_edges: usize,
    clique_graph: CliqueGraph,
    eligibility: Option<Eligibility>,
    decomposition: OnceCell<Decomposition>,
}

/// Clones the structure only; the decomposition is recomputed on demand by the copy.
impl Clone for ChordalGraph {
    fn clone(&self) -> Self {
        ChordalGraph {
            adjacency: self.adjacency.clone(),
            nb_edges: self.nb_edges,
            clique_graph: self.clique_graph.clone(),
            eligibility: self.eligibility.clone(),
            decomposition: OnceCell::new(),
        }
    }
}

impl ChordalGraph {
    /// A graph over `nb_vertices` vertices and no edges. Clique `v` is the singleton `{v}`.
    pub fn new(nb_vertices: usize) -> Self {
        let mut clique_graph = CliqueGraph::default();
        for v in 0..nb_vertices {
            clique_graph.insert_clique(VariableSet::new(&[v]));
        }
        ChordalGraph {
            adjacency: vec![VariableSet::empty(); nb_vertices],
            nb_edges: 0,
            clique_graph,
            eligibility: None,
            decomposition: OnceCell::new(),
        }
    }

    /// The number of vertices.
    pub fn nb_vertices(&self) -> usize {
        self.adjacency.len()
    }

    /// The number of edges.
    pub fn nb_edges(&self) -> usize {
        self.nb_edges
    }

    /// Returns `true` if `a` and `b` are adjacent.
    pub fn has_edge(&self, a: Variable, b: Variable) -> bool {
        self.adjacency.get(a).map_or(false, |n| n.contains(b))
    }

    /// The neighbours of `v`.
    ///
    /// # Panics
    ///
    /// Panics if `v` is out of range.
    pub fn neighbours(&self, v: Variable) -> &VariableSet {
        &self.adjacency[v]
    }

    /// Every edge, in increasing order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.adjacency.iter().enumerate().flat_map(|(a, neighbours)| {
            neighbours
                .iter()
                .filter(move |b| a < *b)
                .map(move |b| Edge::new(a, b))
        })
    }

    /// The incrementally maintained clique graph.
    pub fn clique_graph(&self) -> &CliqueGraph {
        &self.clique_graph
    }

    /// Returns `true` if `a` and `b` are distinct, not adjacent, and joining them keeps the graph
    /// chordal.
    pub fn is_edge_addable(&self, a: Variable, b: Variable) -> bool {
        self.separator(a, b).is_some()
    }

    /// Every addable edge, in increasing order.
    pub fn addable_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        (0..self.nb_vertices())
            .flat_map(|b| (0..b).map(move |a| Edge::new(a, b)))
            .filter(move |edge| self.is_edge_addable(edge.a, edge.b))
    }

    /// The separator that adding `(a, b)` would create: the common neighbours of `a` and `b`, or
    /// the empty set if they lie in different connected components. `None` if the edge is not
    /// addable.
    pub fn separator(&self, a: Variable, b: Variable) -> Option<VariableSet> {
        if a == b || a >= self.nb_vertices() || b >= self.nb_vertices() || self.has_edge(a, b) {
            return None;
        }
        match &self.eligibility {
            Some(eligibility) => eligibility
                .get(Edge::new(a, b))
                .map(|candidate| candidate.separator.clone()),
            // Never mutated yet, so every pair joins two isolated vertices.
            None => Some(VariableSet::empty()),
        }
    }

    fn check_vertex(&self, vertex: Variable) -> Result<(), GraphError> {
        if vertex < self.nb_vertices() {
            Ok(())
        } else {
            Err(GraphError::UnknownVertex {
                vertex,
                nb_vertices: self.nb_vertices(),
            })
        }
    }

    /// Adds an addable edge without reporting changes to the addable set.
    pub fn add_edge(&mut self, a: Variable, b: Variable) -> Result<(), GraphError> {
        self.add_secured_edge(a, b, &mut ())
    }

    /// Adds the edge `(a, b)`, which must be addable, and updates the clique graph and the set
    /// of addable edges around the new clique `S ∪ {a, b}`, where `S` is the separator of the
    /// edge. Every pair whose addability or separator changes is reported to `listener`.
    ///
    /// Pairs that lie on either side of `S` stop being addable, as do the pairs behind any other
    /// clique link labelled `S` whose sides the new edge connects. The new clique absorbs the
    /// cliques of `a` and `b` if they are subsets of it, and is linked to every clique it meets
    /// in a minimal separator. Pairs across those links are then made addable again. Only when a
    /// clique was absorbed and the graph has several components are the pairs across components
    /// scanned from scratch.
    pub fn add_secured_edge<L>(
        &mut self,
        a: Variable,
        b: Variable,
        listener: &mut L,
    ) -> Result<(), GraphError>
    where
        L: EdgeListener + ?Sized,
    {
        self.check_vertex(a)?;
        self.check_vertex(b)?;
        let candidate = match self.eligibility.as_ref() {
            _ if a == b || self.has_edge(a, b) => None,
            Some(eligibility) => eligibility.get(Edge::new(a, b)).cloned(),
            None => Some(Candidate {
                cliques: (a, b),
                separator: VariableSet::empty(),
            }),
        };
        let Some(Candidate { cliques, separator }) = candidate else {
            return Err(GraphError::NotEligible { a, b });
        };
        let (ca, cb) = self
            .resolve_cliques(a, b, &separator, cliques)
            .ok_or(GraphError::NotEligible { a, b })?;

        let n = self.nb_vertices();
        let mut eligibility = self
            .eligibility
            .take()
            .unwrap_or_else(|| Eligibility::new(n));

        let before = self.components_avoiding(&separator);
        let side_a: Vec<Variable> = (0..n).filter(|v| before[*v] == before[a]).collect();
        let side_b: Vec<Variable> = (0..n).filter(|v| before[*v] == before[b]).collect();

        self.adjacency[a].insert(b);
        self.adjacency[b].insert(a);
        self.nb_edges += 1;
        self.decomposition = OnceCell::new();

        let edge = Edge::new(a, b);
        eligibility.disable(edge, listener);
        for x in side_a.iter() {
            for y in side_b.iter() {
                eligibility.disable(Edge::new(*x, *y), listener);
            }
        }

        let cab_vars = separator.with(a).with(b);
        self.clique_graph.remove_link(ca, cb);
        let cab = self.clique_graph.insert_clique(cab_vars.clone());
        self.remove_invalid_links(&separator, &mut eligibility, listener);

        let mut absorbed = VariableSet::empty();
        for clique in [ca, cb] {
            let inside = self
                .clique_graph
                .get(clique)
                .map_or(false, |vars| vars.is_subset(&cab_vars));
            if inside {
                if let Some(vars) = self.clique_graph.remove_clique(clique) {
                    absorbed = absorbed.union(&vars);
                }
            }
        }
        self.link_new_clique(cab);

        self.refresh_around(cab, &mut eligibility, listener);
        if !absorbed.is_empty() && !self.is_connected() {
            self.refresh_across_components(&absorbed, &mut eligibility, listener);
        }
        self.eligibility = Some(eligibility);

        trace!(%edge, ?separator, clique = ?cab_vars, "added edge");
        Ok(())
    }

    /// Finds the linked cliques holding `S ∪ {a}` and `S ∪ {b}`, trying the recorded pair first.
    fn resolve_cliques(
        &self,
        a: Variable,
        b: Variable,
        separator: &VariableSet,
        recorded: (CliqueId, CliqueId),
    ) -> Option<(CliqueId, CliqueId)> {
        let need_a = separator.with(a);
        let need_b = separator.with(b);
        let holds = |id: CliqueId, need: &VariableSet| {
            self.clique_graph
                .get(id)
                .map_or(false, |vars| vars.is_superset(need))
        };
        let fits = |ca: CliqueId, cb: CliqueId| {
            holds(ca, &need_a)
                && holds(cb, &need_b)
                && (separator.is_empty() || self.clique_graph.separator(ca, cb) == Some(separator))
        };

        let (first, second) = recorded;
        if fits(first, second) {
            return Some((first, second));
        }
        if fits(second, first) {
            return Some((second, first));
        }
        if separator.is_empty() {
            let find = |need: &VariableSet| {
                self.clique_graph
                    .cliques()
                    .find(|(_, vars)| vars.is_superset(need))
                    .map(|(id, _)| id)
            };
            return Some((find(&need_a)?, find(&need_b)?));
        }
        self.clique_graph.links().find_map(|(c1, c2, sep)| {
            if sep != separator {
                None
            } else if fits(c1, c2) {
                Some((c1, c2))
            } else if fits(c2, c1) {
                Some((c2, c1))
            } else {
                None
            }
        })
    }

    /// Labels each vertex with its connected component in the graph minus `removed`.
    fn components_avoiding(&self, removed: &VariableSet) -> Vec<Option<usize>> {
        let n = self.nb_vertices();
        let mut labels = vec![None; n];
        let mut stack = Vec::new();
        let mut next = 0;
        for start in 0..n {
            if labels[start].is_some() || removed.contains(start) {
                continue;
            }
            labels[start] = Some(next);
            stack.push(start);
            while let Some(v) = stack.pop() {
                for u in self.adjacency[v].iter() {
                    if labels[u].is_none() && !removed.contains(u) {
                        labels[u] = Some(next);
                        stack.push(u);
                    }
                }
            }
            next += 1;
        }
        labels
    }

    /// Drops the links labelled `separator` whose two sides are now connected around it.
    fn remove_invalid_links<L: EdgeListener + ?Sized>(
        &mut self,
        separator: &VariableSet,
        eligibility: &mut Eligibility,
        listener: &mut L,
    ) {
        let labelled: Vec<(CliqueId, CliqueId)> = self
            .clique_graph
            .links()
            .filter(|(_, _, sep)| *sep == separator)
            .map(|(c1, c2, _)| (c1, c2))
            .collect();
        if labelled.is_empty() {
            return;
        }

        let after = self.components_avoiding(separator);
        for (c1, c2) in labelled {
            let (only1, only2) = match (self.clique_graph.get(c1), self.clique_graph.get(c2)) {
                (Some(v1), Some(v2)) => (v1.difference(separator), v2.difference(separator)),
                _ => continue,
            };
            let joined = match (only1.iter().next(), only2.iter().next()) {
                (Some(x), Some(y)) => after[x] == after[y],
                _ => false,
            };
            if joined {
                self.clique_graph.remove_link(c1, c2);
                for x in only1.iter() {
                    for y in only2.iter() {
                        eligibility.disable(Edge::new(x, y), listener);
                    }
                }
            }
        }
    }

    /// Links `cab` to every clique it meets whose intersection with it separates the vertices
    /// unique to each. The candidates for one intersection share a single connectivity probe.
    fn link_new_clique(&mut self, cab: CliqueId) {
        let Some(cab_vars) = self.clique_graph.get(cab).cloned() else {
            return;
        };
        let mut probes: HashMap<VariableSet, Vec<Option<usize>>> = HashMap::new();
        let mut attach = Vec::new();
        for (id, vars) in self.clique_graph.cliques() {
            if id == cab {
                continue;
            }
            let shared = vars.intersection(&cab_vars);
            if shared.is_empty() {
                continue;
            }
            let (Some(x), Some(y)) = (
                vars.difference(&shared).iter().next(),
                cab_vars.difference(&shared).iter().next(),
            ) else {
                continue;
            };
            let labels = probes
                .entry(shared)
                .or_insert_with_key(|shared| self.components_avoiding(shared));
            if labels[x] != labels[y] {
                attach.push(id);
            }
        }
        for id in attach {
            self.clique_graph.insert_link(id, cab);
        }
    }

    /// Makes every pair across a link of `cab` addable, with that link's separator.
    fn refresh_around<L: EdgeListener + ?Sized>(
        &self,
        cab: CliqueId,
        eligibility: &mut Eligibility,
        listener: &mut L,
    ) {
        let Some(cab_vars) = self.clique_graph.get(cab) else {
            return;
        };
        for (other, sep) in self.clique_graph.neighbours(cab) {
            let Some(other_vars) = self.clique_graph.get(other) else {
                continue;
            };
            let ours = cab_vars.difference(sep);
            for x in other_vars.difference(sep).iter() {
                for y in ours.iter() {
                    let candidate = Candidate {
                        cliques: (other, cab),
                        separator: sep.clone(),
                    };
                    eligibility.enable(Edge::new(x, y), candidate, &self.adjacency, listener);
                }
            }
        }
    }

    /// Re-points the pairs between the vertices of absorbed cliques and other components at
    /// live cliques.
    fn refresh_across_components<L: EdgeListener + ?Sized>(
        &self,
        absorbed: &VariableSet,
        eligibility: &mut Eligibility,
        listener: &mut L,
    ) {
        let n = self.nb_vertices();
        let labels = self.components_avoiding(&VariableSet::empty());
        let mut home = vec![None; n];
        for (id, vars) in self.clique_graph.cliques() {
            for v in vars.iter() {
                if home[v].is_none() {
                    home[v] = Some(id);
                }
            }
        }
        for v in absorbed.iter() {
            for other in (0..n).filter(|other| labels[*other] != labels[v]) {
                if let (Some(cv), Some(co)) = (home[v], home[other]) {
                    let candidate = Candidate {
                        cliques: (cv, co),
                        separator: VariableSet::empty(),
                    };
                    eligibility.enable(Edge::new(v, other), candidate, &self.adjacency, listener);
                }
            }
        }
    }

    /// Returns `true` if every vertex can reach every other one.
    pub fn is_connected(&self) -> bool {
        self.components_avoiding(&VariableSet::empty())
            .windows(2)
            .all(|pair| pair[0] == pair[1])
    }

    /// The maximal cliques and separators found by a maximum cardinality search, computed on
    /// first use after each change.
    pub fn decomposition(&self) -> &Decomposition {
        self.decomposition
            .get_or_init(|| Decomposition::new(&self.adjacency))
    }

    /// The maximal cliques, from [`decomposition`](Self::decomposition).
    pub fn cliques_bfs(&self) -> &[VariableSet] {
        self.decomposition().cliques()
    }

    /// The separators, from [`decomposition`](Self::decomposition).
    pub fn separators_bfs(&self) -> &[VariableSet] {
        self.decomposition().separators()
    }

    /// A perfect elimination ordering of the graph.
    pub fn elimination_ordering(&self) -> Vec<Variable> {
        self.decomposition().elimination_ordering()
    }

    /// An acyclic orientation whose moral graph is this graph.
    pub fn bayesian_network(&self) -> BayesianNetwork {
        let network = BayesianNetwork::new(&self.adjacency, self.decomposition());
        if network.moral_graph() != self.adjacency {
            warn!(
                nb_edges = self.nb_edges,
                "moralized orientation differs from the graph"
            );
        }
        network
    }

    /// The size of the largest clique.
    pub fn max_clique_size(&self) -> usize {
        self.decomposition().max_clique_size()
    }

    /// The size of the largest clique minus one.
    pub fn tree_width(&self) -> usize {
        self.max_clique_size().saturating_sub(1)
    }

    /// Checks chordality from scratch: the earlier neighbours of every vertex in a maximum
    /// cardinality search order must form a clique.
    pub fn is_chordal(&self) -> bool {
        let mut visited = vec![false; self.nb_vertices()];
        for v in self.decomposition().visit_order().iter().copied() {
            let earlier: Vec<Variable> = self.adjacency[v].iter().filter(|u| visited[*u]).collect();
            for (i, x) in earlier.iter().enumerate() {
                if earlier[i + 1..].iter().any(|y| !self.adjacency[*x].contains(*y)) {
                    return false;
                }
            }
            visited[v] = true;
        }
        true
    }
}
