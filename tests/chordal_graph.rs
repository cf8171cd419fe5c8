use chordalysis::{ChordalGraph, CliqueId, Edge, EdgeListener, GraphError, VariableSet};
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::{BTreeMap, BTreeSet};

type Adjacency = Vec<BTreeSet<usize>>;

fn adjacency(graph: &ChordalGraph) -> Adjacency {
    (0..graph.nb_vertices())
        .map(|v| graph.neighbours(v).iter().collect())
        .collect()
}

/// Removes simplicial vertices one at a time, returning each one together with its remaining
/// neighbours, or `None` once no vertex left is simplicial.
fn eliminate(adjacency: &Adjacency) -> Option<Vec<BTreeSet<usize>>> {
    let mut remaining: BTreeSet<usize> = (0..adjacency.len()).collect();
    let mut cliques = Vec::new();
    while !remaining.is_empty() {
        let simplicial = remaining.iter().copied().find(|v| {
            let neighbours: Vec<usize> = adjacency[*v].intersection(&remaining).copied().collect();
            neighbours.iter().enumerate().all(|(i, x)| {
                neighbours[i + 1..]
                    .iter()
                    .all(|y| adjacency[*x].contains(y))
            })
        })?;
        let mut clique: BTreeSet<usize> = adjacency[simplicial]
            .intersection(&remaining)
            .copied()
            .collect();
        clique.insert(simplicial);
        cliques.push(clique);
        remaining.remove(&simplicial);
    }
    Some(cliques)
}

fn chordal(adjacency: &Adjacency) -> bool {
    eliminate(adjacency).is_some()
}

fn chordal_with(adjacency: &Adjacency, x: usize, y: usize) -> bool {
    let mut extended = adjacency.clone();
    extended[x].insert(y);
    extended[y].insert(x);
    chordal(&extended)
}

fn maximal_cliques(adjacency: &Adjacency) -> BTreeSet<VariableSet> {
    let candidates = eliminate(adjacency).unwrap();
    candidates
        .iter()
        .filter(|c| !candidates.iter().any(|d| c.len() < d.len() && c.is_subset(d)))
        .map(|c| c.iter().copied().collect())
        .collect()
}

fn connected_avoiding(
    adjacency: &Adjacency,
    removed: &VariableSet,
    from: usize,
    to: usize,
) -> bool {
    let mut seen = BTreeSet::new();
    let mut stack = vec![from];
    seen.insert(from);
    while let Some(v) = stack.pop() {
        if v == to {
            return true;
        }
        for u in adjacency[v].iter() {
            if !removed.contains(*u) && seen.insert(*u) {
                stack.push(*u);
            }
        }
    }
    false
}

fn root(parent: &mut BTreeMap<CliqueId, CliqueId>, x: CliqueId) -> CliqueId {
    let up = *parent.get(&x).unwrap_or(&x);
    if up == x {
        return x;
    }
    let top = root(parent, up);
    parent.insert(x, top);
    top
}

/// Mirrors what a candidate queue would hold: the last notification about an edge wins.
#[derive(Default)]
struct Tracker {
    pending: BTreeMap<Edge, bool>,
}

impl EdgeListener for Tracker {
    fn enable_edge(&mut self, edge: Edge) {
        self.pending.insert(edge, true);
    }

    fn disable_edge(&mut self, edge: Edge) {
        self.pending.insert(edge, false);
    }

    fn update_edge(&mut self, edge: Edge) {
        self.pending.insert(edge, true);
    }
}

impl Tracker {
    fn apply(self, graph: &ChordalGraph, live: &mut BTreeMap<Edge, VariableSet>) {
        for (edge, rescore) in self.pending {
            if rescore {
                let separator = graph.separator(edge.a(), edge.b()).unwrap();
                live.insert(edge, separator);
            } else {
                live.remove(&edge);
            }
        }
    }
}

fn all_pairs(n: usize) -> BTreeMap<Edge, VariableSet> {
    (0..n)
        .flat_map(|b| (0..b).map(move |a| (Edge::new(a, b), VariableSet::empty())))
        .collect()
}

fn check(graph: &ChordalGraph, live: &BTreeMap<Edge, VariableSet>) -> Result<(), TestCaseError> {
    let n = graph.nb_vertices();
    let adjacency = adjacency(graph);
    prop_assert!(graph.is_chordal());
    prop_assert!(chordal(&adjacency));

    // Eligibility matches a from-scratch chordality test, with the common neighbours as
    // separator, and the notifications kept a listener in sync with it.
    let mut expected = BTreeMap::new();
    for y in 0..n {
        for x in 0..y {
            if adjacency[x].contains(&y) {
                prop_assert!(!graph.is_edge_addable(x, y));
                continue;
            }
            let addable = chordal_with(&adjacency, x, y);
            prop_assert_eq!(graph.is_edge_addable(x, y), addable, "pair {}-{}", x, y);
            if addable {
                let common = graph.neighbours(x).intersection(graph.neighbours(y));
                prop_assert_eq!(graph.separator(x, y), Some(common.clone()));
                expected.insert(Edge::new(x, y), common);
            }
        }
    }
    prop_assert_eq!(live, &expected);

    // Both clique computations find exactly the maximal cliques.
    let cliques = maximal_cliques(&adjacency);
    let maintained: BTreeSet<VariableSet> = graph
        .clique_graph()
        .cliques()
        .map(|(_, c)| c.clone())
        .collect();
    prop_assert_eq!(graph.clique_graph().len(), cliques.len());
    prop_assert_eq!(&maintained, &cliques);
    let searched: BTreeSet<VariableSet> = graph.cliques_bfs().iter().cloned().collect();
    prop_assert_eq!(graph.cliques_bfs().len(), cliques.len());
    prop_assert_eq!(&searched, &cliques);

    // Two cliques are linked exactly when their intersection separates the rest of them.
    let ids: Vec<(CliqueId, &VariableSet)> = graph.clique_graph().cliques().collect();
    for (i, (c1, v1)) in ids.iter().enumerate() {
        for (c2, v2) in ids[i + 1..].iter() {
            let shared = v1.intersection(v2);
            let x = v1.difference(&shared).iter().next().unwrap();
            let y = v2.difference(&shared).iter().next().unwrap();
            let linked = !shared.is_empty() && !connected_avoiding(&adjacency, &shared, x, y);
            prop_assert_eq!(graph.clique_graph().has_link(*c1, *c2), linked);
            if linked {
                prop_assert_eq!(graph.clique_graph().separator(*c1, *c2), Some(&shared));
            }
        }
    }

    // A maximum-weight spanning forest of the clique graph is a junction forest.
    let mut links: Vec<(usize, CliqueId, CliqueId)> = graph
        .clique_graph()
        .links()
        .map(|(c1, c2, separator)| (separator.len(), c1, c2))
        .collect();
    links.sort_by(|x, y| y.0.cmp(&x.0));
    let mut parent = BTreeMap::new();
    let mut forest = Vec::new();
    for (weight, c1, c2) in links {
        let (r1, r2) = (root(&mut parent, c1), root(&mut parent, c2));
        if r1 != r2 {
            parent.insert(r1, r2);
            forest.push((weight, c1, c2));
        }
    }
    let separator_sizes: usize = graph.separators_bfs().iter().map(VariableSet::len).sum();
    prop_assert_eq!(forest.iter().map(|link| link.0).sum::<usize>(), separator_sizes);
    prop_assert_eq!(forest.len(), graph.separators_bfs().len());
    for v in 0..n {
        let holding: Vec<CliqueId> = ids
            .iter()
            .filter(|(_, vars)| vars.contains(v))
            .map(|(id, _)| *id)
            .collect();
        let mut parent = BTreeMap::new();
        for (_, c1, c2) in forest.iter() {
            if holding.contains(c1) && holding.contains(c2) {
                let (r1, r2) = (root(&mut parent, *c1), root(&mut parent, *c2));
                parent.insert(r1, r2);
            }
        }
        let roots: BTreeSet<CliqueId> = holding.iter().map(|c| root(&mut parent, *c)).collect();
        prop_assert_eq!(roots.len(), 1, "cliques holding {} are not contiguous", v);
    }

    // The elimination ordering is perfect, and orienting along it adds no moral edges.
    let ordering = graph.elimination_ordering();
    prop_assert_eq!(ordering.len(), n);
    for (i, v) in ordering.iter().enumerate() {
        let later: Vec<usize> = ordering[i + 1..]
            .iter()
            .copied()
            .filter(|u| adjacency[*v].contains(u))
            .collect();
        for (j, x) in later.iter().enumerate() {
            for y in later[j + 1..].iter() {
                prop_assert!(adjacency[*x].contains(y));
            }
        }
    }
    let moral = graph.bayesian_network().moral_graph();
    for v in 0..n {
        prop_assert_eq!(&moral[v], graph.neighbours(v));
    }
    Ok(())
}

proptest! {
    #[test]
    fn additions_keep_every_invariant(
        n in 1usize..9,
        picks in prop::collection::vec(any::<Index>(), 0..30),
    ) {
        let mut graph = ChordalGraph::new(n);
        let mut live = all_pairs(n);
        check(&graph, &live)?;
        for pick in picks {
            let addable: Vec<Edge> = graph.addable_edges().collect();
            if addable.is_empty() {
                prop_assert_eq!(graph.nb_edges(), n * (n - 1) / 2);
                break;
            }
            let edge = addable[pick.index(addable.len())];
            let mut tracker = Tracker::default();
            graph.add_secured_edge(edge.a(), edge.b(), &mut tracker).unwrap();
            tracker.apply(&graph, &mut live);
            check(&graph, &live)?;
        }
    }

    #[test]
    fn refused_edges_change_nothing(
        n in 4usize..9,
        picks in prop::collection::vec(any::<Index>(), 1..20),
    ) {
        let mut graph = ChordalGraph::new(n);
        for pick in picks {
            let addable: Vec<Edge> = graph.addable_edges().collect();
            if addable.is_empty() {
                break;
            }
            let edge = addable[pick.index(addable.len())];
            graph.add_edge(edge.a(), edge.b()).unwrap();
        }
        let edges: Vec<Edge> = graph.edges().collect();
        let addable: Vec<Edge> = graph.addable_edges().collect();
        for y in 0..n {
            for x in 0..y {
                if graph.is_edge_addable(x, y) {
                    continue;
                }
                prop_assert_eq!(
                    graph.add_edge(x, y),
                    Err(GraphError::NotEligible { a: x, b: y })
                );
            }
        }
        prop_assert_eq!(graph.edges().collect::<Vec<_>>(), edges);
        prop_assert_eq!(graph.addable_edges().collect::<Vec<_>>(), addable);
    }
}

#[test]
fn joining_two_cliques_through_their_separator() {
    // x = 0, a = 1, b = 2, with 3 hanging off a and 4 hanging off x.
    let mut graph = ChordalGraph::new(5);
    for (u, v) in [(0, 1), (0, 2), (1, 3), (0, 4)] {
        graph.add_edge(u, v).unwrap();
    }
    assert_eq!(graph.separator(1, 2), Some(VariableSet::new(&[0])));

    let mut tracker = Tracker::default();
    graph.add_secured_edge(1, 2, &mut tracker).unwrap();

    let cliques = graph.clique_graph();
    let joined = cliques.find(&VariableSet::new(&[0, 1, 2])).unwrap();
    assert_eq!(cliques.find(&VariableSet::new(&[0, 1])), None);
    assert_eq!(cliques.find(&VariableSet::new(&[0, 2])), None);
    assert_eq!(cliques.len(), 3);

    let mut links: Vec<(VariableSet, VariableSet)> = cliques
        .neighbours(joined)
        .map(|(other, separator)| (cliques.get(other).unwrap().clone(), separator.clone()))
        .collect();
    links.sort();
    assert_eq!(
        links,
        vec![
            (VariableSet::new(&[0, 4]), VariableSet::new(&[0])),
            (VariableSet::new(&[1, 3]), VariableSet::new(&[1])),
        ]
    );
    assert_eq!(cliques.links().count(), 2);

    assert_eq!(graph.separator(0, 3), Some(VariableSet::new(&[1])));
    assert_eq!(graph.separator(2, 3), Some(VariableSet::new(&[1])));
    assert_eq!(graph.separator(1, 4), Some(VariableSet::new(&[0])));
    assert_eq!(graph.separator(2, 4), Some(VariableSet::new(&[0])));
    assert!(!graph.is_edge_addable(3, 4));
    assert_eq!(tracker.pending.get(&Edge::new(2, 3)), Some(&true));
}

#[test]
fn components_merge_through_an_empty_separator() {
    let mut graph = ChordalGraph::new(4);
    graph.add_edge(0, 1).unwrap();
    graph.add_edge(2, 3).unwrap();
    assert!(!graph.is_connected());
    for (x, y) in [(0, 2), (0, 3), (1, 2), (1, 3)] {
        assert_eq!(graph.separator(x, y), Some(VariableSet::empty()));
    }

    graph.add_edge(1, 2).unwrap();
    assert!(graph.is_connected());
    assert_eq!(graph.separator(0, 2), Some(VariableSet::new(&[1])));
    assert_eq!(graph.separator(1, 3), Some(VariableSet::new(&[2])));
    assert!(!graph.is_edge_addable(0, 3));
    assert_eq!(
        graph.add_edge(0, 3),
        Err(GraphError::NotEligible { a: 0, b: 3 })
    );
    assert_eq!(graph.nb_edges(), 3);
    assert_eq!(graph.tree_width(), 1);
}

#[test]
fn clones_evolve_independently() {
    let mut graph = ChordalGraph::new(4);
    graph.add_edge(0, 1).unwrap();
    graph.add_edge(1, 2).unwrap();
    let mut copy = graph.clone();

    copy.add_edge(0, 2).unwrap();
    graph.add_edge(2, 3).unwrap();

    assert_eq!(copy.max_clique_size(), 3);
    assert_eq!(graph.max_clique_size(), 2);
    assert!(copy.is_edge_addable(2, 3));
    assert!(!graph.is_edge_addable(0, 3));
    assert!(copy.clique_graph().find(&VariableSet::new(&[0, 1, 2])).is_some());
    assert!(graph.clique_graph().find(&VariableSet::new(&[0, 1, 2])).is_none());
}
