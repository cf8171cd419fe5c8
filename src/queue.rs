use crate::graph::{Edge, EdgeListener};
use crate::model::DecomposableModel;
use crate::scorer::{ScoredAction, Scorer};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use tracing::debug;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Pending {
    Disable,
    Rescore,
}

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct Entry {
    action: ScoredAction,
    generation: u64,
}

/// What one batch of modifications did to a [`CandidateQueue`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct QueueStatistics {
    /// The number of edges scored in the batch.
    pub scored: usize,
    /// The number of candidates left in the queue afterwards.
    pub available: usize,
}

/// The addable edges of a model, best score first.
///
/// The queue listens to the model's graph: enabled, disabled and updated edges are only recorded
/// until [`process_stored_modifications`](Self::process_stored_modifications) applies them, so an
/// edge touched several times by one edge addition is scored at most once, according to the last
/// thing that happened to it.
///
/// Superseded entries stay in the heap until they surface or the heap is rebuilt; each edge's
/// live entry is identified by the generation it was pushed with.
#[derive(Clone, Debug, Default)]
pub struct CandidateQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    live: HashMap<Edge, u64>,
    pending: BTreeMap<Edge, Pending>,
    next_generation: u64,
    statistics: Vec<QueueStatistics>,
}

impl CandidateQueue {
    /// An empty queue.
    pub fn new() -> Self {
        CandidateQueue::default()
    }

    /// The number of live candidates, not counting modifications still pending.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns `true` if there are no live candidates.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Returns `true` if `edge` is a live candidate.
    pub fn contains(&self, edge: Edge) -> bool {
        self.live.contains_key(&edge)
    }

    /// The live candidates, in no particular order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.live.keys().copied()
    }

    /// The number of modifications waiting for the next batch.
    pub fn nb_pending(&self) -> usize {
        self.pending.len()
    }

    /// One entry per processed batch, oldest first.
    pub fn statistics(&self) -> &[QueueStatistics] {
        &self.statistics
    }

    /// Applies the pending modifications: disabled edges are dropped, and enabled or updated
    /// edges are scored against `model`.
    pub fn process_stored_modifications(
        &mut self,
        model: &DecomposableModel,
        scorer: &mut Scorer<'_>,
    ) {
        let pending = std::mem::take(&mut self.pending);
        let mut scored = 0;
        for (edge, modification) in pending {
            match modification {
                Pending::Disable => {
                    self.live.remove(&edge);
                }
                Pending::Rescore => {
                    let action = scorer.score(model, edge);
                    self.push(action);
                    scored += 1;
                }
            }
        }
        if self.heap.len() > 2 * self.live.len() + 64 {
            self.compact();
        }

        let statistics = QueueStatistics {
            scored,
            available: self.live.len(),
        };
        debug!(scored, available = statistics.available, "processed queue batch");
        self.statistics.push(statistics);
    }

    fn push(&mut self, action: ScoredAction) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.live.insert(action.edge, generation);
        self.heap.push(Reverse(Entry { action, generation }));
    }

    fn is_live(&self, entry: &Entry) -> bool {
        self.live.get(&entry.action.edge) == Some(&entry.generation)
    }

    fn compact(&mut self) {
        let live = &self.live;
        let heap = std::mem::take(&mut self.heap);
        self.heap = heap
            .into_iter()
            .filter(|Reverse(entry)| live.get(&entry.action.edge) == Some(&entry.generation))
            .collect();
    }

    /// The best live candidate, without removing it.
    pub fn peek(&mut self) -> Option<&ScoredAction> {
        while let Some(Reverse(entry)) = self.heap.peek() {
            if self.is_live(entry) {
                break;
            }
            self.heap.pop();
        }
        self.heap.peek().map(|Reverse(entry)| &entry.action)
    }

    /// Removes and returns the best live candidate.
    pub fn poll(&mut self) -> Option<ScoredAction> {
        while let Some(Reverse(entry)) = self.heap.pop() {
            if self.is_live(&entry) {
                self.live.remove(&entry.action.edge);
                return Some(entry.action);
            }
        }
        None
    }
}

impl EdgeListener for CandidateQueue {
    fn enable_edge(&mut self, edge: Edge) {
        self.pending.insert(edge, Pending::Rescore);
    }

    fn disable_edge(&mut self, edge: Edge) {
        self.pending.insert(edge, Pending::Disable);
    }

    fn update_edge(&mut self, edge: Edge) {
        self.pending.insert(edge, Pending::Rescore);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Criterion, SearchConfig};
    use crate::{Lattice, LatticeConfig};

    fn lattice() -> Lattice {
        // 0 and 1 agree always, 2 agrees with them half the time, 3 is noise.
        let rows = (0..64usize).map(|i| {
            let x = i % 2;
            let z = if i % 4 < 2 { x } else { (i / 4) % 2 };
            vec![Some(x), Some(x), Some(z), Some((i / 8) % 2)]
        });
        Lattice::from_instances(&[2, 2, 2, 2], &LatticeConfig::default(), rows).unwrap()
    }

    fn config() -> SearchConfig {
        SearchConfig {
            criterion: Criterion::Bic,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn polls_best_first() {
        let lattice = lattice();
        let model = DecomposableModel::independence(lattice.domain_sizes());
        let mut scorer = Scorer::new(&lattice, &config());
        let mut queue = CandidateQueue::new();
        for edge in model.graph().addable_edges() {
            queue.enable_edge(edge);
        }
        assert!(queue.is_empty());
        queue.process_stored_modifications(&model, &mut scorer);
        assert_eq!(queue.len(), 6);
        assert_eq!(
            queue.statistics(),
            &[QueueStatistics {
                scored: 6,
                available: 6
            }]
        );

        let mut previous = queue.poll().unwrap();
        assert_eq!(previous.edge, Edge::new(0, 1));
        while let Some(next) = queue.poll() {
            assert!(previous <= next);
            previous = next;
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn last_modification_wins() {
        let lattice = lattice();
        let model = DecomposableModel::independence(lattice.domain_sizes());
        let mut scorer = Scorer::new(&lattice, &config());
        let mut queue = CandidateQueue::new();

        queue.enable_edge(Edge::new(0, 1));
        queue.disable_edge(Edge::new(0, 1));
        queue.enable_edge(Edge::new(2, 3));
        assert_eq!(queue.nb_pending(), 2);
        queue.process_stored_modifications(&model, &mut scorer);
        assert!(!queue.contains(Edge::new(0, 1)));
        assert!(queue.contains(Edge::new(2, 3)));
        assert_eq!(queue.statistics()[0].scored, 1);

        queue.disable_edge(Edge::new(2, 3));
        queue.enable_edge(Edge::new(2, 3));
        queue.process_stored_modifications(&model, &mut scorer);
        assert_eq!(queue.len(), 1);
        assert!(queue.poll().is_some());
        assert!(queue.poll().is_none());
    }

    #[test]
    fn superseded_entries_are_skipped() {
        let lattice = lattice();
        let model = DecomposableModel::independence(lattice.domain_sizes());
        let mut scorer = Scorer::new(&lattice, &config());
        let mut queue = CandidateQueue::new();

        for _ in 0..3 {
            queue.update_edge(Edge::new(0, 1));
            queue.update_edge(Edge::new(1, 3));
            queue.process_stored_modifications(&model, &mut scorer);
        }
        queue.disable_edge(Edge::new(0, 1));
        queue.process_stored_modifications(&model, &mut scorer);

        assert_eq!(queue.peek().map(|action| action.edge), Some(Edge::new(1, 3)));
        assert_eq!(queue.poll().map(|action| action.edge), Some(Edge::new(1, 3)));
        assert_eq!(queue.poll(), None);
    }
}
