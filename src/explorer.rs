use crate::acceptance::Acceptance;
use crate::config::SearchConfig;
use crate::error::Error;
use crate::graph::{Edge, EdgeListener};
use crate::model::{DecomposableModel, ModelEvaluation};
use crate::queue::{CandidateQueue, QueueStatistics};
use crate::scorer::{ScoredAction, Scorer};
use crate::Lattice;
use serde::Serialize;
use tracing::{debug, info};

/// Why a search stopped.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// No edge could be added without breaking chordality.
    QueueExhausted,
    /// The configured number of steps was reached.
    StepLimit,
    /// The best remaining edge failed the acceptance test.
    Rejected,
}

/// Where an [`Explorer`] is in its search.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExplorerState {
    /// The queue holds every pair of variables and no edge was added yet.
    Initialized,
    /// At least one edge was added.
    Running,
    /// The search is over.
    Terminated(Termination),
}

/// The outcome of [`Explorer::step`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    /// The edge was added to the model.
    Accepted(ScoredAction),
    /// Nothing was added and nothing will be.
    Terminated(Termination),
}

/// Greedy forward selection of a decomposable model.
///
/// Starting from the independence model, each step takes the best-scored addable edge, tests
/// it, and either adds it or ends the search. Only the edges whose score an addition may have
/// changed are rescored.
///
/// ```
/// use chordalysis::{Criterion, Explorer, Lattice, LatticeConfig, SearchConfig, Termination};
///
/// // The second variable copies the first; the third is independent of both.
/// let rows: Vec<Vec<Option<usize>>> = (0..400)
///     .map(|i| vec![Some(i % 2), Some(i % 2), Some(i / 2 % 2)])
///     .collect();
/// let lattice = Lattice::from_instances(&[2, 2, 2], &LatticeConfig::default(), rows).unwrap();
/// let config = SearchConfig {
///     criterion: Criterion::Bic,
///     ..SearchConfig::default()
/// };
/// let mut explorer = Explorer::new(&lattice, &config).unwrap();
/// assert_eq!(explorer.explore().unwrap(), Termination::Rejected);
/// let edges: Vec<String> = explorer.model().interactions().map(|e| e.to_string()).collect();
/// assert_eq!(edges, ["0-1"]);
/// ```
#[derive(Debug)]
pub struct Explorer<'a> {
    model: DecomposableModel,
    scorer: Scorer<'a>,
    queue: CandidateQueue,
    acceptance: Acceptance,
    max_steps: Option<usize>,
    operations: Vec<ScoredAction>,
    state: ExplorerState,
}

impl<'a> Explorer<'a> {
    /// Prepares a search over the variables of `lattice`, scoring every pair of variables
    /// against the independence model.
    pub fn new(lattice: &'a Lattice, config: &SearchConfig) -> Result<Self, Error> {
        config.validate()?;
        let model = DecomposableModel::independence(lattice.domain_sizes());
        let mut scorer = Scorer::new(lattice, config);
        let mut queue = CandidateQueue::new();
        for edge in model.graph().addable_edges() {
            queue.enable_edge(edge);
        }
        queue.process_stored_modifications(&model, &mut scorer);
        info!(
            nb_variables = model.nb_variables(),
            nb_instances = lattice.nb_instances(),
            candidates = queue.len(),
            criterion = ?config.criterion,
            "initialized exploration"
        );

        Ok(Explorer {
            model,
            scorer,
            queue,
            acceptance: Acceptance::new(config),
            max_steps: config.max_steps,
            operations: Vec::new(),
            state: ExplorerState::Initialized,
        })
    }

    /// The current model.
    pub fn model(&self) -> &DecomposableModel {
        &self.model
    }

    /// Gives up the search, keeping the model.
    pub fn into_model(self) -> DecomposableModel {
        self.model
    }

    /// Every accepted action, in the order it was applied.
    pub fn operations(&self) -> &[ScoredAction] {
        &self.operations
    }

    /// The number of edges added so far.
    pub fn nb_steps(&self) -> usize {
        self.operations.len()
    }

    /// Where the search is.
    pub fn state(&self) -> ExplorerState {
        self.state
    }

    /// The candidate edges not yet added.
    pub fn candidates(&self) -> impl Iterator<Item = Edge> + '_ {
        self.queue.edges()
    }

    /// One entry per batch of rescoring: the initial scoring, then one per accepted edge.
    pub fn queue_statistics(&self) -> &[QueueStatistics] {
        self.queue.statistics()
    }

    /// Statistics of the current model, or `None` if one of its cliques is too large to count.
    pub fn evaluate(&mut self) -> Option<ModelEvaluation> {
        self.model.evaluate(self.scorer.entropy())
    }

    fn terminate(&mut self, termination: Termination) -> Step {
        self.state = ExplorerState::Terminated(termination);
        info!(
            ?termination,
            steps = self.operations.len(),
            edges = self.model.graph().nb_edges(),
            "finished exploration"
        );
        Step::Terminated(termination)
    }

    /// Tries to add one edge. Once a step has terminated the search, every later step reports
    /// the same termination.
    pub fn step(&mut self) -> Result<Step, Error> {
        if let ExplorerState::Terminated(termination) = self.state {
            return Ok(Step::Terminated(termination));
        }
        if matches!(self.max_steps, Some(max) if self.operations.len() >= max) {
            return Ok(self.terminate(Termination::StepLimit));
        }

        let tests = self.queue.len();
        let action = match self.queue.poll() {
            Some(action) => action,
            None => return Ok(self.terminate(Termination::QueueExhausted)),
        };
        if !self.acceptance.accept(&action, tests) {
            debug!(edge = %action.edge, score = action.score, tests, "rejected edge");
            return Ok(self.terminate(Termination::Rejected));
        }

        self.model.add_interaction(action.edge, &mut self.queue)?;
        self.queue
            .process_stored_modifications(&self.model, &mut self.scorer);
        self.operations.push(action);
        self.state = ExplorerState::Running;
        debug!(
            edge = %action.edge,
            score = action.score,
            degrees_of_freedom = action.degrees_of_freedom,
            entropy_gain = action.entropy_gain,
            tests,
            "accepted edge"
        );
        Ok(Step::Accepted(action))
    }

    /// Steps until the search terminates.
    pub fn explore(&mut self) -> Result<Termination, Error> {
        loop {
            if let Step::Terminated(termination) = self.step()? {
                return Ok(termination);
            }
        }
    }
}
