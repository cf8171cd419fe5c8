#![warn(missing_docs)]
#![doc(test(no_crate_inject))]
#![doc(test(attr(deny(unused, future_incompatible))))]

//! This crate learns decomposable log-linear models from categorical data, following the
//! Chordalysis approach described in these papers:
//!
//! - Petitjean, Webb and Nicholson, [Scaling log-linear analysis to high-dimensional
//!   data][icdm13], ICDM 2013
//! - Petitjean and Webb, [Scaling log-linear analysis to datasets with thousands of
//!   variables][sdm15], SDM 2015
//! - Petitjean, Allison and Webb, [A statistically efficient and scalable method for log-linear
//!   analysis of high-dimensional data][icdm14], ICDM 2014
//! - Webb and Petitjean, [A multiple test correction for streams and cascades of statistical
//!   hypothesis tests][kdd16], KDD 2016
//!
//! [icdm13]: https://doi.org/10.1109/ICDM.2013.17
//! [sdm15]: https://doi.org/10.1137/1.9781611974010.14
//! [icdm14]: https://doi.org/10.1109/ICDM.2014.23
//! [kdd16]: https://doi.org/10.1145/2939672.2939775
//!
//! A search starts from the model where every variable is independent and greedily adds the
//! interaction that most improves a [`Criterion`], as long as the dependency graph stays chordal
//! and the improvement passes its acceptance test. Chordality keeps every candidate's score a
//! function of four small contingency tables, which the [`Lattice`] builds on demand.
//!
//! ```
//! use chordalysis::{Explorer, Lattice, LatticeConfig, SearchConfig};
//!
//! // Four binary variables where each one copies the previous one, except in one instance in
//! // eight where it flips, independently of the other flips.
//! let rows: Vec<Vec<Option<usize>>> = (0..1024usize)
//!     .map(|i| {
//!         let mut row = vec![i % 2];
//!         for link in 0..3 {
//!             let previous = row[link];
//!             let flip = (i >> (1 + 3 * link)) % 8 == 0;
//!             row.push(previous ^ usize::from(flip));
//!         }
//!         row.into_iter().map(Some).collect()
//!     })
//!     .collect();
//! let lattice = Lattice::from_instances(&[2; 4], &LatticeConfig::default(), rows)?;
//! let mut explorer = Explorer::new(&lattice, &SearchConfig::default())?;
//! explorer.explore()?;
//! let mut edges: Vec<String> = explorer.model().interactions().map(|e| e.to_string()).collect();
//! edges.sort();
//! assert_eq!(edges, ["0-1", "1-2", "2-3"]);
//! # Ok::<(), chordalysis::Error>(())
//! ```

pub use sorted_iter;

mod acceptance;
mod config;
mod error;
mod explorer;
mod graph;
mod instance_set;
mod lattice;
mod model;
mod queue;
mod scorer;
mod stats;
mod variable_set;

pub use acceptance::Acceptance;
pub use config::{Correction, Criterion, LatticeConfig, Rejection, SearchConfig};
pub use error::{ConfigError, Error, GraphError, LatticeError};
pub use explorer::{Explorer, ExplorerState, Step, Termination};
pub use graph::{
    BayesianNetwork, ChordalGraph, CliqueGraph, CliqueId, Decomposition, Edge, EdgeListener,
};
pub use instance_set::InstanceSet;
pub use lattice::{Lattice, LatticeNode};
pub use model::{DecomposableModel, ModelEvaluation};
pub use queue::{CandidateQueue, QueueStatistics};
pub use scorer::{ScoredAction, Scorer};
pub use stats::{EntropyComputer, MessageLengthComputer, RegretComputer, SubsetStatistic};
pub use variable_set::{Variable, VariableSet};
