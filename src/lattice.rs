//! Contingency tables over arbitrary subsets of the variables.
//!
//! Every count comes from the per-(variable, value) presence sets handed to the [`Lattice`]. A
//! table for a subset is built once, the first time someone asks for it, by combining two tables
//! that were already built: the table of all but the last variable, and the single-variable table
//! of the last one.

use crate::config::LatticeConfig;
use crate::error::{Error, LatticeError};
use crate::{InstanceSet, Variable, VariableSet};
use smallvec::SmallVec;
use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

/// Lazily materialized contingency tables for every subset of a dataset's variables.
///
/// Nodes are cached for the lifetime of the lattice and never evicted; the clique-size cap of the
/// search keeps the number and size of requested subsets bounded.
///
/// ```
/// use chordalysis::{Lattice, LatticeConfig, VariableSet};
///
/// let rows = vec![
///     vec![Some(0), Some(1)],
///     vec![Some(1), Some(1)],
///     vec![Some(1), Some(0)],
///     vec![Some(1), Some(1)],
/// ];
/// let lattice = Lattice::from_instances(&[2, 2], &LatticeConfig::default(), rows).unwrap();
/// let node = lattice.node(&VariableSet::new(&[0, 1])).unwrap();
/// assert_eq!(node.counts(), &[0, 1, 1, 2]);
/// assert_eq!(node.indexes_of(2).as_slice(), &[1, 0]);
/// ```
pub struct Lattice {
    domain_sizes: Vec<usize>,
    nb_instances: usize,
    max_cells: usize,
    empty: Rc<LatticeNode>,
    singles: Vec<Rc<LatticeNode>>,
    nodes: RefCell<HashMap<VariableSet, Rc<LatticeNode>>>,
}

impl Lattice {
    /// Creates a lattice from presence sets: `presence[v][x]` holds the instances where variable
    /// `v` takes value `x`. The domain size of each variable is the number of sets given for it.
    ///
    /// The sets for one variable must partition `0..nb_instances`.
    pub fn new(
        presence: Vec<Vec<InstanceSet>>,
        nb_instances: usize,
        config: &LatticeConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        if u32::try_from(nb_instances).is_err() {
            return Err(LatticeError::TooManyInstances(nb_instances).into());
        }

        let mut domain_sizes = Vec::with_capacity(presence.len());
        let mut singles = Vec::with_capacity(presence.len());
        for (variable, sets) in presence.into_iter().enumerate() {
            if sets.is_empty() {
                return Err(LatticeError::EmptyDomain { variable }.into());
            }

            let mut covered = InstanceSet::new(nb_instances);
            let mut total = 0;
            for set in sets.iter() {
                if set.universe() != nb_instances {
                    return Err(LatticeError::UniverseMismatch {
                        variable,
                        expected: nb_instances,
                        found: set.universe(),
                    }
                    .into());
                }
                covered.union_with(set);
                total += set.len();
            }
            // Every instance covered, and no instance counted twice.
            if total != nb_instances || covered.len() != nb_instances {
                return Err(LatticeError::NotAPartition { variable }.into());
            }

            domain_sizes.push(sets.len());
            singles.push(Rc::new(LatticeNode {
                variables: VariableSet::new(&[variable]),
                dimensions: SmallVec::from_slice(&[sets.len()]),
                nb_cells: sets.len(),
                source: Source::Presence(sets),
                counts: OnceCell::new(),
            }));
        }

        let empty = Rc::new(LatticeNode {
            variables: VariableSet::empty(),
            dimensions: SmallVec::new(),
            nb_cells: 1,
            source: Source::Total(nb_instances),
            counts: OnceCell::new(),
        });

        Ok(Lattice {
            domain_sizes,
            nb_instances,
            max_cells: config.max_cells,
            empty,
            singles,
            nodes: RefCell::new(HashMap::new()),
        })
    }

    /// Creates a lattice from one row of value indices per instance.
    ///
    /// `domain_sizes` gives the number of values of each variable, not counting the missing-value
    /// category. When [`LatticeConfig::has_missing_values`] is set, every domain grows by one and
    /// `None` maps to that last category; otherwise `None` is an error.
    pub fn from_instances<I, R>(
        domain_sizes: &[usize],
        config: &LatticeConfig,
        instances: I,
    ) -> Result<Self, Error>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[Option<usize>]>,
    {
        let extra = usize::from(config.has_missing_values);
        let mut members: Vec<Vec<Vec<usize>>> = domain_sizes
            .iter()
            .map(|size| vec![Vec::new(); size + extra])
            .collect();

        let mut nb_instances = 0;
        for (instance, row) in instances.into_iter().enumerate() {
            let row = row.as_ref();
            if row.len() != domain_sizes.len() {
                return Err(LatticeError::RowLength {
                    instance,
                    expected: domain_sizes.len(),
                    found: row.len(),
                }
                .into());
            }
            for (variable, value) in row.iter().enumerate() {
                let domain = domain_sizes[variable];
                let value = match value {
                    Some(value) if *value < domain => *value,
                    Some(value) => {
                        return Err(LatticeError::ValueOutOfDomain {
                            instance,
                            variable,
                            value: *value,
                            domain,
                        }
                        .into())
                    }
                    None if config.has_missing_values => domain,
                    None => return Err(LatticeError::MissingValue { instance, variable }.into()),
                };
                members[variable][value].push(instance);
            }
            nb_instances += 1;
        }

        let presence = members
            .into_iter()
            .map(|values| {
                values
                    .into_iter()
                    .map(|instances| InstanceSet::from_indices(nb_instances, instances))
                    .collect()
            })
            .collect();
        Lattice::new(presence, nb_instances, config)
    }

    /// The number of variables.
    pub fn nb_variables(&self) -> usize {
        self.domain_sizes.len()
    }

    /// The number of instances.
    pub fn nb_instances(&self) -> usize {
        self.nb_instances
    }

    /// The number of values of each variable, including any missing-value category.
    pub fn domain_sizes(&self) -> &[usize] {
        &self.domain_sizes
    }

    /// The instances where `variable` takes `value`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn presence(&self, variable: Variable, value: usize) -> &InstanceSet {
        &self.singles[variable].cell_records()[value]
    }

    /// The number of cells in the table for `variables`, if it stays within the cell limit.
    pub fn nb_cells(&self, variables: &VariableSet) -> Option<usize> {
        variables
            .iter()
            .try_fold(1usize, |cells, v| cells.checked_mul(self.domain_sizes[v]))
            .filter(|cells| *cells <= self.max_cells)
    }

    /// The number of multi-variable nodes built so far.
    pub fn nb_materialized(&self) -> usize {
        self.nodes.borrow().len()
    }

    /// Returns the node for `variables`, building it and any missing prefix nodes on first
    /// request. Returns `None` if the table would exceed the cell limit.
    ///
    /// # Panics
    ///
    /// Panics if a variable is out of range.
    pub fn node(&self, variables: &VariableSet) -> Option<Rc<LatticeNode>> {
        let nb_cells = self.nb_cells(variables)?;
        match variables.as_slice() {
            [] => return Some(Rc::clone(&self.empty)),
            [single] => return Some(Rc::clone(&self.singles[*single])),
            _ => {}
        }

        if let Some(node) = self.nodes.borrow().get(variables) {
            return Some(Rc::clone(node));
        }

        let (prefix, last) = variables.split_last()?;
        let prefix = self.node(&prefix)?;
        let last = Rc::clone(&self.singles[last]);

        let source = if prefix.level() == 1 {
            Source::Pair {
                first: prefix,
                second: last,
                records: OnceCell::new(),
            }
        } else {
            Source::Extension { prefix, last }
        };
        let node = Rc::new(LatticeNode {
            variables: variables.clone(),
            dimensions: variables.iter().map(|v| self.domain_sizes[v]).collect(),
            nb_cells,
            source,
            counts: OnceCell::new(),
        });
        trace!(?variables, nb_cells, "materialized lattice node");

        self.nodes
            .borrow_mut()
            .insert(variables.clone(), Rc::clone(&node));
        Some(node)
    }
}

impl std::fmt::Debug for Lattice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lattice")
            .field("domain_sizes", &self.domain_sizes)
            .field("nb_instances", &self.nb_instances)
            .field("nb_materialized", &self.nb_materialized())
            .finish()
    }
}

enum Source {
    /// The empty subset: one cell holding every instance.
    Total(usize),
    /// One variable: a presence set per value.
    Presence(Vec<InstanceSet>),
    /// Two variables, built from their single-variable nodes. The per-cell instance sets are
    /// kept because larger nodes sweep from them.
    Pair {
        first: Rc<LatticeNode>,
        second: Rc<LatticeNode>,
        records: OnceCell<Vec<InstanceSet>>,
    },
    /// Three or more variables, built from the node of all but the last variable.
    Extension {
        prefix: Rc<LatticeNode>,
        last: Rc<LatticeNode>,
    },
}

/// The contingency table of one variable subset.
///
/// Cells are laid out row-major: the first (smallest) variable is the most significant digit of
/// a cell index.
pub struct LatticeNode {
    variables: VariableSet,
    dimensions: SmallVec<[usize; 4]>,
    nb_cells: usize,
    source: Source,
    counts: OnceCell<Vec<u32>>,
}

impl LatticeNode {
    /// The variables of this table.
    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    /// The domain size of each variable, in variable order.
    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    /// The number of variables.
    pub fn level(&self) -> usize {
        self.variables.len()
    }

    /// The number of cells, i.e. the product of the dimensions.
    pub fn nb_cells(&self) -> usize {
        self.nb_cells
    }

    /// The number of instances in one cell.
    ///
    /// # Panics
    ///
    /// Panics if `cell` is not below [`nb_cells`](Self::nb_cells).
    pub fn cell_count(&self, cell: usize) -> u32 {
        self.counts()[cell]
    }

    /// The count of every cell, computed on first use.
    pub fn counts(&self) -> &[u32] {
        self.counts.get_or_init(|| match &self.source {
            Source::Total(nb_instances) => vec![*nb_instances as u32],
            Source::Presence(_) | Source::Pair { .. } => self
                .cell_records()
                .iter()
                .map(|set| set.len() as u32)
                .collect(),
            Source::Extension { .. } => self.sweep(),
        })
    }

    /// Splits a cell index into one value index per variable.
    pub fn indexes_of(&self, mut cell: usize) -> SmallVec<[usize; 4]> {
        let mut values: SmallVec<[usize; 4]> = SmallVec::from_elem(0, self.dimensions.len());
        for (value, dimension) in values.iter_mut().zip(self.dimensions.iter()).rev() {
            *value = cell % dimension;
            cell /= dimension;
        }
        values
    }

    /// Combines one value index per variable into a cell index.
    pub fn index_of(&self, values: &[usize]) -> usize {
        debug_assert_eq!(values.len(), self.dimensions.len());
        values
            .iter()
            .zip(self.dimensions.iter())
            .fold(0, |cell, (value, dimension)| cell * dimension + value)
    }

    /// The per-cell instance sets of 1- and 2-variable nodes; empty for other nodes.
    fn cell_records(&self) -> &[InstanceSet] {
        match &self.source {
            Source::Presence(sets) => sets,
            Source::Pair {
                first,
                second,
                records,
            } => records.get_or_init(|| {
                let mut cells = Vec::with_capacity(self.nb_cells);
                for a in first.cell_records() {
                    for b in second.cell_records() {
                        cells.push(a.intersection(b));
                    }
                }
                cells
            }),
            Source::Total(_) | Source::Extension { .. } => &[],
        }
    }

    /// Counts the cells of a node over three or more variables, starting from the instance sets
    /// of its leading pair and narrowing them one variable at a time. A branch stops as soon as
    /// its running intersection is empty.
    fn sweep(&self) -> Vec<u32> {
        let mut tail = Vec::new();
        let mut node = self;
        while let Source::Extension { prefix, last } = &node.source {
            tail.push(last.cell_records());
            node = prefix.as_ref();
        }
        tail.reverse();
        let pair = node.cell_records();
        debug_assert_eq!(node.level(), 2);

        let mut strides = vec![1; tail.len()];
        for i in (0..tail.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * tail[i + 1].len();
        }
        let block = strides.first().map_or(1, |s| s * tail[0].len());

        let mut counts = vec![0; self.nb_cells];
        for (cell, instances) in pair.iter().enumerate() {
            if !instances.is_empty() {
                descend(instances, &tail, &strides, cell * block, &mut counts);
            }
        }
        counts
    }
}

fn descend(
    instances: &InstanceSet,
    tail: &[&[InstanceSet]],
    strides: &[usize],
    offset: usize,
    counts: &mut [u32],
) {
    let Some((values, rest)) = tail.split_first() else {
        counts[offset] = instances.len() as u32;
        return;
    };
    for (value, set) in values.iter().enumerate() {
        let cell = offset + value * strides[0];
        if rest.is_empty() {
            counts[cell] = instances.intersection_len(set) as u32;
        } else {
            let narrowed = instances.intersection(set);
            if !narrowed.is_empty() {
                descend(&narrowed, rest, &strides[1..], cell, counts);
            }
        }
    }
}

impl std::fmt::Debug for LatticeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatticeNode")
            .field("variables", &self.variables)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}
