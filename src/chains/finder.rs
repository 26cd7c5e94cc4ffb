//! Cycle Finder
//!
//! Enumerates simple cycles (each participant at most once, returning to
//! the start) with a depth-first search launched from every node.
//!
//! The search is exponential in graph density and `max_length`, so three
//! hard stops apply on every recursive step, not just at the top:
//! - `max_length`: no path grows past this many participants
//! - `min_edge_weight`: weaker edges are never followed
//! - `max_results`: once reached, the whole search unwinds
//!
//! One path buffer is shared by the whole search (push before descending,
//! pop on return), so no per-edge allocation happens until a cycle closes.

use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::error::{MatchError, Result};
use crate::network::{Edge, NetworkGraph};

/// Result cap used when gathering statistics
const STATS_MAX_RESULTS: usize = 1000;

/// A cycle needs at least two distinct participants
const MIN_CYCLE_LENGTH: usize = 2;

/// Search bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleOptions {
    /// Minimum participants in a cycle (values below 2 are treated as 2)
    pub min_length: usize,

    /// Maximum participants in a cycle
    pub max_length: usize,

    /// Edges below this weight are never followed (0-1)
    pub min_edge_weight: f64,

    /// Stop searching once this many cycles are recorded
    pub max_results: usize,

    /// Only start the search from this participant
    #[serde(default)]
    pub must_include: Option<String>,

    /// Never exceed any member's own `max_chain_length`
    #[serde(default)]
    pub respect_participant_limits: bool,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            min_length: 2,
            max_length: 6,
            min_edge_weight: 0.1,
            max_results: 100,
            must_include: None,
            respect_participant_limits: false,
        }
    }
}

impl CycleOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(MatchError::InvalidCycleOptions(
                "max_length must be positive".to_string(),
            ));
        }
        if self.max_results == 0 {
            return Err(MatchError::InvalidCycleOptions(
                "max_results must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_edge_weight) {
            return Err(MatchError::InvalidCycleOptions(format!(
                "min_edge_weight must be within [0, 1] (got {})",
                self.min_edge_weight
            )));
        }
        Ok(())
    }

    fn effective_min_length(&self) -> usize {
        self.min_length.max(MIN_CYCLE_LENGTH)
    }
}

/// A closed chain of exchanges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundCycle {
    /// Participants in order around the cycle (start not repeated)
    pub node_ids: Vec<String>,

    /// Edges in order; edge i runs from node i to node i+1 (wrapping)
    pub edge_ids: Vec<String>,

    pub total_weight: f64,
    pub average_weight: f64,
}

impl FoundCycle {
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.node_ids.iter().any(|id| id == node_id)
    }

    /// `a → b → c → a`
    pub fn path_string(&self) -> String {
        let mut parts: Vec<&str> = self.node_ids.iter().map(String::as_str).collect();
        if let Some(first) = self.node_ids.first() {
            parts.push(first);
        }
        parts.join(" → ")
    }
}

/// Rotate a node sequence to start at its lexicographically smallest id.
/// Two sequences are the same cycle iff their canonical rotations are equal.
pub fn canonical_rotation(node_ids: &[String]) -> Vec<String> {
    let Some(min_idx) = node_ids
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };

    node_ids[min_idx..]
        .iter()
        .chain(&node_ids[..min_idx])
        .cloned()
        .collect()
}

/// Aggregate view of the cycles available in a graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleStats {
    pub total_cycles_found: usize,
    pub cycles_by_length: BTreeMap<usize, usize>,
    /// Mean of the cycles' average weights
    pub average_weight: f64,
    pub best_cycle: Option<FoundCycle>,
    /// Fraction of participants appearing in at least one cycle
    pub participant_coverage: f64,
}

/// Cycle search over a read-only graph
pub struct CycleFinder<'g> {
    graph: &'g NetworkGraph,
    options: CycleOptions,
}

impl<'g> CycleFinder<'g> {
    pub fn new(graph: &'g NetworkGraph, options: CycleOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { graph, options })
    }

    pub fn options(&self) -> &CycleOptions {
        &self.options
    }

    /// All cycles within the bounds, best average weight first
    pub fn find_cycles(&self) -> Vec<FoundCycle> {
        self.search(None)
    }

    /// Like `find_cycles`, but stops launching new start nodes once the
    /// deadline has passed. A branch already under way runs to completion.
    pub fn find_cycles_before(&self, deadline: Instant) -> Vec<FoundCycle> {
        self.search(Some(deadline))
    }

    /// Cycles containing every listed participant, anchored on the first
    pub fn find_cycles_including_all(&self, required: &[&str]) -> Vec<FoundCycle> {
        let Some(first) = required.first() else {
            return self.find_cycles();
        };

        let options = CycleOptions {
            must_include: Some(first.to_string()),
            min_length: self.options.min_length.max(required.len()),
            ..self.options.clone()
        };
        let anchored = CycleFinder { graph: self.graph, options };

        anchored
            .find_cycles()
            .into_iter()
            .filter(|cycle| required.iter().all(|id| cycle.contains(id)))
            .collect()
    }

    /// Statistics over (up to 1000) cycles found with these bounds
    pub fn cycle_stats(&self) -> CycleStats {
        let options = CycleOptions {
            max_results: STATS_MAX_RESULTS,
            ..self.options.clone()
        };
        let cycles = CycleFinder { graph: self.graph, options }.find_cycles();

        let mut cycles_by_length = BTreeMap::new();
        let mut participants = HashSet::new();
        for cycle in &cycles {
            *cycles_by_length.entry(cycle.len()).or_insert(0) += 1;
            participants.extend(cycle.node_ids.iter().map(String::as_str));
        }

        let average_weight = if cycles.is_empty() {
            0.0
        } else {
            cycles.iter().map(|c| c.average_weight).sum::<f64>() / cycles.len() as f64
        };

        let node_count = self.graph.node_count();
        let participant_coverage = if node_count == 0 {
            0.0
        } else {
            participants.len() as f64 / node_count as f64
        };

        CycleStats {
            total_cycles_found: cycles.len(),
            cycles_by_length,
            average_weight,
            best_cycle: cycles.into_iter().next(),
            participant_coverage,
        }
    }

    fn search(&self, deadline: Option<Instant>) -> Vec<FoundCycle> {
        let starts: Vec<NodeIndex> = match &self.options.must_include {
            Some(id) => match self.graph.index_of(id) {
                Some(idx) => vec![idx],
                None => {
                    warn!("Participant {} not in graph - no cycles to search", id);
                    return Vec::new();
                }
            },
            None => self.graph.node_indices().collect(),
        };

        let mut dfs = Dfs::new(self.graph, &self.options);

        for (i, start) in starts.into_iter().enumerate() {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    warn!("Cycle search deadline reached after {} start nodes", i);
                    break;
                }
            }

            dfs.run_from(start);

            if dfs.is_full() {
                debug!("Result cap of {} reached", self.options.max_results);
                break;
            }
        }

        let mut results = dfs.results;

        // stable: equal averages keep discovery order
        results.sort_by(|a, b| {
            b.average_weight
                .partial_cmp(&a.average_weight)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(self.options.max_results);

        info!(
            "Found {} unique cycles (length {}-{}, min edge weight {:.2})",
            results.len(),
            self.options.effective_min_length(),
            self.options.max_length,
            self.options.min_edge_weight
        );

        results
    }
}

/// Mutable search state shared by every branch
struct Dfs<'g> {
    graph: &'g NetworkGraph,
    options: &'g CycleOptions,
    min_length: usize,
    path: Vec<NodeIndex>,
    edges: Vec<&'g Edge>,
    visited: HashSet<NodeIndex>,
    seen: HashSet<Vec<String>>,
    results: Vec<FoundCycle>,
}

impl<'g> Dfs<'g> {
    fn new(graph: &'g NetworkGraph, options: &'g CycleOptions) -> Self {
        Self {
            graph,
            options,
            min_length: options.effective_min_length(),
            path: Vec::with_capacity(options.max_length),
            edges: Vec::with_capacity(options.max_length),
            visited: HashSet::new(),
            seen: HashSet::new(),
            results: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.results.len() >= self.options.max_results
    }

    /// Participant's own chain length limit, if enforced
    fn limit_of(&self, idx: NodeIndex) -> usize {
        if self.options.respect_participant_limits {
            self.graph.node_at(idx).constraints.max_chain_length
        } else {
            usize::MAX
        }
    }

    fn run_from(&mut self, start: NodeIndex) {
        self.path.clear();
        self.edges.clear();
        self.visited.clear();

        self.path.push(start);
        self.visited.insert(start);

        let limit = self.options.max_length.min(self.limit_of(start));
        self.extend(start, start, 0.0, limit);
    }

    /// Explore every outgoing edge of `current`; `limit` is the longest
    /// cycle every participant on the path accepts
    fn extend(&mut self, start: NodeIndex, current: NodeIndex, accumulated: f64, limit: usize) {
        let graph = self.graph;

        for (target, edge) in graph.outgoing_indexed(current) {
            if self.is_full() {
                return;
            }
            if edge.weight < self.options.min_edge_weight {
                continue;
            }

            if target == start {
                if self.path.len() >= self.min_length && self.path.len() <= limit {
                    self.record(accumulated + edge.weight, edge);
                }
                continue;
            }

            if self.visited.contains(&target) {
                continue;
            }

            if self.path.len() >= limit {
                trace!("Length cutoff at {} participants", self.path.len());
                continue;
            }

            let next_limit = limit.min(self.limit_of(target));
            if self.path.len() >= next_limit {
                continue;
            }

            self.path.push(target);
            self.edges.push(edge);
            self.visited.insert(target);

            self.extend(start, target, accumulated + edge.weight, next_limit);

            self.visited.remove(&target);
            self.edges.pop();
            self.path.pop();
        }
    }

    fn record(&mut self, total_weight: f64, closing: &'g Edge) {
        let node_ids: Vec<String> = self
            .path
            .iter()
            .map(|&idx| self.graph.node_at(idx).id.clone())
            .collect();

        if !self.seen.insert(canonical_rotation(&node_ids)) {
            return;
        }

        let edge_ids: Vec<String> = self
            .edges
            .iter()
            .chain(std::iter::once(&closing))
            .map(|e| e.id.clone())
            .collect();

        let len = node_ids.len();
        self.results.push(FoundCycle {
            node_ids,
            edge_ids,
            total_weight,
            average_weight: total_weight / len as f64,
        });
    }
}
