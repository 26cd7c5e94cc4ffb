//! Phase 3: The Chains
//!
//! Responsible for:
//! - Finding closed exchange cycles in the network (bounded DFS)
//! - Scoring each cycle's viability and ranking them best-first

mod finder;
mod ranker;

pub use finder::{canonical_rotation, CycleFinder, CycleOptions, CycleStats, FoundCycle};
pub use ranker::{
    complexity_score, filter_viable_chains, ChainBreakdown, ChainRating, ChainScore,
    ChainScorer, ChainScoringOptions, ScoredCycle,
};
