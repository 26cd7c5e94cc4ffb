//! Surplus Matcher
//!
//! Discovers multi-party exchange chains in a surplus/need marketplace:
//! participants offer spare capacity and post needs, every compatible
//! offering → need pair becomes a scored edge, and closed cycles in the
//! resulting graph are proposals where everyone gives and everyone receives.

pub mod chains;
pub mod config;
pub mod error;
pub mod ids;
pub mod network;
pub mod scoring;

pub use chains::{ChainScorer, CycleFinder, FoundCycle, ScoredCycle};
pub use error::{MatchError, Result};
pub use network::{GraphBuilder, MarketSnapshot, NetworkGraph};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{filter_viable_chains, ChainScoringOptions, CycleOptions};
    use crate::ids::SequentialIds;

    fn demo_snapshot() -> MarketSnapshot {
        MarketSnapshot::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/data/marketplace.json"))
            .unwrap()
    }

    #[test]
    fn test_demo_pipeline() {
        let snapshot = demo_snapshot();
        let report = GraphBuilder::new(0.3, SequentialIds::new()).build(&snapshot);
        let graph = &report.graph;
        assert_eq!(graph.node_count(), snapshot.participants.len());

        let options = CycleOptions { max_results: 10_000, ..CycleOptions::default() };
        let finder = CycleFinder::new(graph, options).unwrap();

        let pairs = finder.find_cycles_including_all(&["studio", "lawyer"]);
        assert!(pairs.iter().any(|c| c.len() == 2));
        assert!(pairs.iter().all(|c| c.contains("studio") && c.contains("lawyer")));

        // the default result cap is not exhausted by chains through the first participant
        let cycles = CycleFinder::new(graph, CycleOptions::default())
            .unwrap()
            .find_cycles();
        assert!(cycles
            .iter()
            .any(|c| c.len() == 2 && c.contains("studio") && c.contains("lawyer")));
        assert!(cycles
            .iter()
            .any(|c| c.len() == 3 && c.contains("accountant") && c.contains("gym")));

        let ranked = ChainScorer::new(graph, ChainScoringOptions::default())
            .unwrap()
            .rank_chains(cycles);
        for pair in ranked.windows(2) {
            assert!(pair[0].score.overall >= pair[1].score.overall);
        }

        let viable = filter_viable_chains(ranked, 0.3, 3);
        assert!(viable
            .iter()
            .any(|s| s.cycle.len() == 2 && s.cycle.contains("studio") && s.cycle.contains("lawyer")));
    }

    #[test]
    fn test_demo_regions_split_the_network() {
        let snapshot = demo_snapshot();
        let report = GraphBuilder::new(0.3, SequentialIds::new()).build(&snapshot);

        assert!(report.disqualified > 0);
        // catering only serves the South; the cafe takes deliveries in the North
        assert!(!report
            .graph
            .edges()
            .any(|e| e.from_id == "newcomer" && e.to_id == "cafe"));
    }

    #[test]
    fn test_demo_filters_inexperienced_providers() {
        let snapshot = demo_snapshot();
        let report = GraphBuilder::new(0.3, SequentialIds::new()).build(&snapshot);

        // printshop has 3 exchanges; studio's contract need asks for 5
        assert!(!report
            .graph
            .edges()
            .any(|e| e.from_id == "printshop" && e.need_id.as_deref() == Some("n-contract")));
        // newcomer is in the South, which the studio's snack need excludes
        assert!(report
            .filtered
            .iter()
            .any(|f| f.provider == "newcomer" && f.need_id == "n-snacks"));
    }
}
