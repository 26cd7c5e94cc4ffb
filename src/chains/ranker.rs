//! Chain Scorer / Ranker
//!
//! Scores each found cycle on five dimensions and ranks them best-first:
//! - match quality: mean edge match score
//! - trust risk: weakest participant's trust score
//! - complexity: penalty per participant beyond two
//! - timing: constant 1.0 for now
//! - geographic: physical goods need logistics

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

use super::finder::FoundCycle;
use crate::error::{MatchError, Result};
use crate::network::{NetworkGraph, SurplusType};

const WEIGHT_SUM_TOLERANCE: f64 = 0.01;
const STRONG_TRUST: f64 = 0.7;
const LOGISTICS_SCORE: f64 = 0.8;

/// Weights and thresholds for chain scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainScoringOptions {
    pub match_quality_weight: f64,
    pub trust_risk_weight: f64,
    pub complexity_weight: f64,
    pub timing_weight: f64,
    pub geographic_weight: f64,
    pub length_penalty_per_participant: f64,
    pub low_trust_threshold: f64,
}

impl Default for ChainScoringOptions {
    fn default() -> Self {
        Self {
            match_quality_weight: 0.35,
            trust_risk_weight: 0.30,
            complexity_weight: 0.15,
            timing_weight: 0.10,
            geographic_weight: 0.10,
            length_penalty_per_participant: 0.08,
            low_trust_threshold: 0.3,
        }
    }
}

impl ChainScoringOptions {
    fn weights(&self) -> [(&'static str, f64); 5] {
        [
            ("match_quality_weight", self.match_quality_weight),
            ("trust_risk_weight", self.trust_risk_weight),
            ("complexity_weight", self.complexity_weight),
            ("timing_weight", self.timing_weight),
            ("geographic_weight", self.geographic_weight),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for (name, weight) in self.weights() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(MatchError::InvalidScoringOptions(format!(
                    "{} must be a non-negative number (got {})",
                    name, weight
                )));
            }
        }

        let sum: f64 = self.weights().iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(MatchError::InvalidScoringOptions(format!(
                "dimension weights must sum to 1.0 (got {:.3})",
                sum
            )));
        }

        if !self.length_penalty_per_participant.is_finite()
            || self.length_penalty_per_participant < 0.0
        {
            return Err(MatchError::InvalidScoringOptions(format!(
                "length_penalty_per_participant must be non-negative (got {})",
                self.length_penalty_per_participant
            )));
        }

        if !(0.0..=1.0).contains(&self.low_trust_threshold) {
            return Err(MatchError::InvalidScoringOptions(format!(
                "low_trust_threshold must be within [0, 1] (got {})",
                self.low_trust_threshold
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainBreakdown {
    pub match_quality: f64,
    pub trust_risk: f64,
    pub complexity: f64,
    pub timing: f64,
    pub geographic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainScore {
    pub overall: f64,
    pub breakdown: ChainBreakdown,
    pub risk_factors: Vec<String>,
    pub strengths: Vec<String>,
}

impl ChainScore {
    pub fn rating(&self) -> ChainRating {
        ChainRating::from_score(self.overall)
    }

    /// Overall as a rounded percentage
    pub fn percent(&self) -> i64 {
        (self.overall * 100.0).round() as i64
    }

    /// Multi-line human readable summary
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("{} ({}% viability)", self.rating(), self.percent())];

        if !self.strengths.is_empty() {
            lines.push("Strengths:".to_string());
            lines.extend(self.strengths.iter().map(|s| format!("  + {}", s)));
        }
        if !self.risk_factors.is_empty() {
            lines.push("Risks:".to_string());
            lines.extend(self.risk_factors.iter().map(|r| format!("  - {}", r)));
        }

        lines.join("\n")
    }
}

/// Qualitative rating of a chain's overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ChainRating {
    pub fn from_score(overall: f64) -> Self {
        match (overall * 100.0).round() as i64 {
            p if p >= 80 => ChainRating::Excellent,
            p if p >= 60 => ChainRating::Good,
            p if p >= 40 => ChainRating::Fair,
            _ => ChainRating::Poor,
        }
    }
}

impl fmt::Display for ChainRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainRating::Excellent => write!(f, "Excellent"),
            ChainRating::Good => write!(f, "Good"),
            ChainRating::Fair => write!(f, "Fair"),
            ChainRating::Poor => write!(f, "Poor"),
        }
    }
}

/// A cycle with its chain score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCycle {
    pub cycle: FoundCycle,
    pub score: ChainScore,
}

pub struct ChainScorer<'g> {
    graph: &'g NetworkGraph,
    options: ChainScoringOptions,
}

impl<'g> ChainScorer<'g> {
    pub fn new(graph: &'g NetworkGraph, options: ChainScoringOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { graph, options })
    }

    pub fn score_chain(&self, cycle: &FoundCycle) -> ChainScore {
        let mut risk_factors = Vec::new();
        let mut strengths = Vec::new();

        let edges: Vec<_> = cycle
            .edge_ids
            .iter()
            .filter_map(|id| self.graph.get_edge(id))
            .collect();

        // Match quality: an edge that no longer resolves counts as 0
        let match_quality = if cycle.edge_ids.is_empty() {
            0.0
        } else {
            edges.iter().map(|e| e.match_score).sum::<f64>() / cycle.edge_ids.len() as f64
        };
        if match_quality >= 0.8 {
            strengths.push("Excellent match quality across all exchanges".to_string());
        } else if match_quality >= 0.6 {
            strengths.push("Good match quality".to_string());
        }

        // Trust: weakest link
        let trust_scores: Vec<f64> = cycle
            .node_ids
            .iter()
            .filter_map(|id| self.graph.get_node(id))
            .map(|n| n.trust_score)
            .collect();
        let trust_risk = trust_scores.iter().copied().fold(1.0_f64, f64::min);
        let low_trust = trust_scores
            .iter()
            .filter(|&&t| t < self.options.low_trust_threshold)
            .count();
        if low_trust > 0 {
            risk_factors.push(format!("{} participant(s) with low trust scores", low_trust));
        }
        if trust_risk >= STRONG_TRUST {
            strengths.push("All participants have strong trust scores".to_string());
        }

        // Complexity
        let len = cycle.len();
        let complexity = complexity_score(len, self.options.length_penalty_per_participant);
        match len {
            2 => strengths.push("Direct two-party exchange (simplest)".to_string()),
            3 => strengths.push("Three-party chain (manageable complexity)".to_string()),
            n if n >= 5 => {
                risk_factors.push(format!("{}-party chain increases coordination complexity", n))
            }
            _ => {}
        }

        let timing = 1.0;

        // Geography: physical goods need logistics
        let physical = edges
            .iter()
            .filter(|e| {
                self.graph
                    .get_node(&e.from_id)
                    .and_then(|n| n.offering(&e.offering_id))
                    .is_some_and(|o| o.surplus_type == SurplusType::PhysicalGood)
            })
            .count();
        let geographic = if physical > 0 {
            risk_factors.push(format!(
                "Includes {} physical goods exchange(s) requiring logistics",
                physical
            ));
            LOGISTICS_SCORE
        } else {
            1.0
        };

        let o = &self.options;
        let overall = match_quality * o.match_quality_weight
            + trust_risk * o.trust_risk_weight
            + complexity * o.complexity_weight
            + timing * o.timing_weight
            + geographic * o.geographic_weight;

        ChainScore {
            overall,
            breakdown: ChainBreakdown {
                match_quality,
                trust_risk,
                complexity,
                timing,
                geographic,
            },
            risk_factors,
            strengths,
        }
    }

    /// Score every cycle, best first; equal scores keep input order
    pub fn rank_chains(&self, cycles: Vec<FoundCycle>) -> Vec<ScoredCycle> {
        let mut scored: Vec<ScoredCycle> = cycles
            .into_iter()
            .map(|cycle| {
                let score = self.score_chain(&cycle);
                ScoredCycle { cycle, score }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .overall
                .partial_cmp(&a.score.overall)
                .unwrap_or(Ordering::Equal)
        });

        debug!("Ranked {} chains", scored.len());
        scored
    }
}

/// `max(0, 1 - max(0, len - 2) * penalty)`
pub fn complexity_score(len: usize, penalty_per_participant: f64) -> f64 {
    let extra = len.saturating_sub(2) as f64;
    (1.0 - extra * penalty_per_participant).max(0.0)
}

/// Keep chains meeting the minimum score with at most `max_risk_factors` risks
pub fn filter_viable_chains(
    scored: Vec<ScoredCycle>,
    min_overall_score: f64,
    max_risk_factors: usize,
) -> Vec<ScoredCycle> {
    scored
        .into_iter()
        .filter(|s| {
            s.score.overall >= min_overall_score && s.score.risk_factors.len() <= max_risk_factors
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::fixtures::graph_with;
    use crate::network::{Node, Offering};

    fn cycle(nodes: &[&str], edges: &[&str], weight: f64) -> FoundCycle {
        let total = weight * nodes.len() as f64;
        FoundCycle {
            node_ids: nodes.iter().map(|s| s.to_string()).collect(),
            edge_ids: edges.iter().map(|s| s.to_string()).collect(),
            total_weight: total,
            average_weight: weight,
        }
    }

    fn ring(ids: &[&str], weight: f64) -> (NetworkGraph, FoundCycle) {
        let edge_ids: Vec<String> = (0..ids.len()).map(|i| format!("e{}", i)).collect();
        let edges: Vec<(&str, &str, &str, f64)> = (0..ids.len())
            .map(|i| (edge_ids[i].as_str(), ids[i], ids[(i + 1) % ids.len()], weight))
            .collect();
        let graph = graph_with(ids, &edges);
        let edge_refs: Vec<&str> = edge_ids.iter().map(String::as_str).collect();
        let found = cycle(ids, &edge_refs, weight);
        (graph, found)
    }

    fn scorer(graph: &NetworkGraph) -> ChainScorer<'_> {
        ChainScorer::new(graph, ChainScoringOptions::default()).unwrap()
    }

    #[test]
    fn test_two_party_score() {
        let (graph, found) = ring(&["a", "b"], 0.6);
        let score = scorer(&graph).score_chain(&found);

        assert!((score.breakdown.match_quality - 0.6).abs() < 1e-12);
        assert!((score.breakdown.trust_risk - 0.8).abs() < 1e-12);
        assert_eq!(score.breakdown.complexity, 1.0);
        assert_eq!(score.breakdown.geographic, 1.0);
        // 0.35*0.6 + 0.3*0.8 + 0.15 + 0.1 + 0.1
        assert!((score.overall - 0.8).abs() < 1e-9);
        assert_eq!(score.rating(), ChainRating::Excellent);
        assert!(score.risk_factors.is_empty());
        assert_eq!(
            score.strengths,
            vec![
                "Good match quality",
                "All participants have strong trust scores",
                "Direct two-party exchange (simplest)",
            ]
        );
    }

    #[test]
    fn test_shorter_chain_beats_longer_with_same_quality() {
        let (short_graph, short) = ring(&["a", "b"], 0.6);
        let (long_graph, long) = ring(&["a", "b", "c", "d", "e"], 0.6);

        let short_score = scorer(&short_graph).score_chain(&short);
        let long_score = scorer(&long_graph).score_chain(&long);

        assert_eq!(short_score.breakdown.match_quality, long_score.breakdown.match_quality);
        assert_eq!(short_score.breakdown.trust_risk, long_score.breakdown.trust_risk);
        assert!(short_score.overall > long_score.overall);
        assert!(long_score
            .risk_factors
            .contains(&"5-party chain increases coordination complexity".to_string()));
    }

    #[test]
    fn test_complexity_monotonic() {
        let mut previous = complexity_score(2, 0.08);
        assert_eq!(previous, 1.0);
        for len in 3..20 {
            let current = complexity_score(len, 0.08);
            assert!(current <= previous);
            assert!(current >= 0.0);
            previous = current;
        }
        assert_eq!(complexity_score(20, 0.08), 0.0);
        assert_eq!(complexity_score(1, 0.08), 1.0);
    }

    #[test]
    fn test_low_trust_risk() {
        let (mut graph, found) = ring(&["a", "b", "c"], 0.5);
        graph.add_node(Node::new("b", 0.2));

        let score = scorer(&graph).score_chain(&found);
        assert!((score.breakdown.trust_risk - 0.2).abs() < 1e-12);
        assert!(score
            .risk_factors
            .contains(&"1 participant(s) with low trust scores".to_string()));
        assert!(!score
            .strengths
            .contains(&"All participants have strong trust scores".to_string()));
    }

    #[test]
    fn test_physical_goods_lower_geographic() {
        let (mut graph, found) = ring(&["a", "b"], 0.6);
        let mut baker = Node::new("a", 0.8);
        baker.offerings.push(Offering::new("off-e0", SurplusType::PhysicalGood, "Bread"));
        graph.add_node(baker);

        let score = scorer(&graph).score_chain(&found);
        assert_eq!(score.breakdown.geographic, 0.8);
        assert!(score
            .risk_factors
            .contains(&"Includes 1 physical goods exchange(s) requiring logistics".to_string()));
    }

    #[test]
    fn test_missing_edges_score_zero_quality() {
        let graph = graph_with(&["a", "b"], &[]);
        let found = cycle(&["a", "b"], &["gone-1", "gone-2"], 0.5);
        let score = scorer(&graph).score_chain(&found);
        assert_eq!(score.breakdown.match_quality, 0.0);
    }

    #[test]
    fn test_removed_edge_drags_quality_down() {
        let (mut graph, found) = ring(&["a", "b"], 0.6);
        assert!(graph.remove_edge("e1").is_some());

        let score = scorer(&graph).score_chain(&found);
        assert!((score.breakdown.match_quality - 0.3).abs() < 1e-12);
        assert!(!score.strengths.contains(&"Good match quality".to_string()));
    }

    #[test]
    fn test_rank_sorted_and_stable() {
        let graph = graph_with(
            &["a", "b", "c"],
            &[
                ("ab", "a", "b", 0.9),
                ("ba", "b", "a", 0.9),
                ("bc", "b", "c", 0.4),
                ("ca", "c", "a", 0.4),
                ("ac", "a", "c", 0.9),
                ("cb", "c", "b", 0.9),
            ],
        );
        let cycles = vec![
            cycle(&["a", "b", "c"], &["ab", "bc", "ca"], 0.57),
            cycle(&["a", "b"], &["ab", "ba"], 0.9),
            cycle(&["a", "c", "b"], &["ac", "cb", "ba"], 0.9),
            cycle(&["b", "a"], &["ba", "ab"], 0.9),
        ];
        let ranked = scorer(&graph).rank_chains(cycles);

        for pair in ranked.windows(2) {
            assert!(pair[0].score.overall >= pair[1].score.overall);
        }
        // identical two-party scores keep encounter order
        assert_eq!(ranked[0].cycle.node_ids, vec!["a", "b"]);
        assert_eq!(ranked[1].cycle.node_ids, vec!["b", "a"]);
    }

    #[test]
    fn test_filter_viable() {
        let (graph, two) = ring(&["a", "b"], 0.6);
        let mut weak = two.clone();
        weak.edge_ids = vec!["nope".to_string()];

        let ranked = scorer(&graph).rank_chains(vec![two, weak]);
        assert_eq!(filter_viable_chains(ranked.clone(), 0.7, 3).len(), 1);
        assert_eq!(filter_viable_chains(ranked.clone(), 0.0, 3).len(), 2);
        assert!(filter_viable_chains(ranked, 0.99, 3).is_empty());
    }

    #[test]
    fn test_summary() {
        let (graph, found) = ring(&["a", "b", "c", "d", "e"], 0.6);
        let summary = scorer(&graph).score_chain(&found).summary();

        let mut lines = summary.lines();
        assert!(lines.next().unwrap().ends_with("% viability)"));
        assert!(summary.contains("Strengths:\n  + Good match quality"));
        assert!(summary.contains("Risks:\n  - 5-party chain"));
    }

    #[test]
    fn test_rating_bands() {
        assert_eq!(ChainRating::from_score(0.797), ChainRating::Excellent);
        assert_eq!(ChainRating::from_score(0.6), ChainRating::Good);
        assert_eq!(ChainRating::from_score(0.41), ChainRating::Fair);
        assert_eq!(ChainRating::from_score(0.1), ChainRating::Poor);
        assert_eq!(ChainRating::Good.to_string(), "Good");
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let graph = NetworkGraph::new();
        let bad = [
            ChainScoringOptions { match_quality_weight: 0.5, ..Default::default() },
            ChainScoringOptions { timing_weight: -0.1, geographic_weight: 0.3, ..Default::default() },
            ChainScoringOptions { trust_risk_weight: f64::NAN, ..Default::default() },
            ChainScoringOptions { length_penalty_per_participant: -1.0, ..Default::default() },
            ChainScoringOptions { low_trust_threshold: 1.2, ..Default::default() },
        ];
        for options in bad {
            assert!(matches!(
                ChainScorer::new(&graph, options),
                Err(MatchError::InvalidScoringOptions(_))
            ));
        }
        assert!(ChainScoringOptions::default().validate().is_ok());
    }
}
