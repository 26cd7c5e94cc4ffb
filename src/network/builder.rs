//! Graph Construction
//!
//! Turns a marketplace snapshot into an exchange network:
//! 1. Every participant becomes a node
//! 2. Each offering × need pair (different participants) runs through the
//!    constraint pre-filters; an edge is never built for a filtered pair
//! 3. Surviving pairs are scored; a pair hitting a deal-breaker (trust or
//!    geography) never becomes an edge, whatever the threshold. Eligible
//!    pairs at or above the minimum match score become edges
//!    (weight = match score)

use indicatif::ProgressBar;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use super::graph::NetworkGraph;
use super::loader::{MarketSnapshot, ParticipantRecord};
use super::types::{Edge, Need, Offering};
use crate::ids::IdGenerator;
use crate::scoring::{score_match, MatchInput, MatchScore};

/// Why a pair was rejected before scoring
#[derive(Debug, Clone, PartialEq)]
pub enum FilterReason {
    /// Provider's home region is excluded by the need
    ExcludedRegion(String),
    /// Provider has fewer completed exchanges than required
    InsufficientExperience { completed: u32, required: u32 },
    /// Offering carries a sector the recipient refuses
    ExcludedSector(String),
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterReason::ExcludedRegion(region) => {
                write!(f, "Geographic: excluded region '{}'", region)
            }
            FilterReason::InsufficientExperience { completed, required } => write!(
                f,
                "Provider requirements: {} exchanges < {} required",
                completed, required
            ),
            FilterReason::ExcludedSector(sector) => {
                write!(f, "Sector: recipient excludes '{}'", sector)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilteredPair {
    pub provider: String,
    pub recipient: String,
    pub offering_id: String,
    pub need_id: String,
    pub reason: FilterReason,
}

/// Result of one graph construction run
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub graph: NetworkGraph,
    pub pairs_scored: usize,
    pub edges_created: usize,
    pub below_threshold: usize,
    /// Pairs rejected by a trust or geographic deal-breaker
    pub disqualified: usize,
    pub filtered: Vec<FilteredPair>,
    /// Full match breakdown for every created edge, keyed by edge id
    pub match_scores: HashMap<String, MatchScore>,
}

/// Builds the exchange network from a snapshot
pub struct GraphBuilder<G: IdGenerator> {
    min_match_score: f64,
    ids: G,
    progress: Option<ProgressBar>,
}

impl<G: IdGenerator> GraphBuilder<G> {
    pub fn new(min_match_score: f64, ids: G) -> Self {
        Self { min_match_score, ids, progress: None }
    }

    /// Tick a progress bar once per offering × need pair
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn build(&mut self, snapshot: &MarketSnapshot) -> BuildReport {
        let mut graph = NetworkGraph::new();
        for node in snapshot.to_nodes() {
            graph.add_node(node);
        }

        let mut report = BuildReport {
            graph,
            pairs_scored: 0,
            edges_created: 0,
            below_threshold: 0,
            disqualified: 0,
            filtered: Vec::new(),
            match_scores: HashMap::new(),
        };

        if let Some(pb) = &self.progress {
            pb.set_length((snapshot.offerings.len() * snapshot.needs.len()) as u64);
        }

        for offer in &snapshot.offerings {
            let Some(provider) = snapshot.participant(&offer.provider) else {
                continue;
            };

            for want in &snapshot.needs {
                if let Some(pb) = &self.progress {
                    pb.inc(1);
                }

                if offer.provider == want.participant {
                    continue;
                }
                let Some(recipient) = snapshot.participant(&want.participant) else {
                    continue;
                };

                if let Some(reason) = pre_filter(provider, recipient, &offer.offering, &want.need) {
                    debug!(
                        "Filtered {} → {} ({}): {}",
                        provider.id, recipient.id, offer.offering.title, reason
                    );
                    report.filtered.push(FilteredPair {
                        provider: provider.id.clone(),
                        recipient: recipient.id.clone(),
                        offering_id: offer.offering.id.clone(),
                        need_id: want.need.id.clone(),
                        reason,
                    });
                    continue;
                }

                let score = score_match(&MatchInput {
                    offering: &offer.offering,
                    need: &want.need,
                    provider_trust_score: provider.trust_score,
                    recipient_min_trust: want.need.constraints.min_trust_score,
                    existing_partnership: snapshot.is_partnership(&provider.id, &recipient.id),
                });
                report.pairs_scored += 1;

                if let Some(reason) = score.deal_breaker() {
                    debug!(
                        "Disqualified {} → {} ({}): {}",
                        provider.id, recipient.id, offer.offering.title, reason
                    );
                    report.disqualified += 1;
                    continue;
                }

                if score.overall() < self.min_match_score {
                    report.below_threshold += 1;
                    continue;
                }

                let edge = Edge::scored(
                    self.ids.next_id("edge"),
                    provider.id.clone(),
                    recipient.id.clone(),
                    offer.offering.id.clone(),
                    Some(want.need.id.clone()),
                    score.overall(),
                );
                let edge_id = edge.id.clone();

                if report.graph.add_edge(edge) {
                    report.edges_created += 1;
                    report.match_scores.insert(edge_id, score);
                }
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        info!(
            "Graph built: {} Nodes, {} Edges (min match score {:.2})",
            report.graph.node_count(),
            report.graph.edge_count(),
            self.min_match_score
        );
        info!(
            "  {} pairs scored, {} below threshold, {} disqualified, {} filtered by constraints",
            report.pairs_scored,
            report.below_threshold,
            report.disqualified,
            report.filtered.len()
        );

        report
    }
}

/// Caller-side constraint checks applied before any scoring
fn pre_filter(
    provider: &ParticipantRecord,
    recipient: &ParticipantRecord,
    offering: &Offering,
    need: &Need,
) -> Option<FilterReason> {
    if let Some(region) = &provider.region {
        let excluded = need
            .constraints
            .excluded_regions
            .iter()
            .any(|r| r.eq_ignore_ascii_case(region));
        if excluded {
            return Some(FilterReason::ExcludedRegion(region.clone()));
        }
    }

    let required = need
        .constraints
        .min_exchanges_completed
        .max(recipient.constraints.min_partner_exchanges);
    if required > 0 && provider.completed_exchanges < required {
        return Some(FilterReason::InsufficientExperience {
            completed: provider.completed_exchanges,
            required,
        });
    }

    offering
        .sector_tags
        .iter()
        .find(|tag| {
            recipient
                .constraints
                .excluded_sectors
                .iter()
                .any(|ex| ex.eq_ignore_ascii_case(tag))
        })
        .map(|tag| FilterReason::ExcludedSector(tag.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::network::loader::tests::SAMPLE;

    fn build(json: &str, min_score: f64) -> BuildReport {
        let snapshot = MarketSnapshot::from_json(json).unwrap();
        GraphBuilder::new(min_score, SequentialIds::new()).build(&snapshot)
    }

    #[test]
    fn test_builds_edges_above_threshold() {
        let report = build(SAMPLE, 0.3);

        assert_eq!(report.graph.node_count(), 3);
        // studio needs contract review, but the lawyer is fine (12 exchanges)
        let into_studio = report.graph.incoming_edges("studio");
        assert!(into_studio.iter().any(|e| e.offering_id == "o-contract"));
        // bakery's logo need is met by the studio
        assert!(report
            .graph
            .outgoing_edges("studio")
            .iter()
            .any(|e| e.to_id == "bakery" && e.need_id.as_deref() == Some("n-logo")));

        for edge in report.graph.edges() {
            assert!(edge.weight >= 0.3);
            assert_ne!(edge.from_id, edge.to_id);
            assert!(report.match_scores.contains_key(&edge.id));
        }
        assert_eq!(report.edges_created, report.graph.edge_count());
    }

    #[test]
    fn test_ids_come_from_injected_generator() {
        let report = build(SAMPLE, 0.3);
        let mut ids: Vec<&str> = report.graph.edges().map(|e| e.id.as_str()).collect();
        ids.sort();
        assert!(ids.iter().all(|id| id.starts_with("edge-")));
        assert!(ids.contains(&"edge-1"));
    }

    #[test]
    fn test_experience_filter() {
        let report = build(SAMPLE, 0.0);

        // bakery has 4 exchanges; studio's contract need requires 5
        assert!(report.filtered.iter().any(|f| f.provider == "bakery"
            && f.need_id == "n-contract"
            && matches!(f.reason, FilterReason::InsufficientExperience { completed: 4, required: 5 })));
        assert!(!report
            .graph
            .edges()
            .any(|e| e.from_id == "bakery" && e.need_id.as_deref() == Some("n-contract")));
    }

    #[test]
    fn test_excluded_region_and_sector_filters() {
        let json = r#"{
            "participants": [
                { "id": "a", "region": "North", "trust_score": 0.9 },
                { "id": "b", "region": "South", "trust_score": 0.9,
                  "constraints": { "excluded_sectors": ["Tobacco"] } }
            ],
            "offerings": [
                { "provider": "a", "id": "o1", "type": "service", "title": "Delivery", "sector_tags": [] },
                { "provider": "a", "id": "o2", "type": "service", "title": "Cigar boxes",
                  "sector_tags": ["tobacco"] }
            ],
            "needs": [
                { "participant": "b", "id": "n1", "type": "service", "title": "Delivery",
                  "constraints": { "excluded_regions": ["north"] } },
                { "participant": "b", "id": "n2", "type": "service", "title": "Boxes" }
            ]
        }"#;
        let report = build(json, 0.0);

        let reasons: Vec<String> = report.filtered.iter().map(|f| f.reason.to_string()).collect();
        assert!(reasons.contains(&"Geographic: excluded region 'North'".to_string()));
        assert!(reasons.contains(&"Sector: recipient excludes 'tobacco'".to_string()));
        // only o1 → n2 survives
        assert_eq!(report.graph.edge_count(), 1);
    }

    #[test]
    fn test_trust_deal_breaker_blocks_edge() {
        let json = r#"{
            "participants": [
                { "id": "a", "trust_score": 0.2 },
                { "id": "b", "trust_score": 0.9 }
            ],
            "offerings": [ { "provider": "a", "id": "o1", "type": "service", "title": "Audit" } ],
            "needs": [ { "participant": "b", "id": "n1", "type": "service", "title": "Audit",
                         "constraints": { "min_trust_score": 0.5 } } ]
        }"#;
        // even a zero threshold never admits a deal-breaker pair
        let report = build(json, 0.0);
        assert_eq!(report.pairs_scored, 1);
        assert_eq!(report.disqualified, 1);
        assert_eq!(report.below_threshold, 0);
        assert_eq!(report.graph.edge_count(), 0);
        assert!(report.match_scores.is_empty());
    }

    #[test]
    fn test_disqualified_pair_never_reaches_a_chain() {
        use crate::chains::{ChainScorer, ChainScoringOptions, CycleFinder, CycleOptions};

        let json = r#"{
            "participants": [
                { "id": "a", "trust_score": 0.2 },
                { "id": "b", "trust_score": 0.9 }
            ],
            "offerings": [
                { "provider": "a", "id": "o1", "type": "service", "title": "Audit" },
                { "provider": "b", "id": "o2", "type": "service", "title": "Design" }
            ],
            "needs": [
                { "participant": "b", "id": "n1", "type": "service", "title": "Audit",
                  "constraints": { "min_trust_score": 0.5 } },
                { "participant": "a", "id": "n2", "type": "service", "title": "Design" }
            ]
        }"#;
        let report = build(json, 0.0);
        assert_eq!(report.disqualified, 1);
        assert!(report.graph.edges().all(|e| e.from_id != "a"));

        let options = CycleOptions { min_edge_weight: 0.0, ..CycleOptions::default() };
        let cycles = CycleFinder::new(&report.graph, options).unwrap().find_cycles();
        let ranked = ChainScorer::new(&report.graph, ChainScoringOptions::default())
            .unwrap()
            .rank_chains(cycles);
        assert!(ranked.is_empty());
    }
}
