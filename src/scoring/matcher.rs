//! Pairwise Match Scorer
//!
//! Scores one offering against one need across eight dimensions.
//! Trust and geography are deal-breakers: failing either disqualifies the
//! pairing outright, whatever the other dimensions say.
//!
//! Overall (eligible pairings only):
//!   0.30 semantic + 0.15 timing + 0.10 capacity
//!   + 0.15 surplus sensitivity + 0.15 diversity + 0.15 sector

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use super::keywords::extract_keywords;
use crate::network::{Need, Offering, TimeSensitivity};

const SEMANTIC_WEIGHT: f64 = 0.30;
const TIMING_WEIGHT: f64 = 0.15;
const CAPACITY_WEIGHT: f64 = 0.10;
const SURPLUS_WEIGHT: f64 = 0.15;
const DIVERSITY_WEIGHT: f64 = 0.15;
const SECTOR_WEIGHT: f64 = 0.15;

/// Sub-term score when one side has nothing to compare
const NEUTRAL: f64 = 0.5;

/// Availability ending this many days after the deadline still scores 0.7
const TIMING_GRACE_DAYS: i64 = 14;

const MS_PER_DAY: f64 = 86_400_000.0;

// ============================================
// INPUT / OUTPUT
// ============================================

/// Everything the scorer needs about one candidate pairing
#[derive(Debug, Clone, Copy)]
pub struct MatchInput<'a> {
    pub offering: &'a Offering,
    pub need: &'a Need,
    /// Provider's trust score (0-1)
    pub provider_trust_score: f64,
    /// Minimum trust the recipient requires (0-1)
    pub recipient_min_trust: f64,
    /// The two participants have exchanged before
    pub existing_partnership: bool,
}

/// Per-dimension scores, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchBreakdown {
    pub semantic: f64,
    pub capacity: f64,
    pub timing: f64,
    pub geographic: f64,
    pub trust: f64,
    pub surplus_sensitivity: f64,
    pub diversity: f64,
    pub sector: f64,
}

impl MatchBreakdown {
    fn weighted_overall(&self) -> f64 {
        self.semantic * SEMANTIC_WEIGHT
            + self.timing * TIMING_WEIGHT
            + self.capacity * CAPACITY_WEIGHT
            + self.surplus_sensitivity * SURPLUS_WEIGHT
            + self.diversity * DIVERSITY_WEIGHT
            + self.sector * SECTOR_WEIGHT
    }
}

/// Dimension whose failure disqualifies a pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DealBreaker {
    Trust,
    Geographic,
}

impl fmt::Display for DealBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DealBreaker::Trust => write!(f, "trust threshold not met"),
            DealBreaker::Geographic => write!(f, "geographic incompatibility"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum MatchOutcome {
    Eligible { overall: f64 },
    Disqualified { reason: DealBreaker },
}

/// Composite score with an explainable breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchScore {
    pub outcome: MatchOutcome,
    pub breakdown: MatchBreakdown,
    /// Human-readable reasons, deal-breaker first
    pub reasons: Vec<String>,
}

impl MatchScore {
    /// Overall score; zero for disqualified pairings
    pub fn overall(&self) -> f64 {
        match self.outcome {
            MatchOutcome::Eligible { overall } => overall,
            MatchOutcome::Disqualified { .. } => 0.0,
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self.outcome, MatchOutcome::Eligible { .. })
    }

    pub fn deal_breaker(&self) -> Option<DealBreaker> {
        match self.outcome {
            MatchOutcome::Disqualified { reason } => Some(reason),
            MatchOutcome::Eligible { .. } => None,
        }
    }
}

/// One dimension's score plus its explanations
struct Dimension {
    score: f64,
    reasons: Vec<String>,
}

impl Dimension {
    fn new(score: f64, reason: impl Into<String>) -> Self {
        Self { score, reasons: vec![reason.into()] }
    }
}

// ============================================
// ENTRY POINT
// ============================================

/// Score how well an offering matches a need
pub fn score_match(input: &MatchInput<'_>) -> MatchScore {
    let MatchInput { offering, need, .. } = *input;

    let semantic = semantic_score(offering, need);
    let capacity = Dimension::new(1.0, "Capacity assumed sufficient");
    let timing = timing_score(offering, need);
    let (geo_ok, geographic) = geographic_score(offering, need);
    let (trust_ok, trust) = trust_score(input.provider_trust_score, input.recipient_min_trust);
    let surplus = surplus_sensitivity_score(offering, need);
    let diversity = diversity_score(input.existing_partnership);
    let sector = sector_score(offering, need);

    let breakdown = MatchBreakdown {
        semantic: semantic.score,
        capacity: capacity.score,
        timing: timing.score,
        geographic: geographic.score,
        trust: trust.score,
        surplus_sensitivity: surplus.score,
        diversity: diversity.score,
        sector: sector.score,
    };

    let mut reasons: Vec<String> = [
        semantic, capacity, timing, geographic, trust, surplus, diversity, sector,
    ]
    .into_iter()
    .flat_map(|d| d.reasons)
    .collect();

    let outcome = if !trust_ok {
        MatchOutcome::Disqualified { reason: DealBreaker::Trust }
    } else if !geo_ok {
        MatchOutcome::Disqualified { reason: DealBreaker::Geographic }
    } else {
        MatchOutcome::Eligible { overall: breakdown.weighted_overall() }
    };

    if let MatchOutcome::Disqualified { reason } = outcome {
        reasons.insert(0, format!("DEAL-BREAKER: {}", reason));
    }

    MatchScore { outcome, breakdown, reasons }
}

// ============================================
// DIMENSIONS
// ============================================

/// 0.3 type match + 0.4 keyword overlap + 0.3 capability overlap
fn semantic_score(offering: &Offering, need: &Need) -> Dimension {
    let mut reasons = Vec::new();

    let type_score = if offering.surplus_type == need.surplus_type {
        reasons.push(format!("Type match: both are '{}'", offering.surplus_type));
        1.0
    } else {
        reasons.push(format!(
            "Type mismatch: offering is '{}', need is '{}'",
            offering.surplus_type, need.surplus_type
        ));
        0.0
    };

    let offering_keywords: HashSet<String> =
        extract_keywords(&format!("{} {}", offering.title, offering.description))
            .into_iter()
            .collect();
    let need_keywords = extract_keywords(&format!("{} {}", need.title, need.description));

    let keyword_score = if need_keywords.is_empty() || offering_keywords.is_empty() {
        reasons.push("Insufficient text for keyword comparison".to_string());
        NEUTRAL
    } else {
        let matching: Vec<&str> = need_keywords
            .iter()
            .filter(|kw| offering_keywords.contains(*kw))
            .map(String::as_str)
            .collect();

        if matching.is_empty() {
            reasons.push("No keyword overlap in descriptions".to_string());
        } else {
            let suffix = if matching.len() > 5 { "..." } else { "" };
            reasons.push(format!(
                "Keyword matches: {}{}",
                matching.iter().take(5).copied().collect::<Vec<_>>().join(", "),
                suffix
            ));
        }
        matching.len() as f64 / need_keywords.len() as f64
    };

    let capabilities: Vec<String> = offering.capabilities.iter().map(|c| c.to_lowercase()).collect();
    let sought: Vec<String> = need.explicit_matches.iter().map(|m| m.to_lowercase()).collect();

    let capability_score = if sought.is_empty() {
        reasons.push("No explicit capability matches specified in need".to_string());
        NEUTRAL
    } else if capabilities.is_empty() {
        reasons.push("Offering has no listed capabilities".to_string());
        NEUTRAL
    } else {
        let matching: Vec<&str> = sought
            .iter()
            .filter(|m| capabilities.iter().any(|c| overlaps(c, m)))
            .map(String::as_str)
            .collect();

        if matching.is_empty() {
            reasons.push("No capability matches found".to_string());
        } else {
            reasons.push(format!("Capability matches: {}", matching.join(", ")));
        }
        matching.len() as f64 / sought.len() as f64
    };

    Dimension {
        score: type_score * 0.3 + keyword_score * 0.4 + capability_score * 0.3,
        reasons,
    }
}

fn timing_score(offering: &Offering, need: &Need) -> Dimension {
    let Some(needed_by) = need.constraints.needed_by else {
        return Dimension::new(1.0, "No timing deadline specified");
    };

    let window = &offering.constraints.timing;
    if window.is_open() {
        return Dimension::new(1.0, "Offering has open availability");
    }

    if let Some(from) = window.available_from {
        if from > needed_by {
            return Dimension::new(
                0.0,
                format!(
                    "Offering not available until {}, but needed by {}",
                    from.format("%Y-%m-%d"),
                    needed_by.format("%Y-%m-%d")
                ),
            );
        }
    }

    let Some(until) = window.available_until else {
        return Dimension::new(1.0, "Timing constraints compatible");
    };

    if until < needed_by {
        return Dimension::new(1.0, "Offering available well before deadline");
    }

    let days_after = ((until - needed_by).num_milliseconds() as f64 / MS_PER_DAY).ceil() as i64;
    if days_after <= TIMING_GRACE_DAYS {
        Dimension::new(
            0.7,
            format!("Offering availability ends {} days after deadline", days_after),
        )
    } else {
        Dimension::new(1.0, "Offering has extended availability")
    }
}

/// Returns (compatible, dimension)
fn geographic_score(offering: &Offering, need: &Need) -> (bool, Dimension) {
    let offered = &offering.constraints.geographic;
    let accepted = &need.constraints.accepted_regions;

    if offered.is_empty() {
        return (true, Dimension::new(1.0, "Offering has no geographic restrictions"));
    }
    if accepted.is_empty() {
        return (true, Dimension::new(1.0, "Need has no geographic requirements"));
    }

    let offered_lower: Vec<String> = offered.iter().map(|r| r.to_lowercase()).collect();
    let matching: Vec<&str> = accepted
        .iter()
        .filter(|region| {
            let region = region.to_lowercase();
            offered_lower.iter().any(|o| overlaps(o, &region))
        })
        .map(String::as_str)
        .collect();

    if matching.is_empty() {
        (
            false,
            Dimension::new(
                0.0,
                format!(
                    "Geographic mismatch: offering serves {}, need requires {}",
                    offered.join(", "),
                    accepted.join(", ")
                ),
            ),
        )
    } else {
        (true, Dimension::new(1.0, format!("Geographic match: {}", matching.join(", "))))
    }
}

/// Returns (threshold met, dimension)
fn trust_score(provider: f64, required: f64) -> (bool, Dimension) {
    if provider >= required {
        (
            true,
            Dimension::new(
                1.0,
                format!("Trust threshold met: provider score {:.2} >= required {:.2}", provider, required),
            ),
        )
    } else {
        (
            false,
            Dimension::new(
                0.0,
                format!("Trust threshold not met: provider score {:.2} < required {:.2}", provider, required),
            ),
        )
    }
}

/// Rewards perishable surplus flowing to an urgent need
fn surplus_sensitivity_score(offering: &Offering, need: &Need) -> Dimension {
    let sensitivity = offering.time_sensitivity;
    let base = match sensitivity {
        TimeSensitivity::None => return Dimension::new(NEUTRAL, "No time pressure on surplus"),
        TimeSensitivity::Hours => 1.0,
        TimeSensitivity::Days => 0.8,
        TimeSensitivity::Weeks => 0.6,
    };

    if need.urgent {
        Dimension::new(base, format!("Time-sensitive surplus ({}) matches urgent need", sensitivity))
    } else {
        Dimension::new(base * 0.7, format!("Time-sensitive surplus ({}), need not urgent", sensitivity))
    }
}

fn diversity_score(existing_partnership: bool) -> Dimension {
    if existing_partnership {
        Dimension::new(0.3, "Existing partnership, lower diversity value")
    } else {
        Dimension::new(1.0, "New partnership, high diversity value")
    }
}

fn sector_score(offering: &Offering, need: &Need) -> Dimension {
    let offered: Vec<String> = offering.sector_tags.iter().map(|s| s.to_lowercase()).collect();
    let wanted: Vec<String> = need.sector_tags.iter().map(|s| s.to_lowercase()).collect();

    if offered.is_empty() || wanted.is_empty() {
        return Dimension::new(NEUTRAL, "No sector data, neutral");
    }

    let matched: Vec<&str> = wanted
        .iter()
        .filter(|s| offered.iter().any(|o| overlaps(o, s)))
        .map(String::as_str)
        .collect();

    if matched.is_empty() {
        return Dimension::new(0.0, "No sector overlap");
    }

    Dimension::new(
        matched.len() as f64 / wanted.len() as f64,
        format!("Sector overlap: {}", matched.join(", ")),
    )
}

/// Case-folded substring match in either direction
fn overlaps(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}
