//! Run Configuration for the Surplus Matcher
//!
//! Every tunable of a matching run: where the snapshot lives, how strict
//! edge inclusion is, the cycle search bounds, chain scoring weights and
//! what gets printed or logged afterwards.

use chrono::{DateTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::chains::{ChainScoringOptions, CycleOptions, ScoredCycle};

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // ========== Input ==========
    /// Marketplace snapshot (JSON)
    pub snapshot_path: String,

    // ========== Graph Construction ==========
    /// Offering → need pairs scoring below this never become edges
    pub min_match_score: f64,

    // ========== Cycle Search ==========
    /// Fewest participants in a chain (2 = direct swap)
    pub min_chain_length: usize,

    /// Most participants in a chain (search cost grows exponentially)
    pub max_chain_length: usize,

    /// Edges below this weight are not followed
    pub min_edge_weight: f64,

    /// Stop searching after this many cycles
    pub max_results: usize,

    /// Honour each participant's own max chain length
    pub respect_participant_limits: bool,

    /// Stop launching new search branches after this long (0 = no limit)
    pub search_timeout_ms: u64,

    // ========== Viability ==========
    /// Chains below this overall score are dropped
    pub min_viable_score: f64,

    /// Chains with more risk factors than this are dropped
    pub max_risk_factors: usize,

    // ========== Output ==========
    /// How many ranked chains to print
    pub top_chains: usize,

    /// Participants removed from the network before searching
    pub excluded_participants: Vec<String>,

    /// Append viable chains to the proposal log
    pub proposal_log: bool,

    pub proposal_log_path: String,

    // ========== Chain Scoring ==========
    pub chain_scoring: ChainScoringOptions,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = ChainScoringOptions::default();

        let min_match_score = env::var("MIN_MATCH_SCORE")
            .unwrap_or_else(|_| "0.3".to_string())
            .parse()
            .unwrap_or(0.3);

        Ok(Self {
            snapshot_path: env::var("SNAPSHOT_PATH")
                .unwrap_or_else(|_| "./data/marketplace.json".to_string()),

            min_match_score,

            // Cycle search
            min_chain_length: env::var("MIN_CHAIN_LENGTH")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
            max_chain_length: env::var("MAX_CHAIN_LENGTH")
                .unwrap_or_else(|_| "6".to_string())
                .parse()
                .unwrap_or(6),
            min_edge_weight: edge_weight_or(env::var("MIN_EDGE_WEIGHT").ok(), min_match_score),
            max_results: env::var("MAX_RESULTS")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .unwrap_or(50),
            respect_participant_limits: env::var("RESPECT_PARTICIPANT_LIMITS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            search_timeout_ms: env::var("SEARCH_TIMEOUT_MS")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(0),

            // Viability
            min_viable_score: env::var("MIN_VIABLE_SCORE")
                .unwrap_or_else(|_| "0.3".to_string())
                .parse()
                .unwrap_or(0.3),
            max_risk_factors: env::var("MAX_RISK_FACTORS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),

            // Output
            top_chains: env::var("TOP_CHAINS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            excluded_participants: env::var("EXCLUDED_PARTICIPANTS")
                .map(|s| {
                    s.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            proposal_log: env::var("PROPOSAL_LOG")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            proposal_log_path: env::var("PROPOSAL_LOG_PATH")
                .unwrap_or_else(|_| "./logs/chain_proposals.log".to_string()),

            chain_scoring: ChainScoringOptions {
                length_penalty_per_participant: env::var("LENGTH_PENALTY")
                    .unwrap_or_else(|_| "0.08".to_string())
                    .parse()
                    .unwrap_or(defaults.length_penalty_per_participant),
                low_trust_threshold: env::var("LOW_TRUST_THRESHOLD")
                    .unwrap_or_else(|_| "0.3".to_string())
                    .parse()
                    .unwrap_or(defaults.low_trust_threshold),
                ..defaults
            },
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Search bounds for the cycle finder
    pub fn cycle_options(&self) -> CycleOptions {
        CycleOptions {
            min_length: self.min_chain_length,
            max_length: self.max_chain_length,
            min_edge_weight: self.min_edge_weight,
            max_results: self.max_results,
            must_include: None,
            respect_participant_limits: self.respect_participant_limits,
        }
    }

    pub fn is_excluded(&self, participant_id: &str) -> bool {
        self.excluded_participants.iter().any(|p| p == participant_id)
    }

    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_match_score) {
            return Err(eyre::eyre!(
                "MIN_MATCH_SCORE must be between 0 and 1 (currently {})",
                self.min_match_score
            ));
        }
        if !(0.0..=1.0).contains(&self.min_viable_score) {
            return Err(eyre::eyre!(
                "MIN_VIABLE_SCORE must be between 0 and 1 (currently {})",
                self.min_viable_score
            ));
        }
        if self.min_chain_length > self.max_chain_length {
            return Err(eyre::eyre!(
                "MIN_CHAIN_LENGTH ({}) exceeds MAX_CHAIN_LENGTH ({})",
                self.min_chain_length,
                self.max_chain_length
            ));
        }
        if self.max_chain_length > 10 {
            return Err(eyre::eyre!(
                "MAX_CHAIN_LENGTH > 10 makes the cycle search explode"
            ));
        }
        if self.top_chains == 0 {
            return Err(eyre::eyre!("TOP_CHAINS must be at least 1"));
        }

        self.cycle_options().validate()?;
        self.chain_scoring.validate()?;

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║            SURPLUS MATCHER - CONFIGURATION                 ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Snapshot:          {:<40} ║", truncate(&self.snapshot_path, 40));
        println!("║ Min Match Score:   {:<40.2} ║", self.min_match_score);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ CYCLE SEARCH                                               ║");
        println!(
            "║ • Chain Length:    {:<40} ║",
            format!("{} - {}", self.min_chain_length, self.max_chain_length)
        );
        println!("║ • Min Edge Weight: {:<40.2} ║", self.min_edge_weight);
        println!("║ • Max Results:     {:<40} ║", self.max_results);
        println!(
            "║ • Member Limits:   {:<40} ║",
            if self.respect_participant_limits { "✓ Enforced" } else { "✗ Ignored" }
        );
        println!(
            "║ • Timeout:         {:<40} ║",
            if self.search_timeout_ms == 0 {
                "none".to_string()
            } else {
                format!("{} ms", self.search_timeout_ms)
            }
        );
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ CHAIN SCORING                                              ║");
        println!(
            "║ • Weights:         {:<40} ║",
            format!(
                "{:.2}/{:.2}/{:.2}/{:.2}/{:.2}",
                self.chain_scoring.match_quality_weight,
                self.chain_scoring.trust_risk_weight,
                self.chain_scoring.complexity_weight,
                self.chain_scoring.timing_weight,
                self.chain_scoring.geographic_weight
            )
        );
        println!(
            "║ • Length Penalty:  {:<40.2} ║",
            self.chain_scoring.length_penalty_per_participant
        );
        println!("║ • Low Trust Below: {:<40.2} ║", self.chain_scoring.low_trust_threshold);
        println!("║ • Min Viable:      {:<40.2} ║", self.min_viable_score);
        println!("║ • Max Risks:       {:<40} ║", self.max_risk_factors);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ OUTPUT                                                     ║");
        println!("║ • Top Chains:      {:<40} ║", self.top_chains);
        println!("║ • Excluded:        {:<40} ║", self.excluded_participants.len());
        println!(
            "║ • Proposal Log:    {:<40} ║",
            if self.proposal_log { "✓ Enabled" } else { "✗ Disabled" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// MIN_EDGE_WEIGHT falls back to the match score threshold when unset or unparsable.
fn edge_weight_or(raw: Option<String>, min_match_score: f64) -> f64 {
    raw.and_then(|v| v.parse().ok()).unwrap_or(min_match_score)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let skip = s.chars().count() - max.saturating_sub(3);
        format!("...{}", s.chars().skip(skip).collect::<String>())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: "./data/marketplace.json".to_string(),
            min_match_score: 0.3,
            min_chain_length: 2,
            max_chain_length: 6,
            min_edge_weight: 0.3,
            max_results: 50,
            respect_participant_limits: false,
            search_timeout_ms: 0,
            min_viable_score: 0.3,
            max_risk_factors: 3,
            top_chains: 10,
            excluded_participants: vec![],
            proposal_log: true,
            proposal_log_path: "./logs/chain_proposals.log".to_string(),
            chain_scoring: ChainScoringOptions::default(),
        }
    }
}

// ============================================
// PROPOSAL LOGGER
// ============================================

/// One ranked chain, handed to the protocol layer as a JSON line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainProposalLog {
    pub timestamp: DateTime<Utc>,
    pub participants: Vec<String>,
    pub edges: Vec<String>,
    pub overall: f64,
    pub rating: String,
    pub strengths: Vec<String>,
    pub risk_factors: Vec<String>,
}

impl ChainProposalLog {
    pub fn from_scored(scored: &ScoredCycle) -> Self {
        Self {
            timestamp: Utc::now(),
            participants: scored.cycle.node_ids.clone(),
            edges: scored.cycle.edge_ids.clone(),
            overall: scored.score.overall,
            rating: scored.score.rating().to_string(),
            strengths: scored.score.strengths.clone(),
            risk_factors: scored.score.risk_factors.clone(),
        }
    }

    /// Append this entry to a file
    pub fn append_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        // Create parent directories if needed
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        let json = serde_json::to_string(self)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }
}

// ============================================
// TESTS
// ============================================
