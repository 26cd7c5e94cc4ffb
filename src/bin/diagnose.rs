//! Diagnostic tool - Check the effective configuration
//!
//! Run with: cargo run --bin diagnose

use std::env;
use std::path::Path;

use surplus_matcher::config::Config;
use surplus_matcher::network::MarketSnapshot;

fn main() {
    println!("🔍 SURPLUS MATCHER DIAGNOSTIC CHECK\n");

    // Load .env
    dotenvy::dotenv().ok();

    println!("═══════════════════════════════════════════════════");
    println!("                  CONFIGURATION                     ");
    println!("═══════════════════════════════════════════════════\n");

    let checks = [
        ("SNAPSHOT_PATH", "./data/marketplace.json", "Marketplace snapshot file"),
        ("MIN_MATCH_SCORE", "0.3", "Minimum match score for an edge"),
        ("MIN_CHAIN_LENGTH", "2", "Fewest participants per chain"),
        ("MAX_CHAIN_LENGTH", "6", "Most participants per chain"),
        ("MIN_EDGE_WEIGHT", "same as MIN_MATCH_SCORE", "Weakest edge the search follows"),
        ("MAX_RESULTS", "50", "Cycle search result cap"),
        ("RESPECT_PARTICIPANT_LIMITS", "false", "Honour members' own chain limits?"),
        ("SEARCH_TIMEOUT_MS", "0", "Search deadline (0 = none)"),
        ("LENGTH_PENALTY", "0.08", "Complexity penalty per extra participant"),
        ("LOW_TRUST_THRESHOLD", "0.3", "Trust below this is a risk"),
        ("MIN_VIABLE_SCORE", "0.3", "Minimum chain viability"),
        ("MAX_RISK_FACTORS", "3", "Most risks a viable chain may carry"),
        ("TOP_CHAINS", "10", "Chains printed per run"),
        ("EXCLUDED_PARTICIPANTS", "", "Participants removed before searching"),
        ("PROPOSAL_LOG", "true", "Log proposals?"),
        ("PROPOSAL_LOG_PATH", "./logs/chain_proposals.log", "Proposal log file"),
    ];

    for (key, default, desc) in checks {
        let value = env::var(key).unwrap_or_else(|_| default.to_string());
        let is_default = env::var(key).is_err();
        let marker = if is_default { "(default)" } else { "(from .env)" };
        println!("  {}: {} {}", key, value, marker);
        println!("    └─ {}\n", desc);
    }

    println!("═══════════════════════════════════════════════════");
    println!("                   VALIDATION                       ");
    println!("═══════════════════════════════════════════════════\n");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("  ❌ Could not read configuration: {}", e);
            return;
        }
    };

    match config.validate() {
        Ok(()) => println!("  ✅ Configuration is valid"),
        Err(e) => println!("  ❌ {}", e),
    }

    if config.min_edge_weight < config.min_match_score {
        println!("\n  ⚠️  MIN_EDGE_WEIGHT is below MIN_MATCH_SCORE.");
        println!("     No edge can be that weak, so it has no effect.");
    }

    println!("\n═══════════════════════════════════════════════════");
    println!("                    SNAPSHOT                        ");
    println!("═══════════════════════════════════════════════════\n");

    if !Path::new(&config.snapshot_path).exists() {
        println!("  ❌ {} not found", config.snapshot_path);
    } else {
        match MarketSnapshot::from_file(&config.snapshot_path) {
            Ok(snapshot) => {
                println!("  ✅ {}", config.snapshot_path);
                println!("     → {} participants", snapshot.participants.len());
                println!("     → {} offerings", snapshot.offerings.len());
                println!("     → {} needs", snapshot.needs.len());
                println!("     → {} known partnerships", snapshot.partnerships.len());

                let pairs = snapshot.offerings.len() * snapshot.needs.len();
                println!("\n  {} offering × need pairs will be scored.", pairs);

                for id in &config.excluded_participants {
                    if snapshot.participant(id).is_none() {
                        println!("  ⚠️  Excluded participant '{}' is not in the snapshot", id);
                    }
                }
            }
            Err(e) => println!("  ❌ {}", e),
        }
    }

    if config.max_chain_length > 6 {
        println!("\n  ⚠️  Long chains! The search is exponential in MAX_CHAIN_LENGTH");
        println!("     and dense networks may hit MAX_RESULTS early.");
    }

    println!("\n✅ Diagnostic complete!\n");
}
