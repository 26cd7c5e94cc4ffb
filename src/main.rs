//! Surplus Matcher - Multi-party Exchange Chain Discovery
//!
//! Run with: cargo run -- --snapshot data/marketplace.json
//!
//! Pipeline:
//! - Load a marketplace snapshot
//! - Score every offering × need pair and build the exchange network
//! - Find closed chains, rank them and keep the viable ones
//! - Print the best proposals and append them to the proposal log

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use surplus_matcher::chains::{
    filter_viable_chains, ChainScorer, CycleFinder, CycleStats, FoundCycle, ScoredCycle,
};
use surplus_matcher::config::{ChainProposalLog, Config};
use surplus_matcher::ids::RandomIds;
use surplus_matcher::network::{GraphBuilder, MarketSnapshot, NetworkGraph};

/// Find multi-party exchange chains in a surplus/need marketplace.
///
/// Settings come from a TOML file (--config) or from the environment / .env.
#[derive(Parser, Debug)]
#[command(name = "surplus-matcher", version)]
struct Args {
    /// TOML configuration file (otherwise environment variables / .env)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Marketplace snapshot, overrides SNAPSHOT_PATH
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Only search chains that pass through this participant
    #[arg(long, value_name = "ID", conflicts_with = "require")]
    participant: Option<String>,

    /// Only keep chains containing every one of these participants
    #[arg(long, value_name = "ID", num_args = 1..)]
    require: Vec<String>,

    /// Print cycle statistics for the whole network
    #[arg(long)]
    stats: bool,

    /// Number of ranked chains to print, overrides TOP_CHAINS
    #[arg(long, value_name = "N")]
    top: Option<usize>,

    /// Seed for edge ids (reproducible runs)
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🔄 SURPLUS MATCHER - Exchange Chain Discovery").cyan().bold()
    );
    println!(
        "{}",
        style("    Offerings × Needs | Bounded Cycle Search | Chain Viability").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

fn format_path(cycle: &FoundCycle, snapshot: &MarketSnapshot) -> String {
    let mut names: Vec<&str> = cycle
        .node_ids
        .iter()
        .map(|id| snapshot.display_name(id))
        .collect();
    if let Some(first) = names.first().copied() {
        names.push(first);
    }
    names.join(" → ")
}

fn print_chain(rank: usize, scored: &ScoredCycle, graph: &NetworkGraph, snapshot: &MarketSnapshot) {
    println!();
    println!(
        "{}. {} | avg match {:.2}",
        rank,
        style(format_path(&scored.cycle, snapshot)).cyan(),
        scored.cycle.average_weight
    );

    for edge in scored.cycle.edge_ids.iter().filter_map(|id| graph.get_edge(id)) {
        let title = graph
            .get_node(&edge.from_id)
            .and_then(|n| n.offering(&edge.offering_id))
            .map(|o| o.title.as_str())
            .unwrap_or(edge.offering_id.as_str());
        println!(
            "   {} gives {} to {} ({:.0}% match)",
            snapshot.display_name(&edge.from_id),
            style(title).bold(),
            snapshot.display_name(&edge.to_id),
            edge.match_score * 100.0
        );
    }

    for line in scored.score.summary().lines() {
        println!("   {}", line);
    }
}

fn print_stats(stats: &CycleStats, snapshot: &MarketSnapshot) {
    println!();
    println!("{}", style("Cycle statistics:").blue().bold());
    println!("   Total cycles: {}", stats.total_cycles_found);
    for (len, count) in &stats.cycles_by_length {
        println!("     {}-party: {}", len, count);
    }
    println!("   Mean average weight: {:.3}", stats.average_weight);
    println!(
        "   Participant coverage: {:.1}%",
        stats.participant_coverage * 100.0
    );
    if let Some(best) = &stats.best_cycle {
        println!("   Best cycle: {} ({:.3})", format_path(best, snapshot), best.average_weight);
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("surplus_matcher=info".parse()?),
        )
        .init();

    let args = Args::parse();

    print_banner();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Some(snapshot) = &args.snapshot {
        config.snapshot_path = snapshot.display().to_string();
    }
    if let Some(top) = args.top {
        config.top_chains = top;
    }

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file or --config");
        return Err(e);
    }

    config.print_summary();
    println!();

    // =============================================
    // PHASE 1: THE NETWORK
    // =============================================
    println!();
    println!("{}", style("═══ PHASE 1: THE NETWORK ═══").blue().bold());
    println!();

    println!("{}", style("Step 1.1: Loading marketplace snapshot...").blue());
    let start = Instant::now();

    let snapshot = MarketSnapshot::from_file(&config.snapshot_path)?;

    println!(
        "{} Loaded {} participants, {} offerings, {} needs in {:?}",
        style("✓").green(),
        snapshot.participants.len(),
        snapshot.offerings.len(),
        snapshot.needs.len(),
        start.elapsed()
    );

    // =============================================
    // PHASE 2: THE SCORER
    // =============================================
    println!();
    println!("{}", style("═══ PHASE 2: THE SCORER ═══").magenta().bold());
    println!();

    println!(
        "{}",
        style("Step 2.1: Scoring offering × need pairs...").magenta()
    );
    let start = Instant::now();

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template("   {spinner} [{bar:40.magenta}] {pos}/{len} pairs")?
            .progress_chars("=> "),
    );

    let ids = match args.seed {
        Some(seed) => RandomIds::seeded(seed),
        None => RandomIds::from_entropy(),
    };
    let mut report = GraphBuilder::new(config.min_match_score, ids)
        .with_progress(progress)
        .build(&snapshot);

    println!(
        "{} Graph built in {:?}: {} nodes, {} edges",
        style("✓").green(),
        start.elapsed(),
        report.graph.node_count(),
        report.graph.edge_count()
    );
    println!(
        "   {} pairs scored, {} below {:.2}, {} disqualified, {} filtered by constraints",
        report.pairs_scored,
        report.below_threshold,
        config.min_match_score,
        report.disqualified,
        report.filtered.len()
    );

    for id in &config.excluded_participants {
        match report.graph.remove_node(id) {
            Some(_) => info!("Excluded participant {}", id),
            None => warn!("Excluded participant {} is not in the snapshot", id),
        }
    }
    let graph = report.graph;

    let anchors = args.participant.iter().chain(args.require.iter());
    for id in anchors {
        if config.is_excluded(id) {
            return Err(eyre!("{} is both requested and excluded", id));
        }
        if !graph.contains_node(id) {
            warn!("Requested participant {} is not in the network", id);
        }
    }

    // =============================================
    // PHASE 3: THE CHAINS
    // =============================================
    println!();
    println!("{}", style("═══ PHASE 3: THE CHAINS ═══").green().bold());
    println!();

    println!("{}", style("Step 3.1: Searching for closed chains...").green());
    let start = Instant::now();

    let mut options = config.cycle_options();
    options.must_include = args.participant.clone();
    let finder = CycleFinder::new(&graph, options)?;

    let cycles = if !args.require.is_empty() {
        let required: Vec<&str> = args.require.iter().map(String::as_str).collect();
        finder.find_cycles_including_all(&required)
    } else if config.search_timeout_ms > 0 {
        finder.find_cycles_before(Instant::now() + Duration::from_millis(config.search_timeout_ms))
    } else {
        finder.find_cycles()
    };

    let participants: HashSet<&str> = cycles
        .iter()
        .flat_map(|c| c.node_ids.iter().map(String::as_str))
        .collect();
    println!(
        "{} Found {} chains in {:?} ({} participants involved)",
        style("✓").green(),
        cycles.len(),
        start.elapsed(),
        participants.len()
    );

    println!();
    println!("{}", style("Step 3.2: Ranking chain viability...").green());

    let scorer = ChainScorer::new(&graph, config.chain_scoring.clone())?;
    let ranked = scorer.rank_chains(cycles);
    let total_ranked = ranked.len();
    let viable = filter_viable_chains(ranked, config.min_viable_score, config.max_risk_factors);

    println!(
        "{} {} of {} chains are viable (score ≥ {:.2}, ≤ {} risks)",
        style("✓").green(),
        viable.len(),
        total_ranked,
        config.min_viable_score,
        config.max_risk_factors
    );

    if args.stats {
        print_stats(&finder.cycle_stats(), &snapshot);
    }

    // =============================================
    // PROPOSALS
    // =============================================
    println!();
    println!("{}", style("═══ PROPOSALS ═══").yellow().bold());

    if viable.is_empty() {
        println!();
        println!("{}", style("No viable chains in this snapshot.").yellow());
        println!("Try lowering MIN_MATCH_SCORE or raising MAX_CHAIN_LENGTH.");
    }

    let proposals: Vec<&ScoredCycle> = viable.iter().take(config.top_chains).collect();
    for (i, scored) in proposals.iter().enumerate() {
        print_chain(i + 1, scored, &graph, &snapshot);
    }

    if config.proposal_log && !proposals.is_empty() {
        let mut logged = 0;
        for scored in &proposals {
            match ChainProposalLog::from_scored(scored).append_to_file(&config.proposal_log_path) {
                Ok(()) => logged += 1,
                Err(e) => warn!("Failed to log proposal: {}", e),
            }
        }
        println!();
        println!(
            "{} {} proposals logged to: {}",
            style("📝").cyan(),
            logged,
            config.proposal_log_path
        );
    }

    // =============================================
    // SUMMARY
    // =============================================
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").green()
    );
    println!("{}", style(" ✅ MATCHING COMPLETE").green().bold());
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").green()
    );
    println!();
    println!("Summary:");
    println!("  • Participants: {}", graph.node_count());
    println!("  • Exchange edges: {}", graph.edge_count());
    println!("  • Chains found: {}", total_ranked);
    println!("  • Viable chains: {}", viable.len());
    println!();

    Ok(())
}
