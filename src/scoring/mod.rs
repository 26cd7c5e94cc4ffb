//! Phase 2: The Scorer
//!
//! Responsible for:
//! - Extracting comparable keywords from free-text titles/descriptions
//! - Scoring one offering against one need across eight dimensions

mod keywords;
mod matcher;

pub use keywords::extract_keywords;
pub use matcher::{score_match, DealBreaker, MatchBreakdown, MatchInput, MatchOutcome, MatchScore};
