//! Marketplace data model
//!
//! Participants advertise surplus (offerings) and requirements (needs).
//! A participant becomes a node in the exchange network; a scored
//! offering → need pairing becomes an edge.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::{MatchError, Result};

// ============================================
// ENUMS
// ============================================

/// Category of surplus being offered or needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurplusType {
    Service,
    PhysicalGood,
    Access,
    Space,
}

impl fmt::Display for SurplusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurplusType::Service => write!(f, "service"),
            SurplusType::PhysicalGood => write!(f, "physical_good"),
            SurplusType::Access => write!(f, "access"),
            SurplusType::Space => write!(f, "space"),
        }
    }
}

/// How quickly a surplus loses its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSensitivity {
    #[default]
    None,
    Weeks,
    Days,
    Hours,
}

impl fmt::Display for TimeSensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSensitivity::None => write!(f, "none"),
            TimeSensitivity::Weeks => write!(f, "weeks"),
            TimeSensitivity::Days => write!(f, "days"),
            TimeSensitivity::Hours => write!(f, "hours"),
        }
    }
}

// ============================================
// DATES
// ============================================

/// Parse a calendar instant from RFC 3339 or a bare `YYYY-MM-DD` date
/// (interpreted as midnight UTC).
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| MatchError::InvalidDate(raw.to_string()))
}

fn deserialize_instant<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_instant(&s).map_err(serde::de::Error::custom))
        .transpose()
}

// ============================================
// OFFERINGS
// ============================================

/// When an offering can be delivered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    #[serde(default, deserialize_with = "deserialize_instant")]
    pub available_from: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "deserialize_instant")]
    pub available_until: Option<DateTime<Utc>>,
}

impl AvailabilityWindow {
    pub fn is_open(&self) -> bool {
        self.available_from.is_none() && self.available_until.is_none()
    }
}

/// Restrictions the provider places on an offering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferingConstraints {
    /// Regions where the offering can be delivered (empty = anywhere)
    #[serde(default)]
    pub geographic: Vec<String>,

    #[serde(default)]
    pub timing: AvailabilityWindow,

    /// Free-text minimum engagement, e.g. "4 hours minimum"
    #[serde(default)]
    pub minimum_engagement: Option<String>,
}

/// Surplus a participant can supply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offering {
    pub id: String,

    #[serde(rename = "type")]
    pub surplus_type: SurplusType,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Capability ids supplied by the capability extraction layer
    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub constraints: OfferingConstraints,

    #[serde(default)]
    pub time_sensitivity: TimeSensitivity,

    #[serde(default)]
    pub sector_tags: Vec<String>,
}

impl Offering {
    pub fn new(id: impl Into<String>, surplus_type: SurplusType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            surplus_type,
            title: title.into(),
            description: String::new(),
            capabilities: Vec::new(),
            constraints: OfferingConstraints::default(),
            time_sensitivity: TimeSensitivity::None,
            sector_tags: Vec::new(),
        }
    }
}

// ============================================
// NEEDS
// ============================================

/// Restrictions the recipient places on acceptable offerings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NeedConstraints {
    /// Regions from which offerings are acceptable (empty = anywhere)
    #[serde(default)]
    pub accepted_regions: Vec<String>,

    /// Provider home regions that are never acceptable
    #[serde(default)]
    pub excluded_regions: Vec<String>,

    /// Latest acceptable fulfilment instant
    #[serde(default, deserialize_with = "deserialize_instant")]
    pub needed_by: Option<DateTime<Utc>>,

    /// Minimum completed exchanges the provider must have
    #[serde(default)]
    pub min_exchanges_completed: u32,

    /// Minimum provider trust score (0-1)
    #[serde(default)]
    pub min_trust_score: f64,
}

/// A requirement a participant wants fulfilled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Need {
    pub id: String,

    #[serde(rename = "type")]
    pub surplus_type: SurplusType,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Capability ids that would fulfil this need
    #[serde(default)]
    pub explicit_matches: Vec<String>,

    #[serde(default)]
    pub constraints: NeedConstraints,

    #[serde(default)]
    pub sector_tags: Vec<String>,

    /// Need has a tight deadline
    #[serde(default)]
    pub urgent: bool,
}

impl Need {
    pub fn new(id: impl Into<String>, surplus_type: SurplusType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            surplus_type,
            title: title.into(),
            description: String::new(),
            explicit_matches: Vec::new(),
            constraints: NeedConstraints::default(),
            sector_tags: Vec::new(),
            urgent: false,
        }
    }
}

// ============================================
// PARTICIPANTS
// ============================================

fn default_max_chain_length() -> usize {
    6
}

/// Limits a participant places on the exchanges it joins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantConstraints {
    /// Maximum number of participants in a chain
    #[serde(default = "default_max_chain_length")]
    pub max_chain_length: usize,

    /// Minimum prior exchanges required of a partner
    #[serde(default)]
    pub min_partner_exchanges: u32,

    #[serde(default)]
    pub preferred_sectors: Vec<String>,

    /// Sectors this participant will not receive from
    #[serde(default)]
    pub excluded_sectors: Vec<String>,

    #[serde(default)]
    pub geographic: Vec<String>,
}

impl Default for ParticipantConstraints {
    fn default() -> Self {
        Self {
            max_chain_length: default_max_chain_length(),
            min_partner_exchanges: 0,
            preferred_sectors: Vec::new(),
            excluded_sectors: Vec::new(),
            geographic: Vec::new(),
        }
    }
}

/// A participant in the exchange network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub offerings: Vec<Offering>,
    pub needs: Vec<Need>,

    /// Supplied by the trust subsystem (0-1)
    pub trust_score: f64,

    pub constraints: ParticipantConstraints,
}

impl Node {
    pub fn new(id: impl Into<String>, trust_score: f64) -> Self {
        Self {
            id: id.into(),
            offerings: Vec::new(),
            needs: Vec::new(),
            trust_score,
            constraints: ParticipantConstraints::default(),
        }
    }

    pub fn offering(&self, offering_id: &str) -> Option<&Offering> {
        self.offerings.iter().find(|o| o.id == offering_id)
    }

    pub fn need(&self, need_id: &str) -> Option<&Need> {
        self.needs.iter().find(|n| n.id == need_id)
    }
}

// ============================================
// EDGES
// ============================================

/// A candidate bilateral exchange: `from_id` supplies `to_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub offering_id: String,
    pub need_id: Option<String>,

    /// How well the offering matches the need (0-1)
    pub match_score: f64,

    /// Constraint satisfaction (0-1)
    pub feasibility: f64,

    /// Weight used by the cycle finder (0-1)
    pub weight: f64,
}

impl Edge {
    /// Edge whose weight and feasibility derive directly from a match score
    pub fn scored(
        id: impl Into<String>,
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        offering_id: impl Into<String>,
        need_id: Option<String>,
        match_score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            from_id: from_id.into(),
            to_id: to_id.into(),
            offering_id: offering_id.into(),
            need_id,
            match_score,
            feasibility: 1.0,
            weight: match_score,
        }
    }
}
