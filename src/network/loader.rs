//! Marketplace snapshot ingest
//!
//! Reads participants, offerings, needs and known partnerships from a
//! JSON document. Trust scores are required input: the trust subsystem
//! owns their defaults, so nothing is filled in here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use super::types::{Need, Node, Offering, ParticipantConstraints};
use crate::error::Result;

/// A participant as recorded in the snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub id: String,

    #[serde(default)]
    pub display_name: Option<String>,

    /// Home region, checked against needs' excluded regions
    #[serde(default)]
    pub region: Option<String>,

    /// Supplied by the trust subsystem (0-1)
    pub trust_score: f64,

    /// Exchanges completed as provider or recipient
    #[serde(default)]
    pub completed_exchanges: u32,

    #[serde(default)]
    pub constraints: ParticipantConstraints,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferingRecord {
    pub provider: String,

    #[serde(flatten)]
    pub offering: Offering,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedRecord {
    pub participant: String,

    #[serde(flatten)]
    pub need: Need,
}

/// Everything needed for one matching run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub participants: Vec<ParticipantRecord>,

    #[serde(default)]
    pub offerings: Vec<OfferingRecord>,

    #[serde(default)]
    pub needs: Vec<NeedRecord>,

    /// Pairs of participants who have exchanged before
    #[serde(default)]
    pub partnerships: Vec<(String, String)>,
}

impl MarketSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let snapshot = Self::from_json(&content)?;

        info!(
            "Loaded snapshot {}: {} participants, {} offerings, {} needs",
            path.as_ref().display(),
            snapshot.participants.len(),
            snapshot.offerings.len(),
            snapshot.needs.len()
        );

        Ok(snapshot)
    }

    pub fn participant(&self, id: &str) -> Option<&ParticipantRecord> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Display name, falling back to the participant id
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.participant(id)
            .and_then(|p| p.display_name.as_deref())
            .unwrap_or(id)
    }

    /// Have these two participants exchanged before (either direction)?
    pub fn is_partnership(&self, a: &str, b: &str) -> bool {
        self.partnerships
            .iter()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }

    /// Build graph nodes, attaching each participant's offerings and needs.
    /// Offerings/needs whose owner is not a participant are dropped.
    pub fn to_nodes(&self) -> Vec<Node> {
        let mut offerings: HashMap<&str, Vec<Offering>> = HashMap::new();
        for record in &self.offerings {
            offerings
                .entry(record.provider.as_str())
                .or_default()
                .push(record.offering.clone());
        }

        let mut needs: HashMap<&str, Vec<Need>> = HashMap::new();
        for record in &self.needs {
            needs
                .entry(record.participant.as_str())
                .or_default()
                .push(record.need.clone());
        }

        self.participants
            .iter()
            .map(|p| Node {
                id: p.id.clone(),
                offerings: offerings.remove(p.id.as_str()).unwrap_or_default(),
                needs: needs.remove(p.id.as_str()).unwrap_or_default(),
                trust_score: p.trust_score,
                constraints: p.constraints.clone(),
            })
            .collect()
    }
}
