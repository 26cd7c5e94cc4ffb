//! Phase 1: The Network (Graph Store + Ingest)
//!
//! Responsible for:
//! - The marketplace data model (participants, offerings, needs, edges)
//! - The exchange graph with O(1) node/edge lookup and adjacency queries
//! - Loading snapshots and building edges through pre-filters + scoring

mod builder;
mod graph;
mod loader;
mod types;

pub use builder::{BuildReport, FilterReason, FilteredPair, GraphBuilder};
pub use graph::NetworkGraph;
pub use loader::{MarketSnapshot, NeedRecord, OfferingRecord, ParticipantRecord};
pub use types::{
    parse_instant, AvailabilityWindow, Edge, Need, NeedConstraints, Node, Offering,
    OfferingConstraints, ParticipantConstraints, SurplusType, TimeSensitivity,
};

#[cfg(test)]
pub(crate) use graph::tests as fixtures;
