//! Common types used throughout the orchestration service

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for players
pub type PlayerId = String;

/// An indexed player attribute value.
///
/// Range filters only ever apply to numeric values; a text value never
/// satisfies a numeric range filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(i64),
    Text(String),
}

impl AttributeValue {
    /// Numeric view of the value, if it has one.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(_) => None,
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A candidate player with the attributes relevant to the current scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Player {
    /// Create a player carrying only an identifier.
    pub fn with_id(id: impl Into<PlayerId>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }
}

/// An ordered set of players, used both as filter-match output and as
/// match-result input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub players: Vec<Player>,
}

impl Roster {
    /// Build a roster of id-only players.
    pub fn from_ids(name: impl Into<String>, ids: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            name: name.into(),
            players: ids.into_iter().map(Player::with_id).collect(),
        }
    }

    /// Player identifiers in roster order.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }
}

fn default_filter_max() -> i64 {
    i64::MAX
}

/// Inclusive numeric range predicate over one indexed attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeFilter {
    /// Display name of the filter
    #[serde(default)]
    pub name: String,
    /// Attribute the filter applies to
    pub attribute: String,
    /// Inclusive lower bound
    #[serde(default)]
    pub min: i64,
    /// Inclusive upper bound
    #[serde(default = "default_filter_max")]
    pub max: i64,
}

impl AttributeFilter {
    pub fn new(attribute: impl Into<String>, min: i64, max: i64) -> Self {
        let attribute = attribute.into();
        Self {
            name: attribute.clone(),
            attribute,
            min,
            max,
        }
    }
}

/// Cumulative retrieval statistics carried on every streamed chunk.
///
/// The stats on the final chunk are authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Total matched players so far
    pub count: u64,
    /// Wall-clock seconds since the scan began
    pub elapsed: f64,
}

/// A named filter producing a subset of candidate players
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerPool {
    pub name: String,
    #[serde(default)]
    pub filters: Vec<AttributeFilter>,
    /// Matched players; filled incrementally as streamed chunks arrive
    #[serde(default)]
    pub roster: Roster,
    #[serde(default)]
    pub stats: PoolStats,
}

impl PlayerPool {
    pub fn new(name: impl Into<String>, filters: Vec<AttributeFilter>) -> Self {
        Self {
            name: name.into(),
            filters,
            roster: Roster::default(),
            stats: PoolStats::default(),
        }
    }
}

/// One streamed page of pool-scan results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolChunk {
    pub roster: Roster,
    pub stats: PoolStats,
    /// Set on the terminal chunk, which carries the authoritative stats.
    /// A scan that matches nothing still emits exactly one finished chunk.
    pub finished: bool,
}

/// A request for matches: pool definitions plus an opaque properties blob.
///
/// Profiles are written by the frontend/ingestion side and are read-only
/// from the MMF's perspective.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    /// Opaque JSON-encoded properties
    #[serde(default)]
    pub properties: String,
    #[serde(default)]
    pub pools: Vec<PlayerPool>,
}

/// An MMF's output awaiting evaluator approval, or an error report.
///
/// The wire convention overloads the identifier: workers write a genuine
/// proposal under their injected proposal id and an error report under the
/// injected error id. A non-empty `error` field marks an error report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchObject {
    pub id: String,
    /// Opaque JSON-encoded match result
    #[serde(default)]
    pub properties: String,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub rosters: Vec<Roster>,
    /// Pools carried through for observability
    #[serde(default)]
    pub pools: Vec<PlayerPool>,
}

impl MatchObject {
    /// Distinct player identifiers across all rosters, in first-seen order.
    pub fn distinct_player_ids(&self) -> Vec<PlayerId> {
        let mut seen = std::collections::HashSet::new();
        let mut ids = Vec::new();
        for roster in &self.rosters {
            for player in &roster.players {
                if seen.insert(player.id.clone()) {
                    ids.push(player.id.clone());
                }
            }
        }
        ids
    }
}

/// Wire-compatible acknowledgement for a proposal submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposalAck {
    pub success: bool,
    #[serde(default)]
    pub error: String,
}

/// Internal outcome of a proposal submission.
///
/// Replaces the overloaded-identifier convention with an explicit variant;
/// converted back to a `ProposalAck` only at the protocol boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalOutcome {
    /// A genuine proposal was persisted and enqueued for evaluation
    Committed { key: String, players_reserved: usize },
    /// A worker-reported domain error was persisted for auditability
    ErrorRecorded { key: String, reason: String },
}

impl ProposalOutcome {
    /// Key the match object was persisted under.
    pub fn key(&self) -> &str {
        match self {
            ProposalOutcome::Committed { key, .. } => key,
            ProposalOutcome::ErrorRecorded { key, .. } => key,
        }
    }

    /// Wire acknowledgement for this outcome.
    ///
    /// Domain errors are successful outcomes: the contract is "always produce
    /// an auditable result", and the recorded reason lives in the persisted
    /// match object.
    pub fn ack(&self) -> ProposalAck {
        ProposalAck {
            success: true,
            error: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_value_untagged_serde() {
        let number: AttributeValue = serde_json::from_str("42").unwrap();
        assert_eq!(number, AttributeValue::Number(42));

        let text: AttributeValue = serde_json::from_str("\"eu-west\"").unwrap();
        assert_eq!(text, AttributeValue::Text("eu-west".to_string()));

        assert_eq!(serde_json::to_string(&number).unwrap(), "42");
    }

    #[test]
    fn test_filter_defaults_from_partial_json() {
        let filter: AttributeFilter = serde_json::from_str(r#"{"attribute":"level"}"#).unwrap();
        assert_eq!(filter.min, 0);
        assert_eq!(filter.max, i64::MAX);
        assert!(filter.name.is_empty());
    }

    #[test]
    fn test_match_object_lenient_deserialization() {
        let mo: MatchObject = serde_json::from_str(r#"{"id":"proposal-1"}"#).unwrap();
        assert_eq!(mo.id, "proposal-1");
        assert!(mo.error.is_empty());
        assert!(mo.rosters.is_empty());
        assert!(mo.pools.is_empty());
    }

    #[test]
    fn test_distinct_player_ids_deduplicates_across_rosters() {
        let mo = MatchObject {
            id: "proposal-1".to_string(),
            rosters: vec![
                Roster::from_ids("red", vec!["p1".to_string(), "p2".to_string()]),
                Roster::from_ids("blue", vec!["p2".to_string(), "p3".to_string()]),
            ],
            ..Default::default()
        };

        assert_eq!(mo.distinct_player_ids(), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_proposal_outcome_ack_is_success() {
        let committed = ProposalOutcome::Committed {
            key: "proposal-1".to_string(),
            players_reserved: 4,
        };
        assert!(committed.ack().success);

        let recorded = ProposalOutcome::ErrorRecorded {
            key: "error-1".to_string(),
            reason: "insufficient players".to_string(),
        };
        assert!(recorded.ack().success);
        assert_eq!(recorded.key(), "error-1");
    }
}
