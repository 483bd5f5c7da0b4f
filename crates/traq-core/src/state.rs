use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketClaim {
    pub id: String,
    pub requirements: Vec<String>,
    pub claimed_at: DateTime<Utc>,
    pub claimed_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryAction {
    Claim,
    Release,
    Switch,
    Commit,
    EmergencyBypass,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Release => "release",
            Self::Switch => "switch",
            Self::Commit => "commit",
            Self::EmergencyBypass => "emergency-bypass",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub timestamp: DateTime<Utc>,
    pub ticket_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

/// One instance per git worktree. At most one active ticket at a time;
/// `history` is append-only and never edited after the fact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    #[serde(default = "default_version")]
    pub version: u32,
    pub active_ticket: Option<TicketClaim>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<String>,
}

fn default_version() -> u32 {
    1
}

impl WorkflowState {
    pub fn new() -> Self {
        Self {
            version: 1,
            active_ticket: None,
            history: Vec::new(),
            sponsor: None,
        }
    }

    /// Append one history entry. Entries are never edited or removed.
    pub fn record(
        &mut self,
        action: HistoryAction,
        ticket_id: &str,
        details: BTreeMap<String, String>,
    ) {
        self.history.push(HistoryEntry {
            action,
            timestamp: Utc::now(),
            ticket_id: ticket_id.to_string(),
            details,
        });
    }

    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_roundtrip_matches_wire_names() {
        let mut state = WorkflowState::new();
        state.active_ticket = Some(TicketClaim {
            id: "CUR-100".to_string(),
            requirements: vec!["REQ-d00010".to_string()],
            claimed_at: Utc::now(),
            claimed_by: "agent-1".to_string(),
        });
        state.record(HistoryAction::Claim, "CUR-100", BTreeMap::new());

        let json = serde_json::to_string_pretty(&state).unwrap();
        assert!(json.contains("\"activeTicket\""));
        assert!(json.contains("\"claimedAt\""));
        assert!(json.contains("\"claimedBy\""));
        assert!(json.contains("\"ticketId\""));
        assert!(json.contains("\"action\": \"claim\""));

        let parsed: WorkflowState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.active_ticket.unwrap().id, "CUR-100");
        assert_eq!(parsed.history.len(), 1);
    }

    #[test]
    fn empty_state_parses_with_defaults() {
        let parsed: WorkflowState = serde_json::from_str(r#"{"activeTicket":null}"#).unwrap();
        assert_eq!(parsed.version, 1);
        assert!(parsed.active_ticket.is_none());
        assert!(parsed.history.is_empty());
        assert!(parsed.sponsor.is_none());
    }

    #[test]
    fn emergency_bypass_serializes_kebab() {
        let mut state = WorkflowState::new();
        state.record(HistoryAction::EmergencyBypass, "CUR-5", BTreeMap::new());
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"emergency-bypass\""));
    }

    #[test]
    fn record_appends_in_order() {
        let mut state = WorkflowState::new();
        state.record(HistoryAction::Claim, "CUR-1", BTreeMap::new());
        state.record(HistoryAction::Release, "CUR-1", BTreeMap::new());
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.history[0].action, HistoryAction::Claim);
        assert_eq!(state.last_entry().unwrap().action, HistoryAction::Release);
    }
}
