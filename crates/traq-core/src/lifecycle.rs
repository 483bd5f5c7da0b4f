use crate::error::{Result, TraqError};
use crate::state::{HistoryAction, TicketClaim};
use crate::store::StateStore;
use chrono::Utc;
use std::collections::BTreeMap;

/// Outcome of a release: releasing an empty worktree is a warning for the
/// caller, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome {
    Released(String),
    NothingClaimed,
}

/// Claim / release / switch operations over one worktree's state store.
/// Every mutation runs inside a single `atomic_update`, so no other hook
/// process can interleave between the read and the write.
pub struct TicketLifecycle<'a> {
    store: &'a StateStore,
}

impl<'a> TicketLifecycle<'a> {
    pub fn new(store: &'a StateStore) -> Self {
        Self { store }
    }

    /// Claim `ticket_id` for this worktree.
    ///
    /// Re-claiming the already-active ticket is idempotent and refreshes
    /// `claimed_at` and `requirements`. Claiming while a different ticket is
    /// active fails with `AlreadyClaimed` and leaves the existing claim
    /// untouched.
    pub fn claim(
        &self,
        ticket_id: &str,
        requirements: Vec<String>,
        claimed_by: &str,
        sponsor: Option<String>,
    ) -> Result<TicketClaim> {
        let claim = TicketClaim {
            id: ticket_id.to_string(),
            requirements,
            claimed_at: Utc::now(),
            claimed_by: claimed_by.to_string(),
        };
        let new_claim = claim.clone();
        self.store.atomic_update(move |mut state| {
            if let Some(active) = &state.active_ticket {
                if active.id != new_claim.id {
                    return Err(TraqError::AlreadyClaimed {
                        held: active.id.clone(),
                        requested: new_claim.id.clone(),
                    });
                }
            }
            let mut details = BTreeMap::new();
            details.insert("claimedBy".to_string(), new_claim.claimed_by.clone());
            if !new_claim.requirements.is_empty() {
                details.insert(
                    "requirements".to_string(),
                    new_claim.requirements.join(","),
                );
            }
            state.record(HistoryAction::Claim, &new_claim.id, details);
            state.active_ticket = Some(new_claim);
            if sponsor.is_some() {
                state.sponsor = sponsor;
            }
            Ok(state)
        })?;
        Ok(claim)
    }

    /// Release the active claim, recording `reason` and any `extra` detail
    /// (PR number, URL). Releasing with nothing claimed is a soft outcome.
    pub fn release(
        &self,
        reason: &str,
        extra: BTreeMap<String, String>,
    ) -> Result<ReleaseOutcome> {
        let mut outcome = ReleaseOutcome::NothingClaimed;
        self.store.atomic_update(|mut state| {
            let Some(active) = state.active_ticket.take() else {
                return Ok(state);
            };
            let mut details = extra.clone();
            if !reason.is_empty() {
                details.insert("reason".to_string(), reason.to_string());
            }
            state.record(HistoryAction::Release, &active.id, details);
            outcome = ReleaseOutcome::Released(active.id);
            Ok(state)
        })?;
        Ok(outcome)
    }

    /// Atomically release the current claim (if any) and claim `ticket_id`.
    /// Both history entries land in one write; no other writer can observe
    /// the worktree between them.
    pub fn switch(
        &self,
        ticket_id: &str,
        reason: &str,
        requirements: Vec<String>,
        claimed_by: &str,
    ) -> Result<TicketClaim> {
        let claim = TicketClaim {
            id: ticket_id.to_string(),
            requirements,
            claimed_at: Utc::now(),
            claimed_by: claimed_by.to_string(),
        };
        let new_claim = claim.clone();
        let reason = reason.to_string();
        self.store.atomic_update(move |mut state| {
            if let Some(active) = state.active_ticket.take() {
                let mut details = BTreeMap::new();
                details.insert("reason".to_string(), format!("switch to {}", new_claim.id));
                if !reason.is_empty() {
                    details.insert("switchReason".to_string(), reason.clone());
                }
                state.record(HistoryAction::Release, &active.id, details);
            }
            let mut details = BTreeMap::new();
            if !reason.is_empty() {
                details.insert("reason".to_string(), reason.clone());
            }
            state.record(HistoryAction::Switch, &new_claim.id, details);
            state.active_ticket = Some(new_claim);
            Ok(state)
        })?;
        Ok(claim)
    }

    /// Current claim, if any. Pure read.
    pub fn current(&self) -> Result<Option<TicketClaim>> {
        Ok(self.store.load()?.active_ticket)
    }

    /// Record that a gated commit went through. Called by the commit-msg
    /// hook after validation passes.
    pub fn record_commit(
        &self,
        ticket_id: &str,
        details: BTreeMap<String, String>,
    ) -> Result<()> {
        self.store.atomic_update(|mut state| {
            state.record(HistoryAction::Commit, ticket_id, details.clone());
            Ok(state)
        })?;
        Ok(())
    }

    /// Record an emergency bypass. The bypass itself is decided by the
    /// caller; the audit entry is mandatory and never silent.
    pub fn record_bypass(&self, reason: &str) -> Result<()> {
        self.store.atomic_update(|mut state| {
            let ticket_id = state
                .active_ticket
                .as_ref()
                .map(|c| c.id.clone())
                .unwrap_or_else(|| "none".to_string());
            let mut details = BTreeMap::new();
            details.insert("reason".to_string(), reason.to_string());
            state.record(HistoryAction::EmergencyBypass, &ticket_id, details);
            Ok(state)
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
