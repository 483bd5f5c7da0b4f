use crate::policy::Policy;
use crate::refs;
use crate::state::TicketClaim;

// ---------------------------------------------------------------------------
// Violation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    MissingTicketRef,
    MissingRequirementRef,
    TicketMismatch { claimed: String, referenced: String },
}

impl Violation {
    pub fn message(&self) -> String {
        match self {
            Self::MissingTicketRef => {
                "commit message has no ticket reference (e.g. [CUR-123])".to_string()
            }
            Self::MissingRequirementRef => {
                "commit message has no requirement reference (e.g. Implements: REQ-d00001)"
                    .to_string()
            }
            Self::TicketMismatch {
                claimed,
                referenced,
            } => format!(
                "commit references {referenced} but {claimed} is claimed in this worktree"
            ),
        }
    }

    pub fn remediation(&self) -> String {
        match self {
            Self::MissingTicketRef => {
                "prefix the message with the ticket id, e.g. '[CUR-123] ...'".to_string()
            }
            Self::MissingRequirementRef => {
                "add a requirement line, e.g. 'Implements: REQ-d00001'".to_string()
            }
            Self::TicketMismatch { referenced, .. } => {
                format!("run 'traq switch {referenced}' or fix the commit message")
            }
        }
    }

    /// Whether this violation blocks the commit under `policy`. A ticket
    /// mismatch is reported whenever both sides exist, but only blocks when
    /// the match check is enabled.
    pub fn is_blocking(&self, policy: &Policy) -> bool {
        match self {
            Self::MissingTicketRef => policy.require_ticket_ref,
            Self::MissingRequirementRef => policy.require_requirement_ref,
            Self::TicketMismatch { .. } => policy.require_ticket_match,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a candidate commit message against the active claim and the
/// enforcement policy. All applicable violations are accumulated in one
/// pass; nothing short-circuits. Performs no writes.
pub fn validate(
    message: &str,
    active: Option<&TicketClaim>,
    policy: &Policy,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let ticket = refs::ticket_ref(message);

    if policy.require_ticket_ref && ticket.is_none() {
        violations.push(Violation::MissingTicketRef);
    }
    if policy.require_requirement_ref && refs::requirement_refs(message).is_empty() {
        violations.push(Violation::MissingRequirementRef);
    }
    if let (Some(referenced), Some(claim)) = (&ticket, active) {
        if *referenced != claim.id {
            violations.push(Violation::TicketMismatch {
                claimed: claim.id.clone(),
                referenced: referenced.clone(),
            });
        }
    }
    violations
}

/// True if any violation blocks the commit under `policy`.
pub fn has_blocking(violations: &[Violation], policy: &Policy) -> bool {
    violations.iter().any(|v| v.is_blocking(policy))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claim(id: &str) -> TicketClaim {
        TicketClaim {
            id: id.to_string(),
            requirements: vec!["REQ-d00010".to_string()],
            claimed_at: Utc::now(),
            claimed_by: "agent-1".to_string(),
        }
    }

    fn full_policy() -> Policy {
        Policy {
            require_ticket_ref: true,
            require_requirement_ref: true,
            require_ticket_match: true,
            emergency_bypass: false,
        }
    }

    #[test]
    fn default_policy_passes_anything() {
        let violations = validate("fix bug", None, &Policy::default());
        assert!(violations.is_empty());
    }

    #[test]
    fn missing_both_refs_reports_two_violations() {
        let policy = Policy {
            require_ticket_ref: true,
            require_requirement_ref: true,
            ..Policy::default()
        };
        let violations = validate("fix bug", None, &policy);
        assert_eq!(violations.len(), 2);
        assert!(violations.contains(&Violation::MissingTicketRef));
        assert!(violations.contains(&Violation::MissingRequirementRef));
    }

    #[test]
    fn well_formed_message_passes_full_policy() {
        let violations = validate(
            "[CUR-1] fix\n\nImplements: REQ-d00001",
            None,
            &full_policy(),
        );
        assert!(violations.is_empty(), "unexpected: {violations:?}");
    }

    #[test]
    fn mismatch_reported_even_without_match_policy() {
        let policy = Policy::default();
        let violations = validate("[CUR-200] unrelated", Some(&claim("CUR-100")), &policy);
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert!(matches!(v, Violation::TicketMismatch { .. }));
        // Reported but advisory while the match check is off.
        assert!(!v.is_blocking(&policy));
    }

    #[test]
    fn mismatch_blocks_when_match_required() {
        let policy = Policy {
            require_ticket_match: true,
            ..Policy::default()
        };
        let violations = validate("[CUR-200] unrelated", Some(&claim("CUR-100")), &policy);
        assert!(has_blocking(&violations, &policy));
        assert!(matches!(
            &violations[0],
            Violation::TicketMismatch { claimed, referenced }
                if claimed == "CUR-100" && referenced == "CUR-200"
        ));
    }

    #[test]
    fn matching_ticket_is_clean() {
        let violations = validate(
            "[CUR-100] add tests\n\nImplements: REQ-d00010",
            Some(&claim("CUR-100")),
            &full_policy(),
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn all_three_violations_can_stack() {
        // No refs at all plus a claim: missing ticket + missing requirement.
        // With a wrong ticket present instead: mismatch joins the set.
        let policy = full_policy();
        let violations = validate("[CUR-9] wip", Some(&claim("CUR-100")), &policy);
        assert_eq!(violations.len(), 2);
        assert!(violations.contains(&Violation::MissingRequirementRef));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::TicketMismatch { .. })));
    }

    #[test]
    fn remediation_names_the_fix() {
        let v = Violation::TicketMismatch {
            claimed: "CUR-100".to_string(),
            referenced: "CUR-200".to_string(),
        };
        assert!(v.remediation().contains("traq switch CUR-200"));
    }
}
