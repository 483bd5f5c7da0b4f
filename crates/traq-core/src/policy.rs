use std::env;

pub const ENV_REQUIRE_TICKET_REF: &str = "TRAQ_REQUIRE_TICKET_REF";
pub const ENV_REQUIRE_REQUIREMENT_REF: &str = "TRAQ_REQUIRE_REQUIREMENT_REF";
pub const ENV_REQUIRE_TICKET_MATCH: &str = "TRAQ_REQUIRE_TICKET_MATCH";
pub const ENV_EMERGENCY_BYPASS: &str = "TRAQ_EMERGENCY_BYPASS";

/// Enforcement switches for the commit gate. Everything defaults to off;
/// teams opt in per check. Constructed once at process startup and passed
/// into validation, never read from the environment mid-operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    /// Commit message must contain a ticket reference.
    pub require_ticket_ref: bool,
    /// Commit message must contain at least one requirement reference.
    pub require_requirement_ref: bool,
    /// A ticket reference that disagrees with the active claim blocks the
    /// commit (a mismatch is always reported either way).
    pub require_ticket_match: bool,
    /// Escape hatch: allow a commit past the active-ticket precondition,
    /// recording an emergency-bypass audit entry.
    pub emergency_bypass: bool,
}

impl Policy {
    pub fn from_env() -> Self {
        Self {
            require_ticket_ref: env_flag(ENV_REQUIRE_TICKET_REF),
            require_requirement_ref: env_flag(ENV_REQUIRE_REQUIREMENT_REF),
            require_ticket_match: env_flag(ENV_REQUIRE_TICKET_MATCH),
            emergency_bypass: env_flag(ENV_EMERGENCY_BYPASS),
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
