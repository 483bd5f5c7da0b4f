pub mod claim;
pub mod health;
pub mod history;
pub mod hooks;
pub mod precommit;
pub mod release;
pub mod status;
pub mod switch;
pub mod validate;

/// Identity string recorded on claims: explicit flag, then `TRAQ_AGENT`,
/// then `USER`, then a fixed fallback. Opaque to the state machine.
pub fn agent_identity(explicit: Option<String>) -> String {
    explicit
        .or_else(|| std::env::var("TRAQ_AGENT").ok())
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "unknown".to_string())
}
