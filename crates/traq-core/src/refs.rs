use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static REQ_RE: OnceLock<Regex> = OnceLock::new();
static TICKET_RE: OnceLock<Regex> = OnceLock::new();

/// `REQ-`, optional 2-4 letter sponsor prefix, type letter (p/o/d), 5 digits.
fn req_re() -> &'static Regex {
    REQ_RE.get_or_init(|| Regex::new(r"REQ-(?:[A-Z]{2,4}-)?[pod][0-9]{5}").unwrap())
}

/// Ticket identifiers like `CUR-399`, optionally wrapped in `[...]`.
fn ticket_re() -> &'static Regex {
    TICKET_RE.get_or_init(|| Regex::new(r"\b([A-Z]{2,10}-[0-9]+)\b").unwrap())
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract requirement references in first-seen order, duplicates preserved.
///
/// Callers that care about frequency (suggestion heuristics) use this mode.
pub fn requirement_refs(text: &str) -> Vec<String> {
    req_re()
        .find_iter(text)
        // Exactly 5 digits: reject a match that runs into a sixth digit.
        .filter(|m| !next_char_is_digit(text, m.end()))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extract requirement references, deduplicated and sorted.
pub fn unique_requirement_refs(text: &str) -> Vec<String> {
    requirement_refs(text)
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Extract the first ticket reference, with any `[...]` wrapping stripped.
pub fn ticket_ref(text: &str) -> Option<String> {
    ticket_re()
        .captures(text)
        .map(|c| c[1].to_string())
}

fn next_char_is_digit(text: &str, at: usize) -> bool {
    text[at..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_refs_in_order() {
        let refs = requirement_refs("Implements: REQ-p00042, REQ-d00027");
        assert_eq!(refs, vec!["REQ-p00042", "REQ-d00027"]);
    }

    #[test]
    fn requirement_refs_keep_duplicates() {
        let refs = requirement_refs("REQ-d00001 then REQ-d00001 again");
        assert_eq!(refs, vec!["REQ-d00001", "REQ-d00001"]);
    }

    #[test]
    fn unique_requirement_refs_sorted_dedup() {
        let refs = unique_requirement_refs("Implements: REQ-p00042, REQ-d00027, REQ-p00042");
        assert_eq!(refs, vec!["REQ-d00027", "REQ-p00042"]);
    }

    #[test]
    fn sponsor_prefixed_requirement() {
        let refs = requirement_refs("traces to REQ-ACME-o00310");
        assert_eq!(refs, vec!["REQ-ACME-o00310"]);
    }

    #[test]
    fn requirement_needs_exactly_five_digits() {
        assert!(requirement_refs("REQ-p0042").is_empty());
        assert!(requirement_refs("REQ-p000425").is_empty());
    }

    #[test]
    fn requirement_type_letter_is_lowercase() {
        assert!(requirement_refs("REQ-P00042").is_empty());
        assert!(requirement_refs("req-p00042").is_empty());
    }

    #[test]
    fn ticket_ref_strips_brackets() {
        assert_eq!(ticket_ref("[CUR-399] fix bug"), Some("CUR-399".to_string()));
    }

    #[test]
    fn ticket_ref_bare() {
        assert_eq!(ticket_ref("CUR-7 touch up"), Some("CUR-7".to_string()));
    }

    #[test]
    fn ticket_ref_first_match_wins() {
        assert_eq!(
            ticket_ref("CUR-1 relates to CUR-2"),
            Some("CUR-1".to_string())
        );
    }

    #[test]
    fn ticket_ref_absent() {
        assert_eq!(ticket_ref("fix bug"), None);
        assert_eq!(ticket_ref(""), None);
    }

    #[test]
    fn ticket_not_confused_with_requirement() {
        // A requirement ref has a type letter after the dash, not a digit,
        // so the ticket pattern does not fire inside it.
        assert_eq!(ticket_ref("Implements: REQ-p00042"), None);
    }

    #[test]
    fn empty_input_yields_empty() {
        assert!(requirement_refs("").is_empty());
        assert!(unique_requirement_refs("").is_empty());
    }
}
