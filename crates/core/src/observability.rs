//! Observability Plane (C7): sanitized error classification (§7).
//!
//! `classify_error` never returns or retains the original message — only one of the
//! five [`ErrorKind`] values the trace schema allows. Implemented as a table of
//! case-insensitive substring patterns compiled once via `once_cell::sync::Lazy`,
//! the same shape as a `redact_sensitive` pattern table, repurposed here
//! for classification rather than redaction.

use agentflow_types::ErrorKind;
use once_cell::sync::Lazy;
use regex::Regex;

struct Pattern {
    kind: ErrorKind,
    regex: Regex,
}

/// Checked in order; the first match wins. `auth`/`unauthorized` before `network` and
/// `timeout` before both, since some upstream SDKs phrase an auth timeout as "request
/// timed out: unauthorized" and §7's ordering lists `timeout` first.
static PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    let compile = |kind: ErrorKind, pattern: &str| Pattern { kind, regex: Regex::new(pattern).expect("valid pattern") };
    vec![
        compile(ErrorKind::Timeout, r"(?i)timeout|timed out"),
        compile(ErrorKind::AuthFailed, r"(?i)auth|unauthorized|forbidden"),
        compile(ErrorKind::Validation, r"(?i)valid"),
        compile(ErrorKind::Network, r"(?i)network|econnrefused|connection reset|dns"),
    ]
});

/// Classifies an arbitrary error into one of the five trace-schema kinds (§7) by
/// case-insensitive substring match on its display text and its source chain's display
/// text. Never stores or returns the matched text itself.
pub fn classify_error(error: &anyhow::Error) -> ErrorKind {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error.as_ref());
    while let Some(err) = source {
        let text = err.to_string();
        if let Some(kind) = classify_text(&text) {
            return kind;
        }
        source = err.source();
    }
    ErrorKind::Unknown
}

fn classify_text(text: &str) -> Option<ErrorKind> {
    PATTERNS.iter().find(|pattern| pattern.regex.is_match(text)).map(|pattern| pattern.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn classifies_timeout() {
        assert_eq!(classify_error(&anyhow!("request timed out after 30s")), ErrorKind::Timeout);
    }

    #[test]
    fn classifies_auth_failed() {
        assert_eq!(classify_error(&anyhow!("401 Unauthorized")), ErrorKind::AuthFailed);
    }

    #[test]
    fn classifies_network() {
        assert_eq!(classify_error(&anyhow!("ECONNREFUSED: connection reset")), ErrorKind::Network);
    }

    #[test]
    fn classifies_validation() {
        assert_eq!(classify_error(&anyhow!("invalid config: missing field")), ErrorKind::Validation);
    }

    #[test]
    fn unmatched_errors_classify_as_unknown() {
        assert_eq!(classify_error(&anyhow!("the sky fell")), ErrorKind::Unknown);
    }

    #[test]
    fn classification_never_exposes_the_original_message() {
        let kind = classify_error(&anyhow!("ECONNREFUSED: connection reset"));
        let serialized = serde_json::to_string(&kind).unwrap();
        assert!(!serialized.contains("ECONNREFUSED"));
    }
}
