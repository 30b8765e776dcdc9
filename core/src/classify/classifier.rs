use std::sync::OnceLock;

use regex::Regex;

use crate::runner::AttemptOutcome;
use crate::util::tail_chars;

use super::ErrorType;

/// Only the tail of the captured output is scanned.
pub const MAX_CLASSIFY_CHARS: usize = 100_000;

const MARKER_PREFIX: &str = "ERROR_TYPE=";

struct Heuristics {
    validation: Vec<Regex>,
    empty_result: Vec<Regex>,
    network: Vec<Regex>,
    parse: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

fn heuristics() -> &'static Heuristics {
    static HEURISTICS: OnceLock<Heuristics> = OnceLock::new();
    HEURISTICS.get_or_init(|| Heuristics {
        validation: compile(&[
            r"(?i)\bvalidation\s+(?:failed|error)",
            r"\bValidationError\b",
            r"(?i)\bschema\s+(?:mismatch|violation)",
            r"(?i)\binvalid\s+(?:record|event|data)\b",
            r"(?i)\bassertion\s*(?:error|failed)",
        ]),
        empty_result: compile(&[
            r"(?i)\b(?:0|zero|no)\s+(?:events|results|records|items|entries)\b",
            r"(?i)\bempty\s+(?:result|response|list|dataset)\b",
            r"(?i)\bnothing\s+(?:found|scraped|to\s+write)\b",
        ]),
        network: compile(&[
            r"\b(?:ECONNRESET|ECONNREFUSED|ETIMEDOUT|ENOTFOUND|EAI_AGAIN|EHOSTUNREACH)\b",
            r"(?i)\bHTTP\s*(?:error\s*|status\s*)?[:=]?\s*(?:429|5\d\d|408|403)\b",
            r"(?i)\bstatus(?:\s+code)?\s*[:=]?\s*(?:429|5\d\d)\b",
            r"(?i)\btimed?\s*-?out\b",
            r"(?i)\bconnection\s+(?:refused|reset|closed|aborted|error)",
            r"(?i)\bsocket\s+hang\s+up\b",
            r"(?i)\bnetwork\s+(?:error|unreachable)",
            r"(?i)\bfetch\s+failed\b",
            r"(?i)\bgetaddrinfo\b",
            r"(?i)\btemporary\s+failure\s+in\s+name\s+resolution\b",
        ]),
        parse: compile(&[
            r"\bSyntaxError\b",
            r"\bUnicodeDecodeError\b",
            r"(?i)\bunexpected\s+(?:token|end\s+of\s+(?:json|input))",
            r"(?i)\b(?:failed|unable)\s+to\s+(?:parse|decode)\b",
            r"(?i)\bcould\s+not\s+(?:parse|decode)\b",
            r"(?i)\b(?:parse|parsing|decode)\s+error\b",
            r"(?i)\binvalid\s+(?:json|html|xml)\b",
            r"(?i)\bmalformed\b",
        ]),
    })
}

/// Last well-formed `ERROR_TYPE=<NAME>` line, if any. Unknown names are ignored.
pub fn parse_marker(text: &str) -> Option<ErrorType> {
    text.lines().rev().find_map(|line| {
        line.trim()
            .strip_prefix(MARKER_PREFIX)
            .and_then(|name| name.parse::<ErrorType>().ok())
    })
}

/// Maps one failed attempt to an [`ErrorType`].
///
/// A timeout is always `Network` and a spawn failure always `Unknown`.
/// Otherwise: an exit code from the table wins, then the marker line, then
/// free-text heuristics over the tail of stdout+stderr.
pub fn classify(outcome: &AttemptOutcome) -> ErrorType {
    if outcome.timed_out {
        return ErrorType::Network;
    }
    if outcome.spawn_error.is_some() {
        return ErrorType::Unknown;
    }
    if let Some(t) = outcome.exit_code.and_then(ErrorType::known_exit_code) {
        return t;
    }

    let joined = outcome.diagnostics();
    let text = tail_chars(&joined, MAX_CLASSIFY_CHARS);
    if let Some(t) = parse_marker(text) {
        return t;
    }
    classify_text(text)
}

fn classify_text(text: &str) -> ErrorType {
    let h = heuristics();
    let hit = |set: &[Regex]| set.iter().any(|re| re.is_match(text));

    if hit(&h.validation) {
        ErrorType::Validation
    } else if hit(&h.empty_result) {
        ErrorType::EmptyResult
    } else if hit(&h.network) {
        ErrorType::Network
    } else if hit(&h.parse) {
        ErrorType::Parse
    } else {
        ErrorType::Unknown
    }
}
