//! ---
//! edc_section: "02-tolerant-parsing"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Tolerant extraction of structured records from model output."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
//! Some backend responses are plain structured data; others are
//! model-generated text that buries a JSON array inside prose or markdown.
//! This module normalizes both into an ordered record sequence, or `Empty`
//! on any failure. Nothing in here returns an error to the caller: model
//! output is untrusted text, and the only acceptable degradation path is a
//! safe empty result plus a diagnostic.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

// Only the first fenced block is ever considered.
static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```json\n(.*?)\n```").expect("fenced-json pattern is valid")
});

// Greedy first-to-last bracket match, mirroring the bare-array fallback.
static BARE_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("bare-array pattern is valid"));

/// Tagged outcome of a tolerant parse.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// An ordered sequence of records was located and decoded.
    Records(Vec<Value>),
    /// No structured data could be recovered from the payload.
    Empty,
}

impl ParseOutcome {
    /// Consume the outcome, yielding the records or an empty sequence.
    #[must_use]
    pub fn into_records(self) -> Vec<Value> {
        match self {
            ParseOutcome::Records(records) => records,
            ParseOutcome::Empty => Vec::new(),
        }
    }

    /// True when no records were recovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, ParseOutcome::Empty)
    }
}

/// Normalize a backend payload into an ordered record sequence.
///
/// Fallback chain, first match wins:
/// 1. the payload is already a JSON array;
/// 2. the payload is an object whose `content` string holds a fenced
///    ```` ```json ```` block;
/// 3. the first-to-last bracketed substring of that `content` text.
///
/// Any miss or decode failure yields [`ParseOutcome::Empty`]; this function
/// never fails.
pub fn parse_records(payload: &Value) -> ParseOutcome {
    if let Some(records) = payload.as_array() {
        return ParseOutcome::Records(records.clone());
    }

    let Some(content) = payload.get("content").and_then(Value::as_str) else {
        warn!("payload is neither an array nor an object with text content");
        return ParseOutcome::Empty;
    };

    let candidate = FENCED_JSON
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .or_else(|| BARE_ARRAY.find(content).map(|m| m.as_str()));

    let Some(candidate) = candidate else {
        warn!("no structured data located in free-text content");
        return ParseOutcome::Empty;
    };

    match serde_json::from_str::<Vec<Value>>(candidate) {
        Ok(records) => ParseOutcome::Records(records),
        Err(err) => {
            // No partial recovery: a syntactically broken extract fails soft
            // as a whole.
            warn!(error = %err, "extracted text is not a valid JSON array");
            ParseOutcome::Empty
        }
    }
}

/// Tolerantly parse a payload into typed records.
///
/// Shares the soft-failure policy of [`parse_records`]: a record sequence
/// that does not decode into `T` degrades to an empty vec with a diagnostic.
pub fn parse_typed<T: DeserializeOwned>(payload: &Value) -> Vec<T> {
    match parse_records(payload) {
        ParseOutcome::Empty => Vec::new(),
        ParseOutcome::Records(records) => {
            match serde_json::from_value::<Vec<T>>(Value::Array(records)) {
                Ok(typed) => typed,
                Err(err) => {
                    warn!(error = %err, "records did not match the expected shape");
                    Vec::new()
                }
            }
        }
    }
}
