//! Input safety scans: prompt-injection rejection run before any node
//! executes, plus a standalone PII detector for callers that screen
//! prompts or responses themselves.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::model::DataMap;
use crate::error::WorkflowError;

fn injection_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"(?i)ignore\s+previous", r"(?i)\breveal\b", r"(?i)system\s+prompt"]
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// Recursively scan all string values in the input for injection patterns.
/// The run fails before any node executes if one is found.
pub fn validate_input_data(data: &DataMap) -> Result<(), WorkflowError> {
    for value in data.values() {
        check_value(value)?;
    }
    Ok(())
}

fn pii_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            ("email", r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"),
            ("ssn", r"\b\d{3}-\d{2}-\d{4}\b"),
            ("credit_card", r"\b(?:\d{4}[- ]?){3}\d{4}\b"),
            ("phone", r"\b(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b"),
        ]
        .iter()
        .filter_map(|(kind, p)| Regex::new(p).ok().map(|re| (*kind, re)))
        .collect()
    })
}

/// Detect common PII patterns (email, SSN, credit card, phone) in text.
///
/// Returns a map from PII kind to the matches found; empty when the text
/// is clean. Detection only: nothing in the engine redacts or rejects on
/// PII, this is a building block for callers that do.
pub fn detect_pii(text: &str) -> HashMap<String, Vec<String>> {
    let mut found: HashMap<String, Vec<String>> = HashMap::new();
    for (kind, pattern) in pii_patterns() {
        let matches: Vec<String> = pattern
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        if !matches.is_empty() {
            found.insert((*kind).to_string(), matches);
        }
    }
    found
}

fn check_value(value: &Value) -> Result<(), WorkflowError> {
    match value {
        Value::String(text) => {
            for pattern in injection_patterns() {
                if pattern.is_match(text) {
                    return Err(WorkflowError::InputValidation(format!(
                        "input contains potentially unsafe content matching pattern '{}'; \
                         review and sanitize input before use",
                        pattern.as_str()
                    )));
                }
            }
            Ok(())
        }
        Value::Object(map) => {
            for nested in map.values() {
                check_value(nested)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                check_value(item)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
