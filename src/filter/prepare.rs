//! Literal rewriting applied to comparison operands just before the
//! operator is emitted.
//!
//! Encoding and observation types are stored as integer codes and times as
//! UTC timestamps, so the literal on one side of a comparison is rewritten
//! based on the property named on the other side.

use crate::model::codes::{EncodingType, ObservationType};
use crate::model::time::normalize_timestamp;

/// Strips one pair of surrounding single quotes.
pub fn unquote(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

/// Rewrites `value` when `property` is one of the coded or timestamp
/// properties. Returns `None` when no rewrite applies.
pub fn prepare_operand(property: &str, value: &str) -> Option<String> {
    let literal = unquote(value.trim());
    match property.to_ascii_lowercase().as_str() {
        "encodingtype" => EncodingType::from_value(literal).map(|e| e.code().to_string()),
        "observationtype" => ObservationType::from_uri(literal).map(|t| t.code().to_string()),
        "phenomenontime" | "resulttime" | "time" => {
            normalize_timestamp(literal).map(|ts| format!("'{ts}'"))
        }
        _ => None,
    }
}

/// Two-pass rewrite of a compiled comparison.
///
/// `left_source` and `right_source` are the operands' original token texts.
/// The first pass treats the left operand as the property and rewrites the
/// right; the second swaps roles. The first pass that rewrites wins.
pub fn prepare_filter(
    left_source: &str,
    left: String,
    right_source: &str,
    right: String,
) -> (String, String) {
    if let Some(rewritten) = prepare_operand(left_source, &right) {
        return (left, rewritten);
    }
    if let Some(rewritten) = prepare_operand(right_source, &left) {
        return (rewritten, right);
    }
    (left, right)
}
