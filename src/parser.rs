use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ParseError;
use crate::types::CandidateItem;

/// What the parser managed to pull out of a provider reply.
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    pub candidates: Vec<CandidateItem>,
    pub warnings: Vec<String>,
    /// Number of entries in the JSON array, including skipped ones.
    pub total_entries: usize,
}

/// Extract candidate item records from raw model output.
///
/// The first balanced JSON array in the text is used; anything around it
/// (prose, code fences) is ignored. Malformed entries are skipped with a
/// warning instead of failing the whole parse.
pub fn parse(raw_text: &str) -> Result<ParsedResponse, ParseError> {
    let entries = extract_json_array(raw_text).ok_or(ParseError::Malformed)?;

    let mut parsed = ParsedResponse {
        total_entries: entries.len(),
        ..Default::default()
    };

    for (idx, entry) in entries.iter().enumerate() {
        let entry = match entry {
            Ok(value) => value,
            Err(e) => {
                parsed
                    .warnings
                    .push(format!("entry {idx} skipped: invalid JSON ({e})"));
                continue;
            }
        };
        let Some(obj) = entry.as_object() else {
            parsed
                .warnings
                .push(format!("entry {idx} skipped: not an object"));
            continue;
        };
        match candidate_from_object(obj) {
            Ok((candidate, clamp_warning)) => {
                if let Some(w) = clamp_warning {
                    parsed.warnings.push(format!("entry {idx}: {w}"));
                }
                parsed.candidates.push(candidate);
            }
            Err(reason) => parsed
                .warnings
                .push(format!("entry {idx} skipped: {reason}")),
        }
    }

    debug!(
        entries = parsed.total_entries,
        candidates = parsed.candidates.len(),
        "parsed provider response"
    );

    Ok(parsed)
}

/// Upper bound on `[` positions tried as the start of the array. Each try
/// may scan to the end of the text, so this keeps extraction linear.
const MAX_ARRAY_STARTS: usize = 64;

/// Find the first balanced `[...]` slice of `text` that holds a JSON array.
///
/// A slice that parses whole yields all its elements. Otherwise it is split
/// on top-level commas and each element is parsed on its own, so one bad
/// entry (say, a number serde_json rejects) doesn't sink the rest. A slice
/// where no element parses to an object is not treated as the array.
pub fn extract_json_array(text: &str) -> Option<Vec<Result<Value, serde_json::Error>>> {
    let bytes = text.as_bytes();
    let mut start = 0;
    for _ in 0..MAX_ARRAY_STARTS {
        let open = start + text[start..].find('[')?;
        if let Some(close) = matching_bracket(bytes, open) {
            let slice = &text[open..=close];
            if let Ok(Value::Array(items)) = serde_json::from_str(slice) {
                return Some(items.into_iter().map(Ok).collect());
            }
            let entries: Vec<_> = split_elements(slice)
                .into_iter()
                .map(serde_json::from_str::<Value>)
                .collect();
            if entries.iter().any(|e| matches!(e, Ok(Value::Object(_)))) {
                return Some(entries);
            }
        }
        start = open + 1;
    }
    None
}

/// Index of the `]` closing the `[` at `open`, skipping over string literals.
fn matching_bracket(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return (b == b']').then_some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Top-level elements of a balanced `[...]` slice, split on commas that sit
/// outside nested brackets and strings.
fn split_elements(slice: &str) -> Vec<&str> {
    let inner = &slice[1..slice.len() - 1];
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let mut elements = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut from = 0;

    for (i, b) in inner.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' | b'{' => depth += 1,
            b']' | b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                elements.push(inner[from..i].trim());
                from = i + 1;
            }
            _ => {}
        }
    }
    elements.push(inner[from..].trim());
    elements
}

fn candidate_from_object(
    obj: &Map<String, Value>,
) -> Result<(CandidateItem, Option<String>), String> {
    let item_name = match obj.get("item_name") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => return Err(format!("item_name is not a string: {other}")),
        None => return Err("missing item_name".into()),
    };

    let quantity = match obj.get("quantity") {
        Some(v) => as_integer(v).ok_or_else(|| format!("quantity is not a number: {v}"))?,
        None => return Err("missing quantity".into()),
    };

    let raw_confidence = match obj.get("confidence") {
        Some(v) => as_float(v).ok_or_else(|| format!("confidence is not a number: {v}"))?,
        None => return Err("missing confidence".into()),
    };

    let is_leftover = obj
        .get("is_leftover")
        .cloned()
        .ok_or_else(|| "missing is_leftover".to_string())?;

    let confidence = raw_confidence.clamp(0.0, 1.0);
    let clamp_warning = (confidence != raw_confidence).then(|| {
        format!("confidence {raw_confidence} clamped to {confidence} for '{item_name}'")
    });

    Ok((
        CandidateItem {
            item_name,
            quantity,
            confidence,
            is_leftover,
        },
        clamp_warning,
    ))
}

/// Integers pass through, floats are truncated, numeric strings are parsed.
/// Values outside the `i64` range are not numbers we can count with.
fn as_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

fn truncate(f: f64) -> Option<i64> {
    let t = f.trunc();
    // i64::MAX as f64 rounds up to 2^63, hence the exclusive bound.
    (t >= i64::MIN as f64 && t < i64::MAX as f64).then_some(t as i64)
}

fn as_float(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}
