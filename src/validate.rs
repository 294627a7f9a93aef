use serde_json::Value;

use crate::error::ValidationFailure;
use crate::types::{CandidateItem, InventoryItem};

/// Turn a candidate into an inventory item, or say why it can't be one.
///
/// Each record is judged on its own; duplicates are left for the caller.
pub fn validate(candidate: &CandidateItem) -> Result<InventoryItem, ValidationFailure> {
    let name = candidate.item_name.trim();
    if name.is_empty() {
        return Err(ValidationFailure::EmptyName);
    }

    if candidate.quantity < 1 {
        return Err(ValidationFailure::QuantityTooLow(candidate.quantity));
    }
    let quantity = u32::try_from(candidate.quantity)
        .map_err(|_| ValidationFailure::QuantityTooLarge(candidate.quantity))?;

    // The parser already clamps; anything still outside the range (or NaN)
    // came from elsewhere and is rejected.
    if !(0.0..=1.0).contains(&candidate.confidence) {
        return Err(ValidationFailure::ConfidenceOutOfRange(candidate.confidence));
    }

    let is_leftover = match candidate.is_leftover {
        Value::Bool(b) => b,
        ref other => return Err(ValidationFailure::NotBoolean(other.to_string())),
    };

    Ok(InventoryItem {
        item_name: name.to_string(),
        quantity,
        confidence: candidate.confidence,
        is_leftover,
    })
}
