//! Stock movement model: one append-only ledger entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest note a movement may carry, in characters.
pub const MAX_NOTE_LEN: usize = 200;

/// Largest magnitude of a single movement.
pub const MAX_MOVEMENT_QUANTITY: i64 = i32::MAX as i64;

/// A signed stock movement. Positive is inbound, negative is outbound.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub date: DateTime<Utc>,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Request body for recording a movement. The date is always set server-side.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovementRequest {
    pub quantity: i64,
    #[serde(default)]
    pub note: Option<String>,
}

impl CreateMovementRequest {
    /// Check field constraints and return the normalized note.
    pub fn validated_note(&self) -> Result<Option<String>, String> {
        if self.quantity == 0 {
            return Err("Quantity must not be zero".to_string());
        }
        if !(-MAX_MOVEMENT_QUANTITY..=MAX_MOVEMENT_QUANTITY).contains(&self.quantity) {
            return Err(format!(
                "Quantity must be between -{} and {}",
                MAX_MOVEMENT_QUANTITY, MAX_MOVEMENT_QUANTITY
            ));
        }
        let note = self
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        if let Some(n) = note {
            if n.chars().count() > MAX_NOTE_LEN {
                return Err(format!("Note must be at most {} characters", MAX_NOTE_LEN));
            }
        }
        Ok(note.map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(quantity: i64, note: Option<&str>) -> CreateMovementRequest {
        CreateMovementRequest {
            quantity,
            note: note.map(str::to_string),
        }
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert!(request(0, None).validated_note().is_err());
    }

    #[test]
    fn test_quantity_magnitude_is_bounded() {
        assert!(request(MAX_MOVEMENT_QUANTITY, None).validated_note().is_ok());
        assert!(request(-MAX_MOVEMENT_QUANTITY, None).validated_note().is_ok());
        assert!(request(MAX_MOVEMENT_QUANTITY + 1, None).validated_note().is_err());
        assert!(request(i64::MIN, None).validated_note().is_err());
        assert!(request(i64::MAX, None).validated_note().is_err());
    }

    #[test]
    fn test_note_is_trimmed_and_blank_dropped() {
        assert_eq!(
            request(5, Some("  restock ")).validated_note().unwrap(),
            Some("restock".to_string())
        );
        assert_eq!(request(-2, Some("   ")).validated_note().unwrap(), None);
    }

    #[test]
    fn test_note_length_limit_counts_chars() {
        let at_limit = "ñ".repeat(MAX_NOTE_LEN);
        assert!(request(1, Some(&at_limit)).validated_note().is_ok());

        let over = "x".repeat(MAX_NOTE_LEN + 1);
        assert!(request(1, Some(&over)).validated_note().is_err());
    }
}
