// src/models/custody.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use validator::Validate;

// Entry type of a vehicle logged empty on arrival.
pub const ENTRY_TYPE_EMPTY_VEHICLE: &str = "Empty Vehicle";
// Entry type a record is rewritten to when that vehicle leaves loaded.
pub const ENTRY_TYPE_ITEM_EXPORT: &str = "Item Export";

/// Lifecycle of a weighing record. `Pending` has exactly two exits:
/// completion (irreversible) or deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Pending,
    Completed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "Pending",
            EntryStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown entry status '{0}'")]
pub struct ParseEntryStatusError(String);

impl TryFrom<String> for EntryStatus {
    type Error = ParseEntryStatusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Pending" => Ok(EntryStatus::Pending),
            "Completed" => Ok(EntryStatus::Completed),
            _ => Err(ParseEntryStatusError(value)),
        }
    }
}

/// A source, destination, or party a custody record can reference. Names
/// are unique across all three kinds.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub partner_type: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartnerPayload {
    #[validate(length(min = 1, message = "partner name is required"))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "partner type is required"))]
    pub partner_type: String,
}

/// One vehicle weighing event, as exposed to callers. Weights are in tons
/// here; the database stores kilograms.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InwardEntry {
    pub id: i32,
    pub vehicle_number: String,
    pub source_name: Option<String>,
    pub party_name: Option<String>,
    pub material: Option<String>,
    pub entry_type: String,
    // The entry type as recorded at the gate, kept when completion
    // reclassifies the record to an export.
    pub original_entry_type: Option<String>,
    pub gross_weight_tons: f64,
    pub tare_weight_tons: Option<f64>,
    pub net_weight_tons: Option<f64>,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInwardEntryPayload {
    #[validate(length(min = 1, message = "vehicle number is required"))]
    pub vehicle_number: String,
    pub source_id: Option<i32>,
    pub destination_id: Option<i32>,
    pub party_id: Option<i32>,
    pub material: Option<String>,
    #[validate(length(min = 1, message = "entry type is required"))]
    pub entry_type: String,
    #[validate(range(exclusive_min = 0.0, message = "gross weight must be positive"))]
    pub gross_weight_tons: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteInwardEntryPayload {
    #[validate(range(exclusive_min = 0.0, message = "tare weight must be positive"))]
    pub tare_weight_tons: f64,
    // A non-empty material on an 'Empty Vehicle' entry turns the completion
    // into an export.
    pub material: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SortedMaterialEntry {
    #[validate(length(min = 1, message = "material is required"))]
    pub material: String,
    #[validate(range(exclusive_min = 0.0, message = "quantity must be positive"))]
    pub quantity_tons: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSortingLogPayload {
    pub log_date: NaiveDate,
    #[validate(length(min = 1, message = "at least one entry is required"), nested)]
    pub entries: Vec<SortedMaterialEntry>,
}

/// A day's sorting log for one user, with its accumulated per-material
/// quantities.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortingLog {
    pub id: i32,
    pub log_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<SortedMaterialEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        assert_eq!(
            EntryStatus::try_from("Pending".to_string()).unwrap(),
            EntryStatus::Pending
        );
        assert_eq!(EntryStatus::Completed.as_str(), "Completed");
        assert!(EntryStatus::try_from("Cancelled".to_string()).is_err());
    }

    #[test]
    fn open_payload_rejects_missing_fields() {
        let payload = CreateInwardEntryPayload {
            vehicle_number: "".into(),
            source_id: None,
            destination_id: None,
            party_id: None,
            material: None,
            entry_type: "".into(),
            gross_weight_tons: 0.0,
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("vehicle_number"));
        assert!(errors.field_errors().contains_key("entry_type"));
        assert!(errors.field_errors().contains_key("gross_weight_tons"));
    }

    #[test]
    fn open_payload_accepts_a_valid_entry() {
        let payload = CreateInwardEntryPayload {
            vehicle_number: "MH12AB1234".into(),
            source_id: Some(3),
            destination_id: None,
            party_id: None,
            material: Some("mixed waste".into()),
            entry_type: "Material Inward".into(),
            gross_weight_tons: 12.5,
        };
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn partner_payload_requires_name_and_type() {
        let payload = CreatePartnerPayload {
            name: "".into(),
            partner_type: "".into(),
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
        assert!(errors.field_errors().contains_key("partner_type"));
    }

    #[test]
    fn sorting_payload_requires_entries() {
        let payload = CreateSortingLogPayload {
            log_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            entries: vec![],
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn sorting_payload_validates_nested_entries() {
        let payload = CreateSortingLogPayload {
            log_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            entries: vec![SortedMaterialEntry {
                material: "paper".into(),
                quantity_tons: -1.0,
            }],
        };
        assert!(payload.validate().is_err());
    }
}
