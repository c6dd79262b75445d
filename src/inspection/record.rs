use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Supplier placeholder used when the supplier column carries no name.
pub const UNKNOWN_SUPPLIER: &str = "UNKNOWN";

/// One received line item taken from a receiving list.
///
/// `inspected` and `deferred` are never both true; both false means the
/// record still awaits a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReceivingRecord {
    /// Entry date exactly as printed in the list
    #[schema(example = "03/03/2025")]
    pub entry_date: String,
    /// Supplier token, or `UNKNOWN`
    #[schema(example = "ACME")]
    pub supplier_raw: String,
    #[schema(example = "MPR.02199")]
    pub item_code: String,
    #[schema(example = "PARAFUSO SEXTAVADO M8")]
    pub description: String,
    /// Receiving notice ("AR") the record belongs to
    #[schema(example = 48213)]
    pub notice_number: i64,
    #[schema(example = 12.5)]
    pub quantity_received: f64,
    #[schema(example = 7731)]
    pub purchase_order: i64,
    #[serde(default)]
    pub inspected: bool,
    #[serde(default)]
    pub deferred: bool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Inspected,
    Deferred,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InspectionAction {
    Inspect,
    Defer,
}

impl ReceivingRecord {
    pub fn status(&self) -> RecordStatus {
        match (self.inspected, self.deferred) {
            (true, _) => RecordStatus::Inspected,
            (false, true) => RecordStatus::Deferred,
            (false, false) => RecordStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == RecordStatus::Pending
    }

    /// Moves the record to the terminal state named by `action`.
    pub fn apply(&mut self, action: InspectionAction) {
        match action {
            InspectionAction::Inspect => {
                self.inspected = true;
                self.deferred = false;
            }
            InspectionAction::Defer => {
                self.inspected = false;
                self.deferred = true;
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_record(notice_number: i64, purchase_order: i64) -> ReceivingRecord {
    ReceivingRecord {
        entry_date: "03/03/2025".to_string(),
        supplier_raw: "ACME".to_string(),
        item_code: "MPR.02199".to_string(),
        description: "PARAFUSO".to_string(),
        notice_number,
        quantity_received: 10.0,
        purchase_order,
        inspected: false,
        deferred: false,
    }
}
