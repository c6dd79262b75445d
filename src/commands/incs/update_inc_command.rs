use async_trait::async_trait;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{check_quantities, normalize_item_code, validate_item_code};
use crate::{
    commands::Command,
    db::DbPool,
    entities::nonconformance::{self, IncStatus, Urgency},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Partial update of an INC. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateIncCommand {
    #[serde(skip)]
    pub id: Uuid,
    #[validate(range(min = 1))]
    pub invoice_number: Option<i64>,
    #[validate(length(min = 1, max = 120))]
    pub representative: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub supplier: Option<String>,
    #[validate(custom = "validate_item_code")]
    pub item: Option<String>,
    #[validate(range(min = 0.0))]
    pub quantity_received: Option<f64>,
    #[validate(range(min = 0.0))]
    pub quantity_defective: Option<f64>,
    #[validate(length(min = 1))]
    pub defect_description: Option<String>,
    pub urgency: Option<Urgency>,
    pub recommended_action: Option<String>,
    pub status: Option<IncStatus>,
}

#[async_trait]
impl Command for UpdateIncCommand {
    type Result = nonconformance::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(inc_id = %self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = db_pool.as_ref();
        let existing = nonconformance::Entity::find_by_id(self.id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("INC {} not found", self.id)))?;

        let received = self.quantity_received.unwrap_or(existing.quantity_received);
        let defective = self
            .quantity_defective
            .unwrap_or(existing.quantity_defective);
        check_quantities(received, defective).map_err(|e| {
            ServiceError::ValidationError(
                e.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            )
        })?;

        let mut inc: nonconformance::ActiveModel = existing.into();
        if let Some(invoice_number) = self.invoice_number {
            inc.invoice_number = Set(invoice_number);
        }
        if let Some(representative) = &self.representative {
            inc.representative = Set(representative.trim().to_string());
        }
        if let Some(supplier) = &self.supplier {
            inc.supplier = Set(supplier.trim().to_string());
        }
        if let Some(item) = &self.item {
            inc.item = Set(normalize_item_code(item));
        }
        if let Some(description) = &self.defect_description {
            inc.defect_description = Set(description.clone());
        }
        if let Some(urgency) = self.urgency {
            inc.urgency = Set(urgency);
        }
        if let Some(action) = &self.recommended_action {
            inc.recommended_action = Set(action.clone());
        }
        if let Some(status) = self.status {
            inc.status = Set(status);
        }
        inc.quantity_received = Set(received);
        inc.quantity_defective = Set(defective);

        let updated = inc.update(db).await.map_err(|e| {
            error!("Failed to update nonconformance {}: {}", self.id, e);
            ServiceError::DatabaseError(e)
        })?;

        info!(inc_id = %updated.id, status = %updated.status, "Nonconformance updated");
        event_sender
            .send(Event::IncUpdated(updated.id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_is_valid() {
        assert!(UpdateIncCommand::default().validate().is_ok());
    }

    #[test]
    fn bad_item_is_rejected() {
        let cmd = UpdateIncCommand {
            item: Some("12345".into()),
            ..Default::default()
        };
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn id_is_not_read_from_body() {
        let cmd: UpdateIncCommand = serde_json::from_value(serde_json::json!({
            "id": "5b0c3d8e-0000-0000-0000-000000000000",
            "status": "closed"
        }))
        .unwrap();
        assert_eq!(cmd.id, Uuid::nil());
        assert_eq!(cmd.status, Some(IncStatus::Closed));
    }
}
