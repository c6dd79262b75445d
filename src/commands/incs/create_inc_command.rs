use async_trait::async_trait;
use chrono::Utc;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{check_quantities, normalize_item_code, validate_item_code};
use crate::{
    commands::Command,
    db::DbPool,
    entities::nonconformance::{self, encode_photos, IncStatus, Urgency},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Opens a new nonconformance report against a supplier delivery.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_quantities"))]
pub struct CreateIncCommand {
    /// Invoice (NF-e) number of the delivery
    #[validate(range(min = 1))]
    pub invoice_number: i64,
    #[validate(length(min = 1, max = 120))]
    pub representative: String,
    #[validate(length(min = 1, max = 200))]
    pub supplier: String,
    /// Item code, `AAA.00000`
    #[validate(custom = "validate_item_code")]
    pub item: String,
    #[validate(range(min = 0.0))]
    pub quantity_received: f64,
    #[validate(range(min = 0.0))]
    pub quantity_defective: f64,
    #[validate(length(min = 1))]
    pub defect_description: String,
    #[serde(default)]
    pub urgency: Option<Urgency>,
    #[serde(default)]
    pub recommended_action: String,
}

fn validate_create_quantities(command: &CreateIncCommand) -> Result<(), ValidationError> {
    check_quantities(command.quantity_received, command.quantity_defective)
}

#[async_trait]
impl Command for CreateIncCommand {
    type Result = nonconformance::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(invoice_number = self.invoice_number))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = db_pool.as_ref();
        let sequence_number = next_sequence_number(db).await?;

        let inc = nonconformance::ActiveModel {
            id: Set(Uuid::new_v4()),
            sequence_number: Set(sequence_number),
            invoice_number: Set(self.invoice_number),
            report_date: Set(Utc::now().date_naive()),
            representative: Set(self.representative.trim().to_string()),
            supplier: Set(self.supplier.trim().to_string()),
            item: Set(normalize_item_code(&self.item)),
            quantity_received: Set(self.quantity_received),
            quantity_defective: Set(self.quantity_defective),
            defect_description: Set(self.defect_description.clone()),
            urgency: Set(self.urgency.unwrap_or_default()),
            recommended_action: Set(self.recommended_action.clone()),
            photos: Set(encode_photos(&[])),
            status: Set(IncStatus::InProgress),
            ..Default::default()
        };

        let saved = inc.insert(db).await.map_err(|e| {
            error!("Failed to insert nonconformance: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(
            inc_id = %saved.id,
            sequence_number = saved.sequence_number,
            "Nonconformance created"
        );
        event_sender
            .send(Event::IncCreated {
                id: saved.id,
                sequence_number: saved.sequence_number,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(saved)
    }
}

/// Next occurrence number: highest assigned plus one, starting at 1.
async fn next_sequence_number(db: &DatabaseConnection) -> Result<i64, ServiceError> {
    let last = nonconformance::Entity::find()
        .order_by_desc(nonconformance::Column::SequenceNumber)
        .one(db)
        .await
        .map_err(ServiceError::DatabaseError)?;
    Ok(last.map_or(1, |inc| inc.sequence_number + 1))
}
