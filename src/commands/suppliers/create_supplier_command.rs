use async_trait::async_trait;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{ensure_cnpj_available, CNPJ_PATTERN};
use crate::{
    commands::Command,
    db::DbPool,
    entities::supplier,
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierCommand {
    /// Registered company name (razão social)
    #[validate(length(min = 1, max = 200))]
    pub legal_name: String,
    #[validate(regex = "CNPJ_PATTERN")]
    #[schema(example = "12.345.678/0001-95")]
    pub cnpj: String,
    /// Supplier code in the ERP
    #[validate(length(min = 1, max = 40))]
    pub erp_code: String,
}

#[async_trait]
impl Command for CreateSupplierCommand {
    type Result = supplier::Model;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = db_pool.as_ref();
        let cnpj = self.cnpj.trim().to_string();
        ensure_cnpj_available(db, &cnpj, None).await?;

        let supplier = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            legal_name: Set(self.legal_name.trim().to_string()),
            cnpj: Set(cnpj),
            erp_code: Set(self.erp_code.trim().to_string()),
            ..Default::default()
        };

        let saved = supplier.insert(db).await.map_err(|e| {
            error!("Failed to insert supplier: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(supplier_id = %saved.id, "Supplier created");
        event_sender
            .send(Event::SupplierCreated(saved.id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(saved)
    }
}
