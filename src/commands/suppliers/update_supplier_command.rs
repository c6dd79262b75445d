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

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplierCommand {
    #[serde(skip)]
    pub id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub legal_name: Option<String>,
    #[validate(regex = "CNPJ_PATTERN")]
    pub cnpj: Option<String>,
    #[validate(length(min = 1, max = 40))]
    pub erp_code: Option<String>,
}

#[async_trait]
impl Command for UpdateSupplierCommand {
    type Result = supplier::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(supplier_id = %self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let db = db_pool.as_ref();
        let existing = supplier::Entity::find_by_id(self.id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", self.id)))?;

        let mut supplier: supplier::ActiveModel = existing.into();
        if let Some(cnpj) = &self.cnpj {
            let cnpj = cnpj.trim().to_string();
            ensure_cnpj_available(db, &cnpj, Some(self.id)).await?;
            supplier.cnpj = Set(cnpj);
        }
        if let Some(legal_name) = &self.legal_name {
            supplier.legal_name = Set(legal_name.trim().to_string());
        }
        if let Some(erp_code) = &self.erp_code {
            supplier.erp_code = Set(erp_code.trim().to_string());
        }

        let updated = supplier.update(db).await.map_err(|e| {
            error!("Failed to update supplier {}: {}", self.id, e);
            ServiceError::DatabaseError(e)
        })?;

        info!(supplier_id = %updated.id, "Supplier updated");
        event_sender
            .send(Event::SupplierUpdated(updated.id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(updated)
    }
}
