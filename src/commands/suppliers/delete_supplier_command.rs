use async_trait::async_trait;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    commands::Command,
    db::DbPool,
    entities::supplier,
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteSupplierCommand {
    pub id: Uuid,
}

#[async_trait]
impl Command for DeleteSupplierCommand {
    type Result = ();

    #[instrument(skip(self, db_pool, event_sender), fields(supplier_id = %self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();

        let res = supplier::Entity::delete_by_id(self.id)
            .exec(db)
            .await
            .map_err(|e| {
                error!("Failed to delete supplier {}: {}", self.id, e);
                ServiceError::DatabaseError(e)
            })?;

        if res.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Supplier {} not found",
                self.id
            )));
        }

        info!(supplier_id = %self.id, "Supplier deleted");
        event_sender
            .send(Event::SupplierDeleted(self.id))
            .await
            .map_err(ServiceError::EventError)
    }
}
