use async_trait::async_trait;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    commands::Command,
    db::DbPool,
    entities::nonconformance,
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteIncCommand {
    pub id: Uuid,
}

#[async_trait]
impl Command for DeleteIncCommand {
    /// The removed row, so callers can clean up its photo files.
    type Result = nonconformance::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(inc_id = %self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let db = db_pool.as_ref();

        let existing = nonconformance::Entity::find_by_id(self.id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("INC {} not found", self.id)))?;

        nonconformance::Entity::delete_by_id(self.id)
            .exec(db)
            .await
            .map_err(|e| {
                error!("Failed to delete nonconformance {}: {}", self.id, e);
                ServiceError::DatabaseError(e)
            })?;

        info!(inc_id = %self.id, "Nonconformance deleted");
        event_sender
            .send(Event::IncDeleted(self.id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(existing)
    }
}
