use async_trait::async_trait;
use sea_orm::*;
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::{
    db::{page_offset, DbPool},
    entities::inspection_batch,
    errors::ServiceError,
    inspection::{InspectionBatch, ReceivingRecord},
};

/// Persistence for finalized inspection batches. Batches are append-only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BatchStore: Send + Sync {
    async fn save(&self, batch: &InspectionBatch) -> Result<Uuid, ServiceError>;

    /// Newest first, with the total number of stored batches.
    async fn list(&self, page: u64, limit: u64) -> Result<(Vec<InspectionBatch>, u64), ServiceError>;

    async fn get(&self, id: Uuid) -> Result<Option<InspectionBatch>, ServiceError>;
}

/// `BatchStore` backed by the `inspection_batches` table.
#[derive(Clone)]
pub struct SeaOrmBatchStore {
    db_pool: Arc<DbPool>,
}

impl SeaOrmBatchStore {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BatchStore for SeaOrmBatchStore {
    #[instrument(skip(self, batch), fields(batch_id = %batch.id()))]
    async fn save(&self, batch: &InspectionBatch) -> Result<Uuid, ServiceError> {
        let row = inspection_batch::ActiveModel {
            id: Set(batch.id()),
            inspector_id: Set(batch.inspector_id().to_string()),
            crm_token: Set(batch.crm_token().map(str::to_string)),
            source_filename: Set(batch.source_filename().map(str::to_string)),
            record_count: Set(i32::try_from(batch.records().len()).unwrap_or(i32::MAX)),
            records: Set(serde_json::to_string(batch.records())?),
            created_at: Set(batch.created_at()),
        };

        let saved = row.insert(self.db_pool.as_ref()).await.map_err(|e| {
            error!("Failed to persist inspection batch: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        Ok(saved.id)
    }

    #[instrument(skip(self))]
    async fn list(&self, page: u64, limit: u64) -> Result<(Vec<InspectionBatch>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let total = inspection_batch::Entity::find().count(db).await?;

        let offset = page_offset(page, limit);
        let rows = inspection_batch::Entity::find()
            .order_by_desc(inspection_batch::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(db)
            .await?;

        let batches = rows
            .into_iter()
            .map(into_batch)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((batches, total))
    }

    #[instrument(skip(self))]
    async fn get(&self, id: Uuid) -> Result<Option<InspectionBatch>, ServiceError> {
        inspection_batch::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .map(into_batch)
            .transpose()
    }
}

fn into_batch(row: inspection_batch::Model) -> Result<InspectionBatch, ServiceError> {
    let records: Vec<ReceivingRecord> = serde_json::from_str(&row.records)?;
    Ok(InspectionBatch::restore(
        row.id,
        row.inspector_id,
        row.crm_token,
        row.source_filename,
        row.created_at,
        records,
    ))
}
