use sea_orm::{EntityTrait, PaginatorTrait, QueryOrder, QuerySelect};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    commands::suppliers::{CreateSupplierCommand, DeleteSupplierCommand, UpdateSupplierCommand},
    commands::Command,
    db::{page_offset, DbPool},
    entities::supplier,
    errors::ServiceError,
    events::EventSender,
};

/// Service for the supplier registry
#[derive(Clone)]
pub struct SupplierService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl SupplierService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_supplier(
        &self,
        command: CreateSupplierCommand,
    ) -> Result<supplier::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn update_supplier(
        &self,
        command: UpdateSupplierCommand,
    ) -> Result<supplier::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_supplier(&self, id: Uuid) -> Result<(), ServiceError> {
        DeleteSupplierCommand { id }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_supplier(&self, id: Uuid) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", id)))
    }

    /// Lists suppliers alphabetically by legal name.
    #[instrument(skip(self))]
    pub async fn list_suppliers(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<supplier::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let total = supplier::Entity::find().count(db).await?;

        let offset = page_offset(page, limit);
        let suppliers = supplier::Entity::find()
            .order_by_asc(supplier::Column::LegalName)
            .offset(offset)
            .limit(limit)
            .all(db)
            .await?;

        Ok((suppliers, total))
    }
}
