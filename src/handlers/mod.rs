pub mod common;
pub mod incs;
pub mod inspection;
pub mod suppliers;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    inspection::SessionStore,
    services::{
        incs::IncService,
        inspection::InspectionService,
        inspection_batches::{BatchStore, SeaOrmBatchStore},
        photo_storage::PhotoStorage,
        suppliers::SupplierService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub inspection: Arc<InspectionService>,
    pub incs: Arc<IncService>,
    pub suppliers: Arc<SupplierService>,
}

impl AppServices {
    /// Wires every service against one pool, one event channel and the
    /// shared inspection workspaces.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        sessions: SessionStore,
        config: &AppConfig,
    ) -> Self {
        let batches: Arc<dyn BatchStore> = Arc::new(SeaOrmBatchStore::new(db_pool.clone()));
        let inspection = Arc::new(InspectionService::new(
            sessions,
            batches,
            event_sender.clone(),
        ));
        let incs = Arc::new(IncService::new(
            db_pool.clone(),
            event_sender.clone(),
            PhotoStorage::new(config.upload_path()),
        ));
        let suppliers = Arc::new(SupplierService::new(db_pool, event_sender));

        Self {
            inspection,
            incs,
            suppliers,
        }
    }
}
