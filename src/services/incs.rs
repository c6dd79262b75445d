use chrono::NaiveDate;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    commands::incs::{normalize_item_code, CreateIncCommand, DeleteIncCommand, UpdateIncCommand},
    commands::Command,
    db::{page_offset, DbPool},
    entities::nonconformance::{self, encode_photos, IncStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::photo_storage::PhotoStorage,
};

/// Listing filters. Text filters match substrings, ignoring case.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct IncFilter {
    /// Exact invoice (NF-e) number
    pub invoice_number: Option<i64>,
    pub item: Option<String>,
    pub supplier: Option<String>,
    pub status: Option<IncStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct MonitorFilter {
    /// Exact supplier name
    pub supplier: Option<String>,
    /// Item code substring
    pub item: Option<String>,
    /// First report date included
    pub start_date: Option<NaiveDate>,
    /// Last report date included
    pub end_date: Option<NaiveDate>,
}

/// An INC past its response deadline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpiredInc {
    pub inc: nonconformance::Model,
    pub expiration_date: NaiveDate,
    pub days_overdue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorReport {
    pub incs: Vec<nonconformance::Model>,
    /// INC count per `YYYY-MM`, ascending by month
    pub monthly_counts: BTreeMap<String, u64>,
}

/// An uploaded photo before it is stored.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Overdue INCs as of `today`, most overdue first. An INC is overdue once
/// `today` is strictly after its expiration date.
pub fn expiration_report(incs: Vec<nonconformance::Model>, today: NaiveDate) -> Vec<ExpiredInc> {
    let mut expired: Vec<ExpiredInc> = incs
        .into_iter()
        .filter_map(|inc| {
            let expiration_date = inc.expiration_date();
            let days_overdue = (today - expiration_date).num_days();
            (days_overdue > 0).then_some(ExpiredInc {
                inc,
                expiration_date,
                days_overdue,
            })
        })
        .collect();
    expired.sort_by(|a, b| {
        b.days_overdue
            .cmp(&a.days_overdue)
            .then(a.inc.sequence_number.cmp(&b.inc.sequence_number))
    });
    expired
}

pub fn monthly_counts(incs: &[nonconformance::Model]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for inc in incs {
        *counts
            .entry(inc.report_date.format("%Y-%m").to_string())
            .or_insert(0) += 1;
    }
    counts
}

/// Service for supplier nonconformance reports (INCs)
#[derive(Clone)]
pub struct IncService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    photos: PhotoStorage,
}

impl IncService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, photos: PhotoStorage) -> Self {
        Self {
            db_pool,
            event_sender,
            photos,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_inc(
        &self,
        command: CreateIncCommand,
    ) -> Result<nonconformance::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_inc(&self, id: Uuid) -> Result<nonconformance::Model, ServiceError> {
        nonconformance::Entity::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("INC {} not found", id)))
    }

    /// Lists INCs newest first.
    #[instrument(skip(self))]
    pub async fn list_incs(
        &self,
        filter: &IncFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<nonconformance::Model>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let mut query = nonconformance::Entity::find();

        if let Some(invoice_number) = filter.invoice_number {
            query = query.filter(nonconformance::Column::InvoiceNumber.eq(invoice_number));
        }
        if let Some(item) = non_blank(&filter.item) {
            query = query.filter(nonconformance::Column::Item.contains(normalize_item_code(item)));
        }
        if let Some(supplier) = non_blank(&filter.supplier) {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(nonconformance::Column::Supplier)))
                    .like(format!("%{}%", supplier.to_lowercase())),
            );
        }
        if let Some(status) = filter.status {
            query = query.filter(nonconformance::Column::Status.eq(status));
        }

        let total = query.clone().count(db).await?;
        let offset = page_offset(page, limit);
        let incs = query
            .order_by_desc(nonconformance::Column::SequenceNumber)
            .offset(offset)
            .limit(limit)
            .all(db)
            .await?;

        Ok((incs, total))
    }

    #[instrument(skip(self))]
    pub async fn update_inc(
        &self,
        command: UpdateIncCommand,
    ) -> Result<nonconformance::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Deletes the INC and then its photo files.
    #[instrument(skip(self))]
    pub async fn delete_inc(&self, id: Uuid) -> Result<(), ServiceError> {
        let removed = DeleteIncCommand { id }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;

        for path in removed.photo_paths() {
            if let Err(e) = self.photos.remove(&path).await {
                warn!(inc_id = %id, path = %path, error = %e, "Photo file left behind");
            }
        }
        Ok(())
    }

    /// Stores the accepted images and appends them to the INC. Files with
    /// other extensions are skipped.
    #[instrument(skip(self, uploads), fields(uploads = uploads.len()))]
    pub async fn add_photos(
        &self,
        id: Uuid,
        uploads: Vec<PhotoUpload>,
    ) -> Result<nonconformance::Model, ServiceError> {
        let inc = self.get_inc(id).await?;
        let mut paths = inc.photo_paths();

        let mut added = 0usize;
        for upload in &uploads {
            if let Some(path) = self.photos.store(&upload.filename, &upload.bytes).await? {
                paths.push(path);
                added += 1;
            }
        }
        if added == 0 {
            return Ok(inc);
        }

        let updated = self.save_photos(inc, &paths).await?;
        info!(inc_id = %id, added, "Photos attached");
        Ok(updated)
    }

    /// Detaches `path` from the INC and deletes the stored file.
    #[instrument(skip(self))]
    pub async fn remove_photo(
        &self,
        id: Uuid,
        path: &str,
    ) -> Result<nonconformance::Model, ServiceError> {
        let inc = self.get_inc(id).await?;
        let mut paths = inc.photo_paths();
        let Some(position) = paths.iter().position(|p| p == path) else {
            return Err(ServiceError::NotFound(format!(
                "Photo {} is not attached to INC {}",
                path, id
            )));
        };
        paths.remove(position);

        let updated = self.save_photos(inc, &paths).await?;
        if !self.photos.remove(path).await? {
            warn!(inc_id = %id, path = %path, "Photo detached but no file was deleted");
        }
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn expired(&self, today: NaiveDate) -> Result<Vec<ExpiredInc>, ServiceError> {
        let incs = nonconformance::Entity::find()
            .all(self.db_pool.as_ref())
            .await?;
        Ok(expiration_report(incs, today))
    }

    #[instrument(skip(self))]
    pub async fn monitor(&self, filter: &MonitorFilter) -> Result<MonitorReport, ServiceError> {
        let mut query = nonconformance::Entity::find();
        if let Some(supplier) = non_blank(&filter.supplier) {
            query = query.filter(nonconformance::Column::Supplier.eq(supplier.trim()));
        }
        if let Some(item) = non_blank(&filter.item) {
            query = query.filter(nonconformance::Column::Item.contains(normalize_item_code(item)));
        }
        if let Some(start) = filter.start_date {
            query = query.filter(nonconformance::Column::ReportDate.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(nonconformance::Column::ReportDate.lte(end));
        }

        let incs = query
            .order_by_asc(nonconformance::Column::ReportDate)
            .order_by_asc(nonconformance::Column::SequenceNumber)
            .all(self.db_pool.as_ref())
            .await?;
        let monthly_counts = monthly_counts(&incs);
        Ok(MonitorReport {
            incs,
            monthly_counts,
        })
    }

    async fn save_photos(
        &self,
        inc: nonconformance::Model,
        paths: &[String],
    ) -> Result<nonconformance::Model, ServiceError> {
        let id = inc.id;
        let mut active: nonconformance::ActiveModel = inc.into();
        active.photos = Set(encode_photos(paths));
        let updated = active.update(self.db_pool.as_ref()).await?;

        self.event_sender
            .send(Event::IncPhotosChanged(id))
            .await
            .map_err(ServiceError::EventError)?;
        Ok(updated)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
