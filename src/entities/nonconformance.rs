use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Supplier nonconformance report (INC).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nonconformances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Occurrence number ("OC"), sequential from 1
    #[sea_orm(unique)]
    pub sequence_number: i64,
    pub invoice_number: i64,
    pub report_date: NaiveDate,
    pub representative: String,
    pub supplier: String,
    pub item: String,
    pub quantity_received: f64,
    pub quantity_defective: f64,
    #[sea_orm(column_type = "Text")]
    pub defect_description: String,
    pub urgency: Urgency,
    #[sea_orm(column_type = "Text")]
    pub recommended_action: String,
    /// JSON array of stored photo paths
    #[sea_orm(column_type = "Text")]
    pub photos: String,
    pub status: IncStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn photo_paths(&self) -> Vec<String> {
        decode_photos(&self.photos)
    }

    pub fn expiration_date(&self) -> NaiveDate {
        self.report_date + chrono::Duration::days(self.urgency.response_days())
    }
}

pub fn encode_photos(paths: &[String]) -> String {
    serde_json::to_string(paths).unwrap_or_else(|_| "[]".to_string())
}

/// Lenient read: a corrupt column reads as no photos.
pub fn decode_photos(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    AsRefStr,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Urgency {
    #[sea_orm(string_value = "light")]
    Light,
    #[default]
    #[sea_orm(string_value = "moderate")]
    Moderate,
    #[sea_orm(string_value = "critical")]
    Critical,
}

impl Urgency {
    /// Days the supplier has to respond before the INC counts as overdue.
    pub fn response_days(&self) -> i64 {
        match self {
            Urgency::Light => 45,
            Urgency::Moderate => 20,
            Urgency::Critical => 10,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    AsRefStr,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IncStatus {
    #[default]
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "closed")]
    Closed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}
