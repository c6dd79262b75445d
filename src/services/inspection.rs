use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    inspection::{
        extract_with_report, parse_crm_token, ExtractionReport, InspectionAction,
        InspectionBatch, InspectionSession, MarkOutcome, NoticeGroup, SessionProgress,
        SessionStore,
    },
    services::inspection_batches::BatchStore,
};

/// Grouped view of an inspector's running session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionView {
    pub source_filename: String,
    pub started_at: DateTime<Utc>,
    pub crm_token: Option<String>,
    pub progress: SessionProgress,
    pub groups: Vec<NoticeGroup>,
}

impl From<&InspectionSession> for SessionView {
    fn from(session: &InspectionSession) -> Self {
        Self {
            source_filename: session.source_filename.clone(),
            started_at: session.started_at,
            crm_token: session.crm_token.clone(),
            progress: session.progress(),
            groups: session.group_by_notice(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImportSummary {
    pub filename: String,
    pub notices: usize,
    pub report: ExtractionReport,
}

/// Rejects anything that is not a named `.lst` file.
pub fn validate_lst_filename(filename: &str) -> Result<(), ServiceError> {
    let name = filename.trim();
    if name.is_empty() {
        return Err(ServiceError::BadRequest("No file selected".to_string()));
    }
    if !name.to_ascii_lowercase().ends_with(".lst") {
        return Err(ServiceError::ValidationError(
            "Only .lst receiving lists are accepted".to_string(),
        ));
    }
    Ok(())
}

/// Drives the receiving inspection workflow for every inspector.
#[derive(Clone)]
pub struct InspectionService {
    sessions: SessionStore,
    batches: Arc<dyn BatchStore>,
    event_sender: Arc<EventSender>,
}

impl InspectionService {
    pub fn new(
        sessions: SessionStore,
        batches: Arc<dyn BatchStore>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            sessions,
            batches,
            event_sender,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Records the CRM token found in `link` for `inspector_id`.
    #[instrument(skip(self, link))]
    pub async fn set_crm_token(&self, inspector_id: &str, link: &str) -> Result<String, ServiceError> {
        let token = parse_crm_token(link).ok_or_else(|| {
            ServiceError::ValidationError("Link does not carry a valid CRM token".to_string())
        })?;

        self.sessions.set_crm_token(inspector_id, token.clone());
        info!("CRM token registered");

        self.publish(Event::CrmTokenSet {
            inspector_id: inspector_id.to_string(),
        })
        .await;
        Ok(token)
    }

    /// Parses an uploaded receiving list and starts a fresh session with it.
    ///
    /// Nothing changes for the inspector unless at least one record was read.
    #[instrument(skip(self, contents), fields(bytes = contents.len()))]
    pub async fn import(
        &self,
        inspector_id: &str,
        filename: &str,
        contents: &[u8],
    ) -> Result<ImportSummary, ServiceError> {
        let crm_token = self.sessions.crm_token(inspector_id).ok_or_else(|| {
            ServiceError::BadRequest("Set the CRM token before importing a file".to_string())
        })?;
        validate_lst_filename(filename)?;

        let started = Instant::now();
        let (records, report) = extract_with_report(contents);
        histogram!("inc_manager.inspection.extract_seconds", started.elapsed());

        info!(
            encoding = %report.encoding,
            lines = report.lines_seen,
            records = report.records,
            skipped = report.skipped_total(),
            "Receiving list parsed"
        );

        if records.is_empty() {
            counter!("inc_manager.inspection.imports_rejected", 1);
            return Err(ServiceError::ValidationError(
                "no valid records imported".to_string(),
            ));
        }

        let session = InspectionSession::begin(records, Some(crm_token), filename.trim());
        let summary = ImportSummary {
            filename: session.source_filename.clone(),
            notices: session.group_by_notice().len(),
            report,
        };
        self.sessions.replace(inspector_id, session);
        counter!("inc_manager.inspection.imports", 1);

        self.publish(Event::InspectionImported {
            inspector_id: inspector_id.to_string(),
            filename: summary.filename.clone(),
            records: summary.report.records,
        })
        .await;

        Ok(summary)
    }

    pub fn view(&self, inspector_id: &str) -> Result<SessionView, ServiceError> {
        self.sessions
            .get(inspector_id)
            .map(|session| SessionView::from(&session))
            .ok_or_else(no_session)
    }

    #[instrument(skip(self))]
    pub fn mark(
        &self,
        inspector_id: &str,
        notice_number: i64,
        position: usize,
        action: InspectionAction,
    ) -> Result<MarkOutcome, ServiceError> {
        let outcome = self
            .sessions
            .update(inspector_id, |session| {
                session.mark(notice_number, position, action)
            })
            .ok_or_else(no_session)?;

        if !outcome.applied() {
            warn!("Mark ignored: no record at that position");
        }
        Ok(outcome)
    }

    /// Persists the session as a batch once every record has a decision.
    /// The session is cleared only after the batch is stored, and only if it
    /// was not replaced or changed while the batch was being written.
    #[instrument(skip(self))]
    pub async fn finalize(&self, inspector_id: &str) -> Result<InspectionBatch, ServiceError> {
        let session = self.sessions.get(inspector_id).ok_or_else(no_session)?;
        let batch = InspectionBatch::from_session(&session, inspector_id)?;

        self.batches.save(&batch).await?;
        if !self.sessions.clear_if_unchanged(inspector_id, &session) {
            warn!(batch_id = %batch.id(), "Session changed during finalize; keeping the newer one");
        }
        counter!("inc_manager.inspection.batches_saved", 1);
        info!(batch_id = %batch.id(), records = batch.records().len(), "Inspection finalized");

        self.publish(Event::InspectionBatchSaved {
            batch_id: batch.id(),
            inspector_id: inspector_id.to_string(),
            records: batch.records().len(),
        })
        .await;

        Ok(batch)
    }

    #[instrument(skip(self))]
    pub async fn abandon(&self, inspector_id: &str) -> Result<(), ServiceError> {
        self.sessions.clear(inspector_id).ok_or_else(no_session)?;
        info!("Inspection session abandoned");
        self.publish(Event::InspectionAbandoned {
            inspector_id: inspector_id.to_string(),
        })
        .await;
        Ok(())
    }

    /// Sends an event for a change that is already committed. A failed send
    /// is logged and does not fail the request.
    async fn publish(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!(error = %e, "Failed to publish inspection event");
        }
    }

    pub async fn list_batches(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<InspectionBatch>, u64), ServiceError> {
        self.batches.list(page, limit).await
    }

    pub async fn get_batch(&self, id: Uuid) -> Result<InspectionBatch, ServiceError> {
        self.batches
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Inspection batch {} not found", id)))
    }
}

fn no_session() -> ServiceError {
    ServiceError::NotFound("No inspection in progress".to_string())
}
