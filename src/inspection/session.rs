use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::record::{InspectionAction, ReceivingRecord, RecordStatus};

static CRM_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"token=([a-f0-9]+)").unwrap());

/// Raised when a session is finalized while records still await a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("inspection incomplete: {pending} record(s) still pending")]
pub struct IncompleteInspectionError {
    pub pending: usize,
}

/// Result of a `mark` call. Bad coordinates leave the session untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MarkOutcome {
    Applied { index: usize, status: RecordStatus },
    Ignored,
}

impl MarkOutcome {
    pub fn applied(&self) -> bool {
        matches!(self, MarkOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionProgress {
    pub total: usize,
    pub pending: usize,
    pub inspected: usize,
    pub deferred: usize,
}

impl SessionProgress {
    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }
}

/// Records sharing one receiving notice, in file order.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NoticeGroup {
    pub notice_number: i64,
    pub records: Vec<ReceivingRecord>,
}

/// Global record indices grouped by notice number, ascending by notice and
/// in file order within a notice.
pub fn notice_groups(records: &[ReceivingRecord]) -> BTreeMap<i64, Vec<usize>> {
    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        groups.entry(record.notice_number).or_default().push(index);
    }
    groups
}

/// Pulls the hex token out of a CRM link such as `https://crm/os?token=ab12`.
pub fn parse_crm_token(link: &str) -> Option<String> {
    CRM_TOKEN
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Working state for one inspector's pass over an imported receiving list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionSession {
    pub records: Vec<ReceivingRecord>,
    pub crm_token: Option<String>,
    pub source_filename: String,
    pub started_at: DateTime<Utc>,
}

impl InspectionSession {
    pub fn begin(
        records: Vec<ReceivingRecord>,
        crm_token: Option<String>,
        source_filename: impl Into<String>,
    ) -> Self {
        Self {
            records,
            crm_token,
            source_filename: source_filename.into(),
            started_at: Utc::now(),
        }
    }

    pub fn mark(
        &mut self,
        notice_number: i64,
        position: usize,
        action: InspectionAction,
    ) -> MarkOutcome {
        let index = match notice_groups(&self.records)
            .get(&notice_number)
            .and_then(|indices| indices.get(position))
        {
            Some(index) => *index,
            None => return MarkOutcome::Ignored,
        };

        let record = &mut self.records[index];
        record.apply(action);
        MarkOutcome::Applied {
            index,
            status: record.status(),
        }
    }

    pub fn group_by_notice(&self) -> Vec<NoticeGroup> {
        notice_groups(&self.records)
            .into_iter()
            .map(|(notice_number, indices)| NoticeGroup {
                notice_number,
                records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            })
            .collect()
    }

    pub fn progress(&self) -> SessionProgress {
        self.records.iter().fold(
            SessionProgress {
                total: self.records.len(),
                ..SessionProgress::default()
            },
            |mut acc, record| {
                match record.status() {
                    RecordStatus::Pending => acc.pending += 1,
                    RecordStatus::Inspected => acc.inspected += 1,
                    RecordStatus::Deferred => acc.deferred += 1,
                }
                acc
            },
        )
    }

    pub fn ensure_complete(&self) -> Result<(), IncompleteInspectionError> {
        match self.progress().pending {
            0 => Ok(()),
            pending => Err(IncompleteInspectionError { pending }),
        }
    }
}

/// Immutable snapshot of a finished session.
///
/// Only built by [`InspectionBatch::from_session`] or restored from storage,
/// so every record in a batch carries a decision.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct InspectionBatch {
    id: Uuid,
    inspector_id: String,
    crm_token: Option<String>,
    source_filename: Option<String>,
    created_at: DateTime<Utc>,
    records: Vec<ReceivingRecord>,
}

impl InspectionBatch {
    /// Snapshots `session` for `inspector_id`; refuses while anything is pending.
    pub fn from_session(
        session: &InspectionSession,
        inspector_id: impl Into<String>,
    ) -> Result<Self, IncompleteInspectionError> {
        session.ensure_complete()?;
        Ok(Self {
            id: Uuid::new_v4(),
            inspector_id: inspector_id.into(),
            crm_token: session.crm_token.clone(),
            source_filename: Some(session.source_filename.clone()),
            created_at: Utc::now(),
            records: session.records.clone(),
        })
    }

    /// Rebuilds a batch read back from the batch store.
    pub(crate) fn restore(
        id: Uuid,
        inspector_id: String,
        crm_token: Option<String>,
        source_filename: Option<String>,
        created_at: DateTime<Utc>,
        records: Vec<ReceivingRecord>,
    ) -> Self {
        Self {
            id,
            inspector_id,
            crm_token,
            source_filename,
            created_at,
            records,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn inspector_id(&self) -> &str {
        &self.inspector_id
    }

    pub fn crm_token(&self) -> Option<&str> {
        self.crm_token.as_deref()
    }

    pub fn source_filename(&self) -> Option<&str> {
        self.source_filename.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn records(&self) -> &[ReceivingRecord] {
        &self.records
    }
}
