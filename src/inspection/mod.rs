//! Receiving inspection: `.lst` extraction and the per-inspector session
//! that walks each received line to a decision.

pub mod extractor;
pub mod record;
pub mod session;
pub mod store;

pub use extractor::{extract, extract_with_report, parse_line, ExtractionReport, SkipReason};
pub use record::{InspectionAction, ReceivingRecord, RecordStatus, UNKNOWN_SUPPLIER};
pub use session::{
    notice_groups, parse_crm_token, IncompleteInspectionError, InspectionBatch,
    InspectionSession, MarkOutcome, NoticeGroup, SessionProgress,
};
pub use store::{SessionStore, Workspace};
