#![no_main]

use arbitrary::Arbitrary;
use inc_manager::inspection::{
    extract, InspectionAction, InspectionBatch, InspectionSession, MarkOutcome,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct SessionInput {
    file: Vec<u8>,
    marks: Vec<(i64, u8, bool)>,
}

fuzz_target!(|input: SessionInput| {
    let records = extract(&input.file);
    if records.is_empty() {
        return;
    }
    let total = records.len();
    let mut session = InspectionSession::begin(records, None, "fuzz.lst");

    for (notice, position, inspect) in input.marks {
        let action = if inspect {
            InspectionAction::Inspect
        } else {
            InspectionAction::Defer
        };
        if let MarkOutcome::Applied { index, .. } = session.mark(notice, position as usize, action) {
            assert!(index < total);
            assert_eq!(session.records[index].notice_number, notice);
        }
    }

    let progress = session.progress();
    assert_eq!(progress.total, total);
    assert_eq!(progress.pending + progress.inspected + progress.deferred, total);
    assert_eq!(
        InspectionBatch::from_session(&session, "fuzzer").is_ok(),
        progress.is_complete()
    );
});
