#![no_main]

use inc_manager::inspection::{extract_with_report, parse_line};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let (records, report) = extract_with_report(data);
    assert_eq!(records.len(), report.records);
    assert!(report.records + report.skipped_total() <= report.lines_seen);

    for record in &records {
        assert_ne!(record.purchase_order, 0);
        assert!(record.quantity_received.is_finite());
        assert!(record.is_pending());
    }

    if let Ok(text) = std::str::from_utf8(data) {
        for line in text.lines() {
            let _ = parse_line(line.trim());
        }
    }
});
