//! Property-based tests for the receiving list extractor.
//!
//! Generated `.lst` lines cover the column layout the ERP prints, including
//! descriptions with wide gaps and decimal commas.

use inc_manager::inspection::{extract, extract_with_report, parse_line, SkipReason};
use proptest::prelude::*;

// Strategies for generating test data
fn item_code_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{3}\\.[0-9]{5}".prop_map(|s| s)
}

fn word_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{2,10}".prop_map(|s| s)
}

/// Description words; each word may be separated by a wide gap.
fn description_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(word_strategy(), 1..5)
}

fn quantity_strategy() -> impl Strategy<Value = (u32, u8)> {
    (0u32..100_000, 0u8..100)
}

prop_compose! {
    fn line_strategy()(
        notice in 1i64..10_000_000,
        item in item_code_strategy(),
        description in description_strategy(),
        (units, cents) in quantity_strategy(),
        supplier in word_strategy(),
        purchase_order in 1i64..10_000_000,
    ) -> (String, i64, String, String, f64, String, i64) {
        let line = format!(
            "03/03/2025  {}  001 {}  {}  UN  {},{:02}  10 {}  0  {}",
            notice,
            item,
            description.join("  "),
            units,
            cents,
            supplier,
            purchase_order
        );
        let quantity = format!("{}.{:02}", units, cents).parse::<f64>().unwrap();
        (line, notice, item, description.join(" "), quantity, supplier, purchase_order)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn well_formed_lines_round_trip_their_columns(
        (line, notice, item, description, quantity, supplier, purchase_order) in line_strategy()
    ) {
        let record = parse_line(&line).unwrap();
        prop_assert_eq!(&record.notice_number, &notice);
        prop_assert_eq!(&record.item_code, &item);
        prop_assert_eq!(&record.description, &description);
        prop_assert_eq!(record.quantity_received, quantity);
        prop_assert_eq!(&record.supplier_raw, &supplier);
        prop_assert_eq!(&record.purchase_order, &purchase_order);
        prop_assert!(record.is_pending());
    }

    #[test]
    fn extraction_never_panics(raw in prop::collection::vec(any::<u8>(), 0..2048)) {
        let (records, report) = extract_with_report(&raw);
        prop_assert_eq!(records.len(), report.records);
        prop_assert!(report.records + report.skipped_total() <= report.lines_seen);
    }

    #[test]
    fn record_order_follows_the_file(
        lines in prop::collection::vec(line_strategy(), 1..20)
    ) {
        let file: String = lines.iter().map(|l| format!("{}\r\n", l.0)).collect();
        let records = extract(file.as_bytes());
        prop_assert_eq!(records.len(), lines.len());
        for (record, expected) in records.iter().zip(&lines) {
            prop_assert_eq!(record.notice_number, expected.1);
            prop_assert_eq!(record.purchase_order, expected.6);
        }
    }

    #[test]
    fn short_lines_are_skipped(words in prop::collection::vec(word_strategy(), 1..9)) {
        let line = words.join("  ");
        prop_assert_eq!(parse_line(&line).unwrap_err(), SkipReason::TooFewFields);
    }
}
