//! Receiving-list (`.lst`) parsing.
//!
//! The ERP exports receiving lists as fixed-width text whose columns are
//! separated by runs of two or more blanks. The charset depends on the
//! workstation that produced the export, so it is detected per file.

use std::collections::BTreeMap;

use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use strum::{AsRefStr, Display};
use utoipa::ToSchema;

use super::record::{ReceivingRecord, UNKNOWN_SUPPLIER};

/// Minimum number of columns a data line carries.
pub const MIN_FIELDS: usize = 9;

static FIELD_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Why a non-blank line produced no record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    Undecodable,
    TooFewFields,
    BadNoticeNumber,
    BadQuantity,
    BadPurchaseOrder,
    ZeroPurchaseOrder,
}

/// Summary of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ExtractionReport {
    /// Name of the charset the file was decoded with
    #[schema(example = "windows-1252")]
    pub encoding: String,
    /// Non-blank lines examined
    pub lines_seen: usize,
    /// Records produced
    pub records: usize,
    /// Skipped line counts keyed by reason
    #[schema(value_type = Object)]
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl ExtractionReport {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    fn skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_default() += 1;
    }
}

/// Extracts receiving records from raw `.lst` bytes.
///
/// Never fails: lines that cannot be decoded or parsed are dropped and a
/// file with no usable line yields an empty vector.
pub fn extract(raw: &[u8]) -> Vec<ReceivingRecord> {
    extract_with_report(raw).0
}

/// Same as [`extract`], also returning counts of what was dropped and why.
pub fn extract_with_report(raw: &[u8]) -> (Vec<ReceivingRecord>, ExtractionReport) {
    let (encoding, body) = detect_encoding(raw);
    let mut report = ExtractionReport {
        encoding: encoding.name().to_string(),
        ..ExtractionReport::default()
    };

    let records: Vec<ReceivingRecord> = decode_lines(encoding, body)
        .into_iter()
        .filter_map(|line| {
            let line = match line {
                Some(line) => line,
                None => {
                    report.lines_seen += 1;
                    report.skip(SkipReason::Undecodable);
                    return None;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return None;
            }
            report.lines_seen += 1;
            match parse_line(trimmed) {
                Ok(record) => Some(record),
                Err(reason) => {
                    report.skip(reason);
                    None
                }
            }
        })
        .collect();

    report.records = records.len();
    (records, report)
}

/// Parses one trimmed, non-blank line.
pub fn parse_line(line: &str) -> Result<ReceivingRecord, SkipReason> {
    let fields: Vec<&str> = FIELD_SEPARATOR.split(line).collect();
    if fields.len() < MIN_FIELDS {
        return Err(SkipReason::TooFewFields);
    }

    // Surplus columns come from descriptions that contain wide gaps; they are
    // folded back into the description so the trailing columns line up.
    let extra = fields.len() - MIN_FIELDS;
    let description = fields[3..=3 + extra].join(" ");
    let tail = &fields[4 + extra..];

    let notice_number = fields[1]
        .trim()
        .parse::<i64>()
        .map_err(|_| SkipReason::BadNoticeNumber)?;

    let quantity_received = tail[1]
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|q| q.is_finite())
        .ok_or(SkipReason::BadQuantity)?;

    let purchase_order = tail[tail.len() - 1]
        .trim()
        .parse::<i64>()
        .map_err(|_| SkipReason::BadPurchaseOrder)?;
    if purchase_order == 0 {
        return Err(SkipReason::ZeroPurchaseOrder);
    }

    let item_code = match second_token(fields[2]) {
        Some(code) => code.to_string(),
        None => fields[2].trim().to_string(),
    };
    let supplier_raw = second_token(tail[2])
        .unwrap_or(UNKNOWN_SUPPLIER)
        .to_string();

    Ok(ReceivingRecord {
        entry_date: fields[0].to_string(),
        supplier_raw,
        item_code,
        description,
        notice_number,
        quantity_received,
        purchase_order,
        inspected: false,
        deferred: false,
    })
}

/// Second part of `field` split once on whitespace, if there is one.
fn second_token(field: &str) -> Option<&str> {
    let mut parts = WHITESPACE_RUN.splitn(field, 2);
    parts.next()?;
    parts.next().map(str::trim)
}

/// Picks the charset for `raw`. A byte-order mark wins over detection and is
/// stripped from the returned body.
fn detect_encoding(raw: &[u8]) -> (&'static Encoding, &[u8]) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(raw) {
        return (encoding, &raw[bom_len..]);
    }
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(raw, true);
    (detector.guess(None, true), raw)
}

/// Splits `body` into lines with universal newline handling. A `None` entry
/// marks a line whose bytes are invalid in `encoding`.
fn decode_lines(encoding: &'static Encoding, body: &[u8]) -> Vec<Option<String>> {
    if encoding.is_ascii_compatible() {
        body.split(|b| *b == b'\n')
            .flat_map(|chunk| {
                match encoding.decode_without_bom_handling_and_without_replacement(chunk) {
                    Some(text) => text
                        .split('\r')
                        .map(|l| Some(l.to_string()))
                        .collect::<Vec<_>>(),
                    None => vec![None],
                }
            })
            .collect()
    } else {
        // Newlines are not single bytes here, so decode first and reject
        // lines that needed a replacement character.
        let (text, _) = encoding.decode_without_bom_handling(body);
        text.split(['\n', '\r'])
            .map(|line| {
                if line.contains(char::REPLACEMENT_CHARACTER) {
                    None
                } else {
                    Some(line.to_string())
                }
            })
            .collect()
    }
}
