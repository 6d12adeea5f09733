//! CSV export of the conversion ledger.
//!
//! The output targets spreadsheet tools: a UTF-8 BOM so Excel detects
//! the encoding, and every field quote-wrapped with inner quotes doubled.

use chrono::{TimeZone, Utc};

use crate::models::Conversion;

/// Byte-order mark prepended so Excel opens the file as UTF-8.
pub const CSV_BOM: &str = "\u{FEFF}";

const HEADER: &[&str] = &[
    "ID",
    "Source Event ID",
    "Customer Email",
    "Amount (cents)",
    "Currency",
    "Status",
    "Created At",
];

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn csv_row(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

fn format_created_at(ts: i64) -> String {
    match Utc.timestamp_opt(ts, 0) {
        chrono::LocalResult::Single(dt) => dt.to_rfc3339(),
        _ => ts.to_string(),
    }
}

/// Render conversions as a CSV document, header row included.
pub fn conversions_to_csv(conversions: &[Conversion]) -> String {
    let mut out = String::from(CSV_BOM);
    out.push_str(&csv_row(
        &HEADER.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
    ));
    out.push('\n');

    for c in conversions {
        out.push_str(&csv_row(&[
            c.id.clone(),
            c.source_event_id.clone(),
            c.customer_email.clone(),
            c.amount_cents.to_string(),
            c.currency.clone(),
            c.status.clone(),
            format_created_at(c.created_at),
        ]));
        out.push('\n');
    }

    out
}

/// Attachment filename stamped with today's date.
pub fn export_filename() -> String {
    format!("conversions_{}.csv", Utc::now().format("%Y-%m-%d"))
}
