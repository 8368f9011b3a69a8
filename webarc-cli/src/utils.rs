//! Utility functions for the CLI.

use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use webarc_container::Record;
use webarc_container::record::{FIELD_DATE, FIELD_TARGET_URI};

/// Create a progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is valid")
            .progress_chars("█▓▒░ "),
    );
    pb
}

/// Check if a name matches the filter patterns.
/// - If include patterns are specified, the name must match at least one
/// - If exclude patterns are specified, the name must not match any
pub fn matches_filters(name: &str, include: &[String], exclude: &[String]) -> bool {
    for pattern_str in exclude {
        if let Ok(pattern) = Pattern::new(pattern_str) {
            if pattern.matches(name) {
                return false;
            }
        }
    }

    if include.is_empty() {
        return true;
    }

    for pattern_str in include {
        if let Ok(pattern) = Pattern::new(pattern_str) {
            if pattern.matches(name) {
                return true;
            }
        }
    }

    false
}

/// Check if a record's target URI passes the include/exclude patterns.
///
/// Records without a target URI (warcinfo and the like) carry an empty URI
/// for matching purposes.
pub fn record_matches(record: &Record, include: &[String], exclude: &[String]) -> bool {
    let uri = record.header.fields.get(FIELD_TARGET_URI).unwrap_or("");
    matches_filters(uri, include, exclude)
}

/// Print records in a formatted table.
pub fn print_records(records: &[(usize, &Record)], verbose: bool) {
    if verbose {
        println!(
            "{:>5} {:>10} {:>10} {:<10} {:<20}  Target/ID",
            "Index", "Offset", "Length", "Type", "Date",
        );
        println!("{}", "-".repeat(90));

        let mut total_length = 0u64;

        for (index, record) in records {
            let length = record.content_length().unwrap_or(0);
            println!(
                "{:>5} {:>10} {:>10} {:<10} {:<20}  {}",
                index,
                record.file_offset,
                length,
                record.warc_type().unwrap_or("-"),
                record.header.fields.get(FIELD_DATE).unwrap_or("-"),
                record
                    .header
                    .fields
                    .get(FIELD_TARGET_URI)
                    .or(record.record_id())
                    .unwrap_or("-"),
            );
            total_length += length;
        }

        println!("{}", "-".repeat(90));
        println!(
            "{:>5} records, {} content bytes",
            records.len(),
            total_length
        );
    } else {
        for (index, record) in records {
            println!(
                "{:>5}  {:<10}  {}",
                index,
                record.warc_type().unwrap_or("-"),
                record
                    .header
                    .fields
                    .get(FIELD_TARGET_URI)
                    .or(record.record_id())
                    .unwrap_or("-"),
            );
        }
    }
}

/// Build an output filename for a record's payload.
///
/// Uses the record ID when present, reduced to filesystem-safe characters;
/// falls back to the record index alone.
pub fn output_name(record: &Record, index: usize) -> String {
    let slug: String = record
        .record_id()
        .unwrap_or("")
        .trim_matches(['<', '>'])
        .trim_start_matches("urn:uuid:")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();

    if slug.is_empty() {
        format!("{index:05}.bin")
    } else {
        format!("{index:05}-{slug}")
    }
}
