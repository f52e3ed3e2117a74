//! CLI presentation: text and json formatters for the run report.

use crate::report::RunReport;

/// Human-readable summary, one counter per line, then suspicious files.
pub fn format_report_text(report: &RunReport, saved: bool) -> String {
    let mut out = String::new();
    let rows: [(&str, u64); 12] = [
        ("files checked", report.files_seen),
        ("bytes read", report.bytes_processed),
        ("matched", report.matched),
        ("mismatched", report.mismatched),
        ("new", report.new_files),
        ("missing", report.missing),
        ("skipped new", report.skipped_new),
        ("skipped recent", report.skipped_recent),
        ("skipped xdev", report.skipped_xdev),
        ("unreadable", report.unreadable),
        ("ignored special", report.ignored_special),
        ("changes", report.changes),
    ];
    for (label, value) in rows {
        out.push_str(&format!("{label:<16} {value}\n"));
    }
    out.push_str(&format!(
        "{:<16} {}\n",
        "checksum file",
        if saved { "updated" } else { "unchanged" }
    ));
    for line in format_mismatches(report) {
        out.push_str(&line);
        out.push('\n');
    }
    out.trim_end().to_string()
}

/// One line per suspicious file, whatever report format was asked for.
pub fn format_mismatches(report: &RunReport) -> Vec<String> {
    report
        .mismatches
        .iter()
        .map(|mismatch| {
            let action = if mismatch.saved { "updated" } else { "kept old digest" };
            format!("MD5 has changed: {} ({action})", mismatch.path)
        })
        .collect()
}

/// JSON summary: the report plus whether the checksum file was written.
pub fn format_report_json(report: &RunReport, saved: bool) -> String {
    let value = serde_json::json!({
        "report": report,
        "saved": saved,
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}
