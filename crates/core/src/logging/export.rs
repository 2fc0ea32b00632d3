//! Serialisation of log entries for download

use crmbridge_domain::{CrmBridgeError, ExportFormat, LogEntry, Result};

const CSV_COLUMNS: [&str; 7] =
    ["id", "timestamp", "level", "message", "post_id", "trigger_type", "context"];

/// Render `entries` in the requested format.
pub fn render(entries: &[LogEntry], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Csv => Ok(to_csv(entries)),
        ExportFormat::Json => serde_json::to_string_pretty(entries)
            .map_err(|e| CrmBridgeError::Internal(format!("log export failed: {e}"))),
    }
}

/// Header line plus one row per entry. The context column holds the encoded
/// JSON object as a single field.
fn to_csv(entries: &[LogEntry]) -> String {
    let mut output = CSV_COLUMNS.join(",") + "\n";

    for entry in entries {
        let values = [
            entry.id.to_string(),
            entry.timestamp.to_rfc3339(),
            entry.level.as_str().to_string(),
            entry.message.clone(),
            entry.post_id.map(|id| id.to_string()).unwrap_or_default(),
            entry.trigger_type.clone().unwrap_or_default(),
            entry.context.to_string(),
        ];
        let row: Vec<String> = values.iter().map(|v| csv_field(v)).collect();
        output.push_str(&row.join(","));
        output.push('\n');
    }

    output
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use crmbridge_domain::LogLevel;
    use serde_json::json;

    use super::*;

    fn entry(id: i64, message: &str) -> LogEntry {
        LogEntry {
            id,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            level: LogLevel::Warning,
            message: message.to_string(),
            context: json!({"a": 1}),
            post_id: Some(7),
            trigger_type: None,
        }
    }

    #[test]
    fn csv_has_header_and_quotes_context() {
        let csv = render(&[entry(3, "plain")], ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();

        assert_eq!(lines.next(), Some("id,timestamp,level,message,post_id,trigger_type,context"));
        assert_eq!(
            lines.next(),
            Some("3,2024-03-01T12:00:00+00:00,warning,plain,7,,\"{\"\"a\"\":1}\"")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn csv_escapes_commas_and_newlines() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(csv_field("bare\rreturn"), "\"bare\rreturn\"");
        assert_eq!(csv_field("crlf\r\nend"), "\"crlf\r\nend\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("simple"), "simple");
    }

    #[test]
    fn json_is_an_array_of_rows() {
        let out = render(&[entry(1, "x"), entry(2, "y")], ExportFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
        assert_eq!(parsed[0]["context"], json!({"a": 1}));
        assert_eq!(parsed[1]["level"], "warning");
    }

    #[test]
    fn empty_export_still_has_header() {
        assert_eq!(render(&[], ExportFormat::Csv).unwrap(), CSV_COLUMNS.join(",") + "\n");
        assert_eq!(render(&[], ExportFormat::Json).unwrap(), "[]");
    }
}
