//! Structured log store types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::DEFAULT_LOG_PAGE_SIZE;
use crate::impl_domain_status_conversions;

/// Severity of a stored log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl_domain_status_conversions!(LogLevel {
    Error => "error",
    Warning => "warning",
    Info => "info",
    Debug => "debug",
});

impl LogLevel {
    /// Every level, most severe first.
    pub const ALL: [LogLevel; 4] = [Self::Error, Self::Warning, Self::Info, Self::Debug];
}

/// A persisted log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Always a JSON object (`{}` when the caller supplied nothing).
    pub context: Value,
    pub post_id: Option<i64>,
    pub trigger_type: Option<String>,
}

/// A log row before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub level: LogLevel,
    pub message: String,
    pub context: Value,
    pub post_id: Option<i64>,
    pub trigger_type: Option<String>,
}

impl NewLogEntry {
    /// Build an entry, normalising a missing or null context to `{}` and
    /// wrapping any other non-object context as `{"value": ...}`.
    pub fn new(level: LogLevel, message: impl Into<String>, context: Option<Value>) -> Self {
        let context = match context {
            None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
            Some(Value::Object(map)) => Value::Object(map),
            Some(value) => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), value);
                Value::Object(map)
            }
        };

        Self { level, message: message.into(), context, post_id: None, trigger_type: None }
    }

    pub fn with_post_id(mut self, post_id: Option<i64>) -> Self {
        self.post_id = post_id;
        self
    }

    pub fn with_trigger_type(mut self, trigger_type: Option<String>) -> Self {
        self.trigger_type = trigger_type;
        self
    }
}

/// Timestamp ordering for log queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query filters for [`LogEntry`] lookups. Unset fields do not constrain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogFilter {
    pub level: Option<LogLevel>,
    pub post_id: Option<i64>,
    pub trigger_type: Option<String>,
    pub limit: u32,
    pub offset: u32,
    pub order: SortOrder,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            level: None,
            post_id: None,
            trigger_type: None,
            limit: DEFAULT_LOG_PAGE_SIZE,
            offset: 0,
            order: SortOrder::Desc,
        }
    }
}

impl LogFilter {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn post_id(mut self, post_id: i64) -> Self {
        self.post_id = Some(post_id);
        self
    }

    pub fn trigger_type(mut self, trigger_type: impl Into<String>) -> Self {
        self.trigger_type = Some(trigger_type.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

/// Aggregate counts over the log store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStats {
    /// All-time count per level. Levels with no rows are absent.
    pub by_level: BTreeMap<LogLevel, u64>,
    pub recent_24h: u64,
    pub errors_7d: u64,
}

/// Serialization formats for [`LogEntry`] export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl_domain_status_conversions!(ExportFormat {
    Csv => "csv",
    Json => "json",
});

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_context_becomes_empty_object() {
        let entry = NewLogEntry::new(LogLevel::Info, "hello", None);
        assert_eq!(entry.context, json!({}));

        let entry = NewLogEntry::new(LogLevel::Info, "hello", Some(Value::Null));
        assert_eq!(entry.context, json!({}));
    }

    #[test]
    fn scalar_and_array_context_is_wrapped_in_an_object() {
        let entry = NewLogEntry::new(LogLevel::Info, "hello", Some(json!(5)));
        assert_eq!(entry.context, json!({"value": 5}));

        let entry = NewLogEntry::new(LogLevel::Info, "hello", Some(json!(["a", "b"])));
        assert_eq!(entry.context, json!({"value": ["a", "b"]}));

        let entry = NewLogEntry::new(LogLevel::Info, "hello", Some(json!({"k": 1})));
        assert_eq!(entry.context, json!({"k": 1}));
    }

    #[test]
    fn default_filter_is_first_page_newest_first() {
        let filter = LogFilter::default();
        assert_eq!(filter.limit, 100);
        assert_eq!(filter.offset, 0);
        assert_eq!(filter.order, SortOrder::Desc);
        assert!(filter.level.is_none());
    }

    #[test]
    fn level_parses_from_stored_text() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert!("fatal".parse::<LogLevel>().is_err());
    }

    #[test]
    fn export_format_rejects_unknown() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
