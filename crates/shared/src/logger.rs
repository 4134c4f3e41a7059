use crate::errors::{AppError, ErrorSeverity};
use serde_json::{json, Value};
use tracing::{event, Level};

/// 構造化ログ（JSON 1 行）を出力するヘルパー
pub struct StructuredLogger;

impl StructuredLogger {
    pub fn log_operation_start(operation: &str, user_id: &str, todo_id: Option<i64>) {
        let fields = Self::base_fields("operation_start", operation, user_id, todo_id);
        event!(Level::DEBUG, "{}", fields);
    }

    pub fn log_operation_success(
        operation: &str,
        user_id: &str,
        duration_ms: u64,
        todo_id: Option<i64>,
    ) {
        let mut fields = Self::base_fields("operation_success", operation, user_id, todo_id);
        fields["duration_ms"] = json!(duration_ms);

        event!(Level::INFO, "{}", fields);
    }

    /// 失敗ログ。レベルはエラーの重要度から決める。
    pub fn log_operation_error(
        operation: &str,
        user_id: &str,
        error: &AppError,
        duration_ms: u64,
        todo_id: Option<i64>,
    ) {
        let metadata = error.metadata();
        let mut fields = Self::base_fields("operation_error", operation, user_id, todo_id);
        fields["error"] = json!(error.to_string());
        fields["error_code"] = json!(metadata.code);
        fields["category"] = json!(metadata.category);
        fields["duration_ms"] = json!(duration_ms);

        match metadata.severity {
            ErrorSeverity::Info => event!(Level::INFO, "{}", fields),
            ErrorSeverity::Warning => event!(Level::WARN, "{}", fields),
            ErrorSeverity::Error | ErrorSeverity::Critical => event!(Level::ERROR, "{}", fields),
        }
    }

    pub fn log_refresh_applied(user_id: &str, ticket: u64, row_count: usize, duration_ms: u64) {
        let fields = json!({
            "event_type": "refresh_applied",
            "user_id": user_id,
            "ticket": ticket,
            "row_count": row_count,
            "duration_ms": duration_ms,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        event!(Level::INFO, "{}", fields);
    }

    pub fn log_change_received(user_id: &str, change_kind: &str, todo_id: Option<i64>) {
        let mut fields = json!({
            "event_type": "change_received",
            "user_id": user_id,
            "change_kind": change_kind,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        if let Some(id) = todo_id {
            fields["todo_id"] = json!(id);
        }

        event!(Level::DEBUG, "{}", fields);
    }

    fn base_fields(
        event_type: &str,
        operation: &str,
        user_id: &str,
        todo_id: Option<i64>,
    ) -> Value {
        let mut fields = json!({
            "event_type": event_type,
            "operation": operation,
            "user_id": user_id,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        if let Some(id) = todo_id {
            fields["todo_id"] = json!(id);
        }

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_fields_include_todo_id_only_when_present() {
        let with_id = StructuredLogger::base_fields("operation_start", "toggle", "u1", Some(7));
        assert_eq!(with_id["todo_id"], 7);
        assert_eq!(with_id["operation"], "toggle");

        let without_id = StructuredLogger::base_fields("operation_start", "create", "u1", None);
        assert!(without_id.get("todo_id").is_none());
        assert_eq!(without_id["user_id"], "u1");
    }
}
