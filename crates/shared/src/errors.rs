use serde::{Deserialize, Serialize};
use thiserror::Error;

/// アプリケーション全体で使用される包括的なエラー型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    // ドメインエラー
    #[error("Domain error: {0}")]
    Domain(#[from] domain::DomainError),

    // 入力エラー（ストアには到達しない）
    #[error("Validation failed: {0}")]
    Validation(String),

    // リモートストアのエラー
    #[error("Remote read failed: {0}")]
    RemoteRead(String),

    #[error("Remote write failed: {0}")]
    RemoteWrite(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    // システムエラー
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// エラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 利用者の入力に起因するエラー
    Client,
    /// リモートストアとの通信に起因するエラー
    Remote,
    /// クライアント内部のエラー
    Internal,
}

/// エラーの重要度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// エラーメタデータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
}

impl AppError {
    /// エラーメタデータを取得
    pub fn metadata(&self) -> ErrorMetadata {
        let (code, category, severity) = match self {
            AppError::Domain(e) if e.is_validation() => {
                ("VALIDATION_ERROR", ErrorCategory::Client, ErrorSeverity::Info)
            }
            AppError::Domain(_) => ("DOMAIN_ERROR", ErrorCategory::Client, ErrorSeverity::Warning),
            AppError::Validation(_) => {
                ("VALIDATION_ERROR", ErrorCategory::Client, ErrorSeverity::Info)
            }
            AppError::RemoteRead(_) => {
                ("REMOTE_READ_ERROR", ErrorCategory::Remote, ErrorSeverity::Error)
            }
            AppError::RemoteWrite(_) => {
                ("REMOTE_WRITE_ERROR", ErrorCategory::Remote, ErrorSeverity::Error)
            }
            AppError::NotFound(_) => ("NOT_FOUND", ErrorCategory::Remote, ErrorSeverity::Warning),
            AppError::Subscription(_) => {
                ("SUBSCRIPTION_ERROR", ErrorCategory::Remote, ErrorSeverity::Error)
            }
            AppError::Configuration(_) => {
                ("CONFIGURATION_ERROR", ErrorCategory::Internal, ErrorSeverity::Critical)
            }
            AppError::Internal(_) => {
                ("INTERNAL_ERROR", ErrorCategory::Internal, ErrorSeverity::Critical)
            }
        };

        ErrorMetadata {
            code,
            category,
            severity,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.metadata().code, "VALIDATION_ERROR")
    }

    /// ユーザー向けメッセージを取得
    ///
    /// 入力エラーとストアのエラーは元のメッセージをそのまま見せる。
    pub fn user_message(&self) -> String {
        match self {
            AppError::Domain(e) => e.to_string(),
            AppError::Validation(msg)
            | AppError::RemoteRead(msg)
            | AppError::RemoteWrite(msg)
            | AppError::Subscription(msg) => msg.clone(),
            AppError::NotFound(_) => "The item no longer exists".to_string(),
            AppError::Configuration(_) | AppError::Internal(_) => {
                "An unexpected error occurred".to_string()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
