use crate::errors::AppError;
use std::env;
use std::str::FromStr;

/// ログ出力形式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(AppError::Configuration(format!(
                "LOG_FORMAT must be json or pretty, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub environment: String,
    /// Todo テーブル名。ストア内では行の識別ラベル・購読チャンネル名・ログ項目にのみ使う。
    pub todos_table: String,
    /// プロフィールテーブル名。ログ項目のラベルとしてのみ使う。
    pub profiles_table: String,
    /// 通知キューの容量（満杯時は新しい通知を捨てる）
    pub notification_capacity: usize,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "dev".to_string(),
            todos_table: "todos".to_string(),
            profiles_table: "profiles".to_string(),
            notification_capacity: 64,
            log_format: LogFormat::Json,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意のキー検索関数から設定を組み立てる
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let notification_capacity = match lookup("NOTIFICATION_CAPACITY") {
            Some(raw) => {
                let capacity = raw.trim().parse::<usize>().map_err(|_| {
                    AppError::Configuration(format!(
                        "NOTIFICATION_CAPACITY must be a positive integer, got {raw}"
                    ))
                })?;
                if capacity == 0 {
                    return Err(AppError::Configuration(
                        "NOTIFICATION_CAPACITY must be > 0".to_string(),
                    ));
                }
                capacity
            }
            None => defaults.notification_capacity,
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };

        Ok(Config {
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            todos_table: lookup("TODOS_TABLE").unwrap_or(defaults.todos_table),
            profiles_table: lookup("PROFILES_TABLE").unwrap_or(defaults.profiles_table),
            notification_capacity,
            log_format,
        })
    }
}
