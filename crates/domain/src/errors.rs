use thiserror::Error;

/// フォーム未入力時にユーザーへ表示するメッセージ
pub const INCOMPLETE_FORM_MESSAGE: &str = "Please fill in all fields.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid TodoId: {0}")]
    InvalidTodoId(String),

    #[error("Invalid UserId: {0}")]
    InvalidUserId(String),

    #[error("Invalid due date: {0}")]
    InvalidDueDate(String),

    #[error("Unknown filter mode: {0}")]
    UnknownFilter(String),
}

impl DomainError {
    /// 作成フォームの入力不足を表すエラー
    pub fn incomplete_form() -> Self {
        DomainError::Validation(INCOMPLETE_FORM_MESSAGE.to_string())
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::Validation(_) | DomainError::InvalidDueDate(_)
        )
    }
}
