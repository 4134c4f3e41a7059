use crate::errors::DomainError;
use serde::{Deserialize, Serialize};

/// ユーザーID（認証プロバイダが払い出す不透明な文字列）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// 文字列からユーザーIDを作成
    pub fn from_string(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidUserId(
                "User ID cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// ユーザーIDを文字列として取得
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// プロフィールディレクトリの 1 行
///
/// ライフサイクルは認証システム側が所有し、ここでは読み取り専用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
}

impl UserProfile {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_from_string() {
        let user_id = UserId::from_string("u1").unwrap();
        assert_eq!(user_id.as_str(), "u1");
        assert_eq!(user_id.to_string(), "u1");

        // 空文字列・空白のみはエラー
        assert!(UserId::from_string("").is_err());
        assert!(UserId::from_string("   ").is_err());
    }

    #[test]
    fn test_profile_deserializes_from_row() {
        let json = r#"{"id":"u1","email":"a@example.com"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.id.as_str(), "u1");
        assert_eq!(profile.email, "a@example.com");
    }
}
