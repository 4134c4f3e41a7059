use crate::errors::DomainError;
use crate::profile::UserId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 期限日の書式（ISO カレンダー日付）
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// サーバーが払い出す Todo の ID（昇順がそのまま表示順）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(i64);

impl TodoId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn from_string(id: &str) -> Result<Self, DomainError> {
        id.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| DomainError::InvalidTodoId(id.to_string()))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `todos` テーブルの 1 行
///
/// `owner_id` は作成時に決まり以後変わらない。`id` も生存期間中は不変。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: TodoId,
    pub task: String,
    #[serde(rename = "created_by")]
    pub owner_id: UserId,
    #[serde(rename = "assigned_to", default)]
    pub assignee_id: Option<UserId>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_complete: bool,
    pub inserted_at: DateTime<Utc>,
}

impl TodoItem {
    pub fn is_assigned_to(&self, user_id: &UserId) -> bool {
        self.assignee_id.as_ref() == Some(user_id)
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }

    /// 未完了かつ期限日が `today` より前
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_complete && self.due_date.is_some_and(|due| due < today)
    }

    pub fn is_due_on(&self, day: NaiveDate) -> bool {
        self.due_date == Some(day)
    }

    /// 表示用の期限日文字列
    pub fn due_date_label(&self) -> Option<String> {
        self.due_date
            .map(|due| due.format(DUE_DATE_FORMAT).to_string())
    }
}

/// 作成フォームに入力された生の値
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoDraft {
    pub task: String,
    pub assigned_to: String,
    pub due_date: String,
}

impl TodoDraft {
    pub fn new(
        task: impl Into<String>,
        assigned_to: impl Into<String>,
        due_date: impl Into<String>,
    ) -> Self {
        Self {
            task: task.into(),
            assigned_to: assigned_to.into(),
            due_date: due_date.into(),
        }
    }

    /// 入力値を検証して挿入用の `NewTodo` を組み立てる
    ///
    /// タスク（前後空白除去後）・担当者・期限日のいずれかが空なら
    /// `DomainError::Validation` を返す。部分的な入力はストアに送らない。
    pub fn validate(&self, owner_id: &UserId) -> Result<NewTodo, DomainError> {
        let task = self.task.trim();
        let assigned_to = self.assigned_to.trim();
        let due_date = self.due_date.trim();

        if task.is_empty() || assigned_to.is_empty() || due_date.is_empty() {
            return Err(DomainError::incomplete_form());
        }

        let assignee_id = UserId::from_string(assigned_to)?;
        let due_date = NaiveDate::parse_from_str(due_date, DUE_DATE_FORMAT)
            .map_err(|_| DomainError::InvalidDueDate(due_date.to_string()))?;

        Ok(NewTodo {
            task: task.to_string(),
            owner_id: owner_id.clone(),
            assignee_id,
            due_date,
        })
    }
}

/// 挿入リクエスト。ID とタイムスタンプはサーバー側で採番される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodo {
    pub task: String,
    #[serde(rename = "created_by")]
    pub owner_id: UserId,
    #[serde(rename = "assigned_to")]
    pub assignee_id: UserId,
    pub due_date: NaiveDate,
}

/// 部分更新。スコープ内で変更できるのは完了フラグのみ。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
}

impl TodoPatch {
    pub fn completion(is_complete: bool) -> Self {
        Self {
            is_complete: Some(is_complete),
        }
    }

    pub fn apply_to(&self, item: &mut TodoItem) {
        if let Some(is_complete) = self.is_complete {
            item.is_complete = is_complete;
        }
    }
}
