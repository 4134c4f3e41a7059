use crate::profile::UserId;
use crate::todo::{TodoId, TodoItem};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 変更フィードのイベント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `todos` テーブルの行変更イベント
///
/// 更新・削除の変更前の行はストアによっては届かないため `Option`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "UPPERCASE")]
pub enum ChangeEvent {
    Insert {
        new: TodoItem,
    },
    Update {
        old: Option<TodoItem>,
        new: TodoItem,
    },
    Delete {
        old: Option<TodoItem>,
    },
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Insert { .. } => ChangeKind::Insert,
            ChangeEvent::Update { .. } => ChangeKind::Update,
            ChangeEvent::Delete { .. } => ChangeKind::Delete,
        }
    }

    pub fn new_row(&self) -> Option<&TodoItem> {
        match self {
            ChangeEvent::Insert { new } | ChangeEvent::Update { new, .. } => Some(new),
            ChangeEvent::Delete { .. } => None,
        }
    }

    pub fn old_row(&self) -> Option<&TodoItem> {
        match self {
            ChangeEvent::Update { old, .. } | ChangeEvent::Delete { old } => old.as_ref(),
            ChangeEvent::Insert { .. } => None,
        }
    }

    /// 変更対象の行 ID（削除で変更前の行が無い場合は `None`）
    pub fn todo_id(&self) -> Option<TodoId> {
        self.new_row().or(self.old_row()).map(|row| row.id)
    }

    /// 新規挿入された行の担当者が `user_id` か
    pub fn is_insert_assigned_to(&self, user_id: &UserId) -> bool {
        match self {
            ChangeEvent::Insert { new } => new.is_assigned_to(user_id),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(id: i64, assignee: Option<&str>) -> TodoItem {
        TodoItem {
            id: TodoId::new(id),
            task: "task".to_string(),
            owner_id: UserId::from_string("owner").unwrap(),
            assignee_id: assignee.map(|a| UserId::from_string(a).unwrap()),
            due_date: None,
            is_complete: false,
            inserted_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_assignment_match() {
        let me = UserId::from_string("u1").unwrap();

        let mine = ChangeEvent::Insert {
            new: item(1, Some("u1")),
        };
        let other = ChangeEvent::Insert {
            new: item(2, Some("u9")),
        };
        let unassigned = ChangeEvent::Insert { new: item(3, None) };
        let update = ChangeEvent::Update {
            old: None,
            new: item(1, Some("u1")),
        };

        assert!(mine.is_insert_assigned_to(&me));
        assert!(!other.is_insert_assigned_to(&me));
        assert!(!unassigned.is_insert_assigned_to(&me));
        // 更新イベントは通知対象外
        assert!(!update.is_insert_assigned_to(&me));
    }

    #[test]
    fn test_todo_id_and_kind() {
        let delete = ChangeEvent::Delete {
            old: Some(item(5, None)),
        };
        assert_eq!(delete.kind(), ChangeKind::Delete);
        assert_eq!(delete.todo_id(), Some(TodoId::new(5)));
        assert!(delete.new_row().is_none());

        let bare_delete = ChangeEvent::Delete { old: None };
        assert_eq!(bare_delete.todo_id(), None);
        assert_eq!(ChangeKind::Update.to_string(), "UPDATE");
    }
}
