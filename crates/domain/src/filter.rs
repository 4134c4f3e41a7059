use crate::errors::DomainError;
use crate::profile::UserId;
use crate::todo::TodoItem;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 一覧の絞り込みモード
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    All,
    #[serde(rename = "assigned")]
    AssignedToMe,
    #[serde(rename = "created")]
    CreatedByMe,
    Overdue,
    #[serde(rename = "today")]
    DueToday,
}

impl FilterMode {
    pub const ALL_MODES: [FilterMode; 5] = [
        FilterMode::All,
        FilterMode::AssignedToMe,
        FilterMode::CreatedByMe,
        FilterMode::Overdue,
        FilterMode::DueToday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::AssignedToMe => "assigned",
            FilterMode::CreatedByMe => "created",
            FilterMode::Overdue => "overdue",
            FilterMode::DueToday => "today",
        }
    }

    /// フィルタボタンの表示名
    pub fn label(&self) -> &'static str {
        match self {
            FilterMode::All => "All",
            FilterMode::AssignedToMe => "Assigned to Me",
            FilterMode::CreatedByMe => "Created by Me",
            FilterMode::Overdue => "Overdue",
            FilterMode::DueToday => "Due Today",
        }
    }

    pub fn matches(&self, item: &TodoItem, current_user: &UserId, today: NaiveDate) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::AssignedToMe => item.is_assigned_to(current_user),
            FilterMode::CreatedByMe => item.is_owned_by(current_user),
            FilterMode::Overdue => item.is_overdue(today),
            FilterMode::DueToday => item.is_due_on(today),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(FilterMode::All),
            "assigned" => Ok(FilterMode::AssignedToMe),
            "created" => Ok(FilterMode::CreatedByMe),
            "overdue" => Ok(FilterMode::Overdue),
            "today" => Ok(FilterMode::DueToday),
            _ => Err(DomainError::UnknownFilter(s.to_string())),
        }
    }
}

/// 表示対象の Todo を元の順序のまま抽出する
///
/// 副作用もキャッシュも持たない純粋関数。呼び出しのたびに再計算する。
pub fn visible_todos<'a>(
    items: &'a [TodoItem],
    mode: FilterMode,
    current_user: &UserId,
    today: NaiveDate,
) -> Vec<&'a TodoItem> {
    items
        .iter()
        .filter(|item| mode.matches(item, current_user, today))
        .collect()
}
