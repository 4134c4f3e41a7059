use crate::board::TodoBoard;
use crate::directory::{AssigneeOption, DirectoryCache};
use chrono::{NaiveDate, Utc};
use domain::{visible_todos, FilterMode, TodoDraft, TodoId, TodoItem};
use serde::Serialize;

/// 一覧 1 行分の表示内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoRowView {
    pub id: TodoId,
    pub task: String,
    /// 担当者のメールアドレス（ディレクトリに無ければ生の ID）
    pub assignee_label: Option<String>,
    pub due_label: Option<String>,
    pub is_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterButton {
    pub mode: FilterMode,
    pub label: &'static str,
    pub active: bool,
}

/// ボード全体の表示内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    pub filter: FilterMode,
    pub filters: Vec<FilterButton>,
    pub assignee_options: Vec<AssigneeOption>,
    #[serde(skip)]
    pub form: TodoDraft,
    pub error_text: Option<String>,
    pub rows: Vec<TodoRowView>,
}

pub fn render_rows(items: &[&TodoItem], directory: &DirectoryCache) -> Vec<TodoRowView> {
    items
        .iter()
        .map(|item| TodoRowView {
            id: item.id,
            task: item.task.clone(),
            assignee_label: item
                .assignee_id
                .as_ref()
                .map(|assignee| directory.label_for(assignee)),
            due_label: item.due_date_label(),
            is_complete: item.is_complete,
        })
        .collect()
}

impl TodoBoard {
    /// 今日（UTC の日付）を基準に表示内容を組み立てる
    pub fn view(&self) -> BoardView {
        self.view_at(Utc::now().date_naive())
    }

    /// `today` を基準に表示内容を組み立てる。呼び出しのたびに再計算する。
    pub fn view_at(&self, today: NaiveDate) -> BoardView {
        let filter = self.filter();
        let items = self.cache().snapshot();
        let visible = visible_todos(&items, filter, self.current_user(), today);

        BoardView {
            filter,
            filters: FilterMode::ALL_MODES
                .iter()
                .map(|mode| FilterButton {
                    mode: *mode,
                    label: mode.label(),
                    active: *mode == filter,
                })
                .collect(),
            assignee_options: self.directory().options(),
            form: self.form(),
            error_text: self.error_text(),
            rows: render_rows(&visible, self.directory()),
        }
    }

    /// 現在のフィルタで見えている行
    pub fn visible_items_at(&self, today: NaiveDate) -> Vec<TodoItem> {
        let items = self.cache().snapshot();
        visible_todos(&items, self.filter(), self.current_user(), today)
            .into_iter()
            .cloned()
            .collect()
    }
}
