use crate::subscription::Subscription;
use async_trait::async_trait;
use domain::{NewTodo, TodoId, TodoItem, TodoPatch, UserProfile};
use shared::AppResult;

/// ホスト型テーブルストアの最小抽象
///
/// 読み取りの失敗は `AppError::RemoteRead`、書き込みの失敗は
/// `AppError::RemoteWrite` で返す。認可はストア側の責務。
#[async_trait]
pub trait RemoteTableStore: Send + Sync {
    /// プロフィールディレクトリを全件取得
    async fn list_profiles(&self) -> AppResult<Vec<UserProfile>>;

    /// Todo を ID 昇順で全件取得
    async fn list_todos(&self) -> AppResult<Vec<TodoItem>>;

    /// Todo を挿入し、サーバーが採番した行を返す
    async fn insert_todo(&self, new_todo: NewTodo) -> AppResult<TodoItem>;

    /// 部分更新し、更新後の行を返す
    async fn update_todo(&self, id: TodoId, patch: TodoPatch) -> AppResult<TodoItem>;

    async fn delete_todo(&self, id: TodoId) -> AppResult<()>;

    /// `todos` テーブルの変更フィード（INSERT/UPDATE/DELETE）を購読
    async fn subscribe_todo_changes(&self) -> AppResult<Subscription>;
}
