use domain::{TodoId, TodoItem};
use infrastructure::RemoteTableStore;
use shared::AppResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// 全件再取得の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// キャッシュを置き換えた
    Applied { ticket: u64, rows: usize },
    /// より新しい再取得が先に反映済みのため破棄した
    Superseded { ticket: u64 },
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied { .. })
    }
}

#[derive(Default)]
struct Snapshot {
    items: Arc<Vec<TodoItem>>,
    applied_ticket: u64,
}

/// `todos` テーブルのローカルミラー
///
/// 内容は `Arc<Vec<_>>` ごと差し替えるので、読み手は置き換え途中の
/// 状態を観測しない。
#[derive(Default)]
pub struct TodoListCache {
    snapshot: RwLock<Snapshot>,
    next_ticket: AtomicU64,
}

impl TodoListCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// リモートから ID 昇順で全件取得して内容を丸ごと置き換える
    ///
    /// 読み取りに失敗した場合は以前の内容を残したままエラーを返す。
    /// 開始順で後発の再取得が既に反映されていれば、結果は捨てる。
    pub async fn refresh(&self, store: &dyn RemoteTableStore) -> AppResult<RefreshOutcome> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let mut rows = store.list_todos().await?;
        rows.sort_by_key(|item| item.id);

        Ok(self.replace_if_newer(ticket, rows))
    }

    fn replace_if_newer(&self, ticket: u64, rows: Vec<TodoItem>) -> RefreshOutcome {
        let mut snapshot = self.write();
        if ticket < snapshot.applied_ticket {
            debug!(ticket, applied = snapshot.applied_ticket, "stale refresh discarded");
            return RefreshOutcome::Superseded { ticket };
        }

        let count = rows.len();
        snapshot.items = Arc::new(rows);
        snapshot.applied_ticket = ticket;
        RefreshOutcome::Applied {
            ticket,
            rows: count,
        }
    }

    /// 現在の内容（読み取り専用の共有スナップショット）
    pub fn snapshot(&self) -> Arc<Vec<TodoItem>> {
        self.read().items.clone()
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: TodoId) -> Option<TodoItem> {
        self.read().items.iter().find(|item| item.id == id).cloned()
    }

    pub fn contains(&self, id: TodoId) -> bool {
        self.read().items.iter().any(|item| item.id == id)
    }

    /// 作成直後の行を末尾に追加する
    pub fn append(&self, item: TodoItem) {
        let mut snapshot = self.write();
        Arc::make_mut(&mut snapshot.items).push(item);
        self.claim_ticket(&mut snapshot);
    }

    /// 完了フラグを書き換える。該当行が無ければ `false`。
    pub fn set_completion(&self, id: TodoId, is_complete: bool) -> bool {
        let mut snapshot = self.write();
        let items = Arc::make_mut(&mut snapshot.items);
        match items.iter_mut().find(|item| item.id == id) {
            Some(item) => item.is_complete = is_complete,
            None => return false,
        }
        self.claim_ticket(&mut snapshot);
        true
    }

    /// ID で行を取り除く。取り除いた場合のみ `true`。
    pub fn remove(&self, id: TodoId) -> bool {
        let mut snapshot = self.write();
        if !snapshot.items.iter().any(|item| item.id == id) {
            return false;
        }
        Arc::make_mut(&mut snapshot.items).retain(|item| item.id != id);
        self.claim_ticket(&mut snapshot);
        true
    }

    /// ローカル書き込みも 1 回の反映として扱う
    ///
    /// 書き込み前に読み取りを始めた再取得は、この後に完了しても破棄される。
    /// 書き込み後の状態は、その書き込み自身の変更イベントによる再取得で確定する。
    fn claim_ticket(&self, snapshot: &mut Snapshot) {
        snapshot.applied_ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Snapshot> {
        self.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use domain::{NewTodo, UserId};
    use infrastructure::{InMemoryTableStore, StoreOp};

    fn item(id: i64) -> TodoItem {
        TodoItem {
            id: TodoId::new(id),
            task: format!("task-{id}"),
            owner_id: UserId::from_string("u1").unwrap(),
            assignee_id: None,
            due_date: None,
            is_complete: false,
            inserted_at: Utc::now(),
        }
    }

    fn new_todo(task: &str) -> NewTodo {
        NewTodo {
            task: task.to_string(),
            owner_id: UserId::from_string("u1").unwrap(),
            assignee_id: UserId::from_string("u2").unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_contents() {
        // Arrange: ローカルには古い行だけがある
        let store = InMemoryTableStore::default();
        store.insert_todo(new_todo("A")).await.unwrap();
        store.insert_todo(new_todo("B")).await.unwrap();
        let cache = TodoListCache::new();
        cache.append(item(99));

        // Act
        let outcome = cache.refresh(&store).await.unwrap();

        // Assert: サーバーの内容で丸ごと置き換わる（append が ticket 1 を使う）
        assert_eq!(outcome, RefreshOutcome::Applied { ticket: 2, rows: 2 });
        let tasks: Vec<String> = cache.snapshot().iter().map(|i| i.task.clone()).collect();
        assert_eq!(tasks, vec!["A", "B"]);
        assert!(!cache.contains(TodoId::new(99)));
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_contents() {
        let store = InMemoryTableStore::default();
        store.fail_next(StoreOp::ListTodos, "timeout").await;
        let cache = TodoListCache::new();
        cache.append(item(1));

        let result = cache.refresh(&store).await;

        assert!(result.is_err());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(TodoId::new(1)));
    }

    #[test]
    fn test_stale_refresh_is_discarded() {
        let cache = TodoListCache::new();

        // 後発の再取得（ticket 2）が先に完了する
        assert!(cache.replace_if_newer(2, vec![item(1), item(2)]).is_applied());
        let stale = cache.replace_if_newer(1, vec![item(1)]);

        assert_eq!(stale, RefreshOutcome::Superseded { ticket: 1 });
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_local_writes_supersede_earlier_refreshes() {
        let cache = TodoListCache::new();
        // 書き込み前に開始した再取得の ticket
        let started_before = cache.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;

        cache.append(item(1));
        let stale = cache.replace_if_newer(started_before, Vec::new());

        assert_eq!(stale, RefreshOutcome::Superseded { ticket: 1 });
        assert!(cache.contains(TodoId::new(1)));

        // 失敗した書き込み（該当行なし）は ticket を進めない
        let applied = cache.read().applied_ticket;
        assert!(!cache.remove(TodoId::new(9)));
        assert!(!cache.set_completion(TodoId::new(9), true));
        assert_eq!(cache.read().applied_ticket, applied);
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_writes() {
        let cache = TodoListCache::new();
        cache.append(item(1));
        let before = cache.snapshot();

        cache.append(item(2));
        cache.set_completion(TodoId::new(1), true);

        assert_eq!(before.len(), 1);
        assert!(!before[0].is_complete);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(TodoId::new(1)).unwrap().is_complete);
    }

    #[test]
    fn test_remove_and_set_completion_on_missing_id() {
        let cache = TodoListCache::new();
        cache.append(item(1));

        assert!(!cache.remove(TodoId::new(5)));
        assert!(!cache.set_completion(TodoId::new(5), true));
        assert!(cache.remove(TodoId::new(1)));
        assert!(cache.is_empty());
    }
}
