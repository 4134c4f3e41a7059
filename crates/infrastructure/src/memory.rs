//! 開発・テスト用のインメモリ テーブルストア
//!
//! ホスト型ストアと同じく、書き込みのたびに変更フィードへイベントを流す。
//! 呼び出し履歴の観測と、次回呼び出しの失敗注入ができる。

use crate::store::RemoteTableStore;
use crate::subscription::Subscription;
use async_trait::async_trait;
use chrono::Utc;
use domain::{ChangeEvent, NewTodo, TodoId, TodoItem, TodoPatch, UserProfile};
use shared::{AppError, AppResult, Config};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

const FEED_CAPACITY: usize = 256;

/// ストア操作の種別（呼び出し履歴と失敗注入に使う）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ListProfiles,
    ListTodos,
    Insert,
    Update,
    Delete,
    Subscribe,
}

impl StoreOp {
    pub fn is_write(&self) -> bool {
        matches!(self, StoreOp::Insert | StoreOp::Update | StoreOp::Delete)
    }
}

type UpdateTrigger = Box<dyn FnOnce(&mut TodoItem) + Send>;

#[derive(Default)]
struct TableState {
    profiles: Vec<UserProfile>,
    todos: BTreeMap<TodoId, TodoItem>,
    next_id: i64,
    calls: Vec<StoreOp>,
    failures: HashMap<StoreOp, String>,
    update_trigger: Option<UpdateTrigger>,
}

impl TableState {
    fn begin(&mut self, op: StoreOp) -> Option<String> {
        self.calls.push(op);
        self.failures.remove(&op)
    }
}

struct Inner {
    todos_table: String,
    profiles_table: String,
    state: Mutex<TableState>,
    feed: broadcast::Sender<ChangeEvent>,
    opened_subscriptions: AtomicUsize,
    live_subscriptions: Arc<AtomicUsize>,
}

#[derive(Clone)]
pub struct InMemoryTableStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryTableStore {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl InMemoryTableStore {
    /// テーブル名はラベル（チャンネル名・エラーメッセージ・ログ）としてのみ使う
    pub fn new(todos_table: impl Into<String>, profiles_table: impl Into<String>) -> Self {
        Self::with_feed_capacity(todos_table, profiles_table, FEED_CAPACITY)
    }

    /// 変更フィードのバッファ容量を指定して作成する。容量を超えて溜まると受信側は遅延扱いになる。
    pub fn with_feed_capacity(
        todos_table: impl Into<String>,
        profiles_table: impl Into<String>,
        feed_capacity: usize,
    ) -> Self {
        let (feed, _) = broadcast::channel(feed_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                todos_table: todos_table.into(),
                profiles_table: profiles_table.into(),
                state: Mutex::new(TableState {
                    next_id: 1,
                    ..TableState::default()
                }),
                feed,
                opened_subscriptions: AtomicUsize::new(0),
                live_subscriptions: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.todos_table.clone(), config.profiles_table.clone())
    }

    /// プロフィールディレクトリを投入（変更フィードは流さない）
    pub async fn seed_profiles(&self, profiles: Vec<UserProfile>) {
        let mut state = self.inner.state.lock().await;
        state.profiles = profiles;
    }

    /// 指定した操作の次回呼び出しを `message` で失敗させる
    pub async fn fail_next(&self, op: StoreOp, message: impl Into<String>) {
        let mut state = self.inner.state.lock().await;
        state.failures.insert(op, message.into());
    }

    /// 次回の更新で、パッチ適用後の行をさらに書き換える
    ///
    /// 別クライアントによる同時更新をサーバー側で再現するために使う。
    pub async fn on_next_update<F>(&self, trigger: F)
    where
        F: FnOnce(&mut TodoItem) + Send + 'static,
    {
        let mut state = self.inner.state.lock().await;
        state.update_trigger = Some(Box::new(trigger));
    }

    pub async fn calls(&self) -> Vec<StoreOp> {
        self.inner.state.lock().await.calls.clone()
    }

    pub async fn write_count(&self) -> usize {
        self.calls().await.iter().filter(|op| op.is_write()).count()
    }

    pub async fn todo(&self, id: TodoId) -> Option<TodoItem> {
        self.inner.state.lock().await.todos.get(&id).cloned()
    }

    pub async fn todo_count(&self) -> usize {
        self.inner.state.lock().await.todos.len()
    }

    /// 現在有効な購読数
    pub fn live_subscriptions(&self) -> usize {
        self.inner.live_subscriptions.load(Ordering::SeqCst)
    }

    /// これまでに開かれた購読の総数
    pub fn opened_subscriptions(&self) -> usize {
        self.inner.opened_subscriptions.load(Ordering::SeqCst)
    }

    fn publish(&self, event: ChangeEvent) {
        let kind = event.kind();
        // 購読者がいない場合の送信失敗は無視する
        let receivers = self.inner.feed.send(event).unwrap_or(0);
        debug!(
            table = %self.inner.todos_table,
            change_kind = %kind,
            receivers,
            "change published"
        );
    }

    fn row_label(&self, id: TodoId) -> String {
        format!("{} row {}", self.inner.todos_table, id)
    }
}

#[async_trait]
impl RemoteTableStore for InMemoryTableStore {
    async fn list_profiles(&self) -> AppResult<Vec<UserProfile>> {
        let mut state = self.inner.state.lock().await;
        if let Some(message) = state.begin(StoreOp::ListProfiles) {
            return Err(AppError::RemoteRead(message));
        }
        Ok(state.profiles.clone())
    }

    async fn list_todos(&self) -> AppResult<Vec<TodoItem>> {
        let mut state = self.inner.state.lock().await;
        if let Some(message) = state.begin(StoreOp::ListTodos) {
            return Err(AppError::RemoteRead(message));
        }
        // BTreeMap なので ID 昇順
        Ok(state.todos.values().cloned().collect())
    }

    async fn insert_todo(&self, new_todo: NewTodo) -> AppResult<TodoItem> {
        let item = {
            let mut state = self.inner.state.lock().await;
            if let Some(message) = state.begin(StoreOp::Insert) {
                return Err(AppError::RemoteWrite(message));
            }
            if new_todo.task.trim().is_empty() {
                return Err(AppError::RemoteWrite(format!(
                    "null value in column \"task\" of relation \"{}\"",
                    self.inner.todos_table
                )));
            }

            let id = TodoId::new(state.next_id);
            state.next_id += 1;

            let item = TodoItem {
                id,
                task: new_todo.task,
                owner_id: new_todo.owner_id,
                assignee_id: Some(new_todo.assignee_id),
                due_date: Some(new_todo.due_date),
                is_complete: false,
                inserted_at: Utc::now(),
            };
            state.todos.insert(id, item.clone());
            item
        };

        self.publish(ChangeEvent::Insert { new: item.clone() });
        Ok(item)
    }

    async fn update_todo(&self, id: TodoId, patch: TodoPatch) -> AppResult<TodoItem> {
        let (old, new) = {
            let mut state = self.inner.state.lock().await;
            if let Some(message) = state.begin(StoreOp::Update) {
                return Err(AppError::RemoteWrite(message));
            }
            let trigger = state.update_trigger.take();

            let row = state
                .todos
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(self.row_label(id)))?;
            let old = row.clone();
            patch.apply_to(row);
            if let Some(trigger) = trigger {
                trigger(row);
            }
            (old, row.clone())
        };

        self.publish(ChangeEvent::Update {
            old: Some(old),
            new: new.clone(),
        });
        Ok(new)
    }

    async fn delete_todo(&self, id: TodoId) -> AppResult<()> {
        let removed = {
            let mut state = self.inner.state.lock().await;
            if let Some(message) = state.begin(StoreOp::Delete) {
                return Err(AppError::RemoteWrite(message));
            }
            state.todos.remove(&id)
        };

        // 該当行が無い削除はエラーにせず、イベントも流さない
        if let Some(old) = removed {
            self.publish(ChangeEvent::Delete { old: Some(old) });
        }
        Ok(())
    }

    async fn subscribe_todo_changes(&self) -> AppResult<Subscription> {
        {
            let mut state = self.inner.state.lock().await;
            if let Some(message) = state.begin(StoreOp::Subscribe) {
                return Err(AppError::Subscription(message));
            }
        }

        let receiver = self.inner.feed.subscribe();
        self.inner.opened_subscriptions.fetch_add(1, Ordering::SeqCst);
        self.inner.live_subscriptions.fetch_add(1, Ordering::SeqCst);

        let live = self.inner.live_subscriptions.clone();
        let channel = format!("{}-realtime", self.inner.todos_table);
        info!(
            channel = %channel,
            profiles_table = %self.inner.profiles_table,
            "subscription opened"
        );

        Ok(Subscription::new(channel, receiver, move || {
            live.fetch_sub(1, Ordering::SeqCst);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use domain::UserId;

    fn user(id: &str) -> UserId {
        UserId::from_string(id).unwrap()
    }

    fn new_todo(task: &str, assignee: &str) -> NewTodo {
        NewTodo {
            task: task.to_string(),
            owner_id: user("u2"),
            assignee_id: user(assignee),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ascending_ids_and_lists_in_order() {
        let store = InMemoryTableStore::default();

        let first = store.insert_todo(new_todo("A", "u1")).await.unwrap();
        let second = store.insert_todo(new_todo("B", "u1")).await.unwrap();

        assert!(first.id < second.id);
        assert!(!first.is_complete);

        let listed = store.list_todos().await.unwrap();
        let ids: Vec<TodoId> = listed.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_writes_publish_change_events() {
        let store = InMemoryTableStore::default();
        let mut subscription = store.subscribe_todo_changes().await.unwrap();

        let item = store.insert_todo(new_todo("A", "u1")).await.unwrap();
        store
            .update_todo(item.id, TodoPatch::completion(true))
            .await
            .unwrap();
        store.delete_todo(item.id).await.unwrap();

        let insert = subscription.recv().await.unwrap();
        let update = subscription.recv().await.unwrap();
        let delete = subscription.recv().await.unwrap();

        assert!(matches!(insert, ChangeEvent::Insert { .. }));
        match update {
            ChangeEvent::Update { old, new } => {
                assert!(!old.unwrap().is_complete);
                assert!(new.is_complete);
            }
            other => panic!("Expected Update event, got {other:?}"),
        }
        assert_eq!(delete.todo_id(), Some(item.id));
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let store = InMemoryTableStore::default();
        store.fail_next(StoreOp::ListTodos, "connection reset").await;

        let first = store.list_todos().await;
        let second = store.list_todos().await;

        assert_eq!(
            first.unwrap_err(),
            AppError::RemoteRead("connection reset".to_string())
        );
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let store = InMemoryTableStore::default();

        let result = store
            .update_todo(TodoId::new(99), TodoPatch::completion(true))
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_trigger_overrides_patch() {
        let store = InMemoryTableStore::default();
        let item = store.insert_todo(new_todo("A", "u1")).await.unwrap();
        store.on_next_update(|row| row.is_complete = false).await;

        let updated = store
            .update_todo(item.id, TodoPatch::completion(true))
            .await
            .unwrap();

        assert!(!updated.is_complete);
    }

    #[tokio::test]
    async fn test_subscription_counters() {
        let store = InMemoryTableStore::default();

        let mut subscription = store.subscribe_todo_changes().await.unwrap();
        assert_eq!(store.live_subscriptions(), 1);
        assert_eq!(subscription.channel(), "todos-realtime");

        subscription.close();
        subscription.close();
        assert_eq!(store.live_subscriptions(), 0);
        assert_eq!(store.opened_subscriptions(), 1);
    }

    #[tokio::test]
    async fn test_calls_are_recorded() {
        let store = InMemoryTableStore::default();
        store.list_profiles().await.unwrap();
        store.insert_todo(new_todo("A", "u1")).await.unwrap();

        assert_eq!(store.calls().await, vec![StoreOp::ListProfiles, StoreOp::Insert]);
        assert_eq!(store.write_count().await, 1);
    }
}
