use crate::cache::{RefreshOutcome, TodoListCache};
use crate::directory::DirectoryCache;
use crate::notifications::{Action, Notification, NotificationSender};
use domain::{FilterMode, TodoDraft, UserId};
use infrastructure::RemoteTableStore;
use shared::{AppError, AppResult, StructuredLogger};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// フォーム・フィルタ・インラインエラーなど画面ローカルの状態
#[derive(Debug, Default)]
struct UiState {
    form: TodoDraft,
    filter: FilterMode,
    error_text: Option<String>,
}

/// ボード 1 枚分の状態コンテナ
///
/// キャッシュの書き換えは変更操作（`mutations`）と変更リスナーからのみ行う。
pub struct TodoBoard {
    store: Arc<dyn RemoteTableStore>,
    current_user: UserId,
    cache: TodoListCache,
    directory: DirectoryCache,
    ui: Mutex<UiState>,
    notifier: NotificationSender,
}

impl TodoBoard {
    pub fn new(
        store: Arc<dyn RemoteTableStore>,
        current_user: UserId,
        notifier: NotificationSender,
    ) -> Self {
        Self {
            store,
            current_user,
            cache: TodoListCache::new(),
            directory: DirectoryCache::new(),
            ui: Mutex::new(UiState::default()),
            notifier,
        }
    }

    pub fn current_user(&self) -> &UserId {
        &self.current_user
    }

    pub fn cache(&self) -> &TodoListCache {
        &self.cache
    }

    pub fn directory(&self) -> &DirectoryCache {
        &self.directory
    }

    pub(crate) fn store(&self) -> &dyn RemoteTableStore {
        self.store.as_ref()
    }

    pub(crate) fn notifier(&self) -> &NotificationSender {
        &self.notifier
    }

    /// プロフィールディレクトリを読み込む
    ///
    /// 失敗してもボードは使える（担当者は生の ID で表示される）。
    pub async fn load_directory(&self) -> AppResult<usize> {
        let started = Instant::now();
        match self.directory.load(self.store()).await {
            Ok(count) => {
                StructuredLogger::log_operation_success(
                    Action::LoadDirectory.as_str(),
                    self.current_user.as_str(),
                    elapsed_ms(started),
                    None,
                );
                Ok(count)
            }
            Err(error) => {
                self.set_error_text(Some(error.user_message()));
                self.report_failure(Action::LoadDirectory, &error, started, None);
                Err(error)
            }
        }
    }

    /// Todo 一覧を全件再取得する
    pub async fn refresh(&self) -> AppResult<RefreshOutcome> {
        let started = Instant::now();
        match self.cache.refresh(self.store()).await {
            Ok(outcome) => {
                if let RefreshOutcome::Applied { ticket, rows } = outcome {
                    StructuredLogger::log_refresh_applied(
                        self.current_user.as_str(),
                        ticket,
                        rows,
                        elapsed_ms(started),
                    );
                }
                Ok(outcome)
            }
            Err(error) => {
                self.report_failure(Action::Refresh, &error, started, None);
                Err(error)
            }
        }
    }

    pub fn form(&self) -> TodoDraft {
        self.ui().form.clone()
    }

    /// タスク文を編集する。編集時はインラインエラーを消す。
    pub fn set_task(&self, task: impl Into<String>) {
        let mut ui = self.ui();
        ui.error_text = None;
        ui.form.task = task.into();
    }

    pub fn set_assigned_to(&self, assigned_to: impl Into<String>) {
        self.ui().form.assigned_to = assigned_to.into();
    }

    pub fn set_due_date(&self, due_date: impl Into<String>) {
        self.ui().form.due_date = due_date.into();
    }

    pub(crate) fn reset_form(&self) {
        self.ui().form = TodoDraft::default();
    }

    pub fn filter(&self) -> FilterMode {
        self.ui().filter
    }

    pub fn set_filter(&self, filter: FilterMode) {
        self.ui().filter = filter;
    }

    pub fn error_text(&self) -> Option<String> {
        self.ui().error_text.clone()
    }

    pub(crate) fn set_error_text(&self, error_text: Option<String>) {
        self.ui().error_text = error_text;
    }

    /// 失敗をログに残し、通知キューにも積む
    pub(crate) fn report_failure(
        &self,
        action: Action,
        error: &AppError,
        started: Instant,
        todo_id: Option<i64>,
    ) {
        StructuredLogger::log_operation_error(
            action.as_str(),
            self.current_user.as_str(),
            error,
            elapsed_ms(started),
            todo_id,
        );
        self.notifier.notify(Notification::Failure {
            action,
            message: error.user_message(),
        });
    }

    fn ui(&self) -> MutexGuard<'_, UiState> {
        self.ui.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::notification_queue;
    use domain::UserProfile;
    use infrastructure::{InMemoryTableStore, StoreOp};

    fn user(id: &str) -> UserId {
        UserId::from_string(id).unwrap()
    }

    #[tokio::test]
    async fn test_editing_task_clears_error_text() {
        let (sender, _receiver) = notification_queue(8);
        let board = TodoBoard::new(Arc::new(InMemoryTableStore::default()), user("u1"), sender);
        board.set_error_text(Some("Please fill in all fields.".to_string()));

        board.set_assigned_to("u2");
        assert!(board.error_text().is_some());

        board.set_task("Buy milk");
        assert!(board.error_text().is_none());
        assert_eq!(board.form(), TodoDraft::new("Buy milk", "u2", ""));
    }

    #[tokio::test]
    async fn test_directory_failure_is_surfaced() {
        // Arrange
        let store = InMemoryTableStore::default();
        store
            .seed_profiles(vec![UserProfile::new(user("u1"), "one@example.com")])
            .await;
        store.fail_next(StoreOp::ListProfiles, "JWT expired").await;
        let (sender, mut receiver) = notification_queue(8);
        let board = TodoBoard::new(Arc::new(store), user("u1"), sender);

        // Act
        let result = board.load_directory().await;

        // Assert: インラインエラーと通知の両方に出る
        assert!(result.is_err());
        assert_eq!(board.error_text().as_deref(), Some("JWT expired"));
        assert_eq!(
            receiver.drain(),
            vec![Notification::Failure {
                action: Action::LoadDirectory,
                message: "JWT expired".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_is_reported() {
        let store = InMemoryTableStore::default();
        store.fail_next(StoreOp::ListTodos, "network down").await;
        let (sender, mut receiver) = notification_queue(8);
        let board = TodoBoard::new(Arc::new(store), user("u1"), sender);

        assert!(board.refresh().await.is_err());
        assert!(board.cache().is_empty());
        assert!(matches!(
            receiver.try_recv(),
            Some(Notification::Failure {
                action: Action::Refresh,
                ..
            })
        ));
        // 再取得の失敗はインラインエラーには出さない
        assert!(board.error_text().is_none());
    }

    #[test]
    fn test_filter_defaults_to_all() {
        let (sender, _receiver) = notification_queue(1);
        let board = TodoBoard::new(Arc::new(InMemoryTableStore::default()), user("u1"), sender);

        assert_eq!(board.filter(), FilterMode::All);
        board.set_filter(FilterMode::Overdue);
        assert_eq!(board.filter(), FilterMode::Overdue);
    }
}
