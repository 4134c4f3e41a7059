use crate::board::{elapsed_ms, TodoBoard};
use crate::listener::{ChangeListener, ListenerHandle, ListenerStats};
use crate::notifications::{notification_queue, Action, NotificationReceiver};
use domain::UserId;
use infrastructure::RemoteTableStore;
use shared::{operation_span, Config};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Instrument};

/// 認証セッション。コンポーネントの生存期間中、ユーザー ID は変わらない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: UserId,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

/// Todo ボードのマウント単位
///
/// マウントで購読を 1 つだけ開き、アンマウント（またはドロップ）で一度だけ解放する。
pub struct TodoListComponent {
    board: Arc<TodoBoard>,
    listener: Option<ListenerHandle>,
}

impl TodoListComponent {
    /// 購読開始・ディレクトリ読込・初回取得を行う
    ///
    /// 購読を先に開くので、初回取得との間の変更も取りこぼさない。
    /// いずれの失敗もログと通知に出すだけで、マウント自体は成功する。
    pub async fn mount(
        store: Arc<dyn RemoteTableStore>,
        session: &Session,
        config: &Config,
    ) -> (Self, NotificationReceiver) {
        let span = operation_span("mount", session.user_id().as_str());
        Self::mount_inner(store, session, config)
            .instrument(span)
            .await
    }

    async fn mount_inner(
        store: Arc<dyn RemoteTableStore>,
        session: &Session,
        config: &Config,
    ) -> (Self, NotificationReceiver) {
        let (sender, receiver) = notification_queue(config.notification_capacity);
        let board = Arc::new(TodoBoard::new(
            store.clone(),
            session.user_id().clone(),
            sender,
        ));

        let started = Instant::now();
        let listener = match store.subscribe_todo_changes().await {
            Ok(subscription) => Some(ChangeListener::spawn(board.clone(), subscription)),
            Err(error) => {
                board.report_failure(Action::Subscribe, &error, started, None);
                None
            }
        };

        // 失敗はボード側で記録済み
        let _ = board.load_directory().await;
        let _ = board.refresh().await;

        info!(
            todos_table = %config.todos_table,
            live = listener.is_some(),
            rows = board.cache().len(),
            duration_ms = elapsed_ms(started),
            "todo board mounted"
        );

        (Self { board, listener }, receiver)
    }

    pub fn board(&self) -> &Arc<TodoBoard> {
        &self.board
    }

    /// 変更フィードを受信中か
    pub fn is_live(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|listener| listener.is_running())
    }

    /// 購読を解放する。二度目以降は何もせず `None`。
    pub async fn unmount(&mut self) -> Option<ListenerStats> {
        let mut listener = self.listener.take()?;
        let stats = listener.shutdown().await;
        info!(
            user_id = %self.board.current_user(),
            events = stats.map(|s| s.events).unwrap_or_default(),
            "todo board unmounted"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::Notification;
    use domain::{TodoDraft, UserProfile};
    use infrastructure::{InMemoryTableStore, StoreOp};

    fn user(id: &str) -> UserId {
        UserId::from_string(id).unwrap()
    }

    #[tokio::test]
    async fn test_mount_loads_directory_and_todos() {
        // Arrange: 既存の Todo とプロフィール
        let store = InMemoryTableStore::default();
        store
            .seed_profiles(vec![UserProfile::new(user("u1"), "one@example.com")])
            .await;
        store
            .insert_todo(
                TodoDraft::new("Existing", "u1", "2024-01-01")
                    .validate(&user("u2"))
                    .unwrap(),
            )
            .await
            .unwrap();

        // Act
        let (mut component, _receiver) = TodoListComponent::mount(
            Arc::new(store.clone()),
            &Session::new(user("u1")),
            &Config::default(),
        )
        .await;

        // Assert
        assert_eq!(component.board().cache().len(), 1);
        assert!(component.board().directory().is_loaded());
        assert!(component.is_live());
        assert_eq!(store.live_subscriptions(), 1);

        component.unmount().await;
    }

    #[tokio::test]
    async fn test_unmount_twice_is_noop() {
        let store = InMemoryTableStore::default();
        let (mut component, _receiver) = TodoListComponent::mount(
            Arc::new(store.clone()),
            &Session::new(user("u1")),
            &Config::default(),
        )
        .await;

        assert!(component.unmount().await.is_some());
        assert!(component.unmount().await.is_none());

        assert_eq!(store.live_subscriptions(), 0);
        assert_eq!(store.opened_subscriptions(), 1);
        assert!(!component.is_live());
    }

    #[tokio::test]
    async fn test_subscribe_failure_mounts_without_live_updates() {
        let store = InMemoryTableStore::default();
        store.fail_next(StoreOp::Subscribe, "realtime disabled").await;

        let (mut component, mut receiver) = TodoListComponent::mount(
            Arc::new(store.clone()),
            &Session::new(user("u1")),
            &Config::default(),
        )
        .await;

        assert!(!component.is_live());
        assert_eq!(
            receiver.try_recv(),
            Some(Notification::Failure {
                action: Action::Subscribe,
                message: "realtime disabled".to_string(),
            })
        );
        assert!(component.unmount().await.is_none());
    }
}
