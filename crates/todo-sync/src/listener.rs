use crate::board::TodoBoard;
use crate::notifications::Notification;
use domain::ChangeEvent;
use infrastructure::{FeedError, Subscription};
use shared::StructuredLogger;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// リスナー終了時の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub events: u64,
    pub notifications: u64,
    pub refresh_failures: u64,
    pub lagged: u64,
}

/// `todos` の変更フィードを専用タスクで消費する
///
/// イベントの内容は比較せず、届くたびに全件再取得する。
/// 自分が担当者の新規作成だけは通知キューに積む。
pub struct ChangeListener {
    board: Arc<TodoBoard>,
    subscription: Subscription,
    shutdown: watch::Receiver<bool>,
    stats: ListenerStats,
}

impl ChangeListener {
    /// 購読を受け取り、消費タスクを起動する
    pub fn spawn(board: Arc<TodoBoard>, subscription: Subscription) -> ListenerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let listener = ChangeListener {
            board,
            subscription,
            shutdown: shutdown_rx,
            stats: ListenerStats::default(),
        };

        ListenerHandle {
            shutdown: shutdown_tx,
            task: Some(tokio::spawn(listener.run())),
        }
    }

    async fn run(mut self) -> ListenerStats {
        info!(channel = %self.subscription.channel(), "change listener started");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.changed() => break,
                received = self.subscription.recv() => match received {
                    Ok(event) => self.handle_event(event).await,
                    Err(FeedError::Lagged(skipped)) => {
                        // 取りこぼしても全件再取得すれば追いつく
                        warn!(skipped, "change feed lagged, refreshing");
                        self.stats.lagged += skipped;
                        self.refresh().await;
                    }
                    Err(FeedError::Closed) => {
                        warn!("change feed closed by store");
                        break;
                    }
                },
            }
        }

        self.subscription.close();
        info!(events = self.stats.events, "change listener stopped");
        self.stats
    }

    async fn handle_event(&mut self, event: ChangeEvent) {
        self.stats.events += 1;
        StructuredLogger::log_change_received(
            self.board.current_user().as_str(),
            event.kind().as_str(),
            event.todo_id().map(|id| id.value()),
        );

        if let ChangeEvent::Insert { new } = &event {
            if new.is_assigned_to(self.board.current_user()) {
                debug!(todo_id = %new.id, "new task assigned to current user");
                let queued = self.board.notifier().notify(Notification::AssignedToYou {
                    todo_id: new.id,
                    task: new.task.clone(),
                });
                if queued {
                    self.stats.notifications += 1;
                }
            }
        }

        self.refresh().await;
    }

    async fn refresh(&mut self) {
        // 失敗はボード側でログと通知に出ているので、ここではループを続けるだけ
        if self.board.refresh().await.is_err() {
            self.stats.refresh_failures += 1;
        }
    }
}

/// 消費タスクへのハンドル
///
/// `shutdown()` は二度目以降は何もしない。ハンドルをドロップした場合も
/// タスクに停止を伝え、タスク側で購読を解放する。
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<ListenerStats>>,
}

impl ListenerHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// 停止を伝えてタスクの終了を待つ。既に停止済みなら `None`。
    pub async fn shutdown(&mut self) -> Option<ListenerStats> {
        let task = self.task.take()?;
        // 受信側が既に終了していても構わない
        let _ = self.shutdown.send(true);

        match task.await {
            Ok(stats) => Some(stats),
            Err(error) => {
                warn!(error = %error, "change listener task ended abnormally");
                None
            }
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.shutdown.send(true);
        }
    }
}
