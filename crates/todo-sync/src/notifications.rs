use domain::TodoId;
use std::fmt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// 失敗したユーザー操作・バックグラウンド処理の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    LoadDirectory,
    Refresh,
    Subscribe,
    Create,
    Toggle,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::LoadDirectory => "load_directory",
            Action::Refresh => "refresh",
            Action::Subscribe => "subscribe",
            Action::Create => "create",
            Action::Toggle => "toggle_completion",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ユーザーに見せる通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// 自分が担当者の Todo が新規作成された
    AssignedToYou { todo_id: TodoId, task: String },
    /// 操作の失敗
    Failure { action: Action, message: String },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::AssignedToYou { .. } => {
                f.write_str("A new task has been assigned to you!")
            }
            Notification::Failure { action, message } => write!(f, "{action} failed: {message}"),
        }
    }
}

/// 通知キューを作成する
pub fn notification_queue(capacity: usize) -> (NotificationSender, NotificationReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (NotificationSender { tx }, NotificationReceiver { rx })
}

/// 通知の送信側。送信はブロックしない。
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::Sender<Notification>,
}

impl NotificationSender {
    /// 通知を積む。キューが満杯・受信側終了なら捨てて `false`。
    pub fn notify(&self, notification: Notification) -> bool {
        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                warn!(notification = %dropped, "notification queue full, dropping");
                false
            }
            Err(TrySendError::Closed(dropped)) => {
                debug!(notification = %dropped, "notification receiver gone");
                false
            }
        }
    }
}

#[derive(Debug)]
pub struct NotificationReceiver {
    rx: mpsc::Receiver<Notification>,
}

impl NotificationReceiver {
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }

    /// 溜まっている通知をすべて取り出す
    pub fn drain(&mut self) -> Vec<Notification> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
