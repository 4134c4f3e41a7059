use domain::ChangeEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

/// 変更フィードの受信エラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedError {
    /// 受信が追いつかずイベントを取りこぼした
    Lagged(u64),
    /// 購読が閉じられた
    Closed,
}

type Release = Box<dyn FnOnce() + Send + Sync>;

/// 変更フィードの購読ハンドル
///
/// `close()` は何度呼んでも解放処理を一度しか実行しない。
/// ドロップ時にも `close()` が呼ばれる。
pub struct Subscription {
    channel: String,
    receiver: broadcast::Receiver<ChangeEvent>,
    release: Option<Release>,
}

impl Subscription {
    pub fn new<F>(
        channel: impl Into<String>,
        receiver: broadcast::Receiver<ChangeEvent>,
        release: F,
    ) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            channel: channel.into(),
            receiver,
            release: Some(Box::new(release)),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn is_closed(&self) -> bool {
        self.release.is_none()
    }

    /// 次の変更イベントを待つ
    pub async fn recv(&mut self) -> Result<ChangeEvent, FeedError> {
        if self.is_closed() {
            return Err(FeedError::Closed);
        }

        match self.receiver.recv().await {
            Ok(event) => Ok(event),
            Err(RecvError::Lagged(skipped)) => Err(FeedError::Lagged(skipped)),
            Err(RecvError::Closed) => Err(FeedError::Closed),
        }
    }

    /// 購読を解放する。実際に解放した場合のみ `true`。
    pub fn close(&mut self) -> bool {
        match self.release.take() {
            Some(release) => {
                release();
                debug!(channel = %self.channel, "subscription closed");
                true
            }
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("closed", &self.is_closed())
            .finish()
    }
}
