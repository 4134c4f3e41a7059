use domain::{UserId, UserProfile};
use infrastructure::RemoteTableStore;
use serde::Serialize;
use shared::AppResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// 担当者選択肢（id, 表示用メールアドレス）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssigneeOption {
    pub id: UserId,
    pub email: String,
}

/// プロフィールディレクトリのローカルコピー
///
/// マウント時に一度だけ読み込み、ユーザー ID を表示名に解決する。
#[derive(Default)]
pub struct DirectoryCache {
    profiles: RwLock<Arc<Vec<UserProfile>>>,
    loaded: AtomicBool,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// ディレクトリを読み込む。失敗時は以前の内容（通常は空）のまま。
    pub async fn load(&self, store: &dyn RemoteTableStore) -> AppResult<usize> {
        let profiles = store.list_profiles().await?;
        let count = profiles.len();

        *self.profiles.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(profiles);
        self.loaded.store(true, Ordering::SeqCst);
        Ok(count)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn profiles(&self) -> Arc<Vec<UserProfile>> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn email_for(&self, user_id: &UserId) -> Option<String> {
        self.profiles()
            .iter()
            .find(|profile| &profile.id == user_id)
            .map(|profile| profile.email.clone())
    }

    /// 表示ラベル。ディレクトリに無い ID は生の ID をそのまま返す。
    pub fn label_for(&self, user_id: &UserId) -> String {
        self.email_for(user_id)
            .unwrap_or_else(|| user_id.as_str().to_string())
    }

    pub fn options(&self) -> Vec<AssigneeOption> {
        self.profiles()
            .iter()
            .map(|profile| AssigneeOption {
                id: profile.id.clone(),
                email: profile.email.clone(),
            })
            .collect()
    }
}
