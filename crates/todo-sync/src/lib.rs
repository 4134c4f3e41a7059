//! 共有 Todo ボードのクライアント側同期
//!
//! リモートのテーブルストアをローカルキャッシュに写し、変更フィードを
//! 受けるたびに全件を再取得して整合させる。作成・完了切替・削除は
//! ストアへ書き込んだ後、ローカルキャッシュにも即時反映する。

pub mod board;
pub mod cache;
pub mod component;
pub mod directory;
pub mod listener;
pub mod mutations;
pub mod notifications;
pub mod view;

pub use board::*;
pub use cache::*;
pub use component::*;
pub use directory::*;
pub use listener::*;
pub use notifications::*;
pub use view::*;
