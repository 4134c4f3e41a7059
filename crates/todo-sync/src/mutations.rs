//! 作成・完了切替・削除
//!
//! どの操作もリモートへの書き込みが成功してからローカルキャッシュを
//! 書き換える。失敗時はキャッシュに触れず、ログと通知に残して `Err` を返す。

use crate::board::{elapsed_ms, TodoBoard};
use crate::notifications::Action;
use domain::{TodoDraft, TodoId, TodoItem, TodoPatch};
use shared::{AppError, AppResult, StructuredLogger};
use std::time::Instant;

impl TodoBoard {
    /// 入力値から Todo を作成する
    ///
    /// 入力不足はストアに送らず検証エラーにする。成功時はサーバーが返した行を
    /// キャッシュ末尾に追加し、フォームを空に戻す。
    pub async fn create(&self, draft: TodoDraft) -> AppResult<TodoItem> {
        let started = Instant::now();
        let user_id = self.current_user().as_str();
        StructuredLogger::log_operation_start(Action::Create.as_str(), user_id, None);

        let result = match draft.validate(self.current_user()) {
            Ok(new_todo) => self.store().insert_todo(new_todo).await,
            Err(error) => Err(AppError::from(error)),
        };

        match result {
            Ok(item) => {
                self.cache().append(item.clone());
                self.reset_form();
                self.set_error_text(None);
                StructuredLogger::log_operation_success(
                    Action::Create.as_str(),
                    user_id,
                    elapsed_ms(started),
                    Some(item.id.value()),
                );
                Ok(item)
            }
            Err(error) => {
                self.set_error_text(Some(error.user_message()));
                self.report_failure(Action::Create, &error, started, None);
                Err(error)
            }
        }
    }

    /// 現在のフォーム内容で作成する
    pub async fn submit_form(&self) -> AppResult<TodoItem> {
        self.create(self.form()).await
    }

    /// 完了フラグを反転する
    ///
    /// 反映するのはサーバーが返した値。他クライアントと同時に切り替えた場合でも
    /// ローカルの予想ではなくサーバーの値に収束する。
    pub async fn toggle_completion(&self, id: TodoId, is_complete: bool) -> AppResult<bool> {
        let started = Instant::now();
        let user_id = self.current_user().as_str();
        StructuredLogger::log_operation_start(Action::Toggle.as_str(), user_id, Some(id.value()));

        match self
            .store()
            .update_todo(id, TodoPatch::completion(!is_complete))
            .await
        {
            Ok(updated) => {
                self.cache().set_completion(id, updated.is_complete);
                StructuredLogger::log_operation_success(
                    Action::Toggle.as_str(),
                    user_id,
                    elapsed_ms(started),
                    Some(id.value()),
                );
                Ok(updated.is_complete)
            }
            Err(error) => {
                self.report_failure(Action::Toggle, &error, started, Some(id.value()));
                Err(error)
            }
        }
    }

    /// 削除する。ストアがエラーを返した場合は必ず `Err` を返す。
    pub async fn delete_item(&self, id: TodoId) -> AppResult<()> {
        let started = Instant::now();
        let user_id = self.current_user().as_str();
        StructuredLogger::log_operation_start(Action::Delete.as_str(), user_id, Some(id.value()));

        match self.store().delete_todo(id).await {
            Ok(()) => {
                self.cache().remove(id);
                StructuredLogger::log_operation_success(
                    Action::Delete.as_str(),
                    user_id,
                    elapsed_ms(started),
                    Some(id.value()),
                );
                Ok(())
            }
            Err(error) => {
                self.report_failure(Action::Delete, &error, started, Some(id.value()));
                Err(error)
            }
        }
    }
}
