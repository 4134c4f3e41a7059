use anyhow::{anyhow, Context, Result};
use domain::{FilterMode, NewTodo, TodoDraft, UserId, UserProfile};
use infrastructure::{InMemoryTableStore, RemoteTableStore};
use shared::{init_tracing, Config};
use std::sync::Arc;
use std::time::Duration;
use todo_sync::{Session, TodoListComponent};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(config.log_format).map_err(|e| anyhow!("failed to initialize tracing: {e}"))?;

    info!(environment = %config.environment, "starting todo sync demo");

    let me = UserId::from_string("u1")?;
    let partner = UserId::from_string("u2")?;

    let store = InMemoryTableStore::from_config(&config);
    store
        .seed_profiles(vec![
            UserProfile::new(me.clone(), "me@example.com"),
            UserProfile::new(partner.clone(), "partner@example.com"),
        ])
        .await;

    let (mut component, mut notifications) =
        TodoListComponent::mount(Arc::new(store.clone()), &Session::new(me.clone()), &config).await;
    let board = component.board().clone();

    // 別クライアントが自分宛てのタスクを作る
    let today = chrono::Utc::now().date_naive();
    let remote = store
        .insert_todo(NewTodo {
            task: "Pick up groceries".to_string(),
            owner_id: partner.clone(),
            assignee_id: me.clone(),
            due_date: today,
        })
        .await?;

    if let Ok(Some(notification)) =
        tokio::time::timeout(Duration::from_secs(1), notifications.recv()).await
    {
        println!("notice: {notification}");
    }

    board.set_task("Walk the dog");
    board.set_assigned_to(partner.as_str());
    board.set_due_date(today.format(domain::DUE_DATE_FORMAT).to_string());
    let created = board.submit_form().await?;
    board.toggle_completion(remote.id, remote.is_complete).await?;

    // 入力不足はインラインエラーになる
    if board.create(TodoDraft::default()).await.is_err() {
        println!("form error: {}", board.error_text().unwrap_or_default());
    }

    for mode in FilterMode::ALL_MODES {
        board.set_filter(mode);
        let view = board.view();
        println!("[{}] {} item(s)", mode.label(), view.rows.len());
        for row in &view.rows {
            println!(
                "  #{} {} -> {} (due {}){}",
                row.id,
                row.task,
                row.assignee_label.as_deref().unwrap_or("-"),
                row.due_label.as_deref().unwrap_or("-"),
                if row.is_complete { " done" } else { "" }
            );
        }
    }

    board.delete_item(created.id).await?;

    for notification in notifications.drain() {
        println!("notice: {notification}");
    }

    if let Some(stats) = component.unmount().await {
        info!(
            events = stats.events,
            notifications = stats.notifications,
            "todo sync demo finished"
        );
    }

    Ok(())
}
