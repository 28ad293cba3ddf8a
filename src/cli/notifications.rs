//! docket notifications command implementation
//!
//! One-shot mode prints the current list. `--watch` keeps the ticker running,
//! refetches tasks on the same interval and prints notifications as they
//! first appear, until Ctrl-C.

use std::collections::HashSet;

use chrono::Utc;

use super::Session;
use crate::error::Result;
use crate::events::Event;
use crate::notification::{Notification, NotificationPriority};
use crate::output::{emit_success, HumanOutput};
use crate::task::TaskFilter;

#[derive(serde::Serialize)]
struct NotificationReport<'a> {
    user: &'a str,
    total: usize,
    unread: usize,
    notifications: Vec<&'a Notification>,
}

pub async fn run(session: &mut Session, watch: bool, unread_only: bool) -> Result<()> {
    let _ = session.load(&TaskFilter::default()).await?;
    let notifications = session.desk.scan_notifications(Utc::now());

    let mut seen = HashSet::new();
    let _ = raise_new(session, &notifications, &mut seen);
    emit_list(session, "notifications", &notifications, unread_only)?;

    if watch {
        watch_loop(session, unread_only, seen).await?;
    }
    Ok(())
}

async fn watch_loop(
    session: &mut Session,
    unread_only: bool,
    mut seen: HashSet<String>,
) -> Result<()> {
    let mut updates = session.desk.center().subscribe();
    session.desk.start_ticker();

    let mut refresh = tokio::time::interval(session.config.notifications.scan_interval());
    refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; tasks were just loaded.
    refresh.tick().await;

    tracing::info!(
        interval_secs = session.config.notifications.scan_interval_secs,
        "watching notifications"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = updates.borrow_and_update().clone();
                let fresh = raise_new(session, &current, &mut seen);
                if !fresh.is_empty() {
                    emit_list(session, "notifications watch", &fresh, unread_only)?;
                }
            }
            _ = refresh.tick(), if !session.offline => {
                match session.desk.refresh(&TaskFilter::default()).await {
                    Ok(_) => session.save_snapshot(),
                    Err(err) => tracing::warn!(error = %err, "refresh failed; keeping current tasks"),
                }
            }
        }
    }

    session.desk.dispose();
    Ok(())
}

/// Emit `notification_raised` for ids not seen before and return them.
/// Ids that dropped out are forgotten so a recurrence counts as new.
fn raise_new(
    session: &mut Session,
    current: &[Notification],
    seen: &mut HashSet<String>,
) -> Vec<Notification> {
    let live: HashSet<&str> = current.iter().map(|n| n.id.as_str()).collect();
    seen.retain(|id| live.contains(id.as_str()));

    let fresh: Vec<Notification> = current
        .iter()
        .filter(|notification| seen.insert(notification.id.clone()))
        .cloned()
        .collect();
    for notification in &fresh {
        let user = Some(session.user.clone());
        session.emit(Event::notification(user, notification));
    }
    fresh
}

fn emit_list(
    session: &Session,
    command: &str,
    notifications: &[Notification],
    unread_only: bool,
) -> Result<()> {
    let shown: Vec<&Notification> = notifications
        .iter()
        .filter(|n| !unread_only || !n.is_read)
        .collect();
    let unread = notifications.iter().filter(|n| !n.is_read).count();

    let header = if shown.is_empty() {
        "docket notifications: nothing needs attention".to_string()
    } else {
        format!("docket notifications: {} for {}", shown.len(), session.user)
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("unread", unread.to_string());
    for notification in &shown {
        human.push_detail(notification_line(notification));
    }

    let report = NotificationReport {
        user: &session.user,
        total: notifications.len(),
        unread,
        notifications: shown,
    };
    emit_success(session.output, command, &report, Some(&human))
}

fn notification_line(notification: &Notification) -> String {
    let marker = match notification.priority {
        NotificationPriority::High => "!!",
        NotificationPriority::Medium => "! ",
        NotificationPriority::Low => "  ",
    };
    format!(
        "{marker} {} {} ({})",
        notification.kind.as_str(),
        notification.message,
        notification.task_id
    )
}
