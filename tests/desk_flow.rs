mod support;

use chrono::Utc;
use docket::config::NotificationsConfig;
use docket::desk::Desk;
use docket::error::Error;
use docket::notification::{NotificationKind, NotificationPriority};
use docket::task::{TaskDraft, TaskFilter, TaskPatch, TaskPriority, TaskStatus};

use support::{fixture_tasks, MockBackend};

async fn loaded_desk(user: &str) -> (Desk<MockBackend>, MockBackend) {
    let backend = MockBackend::with_tasks(fixture_tasks(Utc::now()));
    let desk = Desk::new(backend.clone(), user, &NotificationsConfig::default());
    let _ = desk.refresh(&TaskFilter::default()).await.expect("refresh");
    (desk, backend)
}

fn kinds_for(desk: &Desk<MockBackend>, task_id: &str) -> Vec<NotificationKind> {
    desk.notifications()
        .into_iter()
        .filter(|n| n.task_id == task_id)
        .map(|n| n.kind)
        .collect()
}

#[tokio::test]
async fn overdue_task_completed_leaves_only_completed_notification() {
    let (desk, backend) = loaded_desk("u-1").await;

    let before = desk.notifications();
    let overdue = before
        .iter()
        .find(|n| n.task_id == "T1")
        .expect("overdue notification");
    assert_eq!(overdue.kind, NotificationKind::Overdue);
    assert_eq!(overdue.priority, NotificationPriority::High);
    assert_eq!(overdue.id, "overdue-T1");

    let task = desk
        .set_status("T1", TaskStatus::Completed)
        .await
        .expect("complete");
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.completed_at.is_some());
    assert_eq!(desk.task("T1").expect("task"), task);
    assert_eq!(backend.task("T1").expect("server copy"), task);

    let after = desk.scan_notifications(Utc::now());
    let for_t1: Vec<_> = after.iter().filter(|n| n.task_id == "T1").collect();
    assert_eq!(for_t1.len(), 1);
    assert_eq!(for_t1[0].kind, NotificationKind::Completed);
    assert_eq!(for_t1[0].priority, NotificationPriority::Low);
}

#[tokio::test]
async fn completion_from_a_fast_server_clock_still_notifies() {
    let (desk, _backend) = loaded_desk("u-1").await;
    let patch = TaskPatch::status(TaskStatus::Completed);
    let mut server = desk.task("T1").expect("task");
    server.status = TaskStatus::Completed;
    server.completed_at = Some(Utc::now() + chrono::Duration::seconds(5));

    let reply = server.clone();
    let committed = desk
        .reconcile("T1", &patch, async move { Ok::<_, std::io::Error>(reply) })
        .await
        .expect("complete");
    assert_eq!(committed, server);
    assert_eq!(kinds_for(&desk, "T1"), vec![NotificationKind::Completed]);
}

#[tokio::test]
async fn refresh_derives_every_kind_in_priority_order() {
    let (desk, _backend) = loaded_desk("u-1").await;

    let ids: Vec<String> = desk.notifications().into_iter().map(|n| n.id).collect();
    assert_eq!(
        ids,
        vec![
            "overdue-T1".to_string(),
            "due_soon-T2".to_string(),
            "completed-T3".to_string(),
        ]
    );
    assert!(kinds_for(&desk, "T4").is_empty());
}

#[tokio::test]
async fn failed_status_change_rolls_back_and_keeps_notifications() {
    let (desk, backend) = loaded_desk("u-1").await;
    let before = desk.task("T1").expect("task");
    backend.fail_with(503);

    let err = desk
        .set_status("T1", TaskStatus::Completed)
        .await
        .expect_err("sync failure");
    match &err {
        Error::Sync { task_id, .. } => assert_eq!(task_id, "T1"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.exit_code(), 3);
    assert_eq!(desk.task("T1").expect("task"), before);
    assert_eq!(kinds_for(&desk, "T1"), vec![NotificationKind::Overdue]);
}

#[tokio::test]
async fn change_is_visible_while_backend_is_pending() {
    let (desk, backend) = loaded_desk("u-1").await;
    let gate = backend.hold();

    let observe = async {
        let during = desk.task("T2").expect("task");
        assert_eq!(during.status, TaskStatus::Review);
        assert!(!desk.pending().is_empty());
        gate.notify_one();
    };
    let (outcome, ()) = tokio::join!(desk.set_status("T2", TaskStatus::Review), observe);

    let task = outcome.expect("confirmed");
    assert_eq!(task.status, TaskStatus::Review);
    assert!(desk.pending().is_empty());
}

#[tokio::test]
async fn unknown_task_never_reaches_backend() {
    let (desk, backend) = loaded_desk("u-1").await;
    let err = desk
        .set_status("T404", TaskStatus::Completed)
        .await
        .expect_err("not found");
    assert!(matches!(err, Error::NotFound(id) if id == "T404"));
    assert_eq!(backend.calls(), vec!["fetch_tasks".to_string()]);
}

#[tokio::test]
async fn invalid_patch_is_rejected_before_backend() {
    let (desk, backend) = loaded_desk("u-1").await;
    let patch = TaskPatch {
        title: Some("   ".to_string()),
        ..TaskPatch::default()
    };
    let err = desk.update_task("T4", &patch).await.expect_err("invalid");
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn server_fields_are_committed_exactly() {
    let (desk, _backend) = loaded_desk("u-2").await;
    let patch = TaskPatch {
        priority: Some(TaskPriority::Urgent),
        ..TaskPatch::default()
    };
    let task = desk.update_task("T4", &patch).await.expect("update");
    // The service fills in the display name it knows for u-2.
    assert_eq!(task.assignee_name.as_deref(), Some("Ben Okafor"));
    assert_eq!(desk.task("T4").expect("task"), task);
}

#[tokio::test]
async fn reassigning_to_current_user_raises_assigned() {
    let (desk, _backend) = loaded_desk("u-1").await;
    let task = desk.reassign("T4", "u-1", None).await.expect("reassign");
    assert_eq!(task.assigned_to, "u-1");
    assert_eq!(task.assignee_name.as_deref(), Some("Ana Duarte"));

    let assigned = desk
        .notifications()
        .into_iter()
        .find(|n| n.kind == NotificationKind::Assigned)
        .expect("assigned notification");
    assert_eq!(assigned.id, "assigned-T4");
    assert_eq!(assigned.priority, NotificationPriority::Medium);

    // Handing it on clears the assignment notification.
    let _ = desk.reassign("T4", "u-2", None).await.expect("reassign");
    assert!(kinds_for(&desk, "T4").is_empty());
}

#[tokio::test]
async fn reassigning_to_someone_else_is_silent() {
    let (desk, _backend) = loaded_desk("u-1").await;
    let _ = desk.reassign("T1", "u-2", None).await.expect("reassign");
    assert!(!kinds_for(&desk, "T1").contains(&NotificationKind::Assigned));
}

#[tokio::test]
async fn create_waits_for_server_id() {
    let (desk, backend) = loaded_desk("u-1").await;
    let draft = TaskDraft {
        title: "Prepare witness list".to_string(),
        assigned_to: "u-1".to_string(),
        due_date: Some(Utc::now() + chrono::Duration::hours(5)),
        ..TaskDraft::default()
    };
    let task = desk.create_task(&draft).await.expect("create");
    assert_eq!(task.id, "N1");
    assert_eq!(desk.task("N1").expect("task"), task);
    assert!(backend.task("N1").is_some());

    let kinds = kinds_for(&desk, "N1");
    assert!(kinds.contains(&NotificationKind::DueSoon));
    assert!(kinds.contains(&NotificationKind::Assigned));
}

#[tokio::test]
async fn create_rejects_blank_title_locally() {
    let (desk, backend) = loaded_desk("u-1").await;
    let draft = TaskDraft {
        title: String::new(),
        assigned_to: "u-1".to_string(),
        ..TaskDraft::default()
    };
    assert!(matches!(
        desk.create_task(&draft).await,
        Err(Error::Validation(_))
    ));
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn delete_confirmed_and_rolled_back() {
    let (desk, backend) = loaded_desk("u-1").await;

    let removed = desk.delete_task("T4").await.expect("delete");
    assert_eq!(removed.id, "T4");
    assert!(matches!(desk.task("T4"), Err(Error::NotFound(_))));

    backend.fail_with(500);
    let err = desk.delete_task("T1").await.expect_err("rollback");
    assert!(matches!(err, Error::Sync { .. }));
    assert_eq!(desk.task("T1").expect("restored").id, "T1");
    assert_eq!(kinds_for(&desk, "T1"), vec![NotificationKind::Overdue]);
}

#[tokio::test]
async fn read_state_survives_status_changes_elsewhere() {
    let (desk, _backend) = loaded_desk("u-1").await;
    desk.mark_read("overdue-T1").expect("mark read");
    let _ = desk
        .set_status("T2", TaskStatus::InProgress)
        .await
        .expect("status");

    let overdue = desk
        .notifications()
        .into_iter()
        .find(|n| n.id == "overdue-T1")
        .expect("still overdue");
    assert!(overdue.is_read);
    assert_eq!(desk.center().unread_count(), 2);
}

#[tokio::test]
async fn dispose_stops_ticker_and_rejects_edits() {
    let (desk, _backend) = loaded_desk("u-1").await;
    desk.start_ticker();
    assert!(desk.ticker_running());

    desk.dispose();
    assert!(!desk.ticker_running());
    let err = desk
        .set_status("T1", TaskStatus::Completed)
        .await
        .expect_err("disposed");
    assert!(matches!(err, Error::StoreDisposed));
}

#[tokio::test]
async fn dispose_during_flight_discards_result() {
    let (desk, backend) = loaded_desk("u-1").await;
    let gate = backend.hold();

    let teardown = async {
        desk.dispose();
        gate.notify_one();
    };
    let (outcome, ()) = tokio::join!(desk.set_status("T1", TaskStatus::Completed), teardown);
    assert!(matches!(outcome, Err(Error::StoreDisposed)));
}
