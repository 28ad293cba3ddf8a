mod support;

use chrono::{DateTime, Duration, TimeZone, Utc};
use docket::center::NotificationCenter;
use docket::config::NotificationsConfig;
use docket::notification::{DeriveWindow, NotificationKind, NotificationPriority};
use docket::store::TaskStore;
use docket::task::{TaskPatch, TaskStatus};

use support::fixture_tasks;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 6, 9, 0, 0).unwrap()
}

#[test]
fn due_soon_turns_overdue_as_time_passes() {
    let now = start();
    let store = TaskStore::with_tasks(fixture_tasks(now));
    let center = NotificationCenter::default();

    let first = center.scan(&store, now);
    let t2 = first.iter().find(|n| n.task_id == "T2").expect("due soon");
    assert_eq!(t2.kind, NotificationKind::DueSoon);
    assert_eq!(t2.priority, NotificationPriority::Medium);
    assert_eq!(t2.message, "\"Draft settlement memo\" is due in 2 days");

    let later = center.scan(&store, now + Duration::hours(20));
    let t2 = later.iter().find(|n| n.task_id == "T2").expect("due soon");
    assert_eq!(t2.message, "\"Draft settlement memo\" is due tomorrow");
    assert_eq!(t2.priority, NotificationPriority::Medium);

    let at_due = center.scan(&store, now + Duration::hours(30));
    let t2 = at_due.iter().find(|n| n.task_id == "T2").expect("due soon");
    assert_eq!(t2.message, "\"Draft settlement memo\" is due today");
    assert_eq!(t2.priority, NotificationPriority::High);

    let past = center.scan(&store, now + Duration::hours(31));
    let kinds: Vec<_> = past
        .iter()
        .filter(|n| n.task_id == "T2")
        .map(|n| n.kind)
        .collect();
    assert_eq!(kinds, vec![NotificationKind::Overdue]);
    // The completion an hour before start has aged out of the 24h window.
    assert!(past.iter().all(|n| n.kind != NotificationKind::Completed));
}

#[test]
fn repeated_scans_are_stable() {
    let now = start();
    let store = TaskStore::with_tasks(fixture_tasks(now));
    let center = NotificationCenter::default();

    let first = center.scan(&store, now);
    let second = center.scan(&store, now);
    assert_eq!(first, second);
}

#[test]
fn read_state_follows_the_id_not_the_message() {
    let now = start();
    let store = TaskStore::with_tasks(fixture_tasks(now));
    let center = NotificationCenter::default();
    let _ = center.scan(&store, now);
    center.mark_read("overdue-T1").expect("mark read");

    // A day later the overdue message changes but the id does not.
    let later = center.scan(&store, now + Duration::days(1));
    let overdue = later.iter().find(|n| n.id == "overdue-T1").expect("overdue");
    assert_eq!(overdue.message, "\"Respond to discovery\" is overdue by 3 days");
    assert!(overdue.is_read);
}

#[test]
fn completing_a_task_swaps_its_notification() {
    let now = start();
    let store = TaskStore::with_tasks(fixture_tasks(now));
    let center = NotificationCenter::default();
    let _ = center.scan(&store, now);
    center.dismiss("overdue-T1").expect("dismiss");

    let _ = store
        .apply_optimistic("T1", &TaskPatch::status(TaskStatus::Completed))
        .expect("apply");
    let after = center.scan(&store, Utc::now());
    let kinds: Vec<_> = after
        .iter()
        .filter(|n| n.task_id == "T1")
        .map(|n| n.kind)
        .collect();
    assert_eq!(kinds, vec![NotificationKind::Completed]);
}

#[test]
fn configured_window_narrows_due_soon() {
    let now = start();
    let store = TaskStore::with_tasks(fixture_tasks(now));
    let config = NotificationsConfig {
        due_soon_days: 0,
        ..NotificationsConfig::default()
    };
    let center = NotificationCenter::new(DeriveWindow::from(&config));

    let notifications = center.scan(&store, now);
    assert!(notifications.iter().all(|n| n.kind != NotificationKind::DueSoon));
}

#[test]
fn wire_shape_uses_type_field() {
    let now = start();
    let store = TaskStore::with_tasks(fixture_tasks(now));
    let center = NotificationCenter::default();
    let notifications = center.scan(&store, now);

    let value = serde_json::to_value(&notifications[0]).expect("serialize");
    assert_eq!(value["id"], "overdue-T1");
    assert_eq!(value["type"], "overdue");
    assert_eq!(value["task_id"], "T1");
    assert_eq!(value["task_title"], "Respond to discovery");
    assert_eq!(value["priority"], "high");
    assert_eq!(value["is_read"], false);
    assert!(value.get("kind").is_none());
}
