//! Notifications derived from task due dates and completion.
//!
//! Derivation is a pure projection over a slice of tasks and a fixed `now`:
//! it never mutates tasks, and the same inputs always produce the same list in
//! the same order. Ids are `{type}-{task_id}` so successive passes can be
//! merged by id.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::NotificationsConfig;
use crate::task::Task;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Overdue,
    DueSoon,
    Completed,
    Assigned,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Overdue => "overdue",
            NotificationKind::DueSoon => "due_soon",
            NotificationKind::Completed => "completed",
            NotificationKind::Assigned => "assigned",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
}

impl NotificationPriority {
    pub fn rank(self) -> u8 {
        match self {
            NotificationPriority::High => 3,
            NotificationPriority::Medium => 2,
            NotificationPriority::Low => 1,
        }
    }
}

impl fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Medium => "medium",
            NotificationPriority::High => "high",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub task_id: String,
    pub task_title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub priority: NotificationPriority,
}

impl Notification {
    fn new(
        kind: NotificationKind,
        task: &Task,
        message: String,
        timestamp: DateTime<Utc>,
        priority: NotificationPriority,
    ) -> Self {
        Self {
            id: notification_id(kind, &task.id),
            kind,
            task_id: task.id.clone(),
            task_title: task.title.clone(),
            message,
            timestamp,
            is_read: false,
            priority,
        }
    }
}

pub fn notification_id(kind: NotificationKind, task_id: &str) -> String {
    format!("{}-{}", kind.as_str(), task_id)
}

/// An assignment remembered by the notification center.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub user: String,
    pub at: DateTime<Utc>,
}

/// Time windows that decide which tasks qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeriveWindow {
    /// Largest day delta (rounded up) still reported as due soon.
    pub due_soon_days: i64,
    pub completed_within: Duration,
    pub assigned_within: Duration,
}

impl Default for DeriveWindow {
    fn default() -> Self {
        Self {
            due_soon_days: 2,
            completed_within: Duration::hours(24),
            assigned_within: Duration::hours(24),
        }
    }
}

impl From<&NotificationsConfig> for DeriveWindow {
    fn from(config: &NotificationsConfig) -> Self {
        Self {
            due_soon_days: i64::from(config.due_soon_days),
            completed_within: Duration::hours(i64::from(config.completed_window_hours)),
            assigned_within: Duration::hours(i64::from(config.assigned_window_hours)),
        }
    }
}

/// Build the notification list for `tasks` as of `now`.
pub fn derive_notifications(
    tasks: &[Task],
    now: DateTime<Utc>,
    window: &DeriveWindow,
) -> Vec<Notification> {
    derive_with_assignments(tasks, &HashMap::new(), now, window)
}

/// Same as [`derive_notifications`], also emitting `assigned` entries for
/// recorded assignments (keyed by task id).
pub fn derive_with_assignments(
    tasks: &[Task],
    assignments: &HashMap<String, Assignment>,
    now: DateTime<Utc>,
    window: &DeriveWindow,
) -> Vec<Notification> {
    let mut notifications = Vec::new();

    for task in tasks {
        if !task.is_completed() {
            if let Some(due) = task.due_date {
                if now > due {
                    let days = (now - due).num_milliseconds().div_euclid(DAY_MS);
                    notifications.push(Notification::new(
                        NotificationKind::Overdue,
                        task,
                        format!("\"{}\" is overdue by {}", task.title, day_phrase(days)),
                        due,
                        NotificationPriority::High,
                    ));
                } else {
                    let days = ceil_days((due - now).num_milliseconds());
                    if days <= window.due_soon_days {
                        let priority = if days == 0 {
                            NotificationPriority::High
                        } else {
                            NotificationPriority::Medium
                        };
                        notifications.push(Notification::new(
                            NotificationKind::DueSoon,
                            task,
                            due_soon_message(&task.title, days),
                            due,
                            priority,
                        ));
                    }
                }
            }
        }

        if task.is_completed() {
            if let Some(completed_at) = task.completed_at {
                // A server clock running ahead puts completed_at after now.
                let age = (now - completed_at).max(Duration::zero());
                if age <= window.completed_within {
                    notifications.push(Notification::new(
                        NotificationKind::Completed,
                        task,
                        format!("\"{}\" was completed", task.title),
                        completed_at,
                        NotificationPriority::Low,
                    ));
                }
            }
        }

        if let Some(assignment) = assignments.get(&task.id) {
            let age = now - assignment.at;
            if !task.is_completed()
                && task.assigned_to == assignment.user
                && age >= Duration::zero()
                && age <= window.assigned_within
            {
                notifications.push(Notification::new(
                    NotificationKind::Assigned,
                    task,
                    format!("\"{}\" was assigned to you", task.title),
                    assignment.at,
                    NotificationPriority::Medium,
                ));
            }
        }
    }

    sort_notifications(&mut notifications);
    notifications
}

/// Highest priority first, newest first, then id for a total order.
pub fn sort_notifications(notifications: &mut [Notification]) {
    notifications.sort_by(|left, right| {
        right
            .priority
            .rank()
            .cmp(&left.priority.rank())
            .then_with(|| right.timestamp.cmp(&left.timestamp))
            .then_with(|| left.id.cmp(&right.id))
    });
}

fn ceil_days(delta_ms: i64) -> i64 {
    (delta_ms + DAY_MS - 1).div_euclid(DAY_MS)
}

fn day_phrase(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

fn due_soon_message(title: &str, days: i64) -> String {
    match days {
        0 => format!("\"{title}\" is due today"),
        1 => format!("\"{title}\" is due tomorrow"),
        _ => format!("\"{title}\" is due in {}", day_phrase(days)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap()
    }

    fn due_task(id: &str, due: DateTime<Utc>) -> Task {
        let mut task = Task::new(id, format!("Task {id}"), "u-1", now() - Duration::days(10));
        task.due_date = Some(due);
        task
    }

    fn derive(tasks: &[Task]) -> Vec<Notification> {
        derive_notifications(tasks, now(), &DeriveWindow::default())
    }

    #[test]
    fn just_past_due_is_zero_days_overdue() {
        let list = derive(&[due_task("T1", now() - Duration::milliseconds(1))]);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, NotificationKind::Overdue);
        assert_eq!(list[0].id, "overdue-T1");
        assert_eq!(list[0].priority, NotificationPriority::High);
        assert!(list[0].message.ends_with("overdue by 0 days"));
    }

    #[test]
    fn twenty_five_hours_late_is_one_day() {
        let list = derive(&[due_task("T1", now() - Duration::hours(25))]);
        assert!(list[0].message.ends_with("overdue by 1 day"));
    }

    #[test]
    fn due_now_is_high_priority_due_soon() {
        let list = derive(&[due_task("T1", now())]);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, NotificationKind::DueSoon);
        assert_eq!(list[0].priority, NotificationPriority::High);
        assert!(list[0].message.ends_with("is due today"));
    }

    #[test]
    fn due_in_exactly_two_days_is_medium() {
        let list = derive(&[due_task("T1", now() + Duration::days(2))]);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, NotificationKind::DueSoon);
        assert_eq!(list[0].priority, NotificationPriority::Medium);
        assert!(list[0].message.ends_with("is due in 2 days"));
    }

    #[test]
    fn just_beyond_window_is_silent() {
        let list = derive(&[due_task(
            "T1",
            now() + Duration::days(2) + Duration::milliseconds(1),
        )]);
        assert!(list.is_empty());
    }

    #[test]
    fn completed_tasks_never_overdue() {
        let mut task = due_task("T1", now() - Duration::days(3));
        task.status = TaskStatus::Completed;
        task.completed_at = Some(now() - Duration::hours(2));
        let list = derive(&[task]);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, NotificationKind::Completed);
        assert_eq!(list[0].priority, NotificationPriority::Low);
    }

    #[test]
    fn old_completions_drop_out() {
        let mut task = due_task("T1", now() - Duration::days(3));
        task.status = TaskStatus::Completed;
        task.completed_at = Some(now() - Duration::hours(24) - Duration::seconds(1));
        assert!(derive(&[task]).is_empty());
    }

    #[test]
    fn completion_stamped_ahead_of_local_clock_counts() {
        let mut task = due_task("T1", now() + Duration::days(3));
        task.status = TaskStatus::Completed;
        task.completed_at = Some(now() + Duration::seconds(2));
        let list = derive(&[task]);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, NotificationKind::Completed);
        assert_eq!(list[0].timestamp, now() + Duration::seconds(2));
    }

    #[test]
    fn overdue_and_due_soon_are_exclusive() {
        let tasks: Vec<Task> = (-72..=72)
            .step_by(6)
            .map(|hours| due_task(&format!("T{hours}"), now() + Duration::hours(hours)))
            .collect();
        let list = derive(&tasks);
        for task in &tasks {
            let kinds: Vec<NotificationKind> = list
                .iter()
                .filter(|n| n.task_id == task.id)
                .map(|n| n.kind)
                .collect();
            assert!(kinds.len() <= 1, "{} produced {kinds:?}", task.id);
        }
    }

    #[test]
    fn ordering_is_priority_then_newest() {
        let mut done = due_task("done", now() - Duration::days(1));
        done.status = TaskStatus::Completed;
        done.completed_at = Some(now() - Duration::hours(1));
        let tasks = vec![
            done,
            due_task("soon", now() + Duration::days(2)),
            due_task("late-old", now() - Duration::days(4)),
            due_task("late-new", now() - Duration::hours(1)),
        ];
        let ids: Vec<String> = derive(&tasks).into_iter().map(|n| n.id).collect();
        assert_eq!(
            ids,
            vec![
                "overdue-late-new",
                "overdue-late-old",
                "due_soon-soon",
                "completed-done",
            ]
        );
    }

    #[test]
    fn derivation_is_idempotent() {
        let tasks = vec![
            due_task("a", now() - Duration::hours(3)),
            due_task("b", now() + Duration::hours(3)),
            due_task("c", now() - Duration::hours(3)),
        ];
        assert_eq!(derive(&tasks), derive(&tasks));
    }

    #[test]
    fn assignment_requires_matching_user() {
        let task = Task::new("T1", "Draft", "u-2", now());
        let mut assignments = HashMap::new();
        assignments.insert(
            "T1".to_string(),
            Assignment {
                user: "u-2".to_string(),
                at: now() - Duration::minutes(5),
            },
        );
        let window = DeriveWindow::default();
        let list = derive_with_assignments(&[task.clone()], &assignments, now(), &window);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "assigned-T1");

        let mut moved = task;
        moved.assigned_to = "u-3".to_string();
        assert!(derive_with_assignments(&[moved], &assignments, now(), &window).is_empty());
    }
}
