//! docket tasks command implementation
//!
//! Listing reads through the desk; edits go through the optimistic protocol
//! and report a rollback as a sync failure.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use super::{Session, TasksCommands};
use crate::error::{Error, Result};
use crate::events::{Event, EventKind};
use crate::output::{emit_success, HumanOutput};
use crate::task::{Task, TaskDraft, TaskFilter, TaskPriority, TaskStatus};

#[derive(serde::Serialize)]
struct TaskListReport {
    total: usize,
    open: usize,
    offline: bool,
    tasks: Vec<Task>,
}

#[derive(serde::Serialize)]
struct TaskDeleteReport {
    id: String,
    deleted: bool,
}

pub async fn run(session: &mut Session, cmd: TasksCommands) -> Result<()> {
    match cmd {
        TasksCommands::List {
            status,
            priority,
            assignee,
            case_id,
            search,
        } => {
            let filter = TaskFilter {
                status: status.as_deref().map(str::parse).transpose()?,
                priority: priority.as_deref().map(str::parse).transpose()?,
                assigned_to: assignee,
                case_id,
                search,
            };
            run_list(session, &filter).await
        }
        TasksCommands::Show { id } => run_show(session, &id).await,
        TasksCommands::Create {
            title,
            assignee,
            assignee_name,
            description,
            priority,
            case_id,
            due,
            estimate,
        } => {
            let draft = TaskDraft {
                title,
                description,
                priority: priority.parse::<TaskPriority>()?,
                assigned_to: assignee.unwrap_or_else(|| session.user.clone()),
                assignee_name,
                case_id,
                due_date: due.as_deref().map(parse_due).transpose()?,
                estimated_hours: estimate,
            };
            run_create(session, &draft).await
        }
        TasksCommands::Status { id, status } => {
            let status = status.parse::<TaskStatus>()?;
            run_status(session, &id, status).await
        }
        TasksCommands::Assign { id, user, name } => run_assign(session, &id, &user, name).await,
        TasksCommands::Delete { id } => run_delete(session, &id).await,
    }
}

async fn run_list(session: &mut Session, filter: &TaskFilter) -> Result<()> {
    let tasks = session.load(filter).await?;
    let open = tasks.iter().filter(|task| !task.status.is_closed()).count();

    let mut human = HumanOutput::new(format!("docket tasks: {} task(s)", tasks.len()));
    human.push_summary("open", open.to_string());
    if session.offline {
        human.push_summary("source", "snapshot");
    }
    for task in &tasks {
        human.push_detail(task_line(task));
    }
    if tasks.is_empty() && !filter.is_empty() {
        human.push_warning("no tasks match the filter");
    }

    let report = TaskListReport {
        total: tasks.len(),
        open,
        offline: session.offline,
        tasks,
    };
    emit_success(session.output, "tasks list", &report, Some(&human))
}

async fn run_show(session: &mut Session, id: &str) -> Result<()> {
    let _ = session.load(&TaskFilter::default()).await?;
    let task = session.desk.task(id)?;

    let mut human = HumanOutput::new(format!("Task {}", task.id));
    push_task_summary(&mut human, &task);
    if let Some(description) = task.description.as_deref() {
        human.push_detail(description);
    }
    emit_success(session.output, "tasks show", &task, Some(&human))
}

async fn run_create(session: &mut Session, draft: &TaskDraft) -> Result<()> {
    session.require_online("create tasks")?;
    let _ = session.load(&TaskFilter::default()).await?;
    let task = session.desk.create_task(draft).await?;
    session.save_snapshot();
    let user = Some(session.user.clone());
    session.emit(Event::for_task(EventKind::TaskCreated, user, &task));

    let mut human = HumanOutput::new("Task created");
    push_task_summary(&mut human, &task);
    human.push_next_step(format!("docket tasks show {}", task.id));
    emit_success(session.output, "tasks create", &task, Some(&human))
}

async fn run_status(session: &mut Session, id: &str, status: TaskStatus) -> Result<()> {
    session.require_online("change status")?;
    let _ = session.load(&TaskFilter::default()).await?;
    let outcome = session.desk.set_status(id, status).await;
    let task = settle(session, outcome, EventKind::TaskStatusChanged)?;

    let mut human = HumanOutput::new("Task status updated");
    push_task_summary(&mut human, &task);
    emit_success(session.output, "tasks status", &task, Some(&human))
}

async fn run_assign(
    session: &mut Session,
    id: &str,
    user: &str,
    name: Option<String>,
) -> Result<()> {
    session.require_online("reassign tasks")?;
    let _ = session.load(&TaskFilter::default()).await?;
    let outcome = session.desk.reassign(id, user, name).await;
    let task = settle(session, outcome, EventKind::TaskReassigned)?;

    let mut human = HumanOutput::new("Task reassigned");
    push_task_summary(&mut human, &task);
    emit_success(session.output, "tasks assign", &task, Some(&human))
}

async fn run_delete(session: &mut Session, id: &str) -> Result<()> {
    session.require_online("delete tasks")?;
    let _ = session.load(&TaskFilter::default()).await?;
    let outcome = session.desk.delete_task(id).await;
    let task = settle(session, outcome, EventKind::TaskDeleted)?;

    let report = TaskDeleteReport {
        id: task.id.clone(),
        deleted: true,
    };
    let mut human = HumanOutput::new(format!("Task deleted: {}", task.id));
    human.push_summary("title", task.title.clone());
    emit_success(session.output, "tasks delete", &report, Some(&human))
}

/// Record the outcome of a reconciled edit: snapshot and event on success,
/// a sync-failure event before the error propagates.
fn settle(session: &mut Session, outcome: Result<Task>, kind: EventKind) -> Result<Task> {
    let user = Some(session.user.clone());
    match outcome {
        Ok(task) => {
            session.save_snapshot();
            session.emit(Event::for_task(kind, user, &task));
            Ok(task)
        }
        Err(err) => {
            if matches!(err, Error::Sync { .. }) {
                session.emit(Event::sync_failed(user, &err));
            }
            Err(err)
        }
    }
}

fn task_line(task: &Task) -> String {
    let assignee = task.assignee_name.as_deref().unwrap_or(&task.assigned_to);
    let mut line = format!(
        "{} [{}] {} ({}, {})",
        task.id, task.status, task.title, task.priority, assignee
    );
    if let Some(due) = task.due_date {
        line.push_str(&format!(" due {}", due.format("%Y-%m-%d")));
    }
    line
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("title", task.title.clone());
    human.push_summary("status", task.status.to_string());
    human.push_summary("priority", task.priority.to_string());
    human.push_summary(
        "assignee",
        match task.assignee_name.as_deref() {
            Some(name) => format!("{name} ({})", task.assigned_to),
            None => task.assigned_to.clone(),
        },
    );
    if let Some(case_id) = task.case_id.as_deref() {
        human.push_summary("case", case_id);
    }
    if let Some(due) = task.due_date {
        human.push_summary("due", due.to_rfc3339());
    }
    if let Some(completed) = task.completed_at {
        human.push_summary("completed", completed.to_rfc3339());
    }
}

/// Accept a full RFC 3339 timestamp or a bare date (midnight UTC).
fn parse_due(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| {
            Error::InvalidArgument(format!(
                "invalid due date '{trimmed}' (expected RFC 3339 or YYYY-MM-DD)"
            ))
        })
}
