//! Owner-scoped task operations.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    errors::{TaskError, TaskResult},
    models::{CreateTaskRequest, Task, TaskPriority, TaskStatus, UpdateTaskRequest},
};
use crate::auth::UserId;
use crate::db::TaskRepository;

/// Longest accepted task title, in characters
pub const MAX_TITLE_LEN: usize = 255;

/// Task manager
#[derive(Clone)]
pub struct TaskManager {
    tasks: Arc<dyn TaskRepository>,
}

impl TaskManager {
    pub fn new(tasks: Arc<dyn TaskRepository>) -> Self {
        Self { tasks }
    }

    /// Create a task owned by `owner`
    ///
    /// # Errors
    ///
    /// * `TaskError::Validation` - Missing or overlong title, or a due date in the past
    pub async fn create(&self, owner: UserId, request: CreateTaskRequest) -> TaskResult<Task> {
        let now = Utc::now();
        validate_title(&request.title)?;
        if let Some(due) = request.due_date {
            validate_due_date(due, now)?;
        }

        let status = request
            .status
            .as_deref()
            .map(TaskStatus::parse_lenient)
            .unwrap_or_default();

        let task = Task {
            id: Uuid::new_v4(),
            user_id: owner,
            title: request.title,
            description: request.description,
            status,
            priority: request
                .priority
                .as_deref()
                .map(TaskPriority::parse_lenient)
                .unwrap_or_default(),
            due_date: request.due_date,
            completed_at: (status == TaskStatus::Done).then_some(now),
            created_at: now,
            updated_at: now,
        };

        let task = self.tasks.insert_task(&task).await?;
        log::info!("Task {} created for user {}", task.id, owner);
        Ok(task)
    }

    /// List the owner's tasks, newest first
    pub async fn list(&self, owner: UserId) -> TaskResult<Vec<Task>> {
        self.tasks.list_for_owner(owner).await
    }

    pub async fn get(&self, owner: UserId, id: Uuid) -> TaskResult<Task> {
        self.tasks
            .find_owned(owner, id)
            .await?
            .ok_or(TaskError::NotFound)
    }

    /// Apply a partial update
    ///
    /// `completed_at` follows the status: set when the task moves into `done`, cleared when
    /// it leaves.
    pub async fn update(
        &self,
        owner: UserId,
        id: Uuid,
        request: UpdateTaskRequest,
    ) -> TaskResult<Task> {
        let now = Utc::now();
        let mut task = self.get(owner, id).await?;

        if let Some(title) = request.title {
            validate_title(&title)?;
            task.title = title;
        }
        if let Some(description) = request.description {
            task.description = Some(description);
        }
        if let Some(priority) = request.priority.as_deref() {
            task.priority = TaskPriority::parse_lenient(priority);
        }
        if let Some(due) = request.due_date {
            validate_due_date(due, now)?;
            task.due_date = Some(due);
        }
        if let Some(status) = request.status.as_deref() {
            apply_status(&mut task, TaskStatus::parse_lenient(status), now);
        }
        task.updated_at = now;

        self.tasks
            .update_task(&task)
            .await?
            .ok_or(TaskError::NotFound)
    }

    pub async fn delete(&self, owner: UserId, id: Uuid) -> TaskResult<()> {
        if self.tasks.delete_owned(owner, id).await? {
            log::info!("Task {id} deleted by user {owner}");
            Ok(())
        } else {
            Err(TaskError::NotFound)
        }
    }

    /// Mark a task done. Completing an already-done task keeps its original completion time.
    pub async fn complete(&self, owner: UserId, id: Uuid) -> TaskResult<Task> {
        let now = Utc::now();
        let mut task = self.get(owner, id).await?;

        apply_status(&mut task, TaskStatus::Done, now);
        task.updated_at = now;

        self.tasks
            .update_task(&task)
            .await?
            .ok_or(TaskError::NotFound)
    }
}

fn validate_title(title: &str) -> TaskResult<()> {
    if title.trim().is_empty() {
        return Err(TaskError::Validation("title field is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(TaskError::Validation(format!(
            "title field length must be {MAX_TITLE_LEN} characters or less"
        )));
    }
    Ok(())
}

fn validate_due_date(due: DateTime<Utc>, now: DateTime<Utc>) -> TaskResult<()> {
    if due < now {
        return Err(TaskError::Validation(
            "due date cannot be in the past".to_string(),
        ));
    }
    Ok(())
}

fn apply_status(task: &mut Task, status: TaskStatus, now: DateTime<Utc>) {
    match (task.status, status) {
        (TaskStatus::Done, TaskStatus::Done) => {}
        (_, TaskStatus::Done) => task.completed_at = Some(now),
        _ => task.completed_at = None,
    }
    task.status = status;
}
