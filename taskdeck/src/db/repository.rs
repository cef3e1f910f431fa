//! Repository traits and their PostgreSQL implementations.
//!
//! The managers only see these traits, so the in-memory versions in
//! [`memory`](super::memory) can stand in for PostgreSQL in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::timeouts::{TimeoutError, with_default_timeout};
use crate::auth::{Account, AuthError, AuthResult, NewAccount, RefreshTokenRecord, UserId};
use crate::tasks::{Task, TaskPriority, TaskResult, TaskStatus};

/// User directory
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Persist a new account. Fails with `AuthError::EmailTaken` when the email is registered.
    async fn create_account(&self, account: NewAccount) -> AuthResult<Account>;

    /// Find an account by its (lower-cased) email
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Account>>;

    /// Find an account by ID
    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<Account>>;
}

/// Persisted record of issued refresh tokens
#[async_trait]
pub trait RefreshTokenLedger: Send + Sync {
    /// Record a newly issued refresh token by its fingerprint
    async fn store(
        &self,
        owner: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<RefreshTokenRecord>;

    /// Look up a record by fingerprint
    async fn find_by_fingerprint(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenRecord>>;

    /// Set `revoked_at` if it is still unset.
    ///
    /// Returns `true` only for the call that performed the transition.
    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> AuthResult<bool>;

    /// Revoke every still-active record of an owner, returning how many were revoked
    async fn revoke_all_for_owner(&self, owner: UserId, at: DateTime<Utc>) -> AuthResult<u64>;
}

/// Task storage. Every lookup and mutation is filtered by owner.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert_task(&self, task: &Task) -> TaskResult<Task>;

    /// Owner's tasks, newest first
    async fn list_for_owner(&self, owner: UserId) -> TaskResult<Vec<Task>>;

    async fn find_owned(&self, owner: UserId, id: Uuid) -> TaskResult<Option<Task>>;

    /// Overwrite a task's mutable fields; `None` when no task with that id and owner exists
    async fn update_task(&self, task: &Task) -> TaskResult<Option<Task>>;

    /// Delete a task; `false` when no task with that id and owner exists
    async fn delete_owned(&self, owner: UserId, id: Uuid) -> TaskResult<bool>;
}

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, name, created_at, updated_at";
const REFRESH_COLUMNS: &str = "id, user_id, token_hash, expires_at, created_at, revoked_at";
const TASK_COLUMNS: &str = "id, user_id, title, description, status, priority, due_date, \
                            completed_at, created_at, updated_at";

fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
    Ok(Account {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn refresh_record_from_row(row: &PgRow) -> Result<RefreshTokenRecord, sqlx::Error> {
    Ok(RefreshTokenRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        token_hash: row.try_get("token_hash")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
        revoked_at: row.try_get("revoked_at")?,
    })
}

fn task_from_row(row: &PgRow) -> Result<Task, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let priority: String = row.try_get("priority")?;

    Ok(Task {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: TaskStatus::parse_lenient(&status),
        priority: TaskPriority::parse_lenient(&priority),
        due_date: row.try_get("due_date")?,
        completed_at: row.try_get("completed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// PostgreSQL implementation of [`AccountRepository`]
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn create_account(&self, account: NewAccount) -> AuthResult<Account> {
        let sql = format!(
            "INSERT INTO users (id, email, password_hash, name) VALUES ($1, $2, $3, $4) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let query = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(&account.name)
            .fetch_one(&self.pool);

        match with_default_timeout(query).await {
            Ok(row) => Ok(account_from_row(&row)?),
            Err(TimeoutError::Database(sqlx::Error::Database(db_err)))
                if db_err.is_unique_violation() =>
            {
                Err(AuthError::EmailTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        let row = with_default_timeout(sqlx::query(&sql).bind(email).fetch_optional(&self.pool))
            .await?;

        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
        let row =
            with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(&self.pool)).await?;

        Ok(row.as_ref().map(account_from_row).transpose()?)
    }
}

/// PostgreSQL implementation of [`RefreshTokenLedger`]
#[derive(Clone)]
pub struct PgRefreshTokenLedger {
    pool: PgPool,
}

impl PgRefreshTokenLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenLedger for PgRefreshTokenLedger {
    async fn store(
        &self,
        owner: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<RefreshTokenRecord> {
        let sql = format!(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4) RETURNING {REFRESH_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(Uuid::new_v4())
                .bind(owner)
                .bind(token_hash)
                .bind(expires_at)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(refresh_record_from_row(&row)?)
    }

    async fn find_by_fingerprint(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        let sql = format!("SELECT {REFRESH_COLUMNS} FROM refresh_tokens WHERE token_hash = $1");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(token_hash)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(refresh_record_from_row).transpose()?)
    }

    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> AuthResult<bool> {
        let result = with_default_timeout(
            sqlx::query(
                "UPDATE refresh_tokens SET revoked_at = $2 WHERE id = $1 AND revoked_at IS NULL",
            )
            .bind(id)
            .bind(at)
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all_for_owner(&self, owner: UserId, at: DateTime<Utc>) -> AuthResult<u64> {
        let result = with_default_timeout(
            sqlx::query(
                "UPDATE refresh_tokens SET revoked_at = $2 \
                 WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > $2",
            )
            .bind(owner)
            .bind(at)
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected())
    }
}

/// PostgreSQL implementation of [`TaskRepository`]
#[derive(Clone)]
pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn insert_task(&self, task: &Task) -> TaskResult<Task> {
        let sql = format!(
            "INSERT INTO tasks ({TASK_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {TASK_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(task.id)
                .bind(task.user_id)
                .bind(&task.title)
                .bind(&task.description)
                .bind(task.status.as_str())
                .bind(task.priority.as_str())
                .bind(task.due_date)
                .bind(task.completed_at)
                .bind(task.created_at)
                .bind(task.updated_at)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(task_from_row(&row)?)
    }

    async fn list_for_owner(&self, owner: UserId) -> TaskResult<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 ORDER BY created_at DESC, id"
        );
        let rows =
            with_default_timeout(sqlx::query(&sql).bind(owner).fetch_all(&self.pool)).await?;

        Ok(rows
            .iter()
            .map(task_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn find_owned(&self, owner: UserId, id: Uuid) -> TaskResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(id)
                .bind(owner)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(task_from_row).transpose()?)
    }

    async fn update_task(&self, task: &Task) -> TaskResult<Option<Task>> {
        let sql = format!(
            "UPDATE tasks SET title = $3, description = $4, status = $5, priority = $6, \
             due_date = $7, completed_at = $8, updated_at = $9 \
             WHERE id = $1 AND user_id = $2 RETURNING {TASK_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(task.id)
                .bind(task.user_id)
                .bind(&task.title)
                .bind(&task.description)
                .bind(task.status.as_str())
                .bind(task.priority.as_str())
                .bind(task.due_date)
                .bind(task.completed_at)
                .bind(task.updated_at)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(task_from_row).transpose()?)
    }

    async fn delete_owned(&self, owner: UserId, id: Uuid) -> TaskResult<bool> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(owner)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
