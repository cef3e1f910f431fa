//! In-memory repositories.
//!
//! Behave like the PostgreSQL implementations, including the unique email constraint and the
//! conditional revoke, so managers and HTTP handlers can be exercised without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::repository::{AccountRepository, RefreshTokenLedger, TaskRepository};
use crate::auth::{Account, AuthError, AuthResult, NewAccount, RefreshTokenRecord, UserId};
use crate::tasks::{Task, TaskResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory user directory
#[derive(Default)]
pub struct InMemoryAccounts {
    accounts: Mutex<HashMap<UserId, Account>>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.accounts).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccounts {
    async fn create_account(&self, account: NewAccount) -> AuthResult<Account> {
        let mut accounts = lock(&self.accounts);
        if accounts
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(AuthError::EmailTaken);
        }

        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            email: account.email,
            password_hash: account.password_hash,
            name: account.name,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Account>> {
        Ok(lock(&self.accounts)
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: UserId) -> AuthResult<Option<Account>> {
        Ok(lock(&self.accounts).get(&id).cloned())
    }
}

/// In-memory refresh token ledger
#[derive(Default)]
pub struct InMemoryLedger {
    records: Mutex<HashMap<Uuid, RefreshTokenRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records belonging to an owner, oldest first
    pub fn records_for(&self, owner: UserId) -> Vec<RefreshTokenRecord> {
        let mut records: Vec<_> = lock(&self.records)
            .values()
            .filter(|r| r.user_id == owner)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    /// Insert a record as-is, for setting up expired or revoked states
    pub fn insert_record(&self, record: RefreshTokenRecord) {
        lock(&self.records).insert(record.id, record);
    }
}

#[async_trait]
impl RefreshTokenLedger for InMemoryLedger {
    async fn store(
        &self,
        owner: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<RefreshTokenRecord> {
        let mut records = lock(&self.records);
        if records.values().any(|r| r.token_hash == token_hash) {
            return Err(AuthError::Persistence(
                "duplicate refresh token fingerprint".to_string(),
            ));
        }

        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id: owner,
            token_hash: token_hash.to_string(),
            expires_at,
            created_at: Utc::now(),
            revoked_at: None,
        };
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_fingerprint(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        Ok(lock(&self.records)
            .values()
            .find(|r| r.token_hash == token_hash)
            .cloned())
    }

    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> AuthResult<bool> {
        match lock(&self.records).get_mut(&id) {
            Some(record) if record.revoked_at.is_none() => {
                record.revoked_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_owner(&self, owner: UserId, at: DateTime<Utc>) -> AuthResult<u64> {
        let mut revoked = 0;
        for record in lock(&self.records).values_mut() {
            if record.user_id == owner && record.is_valid(at) {
                record.revoked_at = Some(at);
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

/// In-memory task store
#[derive(Default)]
pub struct InMemoryTasks {
    tasks: Mutex<HashMap<Uuid, Task>>,
}

impl InMemoryTasks {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTasks {
    async fn insert_task(&self, task: &Task) -> TaskResult<Task> {
        lock(&self.tasks).insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn list_for_owner(&self, owner: UserId) -> TaskResult<Vec<Task>> {
        let mut tasks: Vec<Task> = lock(&self.tasks)
            .values()
            .filter(|t| t.user_id == owner)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn find_owned(&self, owner: UserId, id: Uuid) -> TaskResult<Option<Task>> {
        Ok(lock(&self.tasks)
            .get(&id)
            .filter(|t| t.user_id == owner)
            .cloned())
    }

    async fn update_task(&self, task: &Task) -> TaskResult<Option<Task>> {
        let mut tasks = lock(&self.tasks);
        match tasks.get_mut(&task.id) {
            Some(existing) if existing.user_id == task.user_id => {
                *existing = task.clone();
                Ok(Some(task.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_owned(&self, owner: UserId, id: Uuid) -> TaskResult<bool> {
        let mut tasks = lock(&self.tasks);
        if tasks.get(&id).is_some_and(|t| t.user_id == owner) {
            tasks.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
