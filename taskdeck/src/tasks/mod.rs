//! Task resource scoped to the authenticated owner.
//!
//! Every operation takes the owner's id; a task that belongs to someone else is reported
//! exactly like a task that does not exist.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{TaskError, TaskResult};
pub use manager::{MAX_TITLE_LEN, TaskManager};
pub use models::{CreateTaskRequest, Task, TaskPriority, TaskStatus, UpdateTaskRequest};
