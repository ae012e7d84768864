//! Task records and the on-disk task list.
//!
//! Tasks are produced once by the architect agent and then advanced one at a
//! time by the coder loop. The `tasks.json` file on disk is the source of
//! truth across process restarts; the in-memory list is reconciled from disk
//! before every coder step and rewritten atomically after every status
//! change.

pub mod list;
pub mod types;

mod tests;

pub use list::TaskList;
pub use types::{TaskRecord, TaskStatus};
