//! The task planner: the task model, the store that owns the list, derived
//! views, persistence and the interactive terminal shell.

pub mod id;
pub mod query;
pub mod storage;
pub mod store;
pub mod task;
pub mod toast;
pub mod ui;
