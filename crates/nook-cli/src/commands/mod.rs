pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod folders;
pub mod notes;
pub mod sync;
pub mod tags;
