//! Filesystem-backed containers
//!
//! A container is a directory acting as an execution context. It owns:
//! - Path resolution under its root
//! - Persisted command records (`.docker/run/exec/<name>`)
//! - The base environment of the processes it runs

mod command;
mod root;
mod types;

pub use command::{split_env, Command, EXEC_DIR};
pub use root::{bootstrap_root, ENGINE_FLAG, LAUNCHER, LAUNCHER_ALIASES};
pub use types::{Container, ROOT_CONTAINER_ID};
