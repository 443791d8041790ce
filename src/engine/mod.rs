//! Control-plane engine

pub mod chain;
pub mod delegate;
pub mod internal;
pub mod server;
pub mod signals;

pub use chain::{Builtin, Chain};
pub use delegate::{Delegate, SelfExec};
pub use internal::{run_engine_command, EngineCommand};
pub use server::{Engine, CONTAINERS_DIR, ENGINE_DIR};
