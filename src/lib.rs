//! mk - a minimal control-plane engine
//!
//! The engine serves line-delimited operations on a unix socket and runs
//! them against filesystem-backed containers, either with a built-in
//! handler or by re-invoking its own binary inside the active container's
//! directory.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::{mpsc, Arc};
//! use mk::{bootstrap_root, client, Engine, LogConfig, Op};
//!
//! let program = std::env::current_exe().unwrap();
//! let c0 = bootstrap_root(std::path::Path::new("."), &program).unwrap();
//! let engine = Arc::new(Engine::new(c0, LogConfig::default()).with_self_exec(program));
//!
//! let (ready, started) = mpsc::channel();
//! let server = Arc::clone(&engine);
//! std::thread::spawn(move || server.listen_and_serve(Some(ready)));
//! started.recv().unwrap();
//!
//! client::send(&engine.socket_path(), &[Op::new("exec", ["ls", "-l"])]).unwrap();
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod container;
pub mod engine;
pub mod error;
pub mod logging;
pub mod parser;
pub mod util;

pub use config::EngineConfig;
pub use container::{bootstrap_root, Command, Container};
pub use engine::{run_engine_command, Builtin, Chain, Delegate, Engine, SelfExec};
pub use error::{MkError, Result};
pub use logging::LogConfig;
pub use parser::{parse_op, Op};
