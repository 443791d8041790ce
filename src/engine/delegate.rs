//! Delegated execution of operations the chain does not handle itself

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::container::{Container, ENGINE_FLAG};
use crate::error::{MkError, Result};
use crate::logging::LogConfig;
use crate::parser::Op;

/// Executes an operation on behalf of a chain.
///
/// `root` is the engine's root container, `context` the chain's current
/// container. Implementations block until the operation has finished.
pub trait Delegate: Send + Sync {
    fn delegate(&self, root: &Container, context: &Container, op: &Op) -> Result<()>;
}

/// Runs operations by re-invoking the engine binary in internal mode.
///
/// The invocation is recorded as an unnamed command in the root container
/// with the context directory as working directory. Its output goes to this
/// process's stdout and stderr, not back to the client.
#[derive(Debug, Clone)]
pub struct SelfExec {
    program: PathBuf,
    log: LogConfig,
}

impl SelfExec {
    pub fn new(program: PathBuf, log: LogConfig) -> Self {
        Self { program, log }
    }
}

impl Delegate for SelfExec {
    fn delegate(&self, root: &Container, context: &Container, op: &Op) -> Result<()> {
        debug!("Preparing to execute {} in context {}", op.name, context.id);
        let dir = context
            .root
            .strip_prefix(&root.root)
            .map_err(|_| MkError::not_found("container", context.id.clone()))?;

        let mut args = Vec::with_capacity(op.args.len() + 2);
        args.push(ENGINE_FLAG.to_string());
        args.push(op.name.clone());
        args.extend(op.args.iter().cloned());

        let program = utf8(&self.program, "engine binary")?;
        let dir = utf8(dir, "context directory")?;
        let mut cmd = root.new_command("", program, args)?;
        cmd.dir = dir.to_string();
        cmd.env.push(self.log.env_entry());
        cmd.store()?;

        debug!("Starting {}:{}", root.id, cmd.name);
        cmd.run_forwarded()
    }
}

/// Command records are text, so paths going into one must be UTF-8.
fn utf8<'a>(path: &'a Path, what: &str) -> Result<&'a str> {
    path.to_str().ok_or_else(|| {
        MkError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} path is not UTF-8: {}", what, path.display()),
        ))
    })
}
