//! Internal engine mode
//!
//! The engine delegates generic operations to its own binary, started as
//! `mk --engine <op> [args...]` in the context container's directory. This
//! is not a stable interface.

use std::process;

use tracing::debug;

use crate::container::LAUNCHER_ALIASES;
use crate::error::{MkError, Result};

/// Operations understood in internal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    Exec,
    Start,
    Stop,
    Commit,
}

impl EngineCommand {
    pub fn name(self) -> &'static str {
        match self {
            EngineCommand::Exec => "exec",
            EngineCommand::Start => "start",
            EngineCommand::Stop => "stop",
            EngineCommand::Commit => "commit",
        }
    }

    pub fn lookup(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        [
            EngineCommand::Exec,
            EngineCommand::Start,
            EngineCommand::Stop,
            EngineCommand::Commit,
        ]
        .into_iter()
        .find(|c| c.name() == name)
    }

    /// Resolve the name the binary was invoked as, for launcher aliases.
    pub fn from_alias(invoked_as: &str) -> Option<Self> {
        if LAUNCHER_ALIASES.contains(&invoked_as) {
            Self::lookup(invoked_as)
        } else {
            None
        }
    }
}

/// Run one engine operation in the current directory.
pub fn run_engine_command(name: &str, args: &[String]) -> Result<()> {
    let command =
        EngineCommand::lookup(name).ok_or_else(|| MkError::UnknownCommand(name.to_string()))?;
    debug!("Engine command {} {:?}", command.name(), args);
    match command {
        EngineCommand::Exec => exec(args),
        other => Err(MkError::NotImplemented(other.name().to_string())),
    }
}

/// Run `args[0]` with the remaining arguments in the foreground.
fn exec(args: &[String]) -> Result<()> {
    let (program, rest) = match args.split_first() {
        Some((program, rest)) if !program.is_empty() => (program, rest),
        _ => return Err(MkError::Parse(EngineCommand::Exec.name().to_string())),
    };
    let status = process::Command::new(program).args(rest).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(MkError::Process {
            name: program.clone(),
            status,
        })
    }
}
