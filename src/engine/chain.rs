//! Per-connection command chain
//!
//! A chain holds the container that operations on one connection run in.
//! `in` and `from` pick that container; any other operation gets a fresh
//! container when none is set yet. Built-in operations are handled here,
//! everything else goes to the engine's delegate.

use tracing::{debug, info};

use super::server::Engine;
use crate::container::Container;
use crate::error::{MkError, Result};
use crate::parser::{parse_op, Op};

/// Operations handled by the chain itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// Switch to an existing container
    In,
    /// Start a new container from an existing one
    From,
    /// Run the queued commands of the context
    Start,
    /// Import an image into the context
    Import,
}

impl Builtin {
    pub const ALL: [Builtin; 4] = [Builtin::In, Builtin::From, Builtin::Start, Builtin::Import];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::In => "in",
            Builtin::From => "from",
            Builtin::Start => "start",
            Builtin::Import => "import",
        }
    }

    /// Resolve a (lowercased) operation name.
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Whether the operation chooses the context rather than running in it
    fn selects_context(self) -> bool {
        matches!(self, Builtin::In | Builtin::From)
    }
}

pub struct Chain<'e> {
    context: Option<Container>,
    engine: &'e Engine,
}

impl<'e> Chain<'e> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        Self {
            context: None,
            engine,
        }
    }

    /// The container operations currently run in
    pub fn context(&self) -> Option<&Container> {
        self.context.as_ref()
    }

    /// Parse and execute one protocol line.
    ///
    /// Examples of valid input:
    ///   "PULL ubuntu"
    ///   "START "
    ///   "EXEC ls\x00-l"
    pub fn op(&mut self, input: &str) -> Result<()> {
        let op = parse_op(input)?;
        self.dispatch(&op)
    }

    pub fn dispatch(&mut self, op: &Op) -> Result<()> {
        debug!("Dispatching {}", op);
        let builtin = Builtin::lookup(&op.name);
        if let Some(selector) = builtin.filter(|b| b.selects_context()) {
            return self.call(selector, op);
        }

        let context = self.ensure_context()?;
        match builtin {
            Some(b) => self.call(b, op),
            None => {
                let delegate = self
                    .engine
                    .delegate()
                    .ok_or_else(|| MkError::UnknownCommand(op.name.clone()))?;
                delegate.delegate(self.engine.root(), &context, op)
            }
        }
    }

    fn ensure_context(&mut self) -> Result<Container> {
        if let Some(ctx) = &self.context {
            return Ok(ctx.clone());
        }
        let ctx = self.engine.create()?;
        debug!("No context set, using new container {}", ctx.id);
        self.context = Some(ctx.clone());
        Ok(ctx)
    }

    fn call(&mut self, builtin: Builtin, op: &Op) -> Result<()> {
        match builtin {
            Builtin::In => self.cmd_in(op),
            Builtin::From => self.cmd_from(op),
            Builtin::Start => self.cmd_start(op),
            Builtin::Import => self.cmd_import(op),
        }
    }

    fn cmd_in(&mut self, op: &Op) -> Result<()> {
        let ctx = self.engine.get(op.first_arg())?;
        debug!("Context is now {}", ctx.id);
        self.context = Some(ctx);
        Ok(())
    }

    fn cmd_from(&mut self, op: &Op) -> Result<()> {
        let src = self.engine.get(op.first_arg())?;
        let ctx = self.engine.create()?;
        // The source tree is not committed into the new container.
        info!("Created {} from {} (contents not copied)", ctx.id, src.id);
        self.context = Some(ctx);
        Ok(())
    }

    fn cmd_start(&mut self, _op: &Op) -> Result<()> {
        Err(MkError::NotImplemented(Builtin::Start.name().to_string()))
    }

    fn cmd_import(&mut self, op: &Op) -> Result<()> {
        info!("Importing {}...", op.first_arg());
        Ok(())
    }
}
