//! Control socket operations
//!
//! One operation per line: `<name> <arg0>\x00<arg1>\x00...`. The name is
//! case-insensitive. Arguments are separated by NUL so they may contain
//! spaces. The space after the name is mandatory, even with no arguments.

use std::fmt;

use crate::error::{MkError, Result};

/// Separator between the operation name and its argument payload.
pub const NAME_SEPARATOR: char = ' ';

/// Separator between arguments.
pub const ARG_SEPARATOR: char = '\0';

/// A parsed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Op {
    /// Lowercased operation name
    pub name: String,
    /// Arguments, never empty once parsed
    pub args: Vec<String>,
}

impl Op {
    pub fn new<I, S>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_lowercase(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// First argument, or the empty string.
    pub fn first_arg(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("")
    }

    /// Encode as a protocol line, without the trailing newline.
    pub fn to_line(&self) -> String {
        let mut line = String::with_capacity(self.name.len() + 1);
        line.push_str(&self.name);
        line.push(NAME_SEPARATOR);
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                line.push(ARG_SEPARATOR);
            }
            line.push_str(arg);
        }
        line
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {:?}", arg)?;
        }
        Ok(())
    }
}

/// Parse one protocol line. Line framing (the trailing newline) is the
/// reader's job and must already be stripped.
pub fn parse_op(input: &str) -> Result<Op> {
    let (name, payload) = input
        .split_once(NAME_SEPARATOR)
        .ok_or_else(|| MkError::Parse(input.to_string()))?;
    Ok(Op {
        name: name.to_lowercase(),
        args: payload.split(ARG_SEPARATOR).map(str::to_string).collect(),
    })
}
