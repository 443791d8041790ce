//! Parser for the control socket protocol

pub mod op;

pub use op::{parse_op, Op, ARG_SEPARATOR, NAME_SEPARATOR};
