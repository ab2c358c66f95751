//! Low-level reading helpers shared by the metadata parsers.

pub(crate) mod io;
pub(crate) mod parser;

pub(crate) use io::{read_le, read_le_at, read_le_at_dyn};
pub(crate) use parser::Parser;
