//! Metadata tokens identifying rows in metadata tables.

use std::fmt;

use crate::metadata::streams::TableId;

/// A metadata token: table id in the high byte, 1-based row id in the low 24 bits.
///
/// The evaluator only ever receives `MethodDef` tokens (`0x06xxxxxx`) from the host, to name
/// the method a stack frame is stopped in.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Build a token from a table and a row id
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token((u32::from(table as u8) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table type from the token (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// True for a non-nil `MethodDef` token
    #[must_use]
    pub fn is_method_def(&self) -> bool {
        self.table() == TableId::MethodDef as u8 && self.row() != 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
