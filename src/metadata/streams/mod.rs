//! Metadata streams.
//!
//! Parsers for the streams the evaluator reads out of a debuggee module's metadata:
//!
//! - **`#Strings`** - UTF-8 identifiers (module, assembly and culture names)
//! - **`#GUID`** - module version ids and edit-and-continue generation ids
//! - **`#Blob`** - public keys, public key tokens and hashes
//! - **`#~`** / **`#-`** - the metadata tables, of which only `Module`, `Assembly` and
//!   `AssemblyRef` are decoded
//!
//! All of them borrow the metadata bytes; nothing is copied out of the debuggee's memory.
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 24.2.2 - Stream Headers
//! - ECMA-335 6th Edition, Partition II, Section 22 - Metadata Tables

mod blob;
mod guid;
mod rows;
mod streamheader;
mod strings;
mod tablesheader;

pub use blob::Blob;
pub use guid::Guid;
pub use rows::{AssemblyFlags, AssemblyRefRow, AssemblyRow, Heaps, ModuleRow};
pub use streamheader::StreamHeader;
pub use strings::Strings;
pub use tablesheader::{CodedIndexKind, Column, HeapSizes, TableId, TablesHeader};
