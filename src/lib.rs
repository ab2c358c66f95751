// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![deny(unsafe_code)]

//! # evalscope
//!
//! Debugger-side infrastructure for compiling expressions against the live metadata of a .NET
//! process. `evalscope` does not compile anything itself: it reads the metadata a debuggee
//! exposes, decides which assemblies a compilation should see, caches compiled contexts across
//! evaluations, and retries failed compilations with more or fewer references.
//!
//! ## Features
//!
//! - **Zero-copy metadata access** - Module metadata is borrowed straight from the debuggee
//! - **Context reuse** - Contexts are reused across requests at offsets with identical scopes
//! - **Self-healing compilation** - Missing assemblies are fetched, ambiguities narrowed
//! - **Pluggable seams** - Bring your own compiler, debuggee model and diagnostic formatting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use evalscope::prelude::*;
//!
//! let session = EvaluationSession::new(inspector, compiler);
//! let location = MethodLocation {
//!     module_version_id: mvid,
//!     method_token: Token::new(0x0600_0001),
//!     method_version: 1,
//!     il_offset: 0x12,
//! };
//!
//! match session.compile(ScopeId(1), &location, &CompileRequest::expression("items.Count")) {
//!     Ok(result) => println!("compiled in {} attempts", result.attempts),
//!     Err(Error::Compilation { message, missing_assemblies }) => {
//!         println!("{message} ({} assemblies missing)", missing_assemblies.len())
//!     }
//!     Err(e) => return Err(e),
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - Metadata parsing, blocks, snapshots, identities and reference selection
//! - [`evaluation`] - Sessions, the context cache, reuse constraints and the retry loop
//!
//! Both the compiler and the debuggee are traits
//! ([`evaluation::ExpressionCompiler`], [`evaluation::DebuggeeInspector`]).

#[macro_use]
pub(crate) mod error;
pub(crate) mod utils;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use evalscope::prelude::*;
///
/// let span = ILSpan::new(0, 10)?;
/// assert!(span.contains(9));
/// # Ok::<(), Error>(())
/// ```
pub mod prelude;

/// Module metadata parsing and organisation, based on ECMA-335
///
/// Reads the metadata root, the heaps and the `Module`, `Assembly` and `AssemblyRef` tables of
/// each loaded module, and builds the snapshots and reference sets compilations are created
/// from.
///
/// # Examples
///
/// ```rust,ignore
/// use evalscope::metadata::snapshot::MetadataSnapshot;
///
/// let snapshot = MetadataSnapshot::build(modules, intrinsics, None)?;
/// for block in snapshot.blocks() {
///     println!("{} {}", block.name(), block.module_version_id());
/// }
/// ```
pub mod metadata;

/// Expression evaluation sessions, context caching and compile retries
pub mod evaluation;

/// `evalscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `evalscope` Error type
///
/// # Examples
///
/// ```rust
/// use evalscope::{Error, metadata::block::MetadataBlock};
///
/// match MetadataBlock::read(&[0u8; 4]) {
///     Ok(_) => unreachable!(),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// Configuration of an [`evaluation::EvaluationSession`]
pub use evaluation::EvaluatorConfig;
