//! Expression evaluation against live debuggee metadata.
//!
//! This module drives an external [`ExpressionCompiler`] for debugger requests: it gathers the
//! metadata of the debug scope into a [`MetadataSnapshot`](crate::metadata::snapshot::MetadataSnapshot),
//! reuses cached compilation contexts where the metadata and the location allow it, and retries
//! failed compilations with additional or fewer references.
//!
//! # Key Components
//!
//! - [`EvaluationSession`] - Entry point binding a debuggee, a compiler and the cache
//! - [`ContextCache`] - Per-scope cache of compiled contexts
//! - [`ReuseConstraints`] / [`calculate_reuse_span`] - Where a cached context stays valid
//! - [`classify`] - What a failed compilation asks the evaluator to do
//! - [`EvaluatorConfig`] - Reuse, fallback and failure policy
//!
//! # Retry Behavior
//!
//! Every request first compiles against all loaded assemblies. If all errors are ambiguities
//! between assemblies, the request is compiled once more against the target module's direct
//! references. If an error names assemblies that are not loaded, their metadata is fetched from
//! the debuggee and the request is compiled again, for as long as each round obtains something
//! new. Query expressions and `dynamic` without their support library fetch `System.Linq`, and
//! `System.Core` if that yields nothing. Only the final outcome is reported.

mod alias;
mod cache;
mod compiler;
mod config;
mod diagnostic;
mod events;
mod ilspan;
mod retry;
mod reuse;
mod session;

pub use alias::{Alias, AliasKind};
pub use cache::{CachedContext, ContextCache, MetadataContext};
pub use compiler::{
    Compilation, CompileRequest, DebuggeeInspector, ExpressionCompiler, MethodLocation,
};
pub use config::EvaluatorConfig;
pub use diagnostic::{
    classify, Classification, DefaultFormatter, Diagnostic, DiagnosticCode, DiagnosticFormatter,
    Severity,
};
pub use events::{ModuleEvent, ModuleEventListener, ScopeId};
pub use ilspan::ILSpan;
pub use reuse::{calculate_reuse_span, ReuseConstraints};
pub use session::{CompileResult, EvaluationSession};
