//! # evalscope Prelude
//!
//! The most commonly used types of the evalscope library. Import this module to get quick
//! access to everything needed to drive an evaluation session.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all evalscope operations
pub use crate::Error;

/// The result type used throughout evalscope
pub use crate::Result;

/// Evaluator configuration
pub use crate::EvaluatorConfig;

// ================================================================================================
// Evaluation
// ================================================================================================

/// Sessions and their results
pub use crate::evaluation::{CompileResult, EvaluationSession};

/// Seams to the compiler and the debuggee
pub use crate::evaluation::{
    Compilation, CompileRequest, DebuggeeInspector, ExpressionCompiler, MethodLocation,
};

/// Diagnostics
pub use crate::evaluation::{
    Diagnostic, DiagnosticCode, DiagnosticFormatter, DefaultFormatter, Severity,
};

/// Pseudo-variables
pub use crate::evaluation::{Alias, AliasKind};

/// Scopes and module notifications
pub use crate::evaluation::{ModuleEvent, ModuleEventListener, ScopeId};

/// Reuse windows
pub use crate::evaluation::{ILSpan, ReuseConstraints};

// ================================================================================================
// Metadata
// ================================================================================================

/// Metadata token type
pub use crate::metadata::token::Token;

/// Blocks and snapshots
pub use crate::metadata::{block::MetadataBlock, snapshot::MetadataSnapshot};

/// Reference sets handed to the compiler
pub use crate::metadata::references::{
    AssemblyReferences, MetadataContextId, MetadataReference, ReferenceKind,
};

/// Assembly identities
pub use crate::metadata::identity::{AssemblyIdentity, AssemblyVersion};
