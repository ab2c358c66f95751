//! Seams to the expression compiler and to the debuggee.
//!
//! The evaluator does not compile anything itself. It builds reference sets, hands them to an
//! [`ExpressionCompiler`], and reads metadata through a [`DebuggeeInspector`]. Both are traits
//! so that debugger front-ends can plug in their own compiler and process model.

use crate::{
    evaluation::{Alias, Diagnostic, ILSpan, ScopeId},
    metadata::{identity::AssemblyIdentity, references::AssemblyReferences, token::Token},
    Result,
};

/// Where in the debuggee a request is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodLocation {
    /// Module containing the method
    pub module_version_id: uguid::Guid,
    /// `MethodDef` token of the method
    pub method_token: Token,
    /// Edit-and-continue version of the method body, starting at 1
    pub method_version: u32,
    /// IL offset of the current instruction
    pub il_offset: u32,
}

/// What the compiler is asked to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileRequest {
    /// Evaluate an expression
    Expression {
        /// Source text
        text: String,
        /// Trailing format specifiers such as `nq` or `h`
        format_specifiers: Vec<String>,
        /// Pseudo-variables in scope
        aliases: Vec<Alias>,
    },
    /// Assign `value` to `target`
    Assignment {
        /// Assignable expression
        target: String,
        /// Value expression
        value: String,
        /// Pseudo-variables in scope
        aliases: Vec<Alias>,
    },
    /// Enumerate the locals of the method
    Locals {
        /// Only the method's arguments
        arguments_only: bool,
        /// Pseudo-variables in scope
        aliases: Vec<Alias>,
    },
}

impl CompileRequest {
    /// An expression without format specifiers or aliases
    pub fn expression(text: impl Into<String>) -> Self {
        CompileRequest::Expression {
            text: text.into(),
            format_specifiers: Vec::new(),
            aliases: Vec::new(),
        }
    }

    /// Pseudo-variables in scope for the request
    #[must_use]
    pub fn aliases(&self) -> &[Alias] {
        match self {
            CompileRequest::Expression { aliases, .. }
            | CompileRequest::Assignment { aliases, .. }
            | CompileRequest::Locals { aliases, .. } => aliases,
        }
    }
}

/// The result of one compile call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation<A> {
    /// The compiled artifact, present when no error was reported
    pub artifact: Option<A>,
    /// Everything the compiler reported
    pub diagnostics: Vec<Diagnostic>,
}

impl<A> Compilation<A> {
    /// A compilation that produced `artifact`
    pub fn success(artifact: A) -> Self {
        Compilation {
            artifact: Some(artifact),
            diagnostics: Vec::new(),
        }
    }

    /// A compilation that failed with `diagnostics`
    pub fn failure(diagnostics: Vec<Diagnostic>) -> Self {
        Compilation {
            artifact: None,
            diagnostics,
        }
    }

    /// True if any diagnostic is an error
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// The first error diagnostic
    #[must_use]
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.is_error())
    }
}

/// A compiler producing evaluation artifacts from metadata.
///
/// Contexts are immutable once created and may be cached and shared across requests for as long
/// as the metadata they were built from is unchanged.
pub trait ExpressionCompiler<'a> {
    /// Compilation state built from a reference set
    type Context;
    /// What a successful compile produces
    type Artifact;

    /// Build a context able to compile requests at `method`.
    ///
    /// # Errors
    /// Any error is treated as an internal failure of the evaluator.
    fn create_context(
        &self,
        references: &AssemblyReferences<'a>,
        method: &MethodLocation,
    ) -> Result<Self::Context>;

    /// Compile `request` in `context`
    fn compile(
        &self,
        context: &Self::Context,
        request: &CompileRequest,
    ) -> Compilation<Self::Artifact>;
}

/// Read access to the debugged process.
///
/// Metadata is borrowed for `'a`: the debuggee keeps it alive and unmodified at least as long
/// as the evaluation session.
pub trait DebuggeeInspector<'a> {
    /// Metadata of every module loaded in `scope`, in load order.
    ///
    /// A module whose metadata cannot be read yields an error and is skipped.
    fn module_metadata(&self, scope: ScopeId) -> Vec<Result<&'a [u8]>>;

    /// Metadata of the synthetic intrinsics module.
    ///
    /// # Errors
    /// Any error is treated as an internal failure of the evaluator.
    fn intrinsic_metadata(&self, scope: ScopeId) -> Result<&'a [u8]>;

    /// Metadata of an assembly that is not loaded in `scope` yet.
    ///
    /// # Errors
    /// Any error means the identity is unavailable.
    fn fetch_metadata(&self, scope: ScopeId, identity: &AssemblyIdentity) -> Result<&'a [u8]>;

    /// Lexical scopes of the method body.
    ///
    /// # Errors
    /// Any error narrows the reuse window of the resulting context to the current offset.
    fn lexical_scopes(&self, method: &MethodLocation) -> Result<Vec<ILSpan>>;
}
