//! The evaluation entry point.

use std::sync::Arc;

use tracing::debug;

use crate::{
    evaluation::{
        calculate_reuse_span,
        retry::{compile_with_retry, ProvidedContext},
        CachedContext, CompileRequest, ContextCache, DebuggeeInspector, DefaultFormatter,
        DiagnosticFormatter, EvaluatorConfig, ExpressionCompiler, ILSpan, MethodLocation,
        ModuleEvent, ModuleEventListener, ReuseConstraints, ScopeId,
    },
    metadata::{
        identity::AssemblyIdentity,
        references::{MetadataContextId, ReferenceKind},
        snapshot::MetadataSnapshot,
    },
    Error, Result,
};

/// A successful compile request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult<A> {
    /// What the compiler produced
    pub artifact: A,
    /// Number of compile calls the request took
    pub attempts: u32,
    /// True if the context came from the cache
    pub reused_context: bool,
}

/// Compiles debugger requests against the live metadata of a debuggee.
///
/// The session owns the context cache. Feed it module notifications through
/// [`ModuleEventListener::on_module_event`] so that stale contexts are dropped.
///
/// # Examples
///
/// ```rust,ignore
/// use evalscope::prelude::*;
///
/// let session = EvaluationSession::new(inspector, compiler)
///     .with_config(EvaluatorConfig::strict());
///
/// let result = session.compile(scope, &location, &CompileRequest::expression("x + 1"))?;
/// println!("{} attempts", result.attempts);
/// ```
pub struct EvaluationSession<'a, D, X>
where
    X: ExpressionCompiler<'a>,
{
    inspector: D,
    compiler: X,
    formatter: Box<dyn DiagnosticFormatter + Send + Sync>,
    config: EvaluatorConfig,
    cache: ContextCache<'a, X::Context>,
}

impl<'a, D, X> EvaluationSession<'a, D, X>
where
    D: DebuggeeInspector<'a>,
    X: ExpressionCompiler<'a>,
{
    /// Create a session with the default configuration and formatter
    pub fn new(inspector: D, compiler: X) -> Self {
        EvaluationSession {
            inspector,
            compiler,
            formatter: Box::new(DefaultFormatter),
            config: EvaluatorConfig::default(),
            cache: ContextCache::new(),
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: EvaluatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the formatter of failure messages
    #[must_use]
    pub fn with_formatter<T>(mut self, formatter: T) -> Self
    where
        T: DiagnosticFormatter + Send + Sync + 'static,
    {
        self.formatter = Box::new(formatter);
        self
    }

    /// The configuration
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// The context cache
    pub fn cache(&self) -> &ContextCache<'a, X::Context> {
        &self.cache
    }

    /// The debuggee
    pub fn inspector(&self) -> &D {
        &self.inspector
    }

    /// The compiler
    pub fn compiler(&self) -> &X {
        &self.compiler
    }

    /// Compile `request` at `method` in `scope`.
    ///
    /// Builds the scope's metadata snapshot, reuses a cached context if one is valid for the
    /// location, and retries as described in [`crate::evaluation`]. Successful contexts are
    /// cached for the offsets that share the location's lexical scopes.
    ///
    /// # Errors
    /// - [`Error::InvalidMethodVersion`] if `method.method_version` is 0
    /// - [`Error::Compilation`] if no attempt compiled
    /// - [`Error::Unreachable`] on internal failures, unless the configuration panics instead
    pub fn compile(
        &self,
        scope: ScopeId,
        method: &MethodLocation,
        request: &CompileRequest,
    ) -> Result<CompileResult<X::Artifact>> {
        if method.method_version == 0 {
            return Err(Error::InvalidMethodVersion(method.method_version));
        }

        let epoch = self.cache.epoch(scope);
        let previous = if self.config.reuse_contexts {
            self.cache.get(scope)
        } else {
            None
        };

        let intrinsics = self.inspector.intrinsic_metadata(scope).map_err(|error| {
            self.config
                .internal_error(format!("intrinsic metadata unavailable - {error}"))
        })?;
        let snapshot = MetadataSnapshot::build(
            self.inspector.module_metadata(scope),
            intrinsics,
            previous.as_ref().map(|slot| slot.snapshot()),
        )
        .map_err(|error| match error {
            Error::Unreachable(message) => self.config.internal_error(message),
            other => other,
        })?;

        let outcome = compile_with_retry(
            &self.compiler,
            request,
            method.module_version_id,
            snapshot,
            &self.config,
            self.formatter.as_ref(),
            |snapshot: &MetadataSnapshot<'a>, kind: ReferenceKind| {
                self.provide_context(scope, method, snapshot, kind)
            },
            |identity: &AssemblyIdentity| self.inspector.fetch_metadata(scope, identity),
        )?;

        if self.config.reuse_contexts && !outcome.reused_context {
            let il_span = match self.inspector.lexical_scopes(method) {
                Ok(scopes) => calculate_reuse_span(method.il_offset, ILSpan::MAX, &scopes),
                Err(error) => {
                    debug!(%error, "no lexical scopes, context only serves this offset");
                    ILSpan::single(method.il_offset)
                }
            };
            let constraints = ReuseConstraints::new(
                method.module_version_id,
                method.method_token,
                method.method_version,
                il_span,
            )?;

            debug!(%scope, %il_span, id = ?outcome.context_id, "caching context");
            self.cache.put(
                scope,
                epoch,
                outcome.snapshot,
                outcome.context_id,
                CachedContext {
                    constraints,
                    context: outcome.context,
                },
            );
        }

        Ok(CompileResult {
            artifact: outcome.artifact,
            attempts: outcome.attempts,
            reused_context: outcome.reused_context,
        })
    }

    fn provide_context(
        &self,
        scope: ScopeId,
        method: &MethodLocation,
        snapshot: &MetadataSnapshot<'a>,
        kind: ReferenceKind,
    ) -> Result<ProvidedContext<X::Context>> {
        if self.config.reuse_contexts {
            let id = MetadataContextId::for_kind(kind, method.module_version_id);
            if let Some(context) = self.cache.lookup(scope, snapshot, id, method) {
                debug!(%scope, ?id, "reusing cached context");
                return Ok(ProvidedContext {
                    context,
                    id,
                    reused: true,
                });
            }
        }

        let references = snapshot.make_assembly_references(method.module_version_id, kind);
        let context = self
            .compiler
            .create_context(&references, method)
            .map_err(|error| {
                self.config
                    .internal_error(format!("context creation failed - {error}"))
            })?;

        Ok(ProvidedContext {
            context: Arc::new(context),
            id: references.context_id(),
            reused: false,
        })
    }
}

impl<'a, D, X> ModuleEventListener for EvaluationSession<'a, D, X>
where
    X: ExpressionCompiler<'a>,
{
    fn on_module_event(&self, event: ModuleEvent) {
        self.cache.on_module_event(event);
    }
}
