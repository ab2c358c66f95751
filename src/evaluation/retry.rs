//! The compile attempt loop.
//!
//! A request is compiled against the full snapshot first. When that fails the diagnostics
//! decide what happens next:
//!
//! - every error is an ambiguity between assemblies: compile once more against the target
//!   module's own references, and stop. Skipped if the target module is not in the snapshot,
//!   since its references cannot be told apart from the full set;
//! - an error names assemblies the compiler could not see: fetch their metadata from the
//!   debuggee and try again, as long as something new was obtained;
//! - anything else: stop.
//!
//! Every identity is fetched at most once per request, so a request compiles at most
//! `1 + n` times for `n` distinct missing identities, plus the one restricted attempt.

use std::{collections::HashSet, sync::Arc};

use tracing::debug;

use crate::{
    evaluation::{
        classify, Classification, CompileRequest, Compilation, Diagnostic, DiagnosticFormatter,
        EvaluatorConfig, ExpressionCompiler,
    },
    metadata::{
        identity::AssemblyIdentity,
        references::{MetadataContextId, ReferenceKind},
        snapshot::{blocks_for_missing, MetadataSnapshot},
    },
    Error, Result,
};

/// A context handed to the loop by its caller
pub(crate) struct ProvidedContext<C> {
    pub context: Arc<C>,
    pub id: MetadataContextId,
    pub reused: bool,
}

/// A successful run of the loop
pub(crate) struct RetryOutcome<'a, C, A> {
    pub artifact: A,
    pub context: Arc<C>,
    pub context_id: MetadataContextId,
    pub reused_context: bool,
    pub snapshot: MetadataSnapshot<'a>,
    pub attempts: u32,
}

/// Identities fetched so far, and which library query operators are assumed to live in.
#[derive(Debug)]
pub(crate) struct RetryTracker {
    visited: HashSet<AssemblyIdentity>,
    linq_library: AssemblyIdentity,
    linq_fallback: AssemblyIdentity,
    swapped: bool,
}

impl RetryTracker {
    pub fn new(config: &EvaluatorConfig) -> Self {
        RetryTracker {
            visited: HashSet::new(),
            linq_library: config.linq_library.clone(),
            linq_fallback: config.linq_fallback_library.clone(),
            swapped: false,
        }
    }

    /// The library missing query or dynamic support is attributed to
    pub fn linq_library(&self) -> &AssemblyIdentity {
        &self.linq_library
    }

    /// The identities of `missing` not fetched yet, now marked as fetched
    pub fn unvisited(&mut self, missing: &[AssemblyIdentity]) -> Vec<AssemblyIdentity> {
        missing
            .iter()
            .filter(|identity| self.visited.insert((*identity).clone()))
            .cloned()
            .collect()
    }

    /// Swap to the fallback LINQ library if `missing` blamed the current one.
    ///
    /// Happens at most once; returns the fallback if it still has to be fetched.
    pub fn swap_linq_library(&mut self, missing: &[AssemblyIdentity]) -> Option<AssemblyIdentity> {
        if self.swapped || !missing.contains(&self.linq_library) {
            return None;
        }

        self.swapped = true;
        debug!(
            from = %self.linq_library,
            to = %self.linq_fallback,
            "assuming query operators live in the fallback library"
        );
        self.linq_library = self.linq_fallback.clone();
        let fallback = self.linq_fallback.clone();
        self.visited.insert(fallback.clone()).then_some(fallback)
    }
}

enum RetryState<'a> {
    /// Compile against every assembly of `snapshot`
    Compile { snapshot: MetadataSnapshot<'a> },
    /// Compile once against the target module's direct references
    Restrict {
        snapshot: MetadataSnapshot<'a>,
        diagnostics: Vec<Diagnostic>,
    },
    /// Fetch `identities` and compile again if anything new was obtained
    Fetch {
        snapshot: MetadataSnapshot<'a>,
        identities: Vec<AssemblyIdentity>,
        missing: Vec<AssemblyIdentity>,
        diagnostics: Vec<Diagnostic>,
    },
    Failed {
        diagnostics: Vec<Diagnostic>,
        missing: Vec<AssemblyIdentity>,
    },
}

/// Decide what follows a failed compile against the full snapshot
fn plan_after_failure<'a>(
    config: &EvaluatorConfig,
    tracker: &mut RetryTracker,
    target: uguid::Guid,
    snapshot: MetadataSnapshot<'a>,
    diagnostics: Vec<Diagnostic>,
) -> RetryState<'a> {
    match classify(&diagnostics, tracker.linq_library()) {
        Classification::Ambiguous
            if config.restrict_on_ambiguity && snapshot.find_module(target).is_some() =>
        {
            debug!("ambiguous definitions, retrying with referenced modules only");
            RetryState::Restrict {
                snapshot,
                diagnostics,
            }
        }
        Classification::Missing(missing) if config.fetch_missing_assemblies => RetryState::Fetch {
            snapshot,
            identities: tracker.unvisited(&missing),
            missing,
            diagnostics,
        },
        Classification::Missing(missing) => RetryState::Failed {
            diagnostics,
            missing,
        },
        Classification::Ambiguous | Classification::Unactionable => RetryState::Failed {
            diagnostics,
            missing: Vec::new(),
        },
    }
}

/// Split a compilation into its artifact or its diagnostics
fn finish<A>(
    config: &EvaluatorConfig,
    compilation: Compilation<A>,
) -> Result<std::result::Result<A, Vec<Diagnostic>>> {
    if compilation.has_errors() {
        return Ok(Err(compilation.diagnostics));
    }

    match compilation.artifact {
        Some(artifact) => Ok(Ok(artifact)),
        None => Err(config.internal_error("compiler reported neither an artifact nor an error")),
    }
}

/// Run the attempt loop for one request.
///
/// `target` is the module version id of the module the request is evaluated in. `provide`
/// yields the context for a snapshot and reference kind, from the cache or freshly built.
/// `fetch` reads the metadata of a missing assembly from the debuggee.
///
/// # Errors
/// Returns [`Error::Compilation`] once no attempt is left, or the error of `provide`.
pub(crate) fn compile_with_retry<'a, X, P, F>(
    compiler: &X,
    request: &CompileRequest,
    target: uguid::Guid,
    snapshot: MetadataSnapshot<'a>,
    config: &EvaluatorConfig,
    formatter: &dyn DiagnosticFormatter,
    mut provide: P,
    mut fetch: F,
) -> Result<RetryOutcome<'a, X::Context, X::Artifact>>
where
    X: ExpressionCompiler<'a>,
    P: FnMut(&MetadataSnapshot<'a>, ReferenceKind) -> Result<ProvidedContext<X::Context>>,
    F: FnMut(&AssemblyIdentity) -> Result<&'a [u8]>,
{
    let mut tracker = RetryTracker::new(config);
    let mut attempts = 0u32;
    let mut state = RetryState::Compile { snapshot };

    loop {
        state = match state {
            RetryState::Compile { snapshot } => {
                attempts += 1;
                let provided = provide(&snapshot, ReferenceKind::AllAssemblies)?;
                match finish(config, compiler.compile(&provided.context, request))? {
                    Ok(artifact) => {
                        return Ok(RetryOutcome {
                            artifact,
                            context: provided.context,
                            context_id: provided.id,
                            reused_context: provided.reused,
                            snapshot,
                            attempts,
                        })
                    }
                    Err(diagnostics) => {
                        debug!(attempt = attempts, errors = diagnostics.len(), "compile failed");
                        plan_after_failure(config, &mut tracker, target, snapshot, diagnostics)
                    }
                }
            }
            RetryState::Restrict {
                snapshot,
                diagnostics,
            } => {
                attempts += 1;
                let provided = provide(&snapshot, ReferenceKind::DirectReferencesOnly)?;
                match finish(config, compiler.compile(&provided.context, request))? {
                    Ok(artifact) => {
                        return Ok(RetryOutcome {
                            artifact,
                            context: provided.context,
                            context_id: provided.id,
                            reused_context: provided.reused,
                            snapshot,
                            attempts,
                        })
                    }
                    Err(_) => RetryState::Failed {
                        diagnostics,
                        missing: Vec::new(),
                    },
                }
            }
            RetryState::Fetch {
                snapshot,
                identities,
                missing,
                diagnostics,
            } => {
                let blocks = blocks_for_missing(&identities, &mut fetch);
                let merged = snapshot.with_additional(blocks);

                if merged.len() > snapshot.len() {
                    debug!(
                        added = merged.len() - snapshot.len(),
                        "retrying with fetched metadata"
                    );
                    RetryState::Compile { snapshot: merged }
                } else if let Some(fallback) = tracker.swap_linq_library(&missing) {
                    let mut missing = missing;
                    if !missing.contains(&fallback) {
                        missing.push(fallback.clone());
                    }
                    RetryState::Fetch {
                        snapshot,
                        identities: vec![fallback],
                        missing,
                        diagnostics,
                    }
                } else {
                    debug!(missing = missing.len(), "no new metadata obtained");
                    RetryState::Failed {
                        diagnostics,
                        missing,
                    }
                }
            }
            RetryState::Failed {
                diagnostics,
                missing,
            } => {
                let message = diagnostics
                    .iter()
                    .find(|d| d.is_error())
                    .map_or_else(|| "compilation failed".to_string(), |d| formatter.format(d));
                debug!(attempts, %message, "giving up");

                return Err(Error::Compilation {
                    message,
                    missing_assemblies: missing,
                });
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::{
        evaluation::{DefaultFormatter, DiagnosticCode},
        test::{mvid, MetadataBuilder, ScriptedCompiler, TestContext},
    };

    fn identity(display_name: &str) -> AssemblyIdentity {
        AssemblyIdentity::parse(display_name).unwrap()
    }

    struct Fixture {
        app: Vec<u8>,
        foo: Vec<u8>,
        core: Vec<u8>,
        intrinsics: Vec<u8>,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                app: MetadataBuilder::new("App.exe", mvid(1))
                    .assembly("App, Version=1.0.0.0")
                    .build(),
                foo: MetadataBuilder::new("Foo.dll", mvid(2))
                    .assembly("Foo, Version=1.0.0.0")
                    .build(),
                core: MetadataBuilder::new("System.Core.dll", mvid(3))
                    .assembly("System.Core, Version=4.0.0.0")
                    .build(),
                intrinsics: MetadataBuilder::intrinsics(),
            }
        }

        fn snapshot(&self) -> MetadataSnapshot<'_> {
            MetadataSnapshot::build([Ok(self.app.as_slice())], &self.intrinsics, None).unwrap()
        }
    }

    fn run<'a, F>(
        compiler: &ScriptedCompiler<F>,
        snapshot: MetadataSnapshot<'a>,
        config: &EvaluatorConfig,
        fetch: impl FnMut(&AssemblyIdentity) -> Result<&'a [u8]>,
    ) -> Result<RetryOutcome<'a, TestContext, String>>
    where
        F: Fn(&TestContext, &CompileRequest) -> Compilation<String>,
    {
        run_in(mvid(1), compiler, snapshot, config, fetch)
    }

    fn run_in<'a, F>(
        target: uguid::Guid,
        compiler: &ScriptedCompiler<F>,
        snapshot: MetadataSnapshot<'a>,
        config: &EvaluatorConfig,
        fetch: impl FnMut(&AssemblyIdentity) -> Result<&'a [u8]>,
    ) -> Result<RetryOutcome<'a, TestContext, String>>
    where
        F: Fn(&TestContext, &CompileRequest) -> Compilation<String>,
    {
        compile_with_retry(
            compiler,
            &CompileRequest::expression("x"),
            target,
            snapshot,
            config,
            &DefaultFormatter,
            |snapshot: &MetadataSnapshot<'a>, kind| {
                let references = snapshot.make_assembly_references(target, kind);
                let context = <ScriptedCompiler<F> as ExpressionCompiler<'a>>::create_context(
                    compiler,
                    &references,
                    &crate::test::method(target, 0),
                )?;
                Ok(ProvidedContext {
                    context: Arc::new(context),
                    id: references.context_id(),
                    reused: false,
                })
            },
            fetch,
        )
    }

    #[test]
    fn first_attempt_succeeds() {
        let fixture = Fixture::new();
        let compiler = ScriptedCompiler::new(|_, _| Compilation::success("ok".to_string()));

        let outcome = run(&compiler, fixture.snapshot(), &EvaluatorConfig::default(), |_| {
            panic!("nothing to fetch")
        })
        .unwrap();
        assert_eq!(outcome.artifact, "ok");
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.context_id, MetadataContextId::Shared);
    }

    #[test]
    fn missing_assembly_is_fetched() {
        let fixture = Fixture::new();
        let foo = identity("Foo, Version=1.0.0.0");
        let compiler = ScriptedCompiler::new(|context: &TestContext, _: &CompileRequest| {
            if context.sees("Foo.dll") {
                Compilation::success(format!("compiled with {}", context.modules.len()))
            } else {
                Compilation::failure(vec![Diagnostic::missing_assembly(
                    identity("Foo, Version=1.0.0.0"),
                    "Foo is not referenced",
                )])
            }
        });

        let fetched = RefCell::new(Vec::new());
        let outcome = run(&compiler, fixture.snapshot(), &EvaluatorConfig::default(), |id| {
            fetched.borrow_mut().push(id.clone());
            Ok(fixture.foo.as_slice())
        })
        .unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.artifact, "compiled with 3");
        assert!(outcome.snapshot.find_module(mvid(2)).is_some());
        assert_eq!(*fetched.borrow(), [foo]);
    }

    #[test]
    fn unobtainable_assembly_stops_after_one_fetch() {
        let fixture = Fixture::new();
        let compiler = ScriptedCompiler::new(|_, _| {
            Compilation::failure(vec![Diagnostic::missing_assembly(
                identity("Bar, Version=1.0.0.0"),
                "Bar is not referenced",
            )])
        });

        let fetches = Cell::new(0);
        let error = run(&compiler, fixture.snapshot(), &EvaluatorConfig::default(), |id| {
            fetches.set(fetches.get() + 1);
            Err(Error::MetadataUnavailable(id.name.clone()))
        })
        .err()
        .unwrap();

        assert_eq!(fetches.get(), 1);
        assert_eq!(compiler.compiled(), 1);
        match error {
            Error::Compilation {
                message,
                missing_assemblies,
            } => {
                assert_eq!(message, "error CS0012: Bar is not referenced");
                assert_eq!(missing_assemblies, [identity("Bar, Version=1.0.0.0")]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn same_identity_reported_forever_terminates() {
        let fixture = Fixture::new();
        let compiler = ScriptedCompiler::new(|_, _| {
            Compilation::failure(vec![Diagnostic::missing_assembly(
                identity("Foo, Version=1.0.0.0"),
                "Foo is not referenced",
            )])
        });

        let result = run(&compiler, fixture.snapshot(), &EvaluatorConfig::default(), |_| {
            Ok(fixture.foo.as_slice())
        });
        assert!(matches!(result, Err(Error::Compilation { .. })));
        assert_eq!(compiler.compiled(), 2);
    }

    #[test]
    fn ambiguity_uses_referenced_modules_once() {
        let fixture = Fixture::new();
        let compiler = ScriptedCompiler::new(|context: &TestContext, _: &CompileRequest| {
            if context.kind == ReferenceKind::DirectReferencesOnly {
                Compilation::success("restricted".to_string())
            } else {
                Compilation::failure(vec![Diagnostic::error(
                    DiagnosticCode::SameFullNameAggAgg,
                    "C exists in A and B",
                )])
            }
        });

        let before = fixture.snapshot();
        let outcome = run(&compiler, before.clone(), &EvaluatorConfig::default(), |_| {
            panic!("ambiguity never fetches")
        })
        .unwrap();
        assert_eq!(outcome.artifact, "restricted");
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.context_id, MetadataContextId::Module(mvid(1)));
        assert!(outcome.snapshot.matches(&before));
    }

    #[test]
    fn failed_restricted_attempt_reports_original_error() {
        let fixture = Fixture::new();
        let compiler = ScriptedCompiler::new(|context: &TestContext, _: &CompileRequest| {
            let message = match context.kind {
                ReferenceKind::AllAssemblies => "original",
                _ => "restricted",
            };
            Compilation::failure(vec![Diagnostic::error(DiagnosticCode::AmbigCall, message)])
        });

        let error = run(&compiler, fixture.snapshot(), &EvaluatorConfig::default(), |_| {
            panic!("ambiguity never fetches")
        })
        .err()
        .unwrap();
        assert!(matches!(error, Error::Compilation { message, .. } if message == "error CS0121: original"));
        assert_eq!(compiler.compiled(), 2);
    }

    #[test]
    fn ambiguity_outside_the_snapshot_is_not_restricted() {
        let fixture = Fixture::new();
        let compiler = ScriptedCompiler::new(|context: &TestContext, _: &CompileRequest| {
            assert_eq!(context.kind, ReferenceKind::AllAssemblies);
            Compilation::failure(vec![Diagnostic::error(
                DiagnosticCode::SameFullNameAggAgg,
                "C exists in A and B",
            )])
        });

        let config = EvaluatorConfig::default();
        let error = run_in(mvid(9), &compiler, fixture.snapshot(), &config, |_| {
            panic!("ambiguity never fetches")
        })
        .err()
        .unwrap();
        assert!(matches!(
            error,
            Error::Compilation { missing_assemblies, .. } if missing_assemblies.is_empty()
        ));
        assert_eq!(compiler.created(), 1);
        assert_eq!(compiler.compiled(), 1);
    }

    #[test]
    fn no_fallbacks_compiles_once() {
        let fixture = Fixture::new();
        let compiler = ScriptedCompiler::new(|_, _| {
            Compilation::failure(vec![Diagnostic::missing_assembly(
                identity("Foo, Version=1.0.0.0"),
                "Foo is not referenced",
            )])
        });

        let result = run(&compiler, fixture.snapshot(), &EvaluatorConfig::no_fallbacks(), |_| {
            panic!("fetching is disabled")
        });
        assert!(matches!(
            result,
            Err(Error::Compilation { missing_assemblies, .. }) if missing_assemblies.len() == 1
        ));
        assert_eq!(compiler.compiled(), 1);
    }

    #[test]
    fn query_falls_back_to_system_core() {
        let fixture = Fixture::new();
        let compiler = ScriptedCompiler::new(|context: &TestContext, _: &CompileRequest| {
            if context.sees("System.Core.dll") {
                Compilation::success("query".to_string())
            } else {
                Compilation::failure(vec![Diagnostic::error(
                    DiagnosticCode::QueryNoProviderStandard,
                    "no query provider",
                )])
            }
        });

        let fetched = RefCell::new(Vec::new());
        let outcome = run(&compiler, fixture.snapshot(), &EvaluatorConfig::default(), |id| {
            fetched.borrow_mut().push(id.name.clone());
            if id.name == "System.Core" {
                Ok(fixture.core.as_slice())
            } else {
                Err(Error::MetadataUnavailable(id.name.clone()))
            }
        })
        .unwrap();

        assert_eq!(outcome.artifact, "query");
        assert_eq!(outcome.attempts, 2);
        assert_eq!(*fetched.borrow(), ["System.Linq", "System.Core"]);
    }

    #[test]
    fn linq_swap_happens_once() {
        let fixture = Fixture::new();
        let compiler = ScriptedCompiler::new(|_, _| {
            Compilation::failure(vec![Diagnostic::error(
                DiagnosticCode::DynamicAttributeMissing,
                "dynamic",
            )])
        });

        let fetched = RefCell::new(Vec::new());
        let result = run(&compiler, fixture.snapshot(), &EvaluatorConfig::default(), |id| {
            fetched.borrow_mut().push(id.name.clone());
            Err(Error::MetadataUnavailable(id.name.clone()))
        });

        match result.err().unwrap() {
            Error::Compilation {
                missing_assemblies, ..
            } => {
                let names: Vec<_> = missing_assemblies.iter().map(|id| id.name.as_str()).collect();
                assert_eq!(names, ["System.Linq", "System.Core"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(*fetched.borrow(), ["System.Linq", "System.Core"]);
        assert_eq!(compiler.compiled(), 1);
    }

    #[test]
    fn tracker_visits_each_identity_once() {
        let mut tracker = RetryTracker::new(&EvaluatorConfig::default());
        let a = identity("A");
        let b = identity("B");

        assert_eq!(tracker.unvisited(&[a.clone(), b.clone()]), [a.clone(), b.clone()]);
        assert!(tracker.unvisited(&[a.clone()]).is_empty());

        assert!(tracker.swap_linq_library(&[a]).is_none());
        let linq = tracker.linq_library().clone();
        let fallback = tracker.swap_linq_library(&[linq]).unwrap();
        assert_eq!(fallback.name, "System.Core");
        assert_eq!(tracker.linq_library(), &fallback);
        assert!(tracker.swap_linq_library(&[fallback]).is_none());
    }
}
