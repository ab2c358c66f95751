//! Fixtures shared by the unit tests: metadata images, a scripted compiler and an in-memory
//! debuggee.

mod builder;

use std::cell::{Cell, RefCell};

pub use builder::{mvid, MetadataBuilder, ECMA_KEY};

use crate::{
    evaluation::{
        Compilation, CompileRequest, DebuggeeInspector, ExpressionCompiler, ILSpan,
        MethodLocation, ScopeId,
    },
    metadata::{
        identity::AssemblyIdentity,
        references::{AssemblyReferences, ReferenceKind},
        token::Token,
    },
    Error, Result,
};

/// First method of the module `mvid`, at `il_offset`
pub fn method(mvid: uguid::Guid, il_offset: u32) -> MethodLocation {
    MethodLocation {
        module_version_id: mvid,
        method_token: Token::new(0x0600_0001),
        method_version: 1,
        il_offset,
    }
}

/// What a [`ScriptedCompiler`] context can see
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestContext {
    pub kind: ReferenceKind,
    pub modules: Vec<String>,
}

impl TestContext {
    pub fn sees(&self, module: &str) -> bool {
        self.modules.iter().any(|name| name == module)
    }
}

type Rule = fn(&TestContext, &CompileRequest) -> Compilation<String>;

/// A compiler whose outcome is decided by a rule over the visible modules
pub struct ScriptedCompiler<F> {
    rule: F,
    broken: bool,
    created: Cell<usize>,
    compiled: Cell<usize>,
}

impl<F> ScriptedCompiler<F>
where
    F: Fn(&TestContext, &CompileRequest) -> Compilation<String>,
{
    pub fn new(rule: F) -> Self {
        ScriptedCompiler {
            rule,
            broken: false,
            created: Cell::new(0),
            compiled: Cell::new(0),
        }
    }
}

impl ScriptedCompiler<Rule> {
    /// A compiler that cannot create contexts
    pub fn broken() -> Self {
        ScriptedCompiler {
            rule: |_, _| Compilation::failure(Vec::new()),
            broken: true,
            created: Cell::new(0),
            compiled: Cell::new(0),
        }
    }
}

impl<F> ScriptedCompiler<F> {
    /// Number of contexts created
    pub fn created(&self) -> usize {
        self.created.get()
    }

    /// Number of compile calls
    pub fn compiled(&self) -> usize {
        self.compiled.get()
    }
}

impl<'a, F> ExpressionCompiler<'a> for ScriptedCompiler<F>
where
    F: Fn(&TestContext, &CompileRequest) -> Compilation<String>,
{
    type Context = TestContext;
    type Artifact = String;

    fn create_context(
        &self,
        references: &AssemblyReferences<'a>,
        _method: &MethodLocation,
    ) -> Result<TestContext> {
        if self.broken {
            return Err(Error::Error("no compiler".to_string()));
        }

        self.created.set(self.created.get() + 1);
        Ok(TestContext {
            kind: references.kind,
            modules: references
                .blocks()
                .map(|block| block.name().to_string())
                .collect(),
        })
    }

    fn compile(&self, context: &TestContext, request: &CompileRequest) -> Compilation<String> {
        self.compiled.set(self.compiled.get() + 1);
        (self.rule)(context, request)
    }
}

/// An in-memory debuggee with a fixed set of module images
pub struct Debuggee {
    images: Vec<Vec<u8>>,
    loaded: RefCell<Vec<bool>>,
    intrinsics: Option<Vec<u8>>,
    fetchable: Vec<(String, Vec<u8>)>,
    scopes: Option<Vec<ILSpan>>,
    fetches: RefCell<Vec<String>>,
}

impl Debuggee {
    /// All `images` loaded, no lexical scopes
    pub fn new(images: Vec<Vec<u8>>) -> Self {
        Debuggee {
            loaded: RefCell::new(vec![true; images.len()]),
            images,
            intrinsics: Some(MetadataBuilder::intrinsics()),
            fetchable: Vec::new(),
            scopes: Some(Vec::new()),
            fetches: RefCell::new(Vec::new()),
        }
    }

    /// Make `image` fetchable by assembly simple name
    pub fn with_fetchable(mut self, name: &str, image: Vec<u8>) -> Self {
        self.fetchable.push((name.to_string(), image));
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<ILSpan>) -> Self {
        self.scopes = Some(scopes);
        self
    }

    /// Lexical scope lookup fails
    pub fn without_scopes(mut self) -> Self {
        self.scopes = None;
        self
    }

    pub fn without_intrinsics(mut self) -> Self {
        self.intrinsics = None;
        self
    }

    pub fn load(&self, index: usize) {
        self.loaded.borrow_mut()[index] = true;
    }

    pub fn unload(&self, index: usize) {
        self.loaded.borrow_mut()[index] = false;
    }

    /// Simple names of all fetch requests, in order
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.borrow().clone()
    }
}

impl<'a> DebuggeeInspector<'a> for &'a Debuggee {
    fn module_metadata(&self, _scope: ScopeId) -> Vec<Result<&'a [u8]>> {
        let debuggee: &'a Debuggee = *self;
        let loaded = debuggee.loaded.borrow();
        debuggee
            .images
            .iter()
            .zip(loaded.iter())
            .filter(|(_, loaded)| **loaded)
            .map(|(image, _)| Ok(image.as_slice()))
            .collect()
    }

    fn intrinsic_metadata(&self, _scope: ScopeId) -> Result<&'a [u8]> {
        let debuggee: &'a Debuggee = *self;
        debuggee
            .intrinsics
            .as_deref()
            .ok_or_else(|| Error::MetadataUnavailable("<intrinsics>".to_string()))
    }

    fn fetch_metadata(&self, _scope: ScopeId, identity: &AssemblyIdentity) -> Result<&'a [u8]> {
        let debuggee: &'a Debuggee = *self;
        debuggee.fetches.borrow_mut().push(identity.name.clone());
        debuggee
            .fetchable
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&identity.name))
            .map(|(_, image)| image.as_slice())
            .ok_or_else(|| Error::MetadataUnavailable(identity.display_name()))
    }

    fn lexical_scopes(&self, _method: &MethodLocation) -> Result<Vec<ILSpan>> {
        self.scopes
            .clone()
            .ok_or_else(|| Error::MetadataUnavailable("no symbols".to_string()))
    }
}
