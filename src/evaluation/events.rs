//! Debug scopes and the module notifications that invalidate them.

use std::fmt;

/// Identifies one debug scope, typically an AppDomain of the debugged process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u64);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// A change to the modules of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ModuleEvent {
    /// A module of the scope was changed by edit-and-continue
    Modified(ScopeId),
    /// A module of the scope was unloaded
    Unloaded(ScopeId),
    /// The scope itself is going away
    ScopeTeardown(ScopeId),
}

impl ModuleEvent {
    /// The scope the event applies to
    #[must_use]
    pub fn scope(&self) -> ScopeId {
        match self {
            ModuleEvent::Modified(scope)
            | ModuleEvent::Unloaded(scope)
            | ModuleEvent::ScopeTeardown(scope) => *scope,
        }
    }
}

/// Receives module notifications from the debugger
pub trait ModuleEventListener {
    /// Handle `event`
    fn on_module_event(&self, event: ModuleEvent);
}
