//! Validity windows of cached evaluation contexts.
//!
//! A context compiled at one IL offset can serve any other offset of the same method version
//! that sees exactly the same locals. The window is the intersection of the method's lexical
//! scopes, narrowed so that no scope boundary falls inside it.

use crate::{
    evaluation::ILSpan,
    metadata::token::Token,
    Error, Result,
};

/// The conditions under which a cached context may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReuseConstraints {
    module_version_id: uguid::Guid,
    method_token: Token,
    method_version: u32,
    il_span: ILSpan,
}

impl ReuseConstraints {
    /// Create the constraints for a context compiled in the given method.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMethodVersion`] if `method_version` is `0`.
    pub fn new(
        module_version_id: uguid::Guid,
        method_token: Token,
        method_version: u32,
        il_span: ILSpan,
    ) -> Result<ReuseConstraints> {
        if method_version == 0 {
            return Err(Error::InvalidMethodVersion(method_version));
        }

        Ok(ReuseConstraints {
            module_version_id,
            method_token,
            method_version,
            il_span,
        })
    }

    /// True if a request at the given location may use the context
    #[must_use]
    pub fn are_satisfied(
        &self,
        module_version_id: uguid::Guid,
        method_token: Token,
        method_version: u32,
        il_offset: u32,
    ) -> bool {
        self.module_version_id == module_version_id
            && self.method_token == method_token
            && self.method_version == method_version
            && self.il_span.contains(il_offset)
    }

    /// The offsets the context is valid for
    #[must_use]
    pub fn il_span(&self) -> ILSpan {
        self.il_span
    }
}

/// Narrow `initial` to the offsets that share every scope decision with `il_offset`.
///
/// For each scope: if the offset lies before it, the span ends at the scope start; if it lies
/// after it, the span starts at the scope end; if it lies inside, the span is clamped to the
/// scope.
#[must_use]
pub fn calculate_reuse_span(il_offset: u32, initial: ILSpan, scopes: &[ILSpan]) -> ILSpan {
    let mut start = initial.start();
    let mut end = initial.end();

    for scope in scopes {
        if il_offset < scope.start() {
            end = end.min(scope.start());
        } else if il_offset >= scope.end() {
            start = start.max(scope.end());
        } else {
            start = start.max(scope.start());
            end = end.min(scope.end());
        }
    }

    ILSpan::new_unchecked(start, end.max(start))
}
