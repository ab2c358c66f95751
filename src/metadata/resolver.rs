//! Best-match resolution of referenced assembly identities.

use std::collections::HashMap;

use crate::metadata::identity::{compare, AssemblyIdentity, IdentityComparison};

/// Maps assembly identities to the references that define them.
///
/// Lookups go by simple name, case-insensitively. Among candidates with the same name an exact
/// match wins; otherwise the highest version that differs only in version is chosen.
///
/// # Examples
///
/// ```rust
/// use evalscope::metadata::{identity::AssemblyIdentity, resolver::AssemblyReferenceResolver};
///
/// let mut resolver = AssemblyReferenceResolver::new();
/// for version in ["1.0.0.0", "3.0.0.0", "2.0.0.0"] {
///     let identity = AssemblyIdentity::parse(&format!("Foo, Version={version}"))?;
///     resolver.add(identity, version);
/// }
///
/// let wanted = AssemblyIdentity::parse("foo, Version=4.0.0.0")?;
/// let (_, best) = resolver.resolve_missing_assembly(&wanted).unwrap();
/// assert_eq!(*best, "3.0.0.0");
/// # Ok::<(), evalscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct AssemblyReferenceResolver<R> {
    by_name: HashMap<String, Vec<(AssemblyIdentity, R)>>,
}

impl<R> Default for AssemblyReferenceResolver<R> {
    fn default() -> Self {
        Self {
            by_name: HashMap::new(),
        }
    }
}

impl<R> AssemblyReferenceResolver<R> {
    /// Create an empty resolver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `reference` as defining `identity`
    pub fn add(&mut self, identity: AssemblyIdentity, reference: R) {
        self.by_name
            .entry(identity.name_key())
            .or_default()
            .push((identity, reference));
    }

    /// Number of registered candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }

    /// True if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// The best registered candidate for `identity`.
    ///
    /// Returns the first exact match if one exists, else the highest-versioned candidate that is
    /// equivalent ignoring version, else `None`. Ties keep the candidate registered first.
    #[must_use]
    pub fn resolve_missing_assembly(
        &self,
        identity: &AssemblyIdentity,
    ) -> Option<(&AssemblyIdentity, &R)> {
        let candidates = self.by_name.get(&identity.name_key())?;

        let mut best: Option<&(AssemblyIdentity, R)> = None;
        for candidate in candidates {
            match compare(identity, &candidate.0) {
                IdentityComparison::Equivalent => return Some((&candidate.0, &candidate.1)),
                IdentityComparison::EquivalentIgnoringVersion => {
                    if best.map_or(true, |(best, _)| candidate.0.version > best.version) {
                        best = Some(candidate);
                    }
                }
                IdentityComparison::NotEquivalent => {}
            }
        }

        best.map(|(identity, reference)| (identity, reference))
    }
}
