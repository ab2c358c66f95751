//! Reference-to-definition identity matching.

use crate::metadata::identity::AssemblyIdentity;

/// How well a definition satisfies a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityComparison {
    /// Same assembly, same version
    Equivalent,
    /// Same assembly, different version
    EquivalentIgnoringVersion,
    /// Different assemblies
    NotEquivalent,
}

/// Compare a referenced identity against a candidate definition.
///
/// Simple name and culture compare case-insensitively. If either side is strong-named the
/// public key tokens must match; a full key is reduced to its token first. Weakly named
/// assemblies still compare by version.
#[must_use]
pub fn compare(reference: &AssemblyIdentity, definition: &AssemblyIdentity) -> IdentityComparison {
    if !reference.name.eq_ignore_ascii_case(&definition.name) {
        return IdentityComparison::NotEquivalent;
    }

    let culture = |identity: &AssemblyIdentity| {
        identity
            .culture
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase()
    };
    if culture(reference) != culture(definition) {
        return IdentityComparison::NotEquivalent;
    }

    if reference.public_key_token() != definition.public_key_token() {
        return IdentityComparison::NotEquivalent;
    }

    if reference.version == definition.version {
        IdentityComparison::Equivalent
    } else {
        IdentityComparison::EquivalentIgnoringVersion
    }
}
