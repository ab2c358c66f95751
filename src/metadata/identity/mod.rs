//! Assembly identities.
//!
//! The evaluator reasons about assemblies purely by identity: the compiler reports missing
//! identities, the resolver matches them against the identities of loaded blocks, and the
//! retry loop tracks which identities it already asked the debuggee for.
//!
//! - [`AssemblyIdentity`] - name, version, culture and strong name
//! - [`AssemblyVersion`] - four-part version with total ordering
//! - [`Identity`] - public key or public key token
//! - [`compare`] - reference-to-definition matching used by the resolver
//!
//! # Example
//!
//! ```rust
//! use evalscope::metadata::identity::{compare, AssemblyIdentity, IdentityComparison};
//!
//! let reference = AssemblyIdentity::parse(
//!     "System.Core, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
//! )?;
//! let definition = AssemblyIdentity::parse(
//!     "system.core, Version=4.5.0.0, PublicKeyToken=b77a5c561934e089",
//! )?;
//! assert_eq!(
//!     compare(&reference, &definition),
//!     IdentityComparison::EquivalentIgnoringVersion
//! );
//! # Ok::<(), evalscope::Error>(())
//! ```
//!
//! # References
//! - ECMA-335 II.6.2.1.3 (PublicKeyToken), II.22.2 (Assembly), II.22.5 (AssemblyRef)

pub use assembly::{AssemblyIdentity, AssemblyVersion};
pub use comparer::{compare, IdentityComparison};
pub use cryptographic::Identity;

mod assembly;
mod comparer;
mod cryptographic;
