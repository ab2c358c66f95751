//! Evaluator configuration.

use tracing::error;

use crate::{
    metadata::identity::{AssemblyIdentity, AssemblyVersion, Identity},
    Error,
};

/// Configuration for [`EvaluationSession`](crate::evaluation::EvaluationSession)
///
/// # Examples
///
/// ```rust
/// use evalscope::EvaluatorConfig;
///
/// let config = EvaluatorConfig::no_fallbacks();
/// assert!(config.reuse_contexts);
/// assert!(!config.fetch_missing_assemblies);
/// assert_eq!(EvaluatorConfig::default().linq_library.name, "System.Linq");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Reuse cached contexts when the metadata and location allow it
    pub reuse_contexts: bool,
    /// Retry once against the target module's own references when every error is an ambiguity
    pub restrict_on_ambiguity: bool,
    /// Fetch metadata for assemblies the compiler reports missing
    pub fetch_missing_assemblies: bool,
    /// Assembly assumed to provide query operators and dynamic support
    pub linq_library: AssemblyIdentity,
    /// Assembly tried once per request when `linq_library` yields nothing
    pub linq_fallback_library: AssemblyIdentity,
    /// Panic on internal failures instead of returning [`Error::Unreachable`]
    pub fail_fast: bool,
}

const MICROSOFT_TOKEN: [u8; 8] = [0xB0, 0x3F, 0x5F, 0x7F, 0x11, 0xD5, 0x0A, 0x3A];
const ECMA_TOKEN: [u8; 8] = [0xB7, 0x7A, 0x5C, 0x56, 0x19, 0x34, 0xE0, 0x89];

fn framework_assembly(name: &str, token: [u8; 8]) -> AssemblyIdentity {
    AssemblyIdentity::new(
        name,
        AssemblyVersion::new(4, 0, 0, 0),
        None,
        Some(Identity::Token(u64::from_le_bytes(token))),
    )
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            reuse_contexts: true,
            restrict_on_ambiguity: true,
            fetch_missing_assemblies: true,
            linq_library: framework_assembly("System.Linq", MICROSOFT_TOKEN),
            linq_fallback_library: framework_assembly("System.Core", ECMA_TOKEN),
            fail_fast: false,
        }
    }
}

impl EvaluatorConfig {
    /// Compile exactly once per request: no restricted retry, no metadata fetching
    #[must_use]
    pub fn no_fallbacks() -> Self {
        EvaluatorConfig {
            restrict_on_ambiguity: false,
            fetch_missing_assemblies: false,
            ..Self::default()
        }
    }

    /// Default behavior, but internal failures panic
    ///
    /// Meant for test harnesses where an internal failure should stop the run with its
    /// diagnostics rather than surface as an evaluation error.
    #[must_use]
    pub fn strict() -> Self {
        EvaluatorConfig {
            fail_fast: true,
            ..Self::default()
        }
    }

    /// Apply the internal-failure policy to `message`.
    ///
    /// # Panics
    /// Panics if `fail_fast` is set.
    pub(crate) fn internal_error(&self, message: impl Into<String>) -> Error {
        let message = message.into();
        error!(%message, "internal evaluator failure");
        if self.fail_fast {
            panic!("internal evaluator failure: {message}");
        }
        Error::Unreachable(message)
    }
}
