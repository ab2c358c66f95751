//! Compiler diagnostics and their classification for the retry loop.
//!
//! Only a handful of diagnostic codes drive the evaluator: those naming an assembly the compiler
//! could not see, and those reporting the same type or member in more than one assembly.
//! Everything else is passed back to the caller as-is.

use std::fmt;

use crate::metadata::identity::AssemblyIdentity;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
pub enum Severity {
    /// Informational
    Info,
    /// Warning, does not fail the compilation
    Warning,
    /// Error, fails the compilation
    Error,
}

/// Diagnostic codes the evaluator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// CS0012: a type is defined in an assembly that is not referenced
    NoTypeDef,
    /// CS1070: a type was forwarded to an assembly that is not referenced
    NoTypeDefFromForwarder,
    /// CS1935: no query pattern implementation was found
    QueryNoProviderStandard,
    /// CS1980: dynamic support types are missing
    DynamicAttributeMissing,
    /// CS1703: an assembly with the same identity was imported twice
    DuplicateImport,
    /// CS1704: an assembly with the same simple name was imported twice
    DuplicateImportSimple,
    /// CS0433: the same type exists in two assemblies
    SameFullNameAggAgg,
    /// CS0121: the call is ambiguous
    AmbigCall,
    /// Any other code
    Other(u32),
}

impl DiagnosticCode {
    /// The numeric code
    #[must_use]
    pub fn number(&self) -> u32 {
        match self {
            DiagnosticCode::NoTypeDef => 12,
            DiagnosticCode::NoTypeDefFromForwarder => 1070,
            DiagnosticCode::QueryNoProviderStandard => 1935,
            DiagnosticCode::DynamicAttributeMissing => 1980,
            DiagnosticCode::DuplicateImport => 1703,
            DiagnosticCode::DuplicateImportSimple => 1704,
            DiagnosticCode::SameFullNameAggAgg => 433,
            DiagnosticCode::AmbigCall => 121,
            DiagnosticCode::Other(number) => *number,
        }
    }

    /// The code for `number`
    #[must_use]
    pub fn from_number(number: u32) -> DiagnosticCode {
        match number {
            12 => DiagnosticCode::NoTypeDef,
            1070 => DiagnosticCode::NoTypeDefFromForwarder,
            1935 => DiagnosticCode::QueryNoProviderStandard,
            1980 => DiagnosticCode::DynamicAttributeMissing,
            1703 => DiagnosticCode::DuplicateImport,
            1704 => DiagnosticCode::DuplicateImportSimple,
            433 => DiagnosticCode::SameFullNameAggAgg,
            121 => DiagnosticCode::AmbigCall,
            other => DiagnosticCode::Other(other),
        }
    }

    /// True for codes reporting one definition visible through several assemblies
    #[must_use]
    pub fn is_ambiguity(&self) -> bool {
        matches!(
            self,
            DiagnosticCode::DuplicateImport
                | DiagnosticCode::DuplicateImportSimple
                | DiagnosticCode::SameFullNameAggAgg
                | DiagnosticCode::AmbigCall
        )
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CS{:04}", self.number())
    }
}

/// A diagnostic reported by the compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Diagnostic code
    pub code: DiagnosticCode,
    /// Severity
    pub severity: Severity,
    /// Message text
    pub message: String,
    /// Assemblies the diagnostic names as missing, for [`DiagnosticCode::NoTypeDef`] and
    /// [`DiagnosticCode::NoTypeDefFromForwarder`]
    pub missing_identities: Vec<AssemblyIdentity>,
}

impl Diagnostic {
    /// An error diagnostic
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            severity: Severity::Error,
            message: message.into(),
            missing_identities: Vec::new(),
        }
    }

    /// A warning diagnostic
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(code, message)
        }
    }

    /// An error naming an assembly the compiler could not see
    pub fn missing_assembly(identity: AssemblyIdentity, message: impl Into<String>) -> Self {
        Diagnostic {
            missing_identities: vec![identity],
            ..Diagnostic::error(DiagnosticCode::NoTypeDef, message)
        }
    }

    /// True if the diagnostic fails the compilation
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Renders diagnostics into the failure message reported to the user.
pub trait DiagnosticFormatter {
    /// Render `diagnostic`
    fn format(&self, diagnostic: &Diagnostic) -> String;
}

/// Formats as `error CS0012: message`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFormatter;

impl DiagnosticFormatter for DefaultFormatter {
    fn format(&self, diagnostic: &Diagnostic) -> String {
        let severity = match diagnostic.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        format!("{severity} {}: {}", diagnostic.code, diagnostic.message)
    }
}

/// What a failed compilation asks the evaluator to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Every error is an ambiguity between assemblies
    Ambiguous,
    /// The first error naming missing assemblies, with the assemblies it names
    Missing(Vec<AssemblyIdentity>),
    /// Nothing the evaluator can act on
    Unactionable,
}

/// Classify the diagnostics of a failed compilation.
///
/// Ambiguity takes precedence: if every error is an ambiguity, no missing assemblies are
/// reported. Otherwise the first error naming missing assemblies wins. Missing query and dynamic
/// support both name `linq_library`.
///
/// # Examples
///
/// ```rust
/// use evalscope::evaluation::{classify, Classification, Diagnostic, DiagnosticCode};
/// use evalscope::metadata::identity::AssemblyIdentity;
///
/// let linq = AssemblyIdentity::parse("System.Core, Version=4.0.0.0")?;
/// let diagnostics = [Diagnostic::error(DiagnosticCode::QueryNoProviderStandard, "no Select")];
/// assert_eq!(classify(&diagnostics, &linq), Classification::Missing(vec![linq.clone()]));
/// # Ok::<(), evalscope::Error>(())
/// ```
#[must_use]
pub fn classify(diagnostics: &[Diagnostic], linq_library: &AssemblyIdentity) -> Classification {
    let mut errors = diagnostics.iter().filter(|d| d.is_error()).peekable();
    if errors.peek().is_none() {
        return Classification::Unactionable;
    }

    if diagnostics
        .iter()
        .filter(|d| d.is_error())
        .all(|d| d.code.is_ambiguity())
    {
        return Classification::Ambiguous;
    }

    for diagnostic in errors {
        let identities = match diagnostic.code {
            DiagnosticCode::NoTypeDef | DiagnosticCode::NoTypeDefFromForwarder => {
                diagnostic.missing_identities.clone()
            }
            DiagnosticCode::QueryNoProviderStandard | DiagnosticCode::DynamicAttributeMissing => {
                vec![linq_library.clone()]
            }
            _ => continue,
        };

        if !identities.is_empty() {
            return Classification::Missing(identities);
        }
    }

    Classification::Unactionable
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(display_name: &str) -> AssemblyIdentity {
        AssemblyIdentity::parse(display_name).unwrap()
    }

    fn linq() -> AssemblyIdentity {
        identity("System.Linq, Version=4.0.0.0, PublicKeyToken=b03f5f7f11d50a3a")
    }

    #[test]
    fn codes() {
        assert_eq!(DiagnosticCode::NoTypeDef.to_string(), "CS0012");
        assert_eq!(DiagnosticCode::from_number(433), DiagnosticCode::SameFullNameAggAgg);
        assert_eq!(DiagnosticCode::from_number(9999), DiagnosticCode::Other(9999));
        assert_eq!(DiagnosticCode::Other(9999).number(), 9999);
    }

    #[test]
    fn default_format() {
        let diagnostic = Diagnostic::error(DiagnosticCode::Other(103), "The name 'x' does not exist");
        assert_eq!(
            DefaultFormatter.format(&diagnostic),
            "error CS0103: The name 'x' does not exist"
        );
    }

    #[test]
    fn all_ambiguous() {
        let diagnostics = [
            Diagnostic::error(DiagnosticCode::SameFullNameAggAgg, "C in A and B"),
            Diagnostic::error(DiagnosticCode::AmbigCall, "M is ambiguous"),
            Diagnostic::warning(DiagnosticCode::Other(1), "unrelated"),
        ];
        assert_eq!(classify(&diagnostics, &linq()), Classification::Ambiguous);
    }

    #[test]
    fn mixed_errors_are_not_ambiguous() {
        let missing = identity("Lib, Version=1.0.0.0");
        let diagnostics = [
            Diagnostic::error(DiagnosticCode::SameFullNameAggAgg, "C in A and B"),
            Diagnostic::missing_assembly(missing.clone(), "Lib is not referenced"),
        ];
        assert_eq!(
            classify(&diagnostics, &linq()),
            Classification::Missing(vec![missing])
        );
    }

    #[test]
    fn first_missing_error_wins() {
        let first = identity("First");
        let second = identity("Second");
        let diagnostics = [
            Diagnostic::error(DiagnosticCode::Other(103), "unknown name"),
            Diagnostic::missing_assembly(first.clone(), "First"),
            Diagnostic::missing_assembly(second, "Second"),
        ];
        assert_eq!(
            classify(&diagnostics, &linq()),
            Classification::Missing(vec![first])
        );
    }

    #[test]
    fn dynamic_maps_to_linq() {
        let diagnostics = [Diagnostic::error(
            DiagnosticCode::DynamicAttributeMissing,
            "dynamic",
        )];
        assert_eq!(
            classify(&diagnostics, &linq()),
            Classification::Missing(vec![linq()])
        );
    }

    #[test]
    fn unactionable() {
        assert_eq!(classify(&[], &linq()), Classification::Unactionable);
        assert_eq!(
            classify(
                &[Diagnostic::warning(DiagnosticCode::AmbigCall, "warning only")],
                &linq()
            ),
            Classification::Unactionable
        );
        assert_eq!(
            classify(
                &[Diagnostic::error(DiagnosticCode::NoTypeDef, "no identity")],
                &linq()
            ),
            Classification::Unactionable
        );
    }
}
