use thiserror::Error;

use crate::metadata::identity::AssemblyIdentity;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Metadata Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid metadata structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the metadata range
/// - [`Error::NotSupported`] - Unsupported metadata format or feature
/// - [`Error::Empty`] - Empty input provided
///
/// Parsing errors on debuggee modules are never surfaced to the user directly; a module whose
/// metadata does not parse is skipped while building a snapshot.
///
/// ## Debuggee Errors
/// - [`Error::MetadataUnavailable`] - The inspection layer could not provide metadata bytes
///
/// ## Evaluation Errors
/// - [`Error::InvalidSpan`] - An IL span with `start > end`
/// - [`Error::InvalidMethodVersion`] - A method version of `0`
/// - [`Error::Compilation`] - The expression could not be compiled, after all retries
/// - [`Error::Unreachable`] - An internal failure of the orchestration, always a bug
///
/// # Examples
///
/// ```rust,ignore
/// use evalscope::Error;
///
/// match session.compile(scope, &method, &request) {
///     Ok(result) => run(result.artifact),
///     Err(Error::Compilation { message, missing_assemblies }) => {
///         eprintln!("{message}");
///         for identity in missing_assemblies {
///             eprintln!("  unresolved: {}", identity.display_name());
///         }
///     }
///     Err(e) => eprintln!("evaluation failed: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The metadata is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing metadata.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This metadata format is not supported.
    #[error("This metadata format is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// The debuggee inspection layer could not provide metadata.
    ///
    /// Raised by [`crate::evaluation::DebuggeeInspector`] implementations when a module or an
    /// assembly identity has no readable metadata. The retry loop treats it as "skip".
    #[error("Metadata unavailable - {0}")]
    MetadataUnavailable(String),

    /// An IL span whose start lies after its end.
    #[error("Invalid IL span [{start}, {end})")]
    InvalidSpan {
        /// Requested inclusive start offset
        start: u32,
        /// Requested exclusive end offset
        end: u32,
    },

    /// Method versions start at 1; 0 is never a valid EnC version.
    #[error("Invalid method version - {0}")]
    InvalidMethodVersion(u32),

    /// The expression could not be compiled.
    ///
    /// `message` is the first error diagnostic of the compilation that decided the outcome,
    /// formatted by the host's [`crate::evaluation::DiagnosticFormatter`].
    /// `missing_assemblies` lists the assembly identities the compiler asked for that could not
    /// be provided.
    #[error("{message}")]
    Compilation {
        /// User-facing error text
        message: String,
        /// Assembly identities that could not be resolved
        missing_assemblies: Vec<AssemblyIdentity>,
    },

    /// An internal failure of the evaluation pipeline.
    ///
    /// Only produced when [`crate::EvaluatorConfig::fail_fast`] is disabled; otherwise the
    /// pipeline panics with the same message.
    #[error("Internal error, this is a bug - {0}")]
    Unreachable(String),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
