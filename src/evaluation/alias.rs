//! Debugger pseudo-variables visible to evaluated expressions.

/// Kind of a debugger pseudo-variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum AliasKind {
    /// `$exception`
    Exception,
    /// `$stowedexception`
    StowedException,
    /// `$ReturnValue`, `$ReturnValue1`, ...
    ReturnValue,
    /// `$1`, `$2`, ... object ids
    ObjectId,
    /// A variable the user declared in the immediate window
    Variable,
}

/// A pseudo-variable handed to the compiler with a request.
///
/// # Examples
///
/// ```rust
/// use evalscope::evaluation::{Alias, AliasKind};
///
/// let alias = Alias::new(AliasKind::Exception, "$exception", "System.Exception");
/// assert_eq!(alias.full_name, "$exception");
/// assert_eq!(alias.kind.to_string(), "Exception");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    /// Kind of the alias
    pub kind: AliasKind,
    /// Name as typed by the user
    pub name: String,
    /// Name including any decoration the runtime needs
    pub full_name: String,
    /// Assembly-qualified name of the declared type
    pub type_name: String,
    /// Id of the producer of `custom_type_info`
    pub custom_type_info_id: Option<uguid::Guid>,
    /// Opaque extra type information, e.g. dynamic flags or tuple element names
    pub custom_type_info: Vec<u8>,
}

impl Alias {
    /// Create an alias whose full name equals its name
    pub fn new(kind: AliasKind, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let name = name.into();
        Alias {
            kind,
            full_name: name.clone(),
            name,
            type_name: type_name.into(),
            custom_type_info_id: None,
            custom_type_info: Vec::new(),
        }
    }

    /// Attach custom type information
    #[must_use]
    pub fn with_custom_type_info(mut self, id: uguid::Guid, payload: Vec<u8>) -> Self {
        self.custom_type_info_id = Some(id);
        self.custom_type_info = payload;
        self
    }
}
