//! Assembly identity and version.

use std::{
    fmt::{self, Write},
    hash::{Hash, Hasher},
    str::FromStr,
};

use crate::{
    metadata::{
        identity::Identity,
        streams::{AssemblyFlags, AssemblyRefRow, AssemblyRow},
    },
    Error, Result,
};

/// Identity of an assembly, as carried by `Assembly`/`AssemblyRef` rows and by display names.
///
/// Two identities are equal when their simple names and cultures match case-insensitively,
/// their versions are equal and they resolve to the same public key token. A full public key and
/// its token therefore compare equal.
///
/// # Examples
///
/// ```rust
/// use evalscope::metadata::identity::{AssemblyIdentity, AssemblyVersion};
///
/// let linq = AssemblyIdentity::parse(
///     "System.Linq, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b03f5f7f11d50a3a",
/// )?;
/// assert_eq!(linq.name, "System.Linq");
/// assert_eq!(linq.version, AssemblyVersion::new(4, 0, 0, 0));
/// assert!(linq.culture.is_none());
/// assert_eq!(
///     linq.display_name(),
///     "System.Linq, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b03f5f7f11d50a3a"
/// );
/// # Ok::<(), evalscope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct AssemblyIdentity {
    /// Simple assembly name, e.g. `System.Core`
    pub name: String,
    /// Four-part version
    pub version: AssemblyVersion,
    /// Culture of satellite assemblies, `None` for culture-neutral
    pub culture: Option<String>,
    /// Public key or token, `None` for weakly named assemblies
    pub strong_name: Option<Identity>,
}

impl AssemblyIdentity {
    /// Create an identity from its parts
    pub fn new(
        name: impl Into<String>,
        version: AssemblyVersion,
        culture: Option<String>,
        strong_name: Option<Identity>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            culture,
            strong_name,
        }
    }

    /// Identity defined by an `Assembly` row
    #[must_use]
    pub fn from_assembly_row(row: &AssemblyRow<'_>) -> Self {
        let [major, minor, build, revision] = row.version;
        Self {
            name: row.name.to_string(),
            version: AssemblyVersion::new(major, minor, build, revision),
            culture: row.culture.map(str::to_string),
            strong_name: (!row.public_key.is_empty())
                .then(|| Identity::PubKey(row.public_key.to_vec())),
        }
    }

    /// Identity referenced by an `AssemblyRef` row.
    ///
    /// A token blob that is not 8 bytes long is treated as absent.
    #[must_use]
    pub fn from_assembly_ref_row(row: &AssemblyRefRow<'_>) -> Self {
        let [major, minor, build, revision] = row.version;
        let strong_name = if row.public_key_or_token.is_empty() {
            None
        } else {
            Identity::from(
                row.public_key_or_token,
                row.flags.contains(AssemblyFlags::PUBLIC_KEY),
            )
            .ok()
        };

        Self {
            name: row.name.to_string(),
            version: AssemblyVersion::new(major, minor, build, revision),
            culture: row.culture.map(str::to_string),
            strong_name,
        }
    }

    /// Parse an identity from its display name.
    ///
    /// ```text
    /// Name[, Version=Major.Minor.Build.Revision][, Culture=culture][, PublicKeyToken=token]
    /// ```
    ///
    /// Unknown attributes (`ProcessorArchitecture`, `Retargetable`, ...) are ignored.
    ///
    /// # Errors
    /// Returns an error if the name is empty, the version is not numeric, or the token is not
    /// 16 hex digits.
    pub fn parse(display_name: &str) -> Result<Self> {
        let mut parts = display_name.split(',').map(str::trim);

        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(malformed_error!("Assembly name cannot be empty"));
        }

        let mut identity = Self::new(name, AssemblyVersion::default(), None, None);
        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                return Err(malformed_error!("Invalid display name component - {}", part));
            };

            match key.trim().to_ascii_lowercase().as_str() {
                "version" => identity.version = AssemblyVersion::parse(value.trim())?,
                "culture" => {
                    let value = value.trim();
                    if !value.eq_ignore_ascii_case("neutral") && !value.is_empty() {
                        identity.culture = Some(value.to_string());
                    }
                }
                "publickeytoken" => {
                    let value = value.trim();
                    if !value.eq_ignore_ascii_case("null") && !value.is_empty() {
                        let bytes = hex::decode(value).map_err(|e| {
                            malformed_error!("Invalid hex in PublicKeyToken '{}': {}", value, e)
                        })?;
                        let token: [u8; 8] = bytes.try_into().map_err(|_| {
                            malformed_error!("PublicKeyToken must be 8 bytes - '{}'", value)
                        })?;
                        identity.strong_name = Some(Identity::Token(u64::from_le_bytes(token)));
                    }
                }
                _ => {}
            }
        }

        Ok(identity)
    }

    /// The display name, always listing version, culture and token
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut result = String::with_capacity(self.name.len() + 80);

        result.push_str(&self.name);
        let _ = write!(result, ", Version={}", self.version);
        let _ = write!(
            result,
            ", Culture={}",
            self.culture.as_deref().unwrap_or("neutral")
        );

        result.push_str(", PublicKeyToken=");
        match self.public_key_token() {
            Some(token) => result.push_str(&hex::encode(token)),
            None => result.push_str("null"),
        }

        result
    }

    /// The public key token, derived from the full key if needed
    #[must_use]
    pub fn public_key_token(&self) -> Option<[u8; 8]> {
        self.strong_name.as_ref().map(Identity::token_bytes)
    }

    /// True if the assembly carries a strong name
    #[must_use]
    pub fn is_strong_named(&self) -> bool {
        self.strong_name.is_some()
    }

    /// True if the assembly is culture-neutral
    #[must_use]
    pub fn is_culture_neutral(&self) -> bool {
        self.culture.is_none()
    }

    /// Simple name folded for case-insensitive lookups
    #[must_use]
    pub fn name_key(&self) -> String {
        self.name.to_ascii_lowercase()
    }
}

impl PartialEq for AssemblyIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.version == other.version
            && match (&self.culture, &other.culture) {
                (Some(lhs), Some(rhs)) => lhs.eq_ignore_ascii_case(rhs),
                (None, None) => true,
                _ => false,
            }
            && self.public_key_token() == other.public_key_token()
    }
}

impl Eq for AssemblyIdentity {}

impl Hash for AssemblyIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_ascii_lowercase().hash(state);
        self.version.hash(state);
        self.culture
            .as_ref()
            .map(|culture| culture.to_ascii_lowercase())
            .hash(state);
        self.public_key_token().hash(state);
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl FromStr for AssemblyIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Four-part assembly version, ordered component-wise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssemblyVersion {
    /// Major version component
    pub major: u16,
    /// Minor version component
    pub minor: u16,
    /// Build version component
    pub build: u16,
    /// Revision version component
    pub revision: u16,
}

impl AssemblyVersion {
    /// Create a version from its components
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Parse a dotted version with one to four components; missing components are `0`.
    ///
    /// # Errors
    /// Returns an error if there are more than four components or one is not a `u16`.
    pub fn parse(version_str: &str) -> Result<Self> {
        let parts: Vec<&str> = version_str.split('.').collect();
        if parts.len() > 4 {
            return Err(malformed_error!("Invalid version - {}", version_str));
        }

        let mut components = [0u16; 4];
        for (component, part) in components.iter_mut().zip(&parts) {
            *component = part
                .trim()
                .parse::<u16>()
                .map_err(|_| malformed_error!("Invalid version component: {}", part))?;
        }

        let [major, minor, build, revision] = components;
        Ok(Self::new(major, minor, build, revision))
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl FromStr for AssemblyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_name() {
        let identity = AssemblyIdentity::parse("Foo").unwrap();
        assert_eq!(identity.name, "Foo");
        assert_eq!(identity.version, AssemblyVersion::default());
        assert!(identity.is_culture_neutral());
        assert!(!identity.is_strong_named());
        assert_eq!(
            identity.display_name(),
            "Foo, Version=0.0.0.0, Culture=neutral, PublicKeyToken=null"
        );
    }

    #[test]
    fn test_parse_full_name() {
        let identity = AssemblyIdentity::parse(
            "Resources, Version=1.2, Culture=de-DE, PublicKeyToken=B77A5C561934E089, ProcessorArchitecture=MSIL",
        )
        .unwrap();

        assert_eq!(identity.version, AssemblyVersion::new(1, 2, 0, 0));
        assert_eq!(identity.culture.as_deref(), Some("de-DE"));
        assert_eq!(
            identity.public_key_token(),
            Some([0xB7, 0x7A, 0x5C, 0x56, 0x19, 0x34, 0xE0, 0x89])
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(AssemblyIdentity::parse("").is_err());
        assert!(AssemblyIdentity::parse(", Version=1.0.0.0").is_err());
        assert!(AssemblyIdentity::parse("Foo, Version=1.x").is_err());
        assert!(AssemblyIdentity::parse("Foo, PublicKeyToken=abcd").is_err());
        assert!(AssemblyIdentity::parse("Foo, Version").is_err());
        assert!(AssemblyVersion::parse("1.2.3.4.5").is_err());
        assert!(AssemblyVersion::parse("70000").is_err());
    }

    #[test]
    fn test_equality_ignores_case_and_key_form() {
        let key = vec![0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];
        let definition = AssemblyIdentity::new(
            "mscorlib",
            AssemblyVersion::new(4, 0, 0, 0),
            None,
            Some(Identity::PubKey(key)),
        );
        let reference = AssemblyIdentity::parse(
            "MSCORLIB, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
        )
        .unwrap();

        assert_eq!(definition, reference);

        let mut set = std::collections::HashSet::new();
        set.insert(definition);
        assert!(set.contains(&reference));
    }

    #[test]
    fn test_version_ordering() {
        let versions: Vec<AssemblyVersion> = ["2.0", "1.0.5", "3.0", "1.0"]
            .iter()
            .map(|v| v.parse().unwrap())
            .collect();

        assert_eq!(versions.iter().max(), Some(&AssemblyVersion::new(3, 0, 0, 0)));
        assert!(AssemblyVersion::new(1, 0, 5, 0) > AssemblyVersion::new(1, 0, 0, 9));
        assert_eq!(AssemblyVersion::new(4, 5, 2, 1).to_string(), "4.5.2.1");
    }
}
