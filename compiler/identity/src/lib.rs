//! Assembly identities.
//!
//! An identity consists of a simple name, a four-part version, a culture and an optional
//! public key token. Identities with a token are *strong*, the others are *weak*.
//! For weak identities only the simple name is significant when matching.

use std::{cmp::Ordering, fmt, str::FromStr};

pub use comparer::{Equivalence, IdentityComparer, Match, UnificationPolicy};

mod comparer;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssemblyIdentity {
    name: String,
    version: Version,
    culture: String,
    public_key_token: Option<PublicKeyToken>,
}

impl AssemblyIdentity {
    /// Create a weak identity of version `0.0.0.0` and neutral culture.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Version::default(),
            culture: String::new(),
            public_key_token: None,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        let culture = culture.into();
        self.culture = if culture.eq_ignore_ascii_case("neutral") { String::new() } else { culture };
        self
    }

    #[must_use]
    pub fn with_public_key_token(mut self, token: PublicKeyToken) -> Self {
        self.public_key_token = Some(token);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// The culture or the empty string if it is neutral.
    pub fn culture(&self) -> &str {
        &self.culture
    }

    pub fn public_key_token(&self) -> Option<PublicKeyToken> {
        self.public_key_token
    }

    pub fn is_strong(&self) -> bool {
        self.public_key_token.is_some()
    }

    /// The key under which identities are grouped when looking for duplicates.
    pub fn simple_name_key(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// The identity with its name and culture in lower case.
    ///
    /// Two identities are equal after normalization if they only differ in the case of the
    /// name or culture.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.to_ascii_lowercase(),
            culture: self.culture.to_ascii_lowercase(),
            ..self.clone()
        }
    }

    pub(crate) fn same_simple_name(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }

    pub(crate) fn same_culture(&self, other: &Self) -> bool {
        self.culture.eq_ignore_ascii_case(&other.culture)
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Version={}, Culture=", self.name, self.version)?;

        if self.culture.is_empty() {
            f.write_str("neutral")?;
        } else {
            f.write_str(&self.culture)?;
        }

        match self.public_key_token {
            Some(token) => write!(f, ", PublicKeyToken={token}"),
            None => f.write_str(", PublicKeyToken=null"),
        }
    }
}

impl fmt::Debug for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "‘{self}’")
    }
}

impl FromStr for AssemblyIdentity {
    type Err = ParseError;

    /// Parse an identity of the form `Name, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null`.
    ///
    /// All properties are optional and may appear in any order.
    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let mut parts = source.split(',').map(str::trim);

        let name = parts.next().filter(|name| !name.is_empty()).ok_or(ParseError::MissingName)?;
        let mut identity = Self::new(name);

        for part in parts {
            let (key, value) =
                part.split_once('=').ok_or_else(|| ParseError::MalformedProperty(part.to_owned()))?;
            let (key, value) = (key.trim(), value.trim());

            if key.eq_ignore_ascii_case("Version") {
                identity.version = value.parse()?;
            } else if key.eq_ignore_ascii_case("Culture") {
                identity = identity.with_culture(value);
            } else if key.eq_ignore_ascii_case("PublicKeyToken") {
                identity.public_key_token = if value.eq_ignore_ascii_case("null") {
                    None
                } else {
                    Some(value.parse()?)
                };
            } else {
                return Err(ParseError::UnknownProperty(key.to_owned()));
            }
        }

        Ok(identity)
    }
}

/// A four-part assembly version.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
}

impl Version {
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self { major, minor, build, revision }
    }

    const fn parts(self) -> [u16; 4] {
        [self.major, self.minor, self.build, self.revision]
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts().cmp(&other.parts())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Version {
    type Err = ParseError;

    /// Parse one to four dot-separated parts, missing trailing parts are zero.
    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let mut parts = [0; 4];
        let mut count = 0;

        for part in source.split('.') {
            let slot = parts.get_mut(count).ok_or_else(|| ParseError::InvalidVersion(source.to_owned()))?;
            *slot = part.parse().map_err(|_| ParseError::InvalidVersion(source.to_owned()))?;
            count += 1;
        }

        let [major, minor, build, revision] = parts;
        Ok(Self::new(major, minor, build, revision))
    }
}

/// The last eight bytes of the hash of a public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKeyToken(pub [u8; 8]);

impl fmt::Display for PublicKeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
    }
}

impl fmt::Debug for PublicKeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for PublicKeyToken {
    type Err = ParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidPublicKeyToken(source.to_owned());

        if source.len() != 16 || !source.is_ascii() {
            return Err(invalid());
        }

        let mut token = [0; 8];

        for (byte, digits) in token.iter_mut().zip(source.as_bytes().chunks(2)) {
            let digits = std::str::from_utf8(digits).map_err(|_| invalid())?;
            *byte = u8::from_str_radix(digits, 16).map_err(|_| invalid())?;
        }

        Ok(Self(token))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    MissingName,
    MalformedProperty(String),
    UnknownProperty(String),
    InvalidVersion(String),
    InvalidPublicKeyToken(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingName => write!(f, "the assembly identity lacks a name"),
            Self::MalformedProperty(property) => {
                write!(f, "the property ‘{property}’ is not of the form ‘key=value’")
            }
            Self::UnknownProperty(key) => write!(f, "unknown identity property ‘{key}’"),
            Self::InvalidVersion(version) => write!(f, "invalid version ‘{version}’"),
            Self::InvalidPublicKeyToken(token) => write!(f, "invalid public key token ‘{token}’"),
        }
    }
}

impl std::error::Error for ParseError {}
