use derivation::{Elements, FromStr, Str};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Code {
    Error(ErrorCode),
    Lint(LintCode),
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(code) => write!(f, "{code:?}"),
            Self::Lint(code) => write!(f, "{}", code.name()),
        }
    }
}

/// An error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Elements)]
#[forbid(missing_docs)]
pub enum ErrorCode {
    /// A reference given by name only could not be resolved to a file or compilation.
    E001,
    /// The metadata file of a reference could not be opened or read.
    E002,
    /// A file referenced as an assembly is not a valid assembly image.
    E003,
    /// A file referenced as a module is not a valid module image.
    E004,
    /// Two unsigned assemblies sharing a simple name were referenced.
    E005,
    /// An assembly was referenced both embedded by value and as a plain reference.
    E006,
    /// Two modules of the assembly being built share a name.
    E007,
}

impl ErrorCode {
    pub const fn explanation(self) -> &'static str {
        match self {
            Self::E001 => "reference not found",
            Self::E002 => "cannot open metadata file",
            Self::E003 => "not a valid assembly",
            Self::E004 => "not a valid module",
            Self::E005 => "duplicate import",
            Self::E006 => "assembly both linked and referenced",
            Self::E007 => "duplicate module name",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A lint code, the name of a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Str, FromStr, Elements)]
#[format(dash_case)]
pub enum LintCode {
    /// A file was referenced more than once.
    DuplicateReference,
}

impl fmt::Display for LintCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
