//! The diagnostics system.
//!
//! Fallible steps of the reference resolution report a [`Diagnostic`] to a [`Reporter`]
//! right away and continue with the next reference. Reporting an error yields an
//! [`ErasedReportedError`](reporter::ErasedReportedError) witness which can be propagated
//! through [`error::Result`].

use span::{Span, Spanning};
use std::{collections::BTreeSet, fmt, marker::PhantomData, path::PathBuf};
use utility::Str;

pub use code::{Code, ErrorCode, LintCode};
pub use reporter::Reporter;

mod code;

pub mod error;
pub mod reporter;

/// A complex diagnostic message, optionally with source locations.
///
/// The type parameter fixes the severity at the type level and determines what
/// [reporting](Self::report) it yields.
#[must_use]
pub struct Diagnostic<T: Tag = tag::Error> {
    untagged: UntaggedDiagnostic,
    _tag: PhantomData<T>,
}

impl<T: Tag> Diagnostic<T> {
    fn new() -> Self {
        Self { untagged: Box::new(UnboxedUntaggedDiagnostic::new(T::SEVERITY)), _tag: PhantomData }
    }

    /// Add a text message describing the issue.
    ///
    /// # Guidelines
    ///
    /// * The message should not contain any line breaks
    /// * The message should not start with an upper case letter
    /// * The message should not end in a punctuation mark
    /// * Surround names and paths with single quotation marks `‘` (U+2018) and `’` (U+2019)
    pub fn message(mut self, message: impl Into<Str>) -> Self {
        self.untagged.message = Some(message.into());
        self
    }

    /// Reference a code snippet as one of the focal points of the diagnostic.
    pub fn span(mut self, spanning: impl Spanning) -> Self {
        self.untagged.spans.insert(spanning.span());
        self
    }

    /// Add further clarifying information.
    pub fn note(mut self, message: impl Into<Str>) -> Self {
        self.untagged.notes.push(message.into());
        self
    }

    /// Reference a path in the diagnostic.
    ///
    /// Useful for metadata files that could not be opened or read.
    ///
    /// A diagnostic may only ever have a single such path.
    /// Calling this function again overwrites the previous one.
    pub fn path(mut self, path: PathBuf) -> Self {
        self.untagged.path = Some(path);
        self
    }

    pub fn with(self, builder: impl FnOnce(Self) -> Self) -> Self {
        builder(self)
    }

    /// Report the diagnostic.
    pub fn report(self, reporter: &Reporter) -> T::Output {
        reporter.report_untagged(self.untagged);
        T::output()
    }
}

impl Diagnostic {
    /// Create a diagnostic for a user error.
    pub fn error() -> Self {
        Self::new()
    }

    pub fn code(mut self, code: ErrorCode) -> Self {
        self.untagged.code = Some(Code::Error(code));
        self
    }
}

impl Diagnostic<tag::Warning> {
    /// Create a diagnostic for a warning.
    pub fn warning() -> Self {
        Self::new()
    }

    pub fn code(mut self, code: LintCode) -> Self {
        self.untagged.code = Some(Code::Lint(code));
        self
    }
}

impl<T: Tag> fmt::Debug for Diagnostic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.untagged.fmt(f)
    }
}

/// The severity of a [`Diagnostic`] on the type level.
pub trait Tag: tag::Sealed {
    const SEVERITY: Severity;

    /// What reporting a diagnostic of this severity yields.
    type Output;

    fn output() -> Self::Output;
}

pub mod tag {
    use super::{reporter::ErasedReportedError, Severity, Tag};

    pub enum Error {}
    pub enum Warning {}

    impl Tag for Error {
        const SEVERITY: Severity = Severity::Error;
        type Output = ErasedReportedError;

        fn output() -> Self::Output {
            ErasedReportedError::new()
        }
    }

    impl Tag for Warning {
        const SEVERITY: Severity = Severity::Warning;
        type Output = ();

        fn output() -> Self::Output {}
    }

    pub trait Sealed {}

    impl Sealed for Error {}
    impl Sealed for Warning {}
}

pub type UntaggedDiagnostic = Box<UnboxedUntaggedDiagnostic>;

// Spans come first so that buffered diagnostics end up in source order.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct UnboxedUntaggedDiagnostic {
    pub spans: BTreeSet<Span>,
    pub path: Option<PathBuf>,
    pub code: Option<Code>,
    pub message: Option<Str>,
    pub notes: Vec<Str>,
    pub severity: Severity,
}

impl UnboxedUntaggedDiagnostic {
    fn new(severity: Severity) -> Self {
        Self { spans: BTreeSet::new(), path: None, code: None, message: None, notes: Vec::new(), severity }
    }
}

/// Level of severity of a diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, Debug, PartialOrd, Ord)]
pub enum Severity {
    /// A user error.
    Error,
    Warning,
}
