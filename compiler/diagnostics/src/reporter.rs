//! The diagnostic reporter.

use super::UntaggedDiagnostic;
use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, PoisonError},
};

/// A diagnostic reporter.
pub struct Reporter {
    kind: ReporterKind,
}

impl Reporter {
    pub fn silent() -> Self {
        Self { kind: ReporterKind::Silent }
    }

    pub fn buffer(diagnostics: Buffer) -> Self {
        Self { kind: ReporterKind::Buffer(diagnostics) }
    }

    pub(super) fn report_untagged(&self, diagnostic: UntaggedDiagnostic) {
        match &self.kind {
            ReporterKind::Silent => {}
            ReporterKind::Buffer(diagnostics) => {
                diagnostics.lock().unwrap_or_else(PoisonError::into_inner).insert(diagnostic);
            }
        }
    }
}

enum ReporterKind {
    Silent,
    Buffer(Buffer),
}

pub type Buffer = Arc<Mutex<BTreeSet<UntaggedDiagnostic>>>;

/// A witness to / token for a [reported](crate::Diagnostic::report) error.
///
/// A value of this type is a proof that an error was reported (neglecting silent reporters).
/// Using it as an error type instead of `()` makes it harder to return an error without
/// reporting anything since it can only be constructed by reporting a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErasedReportedError(());

impl ErasedReportedError {
    pub(crate) const fn new() -> Self {
        Self(())
    }
}
