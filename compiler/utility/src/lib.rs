//! Utility functionality and definitions.

use std::fmt;

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub mod path;

pub type Str = std::borrow::Cow<'static, str>;

pub type SmallVec<T, const N: usize> = smallvec::SmallVec<[T; N]>;

pub fn default<T: Default>() -> T {
    T::default()
}

pub trait QuoteExt {
    fn quote(self) -> String;
}

impl<D: fmt::Display> QuoteExt for D {
    fn quote(self) -> String {
        format!("‘{self}’")
    }
}

pub trait FormatError {
    fn format(self) -> String;
}

impl FormatError for std::io::Error {
    fn format(self) -> String {
        use std::io::ErrorKind::*;

        match self.kind() {
            NotFound => "the file does not exist".into(),
            PermissionDenied => "permission to read the file was denied".into(),
            InvalidData | UnexpectedEof => format!("the file is truncated or corrupt: {self}"),
            _ => self.to_string(),
        }
    }
}
