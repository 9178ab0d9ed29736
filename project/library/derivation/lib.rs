extern crate self as derivation;

pub use macros::{Elements, FromStr, Str};

pub trait Elements: Sized {
    type Iter: Iterator<Item = Self>;

    fn elements() -> Self::Iter;
}
