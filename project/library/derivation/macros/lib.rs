use utility::{SerializeExt, TokenStream1};

mod elements;
mod format;
mod from_str;
mod str;
mod utility;

/// Derive an iterator over all variants of the given enum.
///
/// Variants with fields are allowed as long as their fields implement [`Default`].
#[proc_macro_derive(Elements)]
pub fn derive_elements(input: TokenStream1) -> TokenStream1 {
    elements::derive(input).serialize()
}

/// Derive a [`FromStr`][trait] implementation from the given fieldless enum.
///
/// The letter case `CASE` of the textual representation is specified via the helper
/// attribute `#[format(CASE)]`. Currently, the only option is `dash_case`.
///
/// ## Examples
///
/// ```ignore
/// #[derive(FromStr)]
/// #[format(dash_case)]
/// pub enum LintCode {
///     DuplicateReference,
/// }
///
/// assert_eq!("duplicate-reference".parse(), Ok(LintCode::DuplicateReference));
/// ```
///
/// [trait]: std::str::FromStr
#[proc_macro_derive(FromStr, attributes(format))]
pub fn derive_from_str(input: TokenStream1) -> TokenStream1 {
    from_str::derive(input).serialize()
}

/// Derive an inherent method returning the textual representation of each variant.
///
/// The letter case is specified via `#[format(CASE)]` like for [`macro@FromStr`].
/// The method is called `name` unless renamed via `#[str(METHOD)]`.
#[proc_macro_derive(Str, attributes(format, str))]
pub fn derive_str(input: TokenStream1) -> TokenStream1 {
    str::derive(input).serialize()
}
