use crate::{
    format::FormatAttribute,
    utility::{HelperAttribute, TokenStream1, TokenStream2},
};
use proc_macro2::Span;
use quote::quote;
use syn::{
    parse::{Nothing, Parse, ParseStream},
    Error, Fields, Ident,
};

pub(crate) fn derive(input: TokenStream1) -> Result<TokenStream2, Error> {
    let input: syn::ItemEnum = syn::parse(input)?;
    let type_ = input.ident;
    let visibility = input.vis;

    let FormatAttribute { letter_case } = HelperAttribute::obtain(&type_, &input.attrs)?;
    let StrAttribute { method } =
        HelperAttribute::obtain_optional(&input.attrs)?.unwrap_or_default();

    let arms: Vec<_> = input
        .variants
        .iter()
        .map(|variant| {
            let fields = match variant.fields {
                Fields::Named(_) => quote! { { .. } },
                Fields::Unnamed(_) => quote! { (..) },
                Fields::Unit => quote! {},
            };
            let name = &variant.ident;
            let representation = letter_case.transform(name);

            quote! { Self::#name #fields => #representation }
        })
        .collect();

    // An uninhabited receiver needs to be dereferenced to be matched exhaustively.
    let scrutinee = if arms.is_empty() {
        quote! { *self }
    } else {
        quote! { self }
    };

    let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #type_ #type_generics #where_clause {
            #visibility const fn #method(&self) -> &'static ::core::primitive::str {
                match #scrutinee { #( #arms ),* }
            }
        }
    })
}

struct StrAttribute {
    method: Ident,
}

impl Default for StrAttribute {
    fn default() -> Self {
        Self { method: Ident::new("name", Span::call_site()) }
    }
}

impl HelperAttribute for StrAttribute {
    const NAME: &'static str = "str";
}

impl Parse for StrAttribute {
    fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
        let method = input.parse()?;
        let _: Nothing = input.parse()?;

        Ok(Self { method })
    }
}
