use proc_macro::TokenStream as TokenStream1;
use proc_macro2::Span;
use quote::quote;
use syn::{parse::Error, spanned::Spanned};

// @Task make this more flexible: generics, non-tuple structs
// @Task make this more robust: ::index_map might not refer to *our* index_map

#[proc_macro_derive(Index)]
pub fn derive_index(input: TokenStream1) -> TokenStream1 {
    let input = syn::parse_macro_input!(input as syn::ItemStruct);

    if !input.generics.params.is_empty() {
        return report(input.generics.params.span(), "parameters not supported");
    }

    let ident = input.ident;
    let fields = input.fields.span();

    let single_unnamed_field = match &input.fields {
        syn::Fields::Unnamed(fields) => fields.unnamed.len() == 1,
        syn::Fields::Named(_) | syn::Fields::Unit => false,
    };

    if !single_unnamed_field {
        return report(fields, "index types must have exactly one unnamed field");
    }

    let stream = quote! {
        impl ::index_map::Index for #ident {
            fn new(index: usize) -> Self {
                Self(::core::convert::TryFrom::try_from(index).unwrap())
            }

            fn value(self) -> usize {
                self.0 as usize
            }
        }
    };

    stream.into()
}

fn report(span: Span, message: impl std::fmt::Display) -> TokenStream1 {
    Error::new(span, message).into_compile_error().into()
}
