use crate::utility::{TokenStream1, TokenStream2};
use quote::quote;
use syn::{Error, Fields};

pub(crate) fn derive(input: TokenStream1) -> Result<TokenStream2, Error> {
    let input: syn::ItemEnum = syn::parse(input)?;
    let type_ = input.ident;
    let count = input.variants.len();

    let variants = input.variants.iter().map(|variant| {
        let name = &variant.ident;

        match &variant.fields {
            Fields::Named(fields) => {
                let fields = fields.named.iter().map(|field| &field.ident);
                quote! { Self::#name { #( #fields: ::core::default::Default::default() ),* } }
            }
            Fields::Unnamed(fields) => {
                let fields = fields.unnamed.iter().map(|_| quote! { ::core::default::Default::default() });
                quote! { Self::#name ( #( #fields ),* ) }
            }
            Fields::Unit => quote! { Self::#name },
        }
    });

    let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::derivation::Elements for #type_ #type_generics #where_clause {
            type Iter = ::core::array::IntoIter<Self, #count>;

            fn elements() -> Self::Iter {
                [#( #variants ),*].into_iter()
            }
        }
    })
}
