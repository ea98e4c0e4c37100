extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DataEnum, DeriveInput, Fields};

/// Derives `Kind` for structs (the struct's name) and enums (`Enum::Variant`).
#[proc_macro_derive(Kind)]
pub fn kind(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let body = match input.data {
        Data::Struct(_) => quote!(stringify!(#name).to_string()),
        Data::Enum(DataEnum { variants, .. }) => {
            let arms = variants.iter().map(|variant| {
                let v = &variant.ident;
                let pattern = match variant.fields {
                    Fields::Unnamed(_) => quote!(#name::#v(..)),
                    Fields::Named(_) => quote!(#name::#v { .. }),
                    Fields::Unit => quote!(#name::#v),
                };
                quote! {
                    #pattern => concat!(stringify!(#name), "::", stringify!(#v)).to_string()
                }
            });
            quote!(
                match self {
                    #(#arms),*
                }
            )
        }
        // Nothing in this workspace needs a union to describe itself.
        Data::Union(_) => panic!(
            "kind-derive does not support unions. Implement Kind for {} by hand instead.",
            name
        ),
    };
    quote!(
        impl #impl_generics Kind for #name #ty_generics #where_clause {
            fn kind(&self) -> String {
                #body
            }
        }
    )
    .into()
}
