extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Derives the marker trait `PromoterError`. The type must already implement
/// `std::error::Error` and `Kind` (typically via their own derives) and be `Send + Sync`.
#[proc_macro_derive(PromoterError)]
pub fn promoter_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    quote!(
        impl #impl_generics PromoterError for #name #ty_generics #where_clause {}
    )
    .into()
}
