//! Derive macros for `cypher_arena`.

use proc_macro2::{Span, TokenStream};
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;
use syn::{parse_macro_input, Field, Fields, Ident, ItemStruct};

fn root() -> TokenStream {
    use std::env::{var as env_var, VarError};

    let cypher_crate = proc_macro_crate::crate_name("cypher_arena")
        .expect("cypher_arena should be present in `Cargo.toml`");
    match cypher_crate {
        proc_macro_crate::FoundCrate::Itself => {
            if Err(VarError::NotPresent) == env_var("CARGO_BIN_NAME")
                && Err(VarError::NotPresent) != env_var("CARGO_PRIMARY_PACKAGE")
                && Ok("cypher_arena") == env_var("CARGO_CRATE_NAME").as_deref()
            {
                // In the crate itself, including unit tests.
                quote! { crate }
            } else {
                // In an integration test, binary, bench, etc.
                quote! { ::cypher_arena }
            }
        }
        proc_macro_crate::FoundCrate::Name(name) => {
            let ident: Ident = Ident::new(&name, Span::call_site());
            quote! { ::#ident }
        }
    }
}

/// For a state struct `S` used as `&'static S`, implements
/// `FromRef<&'static S> for &'static T` for each named field of type `T`, so handlers can extract
/// `State<&'static T>` directly. Field types must be distinct.
#[proc_macro_derive(FromRefStatic)]
pub fn derive_from_ref_static(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let st = parse_macro_input!(item as ItemStruct);
    let Fields::Named(fields) = &st.fields else {
        return quote_spanned! {st.span()=>
            ::std::compile_error!("`FromRefStatic` requires a struct with named fields.");
        }
        .into();
    };
    let root = root();
    let item_ident = &st.ident;
    fields
        .named
        .iter()
        .map(|Field { ident, ty, .. }| {
            quote! {
                impl #root::axum::extract::FromRef<&'static #item_ident> for &'static #ty {
                    fn from_ref(input: &&'static #item_ident) -> Self {
                        &input.#ident
                    }
                }
            }
        })
        .collect::<TokenStream>()
        .into()
}
