//! Procedural macros for Haqn.
//!
//! - `#[derive(Injectable)]` with `#[inject]` field markers
//! - `#[contract]` on a trait definition
//! - `#[implementation]` on an `impl Contract for Type` block
//!
//! The generated code refers to the `haqn` facade crate.

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemImpl, ItemTrait, parse_macro_input};

mod contract;
mod field_shape;
mod implementation;
mod injectable;

#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::expand(&input)
        .unwrap_or_else(|e| e.write_errors())
        .into()
}

#[proc_macro_attribute]
pub fn contract(attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as ItemTrait);
    contract::expand(attr.into(), item)
        .unwrap_or_else(|e| e.write_errors())
        .into()
}

#[proc_macro_attribute]
pub fn implementation(attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as ItemImpl);
    implementation::expand(attr.into(), item)
        .unwrap_or_else(|e| e.write_errors())
        .into()
}
