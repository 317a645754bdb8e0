//! `#[contract]`

use darling::FromMeta;
use darling::ast::NestedMeta;
use proc_macro2::TokenStream;
use quote::quote;
use syn::ItemTrait;

#[derive(Debug, Default, FromMeta)]
struct ContractArgs {
    #[darling(default)]
    name: Option<String>,
}

pub(crate) fn expand(attr: TokenStream, item: ItemTrait) -> darling::Result<TokenStream> {
    let args = ContractArgs::from_list(&NestedMeta::parse_meta_list(attr)?)?;

    if !item.generics.params.is_empty() {
        return Err(
            darling::Error::custom("a contract trait cannot have generic parameters")
                .with_span(&item.generics),
        );
    }

    let ident = &item.ident;
    let name = match &args.name {
        Some(name) if name.trim().is_empty() => {
            return Err(darling::Error::custom("contract name cannot be blank"));
        }
        Some(name) => quote!(#name),
        None => quote! {
            ::std::concat!(::std::module_path!(), "::", ::std::stringify!(#ident))
        },
    };

    Ok(quote! {
        #item

        impl ::haqn::Contract for dyn #ident {
            const NAME: &'static str = #name;
        }
    })
}
