//! `#[implementation]`
//!
//! Registers an `impl Contract for Type` block with the link-time
//! implementation table that `FactoryRegistry::from_inventory` reads.

use darling::FromMeta;
use darling::ast::NestedMeta;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{ItemImpl, Type};

#[derive(Debug, Default, FromMeta)]
struct ImplementationArgs {
    #[darling(default)]
    name: Option<String>,
    /// `fn() -> Result<Type, E>` where `E: Into<BoxError>`.
    #[darling(default)]
    constructor: Option<syn::Path>,
}

pub(crate) fn expand(attr: TokenStream, item: ItemImpl) -> darling::Result<TokenStream> {
    let args = ImplementationArgs::from_list(&NestedMeta::parse_meta_list(attr)?)?;

    let Some((None, contract, _)) = &item.trait_ else {
        return Err(darling::Error::custom(
            "`#[implementation]` must be placed on `impl Contract for Type`",
        ));
    };

    if !item.generics.params.is_empty() {
        return Err(
            darling::Error::custom("`#[implementation]` does not support generic impls")
                .with_span(&item.generics),
        );
    }

    let self_ty = &item.self_ty;

    let name = match (&args.name, self_ty.as_ref()) {
        (Some(name), _) if name.trim().is_empty() => {
            return Err(darling::Error::custom("implementation name cannot be blank"));
        }
        (Some(name), _) => quote!(#name),
        (None, Type::Path(path)) => {
            let Some(last) = path.path.segments.last() else {
                return Err(darling::Error::custom("expected a type path").with_span(self_ty));
            };
            let short = last.ident.to_string();
            quote!(::std::concat!(::std::module_path!(), "::", #short))
        }
        (None, _) => {
            return Err(darling::Error::custom(
                "`name = \"...\"` is required for this implementation type",
            )
            .with_span(self_ty));
        }
    };

    let construct = match &args.constructor {
        Some(path) => quote! {
            #path().map_err(::std::convert::Into::<::haqn::BoxError>::into)?
        },
        None => quote! {
            <#self_ty as ::std::default::Default>::default()
        },
    };

    Ok(quote! {
        #item

        const _: () = {
            fn __haqn_contract() -> ::haqn::ContractKey {
                ::haqn::ContractKey::of::<dyn #contract>()
            }

            fn __haqn_construct() -> ::std::result::Result<
                ::std::boxed::Box<dyn ::std::any::Any>,
                ::haqn::BoxError,
            > {
                let value: #self_ty = #construct;
                let object: ::std::boxed::Box<dyn #contract> = ::std::boxed::Box::new(value);
                ::std::result::Result::Ok(::haqn::injectable::erase::<dyn #contract>(object))
            }

            ::haqn::__private::inventory::submit! {
                ::haqn::Implementation::new(#name, __haqn_contract, __haqn_construct)
            }
        };
    })
}
