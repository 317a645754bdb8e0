//! Recognises the field types an `#[inject]` marker can populate.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{GenericArgument, PathArguments, Type, TypeParamBound, TypePath};

/// Smart pointer holding the contract object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pointer {
    Box,
    Arc,
    Rc,
}

/// `[Option<] Pointer<dyn Contract> [>]`
pub(crate) struct FieldShape<'a> {
    pub optional: bool,
    pub pointer: Pointer,
    pub contract: &'a Type,
}

impl<'a> FieldShape<'a> {
    /// Returns `None` for anything that is not a contract field.
    pub fn of(ty: &'a Type) -> Option<Self> {
        let ty = peel(ty);

        let (optional, inner) = match single_argument(ty, "Option") {
            Some(inner) => (true, peel(inner)),
            None => (false, ty),
        };

        let (pointer, contract) = [
            ("Box", Pointer::Box),
            ("Arc", Pointer::Arc),
            ("Rc", Pointer::Rc),
        ]
        .into_iter()
        .find_map(|(name, pointer)| single_argument(inner, name).map(|arg| (pointer, peel(arg))))?;

        matches!(contract, Type::TraitObject(_)).then_some(Self {
            optional,
            pointer,
            contract,
        })
    }

    /// First bound after the contract trait, as in `dyn C + Send`.
    ///
    /// Only the bare `dyn C` implements `Contract`, so such fields cannot
    /// be injected.
    pub fn extra_bound(&self) -> Option<&'a TypeParamBound> {
        match self.contract {
            Type::TraitObject(object) => object.bounds.iter().nth(1),
            _ => None,
        }
    }

    /// Expression converting `boxed: Box<dyn Contract>` into the field's type.
    pub fn store(&self, boxed: &TokenStream) -> TokenStream {
        let pointer = match self.pointer {
            Pointer::Box => quote!(#boxed),
            Pointer::Arc => quote!(::std::sync::Arc::from(#boxed)),
            Pointer::Rc => quote!(::std::rc::Rc::from(#boxed)),
        };

        if self.optional {
            quote!(::std::option::Option::Some(#pointer))
        } else {
            pointer
        }
    }
}

fn peel(ty: &Type) -> &Type {
    match ty {
        Type::Group(group) => peel(&group.elem),
        Type::Paren(paren) => peel(&paren.elem),
        other => other,
    }
}

/// If `ty` is `…::name<T>` with exactly one type argument, returns `T`.
fn single_argument<'a>(ty: &'a Type, name: &str) -> Option<&'a Type> {
    let Type::Path(TypePath { qself: None, path }) = ty else {
        return None;
    };

    let segment = path.segments.last()?;
    if segment.ident != name {
        return None;
    }

    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };

    let mut types = arguments.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    });

    match (types.next(), types.next()) {
        (Some(ty), None) => Some(ty),
        _ => None,
    }
}
