//! `#[derive(Injectable)]`

use darling::ast::Data;
use darling::{FromDeriveInput, FromField};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, Generics, Ident, Type};

use crate::field_shape::FieldShape;

#[derive(FromDeriveInput)]
#[darling(supports(struct_named, struct_unit))]
struct Target {
    ident: Ident,
    generics: Generics,
    data: Data<(), TargetField>,
}

#[derive(FromField)]
#[darling(forward_attrs(inject))]
struct TargetField {
    ident: Option<Ident>,
    ty: Type,
    attrs: Vec<syn::Attribute>,
}

impl TargetField {
    /// `Ok(true)` when the field carries a bare `#[inject]` marker.
    fn is_marked(&self) -> darling::Result<bool> {
        let mut marked = false;
        for attr in &self.attrs {
            attr.meta.require_path_only().map_err(|_| {
                darling::Error::custom("`#[inject]` takes no arguments").with_span(attr)
            })?;
            if marked {
                return Err(darling::Error::custom("duplicate `#[inject]` marker").with_span(attr));
            }
            marked = true;
        }
        Ok(marked)
    }
}

pub(crate) fn expand(input: &DeriveInput) -> darling::Result<TokenStream> {
    let target = Target::from_derive_input(input)?;

    if !target.generics.params.is_empty() {
        return Err(darling::Error::custom(
            "`#[derive(Injectable)]` does not support generic types",
        )
        .with_span(&target.generics));
    }

    let fields = match target.data {
        Data::Struct(fields) => fields.fields,
        _ => return Err(darling::Error::unsupported_shape("expected a struct with named fields")),
    };

    let mut errors = darling::Error::accumulator();
    let mut points = Vec::new();
    let mut arms = Vec::new();

    for field in &fields {
        let Some(marked) = errors.handle(field.is_marked()) else {
            continue;
        };
        if !marked {
            continue;
        }
        let Some(ident) = &field.ident else {
            continue;
        };

        let name = ident.to_string();
        let ty = &field.ty;

        let shape = FieldShape::of(ty);
        if let Some(bound) = shape.as_ref().and_then(|shape| shape.extra_bound()) {
            errors.push(
                darling::Error::custom(
                    "an injected contract must be a bare `dyn Trait`; \
                     declare `Send`/`Sync` as supertraits of the contract instead",
                )
                .with_span(bound),
            );
            continue;
        }

        match shape {
            Some(shape) => {
                let contract = shape.contract;
                let boxed = format_ident!("boxed");
                let store = shape.store(&quote!(#boxed));

                points.push(quote! {
                    ::haqn::InjectionPoint::contract::<#contract>(#name)
                });
                arms.push(quote! {
                    #name => {
                        let #boxed = instance.into_field::<#contract>(target, field)?;
                        self.#ident = #store;
                        ::std::result::Result::Ok(())
                    }
                });
            }
            None => {
                points.push(quote! {
                    ::haqn::InjectionPoint::concrete::<#ty>(#name)
                });
                arms.push(quote! {
                    #name => {
                        ::std::mem::drop(instance);
                        ::std::result::Result::Err(::haqn::injectable::not_a_contract(target, field))
                    }
                });
            }
        }
    }

    errors.finish()?;

    let ident = &target.ident;

    Ok(quote! {
        impl ::haqn::Injectable for #ident {
            fn injection_points(&self) -> &'static [::haqn::InjectionPoint] {
                static POINTS: ::haqn::__private::Lazy<::std::vec::Vec<::haqn::InjectionPoint>> =
                    ::haqn::__private::Lazy::new(|| ::std::vec![#(#points),*]);
                &POINTS
            }

            fn assign(
                &mut self,
                field: &str,
                instance: ::haqn::Instance,
            ) -> ::haqn::Result<()> {
                let target = ::std::any::type_name::<Self>();
                match field {
                    #(#arms)*
                    _ => {
                        ::std::mem::drop(instance);
                        ::std::result::Result::Err(::haqn::injectable::unknown_field(target, field))
                    }
                }
            }
        }
    })
}
