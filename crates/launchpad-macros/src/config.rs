//! `#[derive(LauncherConfig)]` implementation.
//!
//! | Field attribute | Description |
//! |-----------------|-------------|
//! | `#[launcher(skip_prompt)]` | Interactive tooling does not ask for this field |
//!
//! The field description is the concatenated doc comment. Fields renamed with
//! `#[serde(rename = "...")]` are reported under their serialized name.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Expr, Fields, Lit, LitStr, Meta, spanned::Spanned};

/// Per-field `#[launcher(…)]` markers.
#[derive(Default)]
struct FieldAttrs {
    skip_prompt: bool,
}

pub fn derive_launcher_config(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new(
                    input.span(),
                    "LauncherConfig requires named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "LauncherConfig can only be derived for structs",
            ));
        }
    };

    let mut entries = Vec::with_capacity(fields.len());
    for field in fields {
        let attrs = parse_field_attrs(&field.attrs)?;
        let Some(ident) = &field.ident else {
            continue;
        };
        let field_name = serde_rename(&field.attrs)?.unwrap_or_else(|| {
            let raw = ident.to_string();
            raw.strip_prefix("r#").map(str::to_string).unwrap_or(raw)
        });
        let description = match doc_comment(&field.attrs) {
            Some(doc) => quote!(::core::option::Option::Some(#doc)),
            None => quote!(::core::option::Option::None),
        };
        let skip_prompt = attrs.skip_prompt;
        let ty = &field.ty;
        let type_name = quote!(#ty).to_string().replace(' ', "");

        entries.push(quote! {
            ::launchpad_core::ConfigField {
                name: #field_name,
                description: #description,
                skip_prompt: #skip_prompt,
                type_name: #type_name,
            }
        });
    }

    Ok(quote! {
        impl #impl_generics ::launchpad_core::LauncherConfig for #name #ty_generics #where_clause {
            fn fields() -> ::std::vec::Vec<::launchpad_core::ConfigField> {
                ::std::vec![#(#entries),*]
            }
        }
    })
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("launcher") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip_prompt") {
                result.skip_prompt = true;
                Ok(())
            } else {
                Err(meta.error("unknown launcher attribute, expected `skip_prompt`"))
            }
        })?;
    }

    Ok(result)
}

fn doc_comment(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(expr) => match &expr.lit {
                    Lit::Str(s) => Some(s.value().trim().to_string()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .filter(|line| !line.is_empty())
        .collect();

    let doc = lines.join(" ").trim().to_string();
    (!doc.is_empty()).then_some(doc)
}

fn serde_rename(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut rename = None;
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                rename = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.input.peek(syn::Token![=]) {
                // Skip the value of every other `key = value` pair.
                meta.value()?.parse::<Expr>()?;
            } else if meta.input.peek(syn::token::Paren) {
                let _content;
                syn::parenthesized!(_content in meta.input);
            }
            Ok(())
        })?;
    }
    Ok(rename)
}
