use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Ident, Item, LitStr, parse_macro_input};

const FALLBACK_MODE: &str = "__fallback__";

/// Implementation of `#[register_launcher(product = "...", mode = "...")]`.
///
/// Leaves the decorated type unchanged and appends a
/// `#[::launchpad_core::linkme::distributed_slice]` static holding its
/// `LauncherDescriptor`.
pub fn register_launcher(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut product: Option<LitStr> = None;
    let mut mode: Option<LitStr> = None;
    let mut fallback = false;

    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("product") {
            product = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("mode") {
            mode = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("fallback") {
            fallback = true;
        } else {
            return Err(meta.error("expected `product`, `mode` or `fallback`"));
        }
        Ok(())
    });
    parse_macro_input!(attr with parser);

    let item = parse_macro_input!(item as Item);
    match expand(product, mode, fallback, &item) {
        Ok(tokens) => tokens.into(),
        Err(err) => {
            let err = err.into_compile_error();
            quote!(#item #err).into()
        }
    }
}

fn expand(
    product: Option<LitStr>,
    mode: Option<LitStr>,
    fallback: bool,
    item: &Item,
) -> syn::Result<proc_macro2::TokenStream> {
    let (ident, generics) = match item {
        Item::Struct(s) => (&s.ident, &s.generics),
        Item::Enum(e) => (&e.ident, &e.generics),
        _ => {
            return Err(syn::Error::new(
                Span::call_site(),
                "#[register_launcher] can only be applied to a struct or enum",
            ));
        }
    };
    if !generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            generics,
            "#[register_launcher] requires a concrete, non-generic launcher type",
        ));
    }

    let product = product.ok_or_else(|| {
        syn::Error::new(Span::call_site(), "#[register_launcher] requires `product = \"…\"`")
    })?;
    validate_name(&product)?;

    let (mode_tokens, mode_suffix) = match (mode, fallback) {
        (Some(mode), false) => {
            validate_name(&mode)?;
            if mode.value() == FALLBACK_MODE {
                return Err(syn::Error::new(
                    mode.span(),
                    "the fallback mode is reserved, use `fallback` instead",
                ));
            }
            let suffix = format!("MODE__{}", escape(&mode.value()));
            (quote!(#mode), suffix)
        }
        (None, true) => (
            quote!(::launchpad_core::FALLBACK_LAUNCH_MODE),
            "FALLBACK".to_string(),
        ),
        (Some(mode), true) => {
            return Err(syn::Error::new(
                mode.span(),
                "`mode` and `fallback` are mutually exclusive",
            ));
        }
        (None, false) => {
            return Err(syn::Error::new(
                Span::call_site(),
                "#[register_launcher] requires `mode = \"…\"` or `fallback`",
            ));
        }
    };

    let type_name = ident.to_string();
    let static_name = Ident::new(
        &format!(
            "_LAUNCHER_REGISTER__{}__{}__{}",
            escape(type_name.strip_prefix("r#").unwrap_or(&type_name)),
            escape(&product.value()),
            mode_suffix,
        ),
        Span::call_site(),
    );

    Ok(quote! {
        #item

        #[::launchpad_core::linkme::distributed_slice(::launchpad_core::LAUNCHER_REGISTRY)]
        #[linkme(crate = ::launchpad_core::linkme)]
        #[doc(hidden)]
        #[allow(non_upper_case_globals)]
        static #static_name: ::launchpad_core::LauncherDescriptor =
            ::launchpad_core::LauncherDescriptor::of::<#ident>(#product, #mode_tokens);
    })
}

fn validate_name(lit: &LitStr) -> syn::Result<()> {
    let value = lit.value();
    if value.is_empty() {
        Err(syn::Error::new(lit.span(), "name must not be empty"))
    } else if value.contains('.') {
        Err(syn::Error::new(lit.span(), "name must not contain '.'"))
    } else {
        Ok(())
    }
}

/// Maps a name onto identifier characters without collisions.
///
/// ASCII alphanumerics are kept; every other character becomes `_x..` or
/// `_u......`, so escaped names never contain `__` and can be joined by it.
fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if c.is_ascii() {
            out.push_str(&format!("_x{:02x}", c as u32));
        } else {
            out.push_str(&format!("_u{:06x}", c as u32));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape;

    #[test]
    fn test_escape_keeps_names_apart() {
        assert_eq!(escape("Echo"), "Echo");
        assert_ne!(escape("a-b"), escape("a_b"));
        assert_ne!(escape("Echo"), escape("ECHO"));
        assert_eq!(escape("a-b"), "a_x2db");
        assert!(!escape("a__b").contains("__"));
    }
}
