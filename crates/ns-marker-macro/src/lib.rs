use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{DeriveInput, Ident, LitStr, Result};

use proc_macro_crate::{FoundCrate, crate_name};

/// Target keywords accepted in `#[marker_info(targets(...))]`, with their variants.
const TARGETS: &[(&str, &str)] = &[
    ("namespace", "Namespace"),
    ("type", "Type"),
    ("function", "Function"),
    ("field", "Field"),
    ("parameter", "Parameter"),
];

/// Helper attribute read by the derive.
///
/// Not `marker`: that name is taken by a built-in rustc attribute.
const HELPER_ATTR: &str = "marker_info";

/// Parsed `#[marker_info(...)]` attributes.
#[derive(Default)]
struct MarkerAttrs {
    /// Overrides the type name (`#[marker_info(name = "...")]`)
    name: Option<LitStr>,
    /// `#[marker_info(repeatable)]`
    repeatable: bool,
    /// Variant idents of `MarkerTarget`; empty means unrestricted
    targets: Vec<Ident>,
}

fn parse_marker_attrs(input: &DeriveInput) -> Result<MarkerAttrs> {
    let mut result = MarkerAttrs::default();

    let helpers = input
        .attrs
        .iter()
        .filter(|a| a.path().is_ident(HELPER_ATTR));

    for attr in helpers {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                result.name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("repeatable") {
                result.repeatable = true;
                Ok(())
            } else if meta.path.is_ident("targets") {
                meta.parse_nested_meta(|target| {
                    let Some(keyword) = target.path.get_ident().map(|i| i.to_string())
                    else {
                        return Err(target.error("expected a target keyword"));
                    };
                    let Some((_, variant)) = TARGETS.iter().find(|(k, _)| *k == keyword)
                    else {
                        return Err(target.error(format!(
                            "unknown marker target `{}`; expected one of: \
                             namespace, type, function, field, parameter",
                            keyword
                        )));
                    };
                    let ident = Ident::new(variant, Span::call_site());
                    if !result.targets.contains(&ident) {
                        result.targets.push(ident);
                    }
                    Ok(())
                })
            } else {
                Err(meta.error(
                    "unsupported marker attribute; expected `name`, `repeatable` or `targets`",
                ))
            }
        })?;
    }

    Ok(result)
}

// =============================================================================
// Crate path resolution
// =============================================================================

fn marker_crate_path() -> TokenStream2 {
    match crate_name("ns-marker") {
        Ok(FoundCrate::Itself) => {
            quote!(::ns_marker)
        }
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::ns_marker),
    }
}

// =============================================================================
// Code generation
// =============================================================================

/// Generate the `Marker` impl for one type.
///
/// Example:
/// ```ignore
/// #[derive(Debug, Marker)]
/// #[marker_info(name = "owner", targets(namespace, type))]
/// struct Owner(&'static str);
///
/// // Generates:
/// impl ::ns_marker::Marker for Owner {
///     const INFO: ::ns_marker::MarkerInfo = ::ns_marker::MarkerInfo {
///         name: "owner",
///         repeatable: false,
///         targets: &[
///             ::ns_marker::MarkerTarget::Namespace,
///             ::ns_marker::MarkerTarget::Type,
///         ],
///     };
/// }
/// ```
fn expand_marker(input: &DeriveInput, ns_crate: &TokenStream2) -> Result<TokenStream2> {
    let attrs = parse_marker_attrs(input)?;

    let ident = &input.ident;
    let name = attrs
        .name
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    let repeatable = attrs.repeatable;
    let targets = &attrs.targets;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #ns_crate::Marker for #ident #ty_generics #where_clause {
            const INFO: #ns_crate::MarkerInfo = #ns_crate::MarkerInfo {
                name: #name,
                repeatable: #repeatable,
                targets: &[#(#ns_crate::MarkerTarget::#targets),*],
            };
        }
    })
}

// =============================================================================
// Entry point
// =============================================================================

#[proc_macro_derive(Marker, attributes(marker_info))]
pub fn derive_marker(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let ns_crate = marker_crate_path();

    expand_marker(&input, &ns_crate)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expand(input: DeriveInput) -> Result<String> {
        expand_marker(&input, &quote!(::ns_marker)).map(|ts| ts.to_string())
    }

    #[test]
    fn defaults_to_type_name_and_no_targets() {
        let code = expand(parse_quote! {
            struct Owner(&'static str);
        })
        .unwrap();

        assert!(code.contains("impl :: ns_marker :: Marker for Owner"));
        assert!(code.contains("name : \"Owner\""));
        assert!(code.contains("repeatable : false"));
        assert!(code.contains("targets : & []"));
    }

    #[test]
    fn parses_name_repeatable_and_targets() {
        let code = expand(parse_quote! {
            #[marker_info(name = "owner", repeatable)]
            #[marker_info(targets(namespace, type, namespace))]
            struct Owner;
        })
        .unwrap();

        assert!(code.contains("name : \"owner\""));
        assert!(code.contains("repeatable : true"));
        // Duplicates collapse
        assert_eq!(code.matches("MarkerTarget :: Namespace").count(), 1);
        assert!(code.contains("MarkerTarget :: Type"));
    }

    #[test]
    fn keeps_generics() {
        let code = expand(parse_quote! {
            struct Wrapper<T: Send + Sync + 'static> { value: T }
        })
        .unwrap();

        assert!(code.contains(
            "impl < T : Send + Sync + 'static > :: ns_marker :: Marker for Wrapper < T >"
        ));
    }

    #[test]
    fn rejects_unknown_target() {
        let err = expand(parse_quote! {
            #[marker_info(targets(package))]
            struct Owner;
        })
        .unwrap_err();

        assert!(err.to_string().contains("unknown marker target `package`"));
    }

    #[test]
    fn rejects_unknown_key() {
        let err = expand(parse_quote! {
            #[marker_info(inherited)]
            struct Owner;
        })
        .unwrap_err();

        assert!(err.to_string().contains("unsupported marker attribute"));
    }

    #[test]
    fn ignores_foreign_attributes() {
        let code = expand(parse_quote! {
            #[derive(Debug)]
            #[serde(rename_all = "snake_case")]
            struct Owner;
        })
        .unwrap();

        assert!(code.contains("name : \"Owner\""));
    }

    #[test]
    fn reads_only_the_helper_attribute() {
        // `#[marker]` is a rustc built-in and never ours to parse
        let code = expand(parse_quote! {
            #[marker(repeatable)]
            #[marker_info(name = "owner", targets(type))]
            struct Owner;
        })
        .unwrap();

        assert!(code.contains("name : \"owner\""));
        assert!(code.contains("repeatable : false"));
        assert!(code.contains("MarkerTarget :: Type"));
    }
}
