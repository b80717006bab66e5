use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, LitStr, parse_macro_input};

pub fn derive_component(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let ast = parse_macro_input!(input as DeriveInput);
    expand(&ast)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Build the `Component` impl for a parsed type.
fn expand(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    // Get the type name we are annotating
    let type_name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    // `#[component(name = "...")]` overrides the registry name.
    let mut name = type_name.to_string();
    for attr in ast.attrs.iter().filter(|a| a.path().is_ident("component")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                name = value.value();
                Ok(())
            } else {
                Err(meta.error("unsupported component attribute"))
            }
        })?;
    }

    // Use ::strata::ecs::Component which works both inside and outside the crate.
    // Inside the crate, this works because of `extern crate self as strata;` in lib.rs
    Ok(quote! {
        impl #impl_generics ::strata::ecs::Component for #type_name #ty_generics #where_clause {
            const NAME: &'static str = #name;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn name_defaults_to_type_name() {
        // Given
        let ast: DeriveInput = parse_quote! {
            struct Position { x: f32 }
        };

        // When
        let tokens = expand(&ast).unwrap().to_string();

        // Then
        assert!(tokens.contains("for Position"));
        assert!(tokens.contains("\"Position\""));
    }

    #[test]
    fn name_attribute_overrides() {
        // Given
        let ast: DeriveInput = parse_quote! {
            #[component(name = "hp")]
            struct Health(u32);
        };

        // When
        let tokens = expand(&ast).unwrap().to_string();

        // Then
        assert!(tokens.contains("\"hp\""));
        assert!(!tokens.contains("\"Health\""));
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        // Given
        let ast: DeriveInput = parse_quote! {
            #[component(sparse)]
            struct Marker;
        };

        // When
        let err = expand(&ast).unwrap_err();

        // Then
        assert_eq!(err.to_string(), "unsupported component attribute");
    }
}
