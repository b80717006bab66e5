mod component;

use proc_macro::TokenStream;

/// Derive the `strata::ecs::Component` marker for a plain data type.
///
/// The generated impl names the component after the type identifier, which is the name the
/// registry indexes it under.
#[proc_macro_derive(Component, attributes(component))]
pub fn derive_component(item: TokenStream) -> TokenStream {
    component::derive_component(item)
}
