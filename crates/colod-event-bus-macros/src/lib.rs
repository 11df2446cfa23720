use proc_macro::TokenStream;
use quote::quote;

/// Derives [`event_bus::BusEvent`] for a struct or enum, filling in the `as_any`
/// downcast hook the bus needs to route boxed events back to their concrete type.
///
/// # Examples
/// ``` no_run
/// use event_bus::BusEvent;
/// use colod_event_bus_macros::Event;
///
/// #[derive(Clone, Event)]
/// struct ReplicationLagChanged {
///    millis: u64,
/// }
/// ```
#[proc_macro_derive(Event)]
pub fn derive_bus_event(input: TokenStream) -> TokenStream {
    let ast: syn::DeriveInput = syn::parse(input).expect("#[derive(Event)] requires a valid struct or enum");
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let name = &ast.ident;

    let expanded = quote! {
        impl #impl_generics event_bus::BusEvent for #name #ty_generics #where_clause {
            fn as_any(&self) -> &dyn core::any::Any {
                self
            }
        }
    };

    expanded.into()
}
