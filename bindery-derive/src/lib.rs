//! Derive macro for bindery
//!
//! `#[derive(Inject)]` implements `bindery::Constructible` for a struct, so
//! the struct can be built with `bindery::construct` or registered with
//! `Registrar::register_constructed`.
//!
//! # Example
//!
//! ```rust,ignore
//! use bindery::{BindingConfig, Container, Inject, Registrar};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct Cache {
//!     size: usize,
//! }
//!
//! #[derive(Inject)]
//! struct UserService {
//!     #[inject]
//!     db: Arc<Database>,
//!     #[inject]
//!     cache: Arc<Cache>,
//!     // Non-injected fields use Default
//!     request_count: u64,
//! }
//!
//! let container = Container::new();
//! let registrar = Registrar::new(&container);
//! registrar.register(BindingConfig::single().singleton(), "db", || Database { url: "postgres://localhost".into() })?;
//! registrar.register(BindingConfig::single().singleton(), "cache", || Cache { size: 1024 })?;
//! registrar.register_constructed::<UserService, ()>(BindingConfig::single(), "users")?;
//! container.freeze();
//!
//! let service = container.get::<UserService>()?;
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Type, parse_macro_input};

/// Derive `bindery::Constructible`.
///
/// The generated type has one constructor, `<Type>::inject`, whose
/// parameters are the `#[inject]` fields in declaration order.
///
/// # Attributes
///
/// - `#[inject]` - resolve the field from the container. The field type must
///   be `Arc<T>`; the parameter key is `T`, untagged.
///
/// Fields without `#[inject]` use `Default::default()`.
#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_inject(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_inject(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Inject can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Inject can only be derived for structs",
            ));
        }
    };

    let mut parameter_keys = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };

        if has_inject_attr(&field.attrs)? {
            let inner_type = extract_arc_inner_type(&field.ty).ok_or_else(|| {
                syn::Error::new_spanned(&field.ty, "Fields marked with #[inject] must have type Arc<T>")
            })?;
            parameter_keys.push(quote! {
                ::bindery::TypeKey::of::<#inner_type>()
            });
            field_inits.push(quote! {
                #field_name: args.next::<#inner_type>()?
            });
        } else {
            field_inits.push(quote! {
                #field_name: ::std::default::Default::default()
            });
        }
    }

    let constructor_name = format!("{name}::inject");

    Ok(quote! {
        impl #impl_generics ::bindery::invoker::Constructible for #name #ty_generics #where_clause {
            #[allow(unused_mut, unused_variables)]
            fn constructors() -> ::std::vec::Vec<::bindery::invoker::Constructor<Self>> {
                let callable = ::bindery::invoker::Callable::<Self, ()>::new(
                    #constructor_name,
                    ::std::vec![#(#parameter_keys),*],
                    |_: ::std::option::Option<&()>, mut args: ::bindery::invoker::Arguments| {
                        ::std::result::Result::Ok(Self {
                            #(#field_inits),*
                        })
                    },
                );
                ::std::vec![::bindery::invoker::Constructor::from_callable(callable).inject()]
            }
        }
    })
}

/// Whether the field carries a bare `#[inject]`.
fn has_inject_attr(attrs: &[Attribute]) -> syn::Result<bool> {
    for attr in attrs {
        if attr.path().is_ident("inject") {
            attr.meta.require_path_only()?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Extract T from Arc<T>
fn extract_arc_inner_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Arc" {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(syn::GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
