use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, parse_quote, spanned::Spanned, Data, DataStruct, DeriveInput, Fields, Index,
};

/// Generates a `blocklog` `ToValue` implementation for a user-defined struct.
///
/// The macro walks every field and converts it through its own `ToValue`
/// implementation. Type parameters get a `ToValue` bound.
///
/// For instance:
/// ```ignore
/// use blocklog::ToValue;
///
/// #[derive(ToValue)]
/// struct Session {
///     user: String,
///     retries: u32,
/// }
///
/// // Generated code (slightly simplified)
/// impl blocklog::value::ToValue for Session {
///     fn to_value(&self) -> blocklog::value::Value {
///         let record = blocklog::value::Record::with_capacity(2);
///         record.insert("user", blocklog::value::ToValue::to_value(&self.user));
///         record.insert("retries", blocklog::value::ToValue::to_value(&self.retries));
///         blocklog::value::Value::from(record)
///     }
/// }
/// ```
pub(crate) fn derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let struct_name = &input.ident;
    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param
            .bounds
            .push(parse_quote!(::blocklog::value::ToValue));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match input.data {
        Data::Struct(DataStruct { fields, .. }) => fields,
        _ => {
            return syn::Error::new(
                input.ident.span(),
                "deriving ToValue is only supported for structs",
            )
            .to_compile_error()
            .into()
        }
    };

    let body = match &fields {
        Fields::Named(named) => {
            let len = named.named.len();
            let inserts = named
                .named
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .map(|ident| {
                    let key = ident.to_string();
                    quote! {
                        record.insert(#key, ::blocklog::value::ToValue::to_value(&self.#ident));
                    }
                });
            quote! {
                let record = ::blocklog::value::Record::with_capacity(#len);
                #(#inserts)*
                ::blocklog::value::Value::from(record)
            }
        }
        Fields::Unnamed(unnamed) => {
            let pushes = unnamed.unnamed.iter().enumerate().map(|(idx, field)| {
                let idx = Index {
                    index: idx as u32,
                    span: field.span(),
                };
                quote! {
                    sequence.push(::blocklog::value::ToValue::to_value(&self.#idx));
                }
            });
            quote! {
                let sequence = ::blocklog::value::Sequence::new();
                #(#pushes)*
                ::blocklog::value::Value::from(sequence)
            }
        }
        Fields::Unit => empty_record(),
    };

    quote! {
        impl #impl_generics ::blocklog::value::ToValue for #struct_name #ty_generics #where_clause {
            fn to_value(&self) -> ::blocklog::value::Value {
                #body
            }
        }
    }
    .into()
}

fn empty_record() -> TokenStream2 {
    quote! {
        ::blocklog::value::Value::from(::blocklog::value::Record::new())
    }
}
