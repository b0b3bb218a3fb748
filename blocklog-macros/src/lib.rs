use proc_macro::TokenStream;

mod derive;

use derive::derive;

/// Derives `blocklog::value::ToValue` for a struct.
///
/// Named fields become a record, keyed by field name in declaration order.
/// Tuple fields become a sequence. A unit struct becomes an empty record.
/// Every field type must implement `ToValue`.
#[proc_macro_derive(ToValue)]
pub fn derive_to_value(input: TokenStream) -> TokenStream {
    derive(input)
}
