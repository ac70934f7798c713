//! pmx-params
//!
//! Parameter tree model for processing modules.
//!
//! Contract:
//! - A tree is a closed set of node variants: leaf, header, collection.
//! - `label` is the identity key used when matching two trees; it is only
//!   meaningful among siblings.
//! - Leaves declare a value shape and refuse values that cannot be coerced
//!   into it (`IncompatibleValue`). The previous value is kept on refusal.
//! - Validation and flat serialization live on the nodes; nothing here
//!   performs IO.

mod error;
mod node;
mod value;

pub use error::*;
pub use node::*;
pub use value::*;

/// Escape text for inclusion in XML element content or attribute values.
pub fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::xml_escape;

    #[test]
    fn xml_escape_covers_markup_characters() {
        assert_eq!(xml_escape("a<b & \"c\">"), "a&lt;b &amp; &quot;c&quot;&gt;");
        assert_eq!(xml_escape("plain"), "plain");
    }
}
