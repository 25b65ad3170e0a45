//! Rendering of [`Filter`] values into RFC 4515 filter strings.

use dirsync_connector::operation::Filter;

/// Render a filter AST as an LDAP filter string.
pub fn to_ldap(filter: &Filter) -> String {
    match filter {
        Filter::And { filters } => {
            let inner: Vec<String> = filters.iter().map(to_ldap).collect();
            format!("(&{})", inner.join(""))
        }
        Filter::Not { filter } => format!("(!{})", to_ldap(filter)),
        Filter::Equals { attribute, value } => {
            format!("({}={})", attribute, escape_filter_value(value))
        }
        Filter::Present { attribute } => format!("({attribute}=*)"),
    }
}

/// Escape special characters in filter assertion values (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\5c"),
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\0' => out.push_str("\\00"),
            _ => out.push(ch),
        }
    }
    out
}
