//! Distinguished name handling (RFC 4514).
//!
//! DNs are kept as strings throughout the workspace; these helpers split,
//! escape, and compare them without a round trip to the server.

use std::fmt;

use crate::error::{ConnectorError, ConnectorResult};

/// One relative distinguished name, e.g. `OU=Backend`. `value` is unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdn {
    pub attribute: String,
    pub value: String,
}

impl Rdn {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive attribute-type test.
    pub fn is(&self, attribute: &str) -> bool {
        self.attribute.eq_ignore_ascii_case(attribute)
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute, escape_value(&self.value))
    }
}

/// Escape an attribute value for use inside a DN.
///
/// Escapes `, + " \ < > ; =`, NUL, a leading `#`, and leading/trailing spaces.
pub fn escape_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let last = chars.len().saturating_sub(1);
    let mut out = String::with_capacity(value.len() + 4);

    for (i, ch) in chars.iter().copied().enumerate() {
        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                out.push('\\');
                out.push(ch);
            }
            '\0' => out.push_str("\\00"),
            ' ' if i == 0 || i == last => out.push_str("\\20"),
            '#' if i == 0 => out.push_str("\\23"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverse of [`escape_value`]; also decodes `\XX` hex pairs.
pub fn unescape_value(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|pair| std::str::from_utf8(pair).ok())
                .and_then(|pair| u8::from_str_radix(pair, 16).ok());
            match hex {
                Some(b) => {
                    out.push(b);
                    i += 3;
                }
                None => {
                    out.push(bytes[i + 1]);
                    i += 2;
                }
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    match String::from_utf8(out) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Split a DN into its raw (still escaped) components, leftmost first.
fn split_raw(dn: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, ch) in dn.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            ',' => {
                parts.push(dn[start..i].trim_start());
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = dn[start..].trim_start();
    if !tail.is_empty() || !parts.is_empty() {
        parts.push(tail);
    }
    parts
}

/// Parse a DN into RDNs, leftmost (innermost) first.
pub fn parse(dn: &str) -> ConnectorResult<Vec<Rdn>> {
    split_raw(dn)
        .into_iter()
        .map(|raw| {
            let (attribute, value) = raw.split_once('=').ok_or_else(|| {
                ConnectorError::InvalidData {
                    message: format!("malformed DN component '{raw}' in '{dn}'"),
                }
            })?;
            let attribute = attribute.trim();
            if attribute.is_empty() {
                return Err(ConnectorError::InvalidData {
                    message: format!("empty attribute type in '{dn}'"),
                });
            }
            Ok(Rdn::new(attribute, unescape_value(value.trim_start())))
        })
        .collect()
}

/// Join RDNs back into a DN string.
pub fn join(rdns: &[Rdn]) -> String {
    rdns.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// The leftmost component, still escaped (`CN=Zhang San`).
pub fn first_rdn(dn: &str) -> Option<&str> {
    split_raw(dn).into_iter().next().filter(|s| !s.is_empty())
}

/// Everything after the leftmost component, or `None` for a single-RDN DN.
pub fn parent(dn: &str) -> Option<&str> {
    let mut escaped = false;
    for (i, ch) in dn.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            ',' => return Some(dn[i + 1..].trim_start()),
            _ => {}
        }
    }
    None
}

/// Canonical form used for comparisons: lowercase types and values, no spacing.
pub fn normalize(dn: &str) -> String {
    match parse(dn) {
        Ok(rdns) => rdns
            .iter()
            .map(|r| {
                Rdn::new(r.attribute.to_ascii_lowercase(), r.value.to_lowercase()).to_string()
            })
            .collect::<Vec<_>>()
            .join(","),
        Err(_) => dn.trim().to_lowercase(),
    }
}

/// Case- and spacing-insensitive DN equality.
pub fn dn_eq(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// Whether `dn` lies strictly below `ancestor`.
pub fn is_descendant_of(dn: &str, ancestor: &str) -> bool {
    let dn = normalize(dn);
    let ancestor = normalize(ancestor);
    dn.len() > ancestor.len() && dn.ends_with(&format!(",{ancestor}"))
}
