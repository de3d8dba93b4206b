//! Call-level merge inside an inline handler declaration.
//!
//! An inline handler is one declaration holding a chain such as
//! `app.openapi(getUserRoute, ...).openapi(postUserRoute, ...)`. Each
//! registration call is keyed by its first argument; the generated chain
//! decides which keys exist, the existing text wins for keys both share.

use std::collections::HashMap;

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::conventions::Conventions;
use crate::scan::{KeyedSpan, extract_keyed_spans};

static FIRST_ARG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\(\s*([A-Za-z_$][\w$]*)").unwrap());

/// Matches `.method(` with any whitespace before the dot included in the match.
pub(crate) fn registration_call(conventions: &Conventions) -> Regex {
    let method = regex::escape(&conventions.registration_method);
    Regex::new(&format!(r"\s*\.\s*{method}\s*\(")).expect("escaped method name is a valid pattern")
}

pub(crate) fn registration_calls(text: &str, conventions: &Conventions) -> Vec<KeyedSpan> {
    extract_keyed_spans(text, &registration_call(conventions), &FIRST_ARG, b'(', b')')
}

/// Rebuild `generated_decl` keeping every registration call it contains,
/// taking each call's text from `existing_decl` when the key is present there.
pub fn merge_inline_handler(existing_decl: &str, generated_decl: &str, conventions: &Conventions) -> String {
    let generated_calls = registration_calls(generated_decl, conventions);
    let (Some(first), Some(last)) = (generated_calls.first(), generated_calls.last()) else {
        return generated_decl.to_string();
    };

    let existing_calls: HashMap<String, String> = registration_calls(existing_decl, conventions)
        .into_iter()
        .map(|s| (s.key, s.text))
        .rev()
        .collect();

    let mut out = String::with_capacity(existing_decl.len().max(generated_decl.len()));
    out.push_str(&generated_decl[..first.start]);
    for call in &generated_calls {
        match existing_calls.get(&call.key) {
            Some(text) => out.push_str(text),
            None => {
                debug!(key = %call.key, "adding registration call");
                out.push_str(&call.text);
            }
        }
    }
    out.push_str(&generated_decl[last.end..]);
    out
}
