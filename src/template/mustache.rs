//! Mustache-style text interpolation.
//!
//! Supported tags: `{{ name }}`, `{{{ name }}}` and `{{& name }}` (never
//! escaped), `{{! comment }}`. Names are dotted paths into the state
//! snapshot; a missing name renders as the empty string. An unterminated
//! `{{` is kept literally.

use crate::state::State;

use super::directive::rename_ident;

/// Render `text` against `state`.
///
/// `escape` HTML-escapes double-mustache output.
pub fn render(text: &str, state: &State, escape: bool) -> String {
    let lookup = |name: &str| {
        state
            .lookup(name)
            .map(ToString::to_string)
            .unwrap_or_default()
    };

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        if let Some(inner) = after.strip_prefix('{') {
            if let Some(end) = inner.find("}}}") {
                out.push_str(&lookup(inner[..end].trim()));
                rest = &inner[end + 3..];
                continue;
            }
        }

        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let tag = after[..end].trim();
        rest = &after[end + 2..];
        if tag.starts_with('!') {
            continue;
        }
        if let Some(name) = tag.strip_prefix('&') {
            out.push_str(&lookup(name.trim()));
        } else if escape {
            out.push_str(&escape_html(&lookup(tag)));
        } else {
            out.push_str(&lookup(tag));
        }
    }
    out.push_str(rest);
    out
}

/// Check whether `text` contains anything to interpolate.
pub fn has_tags(text: &str) -> bool {
    text.contains("{{")
}

/// Rename a loop variable inside the tags of `text`, leaving literal text alone.
pub fn rename_in_tags(text: &str, from: &str, to: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start + 2]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = after;
            break;
        };
        out.push_str(&rename_ident(&after[..end], from, to));
        rest = &after[end..];
    }
    out.push_str(rest);
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
