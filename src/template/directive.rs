//! Directive attribute parsing and ordering.
//!
//! Splits `prefix:argument` keys, recognizes the `:` and `@` shorthands, and
//! sorts directives into execution order: loop, conditional, model, event,
//! bind, raw html. Plain attributes are passed through untouched.

use crate::config::Config;
use crate::error::{Error, Result};

/// Directive kinds, declared in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirectiveKind {
    For,
    If,
    Model,
    On,
    Bind,
    Html,
}

/// A parsed directive attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// Text after `:` (`href` in `v-bind:href`, `keyup.enter` in `v-on:keyup.enter`).
    pub arg: String,
    /// Attribute value (a field name, method name, or loop expression).
    pub value: String,
    /// Full attribute key as written, kept so a loop can re-emit the directive on clones.
    pub key: String,
}

impl Directive {
    /// Split an event argument into its type and key modifiers.
    pub fn event(&self) -> (&str, Vec<&str>) {
        let mut parts = self.arg.split('.');
        let event_type = parts.next().unwrap_or_default();
        (event_type, parts.filter(|m| !m.is_empty()).collect())
    }
}

/// Classify one attribute key.
///
/// Returns `Ok(None)` for plain attributes and [`Error::UnknownDirective`]
/// for a prefixed key that names no directive.
pub fn parse_key(key: &str, config: &Config) -> Result<Option<(DirectiveKind, String)>> {
    let (kind, arg) = if let Some(arg) = key.strip_prefix(':') {
        (DirectiveKind::Bind, arg)
    } else if let Some(arg) = key.strip_prefix('@') {
        (DirectiveKind::On, arg)
    } else {
        let Some(rest) = key.strip_prefix(config.prefix.as_str()) else {
            return Ok(None);
        };
        let (name, arg) = rest.split_once(':').unwrap_or((rest, ""));
        let kind = match name {
            "for" => DirectiveKind::For,
            "if" => DirectiveKind::If,
            "model" => DirectiveKind::Model,
            "on" => DirectiveKind::On,
            "bind" => DirectiveKind::Bind,
            "html" => DirectiveKind::Html,
            _ => return Err(Error::UnknownDirective(key.to_string())),
        };
        (kind, arg)
    };
    // An event needs a type ahead of its modifiers.
    let named = match kind {
        DirectiveKind::On => arg.split('.').next().is_some_and(|t| !t.is_empty()),
        _ => !arg.is_empty(),
    };
    let needs_arg = matches!(kind, DirectiveKind::On | DirectiveKind::Bind);
    if needs_arg != named {
        return Err(Error::UnknownDirective(key.to_string()));
    }
    Ok(Some((kind, arg.to_string())))
}

/// Partition attributes into ordered directives and plain attributes.
///
/// The sort is stable, so two directives of the same kind keep their
/// template order.
pub fn partition(
    attrs: Vec<(String, String)>,
    config: &Config,
) -> Result<(Vec<Directive>, Vec<(String, String)>)> {
    let mut directives = Vec::new();
    let mut plain = Vec::new();
    for (key, value) in attrs {
        match parse_key(&key, config)? {
            Some((kind, arg)) => directives.push(Directive {
                kind,
                arg,
                value,
                key,
            }),
            None => plain.push((key, value)),
        }
    }
    directives.sort_by_key(|d| d.kind);
    Ok((directives, plain))
}

/// Parse `item in field` into `(item, field)`.
pub fn parse_loop(expr: &str) -> Result<(String, String)> {
    let (name, field) = expr
        .split_once(" in ")
        .ok_or_else(|| Error::MalformedLoop(expr.to_string()))?;
    let (name, field) = (name.trim(), field.trim());
    if name.is_empty() || field.is_empty() || !name.chars().all(is_ident) {
        return Err(Error::MalformedLoop(expr.to_string()));
    }
    Ok((name.to_string(), field.to_string()))
}

/// Canonical key name for an event modifier.
///
/// Aliases map to their DOM names (`esc` -> `Escape`, `up` -> `ArrowUp`);
/// anything else is title-cased per hyphen segment (`page-down` -> `PageDown`).
pub fn normalize_key(modifier: &str) -> String {
    let lower = modifier.to_ascii_lowercase();
    let alias = match lower.as_str() {
        "esc" => Some("Escape"),
        "space" | "spacebar" => Some(" "),
        "up" => Some("ArrowUp"),
        "down" => Some("ArrowDown"),
        "left" => Some("ArrowLeft"),
        "right" => Some("ArrowRight"),
        "del" => Some("Delete"),
        _ => None,
    };
    if let Some(alias) = alias {
        return alias.to_string();
    }
    lower
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Check a fired key against a comma-separated modifier list.
pub fn key_matches(keys: &str, key: &str) -> bool {
    keys.split(',').any(|k| k.eq_ignore_ascii_case(key))
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Rename whole-identifier occurrences of `from` in `expr`.
///
/// `todo.Text` matches `todo`; `todos` and `item.todo` do not.
pub fn rename_ident(expr: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return expr.to_string();
    }
    let mut out = String::with_capacity(expr.len());
    let mut i = 0;
    while let Some(offset) = expr[i..].find(from) {
        let start = i + offset;
        let end = start + from.len();
        let before_ok = expr[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !is_ident(c) && c != '.');
        let after_ok = expr[end..].chars().next().is_none_or(|c| !is_ident(c));
        out.push_str(&expr[i..start]);
        out.push_str(if before_ok && after_ok { to } else { from });
        i = end;
    }
    out.push_str(&expr[i..]);
    out
}
