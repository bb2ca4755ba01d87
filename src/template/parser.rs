//! Lenient HTML fragment parser.
//!
//! Produces a [`Node`] forest from template text. The parser never fails:
//! stray closing tags are skipped, unclosed elements end at end of input, and
//! comments and doctypes are dropped. Tag and attribute names are lowercased
//! (HTML semantics); attribute values and text keep their case. Text that is
//! only whitespace is dropped, so indentation in templates never produces
//! nodes.

use super::node::{Element, Node};

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Parse a template fragment.
pub fn parse(html: &str) -> Vec<Node> {
    let mut cursor = Cursor { html, pos: 0 };
    cursor.children(None)
}

struct Cursor<'a> {
    html: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.html[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.html.len()
    }

    fn skip_past(&mut self, pattern: &str) {
        match self.rest().find(pattern) {
            Some(i) => self.pos += i + pattern.len(),
            None => self.pos = self.html.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.html.len() - trimmed.len();
    }

    /// Parse siblings until `</close>` (consumed) or end of input.
    fn children(&mut self, close: Option<&str>) -> Vec<Node> {
        let mut nodes = Vec::new();
        while !self.at_end() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.skip_past("-->");
            } else if rest.starts_with("<!") {
                self.skip_past(">");
            } else if let Some(after) = rest.strip_prefix("</") {
                let end = after.find('>').unwrap_or(after.len());
                let name = after[..end].trim().to_ascii_lowercase();
                self.skip_past(">");
                if close == Some(name.as_str()) {
                    return nodes;
                }
            } else if rest.starts_with('<') && starts_tag(rest) {
                nodes.push(Node::Element(self.element()));
            } else {
                let skip = usize::from(rest.starts_with('<'));
                let end = rest[skip..].find('<').map_or(rest.len(), |i| i + skip);
                let text = &rest[..end];
                if !text.trim().is_empty() {
                    nodes.push(Node::Text(decode_entities(text)));
                }
                self.pos += end;
            }
        }
        nodes
    }

    /// Parse one element; the cursor is at `<`.
    fn element(&mut self) -> Element {
        self.pos += 1;
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        let mut element = Element::new(rest[..end].to_ascii_lowercase());
        self.pos += end;

        let self_closing = self.attrs(&mut element);
        if self_closing || VOID_ELEMENTS.contains(&element.tag.as_str()) {
            return element;
        }
        let tag = element.tag.clone();
        element.children = self.children(Some(&tag));
        element
    }

    /// Parse attributes up to and including `>`. Returns true for `/>`.
    fn attrs(&mut self, element: &mut Element) -> bool {
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return false;
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                return true;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return false;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }

            let end = rest
                .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
                .unwrap_or(rest.len());
            // Always consume at least one byte (stray `=`).
            let end = end.max(1);
            let name = rest[..end].to_ascii_lowercase();
            self.pos += end;

            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.attr_value()
            } else {
                String::new()
            };
            element.set_attr(name, value);
        }
    }

    fn attr_value(&mut self) -> String {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body.find(quote).unwrap_or(body.len());
                let value = decode_entities(&body[..end]);
                self.pos += 1 + end + usize::from(end < body.len());
                value
            }
            _ => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                self.pos += end;
                decode_entities(&rest[..end])
            }
        }
    }
}

fn starts_tag(rest: &str) -> bool {
    rest[1..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
}

/// Decode the handful of named entities templates use, plus numeric ones.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        let decoded = rest.find(';').and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|ch| (ch, end))
        });
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn el(tag: &str, attrs: &[(&str, &str)], children: Vec<Node>) -> Node {
        Node::Element(Element {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            children,
        })
    }

    #[test]
    fn test_parse_nested() {
        let nodes = parse(
            r#"
            <div id="app">
                <p v-if="Seen">Now you see me</p>
                <ul><li>a</li><li>b</li></ul>
            </div>
            "#,
        );
        assert_eq!(
            nodes,
            vec![el(
                "div",
                &[("id", "app")],
                vec![
                    el("p", &[("v-if", "Seen")], vec![Node::text("Now you see me")]),
                    el(
                        "ul",
                        &[],
                        vec![
                            el("li", &[], vec![Node::text("a")]),
                            el("li", &[], vec![Node::text("b")]),
                        ]
                    ),
                ]
            )]
        );
    }

    #[test]
    fn test_parse_directive_attributes() {
        let nodes = parse(r#"<button @click="reverse" :title='Tip' v-on:keyup.enter="go" disabled>x</button>"#);
        let attrs = nodes[0].as_element().map(|e| e.attrs.clone()).unwrap_or_default();
        assert_eq!(
            attrs,
            vec![
                ("@click".to_string(), "reverse".to_string()),
                (":title".to_string(), "Tip".to_string()),
                ("v-on:keyup.enter".to_string(), "go".to_string()),
                ("disabled".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_parse_void_and_self_closing() {
        let nodes = parse(r#"<div><input v-model="Message"><todo-item /><br>tail</div>"#);
        assert_eq!(
            nodes,
            vec![el(
                "div",
                &[],
                vec![
                    el("input", &[("v-model", "Message")], vec![]),
                    el("todo-item", &[], vec![]),
                    el("br", &[], vec![]),
                    Node::text("tail"),
                ]
            )]
        );
    }

    #[test]
    fn test_parse_lowercases_names() {
        let nodes = parse(r#"<Todo-Item v-bind:TodoText="t"></Todo-Item>"#);
        assert_eq!(nodes, vec![el("todo-item", &[("v-bind:todotext", "t")], vec![])]);
    }

    #[test]
    fn test_parse_skips_comments_and_stray_close() {
        let nodes = parse("<!-- note --></span><p>a &amp; b</p>");
        assert_eq!(nodes, vec![el("p", &[], vec![Node::text("a & b")])]);
    }

    #[test]
    fn test_parse_unclosed_runs_to_end() {
        let nodes = parse("<div><span>open");
        assert_eq!(
            nodes,
            vec![el("div", &[], vec![el("span", &[], vec![Node::text("open")])])]
        );
    }

    #[test]
    fn test_parse_text_with_angle_bracket() {
        let nodes = parse("<p>1 < 2</p>");
        assert_eq!(nodes, vec![el("p", &[], vec![Node::text("1 "), Node::text("< 2")])]);
    }
}
