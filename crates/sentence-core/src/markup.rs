//! Markup form of a document.
//!
//! Each unit reads and writes one element, chosen by the tag and class rules
//! in the [`Schema`]. Parsing is lenient: unknown elements are transparent,
//! bare text becomes a sentence, and paragraphs are filled up to the
//! `(sentence space)*` pattern.

use std::fmt::Write as _;

use crate::core::{Document, Node};
use crate::schema::{Schema, UnitKind, UnitSpec};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("unterminated tag at byte {offset}")]
    UnterminatedTag { offset: usize },
    #[error("unterminated comment at byte {offset}")]
    UnterminatedComment { offset: usize },
}

/// Paragraphs are written one per line.
pub fn render(doc: &Document, schema: &Schema) -> String {
    let mut out = String::new();
    for (ix, node) in doc.children.iter().enumerate() {
        if ix > 0 {
            out.push('\n');
        }
        render_node(node, schema, &mut out);
    }
    out
}

fn render_node(node: &Node, schema: &Schema, out: &mut String) {
    let kind = node.kind();
    let spec = schema
        .spec(kind)
        .copied()
        .unwrap_or_else(|| UnitSpec::for_kind(kind));
    let markup = spec.markup;

    out.push('<');
    out.push_str(markup.tag);
    if let Some(class) = markup.class {
        let _ = write!(out, " class=\"{class}\"");
    }
    out.push('>');

    match (markup.display, node) {
        (Some(display), _) => out.push_str(display),
        (None, Node::Sentence(s)) => escape_into(&s.text, out),
        (None, Node::Paragraph(p)) => {
            for child in &p.children {
                render_node(child, schema, out);
            }
        }
        (None, Node::Space) => {}
    }

    out.push_str("</");
    out.push_str(markup.tag);
    out.push('>');
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

pub fn parse(input: &str, schema: &Schema) -> Result<Document, MarkupError> {
    let fragments = build_tree(tokenize(input)?);

    let mut children = Vec::new();
    let mut pending: Vec<Node> = Vec::new();
    collect_blocks(&fragments, schema, &mut children, &mut pending);
    flush_pending(schema, &mut children, &mut pending);
    Ok(Document::new(children))
}

fn flush_pending(schema: &Schema, blocks: &mut Vec<Node>, pending: &mut Vec<Node>) {
    if pending.is_empty() {
        return;
    }
    let inline = std::mem::take(pending);
    blocks.push(Node::paragraph(schema.fill_paragraph(inline)));
}

/// Top level: paragraph elements become paragraphs; stray inline content is
/// gathered into an implicit paragraph.
fn collect_blocks(
    fragments: &[Fragment],
    schema: &Schema,
    blocks: &mut Vec<Node>,
    pending: &mut Vec<Node>,
) {
    for fragment in fragments {
        match fragment {
            Fragment::Element {
                tag,
                classes,
                children,
            } => match schema.spec_for_markup(tag, classes).map(|spec| spec.kind) {
                Some(UnitKind::Paragraph) => {
                    flush_pending(schema, blocks, pending);
                    let mut inline = Vec::new();
                    collect_inline(children, schema, &mut inline);
                    blocks.push(Node::paragraph(schema.fill_paragraph(inline)));
                }
                Some(kind) => pending.push(inline_unit(kind, children)),
                None => collect_blocks(children, schema, blocks, pending),
            },
            Fragment::Text(text) => {
                let text = collapse_whitespace(text);
                if !text.is_empty() {
                    pending.push(Node::sentence(text));
                }
            }
        }
    }
}

/// Inside a paragraph, nested paragraph and unknown elements are transparent.
fn collect_inline(fragments: &[Fragment], schema: &Schema, out: &mut Vec<Node>) {
    for fragment in fragments {
        match fragment {
            Fragment::Element {
                tag,
                classes,
                children,
            } => match schema.spec_for_markup(tag, classes).map(|spec| spec.kind) {
                Some(kind @ (UnitKind::Sentence | UnitKind::Space)) => {
                    out.push(inline_unit(kind, children));
                }
                Some(UnitKind::Paragraph) | None => collect_inline(children, schema, out),
            },
            Fragment::Text(text) => {
                let text = collapse_whitespace(text);
                if !text.is_empty() {
                    out.push(Node::sentence(text));
                }
            }
        }
    }
}

fn inline_unit(kind: UnitKind, children: &[Fragment]) -> Node {
    match kind {
        UnitKind::Space => Node::Space,
        UnitKind::Sentence | UnitKind::Paragraph => {
            let mut text = String::new();
            text_content(children, &mut text);
            Node::sentence(collapse_whitespace(&text))
        }
    }
}

fn text_content(fragments: &[Fragment], out: &mut String) {
    for fragment in fragments {
        match fragment {
            Fragment::Element { children, .. } => text_content(children, out),
            Fragment::Text(text) => out.push_str(text),
        }
    }
}

/// Collapses ASCII whitespace runs to one space and trims both ends.
fn collapse_whitespace(text: &str) -> String {
    text.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Fragment {
    Element {
        tag: String,
        classes: Vec<String>,
        children: Vec<Fragment>,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open {
        tag: String,
        classes: Vec<String>,
        self_closing: bool,
    },
    Close(String),
    Text(String),
}

const VOID_TAGS: [&str; 4] = ["br", "hr", "img", "meta"];

fn tokenize(input: &str) -> Result<Vec<Token>, MarkupError> {
    let mut tokens = Vec::new();
    let mut rest = input;
    let mut offset = 0;

    while !rest.is_empty() {
        if let Some(comment) = rest.strip_prefix("<!--") {
            let Some(end) = comment.find("-->") else {
                return Err(MarkupError::UnterminatedComment { offset });
            };
            let consumed = 4 + end + 3;
            rest = &rest[consumed..];
            offset += consumed;
            continue;
        }

        if rest.starts_with('<') {
            let Some(end) = rest.find('>') else {
                return Err(MarkupError::UnterminatedTag { offset });
            };
            if let Some(token) = parse_tag(&rest[1..end]) {
                tokens.push(token);
            }
            rest = &rest[end + 1..];
            offset += end + 1;
            continue;
        }

        let end = rest.find('<').unwrap_or(rest.len());
        tokens.push(Token::Text(decode_entities(&rest[..end])));
        rest = &rest[end..];
        offset += end;
    }

    Ok(tokens)
}

/// Parses the inside of `<...>`. Doctypes and processing instructions are
/// dropped.
fn parse_tag(body: &str) -> Option<Token> {
    let body = body.trim();
    if body.starts_with('!') || body.starts_with('?') {
        return None;
    }
    if let Some(name) = body.strip_prefix('/') {
        return Some(Token::Close(name.trim().to_ascii_lowercase()));
    }

    let (body, self_closing) = match body.strip_suffix('/') {
        Some(body) => (body, true),
        None => (body, false),
    };
    let name_end = body
        .find(|c: char| c.is_ascii_whitespace())
        .unwrap_or(body.len());
    let tag = body[..name_end].to_ascii_lowercase();
    if tag.is_empty() {
        return None;
    }

    let classes = parse_attrs(&body[name_end..])
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("class"))
        .map(|(_, value)| value.split_ascii_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    let self_closing = self_closing || VOID_TAGS.contains(&tag.as_str());
    Some(Token::Open {
        tag,
        classes,
        self_closing,
    })
}

fn parse_attrs(mut rest: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return attrs;
        }

        let name_end = rest
            .find(|c: char| c == '=' || c.is_ascii_whitespace())
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_string();
        rest = rest[name_end..].trim_start();

        let Some(value_part) = rest.strip_prefix('=') else {
            attrs.push((name, String::new()));
            continue;
        };
        let value_part = value_part.trim_start();

        let (value, remaining) = match value_part.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let inner = &value_part[1..];
                match inner.find(quote) {
                    Some(end) => (&inner[..end], &inner[end + 1..]),
                    None => (inner, ""),
                }
            }
            _ => {
                let end = value_part
                    .find(|c: char| c.is_ascii_whitespace())
                    .unwrap_or(value_part.len());
                (&value_part[..end], &value_part[end..])
            }
        };
        attrs.push((name, decode_entities(value)));
        rest = remaining;
    }
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&rest[1..end]).map(|ch| (ch, end)));
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

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = match name.strip_prefix('#') {
                Some(hex) if hex.starts_with(['x', 'X']) => u32::from_str_radix(&hex[1..], 16).ok(),
                Some(dec) => dec.parse().ok(),
                None => None,
            };
            code.and_then(char::from_u32)
        }
    }
}

/// Nests tokens into fragments. Unmatched close tags are ignored and
/// elements still open at the end of input are closed implicitly.
fn build_tree(tokens: Vec<Token>) -> Vec<Fragment> {
    struct Open {
        tag: String,
        classes: Vec<String>,
        children: Vec<Fragment>,
    }

    let mut root: Vec<Fragment> = Vec::new();
    let mut stack: Vec<Open> = Vec::new();

    fn push(root: &mut Vec<Fragment>, stack: &mut [Open], fragment: Fragment) {
        match stack.last_mut() {
            Some(open) => open.children.push(fragment),
            None => root.push(fragment),
        }
    }

    fn close_top(root: &mut Vec<Fragment>, stack: &mut Vec<Open>) {
        if let Some(open) = stack.pop() {
            let fragment = Fragment::Element {
                tag: open.tag,
                classes: open.classes,
                children: open.children,
            };
            push(root, stack, fragment);
        }
    }

    for token in tokens {
        match token {
            Token::Text(text) => push(&mut root, &mut stack, Fragment::Text(text)),
            Token::Open {
                tag,
                classes,
                self_closing: true,
            } => push(
                &mut root,
                &mut stack,
                Fragment::Element {
                    tag,
                    classes,
                    children: Vec::new(),
                },
            ),
            Token::Open { tag, classes, .. } => stack.push(Open {
                tag,
                classes,
                children: Vec::new(),
            }),
            Token::Close(tag) => {
                if let Some(depth) = stack.iter().rposition(|open| open.tag == tag) {
                    while stack.len() > depth {
                        close_top(&mut root, &mut stack);
                    }
                }
            }
        }
    }
    while !stack.is_empty() {
        close_top(&mut root, &mut stack);
    }
    root
}
