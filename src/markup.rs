//! Telegram HTML handling.
//!
//! `Document` is a lossless tag tree: serializing an untouched document yields
//! the input byte-for-byte, which lets the translator swap leaf text while every
//! tag and whitespace run stays exactly where it was. `render_entities` goes the
//! other way, turning Telegram message entities (UTF-16 offsets) into HTML.
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9-]*)((?:\s[^<>]*?)?)(/?)>").expect("valid tag pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Raw text, entities still encoded.
    Text(String),
    Element {
        name: String,
        open: String,
        children: Vec<Node>,
        /// `None` when the input never closed the element.
        close: Option<String>,
    },
    /// Self-closing or unmatched tag, kept verbatim.
    Tag(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

struct Frame {
    name: String,
    open: String,
    children: Vec<Node>,
}

impl Frame {
    fn finish(self, close: Option<String>) -> Node {
        Node::Element {
            name: self.name,
            open: self.open,
            children: self.children,
            close,
        }
    }
}

fn push(stack: &mut [Frame], root: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(frame) => frame.children.push(node),
        None => root.push(node),
    }
}

impl Document {
    pub fn parse(input: &str) -> Self {
        let mut root = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut last = 0;

        for caps in TAG_RE.captures_iter(input) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > last {
                push(
                    &mut stack,
                    &mut root,
                    Node::Text(input[last..whole.start()].to_string()),
                );
            }
            last = whole.end();

            let raw = whole.as_str().to_string();
            let name = caps[2].to_ascii_lowercase();
            let closing = !caps[1].is_empty();
            let self_closing = !caps[4].is_empty();

            if closing {
                match stack.iter().rposition(|f| f.name == name) {
                    Some(pos) => {
                        // Elements left open inside the one being closed end here implicitly.
                        while stack.len() > pos + 1 {
                            if let Some(frame) = stack.pop() {
                                push(&mut stack, &mut root, frame.finish(None));
                            }
                        }
                        if let Some(frame) = stack.pop() {
                            push(&mut stack, &mut root, frame.finish(Some(raw)));
                        }
                    }
                    None => push(&mut stack, &mut root, Node::Tag(raw)),
                }
            } else if self_closing {
                push(&mut stack, &mut root, Node::Tag(raw));
            } else {
                stack.push(Frame {
                    name,
                    open: raw,
                    children: Vec::new(),
                });
            }
        }

        if last < input.len() {
            push(&mut stack, &mut root, Node::Text(input[last..].to_string()));
        }
        while let Some(frame) = stack.pop() {
            push(&mut stack, &mut root, frame.finish(None));
        }

        Document { nodes: root }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Every text leaf in document order.
    pub fn leaves_mut(&mut self) -> Vec<&mut String> {
        fn collect<'a>(nodes: &'a mut [Node], out: &mut Vec<&'a mut String>) {
            for node in nodes.iter_mut() {
                match node {
                    Node::Text(text) => out.push(text),
                    Node::Element { children, .. } => collect(children, out),
                    Node::Tag(_) => {}
                }
            }
        }
        let mut out = Vec::new();
        collect(&mut self.nodes, &mut out);
        out
    }

    pub fn serialize(&self) -> String {
        fn write(nodes: &[Node], out: &mut String) {
            for node in nodes {
                match node {
                    Node::Text(text) => out.push_str(text),
                    Node::Element {
                        open,
                        children,
                        close,
                        ..
                    } => {
                        out.push_str(open);
                        write(children, out);
                        if let Some(close) = close {
                            out.push_str(close);
                        }
                    }
                    Node::Tag(raw) => out.push_str(raw),
                }
            }
        }
        let mut out = String::new();
        write(&self.nodes, &mut out);
        out
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// Raw tags of a marked-up string, in order.
pub fn tag_sequence(markup: &str) -> Vec<String> {
    TAG_RE
        .find_iter(markup)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Split a leaf into (leading whitespace, core, trailing whitespace).
pub fn split_padding(s: &str) -> (&str, &str, &str) {
    let start = s.len() - s.trim_start().len();
    let end = s.trim_end().len();
    if start >= end {
        return (s, "", "");
    }
    (&s[..start], &s[start..end], &s[end..])
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        push_escaped(&mut out, ch);
    }
    out
}

pub fn escape_attr(s: &str) -> String {
    escape_html(s).replace('"', "&quot;")
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        _ => out.push(ch),
    }
}

pub fn unescape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|ch| (ch, end)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
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
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(|c| c == 'x' || c == 'X') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Formatting attached to a span of message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityTag {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Spoiler,
    Code,
    Pre(Option<String>),
    Link(String),
    CustomEmoji(String),
}

impl EntityTag {
    fn open(&self) -> String {
        match self {
            EntityTag::Bold => "<b>".into(),
            EntityTag::Italic => "<i>".into(),
            EntityTag::Underline => "<u>".into(),
            EntityTag::Strikethrough => "<s>".into(),
            EntityTag::Spoiler => "<tg-spoiler>".into(),
            EntityTag::Code => "<code>".into(),
            EntityTag::Pre(None) => "<pre>".into(),
            EntityTag::Pre(Some(lang)) => {
                format!("<pre><code class=\"language-{}\">", escape_attr(lang))
            }
            EntityTag::Link(url) => format!("<a href=\"{}\">", escape_attr(url)),
            EntityTag::CustomEmoji(id) => format!("<tg-emoji emoji-id=\"{}\">", escape_attr(id)),
        }
    }

    fn close(&self) -> &'static str {
        match self {
            EntityTag::Bold => "</b>",
            EntityTag::Italic => "</i>",
            EntityTag::Underline => "</u>",
            EntityTag::Strikethrough => "</s>",
            EntityTag::Spoiler => "</tg-spoiler>",
            EntityTag::Code => "</code>",
            EntityTag::Pre(None) => "</pre>",
            EntityTag::Pre(Some(_)) => "</code></pre>",
            EntityTag::Link(_) => "</a>",
            EntityTag::CustomEmoji(_) => "</tg-emoji>",
        }
    }
}

/// Offsets and lengths are in UTF-16 code units, as Telegram reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub offset: usize,
    pub length: usize,
    pub tag: EntityTag,
}

pub fn render_entities(text: &str, entities: &[Entity]) -> String {
    let mut sorted: Vec<&Entity> = entities.iter().filter(|e| e.length > 0).collect();
    sorted.sort_by(|a, b| a.offset.cmp(&b.offset).then(b.length.cmp(&a.length)));

    let mut out = String::with_capacity(text.len() + sorted.len() * 16);
    let mut open: Vec<(usize, &Entity)> = Vec::new();
    let mut next = 0;
    let mut pos = 0;

    for ch in text.chars() {
        close_ended(&mut open, pos, &mut out);
        while next < sorted.len() && sorted[next].offset <= pos {
            let entity = sorted[next];
            out.push_str(&entity.tag.open());
            open.push((entity.offset + entity.length, entity));
            next += 1;
        }
        push_escaped(&mut out, ch);
        pos += ch.len_utf16();
    }
    close_ended(&mut open, usize::MAX, &mut out);
    out
}

/// Close every open entity ending at or before `pos`. Entities opened after it
/// are closed too and reopened, so overlapping spans still nest correctly.
fn close_ended<'a>(open: &mut Vec<(usize, &'a Entity)>, pos: usize, out: &mut String) {
    let Some(idx) = open.iter().position(|(end, _)| *end <= pos) else {
        return;
    };
    let unwound: Vec<(usize, &'a Entity)> = open.drain(idx..).collect();
    for (_, entity) in unwound.iter().rev() {
        out.push_str(entity.tag.close());
    }
    for (end, entity) in unwound {
        if end > pos {
            out.push_str(&entity.tag.open());
            open.push((end, entity));
        }
    }
}
