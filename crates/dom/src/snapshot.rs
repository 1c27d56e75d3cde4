//! Deterministic JSON and tree dumps of a document, for tests and debug logs.

use core::fmt;

use crate::NodeKey;
use crate::document::{Document, DomNode, NodeKind};
use indextree::NodeId;
use serde_json::{Map, Value, json};

fn sorted_attrs(node: &DomNode) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = node.attrs.iter().cloned().collect();
    pairs.sort_by(|left, right| left.0.cmp(&right.0));
    pairs
}

fn flush_text(children: &mut Vec<Value>, text_buf: &mut String) {
    if !text_buf.trim().is_empty() {
        children.push(json!({ "type": "text", "text": text_buf.clone() }));
    }
    text_buf.clear();
}

/// Children as JSON, with adjacent text nodes coalesced.
fn coalesce_children(document: &Document, id: NodeId) -> Vec<Value> {
    let mut children: Vec<Value> = Vec::new();
    let mut text_buf = String::new();
    for child in id.children(&document.arena) {
        let Some(child_ref) = document.arena.get(child) else {
            continue;
        };
        if let NodeKind::Text { text } = &child_ref.get().kind {
            text_buf.push_str(text);
            continue;
        }
        flush_text(&mut children, &mut text_buf);
        let value = node_to_json(document, child);
        if !value.is_null() {
            children.push(value);
        }
    }
    flush_text(&mut children, &mut text_buf);
    children
}

fn node_to_json(document: &Document, id: NodeId) -> Value {
    let Some(node_ref) = document.arena.get(id) else {
        return Value::Null;
    };
    let node = node_ref.get();
    match &node.kind {
        NodeKind::Document => {
            json!({ "type": "document", "children": coalesce_children(document, id) })
        }
        NodeKind::Element { tag } => {
            let mut attrs_obj = Map::new();
            for (key, value) in sorted_attrs(node) {
                attrs_obj.insert(key, Value::String(value));
            }
            json!({
                "type": "element",
                "tag": tag,
                "attrs": Value::Object(attrs_obj),
                "children": coalesce_children(document, id),
            })
        }
        NodeKind::Text { text } => {
            if text.trim().is_empty() {
                Value::Null
            } else {
                json!({ "type": "text", "text": text })
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(character),
        }
    }
    out
}

fn write_indent(formatter: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        formatter.write_str("  ")?;
    }
    Ok(())
}

fn fmt_node(
    document: &Document,
    id: NodeId,
    formatter: &mut fmt::Formatter<'_>,
    depth: usize,
) -> fmt::Result {
    let Some(node_ref) = document.arena.get(id) else {
        return Ok(());
    };
    let node = node_ref.get();
    let child_depth = depth.saturating_add(1);
    match &node.kind {
        NodeKind::Document => {
            write_indent(formatter, depth)?;
            writeln!(formatter, "#document")?;
            for child in id.children(&document.arena) {
                fmt_node(document, child, formatter, child_depth)?;
            }
        }
        NodeKind::Element { tag } => {
            write_indent(formatter, depth)?;
            write!(formatter, "<{tag}")?;
            for (key, value) in sorted_attrs(node) {
                write!(formatter, " {key}=\"{}\"", escape_text(&value))?;
            }
            writeln!(formatter, "> {}", node.key)?;
            for child in id.children(&document.arena) {
                fmt_node(document, child, formatter, child_depth)?;
            }
            write_indent(formatter, depth)?;
            writeln!(formatter, "</{tag}>")?;
        }
        NodeKind::Text { text } => {
            // Skip pure-whitespace text nodes for cleaner output
            if text.chars().all(char::is_whitespace) {
                return Ok(());
            }
            write_indent(formatter, depth)?;
            writeln!(formatter, "\"{}\"", escape_text(text))?;
        }
    }
    Ok(())
}

impl fmt::Debug for Document {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "Document")?;
        fmt_node(self, self.root, formatter, 0)
    }
}

impl Document {
    /// Build a deterministic JSON representation of the subtree at `node`.
    /// Schema:
    /// - Document: { "type":"document", "children":[ ... ] }
    /// - Element: { "type":"element", "tag": "div", "attrs": {..}, "children":[ ... ] }
    /// - Text: { "type":"text", "text":"..." }
    pub fn to_json_value(&self, node: NodeKey) -> Value {
        self.node_id(node)
            .map_or(Value::Null, |id| node_to_json(self, id))
    }

    /// Pretty JSON of the whole document for snapshots and test comparisons.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_value(NodeKey::ROOT))
            .unwrap_or_else(|_| String::from("{}"))
    }
}
