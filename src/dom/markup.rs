//! Markup loading and rendering
//!
//! An XML subset is enough for fixture pages and inline icon assets.
//! Every attribute needs a value (`hidden=""`), text is trimmed.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use super::{Document, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("markup syntax error at byte {position}: {reason}")]
    Syntax { position: usize, reason: String },

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("text outside of the root element")]
    TextOutsideRoot,

    #[error("markup has more than one root element")]
    MultipleRoots,

    #[error("markup contains no element")]
    Empty,
}

/// Parsed element, not yet attached to any tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupNode {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<MarkupNode>,
}

pub fn parse(source: &str) -> Result<MarkupNode, MarkupError> {
    let mut reader = Reader::from_str(source);
    reader.trim_text(true);

    let mut stack: Vec<MarkupNode> = Vec::new();
    let mut root: Option<MarkupNode> = None;

    loop {
        let position = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(element(e, position)?),
            Ok(Event::Empty(ref e)) => {
                let node = element(e, position)?;
                close(&mut stack, &mut root, node)?;
            }
            Ok(Event::End(_)) => {
                let node = stack.pop().ok_or_else(|| MarkupError::Syntax {
                    position,
                    reason: "unexpected closing tag".to_string(),
                })?;
                close(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| MarkupError::Syntax {
                    position,
                    reason: e.to_string(),
                })?;
                match stack.last_mut() {
                    Some(node) => node.text.push_str(&text),
                    None => return Err(MarkupError::TextOutsideRoot),
                }
            }
            Ok(Event::CData(c)) => match stack.last_mut() {
                Some(node) => node.text.push_str(&String::from_utf8_lossy(&c.into_inner())),
                None => return Err(MarkupError::TextOutsideRoot),
            },
            Ok(Event::Eof) => break,
            // Comments, declarations, processing instructions, doctype
            Ok(_) => {}
            Err(e) => {
                return Err(MarkupError::Syntax {
                    position: reader.buffer_position(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(MarkupError::Unclosed(open.tag.clone()));
    }
    root.ok_or(MarkupError::Empty)
}

fn element(e: &BytesStart<'_>, position: usize) -> Result<MarkupNode, MarkupError> {
    let mut node = MarkupNode {
        tag: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        ..MarkupNode::default()
    };
    for attr in e.attributes() {
        let attr = attr.map_err(|err| MarkupError::Syntax {
            position,
            reason: format!("attribute error: {err}"),
        })?;
        let value = attr.unescape_value().map_err(|err| MarkupError::Syntax {
            position,
            reason: err.to_string(),
        })?;
        node.attributes.push((
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value.into_owned(),
        ));
    }
    Ok(node)
}

fn close(
    stack: &mut [MarkupNode],
    root: &mut Option<MarkupNode>,
    node: MarkupNode,
) -> Result<(), MarkupError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(MarkupError::MultipleRoots),
    }
    Ok(())
}

/// Build a detached subtree in `tree` from parsed markup
pub fn instantiate<D: Document + ?Sized>(tree: &mut D, node: &MarkupNode) -> NodeId {
    let id = tree.create_element(&node.tag);
    for (name, value) in &node.attributes {
        tree.set_attribute(id, name, value);
    }
    if !node.text.is_empty() {
        tree.set_own_text(id, &node.text);
    }
    for child in &node.children {
        let child_id = instantiate(tree, child);
        tree.insert_before(id, child_id, None);
    }
    id
}

/// Render a subtree back to indented markup
pub fn render<D: Document + ?Sized>(tree: &D, node: NodeId) -> String {
    let mut out = String::new();
    render_into(tree, node, 0, &mut out);
    out
}

fn render_into<D: Document + ?Sized>(tree: &D, node: NodeId, depth: usize, out: &mut String) {
    let Some(tag) = tree.tag(node) else {
        return;
    };
    let indent = "  ".repeat(depth);
    out.push_str(&indent);
    out.push('<');
    out.push_str(tag);
    for (name, value) in tree.attributes(node) {
        out.push_str(&format!(" {name}=\"{}\"", escape(value.as_str())));
    }

    let text = tree.own_text(node);
    let children = tree.children(node);
    if children.is_empty() && text.is_empty() {
        out.push_str("/>\n");
        return;
    }
    out.push('>');
    out.push_str(&escape(text.as_str()));
    if children.is_empty() {
        out.push_str(&format!("</{tag}>\n"));
        return;
    }
    out.push('\n');
    for child in children {
        render_into(tree, child, depth + 1, out);
    }
    out.push_str(&format!("{indent}</{tag}>\n"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryTree, Selector};

    #[test]
    fn test_parse_nested() {
        let node = parse(r#"<div id="a"><span class="x">Hi &amp; bye</span><br/></div>"#).unwrap();
        assert_eq!(node.tag, "div");
        assert_eq!(node.attributes, vec![("id".to_string(), "a".to_string())]);
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].text, "Hi & bye");
        assert_eq!(node.children[1].tag, "br");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse(""), Err(MarkupError::Empty));
        assert_eq!(parse("<a><b></b>"), Err(MarkupError::Unclosed("a".to_string())));
        assert_eq!(parse("<a/><b/>"), Err(MarkupError::MultipleRoots));
        assert!(matches!(parse("<a></b>"), Err(MarkupError::Syntax { .. })));
        assert!(matches!(parse("<svg viewBox=0 0 24 24></svg>"), Err(MarkupError::Syntax { .. })));
    }

    #[test]
    fn test_comments_are_ignored() {
        let node = parse("<!-- icon --><svg><path d=\"M0 0\"/></svg>").unwrap();
        assert_eq!(node.tag, "svg");
        assert_eq!(node.children[0].attributes[0].1, "M0 0");
    }

    #[test]
    fn test_render_roundtrip_structure() {
        let source = r#"<header id="masthead"><a id="logo" title="a&quot;b">Home</a><div id="end"/></header>"#;
        let tree = MemoryTree::from_markup(source).unwrap();
        let rendered = render(&tree, tree.root());
        assert!(rendered.starts_with("<header id=\"masthead\">\n"));
        assert!(rendered.contains("  <a id=\"logo\" title=\"a&quot;b\">Home</a>\n"));
        assert!(rendered.contains("  <div id=\"end\"/>\n"));

        let reparsed = MemoryTree::from_markup(&rendered).unwrap();
        let logo = reparsed.query(&Selector::id("logo")).unwrap();
        assert_eq!(reparsed.attribute(logo, "title"), Some("a\"b"));
    }
}
