//! Minimal structural selectors
//!
//! Supported grammar: compound selectors made of an optional tag, `#id`,
//! `.class` and `[attr]` / `[attr="value"]` parts, joined by descendant
//! (whitespace) or child (`>`) combinators. That covers every lookup the
//! locator table and the primitives need.

use std::fmt;

use thiserror::Error;

use super::{Document, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid selector '{selector}': {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches<D: Document + ?Sized>(&self, tree: &D, node: NodeId) -> bool {
        if let Some(tag) = &self.tag
            && tree.tag(node) != Some(tag.as_str())
        {
            return false;
        }
        if let Some(id) = &self.id
            && tree.attribute(node, "id") != Some(id.as_str())
        {
            return false;
        }
        if !self.classes.iter().all(|c| tree.has_class(node, c)) {
            return false;
        }
        self.attrs.iter().all(|a| match (&a.value, tree.attribute(node, &a.name)) {
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
            (_, None) => false,
        })
    }
}

/// A parsed selector. `Display` yields the original source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    // Left to right; the combinator relates a compound to the one before it
    parts: Vec<(Combinator, Compound)>,
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let fail = |reason: &str| SelectorError {
            selector: source.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = Vec::new();
        let mut pending = Combinator::Descendant;
        let mut current = Compound::default();
        let mut chars = source.trim().chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                ' ' | '\t' | '\n' => {
                    if !current.is_empty() {
                        parts.push((pending, std::mem::take(&mut current)));
                        pending = Combinator::Descendant;
                    }
                }
                '>' => {
                    if !current.is_empty() {
                        parts.push((pending, std::mem::take(&mut current)));
                    }
                    if parts.is_empty() {
                        return Err(fail("child combinator without a left-hand side"));
                    }
                    pending = Combinator::Child;
                }
                '#' => {
                    let ident = read_ident(&mut chars);
                    if ident.is_empty() {
                        return Err(fail("empty id"));
                    }
                    current.id = Some(ident);
                }
                '.' => {
                    let ident = read_ident(&mut chars);
                    if ident.is_empty() {
                        return Err(fail("empty class"));
                    }
                    current.classes.push(ident);
                }
                '[' => {
                    let name = read_ident(&mut chars);
                    if name.is_empty() {
                        return Err(fail("empty attribute name"));
                    }
                    let value = match chars.next() {
                        Some(']') => None,
                        Some('=') => {
                            let value = read_attr_value(&mut chars).ok_or_else(|| fail("unterminated attribute value"))?;
                            if chars.next() != Some(']') {
                                return Err(fail("expected ']' after attribute value"));
                            }
                            Some(value)
                        }
                        _ => return Err(fail("malformed attribute selector")),
                    };
                    current.attrs.push(AttrMatch { name, value });
                }
                c if is_ident_char(c) => {
                    if current.tag.is_some() || !current.is_empty() {
                        return Err(fail("tag name must start a compound selector"));
                    }
                    let mut tag = String::from(c);
                    tag.push_str(&read_ident(&mut chars));
                    current.tag = Some(tag);
                }
                other => return Err(fail(&format!("unexpected character '{other}'"))),
            }
        }

        if !current.is_empty() {
            parts.push((pending, current));
        } else if pending == Combinator::Child {
            return Err(fail("dangling child combinator"));
        }
        if parts.is_empty() {
            return Err(fail("empty selector"));
        }

        Ok(Self {
            source: source.trim().to_string(),
            parts,
        })
    }

    /// Selector matching a single attribute value
    pub fn attribute(name: &str, value: &str) -> Self {
        Self {
            source: format!("[{name}=\"{value}\"]"),
            parts: vec![(
                Combinator::Descendant,
                Compound {
                    attrs: vec![AttrMatch {
                        name: name.to_string(),
                        value: Some(value.to_string()),
                    }],
                    ..Compound::default()
                },
            )],
        }
    }

    /// Selector matching an element id
    pub fn id(id: &str) -> Self {
        Self {
            source: format!("#{id}"),
            parts: vec![(
                Combinator::Descendant,
                Compound {
                    id: Some(id.to_string()),
                    ..Compound::default()
                },
            )],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches<D: Document + ?Sized>(&self, tree: &D, node: NodeId) -> bool {
        self.matches_at(tree, node, self.parts.len() - 1)
    }

    fn matches_at<D: Document + ?Sized>(&self, tree: &D, node: NodeId, index: usize) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound.matches(tree, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => tree
                .parent(node)
                .is_some_and(|parent| self.matches_at(tree, parent, index - 1)),
            Combinator::Descendant => {
                let mut ancestor = tree.parent(node);
                while let Some(a) = ancestor {
                    if self.matches_at(tree, a, index - 1) {
                        return true;
                    }
                    ancestor = tree.parent(a);
                }
                false
            }
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

fn read_attr_value(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    match chars.peek().copied() {
        Some(quote @ ('"' | '\'')) => {
            chars.next();
            let mut value = String::new();
            for c in chars.by_ref() {
                if c == quote {
                    return Some(value);
                }
                value.push(c);
            }
            None
        }
        Some(_) => Some(read_ident(chars)),
        None => None,
    }
}

/// Depth-first, document-order walk below `scope` (scope itself included)
fn walk<D: Document + ?Sized>(tree: &D, scope: NodeId, visit: &mut dyn FnMut(NodeId) -> bool) -> bool {
    if visit(scope) {
        return true;
    }
    for child in tree.children(scope) {
        if walk(tree, child, visit) {
            return true;
        }
    }
    false
}

pub fn query_first<D: Document + ?Sized>(tree: &D, scope: NodeId, selector: &Selector) -> Option<NodeId> {
    let mut found = None;
    walk(tree, scope, &mut |node| {
        if selector.matches(tree, node) {
            found = Some(node);
            true
        } else {
            false
        }
    });
    found
}

pub fn query_all<D: Document + ?Sized>(tree: &D, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
    let mut found = Vec::new();
    walk(tree, scope, &mut |node| {
        if selector.matches(tree, node) {
            found.push(node);
        }
        false
    });
    found
}
