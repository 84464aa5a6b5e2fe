use crate::token::Element;
use std::fmt;

/// Index of a node inside its [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub variable: String,
    pub start: Element,
    pub end: Element,
    pub step: Option<Element>, // None means +1
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    Text(String),
    Echo(Vec<Element>),
    ForLoop(ForLoop),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A parsed template.
///
/// Nodes live in a flat arena in creation order; each parent lists the ids of
/// its children, so the tree has no back references and two parses of the
/// same structure compare equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    /// Appends a new node as the last child of `parent`.
    pub fn push_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Writes a node's own source: text, an echo tag or a FOR opening tag.
    fn write_open(&self, id: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node(id).kind {
            NodeKind::Document => Ok(()),
            NodeKind::Text(text) => write_escaped_text(text, f),
            NodeKind::Echo(elements) => {
                f.write_str("{$=")?;
                for el in elements {
                    write!(f, " {el}")?;
                }
                f.write_str(" $}")
            }
            NodeKind::ForLoop(lp) => {
                write!(f, "{{$ FOR {} {} {}", lp.variable, lp.start, lp.end)?;
                if let Some(step) = &lp.step {
                    write!(f, " {step}")?;
                }
                f.write_str(" $}")
            }
        }
    }
}

fn write_escaped_text(text: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '{' if chars.peek() == Some(&'$') => f.write_str("\\{")?,
            _ => write!(f, "{c}")?,
        }
    }
    Ok(())
}

/// Re-emits the document as template source that parses back to an equal tree.
impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // (node, index of the next child to write); a FOR is closed when popped.
        let mut stack = vec![(self.root(), 0usize)];
        while let Some(top) = stack.last_mut() {
            let (id, next) = *top;
            let node = self.node(id);
            match node.children.get(next) {
                Some(&child) => {
                    top.1 += 1;
                    self.write_open(child, f)?;
                    stack.push((child, 0));
                }
                None => {
                    stack.pop();
                    if let NodeKind::ForLoop(_) = node.kind {
                        f.write_str("{$END$}")?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_keep_insertion_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.push_child(root, NodeKind::Text("a".into()));
        let b = doc.push_child(root, NodeKind::Text("b".into()));
        assert_eq!(doc.node(root).children(), &[a, b]);
        assert_eq!(doc.len(), 3);
        assert!(!doc.is_empty());
    }

    #[test]
    fn serializes_nested_loops_and_escapes() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.push_child(root, NodeKind::Text(r"a\b{$c{".into()));
        let lp = doc.push_child(
            root,
            NodeKind::ForLoop(ForLoop {
                variable: "i".into(),
                start: Element::ConstantInt(1),
                end: Element::Variable("n".into()),
                step: None,
            }),
        );
        doc.push_child(
            lp,
            NodeKind::Echo(vec![Element::Variable("i".into()), Element::String("x\"".into())]),
        );

        assert_eq!(
            doc.to_string(),
            r#"a\\b\{$c{{$ FOR i 1 n $}{$= i "x\"" $}{$END$}"#
        );
    }

    #[test]
    fn empty_echo() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.push_child(root, NodeKind::Echo(Vec::new()));
        assert_eq!(doc.to_string(), "{$= $}");
    }
}
