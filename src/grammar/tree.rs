//! Parse trees produced by [`Grammar::parse`](super::Grammar::parse).

use std::fmt;

/// A node of a parse tree.
///
/// Rule nodes are tagged with the name of the rule that matched; leaves hold
/// the exact substring a pattern token matched (leading whitespace excluded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNode {
    Rule {
        name: String,
        children: Vec<ParseNode>,
    },
    Leaf(String),
}

impl ParseNode {
    /// Rule name, or `None` for leaves.
    pub fn name(&self) -> Option<&str> {
        match self {
            ParseNode::Rule { name, .. } => Some(name),
            ParseNode::Leaf(_) => None,
        }
    }

    pub fn is_rule(&self, rule: &str) -> bool {
        self.name() == Some(rule)
    }

    /// Child nodes; empty for leaves.
    pub fn children(&self) -> &[ParseNode] {
        match self {
            ParseNode::Rule { children, .. } => children,
            ParseNode::Leaf(_) => &[],
        }
    }

    /// Matched text of a leaf.
    pub fn text(&self) -> Option<&str> {
        match self {
            ParseNode::Leaf(text) => Some(text),
            ParseNode::Rule { .. } => None,
        }
    }

    /// Texts of the direct leaf children, in order.
    pub fn leaf_texts(&self) -> Vec<&str> {
        self.children().iter().filter_map(ParseNode::text).collect()
    }

    /// First direct child tagged with `rule`.
    pub fn child(&self, rule: &str) -> Option<&ParseNode> {
        self.children().iter().find(|c| c.is_rule(rule))
    }

    /// Collect every node tagged with `rule`.
    ///
    /// The search does not descend into a matching node, so nested
    /// occurrences of the same rule are reported once through their
    /// outermost ancestor.
    pub fn extract(&self, rule: &str) -> Vec<&ParseNode> {
        let mut found = Vec::new();
        self.extract_into(rule, &mut found);
        found
    }

    fn extract_into<'a>(&'a self, rule: &str, found: &mut Vec<&'a ParseNode>) {
        if self.is_rule(rule) {
            found.push(self);
            return;
        }
        for child in self.children() {
            child.extract_into(rule, found);
        }
    }

    /// Multi-line rendering of the tree, one node per line.
    pub fn visualize(&self, bullet: &str) -> String {
        let mut buf = String::new();
        self.visualize_into(bullet, "", &mut buf);
        buf
    }

    fn visualize_into(&self, bullet: &str, indent: &str, buf: &mut String) {
        match self {
            ParseNode::Leaf(text) => {
                buf.push_str(&format!("{indent}'{text}',\n"));
            }
            ParseNode::Rule { name, children } => {
                buf.push_str(&format!("{indent}['{name}',\n"));
                let nested = format!("{indent}{bullet}");
                for child in children {
                    child.visualize_into(bullet, &nested, buf);
                }
                buf.push_str(&format!("{indent}],\n"));
            }
        }
    }
}

impl fmt::Display for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseNode::Leaf(text) => write!(f, "{text:?}"),
            ParseNode::Rule { name, children } => {
                write!(f, "[{name}")?;
                for child in children {
                    write!(f, " {child}")?;
                }
                write!(f, "]")
            }
        }
    }
}
