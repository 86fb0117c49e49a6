//! Declarative recursive-descent grammars.
//!
//! A grammar is a set of named rules. Each rule is written as alternatives
//! separated by `" | "`; each alternative is a whitespace separated list of
//! symbols, where a symbol is either the name of another rule or a regular
//! expression. Alternatives are tried left to right and the first one whose
//! symbols all match wins, backtracking to the next alternative otherwise.
//!
//! ```
//! use eds::grammar::Grammar;
//!
//! let grammar = Grammar::builder()
//!     .rule("list", "item , list | item")
//!     .rule("item", "[a-z]+")
//!     .build()
//!     .unwrap();
//!
//! let tree = grammar.parse("a, b ,c", "list").unwrap().unwrap();
//! assert_eq!(tree.extract("item").len(), 3);
//! ```
//!
//! Results are memoized per (rule, position) by default, which bounds the
//! work on inputs that would otherwise backtrack combinatorially. The parse
//! result is the same with memoization switched off.

mod tree;

pub use tree::ParseNode;

use std::collections::HashMap;

use regex::Regex;

/// Default whitespace allowed before every pattern token.
pub const DEFAULT_WHITESPACE: &str = r"\s*";

/// Errors raised while building or invoking a grammar.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("invalid pattern '{pattern}' in rule '{rule}': {source}")]
    InvalidPattern {
        rule: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{0}' has an empty alternative")]
    EmptyAlternative(String),

    #[error("unknown rule '{0}'")]
    UnknownRule(String),
}

pub type GrammarResult<T> = Result<T, GrammarError>;

#[derive(Debug, Clone, Copy)]
enum Symbol {
    Rule(usize),
    Pattern(usize),
}

#[derive(Debug)]
struct Rule {
    name: String,
    alternatives: Vec<Vec<Symbol>>,
}

/// Builder for [`Grammar`].
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until built"]
pub struct GrammarBuilder {
    whitespace: String,
    rules: Vec<(String, String)>,
    memoize: bool,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self {
            whitespace: DEFAULT_WHITESPACE.into(),
            rules: Vec::new(),
            memoize: true,
        }
    }
}

impl GrammarBuilder {
    /// Pattern skipped before each token. An empty pattern forbids
    /// whitespace between tokens.
    pub fn whitespace(mut self, pattern: &str) -> Self {
        self.whitespace = pattern.into();
        self
    }

    /// Add a rule. A later rule with the same name replaces the earlier one.
    pub fn rule(mut self, name: &str, definition: &str) -> Self {
        self.rules.push((name.into(), definition.into()));
        self
    }

    pub fn memoize(mut self, enabled: bool) -> Self {
        self.memoize = enabled;
        self
    }

    pub fn build(self) -> GrammarResult<Grammar> {
        let mut index = HashMap::new();
        for (i, (name, _)) in self.rules.iter().enumerate() {
            index.insert(name.clone(), i);
        }

        let mut patterns = Vec::new();
        let mut pattern_ids: HashMap<String, usize> = HashMap::new();
        let mut rules = Vec::with_capacity(self.rules.len());

        for (name, definition) in &self.rules {
            let mut alternatives = Vec::new();
            for alt in definition.split(" | ") {
                let mut symbols = Vec::new();
                for token in alt.split_whitespace() {
                    if let Some(&rule) = index.get(token) {
                        symbols.push(Symbol::Rule(rule));
                        continue;
                    }
                    let id = match pattern_ids.get(token) {
                        Some(&id) => id,
                        None => {
                            let regex = Regex::new(&format!("^(?:{})({})", self.whitespace, token))
                                .map_err(|source| GrammarError::InvalidPattern {
                                    rule: name.clone(),
                                    pattern: token.to_string(),
                                    source,
                                })?;
                            patterns.push(regex);
                            pattern_ids.insert(token.to_string(), patterns.len() - 1);
                            patterns.len() - 1
                        }
                    };
                    symbols.push(Symbol::Pattern(id));
                }
                if symbols.is_empty() {
                    return Err(GrammarError::EmptyAlternative(name.clone()));
                }
                alternatives.push(symbols);
            }
            rules.push(Rule {
                name: name.clone(),
                alternatives,
            });
        }

        let trailing = Regex::new(&format!("^(?:{})$", self.whitespace)).map_err(|source| {
            GrammarError::InvalidPattern {
                rule: "whitespace".into(),
                pattern: self.whitespace.clone(),
                source,
            }
        })?;

        Ok(Grammar {
            rules,
            index,
            patterns,
            trailing,
            memoize: self.memoize,
        })
    }
}

/// A compiled grammar. Immutable and shareable; every parse keeps its own
/// memo table.
#[derive(Debug)]
pub struct Grammar {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
    patterns: Vec<Regex>,
    trailing: Regex,
    memoize: bool,
}

impl Grammar {
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::default()
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Parse `text` starting from `rule`.
    ///
    /// Returns `Ok(None)` unless the whole text (apart from trailing
    /// whitespace) is consumed.
    pub fn parse(&self, text: &str, rule: &str) -> GrammarResult<Option<ParseNode>> {
        let start = *self
            .index
            .get(rule)
            .ok_or_else(|| GrammarError::UnknownRule(rule.to_string()))?;

        let mut parser = Parser {
            grammar: self,
            text,
            memo: HashMap::new(),
        };

        Ok(match parser.parse_rule(start, 0) {
            Some((node, end)) if self.trailing.is_match(&text[end..]) => Some(node),
            _ => None,
        })
    }
}

type Match = Option<(ParseNode, usize)>;

struct Parser<'g, 't> {
    grammar: &'g Grammar,
    text: &'t str,
    memo: HashMap<(usize, usize), Match>,
}

impl Parser<'_, '_> {
    fn parse_rule(&mut self, rule: usize, pos: usize) -> Match {
        if !self.grammar.memoize {
            return self.match_alternatives(rule, pos);
        }

        if let Some(hit) = self.memo.get(&(rule, pos)) {
            return hit.clone();
        }
        // seeded as a failure so a left-recursive rule cannot loop forever
        self.memo.insert((rule, pos), None);

        let result = self.match_alternatives(rule, pos);
        self.memo.insert((rule, pos), result.clone());
        result
    }

    fn match_alternatives(&mut self, rule: usize, pos: usize) -> Match {
        let grammar = self.grammar;
        let definition = &grammar.rules[rule];

        'alternatives: for alternative in &definition.alternatives {
            let mut children = Vec::with_capacity(alternative.len());
            let mut cursor = pos;

            for symbol in alternative {
                let matched = match *symbol {
                    Symbol::Rule(r) => self.parse_rule(r, cursor),
                    Symbol::Pattern(p) => self.match_pattern(p, cursor),
                };
                match matched {
                    Some((node, end)) => {
                        children.push(node);
                        cursor = end;
                    }
                    None => continue 'alternatives,
                }
            }

            return Some((
                ParseNode::Rule {
                    name: definition.name.clone(),
                    children,
                },
                cursor,
            ));
        }

        None
    }

    fn match_pattern(&self, pattern: usize, pos: usize) -> Match {
        let caps = self.grammar.patterns[pattern].captures(&self.text[pos..])?;
        let whole = caps.get(0)?;
        let token = caps.get(1)?;
        Some((ParseNode::Leaf(token.as_str().to_string()), pos + whole.end()))
    }
}
