//! Simple selectors
//!
//! Supports comma-separated lists of complex selectors. A compound is an
//! optional tag (or `*`) followed by any number of `#id`, `.class`, `[attr]`
//! and `[attr=value]` parts; compounds are joined by the descendant
//! (whitespace) and child (`>`) combinators.

use crate::{ElementData, NodeId};

/// Selector parse error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Unexpected character '{ch}' at offset {offset} in selector: {selector}")]
    Unexpected {
        ch: char,
        offset: usize,
        selector: String,
    },

    #[error("Unterminated attribute selector: {0}")]
    UnterminatedAttribute(String),

    #[error("Dangling combinator in selector: {0}")]
    DanglingCombinator(String),
}

/// Tree access needed to match combinators
pub trait SelectorContext {
    fn element(&self, node: NodeId) -> Option<&ElementData>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
}

/// Parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// Compounds stored right to left: `subject`, then each combinator with the
/// compound on its left
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    subject: Compound,
    ancestors: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

impl Selector {
    /// Parse a selector list
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut alternatives = Vec::new();
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(SelectorError::Empty);
            }
            alternatives.push(Complex::parse(part)?);
        }
        Ok(Self { alternatives })
    }

    /// Check whether `node` matches any alternative. Ancestor compounds may
    /// match anywhere above `node`.
    pub fn matches<C: SelectorContext + ?Sized>(&self, context: &C, node: NodeId) -> bool {
        self.alternatives.iter().any(|c| c.matches(context, node))
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

struct Scanner<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn unexpected(&self, offset: usize) -> SelectorError {
        SelectorError::Unexpected {
            ch: self.chars[offset],
            offset,
            selector: self.input.to_string(),
        }
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let start = self.pos;
        let mut compound = Compound::default();

        match self.peek() {
            Some('*') => self.pos += 1,
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.read_ident().to_ascii_lowercase());
            }
            _ => {}
        }

        while let Some(c) = self.peek() {
            match c {
                '#' | '.' => {
                    let at = self.pos;
                    self.pos += 1;
                    let name = self.read_ident();
                    if name.is_empty() {
                        return Err(self.unexpected(at));
                    }
                    if c == '#' {
                        compound.id = Some(name);
                    } else {
                        compound.classes.push(name);
                    }
                }
                '[' => {
                    let at = self.pos;
                    let close = self.chars[at..]
                        .iter()
                        .position(|&c| c == ']')
                        .map(|p| p + at)
                        .ok_or_else(|| SelectorError::UnterminatedAttribute(self.input.to_string()))?;
                    let body: String = self.chars[at + 1..close].iter().collect();
                    let attr = match body.split_once('=') {
                        Some((name, value)) => AttrMatch {
                            name: name.trim().to_string(),
                            value: Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string()),
                        },
                        None => AttrMatch {
                            name: body.trim().to_string(),
                            value: None,
                        },
                    };
                    if attr.name.is_empty() {
                        return Err(self.unexpected(at));
                    }
                    compound.attrs.push(attr);
                    self.pos = close + 1;
                }
                c if c.is_whitespace() || c == '>' => break,
                _ => return Err(self.unexpected(self.pos)),
            }
        }

        if self.pos == start {
            if self.at_end() {
                return Err(SelectorError::DanglingCombinator(self.input.to_string()));
            }
            return Err(self.unexpected(self.pos));
        }
        Ok(compound)
    }
}

impl Complex {
    fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut scanner = Scanner::new(input);
        let mut subject = scanner.compound()?;
        // left to right while parsing
        let mut chain: Vec<(Combinator, Compound)> = Vec::new();

        while !scanner.at_end() {
            let spaced = scanner.skip_whitespace();
            let combinator = if scanner.peek() == Some('>') {
                scanner.pos += 1;
                scanner.skip_whitespace();
                Combinator::Child
            } else if spaced {
                Combinator::Descendant
            } else {
                return Err(scanner.unexpected(scanner.pos));
            };
            let next = scanner.compound()?;
            chain.push((combinator, std::mem::replace(&mut subject, next)));
        }

        chain.reverse();
        Ok(Self {
            subject,
            ancestors: chain,
        })
    }

    fn matches<C: SelectorContext + ?Sized>(&self, context: &C, node: NodeId) -> bool {
        context.element(node).is_some_and(|e| self.subject.matches(e)) && self.ancestors_match(context, node, 0)
    }

    fn ancestors_match<C: SelectorContext + ?Sized>(&self, context: &C, node: NodeId, index: usize) -> bool {
        let Some((combinator, compound)) = self.ancestors.get(index) else {
            return true;
        };
        let mut current = context.parent(node);
        while let Some(parent) = current {
            let hit = context.element(parent).is_some_and(|e| compound.matches(e))
                && self.ancestors_match(context, parent, index + 1);
            if hit {
                return true;
            }
            if *combinator == Combinator::Child {
                return false;
            }
            current = context.parent(parent);
        }
        false
    }
}

impl Compound {
    fn matches(&self, element: &ElementData) -> bool {
        if let Some(tag) = &self.tag {
            if *tag != element.tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self
            .classes
            .iter()
            .all(|class| element.classes().any(|c| c == class))
        {
            return false;
        }
        self.attrs.iter().all(|a| match (&a.value, element.get_attr(&a.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    /// body > ul.list > li.item[data-id=3] > span
    fn list() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let ul = doc.append_element(body, "ul");
        doc.set_attribute(ul, "class", "list");
        let li = doc.append_element(ul, "li");
        doc.set_attribute(li, "class", "item done");
        doc.set_attribute(li, "data-id", "3");
        let span = doc.append_element(li, "span");
        (doc, ul, li, span)
    }

    #[test]
    fn test_compound_match() {
        let (doc, ul, li, _) = list();
        let sel = Selector::parse("li.item[data-id]").unwrap();
        assert!(sel.matches(&doc, li));
        assert!(!sel.matches(&doc, ul));
        assert!(!Selector::parse("li.item.missing").unwrap().matches(&doc, li));
    }

    #[test]
    fn test_id_and_attr_value() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.append_element(body, "script");
        doc.set_attribute(a, "id", "tpl");
        let b = doc.append_element(body, "script");
        doc.set_attribute(b, "type", "text/template");
        let c = doc.append_element(body, "script");
        doc.set_attribute(c, "type", "module");

        let sel = Selector::parse("#tpl, [type=\"text/template\"]").unwrap();
        assert!(sel.matches(&doc, a));
        assert!(sel.matches(&doc, b));
        assert!(!sel.matches(&doc, c));
    }

    #[test]
    fn test_universal() {
        let (doc, _, _, span) = list();
        assert!(Selector::parse("*").unwrap().matches(&doc, span));
    }

    #[test]
    fn test_descendant_combinator() {
        let (doc, _, li, span) = list();
        assert!(Selector::parse("ul li").unwrap().matches(&doc, li));
        assert!(Selector::parse("ul span").unwrap().matches(&doc, span));
        assert!(Selector::parse("body  .list   li span").unwrap().matches(&doc, span));
        assert!(!Selector::parse("ol li").unwrap().matches(&doc, li));
        assert!(!Selector::parse("li ul").unwrap().matches(&doc, li));
    }

    #[test]
    fn test_child_combinator() {
        let (doc, _, li, span) = list();
        assert!(Selector::parse("ul > li").unwrap().matches(&doc, li));
        assert!(Selector::parse("ul>li>span").unwrap().matches(&doc, span));
        assert!(!Selector::parse("ul > span").unwrap().matches(&doc, span));
        assert!(Selector::parse("body ul > li span").unwrap().matches(&doc, span));
    }

    #[test]
    fn test_errors() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert_eq!(Selector::parse("a, "), Err(SelectorError::Empty));
        assert!(matches!(Selector::parse("a >"), Err(SelectorError::DanglingCombinator(_))));
        assert!(matches!(Selector::parse("> a"), Err(SelectorError::Unexpected { ch: '>', .. })));
        assert!(matches!(Selector::parse("a ~ b"), Err(SelectorError::Unexpected { ch: '~', .. })));
        assert!(matches!(
            Selector::parse("[open"),
            Err(SelectorError::UnterminatedAttribute(_))
        ));
    }
}
