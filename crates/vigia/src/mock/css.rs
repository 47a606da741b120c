//! CSS selector subset for the in-memory DOM.
//!
//! Supported: type, universal, `#id`, `.class`, attribute selectors
//! (`[a]`, `[a=v]`, `[a~=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`), descendant and
//! child combinators, and comma-separated lists. Pseudo-classes are rejected.

use super::dom::MockNode;
use crate::result::{HarnessError, HarnessResult};

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    // Rightmost compound last; each carries the combinator to its left.
    parts: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    None,
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Word(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

impl Selector {
    /// Parse a selector list
    pub fn parse(input: &str) -> HarnessResult<Self> {
        let alternatives = split_top_level(input, ',')
            .into_iter()
            .map(|alt| parse_complex(alt.trim(), input))
            .collect::<HarnessResult<Vec<_>>>()?;
        Ok(Self { alternatives })
    }

    /// Match `node` whose ancestors (outermost first, same tree only) are given
    #[must_use]
    pub fn matches(&self, node: &MockNode, ancestors: &[&MockNode]) -> bool {
        self.alternatives
            .iter()
            .any(|c| match_parts(&c.parts, node, ancestors))
    }
}

fn syntax(input: &str, why: &str) -> HarnessError {
    HarnessError::script(format!("SyntaxError: '{input}' is not a valid selector: {why}"))
}

fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn parse_complex(text: &str, input: &str) -> HarnessResult<Complex> {
    if text.is_empty() {
        return Err(syntax(input, "empty selector"));
    }
    let mut parts = Vec::new();
    let mut pending = Combinator::None;
    let mut current = String::new();

    let flush = |current: &mut String,
                 pending: &mut Combinator,
                 parts: &mut Vec<(Combinator, Compound)>|
     -> HarnessResult<()> {
        if current.is_empty() {
            return Ok(());
        }
        let compound = parse_compound(current, input)?;
        parts.push((*pending, compound));
        *pending = Combinator::Descendant;
        current.clear();
        Ok(())
    };

    let mut in_brackets = false;
    for c in text.chars() {
        if in_brackets {
            current.push(c);
            if c == ']' {
                in_brackets = false;
            }
            continue;
        }
        match c {
            '[' => {
                in_brackets = true;
                current.push(c);
            }
            '>' => {
                flush(&mut current, &mut pending, &mut parts)?;
                if parts.is_empty() {
                    return Err(syntax(input, "leading combinator"));
                }
                pending = Combinator::Child;
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    flush(&mut current, &mut pending, &mut parts)?;
                }
            }
            _ => current.push(c),
        }
    }
    if in_brackets {
        return Err(syntax(input, "unclosed attribute selector"));
    }
    let trailing_child = pending == Combinator::Child && current.is_empty();
    flush(&mut current, &mut pending, &mut parts)?;
    if trailing_child || parts.is_empty() {
        return Err(syntax(input, "dangling combinator"));
    }
    Ok(Complex { parts })
}

fn parse_compound(text: &str, input: &str) -> HarnessResult<Compound> {
    let mut compound = Compound::default();
    let mut rest = text;

    let ident_end = |s: &str| {
        s.find(|c: char| matches!(c, '#' | '.' | '[' | ':'))
            .unwrap_or(s.len())
    };

    if let Some(stripped) = rest.strip_prefix('*') {
        rest = stripped;
    } else if !rest.starts_with(&['#', '.', '[', ':'][..]) {
        let end = ident_end(rest);
        compound.tag = Some(rest[..end].to_ascii_lowercase());
        rest = &rest[end..];
    }

    while let Some(c) = rest.chars().next() {
        match c {
            '#' => {
                let end = ident_end(&rest[1..]) + 1;
                compound.id = Some(rest[1..end].to_string());
                rest = &rest[end..];
            }
            '.' => {
                let end = ident_end(&rest[1..]) + 1;
                compound.classes.push(rest[1..end].to_string());
                rest = &rest[end..];
            }
            '[' => {
                let close = rest
                    .find(']')
                    .ok_or_else(|| syntax(input, "unclosed attribute selector"))?;
                compound.attrs.push(parse_attr(&rest[1..close], input)?);
                rest = &rest[close + 1..];
            }
            ':' => return Err(syntax(input, "pseudo-classes are not supported")),
            _ => return Err(syntax(input, "unexpected character")),
        }
    }
    Ok(compound)
}

fn parse_attr(body: &str, input: &str) -> HarnessResult<AttrSelector> {
    let Some(eq) = body.find('=') else {
        return Ok(AttrSelector {
            name: body.trim().to_string(),
            op: AttrOp::Exists,
        });
    };
    let (lhs, value) = (&body[..eq], &body[eq + 1..]);
    let value = value
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    let (name, op) = match lhs.chars().last() {
        Some('~') => (&lhs[..lhs.len() - 1], AttrOp::Word(value)),
        Some('^') => (&lhs[..lhs.len() - 1], AttrOp::Prefix(value)),
        Some('$') => (&lhs[..lhs.len() - 1], AttrOp::Suffix(value)),
        Some('*') => (&lhs[..lhs.len() - 1], AttrOp::Contains(value)),
        Some('|') => return Err(syntax(input, "'|=' is not supported")),
        _ => (lhs, AttrOp::Equals(value)),
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(syntax(input, "missing attribute name"));
    }
    Ok(AttrSelector {
        name: name.to_string(),
        op,
    })
}

fn compound_matches(compound: &Compound, node: &MockNode) -> bool {
    if let Some(tag) = &compound.tag {
        if node.tag() != tag {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if node.attr_value("id") != Some(id.as_str()) {
            return false;
        }
    }
    let classes: Vec<&str> = node
        .attr_value("class")
        .map(|c| c.split_whitespace().collect())
        .unwrap_or_default();
    if !compound.classes.iter().all(|c| classes.contains(&c.as_str())) {
        return false;
    }
    compound.attrs.iter().all(|a| {
        let Some(actual) = node.attr_value(&a.name) else {
            return false;
        };
        match &a.op {
            AttrOp::Exists => true,
            AttrOp::Equals(v) => actual == v,
            AttrOp::Word(v) => actual.split_whitespace().any(|w| w == v),
            AttrOp::Prefix(v) => !v.is_empty() && actual.starts_with(v.as_str()),
            AttrOp::Suffix(v) => !v.is_empty() && actual.ends_with(v.as_str()),
            AttrOp::Contains(v) => !v.is_empty() && actual.contains(v.as_str()),
        }
    })
}

fn match_parts(parts: &[(Combinator, Compound)], node: &MockNode, ancestors: &[&MockNode]) -> bool {
    let Some(((combinator, last), rest)) = parts.split_last() else {
        return false;
    };
    if !compound_matches(last, node) {
        return false;
    }
    match combinator {
        Combinator::None => true,
        Combinator::Child => match ancestors.split_last() {
            Some((parent, above)) => match_parts(rest, parent, above),
            None => false,
        },
        Combinator::Descendant => (0..ancestors.len())
            .rev()
            .any(|i| match_parts(rest, ancestors[i], &ancestors[..i])),
    }
}
