//! A small CSS selector subset used for event delegation.
//!
//! Supported: comma-separated lists of descendant chains built from compound
//! selectors `tag#id.class.class` and the universal `*`.

use std::fmt;

use ctxmenu_core::CtxMenuError;

use crate::document::{Document, ElementId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn matches(&self, document: &Document, element: ElementId) -> bool {
        if let Some(tag) = &self.tag {
            if document.tag(element).as_deref() != Some(tag.as_str()) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if document.id_attr(element).as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|class| document.has_class(element, class))
    }
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    // each alternative is a descendant chain, outermost compound first
    alternatives: Vec<Vec<Compound>>,
}

impl Selector {
    /// Parse a selector list.
    pub fn parse(input: &str) -> Result<Self, CtxMenuError> {
        let mut alternatives = Vec::new();
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(CtxMenuError::selector("Empty selector", input));
            }
            let chain = part
                .split_whitespace()
                .map(|token| parse_compound(token, input))
                .collect::<Result<Vec<_>, _>>()?;
            alternatives.push(chain);
        }
        Ok(Self { source: input.trim().to_string(), alternatives })
    }

    /// The selector text as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `element` matches any alternative.
    pub fn matches(&self, document: &Document, element: ElementId) -> bool {
        self.alternatives.iter().any(|chain| chain_matches(chain, document, element))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = CtxMenuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn chain_matches(chain: &[Compound], document: &Document, element: ElementId) -> bool {
    let Some((last, ancestors)) = chain.split_last() else {
        return false;
    };
    if !last.matches(document, element) {
        return false;
    }
    let mut current = document.parent(element);
    for compound in ancestors.iter().rev() {
        loop {
            let Some(id) = current else {
                return false;
            };
            current = document.parent(id);
            if compound.matches(document, id) {
                break;
            }
        }
    }
    true
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(token: &str, input: &str) -> Result<Compound, CtxMenuError> {
    let mut compound = Compound::default();
    let mut rest = token;

    if let Some(after) = rest.strip_prefix('*') {
        rest = after;
    } else {
        let end = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
        if end > 0 {
            compound.tag = Some(rest[..end].to_ascii_lowercase());
            rest = &rest[end..];
        }
    }

    while let Some(marker) = rest.chars().next() {
        let body = &rest[marker.len_utf8()..];
        let end = body.find(|c: char| !is_ident_char(c)).unwrap_or(body.len());
        let name = &body[..end];
        match marker {
            '#' | '.' if name.is_empty() => {
                return Err(CtxMenuError::selector(
                    format!("Missing name after '{marker}'"),
                    input,
                ));
            }
            '#' => compound.id = Some(name.to_string()),
            '.' => compound.classes.push(name.to_string()),
            other => {
                return Err(CtxMenuError::selector(
                    format!("Unsupported selector syntax '{other}'"),
                    input,
                ));
            }
        }
        rest = &body[end..];
    }

    Ok(compound)
}
