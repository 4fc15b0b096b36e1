//! Token predicates produced by the pattern compiler.

use std::fmt;

use regex::Regex;

use super::error::ErrorKind;
use super::field::FieldSpec;
use crate::fsm::Transition;
use crate::token::Annotated;

/// A regular expression that must match an attribute value in full.
#[derive(Debug, Clone)]
pub struct FieldRegex {
    source: String,
    regex: Regex,
}

impl FieldRegex {
    pub fn new(source: &str) -> Result<Self, ErrorKind> {
        let regex = Regex::new(&format!("^(?:{source})$"))
            .map_err(|err| ErrorKind::InvalidRegex(err.to_string()))?;
        Ok(FieldRegex {
            source: source.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for FieldRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Constraints of an attributed transition; `None` and `false` leave the
/// attribute unconstrained.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Constraints {
    pub text: Option<FieldRegex>,
    pub pos: Option<FieldRegex>,
    pub stem: Option<FieldRegex>,
    pub chunk: Option<FieldRegex>,
    pub chunk_begin: bool,
    pub chunk_end: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenTransition {
    /// Matches every token.
    Wildcard,
    /// Matches tokens satisfying all constraints.
    Attributed(Constraints),
}

impl TokenTransition {
    /// Combine a field spec with phrase constraints, collapsing to
    /// [`TokenTransition::Wildcard`] when nothing is constrained.
    pub fn new(
        spec: FieldSpec,
        chunk: Option<FieldRegex>,
        chunk_begin: bool,
        chunk_end: bool,
    ) -> Self {
        let FieldSpec { text, pos, stem } = spec;
        if text.is_none()
            && pos.is_none()
            && stem.is_none()
            && chunk.is_none()
            && !chunk_begin
            && !chunk_end
        {
            return TokenTransition::Wildcard;
        }
        TokenTransition::Attributed(Constraints {
            text,
            pos,
            stem,
            chunk,
            chunk_begin,
            chunk_end,
        })
    }
}

fn holds(constraint: &Option<FieldRegex>, value: Option<&str>) -> bool {
    match constraint {
        None => true,
        Some(regex) => value.is_some_and(|v| regex.is_match(v)),
    }
}

impl<E: Annotated + ?Sized> Transition<E> for TokenTransition {
    fn matches(&self, token: &E) -> bool {
        let c = match self {
            TokenTransition::Wildcard => return true,
            TokenTransition::Attributed(c) => c,
        };
        (!c.chunk_begin || token.chunk_begin())
            && (!c.chunk_end || token.chunk_end())
            && holds(&c.chunk, token.chunk())
            && holds(&c.pos, token.pos())
            && holds(&c.stem, token.stem())
            && holds(&c.text, Some(token.text()))
    }
}

impl fmt::Display for TokenTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            TokenTransition::Wildcard => return write!(f, "."),
            TokenTransition::Attributed(c) => c,
        };
        let show = |r: &Option<FieldRegex>| r.as_ref().map_or("*", |r| r.as_str()).to_string();
        if c.chunk_begin {
            write!(f, "[{}:", show(&c.chunk))?;
        }
        if c.text.is_none() && c.pos.is_none() && c.stem.is_none() {
            write!(f, ".")?;
        } else {
            write!(f, "{}_{}_{}", show(&c.text), show(&c.pos), show(&c.stem))?;
        }
        if c.chunk_end {
            write!(f, "]")?;
        }
        Ok(())
    }
}
