//! Structural pattern matching over annotated token sequences.
//!
//! Patterns describe tokens by text, part-of-speech and stem regexes, and
//! group them into captures and labelled chunk phrases. They compile to an
//! automaton that is scanned over a token slice much like a regex matcher
//! scans a string.
//!
//! # Example
//!
//! ```rust
//! use synpat::{Token, compile};
//!
//! let tokens = vec![
//!     Token::new("The").with_pos("DT").with_stem("the").in_chunk("NP", true, false),
//!     Token::new("gene").with_pos("NN").with_stem("gene").in_chunk("NP", false, true),
//!     Token::new("binds").with_pos("VBZ").with_stem("bind").in_chunk("VP", true, true),
//! ];
//!
//! let pattern = compile("( [ NP DT_* ? NN_* ] ) VB.?_bind").unwrap();
//! let mut matcher = pattern.matcher(&tokens);
//!
//! assert!(matcher.find());
//! assert_eq!(matcher.span(0).unwrap(), Some(0..3));
//! assert_eq!(matcher.span(1).unwrap(), Some(0..2));
//! ```

pub mod annotate;
pub mod fsm;
pub mod syntax;
pub mod token;

pub use annotate::{Annotation, Label, ResourceConfig, ResourceError, RuleSet};
pub use fsm::{Match, MatchError, Matcher, Pattern, Transition};
pub use syntax::{
    CompileError, ErrorKind, Grammar, TokenPattern, TokenTransition, compile, compile_with,
};
pub use token::{Annotated, ReadError, Token, parse_sentence};
