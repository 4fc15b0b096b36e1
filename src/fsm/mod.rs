//! Finite-state automata over sequences of arbitrary elements.
//!
//! A [`Pattern`] is built bottom-up from single-element transitions with the
//! combinators below and then scanned over a slice of elements with a
//! [`Matcher`].
//!
//! | Combinator          | Matches                                         |
//! |---------------------|-------------------------------------------------|
//! | `matching(t)`       | exactly one element accepted by `t`             |
//! | `empty()`           | the empty sequence                              |
//! | `a.chain(b)`        | `a` followed by `b`                             |
//! | `a.branch(b)`       | `a` or `b` (`a` preferred)                      |
//! | `p.optional()`      | zero or one `p` (zero preferred)                |
//! | `p.repeat()`        | one or more `p` (fewest preferred)              |
//! | `p.capture()`       | `p`, recording its span as the next group       |
//!
//! Matching always yields the shortest match starting at the leftmost
//! possible position; when several paths reach the accept state at the same
//! length, the captures of the preferred path are reported.

mod matcher;
mod pattern;

pub use matcher::{Match, MatchError, Matcher, Matches};
pub use pattern::{Pattern, StateId};

/// A predicate over a single element of the scanned sequence.
pub trait Transition<E: ?Sized> {
    fn matches(&self, element: &E) -> bool;
}
