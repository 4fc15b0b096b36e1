//! Scanning a [`Pattern`] over a slice of elements.
//!
//! The automaton is simulated breadth-first over the input, one element at a
//! time, keeping the live paths in preference order. The first position at
//! which any path reaches the accept state ends the match, so every match is
//! the shortest one from its start.

use std::ops::Range;

use thiserror::Error;

use super::Transition;
use super::pattern::{Edge, Marker, Pattern, StateId};

/// Contract violations reported by [`Matcher`] accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no match available; call find, looking_at or matches first")]
    InvalidState,
    #[error("offset {offset} is out of range for a sequence of length {len}")]
    OutOfRange { offset: usize, len: usize },
    #[error("no group {0}")]
    NoSuchGroup(usize),
}

/// A completed match: the whole span plus the span of each capture group
/// that took part in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    groups: Vec<Option<Range<usize>>>,
}

impl Match {
    /// Span of group `i`; group 0 is the whole match.
    pub fn span(&self, i: usize) -> Option<Range<usize>> {
        if i == 0 {
            Some(self.start..self.end)
        } else {
            self.groups.get(i - 1).cloned().flatten()
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Consume { state: StateId, edge: usize },
    Accept,
}

#[derive(Debug, Clone)]
struct Thread {
    step: Step,
    slots: Vec<Option<usize>>,
}

enum Pending {
    Visit(StateId, Vec<Option<usize>>),
    Emit(Thread),
}

/// Scan state pairing one [`Pattern`] with one sequence.
///
/// Successive calls to [`find`](Matcher::find) walk the sequence left to
/// right without overlapping matches. Span accessors are only valid after a
/// successful `find`, `looking_at` or `matches` and until the next call that
/// changes the scan state.
pub struct Matcher<'p, 's, T, E> {
    pattern: &'p Pattern<T>,
    sequence: &'s [E],
    /// Next start position; beyond the sequence length once exhausted.
    cursor: usize,
    last: Option<Match>,
}

impl<'p, 's, T, E> Matcher<'p, 's, T, E>
where
    T: Transition<E>,
{
    pub(crate) fn new(pattern: &'p Pattern<T>, sequence: &'s [E]) -> Self {
        Matcher {
            pattern,
            sequence,
            cursor: 0,
            last: None,
        }
    }

    // ─── Scanning ───────────────────────────────────────────────────────────

    /// Find the next match at or after the current scan position.
    ///
    /// After a zero-width match the scan resumes one position further on, so
    /// repeated calls always terminate. Once this returns `false` the
    /// matcher stays exhausted until it is reset.
    pub fn find(&mut self) -> bool {
        while self.cursor <= self.sequence.len() {
            let from = self.cursor;
            if let Some(found) = self.run(from, false) {
                self.accept(found);
                return true;
            }
            self.cursor += 1;
        }
        self.last = None;
        false
    }

    /// Reset and find the first match starting at or after `offset`.
    pub fn find_at(&mut self, offset: usize) -> Result<bool, MatchError> {
        let len = self.sequence.len();
        if offset > len {
            return Err(MatchError::OutOfRange { offset, len });
        }
        self.reset();
        self.cursor = offset;
        Ok(self.find())
    }

    /// Match a prefix of the sequence.
    pub fn looking_at(&mut self) -> bool {
        self.anchored(false)
    }

    /// Match the entire sequence.
    pub fn matches(&mut self) -> bool {
        self.anchored(true)
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.last = None;
    }

    /// Rebind to a new sequence and reset.
    pub fn reset_with(&mut self, sequence: &'s [E]) {
        self.sequence = sequence;
        self.reset();
    }

    /// Iterate over the remaining matches.
    pub fn iter(&mut self) -> Matches<'_, 'p, 's, T, E> {
        Matches { matcher: self }
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn group_count(&self) -> usize {
        self.pattern.groups
    }

    /// The last successful match, if the scan state still holds one.
    pub fn current(&self) -> Option<Match> {
        self.last.clone()
    }

    pub fn start(&self) -> Result<usize, MatchError> {
        self.last().map(|m| m.start)
    }

    pub fn end(&self) -> Result<usize, MatchError> {
        self.last().map(|m| m.end)
    }

    pub fn group(&self) -> Result<&'s [E], MatchError> {
        let sequence = self.sequence;
        self.last().map(|m| &sequence[m.start..m.end])
    }

    /// Span of group `i`, or `None` when the group did not take part.
    pub fn span(&self, i: usize) -> Result<Option<Range<usize>>, MatchError> {
        let m = self.last()?;
        if i > m.group_count() {
            return Err(MatchError::NoSuchGroup(i));
        }
        Ok(m.span(i))
    }

    pub fn start_of(&self, i: usize) -> Result<Option<usize>, MatchError> {
        Ok(self.span(i)?.map(|r| r.start))
    }

    pub fn end_of(&self, i: usize) -> Result<Option<usize>, MatchError> {
        Ok(self.span(i)?.map(|r| r.end))
    }

    pub fn group_of(&self, i: usize) -> Result<Option<&'s [E]>, MatchError> {
        let sequence = self.sequence;
        Ok(self.span(i)?.map(|r| &sequence[r]))
    }

    fn last(&self) -> Result<&Match, MatchError> {
        self.last.as_ref().ok_or(MatchError::InvalidState)
    }

    // ─── Simulation ─────────────────────────────────────────────────────────

    fn anchored(&mut self, to_end: bool) -> bool {
        match self.run(0, to_end) {
            Some(found) => {
                self.accept(found);
                true
            }
            None => {
                self.last = None;
                false
            }
        }
    }

    fn accept(&mut self, found: Match) {
        self.cursor = if found.is_empty() {
            found.end + 1
        } else {
            found.end
        };
        self.last = Some(found);
    }

    /// Run the automaton from `from`, returning the shortest match, or with
    /// `to_end` the match that ends exactly at the end of the sequence.
    fn run(&self, from: usize, to_end: bool) -> Option<Match> {
        let pattern = self.pattern;
        let len = self.sequence.len();
        let mut visited = vec![false; pattern.states.len()];
        let mut current = Vec::new();
        self.follow(
            pattern.entry,
            vec![None; 2 * pattern.groups],
            from,
            &mut visited,
            &mut current,
        );

        let mut pos = from;
        loop {
            if !to_end || pos == len {
                let accepted = current.iter().find(|t| matches!(t.step, Step::Accept));
                if let Some(thread) = accepted {
                    return Some(self.build(from, pos, &thread.slots));
                }
            }
            if pos == len || current.is_empty() {
                return None;
            }

            let element = &self.sequence[pos];
            let mut next = Vec::new();
            visited.fill(false);
            for thread in current {
                if let Step::Consume { state, edge } = thread.step
                    && let Edge::Consume(transition, target) = &pattern.states[state].edges[edge]
                    && transition.matches(element)
                {
                    self.follow(*target, thread.slots, pos + 1, &mut visited, &mut next);
                }
            }
            current = next;
            pos += 1;
        }
    }

    /// Add the threads reachable from `start` without consuming input, in
    /// preference order.
    fn follow(
        &self,
        start: StateId,
        slots: Vec<Option<usize>>,
        pos: usize,
        visited: &mut [bool],
        out: &mut Vec<Thread>,
    ) {
        let mut stack = vec![Pending::Visit(start, slots)];
        while let Some(pending) = stack.pop() {
            let (id, mut slots) = match pending {
                Pending::Emit(thread) => {
                    out.push(thread);
                    continue;
                }
                Pending::Visit(id, slots) => (id, slots),
            };
            if visited[id] {
                continue;
            }
            visited[id] = true;

            let state = &self.pattern.states[id];
            match state.marker {
                Some(Marker::Open(g)) => slots[2 * g] = Some(pos),
                Some(Marker::Close(g)) => slots[2 * g + 1] = Some(pos),
                None => {}
            }
            if id == self.pattern.exit {
                out.push(Thread {
                    step: Step::Accept,
                    slots: slots.clone(),
                });
            }
            for (i, edge) in state.edges.iter().enumerate().rev() {
                match edge {
                    Edge::Consume(..) => stack.push(Pending::Emit(Thread {
                        step: Step::Consume { state: id, edge: i },
                        slots: slots.clone(),
                    })),
                    Edge::Epsilon(to) => stack.push(Pending::Visit(*to, slots.clone())),
                }
            }
        }
    }

    fn build(&self, start: usize, end: usize, slots: &[Option<usize>]) -> Match {
        let groups = slots
            .chunks(2)
            .map(|pair| match (pair[0], pair[1]) {
                (Some(s), Some(e)) if s <= e => Some(s..e),
                _ => None,
            })
            .collect();
        Match { start, end, groups }
    }
}

/// Iterator over successive matches of a [`Matcher`].
pub struct Matches<'m, 'p, 's, T, E> {
    matcher: &'m mut Matcher<'p, 's, T, E>,
}

impl<T, E> Iterator for Matches<'_, '_, '_, T, E>
where
    T: Transition<E>,
{
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        if self.matcher.find() {
            self.matcher.current()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Ch {
        Is(char),
        Any,
    }

    impl Transition<char> for Ch {
        fn matches(&self, element: &char) -> bool {
            match self {
                Ch::Is(c) => c == element,
                Ch::Any => true,
            }
        }
    }

    fn ch(c: char) -> Pattern<Ch> {
        Pattern::matching(Ch::Is(c))
    }

    fn any() -> Pattern<Ch> {
        Pattern::matching(Ch::Any)
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn spans(p: &Pattern<Ch>, s: &str) -> Vec<(usize, usize)> {
        let seq = chars(s);
        p.matcher(&seq).iter().map(|m| (m.start, m.end)).collect()
    }

    // --- Basic scanning ---

    #[test]
    fn test_single_element() {
        assert_eq!(spans(&ch('x'), "axbx"), vec![(1, 2), (3, 4)]);
    }

    #[test]
    fn test_repeat_is_one_element_per_find() {
        assert_eq!(spans(&ch('x').repeat(), "xxx"), vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_star_then_literal_or_other() {
        // x* a | b
        let p = ch('x')
            .optional()
            .repeat()
            .chain(ch('a'))
            .branch(ch('b'));
        assert_eq!(spans(&p, "xaaab"), vec![(0, 2), (2, 3), (3, 4), (4, 5)]);
    }

    #[test]
    fn test_chain_needs_both() {
        let p = ch('a').chain(ch('x')).chain(ch('b'));
        assert_eq!(spans(&p, "axbaxxb"), vec![(0, 3)]);
    }

    #[test]
    fn test_optional_inside_chain() {
        let p = ch('a').chain(ch('x').optional()).chain(ch('b'));
        assert_eq!(spans(&p, "ab axb axxb"), vec![(0, 2), (3, 6)]);
    }

    #[test]
    fn test_no_match() {
        let seq = chars("yyy");
        let p = ch('x');
        let mut m = p.matcher(&seq);
        assert!(!m.find());
        assert_eq!(m.start(), Err(MatchError::InvalidState));
    }

    // --- Zero-width matches ---

    #[test]
    fn test_zero_width_advances() {
        let p = Pattern::<Ch>::empty();
        assert_eq!(spans(&p, "abc"), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_exhausted_until_reset() {
        let seq = chars("x");
        let p = ch('x');
        let mut m = p.matcher(&seq);
        assert!(m.find());
        assert!(!m.find());
        assert!(!m.find());
        m.reset();
        assert!(m.find());
        assert_eq!(m.start(), Ok(0));
    }

    #[test]
    fn test_empty_capture_on_empty_input() {
        let p = Pattern::<Ch>::empty().capture();
        let seq: Vec<char> = Vec::new();
        let mut m = p.matcher(&seq);
        assert_eq!(m.group_count(), 1);
        assert!(m.find());
        assert_eq!(m.start(), Ok(0));
        assert_eq!(m.end(), Ok(0));
        assert_eq!(m.span(1), Ok(Some(0..0)));
        assert!(!m.find());
    }

    // --- Anchored matching ---

    #[test]
    fn test_matches_requires_whole_sequence() {
        let p = ch('x').repeat();
        let seq = chars("xxx");
        let mut m = p.matcher(&seq);
        assert!(m.matches());
        assert_eq!((m.start(), m.end()), (Ok(0), Ok(3)));
        assert!(m.looking_at());
        assert_eq!(m.end(), Ok(1));

        let seq = chars("xxy");
        let mut m = p.matcher(&seq);
        assert!(!m.matches());
        assert!(m.looking_at());
        assert!(m.find());
    }

    #[test]
    fn test_looking_at_needs_prefix() {
        let p = ch('x');
        let seq = chars("ax");
        let mut m = p.matcher(&seq);
        assert!(!m.looking_at());
        assert!(m.find());
        assert_eq!(m.start(), Ok(1));
    }

    #[test]
    fn test_find_at() {
        let p = ch('x');
        let seq = chars("xax");
        let mut m = p.matcher(&seq);
        assert_eq!(m.find_at(1), Ok(true));
        assert_eq!(m.start(), Ok(2));
        assert_eq!(m.find_at(3), Ok(false));
        assert_eq!(m.find_at(4), Err(MatchError::OutOfRange { offset: 4, len: 3 }));
    }

    #[test]
    fn test_reset_with_new_sequence() {
        let p = ch('x');
        let first = chars("x");
        let second = chars("aax");
        let mut m = p.matcher(&first);
        assert!(m.find());
        m.reset_with(&second);
        assert_eq!(m.start(), Err(MatchError::InvalidState));
        assert!(m.find());
        assert_eq!(m.start(), Ok(2));
        assert_eq!(m.group(), Ok(&second[2..3]));
    }

    // --- Groups ---

    #[test]
    fn test_nested_groups() {
        // a((x*)(y))a
        let inner = ch('x')
            .optional()
            .repeat()
            .capture()
            .chain(ch('y').capture());
        let p = ch('a').chain(inner.capture()).chain(ch('a'));
        let seq = chars("axxxya");
        let mut m = p.matcher(&seq);
        assert_eq!(m.group_count(), 3);
        assert!(m.find());
        assert_eq!(m.span(0), Ok(Some(0..6)));
        assert_eq!(m.group_of(1), Ok(Some(&seq[1..5])));
        assert_eq!(m.span(2), Ok(Some(1..4)));
        assert_eq!(m.span(3), Ok(Some(4..5)));
        assert_eq!(m.start_of(3), Ok(Some(4)));
        assert_eq!(m.end_of(2), Ok(Some(4)));
    }

    #[test]
    fn test_non_participating_group() {
        // (x|y)|z
        let p = ch('x').branch(ch('y')).capture().branch(ch('z'));
        let seq = chars("xz");
        let mut m = p.matcher(&seq);
        assert!(m.find());
        assert_eq!(m.span(1), Ok(Some(0..1)));
        assert!(m.find());
        assert_eq!(m.span(0), Ok(Some(1..2)));
        assert_eq!(m.span(1), Ok(None));
        assert_eq!(m.group_of(1), Ok(None));
    }

    #[test]
    fn test_no_such_group() {
        let p = ch('x').capture();
        let seq = chars("x");
        let mut m = p.matcher(&seq);
        assert!(m.find());
        assert_eq!(m.span(2), Err(MatchError::NoSuchGroup(2)));
        assert_eq!(m.start_of(1), Ok(Some(0)));
    }

    #[test]
    fn test_accessors_before_match() {
        let p = ch('x').capture();
        let seq = chars("x");
        let m = p.matcher(&seq);
        assert_eq!(m.group_count(), 1);
        assert_eq!(m.end(), Err(MatchError::InvalidState));
        assert_eq!(m.group(), Err(MatchError::InvalidState));
        assert_eq!(m.span(1), Err(MatchError::InvalidState));
    }

    #[test]
    fn test_first_branch_wins_ties() {
        let wildcard_first = any().capture().branch(ch('a').capture());
        let seq = chars("a");
        let mut m = wildcard_first.matcher(&seq);
        assert!(m.find());
        assert_eq!(m.span(1), Ok(Some(0..1)));
        assert_eq!(m.span(2), Ok(None));

        let literal_first = ch('a').capture().branch(any().capture());
        let mut m = literal_first.matcher(&seq);
        assert!(m.find());
        assert_eq!(m.span(1), Ok(Some(0..1)));
        assert_eq!(m.span(2), Ok(None));
    }

    #[test]
    fn test_shortest_beats_preferred() {
        // The longer first alternative loses to the shorter second one.
        let p = ch('a').chain(ch('b')).capture().branch(ch('a').capture());
        let seq = chars("ab");
        let mut m = p.matcher(&seq);
        assert!(m.find());
        assert_eq!(m.end(), Ok(1));
        assert_eq!(m.span(1), Ok(None));
        assert_eq!(m.span(2), Ok(Some(0..1)));
    }

    #[test]
    fn test_minimized_captures_agree() {
        let p = any()
            .capture()
            .branch(ch('a').capture())
            .chain(ch('b').optional().capture());
        let min = p.clone().minimize();
        let seq = chars("abab");
        let plain: Vec<Match> = p.matcher(&seq).iter().collect();
        let small: Vec<Match> = min.matcher(&seq).iter().collect();
        assert_eq!(plain, small);
    }
}
