//! Thompson-style automaton construction.

use tracing::trace;

use super::Transition;
use super::matcher::Matcher;

/// Index of a state inside a [`Pattern`]'s arena.
pub type StateId = usize;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Edge<T> {
    Consume(T, StateId),
    Epsilon(StateId),
}

/// Capture delimiters carried by a state; group numbers are 0-based here and
/// reported to users shifted by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Marker {
    Open(usize),
    Close(usize),
}

#[derive(Debug, Clone)]
pub(crate) struct State<T> {
    /// Outgoing edges in priority order.
    pub(crate) edges: Vec<Edge<T>>,
    pub(crate) marker: Option<Marker>,
}

impl<T> State<T> {
    fn new(marker: Option<Marker>) -> Self {
        State {
            edges: Vec::new(),
            marker,
        }
    }

    fn is_epsilon_only(&self) -> bool {
        self.edges.iter().all(|e| matches!(e, Edge::Epsilon(_)))
    }
}

/// An immutable automaton with a single entry and a single accept state.
///
/// Combinators consume their operands, so a pattern is only ever extended
/// by building a new one. Once built it may be shared freely and scanned by
/// any number of [`Matcher`]s.
#[derive(Debug, Clone)]
pub struct Pattern<T> {
    pub(crate) states: Vec<State<T>>,
    pub(crate) entry: StateId,
    pub(crate) exit: StateId,
    pub(crate) groups: usize,
}

impl<T> Pattern<T> {
    /// A pattern consuming exactly one element accepted by `transition`.
    pub fn matching(transition: T) -> Self {
        let mut p = Self::blank();
        p.entry = p.add_state(None);
        p.exit = p.add_state(None);
        p.states[p.entry]
            .edges
            .push(Edge::Consume(transition, p.exit));
        p
    }

    /// A pattern matching the empty sequence.
    pub fn empty() -> Self {
        let mut p = Self::blank();
        p.entry = p.add_state(None);
        p.exit = p.add_state(None);
        p.states[p.entry].edges.push(Edge::Epsilon(p.exit));
        p
    }

    /// `self` followed by `other`.
    pub fn chain(mut self, other: Pattern<T>) -> Self {
        let shift = self.groups;
        let added = other.groups;
        let (entry, exit) = self.absorb(other, shift);
        let old_exit = self.exit;
        self.states[old_exit].edges.push(Edge::Epsilon(entry));
        self.exit = exit;
        self.groups += added;
        self
    }

    /// Either `self` or `other`, preferring `self` when both match.
    pub fn branch(self, other: Pattern<T>) -> Self {
        let mut p = Self::blank();
        p.entry = p.add_state(None);
        let left_groups = self.groups;
        p.groups = self.groups + other.groups;
        let (a_entry, a_exit) = p.absorb(self, 0);
        let (b_entry, b_exit) = p.absorb(other, left_groups);
        p.exit = p.add_state(None);
        p.states[p.entry].edges = vec![Edge::Epsilon(a_entry), Edge::Epsilon(b_entry)];
        p.states[a_exit].edges.push(Edge::Epsilon(p.exit));
        p.states[b_exit].edges.push(Edge::Epsilon(p.exit));
        p
    }

    /// Zero or one occurrence of `self`; skipping is preferred.
    pub fn optional(self) -> Self {
        let mut p = Self::blank();
        p.entry = p.add_state(None);
        p.groups = self.groups;
        let (inner_entry, inner_exit) = p.absorb(self, 0);
        p.exit = p.add_state(None);
        p.states[p.entry].edges = vec![Edge::Epsilon(p.exit), Edge::Epsilon(inner_entry)];
        p.states[inner_exit].edges.push(Edge::Epsilon(p.exit));
        p
    }

    /// One or more occurrences of `self`; leaving the loop is preferred.
    pub fn repeat(self) -> Self {
        let mut p = Self::blank();
        p.entry = p.add_state(None);
        p.groups = self.groups;
        let (inner_entry, inner_exit) = p.absorb(self, 0);
        p.exit = p.add_state(None);
        p.states[p.entry].edges.push(Edge::Epsilon(inner_entry));
        p.states[inner_exit].edges = vec![Edge::Epsilon(p.exit), Edge::Epsilon(inner_entry)];
        p
    }

    /// Wrap `self` in a capture group numbered before any group inside it.
    pub fn capture(self) -> Self {
        let mut p = Self::blank();
        p.entry = p.add_state(Some(Marker::Open(0)));
        p.groups = self.groups + 1;
        let (inner_entry, inner_exit) = p.absorb(self, 1);
        p.exit = p.add_state(Some(Marker::Close(0)));
        p.states[p.entry].edges.push(Edge::Epsilon(inner_entry));
        p.states[inner_exit].edges.push(Edge::Epsilon(p.exit));
        p
    }

    /// Number of capture groups, not counting the whole match.
    pub fn group_count(&self) -> usize {
        self.groups
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Bind this pattern to a sequence for scanning.
    pub fn matcher<'s, E>(&self, sequence: &'s [E]) -> Matcher<'_, 's, T, E>
    where
        T: Transition<E>,
    {
        Matcher::new(self, sequence)
    }

    fn blank() -> Self {
        Pattern {
            states: Vec::new(),
            entry: 0,
            exit: 0,
            groups: 0,
        }
    }

    fn add_state(&mut self, marker: Option<Marker>) -> StateId {
        self.states.push(State::new(marker));
        self.states.len() - 1
    }

    /// Move all states of `other` into this arena, renumbering states and
    /// shifting its capture groups by `group_shift`. Returns the new ids of
    /// `other`'s entry and exit.
    fn absorb(&mut self, other: Pattern<T>, group_shift: usize) -> (StateId, StateId) {
        let offset = self.states.len();
        for state in other.states {
            let marker = state.marker.map(|m| match m {
                Marker::Open(g) => Marker::Open(g + group_shift),
                Marker::Close(g) => Marker::Close(g + group_shift),
            });
            let edges = state
                .edges
                .into_iter()
                .map(|e| match e {
                    Edge::Consume(t, to) => Edge::Consume(t, to + offset),
                    Edge::Epsilon(to) => Edge::Epsilon(to + offset),
                })
                .collect();
            self.states.push(State { edges, marker });
        }
        (other.entry + offset, other.exit + offset)
    }
}

impl<T: Clone + PartialEq> Pattern<T> {
    /// Splice out the unmarked states the combinators leave behind and merge
    /// identical edges.
    ///
    /// The preference order of the remaining paths is kept intact, so the
    /// result reports the same matches and the same captures.
    pub fn minimize(self) -> Self {
        let before = self.states.len();
        let transparent: Vec<bool> = self
            .states
            .iter()
            .enumerate()
            .map(|(id, s)| id != self.exit && s.marker.is_none())
            .collect();
        let removable: Vec<bool> = self
            .states
            .iter()
            .enumerate()
            .map(|(id, s)| transparent[id] && id != self.entry && s.is_epsilon_only())
            .collect();

        let mut rewired: Vec<Vec<Edge<T>>> = Vec::with_capacity(before);
        for id in 0..before {
            let mut edges = Vec::new();
            let mut seen = vec![false; before];
            seen[id] = true;
            self.inline(id, &transparent, &removable, &mut seen, &mut edges);
            rewired.push(edges);
        }

        // Keep only what the entry can still reach; the accept state stays
        // even when unreachable so the pattern keeps its shape.
        let mut reachable = vec![false; before];
        let mut stack = vec![self.entry];
        while let Some(id) = stack.pop() {
            if reachable[id] {
                continue;
            }
            reachable[id] = true;
            for edge in &rewired[id] {
                let (Edge::Consume(_, to) | Edge::Epsilon(to)) = edge;
                stack.push(*to);
            }
        }
        reachable[self.exit] = true;

        let mut renumber = vec![usize::MAX; before];
        let mut next = 0;
        for (id, keep) in reachable.iter().enumerate() {
            if *keep {
                renumber[id] = next;
                next += 1;
            }
        }

        let mut states = Vec::with_capacity(next);
        for ((state, edges), keep) in self.states.into_iter().zip(rewired).zip(&reachable) {
            if !keep {
                continue;
            }
            let edges = edges
                .into_iter()
                .map(|e| match e {
                    Edge::Consume(t, to) => Edge::Consume(t, renumber[to]),
                    Edge::Epsilon(to) => Edge::Epsilon(renumber[to]),
                })
                .collect();
            states.push(State {
                edges,
                marker: state.marker,
            });
        }

        trace!(before, after = states.len(), "minimized automaton");
        Pattern {
            entry: renumber[self.entry],
            exit: renumber[self.exit],
            groups: self.groups,
            states,
        }
    }

    /// Collect the edges of `id`, replacing epsilon edges into transparent
    /// states with those states' own edges.
    fn inline(
        &self,
        id: StateId,
        transparent: &[bool],
        removable: &[bool],
        seen: &mut [bool],
        out: &mut Vec<Edge<T>>,
    ) {
        for edge in &self.states[id].edges {
            match edge {
                Edge::Consume(t, to) => {
                    for target in self.expand(*to, removable) {
                        push_unique(out, Edge::Consume(t.clone(), target));
                    }
                }
                Edge::Epsilon(to) if transparent[*to] => {
                    if !seen[*to] {
                        seen[*to] = true;
                        self.inline(*to, transparent, removable, seen, out);
                    }
                }
                Edge::Epsilon(to) => push_unique(out, Edge::Epsilon(*to)),
            }
        }
    }

    /// The states kept after minimization that `id` stands for, in the order
    /// an epsilon walk from `id` would reach them.
    fn expand(&self, id: StateId, removable: &[bool]) -> Vec<StateId> {
        if !removable[id] {
            return vec![id];
        }
        let mut out = Vec::new();
        let mut seen = vec![false; self.states.len()];
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if seen[current] {
                continue;
            }
            seen[current] = true;
            if !removable[current] {
                out.push(current);
                continue;
            }
            for edge in self.states[current].edges.iter().rev() {
                if let Edge::Epsilon(to) = edge {
                    stack.push(*to);
                }
            }
        }
        out
    }
}

fn push_unique<T: PartialEq>(edges: &mut Vec<Edge<T>>, edge: Edge<T>) {
    if !edges.contains(&edge) {
        edges.push(edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ch(char);

    impl Transition<char> for Ch {
        fn matches(&self, element: &char) -> bool {
            self.0 == *element
        }
    }

    fn ch(c: char) -> Pattern<Ch> {
        Pattern::matching(Ch(c))
    }

    fn all_spans(p: &Pattern<Ch>, s: &str) -> Vec<(usize, usize)> {
        let seq: Vec<char> = s.chars().collect();
        let mut m = p.matcher(&seq);
        let mut out = Vec::new();
        while m.find() {
            out.push((m.start().unwrap(), m.end().unwrap()));
        }
        out
    }

    // --- Construction ---

    #[test]
    fn test_group_count_accumulates() {
        let p = ch('a')
            .capture()
            .chain(ch('b').capture().capture())
            .branch(ch('c').capture());
        assert_eq!(p.group_count(), 4);
    }

    #[test]
    fn test_capture_numbers_outer_first() {
        let p = ch('a').capture().capture();
        let markers: Vec<Marker> = p.states.iter().filter_map(|s| s.marker).collect();
        assert!(markers.contains(&Marker::Open(0)));
        assert!(markers.contains(&Marker::Open(1)));
        assert_eq!(p.states[p.entry].marker, Some(Marker::Open(0)));
    }

    #[test]
    fn test_operands_keep_their_own_semantics() {
        // Reusing a clone of an operand after composition must not be
        // affected by the composition.
        let x = ch('x');
        let opt = x.clone().optional();
        let rep = x.clone().repeat();
        assert_eq!(all_spans(&x, "xx"), vec![(0, 1), (1, 2)]);
        assert_eq!(all_spans(&opt, "x"), vec![(0, 0), (1, 1)]);
        assert_eq!(all_spans(&rep, "xx"), vec![(0, 1), (1, 2)]);
    }

    // --- Minimization ---

    #[test]
    fn test_minimize_removes_epsilon_states() {
        let p = ch('a')
            .chain(ch('b'))
            .branch(ch('c').optional())
            .chain(ch('d').repeat());
        let before = p.state_count();
        let min = p.clone().minimize();
        assert!(min.state_count() < before, "{} !< {}", min.state_count(), before);
        for s in ["abd", "dd", "cdd", "xabdd", "ab"] {
            assert_eq!(all_spans(&p, s), all_spans(&min, s), "input {s:?}");
        }
    }

    #[test]
    fn test_minimize_keeps_markers() {
        let p = ch('a').capture().chain(ch('b').optional().capture());
        let min = p.clone().minimize();
        let seq: Vec<char> = "ab".chars().collect();
        let mut m = min.matcher(&seq);
        assert!(m.find());
        assert_eq!(m.span(1).unwrap(), Some(0..1));
        assert_eq!(m.span(2).unwrap(), Some(1..1));
    }

    #[test]
    fn test_minimize_merges_identical_edges() {
        let p = ch('a').branch(ch('a')).minimize();
        let consumes = p.states[p.entry]
            .edges
            .iter()
            .filter(|e| matches!(e, Edge::Consume(..)))
            .count();
        assert_eq!(consumes, 1);
    }

    #[test]
    fn test_minimize_epsilon_cycle() {
        let p = ch('x').optional().repeat().optional().repeat();
        let min = p.clone().minimize();
        assert_eq!(all_spans(&p, "xax"), all_spans(&min, "xax"));
    }
}
