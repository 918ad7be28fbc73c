//! Deterministic finite automata over character ranges.
//!
//! [`StringMessageSpace`](crate::StringMessageSpace) consumes an
//! already-constructed DFA through this small surface: states are dense
//! indices, transitions are inclusive character ranges, and stepping is a
//! binary search. The library deliberately does not parse regular
//! expressions; automata are assembled with [`DfaBuilder`] or with the
//! [`Dfa::interval`] constructor for decimal number ranges.

use crate::common::Error;

/// A transition on an inclusive character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Smallest character accepted by this transition.
    pub min: char,
    /// Largest character accepted by this transition.
    pub max: char,
    /// Destination state.
    pub target: usize,
}

#[derive(Debug, Clone)]
struct State {
    accepting: bool,
    /// Sorted by `min`; ranges within one state never overlap.
    transitions: Vec<Transition>,
}

/// A deterministic finite automaton.
///
/// Immutable after construction. Determinism is validated by the builder,
/// so every `(state, character)` pair steps to at most one state.
#[derive(Debug, Clone)]
pub struct Dfa {
    states: Vec<State>,
    initial: usize,
}

impl Dfa {
    /// Start assembling an automaton.
    pub fn builder() -> DfaBuilder {
        DfaBuilder {
            accepting: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Initial state.
    pub fn initial(&self) -> usize {
        self.initial
    }

    /// Number of states.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Whether `state` is accepting.
    pub fn is_accepting(&self, state: usize) -> bool {
        self.states[state].accepting
    }

    /// Transitions leaving `state`, ordered by range start.
    pub fn transitions(&self, state: usize) -> &[Transition] {
        &self.states[state].transitions
    }

    /// Destination of stepping `state` with `symbol`, if any.
    pub fn step(&self, state: usize, symbol: char) -> Option<usize> {
        let transitions = &self.states[state].transitions;
        let i = transitions.partition_point(|t| t.max < symbol);
        match transitions.get(i) {
            Some(t) if t.min <= symbol => Some(t.target),
            _ => None,
        }
    }

    /// Whether the automaton accepts `word`.
    pub fn accepts(&self, word: &str) -> bool {
        let mut state = self.initial;
        for symbol in word.chars() {
            match self.step(state, symbol) {
                Some(next) => state = next,
                None => return false,
            }
        }
        self.states[state].accepting
    }

    /// Whether the accepted language is finite.
    ///
    /// The language is infinite exactly when a cycle exists among states
    /// that are reachable from the initial state and from which an
    /// accepting state is reachable.
    pub fn is_finite(&self) -> bool {
        let reachable = self.reachable_from_initial();
        let coaccessible = self.coaccessible();
        let useful: Vec<bool> = (0..self.states.len())
            .map(|s| reachable[s] && coaccessible[s])
            .collect();

        // DFS cycle detection restricted to useful states.
        // 0 = unvisited, 1 = on stack, 2 = done.
        let mut color = vec![0u8; self.states.len()];
        for start in 0..self.states.len() {
            if !useful[start] || color[start] != 0 {
                continue;
            }
            color[start] = 1;
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            while let Some(frame) = stack.last_mut() {
                let (state, next) = *frame;
                let transitions = &self.states[state].transitions;
                if next >= transitions.len() {
                    color[state] = 2;
                    stack.pop();
                    continue;
                }
                frame.1 += 1;
                let target = transitions[next].target;
                if !useful[target] {
                    continue;
                }
                match color[target] {
                    0 => {
                        color[target] = 1;
                        stack.push((target, 0));
                    }
                    1 => return false, // cycle through a useful state
                    _ => {}
                }
            }
        }
        true
    }

    fn reachable_from_initial(&self) -> Vec<bool> {
        let mut seen = vec![false; self.states.len()];
        let mut stack = vec![self.initial];
        seen[self.initial] = true;
        while let Some(state) = stack.pop() {
            for t in &self.states[state].transitions {
                if !seen[t.target] {
                    seen[t.target] = true;
                    stack.push(t.target);
                }
            }
        }
        seen
    }

    fn coaccessible(&self) -> Vec<bool> {
        let mut reverse = vec![Vec::new(); self.states.len()];
        for (source, state) in self.states.iter().enumerate() {
            for t in &state.transitions {
                reverse[t.target].push(source);
            }
        }
        let mut seen = vec![false; self.states.len()];
        let mut stack: Vec<usize> = (0..self.states.len())
            .filter(|&s| self.states[s].accepting)
            .collect();
        for &s in &stack {
            seen[s] = true;
        }
        while let Some(state) = stack.pop() {
            for &source in &reverse[state] {
                if !seen[source] {
                    seen[source] = true;
                    stack.push(source);
                }
            }
        }
        seen
    }

    /// Automaton over decimal strings representing integers in
    /// `[min, max]`.
    ///
    /// With `digits > 0` the automaton accepts exactly the zero-padded
    /// `digits`-character representations (so `interval(20, 80, 2)`
    /// accepts `"20"` through `"80"`); `digits` must be large enough for
    /// `max`. With `digits == 0` the width is free and leading zeros are
    /// not accepted (`"0"` only when `min == 0`).
    pub fn interval(min: u64, max: u64, digits: u32) -> Result<Dfa, Error> {
        if min > max {
            return Err(Error::InvalidArgument("min must not be greater than max"));
        }
        if digits > 0 {
            IntervalBuilder::fixed_width(min, max, digits as usize)
        } else {
            IntervalBuilder::free_width(min, max)
        }
    }
}

/// Incremental [`Dfa`] construction.
///
/// States are added first, transitions after; [`build`](DfaBuilder::build)
/// validates state indices, range bounds and determinism.
pub struct DfaBuilder {
    accepting: Vec<bool>,
    transitions: Vec<(usize, Transition)>,
}

impl DfaBuilder {
    /// Add a state and return its index.
    pub fn add_state(&mut self, accepting: bool) -> usize {
        self.accepting.push(accepting);
        self.accepting.len() - 1
    }

    /// Add a single-character transition.
    pub fn add_transition(&mut self, from: usize, symbol: char, to: usize) {
        self.add_range(from, symbol, symbol, to);
    }

    /// Add a transition on the inclusive character range `[min, max]`.
    pub fn add_range(&mut self, from: usize, min: char, max: char, to: usize) {
        self.transitions.push((
            from,
            Transition {
                min,
                max,
                target: to,
            },
        ));
    }

    /// Finish construction with the given initial state.
    ///
    /// Fails when a state index is out of range, a range is inverted, or
    /// two ranges on one state overlap (the automaton would be
    /// non-deterministic).
    pub fn build(self, initial: usize) -> Result<Dfa, Error> {
        let count = self.accepting.len();
        if initial >= count {
            return Err(Error::InvalidArgument("initial state out of range"));
        }
        let mut states: Vec<State> = self
            .accepting
            .into_iter()
            .map(|accepting| State {
                accepting,
                transitions: Vec::new(),
            })
            .collect();
        for (from, t) in self.transitions {
            if t.min > t.max {
                return Err(Error::InvalidArgument("empty character range"));
            }
            if from >= count || t.target >= count {
                return Err(Error::InvalidArgument("transition state out of range"));
            }
            states[from].transitions.push(t);
        }
        for state in &mut states {
            state.transitions.sort_by_key(|t| t.min);
            for pair in state.transitions.windows(2) {
                if pair[0].max >= pair[1].min {
                    return Err(Error::InvalidArgument("automaton is not deterministic"));
                }
            }
        }
        Ok(Dfa { states, initial })
    }
}

/// Lexicographic relation of a read prefix against a bound's digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Cmp {
    Below,
    Tight,
    Above,
}

impl Cmp {
    fn advance(self, symbol: u8, bound_digit: u8) -> Cmp {
        match self {
            Cmp::Tight => match symbol.cmp(&bound_digit) {
                std::cmp::Ordering::Less => Cmp::Below,
                std::cmp::Ordering::Equal => Cmp::Tight,
                std::cmp::Ordering::Greater => Cmp::Above,
            },
            other => other,
        }
    }
}

struct IntervalBuilder;

impl IntervalBuilder {
    /// Fixed-width interval automaton: one state per
    /// `(depth, low cmp, high cmp)` triple actually reachable.
    fn fixed_width(min: u64, max: u64, digits: usize) -> Result<Dfa, Error> {
        let hi = max.to_string();
        if hi.len() > digits {
            return Err(Error::InvalidArgument(
                "number of digits too small for interval",
            ));
        }
        let lo = format!("{min:0width$}", width = digits);
        let hi = format!("{max:0width$}", width = digits);
        let lo = lo.as_bytes();
        let hi = hi.as_bytes();

        let mut builder = Dfa::builder();
        let mut ids: std::collections::HashMap<(usize, Cmp, Cmp), usize> =
            std::collections::HashMap::new();
        let accepting =
            |depth: usize, low: Cmp, high: Cmp| depth == digits && low != Cmp::Below && high != Cmp::Above;
        let start = builder.add_state(accepting(0, Cmp::Tight, Cmp::Tight));
        ids.insert((0, Cmp::Tight, Cmp::Tight), start);
        let mut frontier = vec![(0usize, Cmp::Tight, Cmp::Tight)];

        while let Some((depth, low, high)) = frontier.pop() {
            if depth == digits {
                continue;
            }
            let from = ids[&(depth, low, high)];
            for symbol in b'0'..=b'9' {
                let next = (
                    depth + 1,
                    low.advance(symbol, lo[depth]),
                    high.advance(symbol, hi[depth]),
                );
                let to = *ids.entry(next).or_insert_with(|| {
                    frontier.push(next);
                    builder.add_state(accepting(next.0, next.1, next.2))
                });
                builder.add_transition(from, symbol as char, to);
            }
        }
        builder.build(start)
    }

    /// Free-width interval automaton: no leading zeros, word length
    /// between the digit counts of `min` and `max`. Only the shortest
    /// length is constrained from below and the longest from above; the
    /// comparison flags are carried while those lengths are still
    /// possible.
    fn free_width(min: u64, max: u64) -> Result<Dfa, Error> {
        let lo = min.to_string();
        let hi = max.to_string();
        let lo = lo.as_bytes();
        let hi = hi.as_bytes();
        let len_min = lo.len();
        let len_max = hi.len();

        let accepting = |depth: usize, low: Cmp, high: Cmp| {
            depth >= len_min
                && depth <= len_max
                && (depth > len_min || low != Cmp::Below)
                && (depth < len_max || high != Cmp::Above)
        };

        let mut builder = Dfa::builder();
        let mut ids: std::collections::HashMap<(usize, Cmp, Cmp), usize> =
            std::collections::HashMap::new();
        let start = builder.add_state(false);
        ids.insert((0, Cmp::Tight, Cmp::Tight), start);
        let mut frontier = vec![(0usize, Cmp::Tight, Cmp::Tight)];

        while let Some((depth, low, high)) = frontier.pop() {
            if depth == len_max {
                continue;
            }
            let from = ids[&(depth, low, high)];
            let first = if depth == 0 { b'1' } else { b'0' };
            for symbol in first..=b'9' {
                // Past min's length every longer word clears the lower
                // bound, so the low flag degenerates to Above.
                let next_low = if depth < len_min {
                    low.advance(symbol, lo[depth])
                } else {
                    Cmp::Above
                };
                let next = (depth + 1, next_low, high.advance(symbol, hi[depth]));
                let to = *ids.entry(next).or_insert_with(|| {
                    frontier.push(next);
                    builder.add_state(accepting(next.0, next.1, next.2))
                });
                builder.add_transition(from, symbol as char, to);
            }
        }
        if min == 0 {
            let zero = builder.add_state(true);
            builder.add_transition(start, '0', zero);
        }
        builder.build(start)
    }
}
