/*!
Finite automata over single-byte symbols.

States live in an arena owned by their [`Automaton`] and are referenced by
index. Composition moves whole arenas between automata, so every state has
exactly one owner at any time. Labels exist for serialization and DOT
output only; structural identity of subset-construction states is decided
by their flattened singleton membership.
*/

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::mem;

use itertools::Itertools;

mod dot;

/// Index of a state inside its owning automaton's arena.
pub type StateId = usize;

/// An edge symbol: one input byte, or the epsilon marker consumed without
/// reading input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    Byte(u8),
    Epsilon,
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Byte(b) => write!(f, "{}", *b as char),
            Symbol::Epsilon => write!(f, "ε"),
        }
    }
}

/// A state label. Singletons are minted from a counter and render as
/// `q<n>`; subset-construction states carry their flattened, sorted
/// singleton membership and render as `S_<members>_`.
///
/// Keeping the membership as numbers rather than a concatenated string
/// makes equality collision-free regardless of how the numbers print.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Label {
    Singleton(u64),
    Subset(Vec<u64>),
}

impl Label {
    fn members(&self) -> Vec<u64> {
        match self {
            Label::Singleton(n) => vec![*n],
            Label::Subset(v) => v.clone(),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Singleton(n) => write!(f, "q{n}"),
            Label::Subset(v) => {
                write!(f, "S_{}_", v.iter().map(|n| format!("q{n}")).join(""))
            }
        }
    }
}

/// Mints fresh singleton labels. One generator is threaded through a whole
/// generation run so labels stay unique across every automaton it touches.
#[derive(Debug, Default)]
pub struct IdGen {
    next: u64,
}

impl IdGen {
    pub fn fresh(&mut self) -> Label {
        let label = Label::Singleton(self.next);
        self.next += 1;
        label
    }
}

/// A single automaton state: label, finality, and the outgoing edge set.
///
/// Edges are keyed by (symbol, destination); inserting a duplicate is a
/// no-op.
#[derive(Clone, Debug)]
pub struct State {
    label: Label,
    fin: bool,
    edges: BTreeSet<(Symbol, StateId)>,
}

impl State {
    fn new(label: Label, fin: bool) -> Self {
        State { label, fin, edges: BTreeSet::new() }
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn is_final(&self) -> bool {
        self.fin
    }

    pub fn edges(&self) -> impl Iterator<Item = (Symbol, StateId)> + '_ {
        self.edges.iter().copied()
    }
}

/// The remapped start and final states of an automaton moved into another
/// by [`Automaton::absorb`].
pub struct Moved {
    pub start: StateId,
    pub finals: Vec<StateId>,
}

/// A finite automaton: a start state and the arena of states it owns,
/// with the final states maintained as a projection.
#[derive(Clone, Debug)]
pub struct Automaton {
    states: Vec<State>,
    start: StateId,
    finals: BTreeSet<StateId>,
}

impl Automaton {
    /// A new automaton owning a single start state.
    pub fn with_start(fin: bool, ids: &mut IdGen) -> Self {
        let mut a = Automaton { states: Vec::new(), start: 0, finals: BTreeSet::new() };
        a.add_state(fin, ids);
        a
    }

    /// Mints a fresh singleton state and takes ownership of it.
    pub fn add_state(&mut self, fin: bool, ids: &mut IdGen) -> StateId {
        let id = self.states.len();
        self.states.push(State::new(ids.fresh(), fin));
        if fin {
            self.finals.insert(id);
        }
        id
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &State)> {
        self.states.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn finals(&self) -> &BTreeSet<StateId> {
        &self.finals
    }

    /// Inserts an edge; duplicates are a no-op.
    pub fn add_edge(&mut self, from: StateId, symbol: Symbol, to: StateId) {
        self.states[from].edges.insert((symbol, to));
    }

    pub fn set_final(&mut self, id: StateId, fin: bool) {
        self.states[id].fin = fin;
        if fin {
            self.finals.insert(id);
        } else {
            self.finals.remove(&id);
        }
    }

    /// Marks every final state non-final and empties the projection.
    pub fn clear_final(&mut self) {
        for id in mem::take(&mut self.finals) {
            self.states[id].fin = false;
        }
    }

    /// The deterministic successor of `id` on `symbol`, if any. Meaningful
    /// once the automaton has been determinized; on an NFA it returns the
    /// first matching edge.
    pub fn step(&self, id: StateId, symbol: Symbol) -> Option<StateId> {
        self.states[id].edges.iter().find(|&&(s, _)| s == symbol).map(|&(_, d)| d)
    }

    /// Whether the automaton accepts `input`, stepping deterministically
    /// from the start state.
    pub fn accepts(&self, input: &[u8]) -> bool {
        let mut cur = self.start;
        for &b in input {
            match self.step(cur, Symbol::Byte(b)) {
                Some(next) => cur = next,
                None => return false,
            }
        }
        self.states[cur].fin
    }

    /// Takes ownership of all of `other`'s states, adding its finals to
    /// the projection. Returns `other`'s start and finals remapped into
    /// this automaton's arena.
    pub fn absorb(&mut self, other: Automaton) -> Moved {
        let offset = self.states.len();
        let mut finals = Vec::with_capacity(other.finals.len());
        for (i, mut st) in other.states.into_iter().enumerate() {
            st.edges = st.edges.into_iter().map(|(s, d)| (s, d + offset)).collect();
            if st.fin {
                self.finals.insert(offset + i);
                finals.push(offset + i);
            }
            self.states.push(st);
        }
        Moved { start: other.start + offset, finals }
    }

    /// Concatenates `other` onto this automaton: an ε-edge from every
    /// current final state to `other`'s start, current finality cleared,
    /// `other`'s states subsumed.
    pub fn concat_subsume(&mut self, other: Automaton) {
        let old_finals: Vec<StateId> = self.finals.iter().copied().collect();
        self.clear_final();
        let moved = self.absorb(other);
        for f in old_finals {
            self.add_edge(f, Symbol::Epsilon, moved.start);
        }
    }

    /// The ε-closure of `id`: reflexive-transitive closure restricted to
    /// epsilon edges.
    fn epsilon_closure(&self, id: StateId) -> BTreeSet<StateId> {
        let mut closure = BTreeSet::new();
        let mut todo = vec![id];
        closure.insert(id);
        while let Some(s) = todo.pop() {
            for &(sym, d) in &self.states[s].edges {
                if sym == Symbol::Epsilon && closure.insert(d) {
                    todo.push(d);
                }
            }
        }
        closure
    }

    /// Eliminates all ε-edges. Each state becomes final iff its ε-closure
    /// contains a final state, and its outgoing edges become the non-ε
    /// edges of every closure member. Unreachable states are pruned.
    pub fn remove_epsilon_transitions(&mut self) {
        let n = self.states.len();
        let mut new_edges = Vec::with_capacity(n);
        let mut new_final = vec![false; n];
        for s in 0..n {
            let closure = self.epsilon_closure(s);
            new_final[s] = closure.iter().any(|&u| self.states[u].fin);
            let mut edges = BTreeSet::new();
            for &u in &closure {
                for &(sym, d) in &self.states[u].edges {
                    if sym != Symbol::Epsilon {
                        edges.insert((sym, d));
                    }
                }
            }
            new_edges.push(edges);
        }
        self.finals.clear();
        for (s, (edges, fin)) in new_edges.into_iter().zip(new_final).enumerate() {
            self.states[s].edges = edges;
            self.states[s].fin = fin;
            if fin {
                self.finals.insert(s);
            }
        }
        self.prune_unreachable();
    }

    fn prune_unreachable(&mut self) {
        let mut reachable = vec![false; self.states.len()];
        let mut todo = vec![self.start];
        reachable[self.start] = true;
        while let Some(s) = todo.pop() {
            for &(_, d) in &self.states[s].edges {
                if !reachable[d] {
                    reachable[d] = true;
                    todo.push(d);
                }
            }
        }
        if reachable.iter().all(|&r| r) {
            return;
        }

        let mut remap = vec![usize::MAX; self.states.len()];
        let mut next = 0;
        for (i, &r) in reachable.iter().enumerate() {
            if r {
                remap[i] = next;
                next += 1;
            }
        }
        let old = mem::take(&mut self.states);
        self.states = old
            .into_iter()
            .enumerate()
            .filter(|&(i, _)| reachable[i])
            .map(|(_, mut st)| {
                st.edges = st.edges.into_iter().map(|(s, d)| (s, remap[d])).collect();
                st
            })
            .collect();
        self.start = remap[self.start];
        self.finals = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, st)| st.fin)
            .map(|(i, _)| i)
            .collect();
    }

    /// Determinizes the automaton: ε-elimination followed by the classical
    /// subset construction. All state ownership is replaced by the newly
    /// generated set-states; set-states with identical membership are
    /// reused. Membership is flattened down to singleton labels, so
    /// determinizing twice cannot nest sets.
    pub fn dfaify(&mut self) {
        self.remove_epsilon_transitions();

        let mut index: HashMap<Vec<StateId>, StateId> = HashMap::new();
        let mut subsets: Vec<Vec<StateId>> = Vec::new();
        let mut tables: Vec<BTreeSet<(Symbol, StateId)>> = Vec::new();

        let start_set = vec![self.start];
        index.insert(start_set.clone(), 0);
        subsets.push(start_set);
        tables.push(BTreeSet::new());

        let mut worklist = vec![0];
        while let Some(cur) = worklist.pop() {
            let members = subsets[cur].clone();
            let mut by_symbol: BTreeMap<Symbol, BTreeSet<StateId>> = BTreeMap::new();
            for m in members {
                for &(sym, d) in &self.states[m].edges {
                    by_symbol.entry(sym).or_default().insert(d);
                }
            }
            for (sym, dests) in by_symbol {
                let key: Vec<StateId> = dests.into_iter().collect();
                let id = match index.get(&key) {
                    Some(&id) => id,
                    None => {
                        let id = subsets.len();
                        index.insert(key.clone(), id);
                        subsets.push(key);
                        tables.push(BTreeSet::new());
                        worklist.push(id);
                        id
                    }
                };
                tables[cur].insert((sym, id));
            }
        }

        let mut states = Vec::with_capacity(subsets.len());
        let mut finals = BTreeSet::new();
        for (id, (members, edges)) in subsets.iter().zip(tables).enumerate() {
            let fin = members.iter().any(|&m| self.states[m].fin);
            let labels: BTreeSet<u64> =
                members.iter().flat_map(|&m| self.states[m].label.members()).collect();
            states.push(State {
                label: Label::Subset(labels.into_iter().collect()),
                fin,
                edges,
            });
            if fin {
                finals.insert(id);
            }
        }
        self.states = states;
        self.start = 0;
        self.finals = finals;
    }

    /// Merges semantically equivalent states until a fixed point: incoming
    /// edges of the dropped state are redirected to its surviving twin,
    /// and the start state is never dropped.
    ///
    /// This is an approximation of canonical partition refinement; it is
    /// exact enough for the small automata a token specification yields.
    pub fn minimize(&mut self) {
        loop {
            let mut merged = false;
            'scan: for s1 in 0..self.states.len() {
                for s2 in 0..self.states.len() {
                    if s2 == self.start || s1 == s2 {
                        continue;
                    }
                    let mut seen = BTreeSet::new();
                    if self.semantically_equivalent(s1, s2, &mut seen) {
                        self.merge_into(s1, s2);
                        merged = true;
                        break 'scan;
                    }
                }
            }
            if !merged {
                break;
            }
        }
    }

    /// Recursive equivalence on a determinized automaton: same finality
    /// and pointwise-equivalent successors, with the loop exceptions
    /// (`a→ᵃa` matches `b→ᵃb`, and `a→ᵃb` matches `b→ᵃa`). A seen-pair
    /// set bounds the recursion on cyclic automata.
    fn semantically_equivalent(
        &self,
        a: StateId,
        b: StateId,
        seen: &mut BTreeSet<(StateId, StateId)>,
    ) -> bool {
        if a == b {
            return true;
        }
        if self.states[a].fin != self.states[b].fin {
            return false;
        }
        if !seen.insert((a.min(b), a.max(b))) {
            return true;
        }
        for &(sym, ad) in &self.states[a].edges {
            let bd = self.step(b, sym);
            if ad == a && bd == Some(b) {
                continue;
            }
            if ad == b && bd == Some(a) {
                continue;
            }
            match bd {
                Some(bd) if self.semantically_equivalent(ad, bd, seen) => {}
                _ => return false,
            }
        }
        for &(sym, bd) in &self.states[b].edges {
            let ad = self.step(a, sym);
            if bd == b && ad == Some(a) {
                continue;
            }
            if bd == a && ad == Some(b) {
                continue;
            }
            match ad {
                Some(ad) if self.semantically_equivalent(ad, bd, seen) => {}
                _ => return false,
            }
        }
        true
    }

    fn merge_into(&mut self, keep: StateId, drop: StateId) {
        for st in &mut self.states {
            st.edges = st
                .edges
                .iter()
                .map(|&(sym, d)| {
                    let d = if d == drop { keep } else { d };
                    (sym, if d > drop { d - 1 } else { d })
                })
                .collect();
        }
        self.states.remove(drop);
        if self.start > drop {
            self.start -= 1;
        }
        self.finals = self
            .states
            .iter()
            .enumerate()
            .filter(|(_, st)| st.fin)
            .map(|(i, _)| i)
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::parser::RegexParser;

    fn dfa(pattern: &str) -> Automaton {
        let mut ids = IdGen::default();
        let mut a = RegexParser::parse(pattern, 1, 1).unwrap().nfa(&mut ids);
        a.dfaify();
        a
    }

    #[test]
    fn epsilon_closure_finality() {
        let mut ids = IdGen::default();
        let mut a = Automaton::with_start(false, &mut ids);
        let mid = a.add_state(false, &mut ids);
        let end = a.add_state(true, &mut ids);
        a.add_edge(a.start(), Symbol::Epsilon, mid);
        a.add_edge(mid, Symbol::Epsilon, end);
        a.remove_epsilon_transitions();
        assert!(a.state(a.start()).is_final());
        assert!(a.finals().contains(&a.start()));
    }

    #[test]
    fn epsilon_removal_prunes_unreachable() {
        let mut ids = IdGen::default();
        let mut a = Automaton::with_start(false, &mut ids);
        let end = a.add_state(true, &mut ids);
        a.add_edge(a.start(), Symbol::Epsilon, end);
        a.add_edge(end, Symbol::Byte(b'x'), end);
        a.remove_epsilon_transitions();
        // The epsilon edge is gone but the start state inherited the `x`
        // edge from its closure, so every remaining state is reachable.
        let mut reachable = vec![a.start()];
        let mut todo = vec![a.start()];
        while let Some(s) = todo.pop() {
            for (_, d) in a.state(s).edges() {
                if !reachable.contains(&d) {
                    reachable.push(d);
                    todo.push(d);
                }
            }
        }
        for (id, _) in a.states() {
            assert!(reachable.contains(&id));
        }
        assert!(a.accepts(b""));
        assert!(a.accepts(b"xxx"));
    }

    #[test]
    fn dfaify_is_deterministic() {
        let a = dfa("(a|b)*abb");
        for (id, st) in a.states() {
            let mut symbols = BTreeSet::new();
            for (sym, _) in st.edges() {
                assert_ne!(sym, Symbol::Epsilon, "epsilon left in state {id}");
                assert!(symbols.insert(sym), "two edges on {sym} out of state {id}");
            }
        }
        assert!(a.accepts(b"abb"));
        assert!(a.accepts(b"aababb"));
        assert!(!a.accepts(b"ab"));
    }

    #[test]
    fn finality_projection_consistent() {
        let a = dfa("a?b+");
        for (id, st) in a.states() {
            assert_eq!(st.is_final(), a.finals().contains(&id));
        }
    }

    #[test]
    fn subset_labels_are_flattened() {
        let a = dfa("a|ab");
        for (_, st) in a.states() {
            match st.label() {
                Label::Subset(members) => {
                    assert!(members.windows(2).all(|w| w[0] < w[1]));
                }
                Label::Singleton(_) => panic!("singleton survived dfaify"),
            }
        }
    }

    #[test]
    fn minimize_merges_equivalent_states() {
        let mut a = dfa("a|a");
        let before = a.len();
        a.minimize();
        assert!(a.len() <= before);
        assert_eq!(a.len(), 2);
        assert!(a.accepts(b"a"));
        assert!(!a.accepts(b"aa"));
        assert!(!a.accepts(b""));
    }

    #[test]
    fn minimize_is_a_fixed_point() {
        let mut a = dfa("(a|b)*abb");
        a.minimize();
        let settled = a.len();
        a.minimize();
        assert_eq!(a.len(), settled);
        assert!(a.accepts(b"abb"));
        assert!(a.accepts(b"bbabb"));
        assert!(!a.accepts(b"ba"));
    }

    #[test]
    fn minimize_keeps_self_loops() {
        let mut a = dfa("a*");
        a.minimize();
        assert!(a.accepts(b""));
        assert!(a.accepts(b"a"));
        assert!(a.accepts(b"aaaa"));
        assert!(!a.accepts(b"b"));
    }

    #[test]
    fn concat_subsume_chains_languages() {
        let mut ids = IdGen::default();
        let mut a = RegexParser::parse("ab", 1, 1).unwrap().nfa(&mut ids);
        let b = RegexParser::parse("cd", 1, 1).unwrap().nfa(&mut ids);
        a.concat_subsume(b);
        a.dfaify();
        assert!(a.accepts(b"abcd"));
        assert!(!a.accepts(b"ab"));
        assert!(!a.accepts(b"cd"));
    }
}
