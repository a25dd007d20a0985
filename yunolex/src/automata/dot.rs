//! GraphViz output for debugging automata.

use std::io::{self, Write};

use super::{Automaton, Symbol};

impl Automaton {
    /// Writes the automaton in DOT format. Final states are drawn with a
    /// double circle and an unlabeled arrow marks the start state.
    pub fn dot(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "digraph automaton {{")?;
        writeln!(out, "\ts [shape=none,label=\"\"]")?;
        for (_, state) in self.states() {
            let shape = if state.is_final() { "doublecircle" } else { "circle" };
            writeln!(out, "\t{} [shape={}]", state.label(), shape)?;
        }
        writeln!(out, "\ts -> {} []", self.state(self.start()).label())?;
        for (_, state) in self.states() {
            for (symbol, dest) in state.edges() {
                let label = match symbol {
                    Symbol::Byte(b'\\') => "\\\\".to_string(),
                    Symbol::Byte(b'"') => "\\\"".to_string(),
                    other => other.to_string(),
                };
                writeln!(
                    out,
                    "\t{} -> {} [label=\"{}\"]",
                    state.label(),
                    self.state(dest).label(),
                    label
                )?;
            }
        }
        writeln!(out, "}}")
    }
}
