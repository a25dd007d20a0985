/*!
Serialization of compiled automata into a ready-to-build lexer source.

An emitted file is the runtime template copied verbatim, followed by a
generated `lexer()` function that registers one `Automaton` per token in
specification order. The emitter never interprets the tables it writes:
state labels are serialized exactly as the automata assigned them.
*/

use std::io::{self, Write};

use itertools::Itertools;

use crate::automata::{Automaton, Symbol};
use crate::spec::TokenSpec;

/// Target languages the generator can emit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    Rust,
}

/// The runtime preamble, embedded at build time so the installed binary
/// carries its template with it.
const RUST_TEMPLATE: &str = include_str!("../templates/lexer.rs");

/// Writes the full lexer source for `entries`, which must be minimized
/// DFAs paired with their token descriptors in specification order (the
/// generated runtime breaks ties by registration order).
pub fn emit<W: Write>(
    language: Language,
    entries: &[(TokenSpec, Automaton)],
    out: &mut W,
) -> io::Result<()> {
    match language {
        Language::Rust => emit_rust(entries, out),
    }
}

fn emit_rust<W: Write>(entries: &[(TokenSpec, Automaton)], out: &mut W) -> io::Result<()> {
    out.write_all(RUST_TEMPLATE.as_bytes())?;
    writeln!(out)?;
    writeln!(out, "/// The token automata, in specification order.")?;
    writeln!(out, "pub fn lexer() -> Lexer {{")?;
    writeln!(out, "    Lexer::new(vec![")?;
    for (token, dfa) in entries {
        let start = dfa.state(dfa.start()).label().to_string();
        writeln!(
            out,
            "        Automaton::new({}, {})",
            str_literal(&token.name),
            str_literal(&start)
        )?;
        for (_, state) in dfa.states() {
            let row = state
                .edges()
                .map(|(symbol, dest)| {
                    let byte = match symbol {
                        Symbol::Byte(b) => b,
                        // Determinization removed every epsilon edge.
                        Symbol::Epsilon => unreachable!("epsilon edge in emitted table"),
                    };
                    format!(
                        "({}, {})",
                        char_literal(byte),
                        str_literal(&dfa.state(dest).label().to_string())
                    )
                })
                .join(", ");
            if row.is_empty() {
                continue;
            }
            writeln!(
                out,
                "            .edges({}, &[{}])",
                str_literal(&state.label().to_string()),
                row
            )?;
        }
        writeln!(out, "            .finals(&[{}])", label_list(dfa))?;
        writeln!(out, "            .within(&[{}])", scope_list(&token.within))?;
        writeln!(out, "            .enter(&[{}])", scope_list(&token.enter))?;
        writeln!(out, "            .leave(&[{}])", scope_list(&token.leave))?;
        writeln!(out, "            .skip({})", token.skip)?;
        writeln!(
            out,
            "            .error({}, {}),",
            token.error,
            str_literal(&token.error_msg)
        )?;
    }
    writeln!(out, "    ])")?;
    writeln!(out, "}}")
}

fn label_list(dfa: &Automaton) -> String {
    dfa.finals()
        .iter()
        .map(|&id| str_literal(&dfa.state(id).label().to_string()))
        .join(", ")
}

fn scope_list(scopes: &std::collections::BTreeSet<String>) -> String {
    scopes.iter().map(|s| str_literal(s)).join(", ")
}

/// `Debug` formatting of strings and chars yields valid Rust literals
/// with all the escaping handled.
fn str_literal(s: &str) -> String {
    format!("{s:?}")
}

fn char_literal(b: u8) -> String {
    format!("{:?}", b as char)
}
