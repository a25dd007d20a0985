/*!
A table-driven lexer generator.

yunolex reads a declarative token specification and emits a standalone
Rust lexer: each token's regex is parsed into a tree, folded into an
ε-NFA Thompson-style, determinized by subset construction, minimized, and
finally serialized as a transition table spliced under a fixed runtime
template. The generated lexer matches all tokens in parallel with
longest-match semantics, scope-gated token activation, and
registration-order tie-breaking.

## Specification format

One directive per line; a `[name]` header opens a token:

```text
[INT]
regex = [0-9]+
[WS]
regex = [ \t\n]+
skip = true
[LPAREN]
regex = \(
enter = expr
```

Tokens may be restricted to scopes (`in = …`) and mutate the active scope
set on match (`enter = …`, `leave = …`); the distinguished outer scope is
`$`. `skip` suppresses emission and `error "msg"` turns a match into a
lexing failure.

## Usage

```
use yunolex::Generator;

let spec = "[INT]\nregex = [0-9]+\n[WS]\nregex = [ \t]+\nskip = true\n";
let mut out = Vec::new();
Generator::builder().build().generate(spec, &mut out).unwrap();
let source = String::from_utf8(out).unwrap();
assert!(source.contains("pub fn lexer()"));
```
*/

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use bon::Builder;
use thiserror::Error;

pub mod automata;
pub mod emit;
pub mod regex;
pub mod runtime;
pub mod spec;

use automata::IdGen;
use emit::Language;

/// Everything that can go wrong while generating a lexer.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Spec(#[from] spec::SpecError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The generation pipeline: specification text in, lexer source out.
#[derive(Builder, Debug)]
pub struct Generator {
    #[builder(default = Language::Rust)]
    language: Language,
    /// When set, each token's minimized DFA is also written to
    /// `<dot_dir>/<token>.dot` for inspection.
    dot_dir: Option<PathBuf>,
}

impl Generator {
    /// Compiles every token of `spec_text` down to a minimized DFA and
    /// emits the lexer source to `out`. A single label generator spans
    /// the run, so state labels are unique across all tokens.
    pub fn generate(&self, spec_text: &str, out: &mut impl Write) -> Result<(), Error> {
        let tokens = spec::parse_spec(spec_text)?;
        let mut ids = IdGen::default();
        let mut entries = Vec::with_capacity(tokens.len());
        for token in tokens {
            let mut dfa = token.regex.nfa(&mut ids);
            log::debug!(
                "token {}: {} NFA states for /{}/",
                token.name,
                dfa.len(),
                token.pattern
            );
            dfa.dfaify();
            dfa.minimize();
            log::debug!("token {}: {} DFA states after minimization", token.name, dfa.len());
            if let Some(dir) = &self.dot_dir {
                let mut file = File::create(dir.join(format!("{}.dot", token.name)))?;
                dfa.dot(&mut file)?;
            }
            entries.push((token, dfa));
        }
        emit::emit(self.language, &entries, out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_a_complete_source_file() {
        let spec = "[INT]\nregex = [0-9]+\n[WS]\nregex = [ \\t\\n]+\nskip = true\n";
        let mut out = Vec::new();
        Generator::builder().build().generate(spec, &mut out).unwrap();
        let source = String::from_utf8(out).unwrap();
        assert!(source.contains("pub struct Lexer"));
        assert!(source.contains("Automaton::new(\"INT\""));
        assert!(source.contains("Automaton::new(\"WS\""));
        assert!(source.contains("pub fn lexer() -> Lexer {"));
    }

    #[test]
    fn spec_problems_surface_as_errors() {
        let mut out = Vec::new();
        let err = Generator::builder().build().generate("[A]\nregex = (\n", &mut out);
        match err {
            Err(Error::Spec(e)) => assert!(!e.diagnostics.is_empty()),
            other => panic!("expected a spec error, got {other:?}"),
        }
    }
}
