//! The generated-lexer runtime.
//!
//! This module is compiled from the very template the emitter copies into
//! generated sources (`templates/lexer.rs`), so the matching contract the
//! generated code ships with is the one exercised by the tests below.

include!("../templates/lexer.rs");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automata::{IdGen, Symbol};
    use crate::spec::{parse_spec, TokenSpec};

    /// Builds a runtime lexer from a specification, the same way a
    /// generated file would register its automata.
    fn compile(spec: &str) -> Lexer {
        let tokens = parse_spec(spec).unwrap();
        let mut ids = IdGen::default();
        let mut automata = Vec::new();
        for token in &tokens {
            let mut dfa = token.regex.nfa(&mut ids);
            dfa.dfaify();
            dfa.minimize();
            automata.push(runtime_automaton(token, &dfa));
        }
        Lexer::new(automata)
    }

    fn runtime_automaton(token: &TokenSpec, dfa: &crate::automata::Automaton) -> Automaton {
        let start = dfa.state(dfa.start()).label().to_string();
        let mut a = Automaton::new(&token.name, &start);
        for (_, st) in dfa.states() {
            let pairs: Vec<(char, String)> = st
                .edges()
                .map(|(sym, d)| match sym {
                    Symbol::Byte(b) => (b as char, dfa.state(d).label().to_string()),
                    Symbol::Epsilon => unreachable!("epsilon edge in a DFA"),
                })
                .collect();
            if pairs.is_empty() {
                continue;
            }
            let pairs: Vec<(char, &str)> =
                pairs.iter().map(|(c, s)| (*c, s.as_str())).collect();
            a = a.edges(&st.label().to_string(), &pairs);
        }
        let finals: Vec<String> =
            dfa.finals().iter().map(|id| dfa.state(*id).label().to_string()).collect();
        let finals: Vec<&str> = finals.iter().map(String::as_str).collect();
        let within: Vec<&str> = token.within.iter().map(String::as_str).collect();
        let enter: Vec<&str> = token.enter.iter().map(String::as_str).collect();
        let leave: Vec<&str> = token.leave.iter().map(String::as_str).collect();
        a.finals(&finals)
            .within(&within)
            .enter(&enter)
            .leave(&leave)
            .skip(token.skip)
            .error(token.error, &token.error_msg)
    }

    #[test]
    fn single_token_longest_match() {
        let tokens = compile("[A]\nregex = ab*\n").lex("abbb").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name, "A");
        assert_eq!(tokens[0].lexeme, "abbb");
        assert_eq!(tokens[0].pos, Position { sline: 1, eline: 1, scol: 0, ecol: 4 });
        assert_eq!(tokens[0].to_string(), "[A, \"abbb\", (L:1:1,C:0:4)]");
    }

    #[test]
    fn skip_tokens_are_suppressed() {
        let spec = "[D]\nregex = [0-9]+\n[W]\nregex = [ \\t]+\nskip = true\n";
        let tokens = compile(spec).lex("12 34").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, "12");
        assert_eq!(tokens[0].pos, Position { sline: 1, eline: 1, scol: 0, ecol: 2 });
        assert_eq!(tokens[1].lexeme, "34");
        assert_eq!(tokens[1].pos, Position { sline: 1, eline: 1, scol: 3, ecol: 5 });
    }

    #[test]
    fn scope_enter_and_leave() {
        let spec = "[LP]\nregex = \\(\nenter = inside\n\
                    [RP]\nregex = \\)\nleave = inside\nin = inside\n\
                    [ID]\nregex = [a-z]+\nin = $ inside\n";
        let tokens = compile(spec).lex("a(b)c").unwrap();
        let summary: Vec<(&str, &str)> = tokens
            .iter()
            .map(|t| (t.name.as_str(), t.lexeme.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![("ID", "a"), ("LP", "("), ("ID", "b"), ("RP", ")"), ("ID", "c")]
        );
    }

    #[test]
    fn out_of_scope_tokens_never_match() {
        let spec = "[RP]\nregex = \\)\nin = inside\n[ID]\nregex = [a-z]+\n";
        // `inside` was never entered, so `)` has no active automaton.
        let err = compile(spec).lex("ab)").unwrap_err();
        assert_eq!(err.message, ")");
    }

    #[test]
    fn interval_is_greedy_and_leaves_the_rest() {
        let lexer = |input: &str| compile("[A]\nregex = a{2,4}\n").lex(input);
        let tokens = lexer("aaaaaaa").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, "aaaa");
        assert_eq!(tokens[1].lexeme, "aaa");

        // Four a's are consumed greedily; the dangling fifth never
        // reaches a final state.
        let err = lexer("aaaaa").unwrap_err();
        assert_eq!(err.message, "a");
    }

    #[test]
    fn registration_order_breaks_ties() {
        let spec = "[KW]\nregex = if\n[ID]\nregex = [a-z]+\n";
        let tokens = compile(spec).lex("if").unwrap();
        assert_eq!(tokens[0].name, "KW");

        let tokens = compile(spec).lex("iff").unwrap();
        assert_eq!(tokens[0].name, "ID");
        assert_eq!(tokens[0].lexeme, "iff");
    }

    #[test]
    fn error_tokens_abort_lexing() {
        let spec = "[ID]\nregex = [a-z]+\n[BAD]\nregex = !\nerror \"bad char\"\n";
        let err = compile(spec).lex("ab!").unwrap_err();
        assert_eq!(err.message, "bad char");
    }

    #[test]
    fn unmatched_input_is_a_lex_error() {
        let err = compile("[ID]\nregex = [a-z]+\n").lex("9").unwrap_err();
        assert_eq!(err.message, "9");
        assert_eq!(err.pos, Position { sline: 1, eline: 1, scol: 0, ecol: 1 });
    }

    #[test]
    fn newlines_advance_the_position() {
        let spec = "[ID]\nregex = [a-z]+\n[NL]\nregex = \\n\nskip = true\n";
        let tokens = compile(spec).lex("ab\ncd").unwrap();
        assert_eq!(tokens[0].pos, Position { sline: 1, eline: 1, scol: 0, ecol: 2 });
        assert_eq!(tokens[1].pos, Position { sline: 2, eline: 2, scol: 0, ecol: 2 });
    }
}
