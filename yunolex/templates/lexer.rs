// Runtime for lexers generated by yunolex.
//
// Everything in this file is copied verbatim into the generated source;
// the generator appends a `lexer()` function registering one `Automaton`
// per token. The file is self-contained on purpose: a generated lexer
// depends on nothing but std, and this template can be hand-edited to
// taste as long as the `Automaton` registration surface stays intact.

use std::collections::{HashMap, HashSet};
use std::error;
use std::fmt;

/// The scope every lex session starts in.
pub const OUTER_SCOPE: &str = "$";

/// Source span of a token: start line/column are fixed when the token
/// begins, end line/column advance as input is consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub sline: usize,
    pub eline: usize,
    pub scol: usize,
    pub ecol: usize,
}

impl Position {
    fn start() -> Self {
        Position { sline: 1, eline: 1, scol: 0, ecol: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(L:{}:{},C:{}:{})", self.sline, self.eline, self.scol, self.ecol)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub name: String,
    pub lexeme: String,
    pub pos: Position,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, \"{}\", {}]", self.name, self.lexeme, self.pos)
    }
}

/// No token matched, or a token declared `error` matched. Carries the
/// offending lexeme (or the declared message) and its position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub pos: Position,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid token at {}: {}", self.pos, self.message)
    }
}

impl error::Error for LexError {}

/// One registered token automaton: the DFA table plus the token's scope
/// behavior. Built with the chained registration methods below.
pub struct Automaton {
    token: String,
    start: String,
    current: String,
    transitions: HashMap<String, HashMap<char, String>>,
    finals: HashSet<String>,
    within: HashSet<String>,
    enter: HashSet<String>,
    leave: HashSet<String>,
    skip: bool,
    error: bool,
    error_msg: String,
    dead: bool,
}

impl Automaton {
    pub fn new(token: &str, start: &str) -> Self {
        Automaton {
            token: token.to_string(),
            start: start.to_string(),
            current: start.to_string(),
            transitions: HashMap::new(),
            finals: HashSet::new(),
            within: HashSet::new(),
            enter: HashSet::new(),
            leave: HashSet::new(),
            skip: false,
            error: false,
            error_msg: String::new(),
            dead: false,
        }
    }

    pub fn edges(mut self, from: &str, edges: &[(char, &str)]) -> Self {
        let row = self.transitions.entry(from.to_string()).or_default();
        for (c, to) in edges {
            row.insert(*c, to.to_string());
        }
        self
    }

    pub fn finals(mut self, finals: &[&str]) -> Self {
        self.finals = finals.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn within(mut self, scopes: &[&str]) -> Self {
        self.within = scopes.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn enter(mut self, scopes: &[&str]) -> Self {
        self.enter = scopes.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn leave(mut self, scopes: &[&str]) -> Self {
        self.leave = scopes.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    pub fn error(mut self, error: bool, message: &str) -> Self {
        self.error = error;
        self.error_msg = message.to_string();
        self
    }

    fn in_scope(&self, scope: &HashSet<String>) -> bool {
        self.within.iter().any(|s| scope.contains(s))
    }

    fn reset(&mut self) {
        self.current = self.start.clone();
        self.dead = false;
    }
}

/// The longest-match best fit of the current attempt: where it ended,
/// the token it produced, and which automaton won.
struct BestFit {
    end: usize,
    token: Token,
    winner: usize,
}

pub struct Lexer {
    automata: Vec<Automaton>,
    scope: HashSet<String>,
    best: Option<BestFit>,
    position: Position,
    text: String,
    index: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(automata: Vec<Automaton>) -> Self {
        let mut scope = HashSet::new();
        scope.insert(OUTER_SCOPE.to_string());
        Lexer {
            automata,
            scope,
            best: None,
            position: Position::start(),
            text: String::new(),
            index: 0,
            tokens: Vec::new(),
        }
    }

    /// Tokenizes `input`, longest match first. When several automata
    /// finish a match on the same byte, the earliest-registered token
    /// wins.
    pub fn lex(mut self, input: &str) -> Result<Vec<Token>, LexError> {
        let bytes = input.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i] as char;
            if c == '\n' {
                self.position.eline += 1;
                self.position.ecol = 0;
            } else {
                self.position.ecol += 1;
            }
            self.index = i;
            if self.read_char(c)? {
                // A token was accepted; resume right after its end.
                i = self.index;
            }
            i += 1;
        }
        match self.best.take() {
            None => Err(LexError { message: self.text.clone(), pos: self.position }),
            Some(best) => {
                self.accept(best)?;
                Ok(self.tokens)
            }
        }
    }

    /// Feeds one character to every in-scope automaton. Returns true when
    /// an accept happened and the input index was rewound to the end of
    /// the accepted token.
    fn read_char(&mut self, c: char) -> Result<bool, LexError> {
        self.text.push(c);
        let mut in_scope = 0usize;
        let mut dead = 0usize;
        // Reverse registration order, so on equal-length matches the
        // earliest-registered automaton overwrites the best fit last.
        for idx in (0..self.automata.len()).rev() {
            if !self.automata[idx].in_scope(&self.scope) {
                continue;
            }
            in_scope += 1;
            if self.automata[idx].dead {
                dead += 1;
                continue;
            }
            let next = {
                let a = &self.automata[idx];
                a.transitions.get(&a.current).and_then(|row| row.get(&c)).cloned()
            };
            match next {
                Some(next) => {
                    let fin = self.automata[idx].finals.contains(&next);
                    self.automata[idx].current = next;
                    if fin {
                        self.best = Some(BestFit {
                            end: self.index,
                            token: Token {
                                name: self.automata[idx].token.clone(),
                                lexeme: self.text.clone(),
                                pos: self.position,
                            },
                            winner: idx,
                        });
                    }
                }
                None => {
                    self.automata[idx].dead = true;
                    dead += 1;
                }
            }
        }
        if dead == in_scope {
            match self.best.take() {
                None => Err(LexError { message: self.text.clone(), pos: self.position }),
                Some(best) => {
                    self.accept(best)?;
                    Ok(true)
                }
            }
        } else {
            Ok(false)
        }
    }

    /// Emits or discards the best fit, applies the winner's scope
    /// mutations, rewinds to the match end, and rearms every automaton.
    fn accept(&mut self, best: BestFit) -> Result<(), LexError> {
        let winner = &self.automata[best.winner];
        let skip = winner.skip;
        let error = winner.error;
        let error_msg = winner.error_msg.clone();
        let enter: Vec<String> = winner.enter.iter().cloned().collect();
        let leave: Vec<String> = winner.leave.iter().cloned().collect();

        if !skip {
            self.tokens.push(best.token.clone());
        }
        if error {
            return Err(LexError { message: error_msg, pos: best.token.pos });
        }

        self.index = best.end;
        self.position = Position {
            sline: best.token.pos.eline,
            eline: best.token.pos.eline,
            scol: best.token.pos.ecol,
            ecol: best.token.pos.ecol,
        };
        self.text.clear();
        for s in enter {
            self.scope.insert(s);
        }
        for s in &leave {
            self.scope.remove(s);
        }
        for a in &mut self.automata {
            a.reset();
        }
        Ok(())
    }
}
