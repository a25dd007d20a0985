/*!
Token specification files.

The format is line oriented. A `[name]` line opens a token; the lines
until the next header assign its fields:

```text
[INT]
regex = [0-9]+
in = $
[WS]
regex = [ \t\n]+
skip = true
[LPAREN]
regex = \(
enter = expr
```

A malformed line produces a diagnostic and the current token is dropped,
skipping ahead to the next `[…]` header; parsing keeps going so every
problem is reported, then fails as a whole if anything was wrong.
*/

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::regex::parser::RegexParser;
use crate::regex::Regex;

/// The distinguished scope every lexer starts in. Tokens that name no
/// `in` scopes are active here.
pub const OUTER_SCOPE: &str = "$";

/// One token read from a specification file.
#[derive(Clone, Debug)]
pub struct TokenSpec {
    pub name: String,
    pub regex: Regex,
    /// The regex as written, kept for logging.
    pub pattern: String,
    /// Scopes the token is active in (the `in` field).
    pub within: BTreeSet<String>,
    /// Scopes added to the active set when this token matches.
    pub enter: BTreeSet<String>,
    /// Scopes removed from the active set when this token matches.
    pub leave: BTreeSet<String>,
    /// Matches are dropped instead of emitted.
    pub skip: bool,
    /// Matching this token aborts lexing.
    pub error: bool,
    pub error_msg: String,
}

/// A single problem found in a specification file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{},{}]", self.message, self.line, self.col)
    }
}

/// The specification was malformed; every collected problem is attached.
#[derive(Clone, Debug, Error)]
#[error("token specification parsing failed")]
pub struct SpecError {
    pub diagnostics: Vec<Diagnostic>,
}

/// A token under construction, before boundary validation.
#[derive(Debug, Default)]
struct Draft {
    name: String,
    line: usize,
    regex: Option<(String, Regex)>,
    within: BTreeSet<String>,
    enter: BTreeSet<String>,
    leave: BTreeSet<String>,
    skip: bool,
    error: bool,
    error_msg: String,
}

impl Draft {
    /// Boundary validation: a token must carry a regex, and an empty
    /// `in` set defaults to the outer scope.
    fn finish(mut self, diagnostics: &mut Vec<Diagnostic>) -> Option<TokenSpec> {
        let (pattern, regex) = match self.regex {
            Some(r) => r,
            None => {
                diagnostics.push(Diagnostic {
                    message: format!(
                        "{} does not have a regular expression specification",
                        self.name
                    ),
                    line: self.line,
                    col: 1,
                });
                return None;
            }
        };
        if self.within.is_empty() {
            self.within.insert(OUTER_SCOPE.to_string());
            log::debug!("added {OUTER_SCOPE} to scopes of token {}", self.name);
        }
        Some(TokenSpec {
            name: self.name,
            regex,
            pattern,
            within: self.within,
            enter: self.enter,
            leave: self.leave,
            skip: self.skip,
            error: self.error,
            error_msg: self.error_msg,
        })
    }
}

/// Parses a whole specification file into token descriptors, in file
/// order. File order matters downstream: it is the registration order the
/// generated lexer breaks ties with.
pub fn parse_spec(input: &str) -> Result<Vec<TokenSpec>, SpecError> {
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();
    let mut draft: Option<Draft> = None;
    // Set when the current token is damaged: its remaining field lines
    // are ignored until the next header.
    let mut skipping = false;

    for (idx, raw) in input.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line.strip_prefix('[') {
            // A damaged token was already reported; drop it silently.
            if let Some(done) = draft.take() {
                if !skipping {
                    if let Some(token) = done.finish(&mut diagnostics) {
                        tokens.push(token);
                    }
                }
            }
            skipping = false;
            match name.strip_suffix(']') {
                Some(name) => {
                    log::debug!("created token {name}");
                    draft = Some(Draft {
                        name: name.to_string(),
                        line: lineno,
                        ..Draft::default()
                    });
                }
                None => {
                    diagnostics.push(Diagnostic {
                        message: "expected ']'".to_string(),
                        line: lineno,
                        col: line.len(),
                    });
                    skipping = true;
                }
            }
            continue;
        }

        if skipping {
            continue;
        }
        let current = match draft.as_mut() {
            Some(d) => d,
            None => {
                diagnostics.push(Diagnostic {
                    message: format!("field outside of any token: {line}"),
                    line: lineno,
                    col: 1,
                });
                skipping = true;
                continue;
            }
        };

        if line.starts_with("regex") {
            match field_value(line) {
                Some((col, value)) => {
                    match RegexParser::parse(value, lineno, col) {
                        Ok(regex) => {
                            log::debug!("regex {value} -> {regex}");
                            current.regex = Some((value.to_string(), regex));
                        }
                        Err(err) => {
                            diagnostics.push(Diagnostic {
                                message: err.to_string(),
                                line: lineno,
                                col,
                            });
                            skipping = true;
                        }
                    }
                }
                None => {
                    missing_assignment(&mut diagnostics, lineno, line);
                    skipping = true;
                }
            }
        } else if line.starts_with("in") {
            skipping = !scope_field(line, &mut current.within, &mut diagnostics, lineno);
            if current.within.is_empty() && !skipping {
                diagnostics.push(Diagnostic {
                    message: "tokens must be within at least 1 scope".to_string(),
                    line: lineno,
                    col: 1,
                });
                skipping = true;
            }
        } else if line.starts_with("enter") {
            skipping = !scope_field(line, &mut current.enter, &mut diagnostics, lineno);
        } else if line.starts_with("leave") {
            skipping = !scope_field(line, &mut current.leave, &mut diagnostics, lineno);
        } else if line.starts_with("skip") {
            match field_value(line) {
                Some((_, "true")) => current.skip = true,
                Some((_, "false")) => current.skip = false,
                Some((col, other)) => {
                    diagnostics.push(Diagnostic {
                        message: format!("expected true or false, found {other}"),
                        line: lineno,
                        col,
                    });
                    skipping = true;
                }
                None => {
                    missing_assignment(&mut diagnostics, lineno, line);
                    skipping = true;
                }
            }
        } else if line.starts_with("error") {
            current.error = true;
            match error_message(line) {
                Some(msg) => current.error_msg = msg.to_string(),
                None => {
                    diagnostics.push(Diagnostic {
                        message: "error message must be enclosed in quotation marks"
                            .to_string(),
                        line: lineno,
                        col: line.len(),
                    });
                    skipping = true;
                }
            }
        } else {
            diagnostics.push(Diagnostic {
                message: format!("unrecognized directive: {line}"),
                line: lineno,
                col: 1,
            });
            skipping = true;
        }
    }

    if let Some(done) = draft.take() {
        if !skipping {
            if let Some(token) = done.finish(&mut diagnostics) {
                tokens.push(token);
            }
        }
    }

    if diagnostics.is_empty() {
        Ok(tokens)
    } else {
        Err(SpecError { diagnostics })
    }
}

/// Splits a `name = value` line, returning the 1-based column where the
/// value starts and the trimmed value.
fn field_value(line: &str) -> Option<(usize, &str)> {
    let eq = line.find('=')?;
    let value = line[eq + 1..].trim();
    let col = line[eq + 1..].find(value.chars().next().unwrap_or(' ')).unwrap_or(0) + eq + 2;
    Some((col, value))
}

fn missing_assignment(diagnostics: &mut Vec<Diagnostic>, line: usize, text: &str) {
    diagnostics.push(Diagnostic {
        message: format!("expected '=' in field: {text}"),
        line,
        col: 1,
    });
}

/// Parses a space-separated scope list into `set`. Returns false if the
/// field was malformed.
fn scope_field(
    line: &str,
    set: &mut BTreeSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
    lineno: usize,
) -> bool {
    match field_value(line) {
        Some((_, value)) => {
            set.extend(value.split_whitespace().map(str::to_string));
            true
        }
        None => {
            missing_assignment(diagnostics, lineno, line);
            false
        }
    }
}

/// Extracts the quoted message from an `error "msg"` line.
fn error_message(line: &str) -> Option<&str> {
    let open = line.find('"')?;
    if !line.ends_with('"') || open == line.len() - 1 {
        return None;
    }
    Some(&line[open + 1..line.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_readme_example() {
        let spec = "[INT]\nregex = [0-9]+\nin = $\n[WS]\nregex = [ \\t\\n]+\nskip = true\n[LPAREN]\nregex = \\(\nenter = expr\n";
        let tokens = parse_spec(spec).unwrap();
        assert_eq!(tokens.len(), 3);

        assert_eq!(tokens[0].name, "INT");
        assert_eq!(tokens[0].within, [OUTER_SCOPE.to_string()].into_iter().collect());
        assert!(!tokens[0].skip);

        assert_eq!(tokens[1].name, "WS");
        assert!(tokens[1].skip);

        assert_eq!(tokens[2].name, "LPAREN");
        assert_eq!(tokens[2].enter, ["expr".to_string()].into_iter().collect());
        // Tokens with no `in` field default to the outer scope.
        assert_eq!(tokens[2].within, [OUTER_SCOPE.to_string()].into_iter().collect());
    }

    #[test]
    fn error_token_fields() {
        let spec = "[BAD]\nregex = !\nerror \"bad char\"\n";
        let tokens = parse_spec(spec).unwrap();
        assert!(tokens[0].error);
        assert_eq!(tokens[0].error_msg, "bad char");
    }

    #[test]
    fn missing_regex_is_fatal_at_eof() {
        let err = parse_spec("[A]\nskip = true\n").unwrap_err();
        assert_eq!(err.diagnostics.len(), 1);
        assert!(err.diagnostics[0].message.contains("regular expression"));
    }

    #[test]
    fn bad_regex_skips_token_but_keeps_parsing() {
        let spec = "[A]\nregex = (a\n[B]\nregex = b\n";
        let err = parse_spec(spec).unwrap_err();
        assert_eq!(err.diagnostics.len(), 1);
        assert!(err.diagnostics[0].message.contains(')'));
        assert_eq!(err.diagnostics[0].line, 2);
    }

    #[test]
    fn malformed_header() {
        let err = parse_spec("[A\nregex = a\n").unwrap_err();
        assert!(err.diagnostics[0].message.contains("']'"));
    }

    #[test]
    fn unterminated_error_message() {
        let err = parse_spec("[A]\nregex = a\nerror \"oops\n").unwrap_err();
        assert!(err.diagnostics[0].message.contains("quotation"));
    }

    #[test]
    fn unknown_directive() {
        let err = parse_spec("[A]\nregex = a\nfrobnicate = 1\n").unwrap_err();
        assert!(err.diagnostics[0].message.contains("unrecognized"));
    }

    #[test]
    fn field_before_any_token() {
        let err = parse_spec("regex = a\n").unwrap_err();
        assert!(err.diagnostics[0].message.contains("outside"));
    }

    #[test]
    fn regex_may_contain_equals_signs() {
        let tokens = parse_spec("[EQ]\nregex = a=b\n").unwrap();
        assert_eq!(tokens[0].pattern, "a=b");
    }

    #[test]
    fn skip_accepts_only_booleans() {
        let err = parse_spec("[A]\nregex = a\nskip = maybe\n").unwrap_err();
        assert!(err.diagnostics[0].message.contains("true or false"));
    }
}
