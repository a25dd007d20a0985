/*!
Recursive-descent regex parser.

Grammar:

```text
regex      := concat ('|' regex)?
concat     := basic (concat)?
basic      := elem (postfix)*
postfix    := '*' | '+' | '?' | interval
elem       := '(' regex ')' | charSelect | '.' | escape | literal
interval   := '{' digits (',' digits?)? '}'
charSelect := '[' '^'? classItem* ']'
escape     := '\' any            // 'n' → LF, 't' → TAB, else literal
```

Repetition postfixes are simplified eagerly while parsing (`a+?` never
builds a `Question` around a `Plus`, it becomes `a*` on the spot), so the
trees handed to the NFA fold are already in reduced form and re-parsing a
reduced spelling yields the identical tree.
*/

use std::collections::BTreeSet;

use thiserror::Error;

use super::{extended_wildcard_set, Regex};

/// Regex syntax errors. Line and column locate the failure in the token
/// specification file the regex was read from.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected EOF [{line},{col}]")]
    UnexpectedEof { line: usize, col: usize },
    #[error("invalid group, expected ')' [{line},{col}]")]
    ExpectedRParen { line: usize, col: usize },
    #[error("unexpected '{found}', expected digit [{line},{col}]")]
    ExpectedDigit { found: char, line: usize, col: usize },
    #[error("bad range: {lo}-{hi} [{line},{col}]")]
    BadRange { lo: char, hi: char, line: usize, col: usize },
    #[error("bad regex, expected alternation or eof [{line},{col}]")]
    BadAlternationOrEof { line: usize, col: usize },
}

/// Bounds read from a `{…}` interval. `upper == None` means no upper
/// bound was written (`{n}` and `{n,}` both leave it unset; the comma
/// flag tells them apart).
struct IntervalData {
    lower: u32,
    upper: Option<u32>,
    comma: bool,
}

impl IntervalData {
    fn upper_bound(&self) -> Option<u32> {
        if self.comma {
            self.upper
        } else {
            Some(self.lower)
        }
    }
}

pub struct RegexParser<'a> {
    input: &'a [u8],
    index: usize,
    line: usize,
    col: usize,
}

impl<'a> RegexParser<'a> {
    /// Parses `input` into a regex tree. `line` and `col` locate the
    /// regex text inside the specification file; the column advances with
    /// consumption so errors point at the offending byte.
    pub fn parse(input: &'a str, line: usize, col: usize) -> Result<Regex, ParseError> {
        let mut p = RegexParser { input: input.as_bytes(), index: 0, line, col };
        if p.input.is_empty() {
            return Err(p.eof());
        }
        let re = p.regex()?;
        if p.index != p.input.len() {
            return Err(ParseError::BadAlternationOrEof { line: p.line, col: p.col });
        }
        Ok(re)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.index).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek();
        if b.is_some() {
            self.index += 1;
            self.col += 1;
        }
        b
    }

    fn eof(&self) -> ParseError {
        ParseError::UnexpectedEof { line: self.line, col: self.col }
    }

    fn regex(&mut self) -> Result<Regex, ParseError> {
        let re = self.concat()?;
        log::trace!("regex got {re} from concat");
        match self.peek() {
            None | Some(b')') => Ok(re),
            Some(b'|') => {
                self.bump();
                Ok(Regex::Alt(Box::new(re), Box::new(self.regex()?)))
            }
            Some(_) => {
                Err(ParseError::BadAlternationOrEof { line: self.line, col: self.col })
            }
        }
    }

    fn concat(&mut self) -> Result<Regex, ParseError> {
        let re = self.basic()?;
        match self.peek() {
            None | Some(b'|') | Some(b')') => Ok(re),
            Some(_) => Ok(Regex::Concat(Box::new(re), Box::new(self.concat()?))),
        }
    }

    fn basic(&mut self) -> Result<Regex, ParseError> {
        let mut elem = self.elem()?;
        while let Some(op @ (b'*' | b'+' | b'?' | b'{')) = self.peek() {
            self.bump();
            elem = self.postfix(elem, op)?;
        }
        Ok(elem)
    }

    /// Applies one postfix operator, simplifying eagerly. The rewrite
    /// rules collapse stacked repetitions (`a+* == a*`, `a?? == a?`,
    /// `a+{0,3} == a*`, …) so equivalent spellings produce one tree.
    fn postfix(&mut self, elem: Regex, op: u8) -> Result<Regex, ParseError> {
        Ok(match elem {
            // Star absorbs every further repetition.
            Regex::Star(body) => {
                if op == b'{' {
                    self.interval_data()?;
                }
                Regex::Star(body)
            }
            Regex::Plus(body) => match op {
                b'*' => Regex::Star(body),
                b'+' => Regex::Plus(body),
                b'?' => Regex::Star(body),
                _ => {
                    let id = self.interval_data()?;
                    if id.lower == 0 {
                        Regex::Star(body)
                    } else {
                        Regex::Plus(body)
                    }
                }
            },
            Regex::Question(body) => match op {
                b'*' => Regex::Star(body),
                b'+' => Regex::Star(body),
                b'?' => Regex::Question(body),
                _ => {
                    let id = self.interval_data()?;
                    if id.upper == Some(1) {
                        Regex::Question(body)
                    } else if id.comma && id.upper.is_none() {
                        Regex::Star(body)
                    } else {
                        Regex::Interval { body, lower: 0, upper: id.upper_bound() }
                    }
                }
            },
            Regex::Interval { body, lower, upper } => {
                // Repeating an empty match still matches nothing.
                if upper == Some(0) {
                    if op == b'{' {
                        self.interval_data()?;
                    }
                    return Ok(Regex::Interval { body, lower, upper });
                }
                let interval = |body, lower, upper| Regex::Interval { body, lower, upper };
                match op {
                    // Choosing zero or one iterations per round is just a
                    // star; higher lower bounds need the interval kept.
                    b'*' => {
                        if lower < 2 {
                            Regex::Star(body)
                        } else {
                            Regex::Star(Box::new(interval(body, lower, upper)))
                        }
                    }
                    b'+' => {
                        if lower < 2 {
                            Regex::Plus(body)
                        } else {
                            Regex::Plus(Box::new(interval(body, lower, upper)))
                        }
                    }
                    b'?' => match lower {
                        1 => interval(body, 0, upper),
                        l if l > 1 => Regex::Question(Box::new(interval(body, lower, upper))),
                        _ => interval(body, lower, upper),
                    },
                    _ => {
                        let id = self.interval_data()?;
                        let inner = interval(body, lower, upper);
                        if id.lower == 0 && id.upper == Some(1) {
                            Regex::Question(Box::new(inner))
                        } else if id.lower == 0 && id.upper.is_none() {
                            Regex::Star(Box::new(inner))
                        } else if id.lower == 1 && id.upper.is_none() {
                            Regex::Plus(Box::new(inner))
                        } else {
                            interval(Box::new(inner), id.lower, id.upper_bound())
                        }
                    }
                }
            }
            other => match op {
                b'*' => Regex::Star(Box::new(other)),
                b'+' => Regex::Plus(Box::new(other)),
                b'?' => Regex::Question(Box::new(other)),
                _ => {
                    let id = self.interval_data()?;
                    if id.lower == 0 && id.upper == Some(1) {
                        Regex::Question(Box::new(other))
                    } else if id.lower == 0 && id.upper.is_none() && id.comma {
                        Regex::Star(Box::new(other))
                    } else if id.lower == 1 && id.upper.is_none() && id.comma {
                        Regex::Plus(Box::new(other))
                    } else {
                        Regex::Interval {
                            body: Box::new(other),
                            lower: id.lower,
                            upper: id.upper_bound(),
                        }
                    }
                }
            },
        })
    }

    fn elem(&mut self) -> Result<Regex, ParseError> {
        let c = self.bump().ok_or_else(|| self.eof())?;
        match c {
            b'(' => self.group(),
            b'[' => self.char_select(),
            b'.' => Ok(Regex::Wildcard),
            b'\\' => {
                let e = self.bump().ok_or_else(|| self.eof())?;
                Ok(Regex::Symbol(unescape(e)))
            }
            literal => Ok(Regex::Symbol(literal)),
        }
    }

    fn group(&mut self) -> Result<Regex, ParseError> {
        let re = self.regex()?;
        if self.peek() == Some(b')') {
            self.bump();
            Ok(re)
        } else {
            Err(ParseError::ExpectedRParen { line: self.line, col: self.col })
        }
    }

    fn char_select(&mut self) -> Result<Regex, ParseError> {
        let negated = if self.peek() == Some(b'^') {
            self.bump();
            true
        } else {
            false
        };
        let mut options = BTreeSet::new();
        // The range lookback is the raw byte that opened the previous
        // item: a backslash after an escape, the dash after a range.
        let mut prev: Option<u8> = None;
        loop {
            match self.peek() {
                None => return Err(self.eof()),
                Some(b']') => {
                    self.bump();
                    break;
                }
                Some(_) => {}
            }
            let c = self.bump().expect("peeked");
            if c == b'\\' {
                let e = self.bump().ok_or_else(|| self.eof())?;
                options.insert(unescape(e));
            } else if c == b'-' {
                match (prev, self.peek()) {
                    (None, _) | (_, Some(b']')) => {
                        options.insert(b'-');
                    }
                    (Some(_), None) => return Err(self.eof()),
                    (Some(lo), Some(hi)) => {
                        if lo > hi {
                            return Err(ParseError::BadRange {
                                lo: lo as char,
                                hi: hi as char,
                                line: self.line,
                                col: self.col,
                            });
                        }
                        self.bump();
                        options.extend(lo..=hi);
                    }
                }
            } else {
                options.insert(c);
            }
            prev = Some(c);
        }
        if negated {
            options = extended_wildcard_set().difference(&options).copied().collect();
        }
        Ok(Regex::CharSelect(options))
    }

    fn interval_data(&mut self) -> Result<IntervalData, ParseError> {
        let mut data = IntervalData { lower: 0, upper: None, comma: false };
        loop {
            let c = self.bump().ok_or_else(|| self.eof())?;
            match c {
                b'}' => break,
                b',' => {
                    data.comma = true;
                    if self.peek() != Some(b'}') {
                        data.upper = Some(0);
                    }
                }
                digit if digit.is_ascii_digit() => {
                    let d = (digit - b'0') as u32;
                    if data.comma {
                        data.upper = Some(data.upper.unwrap_or(0) * 10 + d);
                    } else {
                        data.lower = data.lower * 10 + d;
                    }
                }
                other => {
                    return Err(ParseError::ExpectedDigit {
                        found: other as char,
                        line: self.line,
                        col: self.col,
                    })
                }
            }
        }
        Ok(data)
    }
}

fn unescape(b: u8) -> u8 {
    match b {
        b'n' => b'\n',
        b't' => b'\t',
        other => other,
    }
}
