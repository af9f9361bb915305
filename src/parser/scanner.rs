//! Character scanner that splits a VALUES clause into raw tuples.
//!
//! This approximates SQL quoting rather than lexing it fully: a quote
//! preceded by a backslash never opens or closes a string, and `''` inside a
//! single-quoted string is handled as a close immediately followed by an
//! open, which keeps both characters in the captured text.

use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Default,
    InSingleQuote,
    InDoubleQuote,
    /// `--` comment, runs to end of line
    LineComment,
}

/// Yields one `Vec<String>` of trimmed value texts per top-level
/// parenthesized tuple. Nested parentheses stay inside the current value.
/// Scanning stops at a `;` outside any tuple or string, or at a keyword
/// following the last tuple.
pub struct TupleScanner<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    state: ScanState,
    depth: usize,
    prev: Option<char>,
    current: String,
    row: Vec<String>,
    offset: usize,
    seen_tuple: bool,
    finished: bool,
}

impl<'a> TupleScanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            state: ScanState::Default,
            depth: 0,
            prev: None,
            current: String::new(),
            row: Vec::new(),
            offset: 0,
            seen_tuple: false,
            finished: false,
        }
    }

    /// Byte offset just past the last consumed character.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// True once a statement terminator or the end of input was reached.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn advance(&mut self) -> Option<char> {
        let (idx, c) = self.chars.next()?;
        self.offset = idx + c.len_utf8();
        Some(c)
    }

    fn finish_value(&mut self) {
        let value = self.current.trim().to_string();
        self.row.push(value);
        self.current.clear();
    }

    /// Feed one character in the default state. Returns a completed tuple.
    fn step_default(&mut self, c: char, escaped: bool) -> Option<Vec<String>> {
        match c {
            '\'' | '"' if !escaped => {
                self.state = if c == '\'' {
                    ScanState::InSingleQuote
                } else {
                    ScanState::InDoubleQuote
                };
                if self.depth > 0 {
                    self.current.push(c);
                }
            }
            '-' if matches!(self.chars.peek(), Some((_, '-'))) => {
                self.advance();
                self.state = ScanState::LineComment;
            }
            ';' if self.depth == 0 => {
                self.finished = true;
            }
            '(' => {
                self.depth += 1;
                if self.depth == 1 {
                    self.row.clear();
                    self.current.clear();
                } else {
                    self.current.push(c);
                }
            }
            ')' if self.depth > 0 => {
                self.depth -= 1;
                if self.depth == 0 {
                    if !self.current.trim().is_empty() {
                        self.finish_value();
                    }
                    self.current.clear();
                    self.seen_tuple = true;
                    return Some(std::mem::take(&mut self.row));
                }
                self.current.push(c);
            }
            ',' if self.depth == 1 => self.finish_value(),
            _ if self.depth > 0 => self.current.push(c),
            // ON CONFLICT, RETURNING, ... after the last tuple
            _ if self.seen_tuple && c.is_alphanumeric() => {
                self.finished = true;
            }
            _ => {}
        }
        None
    }
}

impl Iterator for TupleScanner<'_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let Some(c) = self.advance() else {
                self.finished = true;
                break;
            };
            let escaped = self.prev == Some('\\');
            self.prev = Some(c);

            match self.state {
                ScanState::Default => {
                    if let Some(row) = self.step_default(c, escaped) {
                        return Some(row);
                    }
                }
                ScanState::InSingleQuote | ScanState::InDoubleQuote => {
                    if self.depth > 0 {
                        self.current.push(c);
                    }
                    let closing = if self.state == ScanState::InSingleQuote {
                        '\''
                    } else {
                        '"'
                    };
                    if c == closing && !escaped {
                        self.state = ScanState::Default;
                    }
                }
                ScanState::LineComment => {
                    if c == '\n' {
                        self.state = ScanState::Default;
                    }
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for TupleScanner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TupleScanner")
            .field("len", &self.input.len())
            .field("offset", &self.offset)
            .field("state", &self.state)
            .field("depth", &self.depth)
            .finish()
    }
}
