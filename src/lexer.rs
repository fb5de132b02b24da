//! Cursor over the raw text of a .bvh file.
//!
//! Every recognizer leaves the cursor where it was when it fails, so the parser can simply try
//! the next alternative.

use regex::Regex;
use std::cell::Cell;
use std::sync::OnceLock;

fn float_pattern() -> &'static Regex {
    static FLOAT: OnceLock<Regex> = OnceLock::new();
    FLOAT.get_or_init(|| {
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("float pattern is valid")
    })
}

fn int_pattern() -> &'static Regex {
    static INT: OnceLock<Regex> = OnceLock::new();
    INT.get_or_init(|| Regex::new(r"^[+-]?\d+").expect("int pattern is valid"))
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

/// Bytes allowed in a joint name: spaces and printable characters other than braces.
/// Non-ASCII bytes are accepted so UTF-8 names stay intact.
fn is_name_byte(byte: u8) -> bool {
    byte == b' ' || (byte.is_ascii_graphic() && byte != b'{' && byte != b'}') || byte >= 0x80
}

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    /// Last `(pos, line)` pair handed out by [`Lexer::line`].
    line_mark: Cell<(usize, usize)>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            pos: 0,
            line_mark: Cell::new((0, 1)),
        }
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Nothing but whitespace left.
    pub fn at_end(&self) -> bool {
        self.rest().bytes().all(is_whitespace)
    }

    /// What is left of the input.
    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// 1-based line number of the cursor, for diagnostics.
    ///
    /// Counts newlines from the previous call onwards, so calls made while the cursor moves
    /// forward cost the distance travelled in between.
    pub fn line(&self) -> usize {
        let (mut from, mut line) = self.line_mark.get();
        if self.pos < from {
            (from, line) = (0, 1);
        }
        line += self.src.as_bytes()[from..self.pos]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        self.line_mark.set((self.pos, line));
        line
    }

    pub fn skip_whitespace(&mut self) {
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() && is_whitespace(bytes[self.pos]) {
            self.pos += 1;
        }
    }

    /// Skip the remainder of the current line and any whitespace after it.
    pub fn next_line(&mut self) {
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos] != b'\n' && bytes[self.pos] != b'\r' {
            self.pos += 1;
        }
        self.skip_whitespace();
    }

    /// Consume `key` if the input continues with it exactly.
    pub fn keyword(&mut self, key: &str) -> bool {
        if self.rest().starts_with(key) {
            self.pos += key.len();
            true
        } else {
            false
        }
    }

    /// The next whitespace-delimited token, without consuming it.
    pub fn peek_token(&self) -> &'a str {
        let rest = self.rest();
        let end = rest
            .bytes()
            .position(is_whitespace)
            .unwrap_or(rest.len());
        &rest[..end]
    }

    /// Longest floating point literal after optional leading whitespace.
    pub fn float(&mut self) -> Option<f64> {
        let start = self.pos;
        self.skip_whitespace();
        let value = float_pattern()
            .find(self.rest())
            .and_then(|m| m.as_str().parse::<f64>().ok().map(|v| (v, m.end())));
        match value {
            Some((v, len)) => {
                self.pos += len;
                Some(v)
            }
            None => {
                self.pos = start;
                None
            }
        }
    }

    /// Decimal integer literal after optional leading whitespace.
    pub fn integer(&mut self) -> Option<i64> {
        let start = self.pos;
        self.skip_whitespace();
        let value = int_pattern()
            .find(self.rest())
            .and_then(|m| m.as_str().parse::<i64>().ok().map(|v| (v, m.end())));
        match value {
            Some((v, len)) => {
                self.pos += len;
                Some(v)
            }
            None => {
                self.pos = start;
                None
            }
        }
    }

    /// A joint name: leading whitespace skipped, then the longest run of name bytes with
    /// trailing spaces trimmed. May be empty.
    pub fn name(&mut self) -> &'a str {
        self.skip_whitespace();
        let rest = self.rest();
        let len = rest
            .bytes()
            .position(|b| !is_name_byte(b))
            .unwrap_or(rest.len());
        self.pos += len;
        rest[..len].trim_end_matches(' ')
    }
}
