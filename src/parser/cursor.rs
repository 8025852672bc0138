//! parser::cursor
//!
//! A position-tracking cursor over declaration text.
//!
//! Cursors are cheap to clone; grammar rules with optional prefixes clone
//! the cursor, try the prefix, and keep the clone only on success.

use crate::core::types::{ParsingPosition, ParsingRange, ResultNode};

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    source: &'a str,
    pos: ParsingPosition,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: ParsingPosition::START,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn position(&self) -> ParsingPosition {
        self.pos
    }

    /// The unconsumed input.
    pub fn rest(&self) -> &'a str {
        &self.source[self.pos.index..]
    }

    pub fn is_eof(&self) -> bool {
        self.pos.index >= self.source.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn at(&self, c: char) -> bool {
        self.peek() == Some(c)
    }

    pub fn at_str(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos.index += c.len_utf8();
        if c == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        Some(c)
    }

    /// Consume `c` if it is next.
    pub fn eat(&mut self, c: char) -> bool {
        if self.at(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume `s` if the input continues with it.
    pub fn eat_str(&mut self, s: &str) -> bool {
        if !self.at_str(s) {
            return false;
        }
        for _ in s.chars() {
            self.bump();
        }
        true
    }

    /// Consume characters while `pred` holds, returning the consumed token.
    pub fn take_while(&mut self, pred: impl Fn(char) -> bool) -> ResultNode {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
        ResultNode::new(
            &self.source[start.index..self.pos.index],
            self.range_from(start),
        )
    }

    pub fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Consume an identifier: a letter or `_`, then letters, digits, `_`, `-`.
    pub fn ident(&mut self) -> Option<ResultNode> {
        let first = self.peek()?;
        if !(first.is_alphabetic() || first == '_') {
            return None;
        }
        Some(self.take_while(|c| c.is_alphanumeric() || c == '_' || c == '-'))
    }

    /// The range from `start` to the current position.
    pub fn range_from(&self, start: ParsingPosition) -> ParsingRange {
        ParsingRange::new(start, self.pos)
    }

    /// Consume the rest of the input, returning it as a token.
    pub fn take_rest(&mut self) -> ResultNode {
        self.take_while(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_lines_and_columns() {
        let mut cursor = Cursor::new("ab\ncd");
        cursor.bump();
        cursor.bump();
        cursor.bump();
        let pos = cursor.position();
        assert_eq!((pos.index, pos.line, pos.column), (3, 2, 1));
        cursor.bump();
        assert_eq!(cursor.position().column, 2);
    }

    #[test]
    fn columns_count_chars() {
        let mut cursor = Cursor::new("äb");
        cursor.bump();
        assert_eq!(cursor.position().index, 2);
        assert_eq!(cursor.position().column, 2);
    }

    #[test]
    fn ident_rules() {
        assert_eq!(Cursor::new("a_b-1 x").ident().unwrap().value, "a_b-1");
        assert!(Cursor::new("1abc").ident().is_none());
        assert!(Cursor::new("").ident().is_none());
    }

    #[test]
    fn clone_backtracks() {
        let mut cursor = Cursor::new("memory^x");
        let mut attempt = cursor.clone();
        attempt.ident();
        assert!(attempt.eat('^'));
        assert_eq!(cursor.rest(), "memory^x");
        cursor = attempt;
        assert_eq!(cursor.rest(), "x");
    }

    #[test]
    fn token_range() {
        let mut cursor = Cursor::new("tags[x]");
        cursor.take_while(|c| c != '[');
        cursor.eat('[');
        let token = cursor.take_while(|c| c != ']');
        let range = token.range.unwrap();
        assert_eq!(range.slice("tags[x]"), "x");
    }
}
