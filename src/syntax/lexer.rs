//! Terminal scanner for pattern expressions.
//!
//! Terminals are separated by single spaces. A backslash before a space
//! makes the space part of the terminal, so `a\ b` is the single terminal
//! `a b`; an even run of backslashes is literal.

use phf::{Map, phf_map};

/// Role of a terminal in the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    OpenPhrase,
    ClosePhrase,
    OpenGroup,
    CloseGroup,
    /// `?`
    Optional,
    /// `*`
    Star,
    /// `+`
    Plus,
    /// `.`
    Wildcard,
    Field,
}

impl Kind {
    pub fn is_quantifier(self) -> bool {
        matches!(self, Kind::Optional | Kind::Star | Kind::Plus)
    }

    /// Terminals that stand for one element when found where a token is
    /// expected. A bare `*` there is the wildcard field spec.
    pub fn is_token(self) -> bool {
        matches!(self, Kind::Wildcard | Kind::Field | Kind::Star)
    }
}

const SYMBOLS: Map<&'static str, Kind> = phf_map! {
    "[" => Kind::OpenPhrase,
    "]" => Kind::ClosePhrase,
    "(" => Kind::OpenGroup,
    ")" => Kind::CloseGroup,
    "?" => Kind::Optional,
    "*" => Kind::Star,
    "+" => Kind::Plus,
    "." => Kind::Wildcard,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    pub text: String,
    /// Character offset of the terminal in the expression.
    pub offset: usize,
}

impl Terminal {
    pub fn kind(&self) -> Kind {
        SYMBOLS
            .get(self.text.as_str())
            .copied()
            .unwrap_or(Kind::Field)
    }
}

/// A saved scan position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Cursor(usize);

struct Piece<'a> {
    text: &'a str,
    offset: usize,
}

pub struct Lexer<'a> {
    pieces: Vec<Piece<'a>>,
    len: usize,
    cursor: Cursor,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut pieces = Vec::new();
        let mut offset = 0;
        for text in source.split(' ') {
            pieces.push(Piece { text, offset });
            offset += text.chars().count() + 1;
        }
        Lexer {
            pieces,
            len: source.chars().count(),
            cursor: Cursor::default(),
        }
    }

    pub fn checkpoint(&self) -> Cursor {
        self.cursor
    }

    pub fn restore(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    pub fn peek(&self) -> Option<Terminal> {
        let mut cursor = self.cursor;
        self.read_at(&mut cursor)
    }

    /// Offset of the next terminal, or the expression length at the end.
    pub fn offset(&self) -> usize {
        self.offset_at(self.cursor)
    }

    pub fn offset_at(&self, cursor: Cursor) -> usize {
        self.pieces[cursor.0..]
            .iter()
            .find(|p| !p.text.is_empty())
            .map_or(self.len, |p| p.offset)
    }

    // ─── Lookahead ──────────────────────────────────────────────────────────

    /// The next terminal is `?` or `*`.
    pub fn is_optional(&self) -> bool {
        matches!(self.peek_kind(self.cursor), Some(Kind::Optional | Kind::Star))
    }

    /// The next terminal is `+` or `*`.
    pub fn is_repeated(&self) -> bool {
        matches!(self.peek_kind(self.cursor), Some(Kind::Plus | Kind::Star))
    }

    /// Only the current token's quantifier and closing groups stand between
    /// here and the end of the phrase. A second `*` is a wildcard token.
    pub fn at_chunk_end(&self) -> bool {
        let mut cursor = self.cursor;
        if self.peek_kind(cursor).is_some_and(Kind::is_quantifier) {
            self.read_at(&mut cursor);
        }
        while let Some(t) = self.read_at(&mut cursor) {
            match t.kind() {
                Kind::CloseGroup => {}
                Kind::ClosePhrase => return true,
                _ => return false,
            }
        }
        false
    }

    /// Every token between the current one (and its quantifier) and the end
    /// of the phrase is optional.
    pub fn maybe_at_chunk_end(&self) -> bool {
        let mut cursor = self.cursor;
        if self.peek_kind(cursor).is_some_and(Kind::is_quantifier) {
            self.read_at(&mut cursor);
        }
        while let Some(t) = self.read_at(&mut cursor) {
            match t.kind() {
                Kind::OpenGroup | Kind::CloseGroup => {}
                Kind::ClosePhrase => return true,
                k if k.is_token() => {
                    if !self.skip_optional(&mut cursor) {
                        return false;
                    }
                }
                _ => return false,
            }
        }
        false
    }

    /// Every token from `body` (the start of the phrase body) up to
    /// `token` was optional.
    pub fn maybe_at_chunk_begin(&self, body: Cursor, token: Cursor) -> bool {
        let mut cursor = body;
        while cursor < token {
            let Some(t) = self.read_at(&mut cursor) else {
                break;
            };
            match t.kind() {
                Kind::OpenGroup | Kind::CloseGroup => {}
                k if k.is_token() => {
                    if !self.skip_optional(&mut cursor) {
                        return false;
                    }
                }
                _ => return false,
            }
        }
        true
    }

    fn skip_optional(&self, cursor: &mut Cursor) -> bool {
        if matches!(self.peek_kind(*cursor), Some(Kind::Optional | Kind::Star)) {
            self.read_at(cursor);
            true
        } else {
            false
        }
    }

    fn peek_kind(&self, mut cursor: Cursor) -> Option<Kind> {
        self.read_at(&mut cursor).map(|t| t.kind())
    }

    /// Read the terminal at `cursor` and advance past it.
    fn read_at(&self, cursor: &mut Cursor) -> Option<Terminal> {
        let mut i = cursor.0;
        while i < self.pieces.len() && self.pieces[i].text.is_empty() {
            i += 1;
        }
        if i >= self.pieces.len() {
            cursor.0 = i;
            return None;
        }

        let offset = self.pieces[i].offset;
        let mut text = String::new();
        loop {
            let raw = self.pieces[i].text;
            i += 1;
            let slashes = raw.chars().rev().take_while(|&c| c == '\\').count();
            if slashes % 2 == 0 {
                text.push_str(raw);
                break;
            }
            text.push_str(&raw[..raw.len() - 1]);
            text.push(' ');
            if i >= self.pieces.len() || self.pieces[i].text.is_empty() {
                break;
            }
        }
        cursor.0 = i;
        Some(Terminal { text, offset })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Terminal;

    fn next(&mut self) -> Option<Terminal> {
        let mut cursor = self.cursor;
        let terminal = self.read_at(&mut cursor);
        self.cursor = cursor;
        terminal
    }
}
