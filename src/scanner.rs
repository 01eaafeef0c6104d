//! Lexer.
//!
//! [`Scanner`] walks the source bytes once and yields `Result<Token>`.  A bad
//! character or an unterminated string / block comment becomes an `Err` item
//! and scanning resumes after it, so callers collect every lexical error in
//! one pass.  The stream always ends with a single `EOF` token.
//!
//! Beyond plain Lox the scanner knows `/* */` block comments (not nested),
//! the ternary punctuation `?` and `:`, and the `break` / `static` keywords.
//!
//! ```rust
//! use rox_interpreter::scanner::Scanner;
//!
//! let kinds: Vec<String> = Scanner::new("a ? b : c; /* done */")
//!     .filter_map(|item| item.ok())
//!     .map(|token| token.token_type.name().to_string())
//!     .collect();
//!
//! assert_eq!(kinds.last().map(String::as_str), Some("EOF"));
//! ```

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"break"  => TokenType::BREAK,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"static" => TokenType::STATIC,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],

    /// Byte offset where the current lexeme begins.
    start: usize,
    curr: usize,
    line: usize,

    /// Set once `EOF` has been yielded.
    done: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            bytes: src.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            done: false,
        }
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.bytes.len()
    }

    /// Callers check [`Self::is_at_end`] first.
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;
        b
    }

    /// `0` past the end, which no lexeme rule accepts.
    #[inline(always)]
    fn peek_at(&self, offset: usize) -> u8 {
        self.bytes.get(self.curr + offset).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    /// `matched` if the next byte is `=` (consuming it), else `single`.
    fn with_equals(&mut self, matched: TokenType, single: TokenType) -> TokenType {
        if self.peek() == b'=' {
            self.curr += 1;
            matched
        } else {
            single
        }
    }

    /// Lex one lexeme.  `Ok(None)` means whitespace or a comment was skipped.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let b = self.advance();

        let token_type = match b {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,
            b'?' => TokenType::QUESTION,
            b':' => TokenType::COLON,

            b'!' => self.with_equals(TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.with_equals(TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.with_equals(TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.with_equals(TokenType::GREATER_EQUAL, TokenType::GREATER),

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'/' => match self.peek() {
                b'/' => {
                    let rest = &self.bytes[self.curr..];
                    self.curr += memchr(b'\n', rest).unwrap_or(rest.len());
                    return Ok(None);
                }
                b'*' => {
                    self.curr += 1;
                    self.skip_block_comment()?;
                    return Ok(None);
                }
                _ => TokenType::SLASH,
            },

            b'"' => self.string()?,

            b'0'..=b'9' => self.number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", b as char),
                ))
            }
        };

        Ok(Some(token_type))
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        while !self.is_at_end() {
            if self.peek() == b'*' && self.peek_at(1) == b'/' {
                self.curr += 2;
                return Ok(());
            }

            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        Err(LoxError::lex(self.line, "Unterminated block comment."))
    }

    /// Strings may span lines; the token's line is the closing quote's.
    fn string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.curr += 1;

        // Both quotes are ASCII, so the slice falls on char boundaries.
        let contents: &str = &self.src[self.start + 1..self.curr - 1];
        Ok(TokenType::STRING(contents.to_owned()))
    }

    fn number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.curr += 1;
        }

        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.curr += 1;
            while self.peek().is_ascii_digit() {
                self.curr += 1;
            }
        }

        // Digits with an optional fraction always parse.
        let value: f64 = self.src[self.start..self.curr].parse().unwrap_or(0.0);
        TokenType::NUMBER(value)
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.curr += 1;
        }

        KEYWORDS
            .get(&self.bytes[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while !self.is_at_end() {
            self.start = self.curr;

            match self.scan_token() {
                Ok(Some(token_type)) => {
                    debug!("Scanned {:?} on line {}", token_type, self.line);
                    let lexeme: &str = &self.src[self.start..self.curr];
                    return Some(Ok(Token::new(token_type, lexeme, self.line)));
                }
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }

        self.done = true;
        Some(Ok(Token::new(TokenType::EOF, "", self.line)))
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
