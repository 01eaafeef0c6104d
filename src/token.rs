use log::{debug, info};
use serde::Serialize;
use std::fmt;
use std::mem;

/// Token kinds.  `STRING` and `NUMBER` carry the literal value; equality
/// ignores that payload.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    // punctuation
    LEFT_PAREN,
    RIGHT_PAREN,
    LEFT_BRACE,
    RIGHT_BRACE,
    COMMA,
    DOT,
    MINUS,
    PLUS,
    SEMICOLON,
    SLASH,
    STAR,
    QUESTION,
    COLON,

    // one or two characters
    BANG,
    BANG_EQUAL,
    EQUAL,
    EQUAL_EQUAL,
    GREATER,
    GREATER_EQUAL,
    LESS,
    LESS_EQUAL,

    // literals
    IDENTIFIER,
    STRING(String),
    #[serde(rename = "NUMBER")]
    NUMBER(f64),

    // keywords
    AND,
    BREAK,
    CLASS,
    ELSE,
    FALSE,
    FUN,
    FOR,
    IF,
    NIL,
    OR,
    PRINT,
    RETURN,
    STATIC,
    SUPER,
    THIS,
    TRUE,
    VAR,
    WHILE,

    EOF,
}

impl TokenType {
    /// Upper-case variant name without payload, as printed by `tokenize`.
    pub fn name(&self) -> &'static str {
        match self {
            TokenType::STRING(_) => "STRING",
            TokenType::NUMBER(_) => "NUMBER",
            TokenType::LEFT_PAREN => "LEFT_PAREN",
            TokenType::RIGHT_PAREN => "RIGHT_PAREN",
            TokenType::LEFT_BRACE => "LEFT_BRACE",
            TokenType::RIGHT_BRACE => "RIGHT_BRACE",
            TokenType::COMMA => "COMMA",
            TokenType::DOT => "DOT",
            TokenType::MINUS => "MINUS",
            TokenType::PLUS => "PLUS",
            TokenType::SEMICOLON => "SEMICOLON",
            TokenType::SLASH => "SLASH",
            TokenType::STAR => "STAR",
            TokenType::QUESTION => "QUESTION",
            TokenType::COLON => "COLON",
            TokenType::BANG => "BANG",
            TokenType::BANG_EQUAL => "BANG_EQUAL",
            TokenType::EQUAL => "EQUAL",
            TokenType::EQUAL_EQUAL => "EQUAL_EQUAL",
            TokenType::GREATER => "GREATER",
            TokenType::GREATER_EQUAL => "GREATER_EQUAL",
            TokenType::LESS => "LESS",
            TokenType::LESS_EQUAL => "LESS_EQUAL",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::AND => "AND",
            TokenType::BREAK => "BREAK",
            TokenType::CLASS => "CLASS",
            TokenType::ELSE => "ELSE",
            TokenType::FALSE => "FALSE",
            TokenType::FUN => "FUN",
            TokenType::FOR => "FOR",
            TokenType::IF => "IF",
            TokenType::NIL => "NIL",
            TokenType::OR => "OR",
            TokenType::PRINT => "PRINT",
            TokenType::RETURN => "RETURN",
            TokenType::STATIC => "STATIC",
            TokenType::SUPER => "SUPER",
            TokenType::THIS => "THIS",
            TokenType::TRUE => "TRUE",
            TokenType::VAR => "VAR",
            TokenType::WHILE => "WHILE",
            TokenType::EOF => "EOF",
        }
    }
}

impl PartialEq for TokenType {
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

/// The lexeme is owned: closures keep pieces of the AST (and therefore
/// tokens) alive after the source of a prompt line is gone.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    pub fn new<S: Into<String>>(token_type: TokenType, lexeme: S, line: usize) -> Self {
        let lexeme: String = lexeme.into();

        debug!("Token {:?} '{}' on line {}", token_type, lexeme, line);

        Self {
            token_type,
            lexeme,
            line,
        }
    }

    /// Synthetic identifier token, used for desugared or anonymous nodes.
    pub fn synthetic(lexeme: &str, line: usize) -> Self {
        info!("Synthesising token '{}' on line {}", lexeme, line);

        Self {
            token_type: TokenType::IDENTIFIER,
            lexeme: lexeme.to_string(),
            line,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant: &'static str = self.token_type.name();

        match &self.token_type {
            TokenType::STRING(s) => write!(f, "{} {} {}", variant, self.lexeme, s),

            TokenType::NUMBER(n) => {
                // `tokenize` always shows a fractional part
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    let mut buf: itoa::Buffer = itoa::Buffer::new();
                    write!(
                        f,
                        "{} {} {}.0",
                        variant,
                        self.lexeme,
                        buf.format(*n as i64)
                    )
                } else {
                    write!(f, "{} {} {}", variant, self.lexeme, n)
                }
            }

            _ => write!(f, "{} {} null", variant, self.lexeme),
        }
    }
}
