// ABOUTME: Hand-written scanner turning source text into a token vector

use crate::diagnostics::Diagnostics;
use crate::token::{keyword_kind, Literal, Token, TokenKind};

pub fn scan(source: &str, diagnostics: &Diagnostics) -> Vec<Token> {
    Lexer::new(source, diagnostics).scan_tokens()
}

struct Lexer<'a> {
    source: Vec<char>,
    start: usize,
    current: usize,
    line: usize,
    line_start: usize,
    tokens: Vec<Token>,
    diagnostics: &'a Diagnostics,
}

impl<'a> Lexer<'a> {
    fn new(source: &str, diagnostics: &'a Diagnostics) -> Self {
        Lexer {
            source: source.chars().collect(),
            start: 0,
            current: 0,
            line: 1,
            line_start: 0,
            tokens: Vec::new(),
            diagnostics,
        }
    }

    fn scan_tokens(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }
        self.tokens.push(Token::new(TokenKind::Eof, "", None, self.line, self.column()));
        self.tokens
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> char {
        self.source.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.source.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    /// Column of the current scan position: distance from the last newline
    /// to here.
    fn column(&self) -> usize {
        self.current - self.line_start
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.current].iter().collect()
    }

    fn add_token(&mut self, kind: TokenKind) {
        self.add_token_literal(kind, None);
    }

    fn add_token_literal(&mut self, kind: TokenKind, literal: Option<Literal>) {
        let lexeme = self.lexeme();
        self.tokens.push(Token::new(kind, lexeme, literal, self.line, self.column()));
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            ',' => self.add_token(TokenKind::Comma),
            '.' => self.add_token(TokenKind::Dot),
            ';' => self.add_token(TokenKind::Semicolon),
            ':' => self.add_token(TokenKind::Colon),
            '?' => self.add_token(TokenKind::Question),
            '+' => self.add_token(TokenKind::Plus),
            '-' => self.add_token(TokenKind::Minus),
            '*' => self.add_token(TokenKind::Star),
            '^' => self.add_token(TokenKind::Caret),
            '!' => {
                let kind = if self.matches('=') { TokenKind::BangEqual } else { TokenKind::Bang };
                self.add_token(kind);
            }
            '=' => {
                let kind = if self.matches('=') { TokenKind::EqualEqual } else { TokenKind::Equal };
                self.add_token(kind);
            }
            '<' => {
                let kind = if self.matches('=') { TokenKind::LessEqual } else { TokenKind::Less };
                self.add_token(kind);
            }
            '>' => {
                let kind = if self.matches('=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
                self.add_token(kind);
            }
            '/' => {
                if self.matches('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }
            ' ' | '\t' | '\r' => {}
            '\n' => {
                self.line += 1;
                self.line_start = self.current;
            }
            '"' | '\'' => self.string(c),
            c if c.is_ascii_digit() => self.number(),
            c if is_identifier_start(c) => self.identifier(),
            other => {
                self.diagnostics.lex_error(
                    self.line,
                    self.column(),
                    &format!("Unexpected character '{}'.", other),
                );
            }
        }
    }

    fn string(&mut self, delimiter: char) {
        while self.peek() != delimiter && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
                self.line_start = self.current + 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.diagnostics.lex_error(self.line, self.column(), "Unterminated string.");
            return;
        }

        self.advance(); // closing delimiter
        let value: String = self.source[self.start + 1..self.current - 1].iter().collect();
        self.add_token_literal(TokenKind::String, Some(Literal::Str(value)));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        let text = self.lexeme();
        let value: f64 = text.parse().expect("number lexeme is always valid f64 syntax");
        self.add_token_literal(TokenKind::Number, Some(Literal::Number(value)));
    }

    fn identifier(&mut self) {
        while is_identifier_part(self.peek()) {
            self.advance();
        }
        let text = self.lexeme();
        let kind = keyword_kind(&text).unwrap_or(TokenKind::Identifier);
        self.add_token(kind);
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '$' | '@' | '#')
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let diag = Diagnostics::new();
        scan(source, &diag).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_punctuation_and_operators() {
        assert_eq!(
            kinds("(){},.;:?+-*^!= == <= >="),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::Comma,
                TokenKind::Dot,
                TokenKind::Semicolon,
                TokenKind::Colon,
                TokenKind::Question,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Caret,
                TokenKind::Bang,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn line_comments_run_to_end_of_line() {
        let diag = Diagnostics::new();
        let tokens = scan("1 // a comment\n2", &diag);
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn strings_accept_either_delimiter_and_keep_raw_text() {
        let diag = Diagnostics::new();
        let tokens = scan(r#" "a\nb" 'c' "#, &diag);
        assert_eq!(tokens[0].literal, Some(Literal::Str("a\\nb".to_string())));
        assert_eq!(tokens[1].literal, Some(Literal::Str("c".to_string())));
    }

    #[test]
    fn unterminated_string_reports_error_and_stops() {
        let diag = Diagnostics::new();
        let tokens = scan("\"unterminated", &diag);
        assert!(diag.had_error());
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn numbers_parse_integer_and_fractional_forms() {
        let diag = Diagnostics::new();
        let tokens = scan("42 3.5", &diag);
        assert_eq!(tokens[0].literal, Some(Literal::Number(42.0)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(3.5)));
    }

    #[test]
    fn identifiers_allow_sigil_characters() {
        let diag = Diagnostics::new();
        let tokens = scan("_foo $bar @baz #qux", &diag);
        for token in &tokens[..4] {
            assert_eq!(token.kind, TokenKind::Identifier);
        }
    }

    #[test]
    fn keywords_are_recognized() {
        assert_eq!(
            kinds("and break class echo else false fn for if let nil or return super this true while"),
            vec![
                TokenKind::And,
                TokenKind::Break,
                TokenKind::Class,
                TokenKind::Echo,
                TokenKind::Else,
                TokenKind::False,
                TokenKind::Fn,
                TokenKind::For,
                TokenKind::If,
                TokenKind::Let,
                TokenKind::Nil,
                TokenKind::Or,
                TokenKind::Return,
                TokenKind::Super,
                TokenKind::This,
                TokenKind::True,
                TokenKind::While,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unexpected_character_reports_but_keeps_scanning() {
        let diag = Diagnostics::new();
        let tokens = scan("1 ` 2", &diag);
        assert!(diag.had_error());
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[1].kind, TokenKind::Number);
    }
}
