use crate::error::LexError;
use crate::token::Token;

/// Which grammar the next call to [`Lexer::next_token`] applies.
///
/// The lexer never switches modes on its own; the parser does, after it has
/// seen `{$`, `$}` or `"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerMode {
    Text,
    Tag,
    StringLiteral,
}

/// Pull-based tokenizer over a fully materialized template.
#[derive(Debug, Clone)]
pub struct Lexer {
    input: Vec<char>,
    cursor: usize,
    mode: LexerMode,
    current: Option<Token>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            cursor: 0,
            mode: LexerMode::Text,
            current: None,
        }
    }

    pub fn set_mode(&mut self, mode: LexerMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> LexerMode {
        self.mode
    }

    /// The most recently produced token, if any.
    pub fn current_token(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Character offset of the read cursor.
    pub fn position(&self) -> usize {
        self.cursor
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.cursor + offset).copied()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        pattern
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        if self.current == Some(Token::Eof) {
            return Err(LexError::NothingToTokenize {
                position: self.cursor,
            });
        }

        let token = match self.mode {
            LexerMode::Text => self.lex_text()?,
            LexerMode::Tag => self.lex_tag()?,
            LexerMode::StringLiteral => self.lex_string()?,
        };
        log::trace!("{:?} token at {}: {:?}", self.mode, self.cursor, token);

        self.current = Some(token.clone());
        Ok(token)
    }

    fn lex_text(&mut self) -> Result<Token, LexError> {
        if self.cursor >= self.input.len() {
            return Ok(Token::Eof);
        }
        if self.starts_with("{$") {
            self.cursor += 2;
            return Ok(Token::StartTag);
        }

        let mut text = String::new();
        while let Some(c) = self.peek_at(0) {
            if self.starts_with("{$") {
                break;
            }
            if c == '\\' {
                match self.peek_at(1) {
                    Some(esc @ ('\\' | '{')) => {
                        text.push(esc);
                        self.cursor += 2;
                    }
                    other => {
                        return Err(LexError::InvalidEscape {
                            position: self.cursor,
                            found: other.map(String::from).unwrap_or_default(),
                        })
                    }
                }
                continue;
            }
            text.push(c);
            self.cursor += 1;
        }
        Ok(Token::Text(text))
    }

    fn lex_tag(&mut self) -> Result<Token, LexError> {
        while self.peek_at(0).is_some_and(char::is_whitespace) {
            self.cursor += 1;
        }

        let Some(first) = self.peek_at(0) else {
            return Err(LexError::UnterminatedTag {
                position: self.cursor,
            });
        };

        if self.starts_with("$}") {
            self.cursor += 2;
            return Ok(Token::EndTag);
        }

        if first.is_alphabetic() {
            return Ok(Token::Word(self.take_identifier()));
        }

        if first == '@' && self.peek_at(1).is_some_and(char::is_alphabetic) {
            self.cursor += 1;
            return Ok(Token::Function(self.take_identifier()));
        }

        let signed = matches!(first, '-' | '+') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
        if first.is_ascii_digit() || signed {
            return self.take_number();
        }

        self.cursor += 1;
        Ok(Token::Symbol(first))
    }

    fn take_identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek_at(0) {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            ident.push(c);
            self.cursor += 1;
        }
        ident
    }

    fn take_number(&mut self) -> Result<Token, LexError> {
        let start = self.cursor;
        let mut literal = String::new();
        if let Some(sign @ ('-' | '+')) = self.peek_at(0) {
            literal.push(sign);
            self.cursor += 1;
        }
        while let Some(c) = self.peek_at(0) {
            if !(c.is_ascii_digit() || c == '.') {
                break;
            }
            literal.push(c);
            self.cursor += 1;
        }

        let invalid = || LexError::InvalidNumber {
            position: start,
            literal: literal.clone(),
        };

        if literal.contains('.') {
            // Exactly one dot with digits on both sides.
            let mut parts = literal.trim_start_matches(['-', '+']).split('.');
            let well_formed = matches!(
                (parts.next(), parts.next(), parts.next()),
                (Some(int), Some(frac), None) if !int.is_empty() && !frac.is_empty()
            );
            if !well_formed {
                return Err(invalid());
            }
            literal.parse().map(Token::Double).map_err(|_| invalid())
        } else {
            literal.parse().map(Token::Integer).map_err(|_| invalid())
        }
    }

    fn lex_string(&mut self) -> Result<Token, LexError> {
        match self.peek_at(0) {
            None => {
                return Err(LexError::UnterminatedString {
                    position: self.cursor,
                })
            }
            Some('"') => {
                self.cursor += 1;
                return Ok(Token::Symbol('"'));
            }
            Some(_) => {}
        }

        let mut s = String::new();
        loop {
            match self.peek_at(0) {
                None => {
                    return Err(LexError::UnterminatedString {
                        position: self.cursor,
                    })
                }
                Some('"') => break,
                Some('\\') => {
                    let unescaped = match self.peek_at(1) {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        None => {
                            return Err(LexError::UnterminatedString {
                                position: self.cursor,
                            })
                        }
                        Some(other) => {
                            return Err(LexError::InvalidEscape {
                                position: self.cursor,
                                found: other.to_string(),
                            })
                        }
                    };
                    s.push(unescaped);
                    self.cursor += 2;
                }
                Some(c) => {
                    s.push(c);
                    self.cursor += 1;
                }
            }
        }
        Ok(Token::String(s))
    }
}
