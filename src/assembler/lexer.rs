extern crate log;
use log::warn;

#[derive(Debug, Clone)]
pub struct ErrorToken {
    pub text: String,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub start: (usize, usize),
    pub end: (usize, usize),
    pub kind: TokenKind,
}

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum TokenKind {
    Colon,
    Comma,
    /// Instructions are newline terminated so unlike whitespace these matter
    Newline,

    Ident(String),
    Number(u32),
}

#[derive(Clone)]
pub struct Lexer<'a> {
    pub line: usize,
    pub col: usize,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(chars: &'a str) -> Lexer<'a> {
        Lexer {
            line: 0,
            col: 0,
            chars: chars.chars().peekable(),
        }
    }

    fn move_next(&mut self) {
        match self.chars.next() {
            Some('\n') => {
                self.line += 1;
                self.col = 1;
            },
            Some(_) => {
                self.col += 1;
            },
            None => {}
        }
    }

    /// Skips whitespace other than newlines
    fn peek(&mut self) -> Option<char> {
        loop {
            match self.chars.peek() {
                Some(c) if *c != '\n' && c.is_whitespace() => self.move_next(),
                Some(c) => return Some(*c),
                None => return None
            }
        }
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        self.move_next();
        c
    }

    fn parse_simple_num(&mut self, base: u32) -> String {
        let mut num = String::new();
        loop {
            match self.chars.peek() {
                Some(c) if c.is_digit(base) || *c == '_' => {
                    if *c != '_' { num.push(*c); }
                    self.move_next();
                }
                _ => break,
            }
        }
        num
    }

    fn parse_num(&mut self, start: char) -> Result<TokenKind, ErrorToken> {
        let (digits, base) = match (start, self.chars.peek()) {
            ('0', Some('x')) | ('0', Some('X')) => {
                self.move_next();
                (self.parse_simple_num(16), 16)
            }
            ('0', Some('b')) | ('0', Some('B')) => {
                self.move_next();
                (self.parse_simple_num(2), 2)
            }
            _ => (start.to_string() + &self.parse_simple_num(10), 10)
        };

        match self.chars.peek() {
            Some(c) if Self::valid_identifier_continuer(*c) => {
                warn!("Invalid Number ... can't have identifier tokens");
                return Err(ErrorToken::new(digits, self.line, self.col));
            }
            _ => {}
        }

        u32::from_str_radix(&digits, base)
            .map(TokenKind::Number)
            .map_err(|_| ErrorToken::new(digits, self.line, self.col))
    }

    fn valid_identifier_continuer(c: char) -> bool {
        c.is_digit(10) || c.is_ascii_alphabetic() || c == '_' || c == '.'
    }
}

impl ErrorToken {
    pub fn new(text: String, line: usize, col: usize) -> ErrorToken {
        ErrorToken {
            text: text,
            line: line,
            col: col
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, ErrorToken>;

    fn next(&mut self) -> Option<Self::Item> {
        // This is our 'we haven't read yet' indicator
        if self.line == 0 {
            self.line = 1;
            self.col = 1;
        }

        // skip so the token starts on the right column
        self.peek();
        let start = (self.line, self.col);

        let kind = match self.next() {
            Some(';') | Some('#') => {
                // comment skip till newline, the newline itself is still a token
                while self.chars.peek().is_some() && self.chars.peek() != Some(&'\n') {
                    self.move_next();
                }
                return Iterator::next(self)
            }
            Some('\n') => TokenKind::Newline,
            Some(':') => TokenKind::Colon,
            Some(',') => TokenKind::Comma,
            Some(c) if c.is_digit(10) => match self.parse_num(c) {
                Err(e) => return Some(Err(e)),
                Ok(tok) => tok
            },
            Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {
                let mut id = c.to_string();
                loop {
                    match self.chars.peek() {
                        Some(c) if Self::valid_identifier_continuer(*c) => {
                            id.push(*c);
                            self.move_next();
                        },
                        _ => break,
                    }
                }
                TokenKind::Ident(id)
            }
            Some(other) => return Some(Err(ErrorToken::new(other.to_string(), self.line, self.col))),
            None => return None
        };
        Some(Ok(Token{ start: start, end: (self.line, self.col), kind }))
    }
}
