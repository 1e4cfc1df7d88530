use crate::token::{Kind, Token};

/// Cursor over DQL source. `next` classifies one lexical unit at a time and
/// leaves its start offset, literal text and keyword tag readable until the
/// following call.
pub struct Lexer<'a> {
    source_code: &'a str,
    chars: Vec<(usize, char)>,
    current: usize,
    prev: usize,
    value: String,
    keyword: Option<Kind>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            source_code: input,
            chars: input.char_indices().collect(),
            current: 0,
            prev: 0,
            value: String::new(),
            keyword: None,
        }
    }

    /// Byte offset where the last token returned by `next` started.
    pub fn prev(&self) -> usize {
        self.prev
    }

    /// Literal text of the last string, number, object or identifier.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn keyword(&self) -> Option<Kind> {
        self.keyword
    }

    fn at(&self) -> Option<char> {
        self.chars.get(self.current).map(|(_, ch)| *ch)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.current + 1).map(|(_, ch)| *ch)
    }

    fn advance(&mut self) {
        self.current += 1;
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.current)
            .map(|(index, _)| *index)
            .unwrap_or(self.source_code.len())
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.at() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(ch) = self.at() {
            if !pred(ch) {
                break;
            }
            self.advance();
        }
    }

    fn set_value(&mut self) {
        self.value = self.source_code[self.prev..self.offset()].to_string();
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Kind {
        self.prev = self.offset();
        self.value.clear();
        self.keyword = None;

        let ch = match self.at() {
            Some(ch) => ch,
            None => return Kind::EOF,
        };

        if is_white(ch) {
            return self.whitespace();
        }

        self.advance();

        match ch {
            '#' => self.line_comment(),
            ';' => Kind::Semicolon,
            '{' => self.json_object(),
            '"' | '\'' => self.quoted_string(ch),
            c => {
                if let Some(annotation) = Kind::annotation(c) {
                    if self.at_annotation_end() {
                        return annotation;
                    }
                }

                if c.is_ascii_digit() {
                    self.number()
                } else if c.is_ascii_alphabetic() {
                    self.identifier()
                } else {
                    Kind::Error
                }
            }
        }
    }

    /// Lexes the whole source, ending with an `EOF` token.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let kind = self.next();
            let value = match kind {
                Kind::String | Kind::Number | Kind::Object => Some(self.value.clone()),
                _ if self.keyword.is_some() => Some(self.value.clone()),
                _ => None,
            };

            tokens.push(Token {
                index: self.prev,
                kind,
                value,
                keyword: self.keyword,
            });

            if kind == Kind::EOF {
                break;
            }
        }

        tokens
    }

    fn at_annotation_end(&self) -> bool {
        match self.at() {
            None => true,
            Some(ch) => is_white(ch) || ch == ';',
        }
    }

    fn whitespace(&mut self) -> Kind {
        while let Some(ch) = self.at() {
            if !is_white(ch) {
                break;
            }
            self.advance();
            if ch == '\n' || ch == '\r' {
                return Kind::Newline;
            }
        }
        Kind::Whitespace
    }

    fn line_comment(&mut self) -> Kind {
        self.match_while(|ch| ch != '\r' && ch != '\n');
        Kind::Comment
    }

    fn quoted_string(&mut self, quote: char) -> Kind {
        let mut text = String::new();
        while let Some(ch) = self.at() {
            if ch == quote {
                break;
            }
            text.push(self.escape());
        }
        self.match_char(quote);
        self.value = text;
        Kind::String
    }

    fn json_object(&mut self) -> Kind {
        let mut text = String::from("{");
        let mut depth = 1usize;

        while self.at().is_some() {
            let ch = self.escape();
            text.push(ch);
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }

        // Source ran out mid-object: close whatever is still open.
        for _ in 0..depth {
            text.push('}');
        }

        self.value = text;
        Kind::Object
    }

    /// Resolves one character, following backslash escapes. Callers must
    /// check for end of input first.
    fn escape(&mut self) -> char {
        let ch = match self.at() {
            Some(ch) => ch,
            None => return '\0',
        };
        self.advance();

        if ch != '\\' {
            return ch;
        }

        let simple = match self.at() {
            Some('n') => Some('\n'),
            Some('r') => Some('\r'),
            Some('t') => Some('\t'),
            Some('\\') => Some('\\'),
            Some('\'') => Some('\''),
            Some('"') => Some('"'),
            _ => None,
        };
        if let Some(resolved) = simple {
            self.advance();
            return resolved;
        }

        let save = self.current;
        let resolved = if self.match_char('x') {
            self.digits(16, 2)
        } else {
            self.digits(8, 3)
        };

        match resolved {
            Some(resolved) => resolved,
            None => {
                self.current = save;
                '\\'
            }
        }
    }

    fn digits(&mut self, radix: u32, count: usize) -> Option<char> {
        let mut code = 0u32;
        for _ in 0..count {
            let digit = self.at()?.to_digit(radix)?;
            code = code * radix + digit;
            self.advance();
        }
        char::from_u32(code)
    }

    fn number(&mut self) -> Kind {
        self.match_while(|ch| ch.is_ascii_digit());
        if self.at() == Some('.') && self.peek().map_or(false, |ch| ch.is_ascii_digit()) {
            self.advance();
            self.match_while(|ch| ch.is_ascii_digit());
        }
        self.set_value();
        Kind::Number
    }

    fn identifier(&mut self) -> Kind {
        self.match_while(|ch| ch.is_ascii_alphanumeric() || ch == '_');
        if matches!(self.at(), Some('!') | Some('?')) {
            self.advance();
        }
        self.set_value();

        match Kind::keyword(&self.value) {
            Some(keyword) => {
                self.keyword = Some(keyword);
                keyword
            }
            None => Kind::Error,
        }
    }
}

fn is_white(ch: char) -> bool {
    ch == ' ' || ('\t'..='\r').contains(&ch)
}
