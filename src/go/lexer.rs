//! Go tokenizer producing spanned tokens.
//!
//! Works on bytes, decoding UTF-8 only where an identifier may continue
//! with a non-ASCII letter. Comments are kept as tokens because the parser
//! attaches them to declarations.

use super::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    /// Interpreted string literal `"..."`
    String,
    /// Raw string literal
    RawString,
    Rune,
    LineComment,
    BlockComment,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Dot,
    /// `++` and `--` (they trigger semicolon insertion)
    IncDec,
    /// Any other operator or punctuation
    Op,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        self.span.text(src)
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::LineComment | TokenKind::BlockComment)
    }

    /// Whether a newline after this token ends the statement
    /// (Go's automatic semicolon insertion rule)
    pub fn ends_statement(&self, src: &str) -> bool {
        match self.kind {
            TokenKind::Ident => {
                let text = self.text(src);
                !is_keyword(text) || matches!(text, "break" | "continue" | "fallthrough" | "return")
            }
            TokenKind::Number
            | TokenKind::String
            | TokenKind::RawString
            | TokenKind::Rune
            | TokenKind::RParen
            | TokenKind::RBrack
            | TokenKind::RBrace
            | TokenKind::IncDec => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    UnterminatedString,
    UnterminatedRawString,
    UnterminatedRune,
    UnterminatedComment,
}

impl std::fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            LexErrorKind::UnterminatedString => "string literal not terminated",
            LexErrorKind::UnterminatedRawString => "raw string literal not terminated",
            LexErrorKind::UnterminatedRune => "rune literal not terminated",
            LexErrorKind::UnterminatedComment => "comment not terminated",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub offset: usize,
}

/// Go keywords
pub fn is_keyword(ident: &str) -> bool {
    matches!(
        ident,
        "break" | "case" | "chan" | "const" | "continue" | "default" | "defer"
            | "else" | "fallthrough" | "for" | "func" | "go" | "goto" | "if"
            | "import" | "interface" | "map" | "package" | "range" | "return"
            | "select" | "struct" | "switch" | "type" | "var"
    )
}

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    /// Tokenize the whole source
    pub fn tokenize(src: &'a str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(src);
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Next token, or `None` at end of input
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();
        if self.pos >= self.bytes.len() {
            return Ok(None);
        }

        let start = self.pos;
        let kind = match self.peek() {
            b'/' if self.peek_ahead(1) == Some(b'/') => {
                self.skip_line_comment();
                TokenKind::LineComment
            }
            b'/' if self.peek_ahead(1) == Some(b'*') => {
                self.skip_block_comment()?;
                TokenKind::BlockComment
            }
            b'"' => {
                self.skip_string()?;
                TokenKind::String
            }
            b'`' => {
                self.skip_raw_string()?;
                TokenKind::RawString
            }
            b'\'' => {
                self.skip_rune()?;
                TokenKind::Rune
            }
            b'0'..=b'9' => {
                self.skip_number();
                TokenKind::Number
            }
            b'.' if self.peek_ahead(1).map_or(false, |b| b.is_ascii_digit()) => {
                self.skip_number();
                TokenKind::Number
            }
            b'.' if self.peek_ahead(1) == Some(b'.') && self.peek_ahead(2) == Some(b'.') => {
                self.pos += 3;
                TokenKind::Op
            }
            b'(' => self.single(TokenKind::LParen),
            b')' => self.single(TokenKind::RParen),
            b'[' => self.single(TokenKind::LBrack),
            b']' => self.single(TokenKind::RBrack),
            b'{' => self.single(TokenKind::LBrace),
            b'}' => self.single(TokenKind::RBrace),
            b',' => self.single(TokenKind::Comma),
            b';' => self.single(TokenKind::Semicolon),
            b'.' => self.single(TokenKind::Dot),
            b'+' if self.peek_ahead(1) == Some(b'+') => {
                self.pos += 2;
                TokenKind::IncDec
            }
            b'-' if self.peek_ahead(1) == Some(b'-') => {
                self.pos += 2;
                TokenKind::IncDec
            }
            _ if self.at_ident_start() => {
                self.skip_ident();
                TokenKind::Ident
            }
            _ => {
                // Advance a whole char so spans stay on UTF-8 boundaries
                let width = self.src[self.pos..].chars().next().map_or(1, char::len_utf8);
                self.pos += width;
                TokenKind::Op
            }
        };

        Ok(Some(Token {
            kind,
            span: Span::new(start, self.pos),
        }))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() {
            match self.peek() {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                // Byte order mark
                0xEF if self.src[self.pos..].starts_with('\u{FEFF}') => self.pos += 3,
                _ => break,
            }
        }
    }

    fn at_ident_start(&self) -> bool {
        let b = self.peek();
        if b.is_ascii_alphabetic() || b == b'_' {
            return true;
        }
        if b >= 0x80 {
            return self.src[self.pos..]
                .chars()
                .next()
                .map_or(false, char::is_alphabetic);
        }
        false
    }

    fn skip_ident(&mut self) {
        while self.pos < self.bytes.len() {
            let b = self.peek();
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else if b >= 0x80 {
                match self.src[self.pos..].chars().next() {
                    Some(c) if c.is_alphanumeric() => self.pos += c.len_utf8(),
                    _ => break,
                }
            } else {
                break;
            }
        }
    }

    fn skip_number(&mut self) {
        let hex = self.peek() == b'0' && matches!(self.peek_ahead(1), Some(b'x') | Some(b'X'));
        while self.pos < self.bytes.len() {
            let b = self.peek();
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
                let exponent = if hex {
                    matches!(b, b'p' | b'P')
                } else {
                    matches!(b, b'e' | b'E' | b'p' | b'P')
                };
                self.pos += 1;
                if exponent && matches!(self.peek(), b'+' | b'-') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while self.pos < self.bytes.len() && self.peek() != b'\n' {
            self.pos += 1;
        }
        // A trailing \r belongs to the line ending, not the comment
        if self.pos > 0 && self.bytes[self.pos - 1] == b'\r' {
            self.pos -= 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 2;
        while self.pos + 1 < self.bytes.len() {
            if self.peek() == b'*' && self.peek_ahead(1) == Some(b'/') {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(self.error(LexErrorKind::UnterminatedComment, start))
    }

    fn skip_string(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.peek() {
                b'"' => {
                    self.pos += 1;
                    return Ok(());
                }
                b'\\' => self.pos += 2,
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
        Err(self.error(LexErrorKind::UnterminatedString, start))
    }

    fn skip_raw_string(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.bytes.len() {
            if self.peek() == b'`' {
                self.pos += 1;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(self.error(LexErrorKind::UnterminatedRawString, start))
    }

    fn skip_rune(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 1;
        while self.pos < self.bytes.len() {
            match self.peek() {
                b'\'' => {
                    self.pos += 1;
                    return Ok(());
                }
                b'\\' => self.pos += 2,
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
        Err(self.error(LexErrorKind::UnterminatedRune, start))
    }

    fn error(&mut self, kind: LexErrorKind, offset: usize) -> LexError {
        self.pos = self.bytes.len();
        LexError { kind, offset }
    }

    fn peek(&self) -> u8 {
        if self.pos < self.bytes.len() {
            self.bytes[self.pos]
        } else {
            0
        }
    }

    fn peek_ahead(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.pos + n).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_selector_tokens() {
        let src = "fmt.Println(x)";
        let tokens = Lexer::tokenize(src).unwrap();
        assert_eq!(
            kinds(src),
            vec![
                TokenKind::Ident,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::RParen
            ]
        );
        assert_eq!(tokens[2].text(src), "Println");
    }

    #[test]
    fn test_braces_inside_literals_are_opaque() {
        let src = "x := \"{ not a brace }\" + `raw {\n}` + '}'";
        let k = kinds(src);
        assert!(!k.contains(&TokenKind::LBrace));
        assert!(!k.contains(&TokenKind::RBrace));
        assert!(k.contains(&TokenKind::RawString));
        assert!(k.contains(&TokenKind::Rune));
    }

    #[test]
    fn test_comments_are_tokens() {
        let src = "// line\n/* block\n comment */ x";
        let tokens = Lexer::tokenize(src).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::LineComment);
        assert_eq!(tokens[0].text(src), "// line");
        assert_eq!(tokens[1].kind, TokenKind::BlockComment);
        assert_eq!(tokens[2].text(src), "x");
    }

    #[test]
    fn test_numbers_and_exponents() {
        let src = "1.5e-3 0x1p+4 0xFF .5";
        let tokens = Lexer::tokenize(src).unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text(src)).collect();
        assert_eq!(texts, vec!["1.5e-3", "0x1p+4", "0xFF", ".5"]);
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let src = r#""a\"b" c"#;
        let tokens = Lexer::tokenize(src).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text(src), r#""a\"b""#);
    }

    #[test]
    fn test_unicode_identifier() {
        let src = "var größe = 1";
        let tokens = Lexer::tokenize(src).unwrap();
        assert_eq!(tokens[1].text(src), "größe");
    }

    #[test]
    fn test_inc_dec_and_ellipsis() {
        assert_eq!(kinds("i++"), vec![TokenKind::Ident, TokenKind::IncDec]);
        assert_eq!(
            kinds("f(a...)"),
            vec![
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::Op,
                TokenKind::RParen
            ]
        );
    }

    #[test]
    fn test_unterminated_literals() {
        let err = Lexer::tokenize("x := \"abc\n").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!(err.offset, 5);

        let err = Lexer::tokenize("x := `abc").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedRawString);

        let err = Lexer::tokenize("/* open").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedComment);
    }

    #[test]
    fn test_semicolon_rule() {
        let src = "return x ) = {";
        let tokens = Lexer::tokenize(src).unwrap();
        assert!(tokens[0].ends_statement(src)); // return
        assert!(tokens[1].ends_statement(src)); // x
        assert!(tokens[2].ends_statement(src)); // )
        assert!(!tokens[3].ends_statement(src)); // =
        assert!(!tokens[4].ends_statement(src)); // {
    }
}
