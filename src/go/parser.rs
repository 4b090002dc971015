//! Declaration-level Go parser.
//!
//! Splits a file into header comments, package clause, import declarations
//! and top-level declarations. Declaration boundaries follow Go's automatic
//! semicolon insertion at nesting depth zero, so bodies never need to be
//! understood beyond delimiter balance.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::{
    Decl, DeclKind, Header, ImportDecl, ImportSpec, PackageClause, Receiver, SourceFile, Span,
};
use super::fileset::{FileId, FileSet, Position};
use super::lexer::{is_keyword, LexErrorKind, Lexer, Token, TokenKind};

/// `//go:build` and legacy `// +build` lines
static BUILD_CONSTRAINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^//(go:build\s|\s*\+build\s)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("{0}")]
    Lex(LexErrorKind),
    #[error("expected 'package' clause")]
    MissingPackageClause,
    #[error("expected {expected}, found '{found}'")]
    UnexpectedToken { found: String, expected: &'static str },
    #[error("unexpected '{found}' without matching opening delimiter")]
    UnbalancedDelimiter { found: String },
    #[error("'{open}' closed by '{close}'")]
    MismatchedDelimiter { open: String, close: String },
    #[error("'{open}' is never closed")]
    UnclosedDelimiter { open: String },
    #[error("malformed import: {0}")]
    MalformedImport(String),
    #[error("malformed method receiver")]
    MalformedReceiver,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{position}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub position: Position,
}

/// Read only the package name of a file.
pub fn parse_package_clause(fset: &FileSet, name: &str, src: &str) -> Result<String, ParseError> {
    let file = fset.add_file(name, src);
    let mut lexer = Lexer::new(src);
    let mut significant = Vec::with_capacity(2);

    while significant.len() < 2 {
        let token = lexer
            .next_token()
            .map_err(|e| error_at(fset, file, ParseErrorKind::Lex(e.kind), e.offset))?;
        match token {
            Some(t) if t.is_comment() => continue,
            Some(t) => significant.push(t),
            None => break,
        }
    }

    match significant.as_slice() {
        [kw, name_tok]
            if kw.kind == TokenKind::Ident
                && kw.text(src) == "package"
                && name_tok.kind == TokenKind::Ident
                && !is_keyword(name_tok.text(src)) =>
        {
            Ok(name_tok.text(src).to_string())
        }
        [kw, ..] => Err(error_at(
            fset,
            file,
            ParseErrorKind::MissingPackageClause,
            kw.span.start,
        )),
        [] => Err(error_at(fset, file, ParseErrorKind::MissingPackageClause, 0)),
    }
}

/// Parse a whole file into its declaration structure.
pub fn parse_file(fset: &FileSet, name: &str, src: &str) -> Result<SourceFile, ParseError> {
    let file = fset.add_file(name, src);
    let tokens = Lexer::tokenize(src)
        .map_err(|e| error_at(fset, file, ParseErrorKind::Lex(e.kind), e.offset))?;

    let mut parser = Parser {
        fset,
        file,
        src,
        tokens,
        pos: 0,
    };
    parser.parse(name)
}

fn error_at(fset: &FileSet, file: FileId, kind: ParseErrorKind, offset: usize) -> ParseError {
    ParseError {
        kind,
        position: fset.position(file, offset),
    }
}

struct Parser<'a> {
    fset: &'a FileSet,
    file: FileId,
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse(&mut self, name: &str) -> Result<SourceFile, ParseError> {
        let header_end = self.skip_comments();
        let header = self.build_header(0, header_end);
        let package = self.parse_package()?;

        let mut imports = Vec::new();
        let mut decls: Vec<Decl> = Vec::new();

        loop {
            let leading_first = self.pos;
            let comments_end = self.skip_comments();
            while self.peek_kind() == Some(TokenKind::Semicolon) {
                self.pos += 1;
                self.skip_comments();
            }

            let Some(token) = self.peek() else {
                // Comments after the last declaration stay with it
                if comments_end > leading_first {
                    if let Some(last) = decls.last_mut() {
                        last.span.end = self.tokens[comments_end - 1].span.end;
                    }
                }
                break;
            };

            let leading_start = if comments_end > leading_first {
                Some(self.tokens[leading_first].span.start)
            } else {
                None
            };
            let leading_comments = (leading_first..comments_end).collect::<Vec<_>>();

            let keyword = if token.kind == TokenKind::Ident {
                token.text(self.src)
            } else {
                ""
            };

            let start_idx = self.pos;
            match keyword {
                "import" | "type" | "var" | "const" | "func" => {}
                _ => {
                    return Err(self.error(
                        ParseErrorKind::UnexpectedToken {
                            found: token.text(self.src).to_string(),
                            expected: "declaration",
                        },
                        token.span.start,
                    ))
                }
            }

            let end_idx = self.scan_decl_end(start_idx)?;
            let span_end = self.absorb_trailing_comment(end_idx);
            let span = Span::new(token.span.start, span_end);

            if keyword == "import" {
                let decl = self.parse_import(start_idx, end_idx, span, &leading_comments)?;
                imports.push(decl);
            } else {
                let decl = self.parse_decl(keyword, start_idx, end_idx, span, leading_start)?;
                decls.push(decl);
            }
        }

        Ok(SourceFile {
            file: self.file,
            name: name.to_string(),
            src: self.src.to_string(),
            header,
            package,
            imports,
            decls,
        })
    }

    fn parse_package(&mut self) -> Result<PackageClause, ParseError> {
        let Some(kw) = self.peek() else {
            return Err(self.error(ParseErrorKind::MissingPackageClause, self.src.len()));
        };
        if kw.kind != TokenKind::Ident || kw.text(self.src) != "package" {
            return Err(self.error(ParseErrorKind::MissingPackageClause, kw.span.start));
        }
        self.pos += 1;
        self.skip_comments();

        let name_tok = match self.peek() {
            Some(t) if t.kind == TokenKind::Ident && !is_keyword(t.text(self.src)) => t,
            Some(t) => {
                return Err(self.error(
                    ParseErrorKind::UnexpectedToken {
                        found: t.text(self.src).to_string(),
                        expected: "package name",
                    },
                    t.span.start,
                ))
            }
            None => return Err(self.error(ParseErrorKind::MissingPackageClause, kw.span.start)),
        };
        self.pos += 1;
        // A comment on the package line is dropped with the clause
        self.absorb_trailing_comment(self.pos);

        Ok(PackageClause {
            name: name_tok.text(self.src).to_string(),
            span: Span::new(kw.span.start, name_tok.span.end),
        })
    }

    /// Group the comments before the package clause into the header.
    fn build_header(&self, from: usize, to: usize) -> Header {
        let mut groups: Vec<(usize, usize)> = Vec::new();
        for idx in from..to {
            match groups.last_mut() {
                Some((_, last)) if !self.blank_line_between(self.tokens[*last].span.end, self.tokens[idx].span.start) => {
                    *last = idx;
                }
                _ => groups.push((idx, idx)),
            }
        }

        let mut header = Header::default();
        let package_start = self.tokens.get(to).map_or(self.src.len(), |t| t.span.start);

        let count = groups.len();
        for (n, (first, last)) in groups.into_iter().enumerate() {
            let text = Span::new(self.tokens[first].span.start, self.tokens[last].span.end)
                .text(self.src)
                .to_string();
            let lines: Vec<&str> = (first..=last).map(|i| self.tokens[i].text(self.src)).collect();

            if lines.iter().all(|l| BUILD_CONSTRAINT.is_match(l)) {
                header
                    .build_constraints
                    .extend(lines.iter().map(|l| l.trim_end().to_string()));
            } else if n + 1 == count
                && !self.blank_line_between(self.tokens[last].span.end, package_start)
            {
                header.package_doc = Some(text);
            } else {
                header.comments.push(text);
            }
        }

        header
    }

    /// Find the token index one past the end of the declaration starting at
    /// `start`, following the semicolon insertion rule at depth zero.
    fn scan_decl_end(&mut self, start: usize) -> Result<usize, ParseError> {
        let mut stack: Vec<usize> = Vec::new();
        let mut idx = start;

        while idx < self.tokens.len() {
            let token = self.tokens[idx];
            if token.is_comment() {
                idx += 1;
                continue;
            }

            match token.kind {
                TokenKind::LParen | TokenKind::LBrack | TokenKind::LBrace => stack.push(idx),
                TokenKind::RParen | TokenKind::RBrack | TokenKind::RBrace => {
                    let Some(open_idx) = stack.pop() else {
                        return Err(self.error(
                            ParseErrorKind::UnbalancedDelimiter {
                                found: token.text(self.src).to_string(),
                            },
                            token.span.start,
                        ));
                    };
                    let open = self.tokens[open_idx];
                    if !delimiters_match(open.kind, token.kind) {
                        return Err(self.error(
                            ParseErrorKind::MismatchedDelimiter {
                                open: open.text(self.src).to_string(),
                                close: token.text(self.src).to_string(),
                            },
                            token.span.start,
                        ));
                    }
                }
                TokenKind::Semicolon if stack.is_empty() => {
                    self.pos = idx + 1;
                    return Ok(idx);
                }
                _ => {}
            }

            if stack.is_empty() && token.ends_statement(self.src) {
                match self.next_significant(idx + 1) {
                    None => {
                        self.pos = idx + 1;
                        return Ok(idx + 1);
                    }
                    Some(next) => {
                        let gap = &self.src[token.span.end..self.tokens[next].span.start];
                        if gap.contains('\n') {
                            self.pos = idx + 1;
                            return Ok(idx + 1);
                        }
                    }
                }
            }
            idx += 1;
        }

        if let Some(&open_idx) = stack.first() {
            let open = self.tokens[open_idx];
            return Err(self.error(
                ParseErrorKind::UnclosedDelimiter {
                    open: open.text(self.src).to_string(),
                },
                open.span.start,
            ));
        }

        self.pos = self.tokens.len();
        Ok(self.tokens.len())
    }

    /// Include comments that sit on the same line right after token
    /// `end_idx - 1`; returns the new byte end and advances `pos` past them.
    fn absorb_trailing_comment(&mut self, end_idx: usize) -> usize {
        let mut end = self.tokens[end_idx - 1].span.end;
        let mut idx = end_idx.max(self.pos);
        while let Some(token) = self.tokens.get(idx) {
            if !token.is_comment() || self.src[end..token.span.start].contains('\n') {
                break;
            }
            end = token.span.end;
            idx += 1;
        }
        self.pos = idx;
        end
    }

    fn parse_import(
        &self,
        start: usize,
        end: usize,
        span: Span,
        leading: &[usize],
    ) -> Result<ImportDecl, ParseError> {
        let mut idx = self.next_significant(start + 1).filter(|&i| i < end);
        let Some(first) = idx else {
            return Err(self.error(
                ParseErrorKind::MalformedImport("missing import path".to_string()),
                self.tokens[start].span.end,
            ));
        };

        if self.tokens[first].kind != TokenKind::LParen {
            let mut spec = self.parse_import_spec(first, end)?.0;
            if let (Some(&a), Some(&b)) = (leading.first(), leading.last()) {
                if !self.blank_line_between(self.tokens[b].span.end, self.tokens[start].span.start) {
                    spec.doc = Some(
                        Span::new(self.tokens[a].span.start, self.tokens[b].span.end)
                            .text(self.src)
                            .to_string(),
                    );
                }
            }
            spec.comment = self.trailing_comment_after(end);
            return Ok(ImportDecl {
                span,
                grouped: false,
                specs: vec![spec],
            });
        }

        // Grouped: `import ( spec; spec )`, the closing paren is at end - 1
        let close = end - 1;
        let mut specs = Vec::new();
        idx = Some(first + 1);
        let mut doc_start: Option<usize> = None;
        let mut prev_end = self.tokens[first].span.end;

        while let Some(i) = idx {
            if i >= close {
                break;
            }
            let token = self.tokens[i];
            if token.is_comment() {
                let attached = !self.blank_line_between(prev_end, token.span.start);
                if doc_start.is_none() || !attached {
                    doc_start = Some(i);
                }
                prev_end = token.span.end;
                idx = Some(i + 1);
                continue;
            }
            if token.kind == TokenKind::Semicolon {
                doc_start = None;
                idx = Some(i + 1);
                continue;
            }

            let (mut spec, last) = self.parse_import_spec(i, close)?;
            if let Some(d) = doc_start.take() {
                if !self.blank_line_between(self.tokens[i - 1].span.end, token.span.start) {
                    spec.doc = Some(
                        Span::new(self.tokens[d].span.start, self.tokens[i - 1].span.end)
                            .text(self.src)
                            .to_string(),
                    );
                }
            }
            spec.comment = self.trailing_comment_after(last + 1);

            let mut next = last + 1;
            if spec.comment.is_some() {
                next += 1;
            }
            prev_end = self.tokens[next - 1].span.end;
            specs.push(spec);
            idx = Some(next);
        }

        Ok(ImportDecl {
            span,
            grouped: true,
            specs,
        })
    }

    /// Parse `[name] "path"` starting at token `idx`; returns the spec and
    /// the index of the path token.
    fn parse_import_spec(&self, idx: usize, limit: usize) -> Result<(ImportSpec, usize), ParseError> {
        let token = self.tokens[idx];
        let (name, path_idx) = match token.kind {
            TokenKind::Ident => (Some(token.text(self.src).to_string()), self.next_significant(idx + 1)),
            TokenKind::Dot => (Some(".".to_string()), self.next_significant(idx + 1)),
            _ => (None, Some(idx)),
        };

        let path_idx = path_idx.filter(|&i| i < limit).ok_or_else(|| {
            self.error(
                ParseErrorKind::MalformedImport("missing import path".to_string()),
                token.span.start,
            )
        })?;
        let path_tok = self.tokens[path_idx];
        let raw = path_tok.text(self.src);
        let path = match path_tok.kind {
            TokenKind::String | TokenKind::RawString if raw.len() >= 2 => raw[1..raw.len() - 1].to_string(),
            _ => {
                return Err(self.error(
                    ParseErrorKind::MalformedImport(format!("expected import path, found '{}'", raw)),
                    path_tok.span.start,
                ))
            }
        };
        if path.is_empty() {
            return Err(self.error(
                ParseErrorKind::MalformedImport("empty import path".to_string()),
                path_tok.span.start,
            ));
        }

        Ok((
            ImportSpec {
                name,
                path,
                path_span: path_tok.span,
                doc: None,
                comment: None,
            },
            path_idx,
        ))
    }

    /// Comment token at `idx` if it sits on the same line as the token before
    fn trailing_comment_after(&self, idx: usize) -> Option<String> {
        let prev = self.tokens.get(idx.checked_sub(1)?)?;
        let token = self.tokens.get(idx)?;
        if token.is_comment() && !self.src[prev.span.end..token.span.start].contains('\n') {
            Some(token.text(self.src).to_string())
        } else {
            None
        }
    }

    fn parse_decl(
        &self,
        keyword: &str,
        start: usize,
        end: usize,
        span: Span,
        leading_start: Option<usize>,
    ) -> Result<Decl, ParseError> {
        let significant: Vec<usize> = (start + 1..end)
            .filter(|&i| !self.tokens[i].is_comment())
            .collect();

        let (kind, names, receiver) = match keyword {
            "func" => self.parse_func_head(start, &significant)?,
            "type" => (DeclKind::Type, self.spec_names(&significant, false), None),
            "var" => (DeclKind::Var, self.spec_names(&significant, true), None),
            _ => (DeclKind::Const, self.spec_names(&significant, true), None),
        };

        Ok(Decl {
            kind,
            names,
            receiver,
            span,
            leading_start,
        })
    }

    fn parse_func_head(
        &self,
        start: usize,
        significant: &[usize],
    ) -> Result<(DeclKind, Vec<String>, Option<Receiver>), ParseError> {
        let missing_name = |at: usize| {
            self.error(
                ParseErrorKind::UnexpectedToken {
                    found: self.tokens.get(at).map_or(String::new(), |t| t.text(self.src).to_string()),
                    expected: "function name",
                },
                self.tokens.get(at).map_or(self.tokens[start].span.end, |t| t.span.start),
            )
        };

        let Some(&first) = significant.first() else {
            return Err(missing_name(start + 1));
        };

        if self.tokens[first].kind != TokenKind::LParen {
            let tok = self.tokens[first];
            if tok.kind != TokenKind::Ident {
                return Err(missing_name(first));
            }
            return Ok((DeclKind::Func, vec![tok.text(self.src).to_string()], None));
        }

        // Receiver list runs to the matching ')'
        let mut depth = 0usize;
        let mut close_pos = None;
        for (n, &i) in significant.iter().enumerate() {
            match self.tokens[i].kind {
                TokenKind::LParen | TokenKind::LBrack | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBrack | TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        close_pos = Some(n);
                        break;
                    }
                }
                _ => {}
            }
        }
        let close_pos = close_pos.ok_or_else(|| {
            self.error(ParseErrorKind::MalformedReceiver, self.tokens[first].span.start)
        })?;

        let receiver = self.parse_receiver(&significant[1..close_pos], self.tokens[first].span.start)?;

        let name_idx = significant.get(close_pos + 1).copied();
        match name_idx {
            Some(i) if self.tokens[i].kind == TokenKind::Ident => Ok((
                DeclKind::Method,
                vec![self.tokens[i].text(self.src).to_string()],
                Some(receiver),
            )),
            Some(i) => Err(missing_name(i)),
            None => Err(missing_name(significant[close_pos] + 1)),
        }
    }

    fn parse_receiver(&self, inner: &[usize], at: usize) -> Result<Receiver, ParseError> {
        // Keep identifiers, '*' and the '[' that opens type parameters
        let toks: Vec<Token> = inner
            .iter()
            .map(|&i| self.tokens[i])
            .filter(|t| {
                t.kind == TokenKind::Ident
                    || t.kind == TokenKind::LBrack
                    || (t.kind == TokenKind::Op && t.text(self.src) == "*")
            })
            .collect();

        let is_star = |t: &Token| t.kind == TokenKind::Op && t.text(self.src) == "*";
        let mut i = 0;
        let mut name = None;

        if toks.len() > 1
            && toks[0].kind == TokenKind::Ident
            && (toks[1].kind == TokenKind::Ident || is_star(&toks[1]))
        {
            name = Some(toks[0].text(self.src).to_string());
            i = 1;
        }

        let mut pointer = false;
        if toks.get(i).map_or(false, is_star) {
            pointer = true;
            i += 1;
        }

        match toks.get(i) {
            Some(t) if t.kind == TokenKind::Ident => Ok(Receiver {
                name,
                type_name: t.text(self.src).to_string(),
                pointer,
            }),
            _ => Err(self.error(ParseErrorKind::MalformedReceiver, at)),
        }
    }

    /// Names declared by a `type`/`var`/`const` declaration, grouped or not.
    fn spec_names(&self, significant: &[usize], multi: bool) -> Vec<String> {
        let mut names = Vec::new();
        let Some(&first) = significant.first() else {
            return names;
        };

        let grouped = self.tokens[first].kind == TokenKind::LParen;
        let body: &[usize] = if grouped { &significant[1..] } else { significant };

        let mut depth = 0usize;
        let mut at_spec_start = true;
        let mut collecting = false;
        let mut prev_end = self.tokens[first].span.end;

        for (n, &i) in body.iter().enumerate() {
            let token = self.tokens[i];

            if grouped && depth == 0 && self.src[prev_end..token.span.start].contains('\n') {
                at_spec_start = true;
            }
            prev_end = token.span.end;

            match token.kind {
                TokenKind::LParen | TokenKind::LBrack | TokenKind::LBrace => {
                    depth += 1;
                    collecting = false;
                    continue;
                }
                TokenKind::RParen | TokenKind::RBrack | TokenKind::RBrace => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    continue;
                }
                TokenKind::Semicolon if depth == 0 => {
                    at_spec_start = true;
                    continue;
                }
                _ => {}
            }
            if depth > 0 {
                continue;
            }

            if at_spec_start && token.kind == TokenKind::Ident {
                names.push(token.text(self.src).to_string());
                at_spec_start = false;
                collecting = multi;
            } else if collecting && token.kind == TokenKind::Comma {
                match body.get(n + 1).map(|&j| self.tokens[j]) {
                    Some(next) if next.kind == TokenKind::Ident => {}
                    _ => collecting = false,
                }
            } else if collecting && token.kind == TokenKind::Ident {
                let prev = self.tokens[body[n - 1]];
                if prev.kind == TokenKind::Comma {
                    names.push(token.text(self.src).to_string());
                } else {
                    collecting = false;
                }
            } else {
                at_spec_start = false;
                collecting = false;
            }

            if !grouped && !at_spec_start && !collecting {
                break;
            }
        }

        names
    }

    fn skip_comments(&mut self) -> usize {
        while self.pos < self.tokens.len() && self.tokens[self.pos].is_comment() {
            self.pos += 1;
        }
        self.pos
    }

    fn next_significant(&self, from: usize) -> Option<usize> {
        (from..self.tokens.len()).find(|&i| !self.tokens[i].is_comment())
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn blank_line_between(&self, from: usize, to: usize) -> bool {
        self.src[from..to].matches('\n').count() >= 2
    }

    fn error(&self, kind: ParseErrorKind, offset: usize) -> ParseError {
        error_at(self.fset, self.file, kind, offset)
    }
}

fn delimiters_match(open: TokenKind, close: TokenKind) -> bool {
    matches!(
        (open, close),
        (TokenKind::LParen, TokenKind::RParen)
            | (TokenKind::LBrack, TokenKind::RBrack)
            | (TokenKind::LBrace, TokenKind::RBrace)
    )
}
