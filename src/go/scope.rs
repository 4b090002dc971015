//! Block-scope tracking for package selector detection.
//!
//! `x.Sel` only refers to an imported package when `x` is not bound by an
//! enclosing function: a receiver, parameter or result name, a `:=` or
//! `var` left-hand side, or a `range` variable. The walk keeps one scope
//! per brace block and makes a binding visible where Go does, after the
//! statement that declares it, or inside the block an `if`/`for`/`switch`
//! header opens.

use std::collections::{HashMap, HashSet};

use super::lexer::{is_keyword, Token, TokenKind};

struct Pending {
    names: Vec<String>,
    depth: (usize, usize),
    /// Declared in a statement header, visible only in the following block
    in_header: bool,
}

/// Identifiers used as `x.Sel` where `x` is not a local binding.
///
/// `tokens` must be comment-free and cover whole declarations.
pub fn package_selectors(src: &str, tokens: &[Token]) -> HashSet<String> {
    let mut used = HashSet::new();
    let mut scopes: Vec<HashSet<String>> = Vec::new();
    let mut parens = 0usize;
    let mut bodies: HashMap<usize, Vec<String>> = HashMap::new();
    let mut pending: Vec<Pending> = Vec::new();
    let mut header: Option<(usize, usize)> = None;
    // names from `if x := f(); ...` visible in the rest of the header
    let mut header_bound: HashSet<String> = HashSet::new();

    for (k, tok) in tokens.iter().enumerate() {
        let depth = (scopes.len(), parens);
        if k > 0 && newline_between(src, &tokens[k - 1], tok) {
            bind_statement(&mut pending, &mut scopes, depth);
        }

        match tok.kind {
            TokenKind::LBrace => {
                let mut names = bodies.remove(&k).unwrap_or_default();
                if header == Some(depth) {
                    header = None;
                    names.extend(take_header(&mut pending, depth));
                    names.extend(header_bound.drain());
                }
                scopes.push(names.into_iter().collect());
            }
            TokenKind::RBrace => {
                scopes.pop();
                let open = scopes.len();
                pending.retain(|p| p.depth.0 <= open);
            }
            TokenKind::LParen | TokenKind::LBrack => parens += 1,
            TokenKind::RParen | TokenKind::RBrack => parens = parens.saturating_sub(1),
            TokenKind::Semicolon => {
                if header == Some(depth) {
                    header_bound.extend(take_header(&mut pending, depth));
                }
                bind_statement(&mut pending, &mut scopes, depth);
            }
            TokenKind::Ident => match tok.text(src) {
                "func" => {
                    if let Some((body, names)) = signature_bindings(src, tokens, k) {
                        bodies.insert(body, names);
                    }
                }
                "if" | "for" | "switch" | "select" => {
                    header = Some(depth);
                    header_bound.clear();
                }
                "var" | "const" if !scopes.is_empty() => pending.push(Pending {
                    names: var_names(src, tokens, k),
                    depth,
                    in_header: false,
                }),
                name => {
                    let bound = header_bound.contains(name) || scopes.iter().any(|s| s.contains(name));
                    if is_selector_base(tokens, k) && !bound {
                        used.insert(name.to_string());
                    }
                }
            },
            TokenKind::Op if is_define(src, tokens, k) => pending.push(Pending {
                names: define_names(src, tokens, k),
                depth,
                in_header: header == Some(depth),
            }),
            _ => {}
        }
    }
    used
}

fn newline_between(src: &str, prev: &Token, next: &Token) -> bool {
    src[prev.span.end..next.span.start].contains('\n')
}

/// Moves finished statement bindings at `depth` into the innermost scope.
fn bind_statement(pending: &mut Vec<Pending>, scopes: &mut [HashSet<String>], depth: (usize, usize)) {
    let Some(scope) = scopes.last_mut() else {
        return;
    };
    pending.retain(|p| {
        if p.in_header || p.depth != depth {
            return true;
        }
        scope.extend(p.names.iter().cloned());
        false
    });
}

fn take_header(pending: &mut Vec<Pending>, depth: (usize, usize)) -> Vec<String> {
    let (header, rest): (Vec<Pending>, Vec<Pending>) =
        pending.drain(..).partition(|p| p.in_header && p.depth == depth);
    *pending = rest;
    header.into_iter().flat_map(|p| p.names).collect()
}

fn is_kind(tokens: &[Token], idx: usize, kind: TokenKind) -> bool {
    tokens.get(idx).map_or(false, |t| t.kind == kind)
}

fn is_selector_base(tokens: &[Token], k: usize) -> bool {
    is_kind(tokens, k + 1, TokenKind::Dot)
        && is_kind(tokens, k + 2, TokenKind::Ident)
        && (k == 0 || tokens[k - 1].kind != TokenKind::Dot)
}

/// `:` immediately followed by `=`
fn is_define(src: &str, tokens: &[Token], k: usize) -> bool {
    let (Some(colon), Some(eq)) = (tokens.get(k), tokens.get(k + 1)) else {
        return false;
    };
    colon.text(src) == ":" && eq.kind == TokenKind::Op && eq.text(src) == "=" && colon.span.end == eq.span.start
}

/// `a, b :=` walking back from the `:` at `k`
fn define_names(src: &str, tokens: &[Token], k: usize) -> Vec<String> {
    let mut names = Vec::new();
    let mut i = k;
    while i > 0 && tokens[i - 1].kind == TokenKind::Ident {
        names.push(tokens[i - 1].text(src).to_string());
        if i >= 2 && tokens[i - 2].kind == TokenKind::Comma {
            i -= 2;
        } else {
            break;
        }
    }
    names
}

/// Names declared by a `var` or `const` statement starting at `k`.
fn var_names(src: &str, tokens: &[Token], k: usize) -> Vec<String> {
    if !is_kind(tokens, k + 1, TokenKind::LParen) {
        return ident_list(src, tokens, k + 1);
    }
    let mut names = Vec::new();
    let mut depth = 0usize;
    let mut spec_start = true;
    for (i, tok) in tokens.iter().enumerate().skip(k + 1) {
        if i > k + 1 && depth == 1 && newline_between(src, &tokens[i - 1], tok) {
            spec_start = true;
        }
        match tok.kind {
            TokenKind::LParen | TokenKind::LBrack | TokenKind::LBrace => depth += 1,
            TokenKind::RParen | TokenKind::RBrack | TokenKind::RBrace => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            TokenKind::Semicolon if depth == 1 => spec_start = true,
            TokenKind::Ident if spec_start && depth == 1 => {
                names.extend(ident_list(src, tokens, i));
                spec_start = false;
            }
            _ => spec_start = false,
        }
    }
    names
}

/// `a, b, c` starting at `i`
fn ident_list(src: &str, tokens: &[Token], mut i: usize) -> Vec<String> {
    let mut names = Vec::new();
    while is_kind(tokens, i, TokenKind::Ident) {
        names.push(tokens[i].text(src).to_string());
        if !is_kind(tokens, i + 1, TokenKind::Comma) {
            break;
        }
        i += 2;
    }
    names
}

/// For a `func` keyword at `k` that has a body, the index of the body's
/// `{` and the receiver, type parameter, parameter and result names.
fn signature_bindings(src: &str, tokens: &[Token], k: usize) -> Option<(usize, Vec<String>)> {
    let mut names = Vec::new();
    let mut j = k + 1;
    let mut params_done = false;

    if is_kind(tokens, j, TokenKind::LParen) {
        let (close, group) = field_names(src, tokens, j, false)?;
        names.extend(group);
        j = close + 1;
        let method = is_kind(tokens, j, TokenKind::Ident)
            && (is_kind(tokens, j + 1, TokenKind::LParen) || is_kind(tokens, j + 1, TokenKind::LBrack));
        if method {
            j += 1;
        } else {
            // function literal: that group was the parameter list
            params_done = true;
        }
    } else if is_kind(tokens, j, TokenKind::Ident) {
        j += 1;
    }

    if !params_done {
        if is_kind(tokens, j, TokenKind::LBrack) {
            let (close, group) = field_names(src, tokens, j, true)?;
            names.extend(group);
            j = close + 1;
        }
        if !is_kind(tokens, j, TokenKind::LParen) {
            return None;
        }
        let (close, group) = field_names(src, tokens, j, false)?;
        names.extend(group);
        j = close + 1;
    }

    if is_kind(tokens, j, TokenKind::LParen) && !newline_between(src, &tokens[j - 1], &tokens[j]) {
        let (close, group) = field_names(src, tokens, j, false)?;
        names.extend(group);
        j = close + 1;
        let body = is_kind(tokens, j, TokenKind::LBrace) && !newline_between(src, &tokens[j - 1], &tokens[j]);
        return body.then_some((j, names));
    }
    body_after_result(src, tokens, j).map(|body| (body, names))
}

/// Skips an unparenthesized result type and finds the body's `{`.
fn body_after_result(src: &str, tokens: &[Token], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (k, tok) in tokens.iter().enumerate().skip(start) {
        if depth == 0 && newline_between(src, &tokens[k - 1], tok) {
            return None;
        }
        match tok.kind {
            TokenKind::LParen | TokenKind::LBrack => depth += 1,
            TokenKind::LBrace => {
                let type_literal = tokens[k - 1].kind == TokenKind::Ident
                    && matches!(tokens[k - 1].text(src), "struct" | "interface");
                if depth == 0 && !type_literal {
                    return Some(k);
                }
                depth += 1;
            }
            TokenKind::RParen | TokenKind::RBrack | TokenKind::RBrace => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            TokenKind::Comma | TokenKind::Semicolon if depth == 0 => return None,
            TokenKind::Op if depth == 0 && tok.text(src) == "=" => return None,
            _ => {}
        }
    }
    None
}

/// Names declared in a parenthesized or bracketed field list opening at
/// `open`. Returns the index of the closing token as well.
///
/// A list such as `(int, error)` declares nothing; `(a, b int)` declares
/// both names. Type parameter lists always name their entries.
fn field_names(src: &str, tokens: &[Token], open: usize, always_named: bool) -> Option<(usize, Vec<String>)> {
    let mut entries: Vec<Vec<usize>> = vec![Vec::new()];
    let mut depth = 0usize;
    let mut close = None;
    for (k, tok) in tokens.iter().enumerate().skip(open) {
        match tok.kind {
            TokenKind::LParen | TokenKind::LBrack | TokenKind::LBrace => {
                depth += 1;
                if depth == 1 {
                    continue;
                }
            }
            TokenKind::RParen | TokenKind::RBrack | TokenKind::RBrace => {
                depth -= 1;
                if depth == 0 {
                    close = Some(k);
                    break;
                }
            }
            TokenKind::Comma if depth == 1 => {
                entries.push(Vec::new());
                continue;
            }
            _ => {}
        }
        if let Some(entry) = entries.last_mut() {
            entry.push(k);
        }
    }
    let close = close?;

    entries.retain(|e| !e.is_empty());
    let named = always_named || entries.iter().any(|e| entry_is_named(src, tokens, e));
    if !named {
        return Some((close, Vec::new()));
    }
    let names = entries
        .iter()
        .map(|e| &tokens[e[0]])
        .filter(|t| t.kind == TokenKind::Ident && !is_keyword(t.text(src)))
        .map(|t| t.text(src).to_string())
        .collect();
    Some((close, names))
}

/// Whether a field list entry definitely starts with a name.
fn entry_is_named(src: &str, tokens: &[Token], entry: &[usize]) -> bool {
    let first = &tokens[entry[0]];
    if first.kind != TokenKind::Ident || is_keyword(first.text(src)) {
        return false;
    }
    let Some(&second) = entry.get(1) else {
        return false;
    };
    match tokens[second].kind {
        // pkg.Type
        TokenKind::Dot => false,
        // Generic[T] is a type, name []T is not
        TokenKind::LBrack => {
            let mut depth = 0usize;
            for (pos, &idx) in entry.iter().enumerate().skip(1) {
                match tokens[idx].kind {
                    TokenKind::LParen | TokenKind::LBrack | TokenKind::LBrace => depth += 1,
                    TokenKind::RParen | TokenKind::RBrack | TokenKind::RBrace => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            return pos + 1 < entry.len();
                        }
                    }
                    _ => {}
                }
            }
            false
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::go::lexer::Lexer;

    fn selectors(src: &str) -> Vec<String> {
        let tokens: Vec<Token> = Lexer::tokenize(src)
            .unwrap()
            .into_iter()
            .filter(|t| !t.is_comment())
            .collect();
        let mut names: Vec<String> = package_selectors(src, &tokens).into_iter().collect();
        names.sort();
        names
    }

    #[test]
    fn test_plain_selectors() {
        let src = "func F() { fmt.Println(strings.ToUpper(\"x\")) }\n";
        assert_eq!(selectors(src), vec!["fmt", "strings"]);
    }

    #[test]
    fn test_receiver_and_params_shadow() {
        let src = "func (url Req) P(path string, errors []E) string { return url.Path + path.Base + errors.X }\n";
        assert!(selectors(src).is_empty());
    }

    #[test]
    fn test_unnamed_params_bind_nothing() {
        let src = "func F(url.URL, int) { url.Parse() }\n";
        assert_eq!(selectors(src), vec!["url"]);
    }

    #[test]
    fn test_result_type_is_outside_param_scope() {
        let src = "func F(url string) *url.URL {\n\treturn nil\n}\n";
        assert_eq!(selectors(src), vec!["url"]);
    }

    #[test]
    fn test_short_var_decl_visible_after_statement() {
        let src = "func F(r R) {\n\turl, err := url.Parse(r.s)\n\t_ = url.Path\n}\n";
        assert_eq!(selectors(src), vec!["url"]);

        let src = "func F(r R) string {\n\turl := r.u\n\treturn url.Path\n}\n";
        assert!(selectors(src).is_empty());
    }

    #[test]
    fn test_binding_ends_with_block() {
        let src = "func F() {\n\tif true {\n\t\turl := 1\n\t\t_ = url.X\n\t}\n\turl.Parse()\n}\n";
        assert_eq!(selectors(src), vec!["url"]);
    }

    #[test]
    fn test_range_and_header_bindings() {
        let src = "func F(xs []R) {\n\tfor _, path := range xs {\n\t\t_ = path.Base\n\t}\n\tif io := g(); io.ok {\n\t\t_ = io.X\n\t}\n\t_ = path.Clean\n}\n";
        assert_eq!(selectors(src), vec!["path"]);
    }

    #[test]
    fn test_var_statements() {
        let src = "func F() {\n\tvar url U\n\t_ = url.X\n\tvar (\n\t\tpath P\n\t\tio, os = 1, 2\n\t)\n\t_ = path.Y + io.Z + os.W\n}\n";
        assert!(selectors(src).is_empty());
    }

    #[test]
    fn test_function_literal_params() {
        let src = "var h = func(url string) int { return url.Len }\n\nfunc G() { url.Parse() }\n";
        assert_eq!(selectors(src), vec!["url"]);
    }

    #[test]
    fn test_func_type_params_bind_nothing() {
        let src = "type H func(url string) error\n\nfunc G(cb func(url string)) { url.Parse() }\n";
        assert_eq!(selectors(src), vec!["url"]);
    }

    #[test]
    fn test_type_params_and_generic_param_types() {
        let src = "func F[T any, sort Less](xs List[T]) { sort.Sort(xs) }\n";
        assert!(selectors(src).is_empty());

        let src = "func F(List[T]) { sort.Sort(nil) }\n";
        assert_eq!(selectors(src), vec!["sort"]);
    }
}
