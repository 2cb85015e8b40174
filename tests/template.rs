//! A small text templating language: `{{ var }}` substitution and
//! `{% if %}…{% else %}…{% endif %}` conditionals.
use std::collections::HashMap;
use std::io::Cursor;

use lexstrom::{
    lex_fn, lex_parse, parse_fn, CancelToken, Error, LexState, NodeId, Parser, Position,
    StateLexer, Step, Token, TokenKind, Tree,
};

const TEXT: TokenKind = TokenKind(1);
const BLOCK_START: TokenKind = TokenKind(2);
const BLOCK_END: TokenKind = TokenKind(3);
const VAR_START: TokenKind = TokenKind(4);
const VAR_END: TokenKind = TokenKind(5);
const IDENT: TokenKind = TokenKind(6);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum TmplNode {
    /// A sequence of text, variable and branch nodes.
    #[default]
    Code,
    Text(String),
    Var(String),
    /// Children: condition variable, if-code, optional else-code.
    Branch,
}

// ---------------------------------------------------------------------------
// Lexer

/// Lexes literal text up to the next `{{` or `{%` marker.
fn lex_text(_cx: &CancelToken, lx: &mut StateLexer<'_>) -> Result<Option<Box<dyn LexState>>, Error> {
    match lx.find(&["{{", "{%"]) {
        Some(marker) => {
            if lx.width() > 0 {
                lx.emit(TEXT);
            }
            let open = lx.pos();
            lx.advance_n(2);
            lx.emit(if marker == "{{" { VAR_START } else { BLOCK_START });
            Ok(Some(Box::new(LexCode { open })))
        }
        None => {
            if lx.width() > 0 {
                lx.emit(TEXT);
            }
            Ok(None)
        }
    }
}

/// Lexes the inside of an action, remembering where it was opened so an
/// unterminated action can be reported at its start.
struct LexCode {
    open: Position,
}

impl LexState for LexCode {
    fn run(
        self: Box<Self>,
        _cx: &CancelToken,
        lx: &mut StateLexer<'_>,
    ) -> Result<Option<Box<dyn LexState>>, Error> {
        loop {
            while matches!(lx.peek(), Some(rune) if rune.is_whitespace()) {
                lx.discard();
            }
            let ahead: String = lx.peek_n(2).iter().collect();
            match ahead.as_str() {
                "" => return Err(Error::syntax("unclosed action", self.open.clone())),
                "}}" => {
                    lx.advance_n(2);
                    lx.emit(VAR_END);
                    return Ok(Some(lex_fn(lex_text)));
                }
                "%}" => {
                    lx.advance_n(2);
                    lx.emit(BLOCK_END);
                    return Ok(Some(lex_fn(lex_text)));
                }
                _ => loop {
                    match lx.peek() {
                        None => return Err(Error::syntax("unclosed action", self.open.clone())),
                        Some(rune) if rune.is_whitespace() => break,
                        Some('}') | Some('%') => {
                            let two: String = lx.peek_n(2).iter().collect();
                            if two == "}}" || two == "%}" {
                                break;
                            }
                            lx.advance();
                        }
                        Some(_) => {
                            lx.advance();
                        }
                    }
                },
            }
            if lx.width() > 0 {
                lx.emit(IDENT);
            }
        }
    }
}

fn template_lexer(input: &str) -> StateLexer<'static> {
    StateLexer::new(Cursor::new(input.as_bytes().to_vec()), lex_fn(lex_text))
}

// ---------------------------------------------------------------------------
// Parser

fn valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic()) && chars.all(|c| c.is_alphanumeric())
}

fn expect_kind(token: &Token, kind: TokenKind) -> Result<(), Error> {
    if token.kind != kind {
        return Err(Error::unexpected_token(token));
    }
    Ok(())
}

/// Turns the root into a code node and starts parsing code.
fn parse_root(_cx: &CancelToken, p: &mut Parser<'_, TmplNode>) -> Result<Step, Error> {
    p.replace(TmplNode::Code);
    p.push_state([parse_fn(parse_code)]);
    Ok(Step::Continue)
}

/// Dispatches on the next token while inside a code node.
fn parse_code(cx: &CancelToken, p: &mut Parser<'_, TmplNode>) -> Result<Step, Error> {
    let kind = p.peek(cx).kind;
    match kind {
        TEXT => p.push_state([parse_fn(parse_text)]),
        VAR_START => p.push_state([parse_fn(parse_var_start)]),
        BLOCK_START => p.push_state([parse_fn(parse_block_start)]),
        TokenKind::EOF => {}
        _ => {
            let token = p.peek(cx).clone();
            return Err(Error::unexpected_token(&token));
        }
    }
    Ok(Step::Continue)
}

fn parse_text(cx: &CancelToken, p: &mut Parser<'_, TmplNode>) -> Result<Step, Error> {
    let token = p.next(cx);
    expect_kind(&token, TEXT)?;
    p.node(TmplNode::Text(token.value));
    p.push_state([parse_fn(parse_code)]);
    Ok(Step::Continue)
}

fn parse_var_start(cx: &CancelToken, p: &mut Parser<'_, TmplNode>) -> Result<Step, Error> {
    let token = p.next(cx);
    expect_kind(&token, VAR_START)?;
    let open = token.start;
    let close = open.clone();
    p.push_state([
        parse_fn(move |cx, p: &mut Parser<'_, TmplNode>| parse_var(cx, p, "variable", &open)),
        parse_fn(move |cx, p: &mut Parser<'_, TmplNode>| parse_var_end(cx, p, &close)),
    ]);
    Ok(Step::Continue)
}

/// Parses the variable name of a `{{ var }}` action or an `if` condition.
/// `what` and `open` describe the enclosing action for error reporting.
fn parse_var(
    cx: &CancelToken,
    p: &mut Parser<'_, TmplNode>,
    what: &str,
    open: &Position,
) -> Result<Step, Error> {
    let token = p.next(cx);
    if token.is_eof() {
        return Err(Error::syntax(format!("unclosed {what}"), open.clone()));
    }
    expect_kind(&token, IDENT)?;
    if !valid_var_name(&token.value) {
        return Err(Error::syntax(
            format!("invalid variable name {:?}", token.value),
            token.start,
        ));
    }
    p.node(TmplNode::Var(token.value));
    Ok(Step::Continue)
}

fn parse_var_end(
    cx: &CancelToken,
    p: &mut Parser<'_, TmplNode>,
    open: &Position,
) -> Result<Step, Error> {
    let token = p.next(cx);
    if token.is_eof() {
        return Err(Error::syntax("unclosed variable", open.clone()));
    }
    expect_kind(&token, VAR_END)?;
    p.push_state([parse_fn(parse_code)]);
    Ok(Step::Continue)
}

fn parse_block_start(cx: &CancelToken, p: &mut Parser<'_, TmplNode>) -> Result<Step, Error> {
    let token = p.next(cx);
    expect_kind(&token, BLOCK_START)?;
    let command = p.peek(cx).clone();
    if command.is_eof() {
        return Err(Error::syntax("unclosed block", token.start));
    }
    expect_kind(&command, IDENT)?;
    match command.value.as_str() {
        "if" => {
            let open = token.start;
            p.push_state([parse_fn(move |cx, p: &mut Parser<'_, TmplNode>| {
                parse_branch(cx, p, &open)
            })]);
        }
        // parse_else / parse_endif are already on the stack.
        "else" | "endif" => {}
        _ => return Err(Error::unexpected_token(&command)),
    }
    Ok(Step::Continue)
}

/// Parses `if <var> %} <code>` and schedules the else/endif handling.
/// `open` is the position of the opening `{%`.
fn parse_branch(cx: &CancelToken, p: &mut Parser<'_, TmplNode>, open: &Position) -> Result<Step, Error> {
    let token = p.next(cx);
    expect_kind(&token, IDENT)?;
    if token.value != "if" {
        return Err(Error::unexpected_token(&token));
    }
    let open = open.clone();
    p.push(TmplNode::Branch);
    p.push_state([
        parse_fn(move |cx, p: &mut Parser<'_, TmplNode>| parse_var(cx, p, "block", &open)),
        parse_fn(parse_block_end),
        parse_fn(parse_if),
        parse_fn(parse_else),
    ]);
    Ok(Step::Continue)
}

fn parse_if(_cx: &CancelToken, p: &mut Parser<'_, TmplNode>) -> Result<Step, Error> {
    p.push(TmplNode::Code);
    p.push_state([parse_fn(parse_code)]);
    Ok(Step::Continue)
}

fn parse_else(cx: &CancelToken, p: &mut Parser<'_, TmplNode>) -> Result<Step, Error> {
    let token = p.peek(cx).clone();
    expect_kind(&token, IDENT)?;
    match token.value.as_str() {
        "else" => {
            let _ = p.next(cx);
            // Climb out of the if-code node back to the branch.
            p.climb();
            let branch = p.pos();
            if p.tree().value(branch) != &TmplNode::Branch || p.tree().children(branch).len() != 2 {
                return Err(Error::unexpected_token(&token));
            }
            p.push(TmplNode::Code);
            p.push_state([
                parse_fn(parse_block_end),
                parse_fn(parse_code),
                parse_fn(parse_endif),
            ]);
        }
        "endif" => p.push_state([parse_fn(parse_endif)]),
        _ => return Err(Error::unexpected_token(&token)),
    }
    Ok(Step::Continue)
}

fn parse_endif(cx: &CancelToken, p: &mut Parser<'_, TmplNode>) -> Result<Step, Error> {
    let token = p.next(cx);
    expect_kind(&token, IDENT)?;
    if token.value != "endif" {
        return Err(Error::unexpected_token(&token));
    }
    // Climb out of the code node, then out of the branch.
    p.climb();
    p.climb();
    p.push_state([parse_fn(parse_block_end), parse_fn(parse_code)]);
    Ok(Step::Continue)
}

fn parse_block_end(cx: &CancelToken, p: &mut Parser<'_, TmplNode>) -> Result<Step, Error> {
    let token = p.next(cx);
    expect_kind(&token, BLOCK_END)?;
    Ok(Step::Continue)
}

// ---------------------------------------------------------------------------
// Evaluation

fn execute(tree: &Tree<TmplNode>, data: &HashMap<&str, &str>) -> String {
    let mut out = String::new();
    exec_node(tree, tree.root(), data, &mut out);
    out
}

fn exec_node(tree: &Tree<TmplNode>, id: NodeId, data: &HashMap<&str, &str>, out: &mut String) {
    for &child in tree.children(id) {
        match tree.value(child) {
            TmplNode::Text(text) => out.push_str(text),
            TmplNode::Var(name) => out.push_str(data.get(name.as_str()).copied().unwrap_or("")),
            TmplNode::Code => exec_node(tree, child, data, out),
            TmplNode::Branch => {
                let children = tree.children(child);
                let truthy = match tree.value(children[0]) {
                    TmplNode::Var(name) => !data.get(name.as_str()).copied().unwrap_or("").is_empty(),
                    _ => false,
                };
                if truthy {
                    exec_node(tree, children[1], data, out);
                } else if children.len() > 2 {
                    exec_node(tree, children[2], data, out);
                }
            }
        }
    }
}

fn render(input: &str, data: &[(&'static str, &'static str)]) -> Result<String, Error> {
    let cx = CancelToken::new();
    let tree = lex_parse(&cx, template_lexer(input), parse_fn(parse_root)).into_result()?;
    let data: HashMap<&str, &str> = data.iter().copied().collect();
    Ok(execute(&tree, &data))
}

// ---------------------------------------------------------------------------
// Tests

#[test]
fn variable_substitution() {
    let rendered = render("Hello, {{ subject }}", &[("subject", "世界")]).unwrap();
    assert_eq!(rendered, "Hello, 世界");
}

#[test]
fn substitution_tree_shape() {
    let cx = CancelToken::new();
    let tree = lex_parse(
        &cx,
        template_lexer("Hello, {{ subject }}"),
        parse_fn(parse_root),
    )
    .into_result()
    .unwrap();

    assert_eq!(tree.value(tree.root()), &TmplNode::Code);
    let children = tree.children(tree.root());
    assert_eq!(children.len(), 2);
    assert_eq!(
        tree.value(children[0]),
        &TmplNode::Text("Hello, ".to_string())
    );
    assert_eq!(tree.start(children[0]), &Position::at(0, 1, 1));
    assert_eq!(tree.value(children[1]), &TmplNode::Var("subject".to_string()));
    assert_eq!(tree.start(children[1]), &Position::at(10, 1, 11));
}

#[test]
fn conditional_takes_the_if_branch() {
    let rendered = render(
        "Hello, {% if subject %}{{ subject }}{% else %}World{% endif %}!",
        &[("subject", "世界")],
    )
    .unwrap();
    assert_eq!(rendered, "Hello, 世界!");
}

#[test]
fn conditional_takes_the_else_branch() {
    let rendered = render(
        "Hello, {% if subject %}{{ subject }}{% else %}World{% endif %}!",
        &[("subject", "")],
    )
    .unwrap();
    assert_eq!(rendered, "Hello, World!");
}

#[test]
fn conditional_without_data_takes_the_else_branch() {
    let rendered = render(
        "Hello, {% if subject %}{{ subject }}{% else %}World{% endif %}!",
        &[],
    )
    .unwrap();
    assert_eq!(rendered, "Hello, World!");
}

#[test]
fn unterminated_variable_reports_the_opening_braces() {
    let err = render("Hello, {{ subject", &[("subject", "世界")]).unwrap_err();
    // The `{{` sits at line 1, column 8.
    assert_eq!(err.to_string(), "unclosed variable: 1:8");
}

#[test]
fn unterminated_block_reports_the_opening_brace() {
    let err = render("Hello, {% if subject", &[]).unwrap_err();
    match &err {
        Error::Syntax(syntax) => {
            assert_eq!(syntax.pos, Position::at(7, 1, 8));
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }
}
