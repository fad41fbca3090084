//! Two-pass shunting-yard parser from tokens to the AST.
//!
//! Pass 1 rewrites infix alternation into an n-ary postfix form; pass 2
//! folds the postfix stream into a tree on a stack.

use crate::ast::{make_seq, Ast, ClassElem};
use crate::lexer::Token;
use crate::types::{syntax, Error, GroupName};

/// Parse a lexed token stream into an AST.
pub fn parse(tokens: Vec<Token>) -> Result<Ast, Error> {
    let postfix = normalize(tokens)?;
    build_tree(postfix)
}

/// Whether an `|` occurs at the top level of the group opening at
/// `start`, i.e. before its matching `EndGroup`.
fn lookahead_has_alternate(tokens: &[Token], start: usize) -> bool {
    let mut depth = 0usize;
    for token in &tokens[start..] {
        match token {
            Token::BeginGroup(_) => depth += 1,
            Token::EndGroup => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Token::Alternate if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Pass 1: wrap the input in an implicit outer sequence and rewrite
/// every infix `|` into sequence brackets plus one postfix `Alt(n)` per
/// alternation. Bars are recorded on a stack of group depths; a closing
/// group pops every bar recorded at its own depth.
fn normalize(tokens: Vec<Token>) -> Result<Vec<Token>, Error> {
    let mut out = Vec::with_capacity(tokens.len() + 8);
    let mut bar_depths: Vec<usize> = Vec::new();
    let mut depth = 0usize;

    out.push(Token::BeginSeq);
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Alternate => {
                out.push(Token::EndSeq);
                out.push(Token::BeginSeq);
                bar_depths.push(depth);
            }
            Token::BeginGroup(name) => {
                depth += 1;
                out.push(Token::BeginGroup(name.clone()));
                // Only alternated groups need their own sequence brackets.
                if lookahead_has_alternate(&tokens, i + 1) {
                    out.push(Token::BeginSeq);
                }
            }
            Token::EndGroup => {
                if depth == 0 {
                    return syntax("unbalanced group");
                }
                let mut bars = 0usize;
                while bar_depths.last() == Some(&depth) {
                    bar_depths.pop();
                    bars += 1;
                }
                if bars > 0 {
                    out.push(Token::EndSeq);
                    out.push(Token::Alt(bars + 1));
                }
                depth -= 1;
                out.push(Token::EndGroup);
            }
            token => out.push(token.clone()),
        }
    }
    if depth != 0 {
        return syntax("unbalanced group");
    }
    out.push(Token::EndSeq);
    let bars = bar_depths.len();
    debug_assert!(bar_depths.iter().all(|&d| d == 0));
    if bars > 0 {
        out.push(Token::Alt(bars + 1));
    }
    Ok(out)
}

/// Entries on the pass-2 stack: finished nodes interleaved with the
/// markers that `EndSeq` / `EndGroup` pop back to.
enum Frame {
    Node(Ast),
    Seq,
    Group(GroupName),
}

fn pop_operand(stack: &mut Vec<Frame>) -> Result<Ast, Error> {
    match stack.pop() {
        Some(Frame::Node(node)) => Ok(node),
        _ => syntax("nothing to repeat"),
    }
}

/// Pop finished nodes down to the nearest marker of the given kind.
fn pop_nodes(stack: &mut Vec<Frame>, want_group: bool) -> Result<(Vec<Ast>, Option<GroupName>), Error> {
    let mut nodes = Vec::new();
    loop {
        match stack.pop() {
            Some(Frame::Node(node)) => nodes.push(node),
            Some(Frame::Seq) if !want_group => {
                nodes.reverse();
                return Ok((nodes, None));
            }
            Some(Frame::Group(name)) if want_group => {
                nodes.reverse();
                return Ok((nodes, Some(name)));
            }
            _ => return syntax("unbalanced group"),
        }
    }
}

/// Pass 2: left-to-right fold of the postfix stream.
fn build_tree(tokens: Vec<Token>) -> Result<Ast, Error> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut i = 0usize;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Literal(cp) => stack.push(Frame::Node(Ast::Literal(*cp))),
            Token::AnyChar => stack.push(Frame::Node(Ast::AnyChar)),
            Token::Property(p) => stack.push(Frame::Node(Ast::Property(p.clone()))),
            // A dash outside a class is the literal dash.
            Token::RangeTo => stack.push(Frame::Node(Ast::Literal('-' as u32))),
            Token::ZeroOne => {
                let operand = pop_operand(&mut stack)?;
                stack.push(Frame::Node(Ast::ZeroOne(Box::new(operand))));
            }
            Token::OneMore => {
                let operand = pop_operand(&mut stack)?;
                stack.push(Frame::Node(Ast::OneMore(Box::new(operand))));
            }
            Token::ZeroMore => {
                let operand = pop_operand(&mut stack)?;
                stack.push(Frame::Node(Ast::ZeroMore(Box::new(operand))));
            }
            Token::Repeat(count) => {
                let operand = pop_operand(&mut stack)?;
                stack.push(Frame::Node(Ast::Repeat(*count, Box::new(operand))));
            }
            Token::BeginSeq => stack.push(Frame::Seq),
            Token::EndSeq => {
                let (nodes, _) = pop_nodes(&mut stack, false)?;
                if nodes.is_empty() {
                    return syntax("empty alternative");
                }
                stack.push(Frame::Node(make_seq(nodes)));
            }
            Token::BeginGroup(name) => stack.push(Frame::Group(name.clone())),
            Token::EndGroup => {
                let (nodes, name) = pop_nodes(&mut stack, true)?;
                let Some(name) = name else {
                    return syntax("unbalanced group");
                };
                if nodes.is_empty() {
                    return syntax("empty group");
                }
                stack.push(Frame::Node(Ast::Group(name, nodes)));
            }
            Token::Alt(arity) => {
                let mut nodes = Vec::with_capacity(*arity);
                for _ in 0..*arity {
                    match stack.pop() {
                        Some(Frame::Node(node)) => nodes.push(node),
                        _ => return syntax("malformed alternation"),
                    }
                }
                nodes.reverse();
                stack.push(Frame::Node(Ast::Alternate(nodes)));
            }
            Token::BeginClass => {
                let class = parse_class(&tokens, &mut i)?;
                stack.push(Frame::Node(class));
            }
            Token::Alternate => return syntax("malformed alternation"),
            Token::NegClass | Token::EndClass => {
                return syntax("unexpected token outside a character class")
            }
        }
        i += 1;
    }

    match (stack.pop(), stack.pop()) {
        (Some(Frame::Node(node)), None) => Ok(node),
        _ => syntax("unbalanced group"),
    }
}

/// One element of a class body at position `i`, or `None` at `]`.
fn class_atom(tokens: &[Token], i: &mut usize) -> Result<Option<ClassElem>, Error> {
    let elem = match tokens.get(*i) {
        None => return syntax("unmatched ["),
        Some(Token::EndClass) => return Ok(None),
        Some(Token::Literal(cp)) => ClassElem::Literal(*cp),
        Some(Token::RangeTo) => ClassElem::Literal('-' as u32),
        Some(Token::Property(p)) => ClassElem::Property(p.clone()),
        Some(Token::AnyChar) => ClassElem::Any,
        Some(Token::BeginClass) => return syntax("nested character class"),
        Some(_) => return syntax("unexpected token in character class"),
    };
    *i += 1;
    Ok(Some(elem))
}

/// The restricted sub-parser for `[...]` / `[^...]`. On entry `*i`
/// points at `BeginClass`; on exit it points at the matching `EndClass`.
fn parse_class(tokens: &[Token], i: &mut usize) -> Result<Ast, Error> {
    debug_assert!(matches!(tokens.get(*i), Some(Token::BeginClass)));
    *i += 1;
    let negated = match tokens.get(*i) {
        Some(Token::NegClass) => {
            *i += 1;
            true
        }
        _ => false,
    };

    let mut elems = Vec::new();
    loop {
        let Some(first) = class_atom(tokens, i)? else {
            break;
        };

        // A dash between two atoms makes a range; a trailing dash is
        // the literal dash.
        let dash = matches!(tokens.get(*i), Some(Token::RangeTo))
            && !matches!(tokens.get(*i + 1), Some(Token::EndClass));
        if !dash {
            elems.push(first);
            continue;
        }
        *i += 1;
        let Some(second) = class_atom(tokens, i)? else {
            return syntax("invalid character range");
        };
        match (first, second) {
            (ClassElem::Literal(lo), ClassElem::Literal(hi)) => {
                if lo > hi {
                    return syntax("inverted character range");
                }
                elems.push(ClassElem::Range(lo, hi));
            }
            _ => return syntax("invalid character range"),
        }
    }

    if elems.is_empty() {
        return syntax("empty character class");
    }
    Ok(Ast::Class { negated, elems })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use pretty_assertions::assert_eq;

    fn parse_ok(pattern: &str) -> Ast {
        parse(lex(pattern).expect("should lex")).expect("should parse")
    }

    #[track_caller]
    fn parse_err(pattern: &str, fragment: &str) {
        let tokens = lex(pattern).expect("should lex");
        match parse(tokens) {
            Err(Error::Syntax(text)) => assert!(
                text.contains(fragment),
                "error {:?} does not mention {:?}",
                text,
                fragment
            ),
            other => panic!("expected parse error for {:?}, got {:?}", pattern, other),
        }
    }

    #[test]
    fn literals_fold_into_sequences() {
        assert_eq!(
            parse_ok("ab"),
            Ast::Sequence(vec![Ast::Literal('a' as u32), Ast::Literal('b' as u32)])
        );
        assert_eq!(parse_ok("a"), Ast::Literal('a' as u32));
    }

    #[test]
    fn alternation_is_n_ary() {
        match parse_ok("a|b|c") {
            Ast::Alternate(children) => {
                assert_eq!(children.len(), 3);
                assert_eq!(children[0], Ast::Literal('a' as u32));
                assert_eq!(children[2], Ast::Literal('c' as u32));
            }
            other => panic!("expected alternation, got {:?}", other),
        }
    }

    #[test]
    fn groups_wrap_their_bodies() {
        match parse_ok("(a|b)c") {
            Ast::Sequence(children) => {
                assert!(matches!(
                    &children[0],
                    Ast::Group(GroupName::Index(1), body)
                        if matches!(body.as_slice(), [Ast::Alternate(alts)] if alts.len() == 2)
                ));
                assert_eq!(children[1], Ast::Literal('c' as u32));
            }
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn quantifiers_bind_the_previous_atom() {
        assert_eq!(
            parse_ok("ab*"),
            Ast::Sequence(vec![
                Ast::Literal('a' as u32),
                Ast::ZeroMore(Box::new(Ast::Literal('b' as u32)))
            ])
        );
        assert!(matches!(parse_ok("(ab)+"), Ast::OneMore(_)));
        assert!(matches!(parse_ok("a{3}"), Ast::Repeat(3, _)));
    }

    #[test]
    fn classes_parse_restricted_atoms() {
        match parse_ok("[a-dZ]") {
            Ast::Class { negated, elems } => {
                assert!(!negated);
                assert_eq!(
                    elems,
                    vec![
                        ClassElem::Range('a' as u32, 'd' as u32),
                        ClassElem::Literal('Z' as u32)
                    ]
                );
            }
            other => panic!("expected class, got {:?}", other),
        }
        match parse_ok("[^0-9p]") {
            Ast::Class { negated, elems } => {
                assert!(negated);
                assert_eq!(elems.len(), 2);
            }
            other => panic!("expected class, got {:?}", other),
        }
        // Leading and trailing dashes are literal.
        match parse_ok("[-a-]") {
            Ast::Class { elems, .. } => assert_eq!(
                elems,
                vec![
                    ClassElem::Literal('-' as u32),
                    ClassElem::Literal('a' as u32),
                    ClassElem::Literal('-' as u32)
                ]
            ),
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn dot_stays_dot_inside_classes() {
        match parse_ok("[.a]") {
            Ast::Class { elems, .. } => {
                assert_eq!(elems[0], ClassElem::Any);
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn parse_errors() {
        parse_err("(a", "unbalanced group");
        parse_err("a|", "empty alternative");
        parse_err("|a", "empty alternative");
        parse_err("(a|)", "empty alternative");
        parse_err("()", "empty group");
        parse_err("", "empty alternative");
        parse_err("*a", "nothing to repeat");
        parse_err("(*)", "nothing to repeat");
        parse_err("[]", "empty character class");
        parse_err("[z-a]", "inverted character range");
        parse_err(r"[\d-z]", "invalid character range");
    }

    #[test]
    fn unparse_round_trips() {
        for pattern in [
            "ab",
            "a|b|c",
            "(a|b)c",
            "(?:ab)d",
            "(?<yr>ab)",
            "a*b+c?d{3}",
            "[a-dZ]",
            "[^0-9p]",
            r"\p{Lu}+",
            "a(b(c|d))e",
        ] {
            assert_eq!(parse_ok(pattern).to_string(), pattern);
        }
    }
}
