//! The typed regex tree produced by the parser.

use crate::lexer::{format_literal, Property};
use crate::types::GroupName;
use core::fmt;

/// One element of a character class.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassElem {
    Literal(u32),
    /// `lo-hi`, inclusive, `lo ≤ hi`.
    Range(u32, u32),
    Property(Property),
    /// `.` keeps its identity inside classes: it passes every code point
    /// as a positive element and fails every one under negation.
    Any,
}

/// The node types of the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// A literal code point.
    Literal(u32),

    /// `.`
    AnyChar,

    /// `\p{...}` / `\P{...}` and the `\d \D \w \W` shortcuts.
    Property(Property),

    /// Concatenation of children, in order.
    Sequence(Vec<Ast>),

    /// A group; children form an implicit sequence.
    Group(GroupName, Vec<Ast>),

    /// `a|b|...` with at least two children.
    Alternate(Vec<Ast>),

    /// `?`
    ZeroOne(Box<Ast>),

    /// `+`
    OneMore(Box<Ast>),

    /// `*`
    ZeroMore(Box<Ast>),

    /// `{k}` with k ≥ 2.
    Repeat(usize, Box<Ast>),

    /// `[...]` / `[^...]`.
    Class { negated: bool, elems: Vec<ClassElem> },
}

/// Wrap nodes in a sequence, flattening the single-child case.
pub(crate) fn make_seq(mut nodes: Vec<Ast>) -> Ast {
    if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        Ast::Sequence(nodes)
    }
}

impl Ast {
    /// Walk the tree, calling `f` on every group name.
    pub(crate) fn each_group<F: FnMut(&GroupName)>(&self, f: &mut F) {
        match self {
            Ast::Literal(..) | Ast::AnyChar | Ast::Property(..) | Ast::Class { .. } => {}
            Ast::Sequence(children) | Ast::Alternate(children) => {
                for child in children {
                    child.each_group(f);
                }
            }
            Ast::Group(name, children) => {
                f(name);
                for child in children {
                    child.each_group(f);
                }
            }
            Ast::ZeroOne(child) | Ast::OneMore(child) | Ast::ZeroMore(child) => {
                child.each_group(f)
            }
            Ast::Repeat(_, child) => child.each_group(f),
        }
    }
}

fn fmt_class_elem(elem: &ClassElem, out: &mut String) {
    match elem {
        ClassElem::Literal(cp) => format_literal(*cp, out),
        ClassElem::Range(lo, hi) => {
            format_literal(*lo, out);
            out.push('-');
            format_literal(*hi, out);
        }
        ClassElem::Property(p) => {
            out.push('\\');
            out.push(if p.negated { 'P' } else { 'p' });
            out.push('{');
            out.push_str(&p.name);
            out.push('}');
        }
        ClassElem::Any => out.push('.'),
    }
}

fn fmt_node(node: &Ast, out: &mut String) {
    match node {
        Ast::Literal(cp) => format_literal(*cp, out),
        Ast::AnyChar => out.push('.'),
        Ast::Property(p) => {
            out.push('\\');
            out.push(if p.negated { 'P' } else { 'p' });
            out.push('{');
            out.push_str(&p.name);
            out.push('}');
        }
        Ast::Sequence(children) => {
            for child in children {
                fmt_node(child, out);
            }
        }
        Ast::Group(name, children) => {
            match name {
                GroupName::Index(_) | GroupName::Search => out.push('('),
                GroupName::Named(_, label) => {
                    out.push_str("(?<");
                    out.push_str(label);
                    out.push('>');
                }
                GroupName::NoCapture => out.push_str("(?:"),
            }
            for child in children {
                fmt_node(child, out);
            }
            out.push(')');
        }
        Ast::Alternate(children) => {
            let mut first = true;
            for child in children {
                if !first {
                    out.push('|');
                }
                first = false;
                fmt_node(child, out);
            }
        }
        Ast::ZeroOne(child) => {
            fmt_node(child, out);
            out.push('?');
        }
        Ast::OneMore(child) => {
            fmt_node(child, out);
            out.push('+');
        }
        Ast::ZeroMore(child) => {
            fmt_node(child, out);
            out.push('*');
        }
        Ast::Repeat(count, child) => {
            fmt_node(child, out);
            out.push_str(&format!("{{{}}}", count));
        }
        Ast::Class { negated, elems } => {
            out.push('[');
            if *negated {
                out.push('^');
            }
            for elem in elems {
                fmt_class_elem(elem, out);
            }
            out.push(']');
        }
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut out = String::new();
        fmt_node(self, &mut out);
        f.write_str(&out)
    }
}
