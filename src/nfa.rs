//! Conversion of the AST to a non-deterministic finite automaton.
//!
//! The graph is an arena: a vector of node records indexed by `NodeId`.
//! Builder combinators return a `Fragment` holding the subgraph's entry
//! and its loose output ends; wiring an end is deferred until the
//! enclosing combinator knows the downstream input.

use crate::ast::{Ast, ClassElem};
use crate::types::{CaptureSpec, GroupName, GroupOrdinal, Options};
use crate::unicode::PropertyClass;
use crate::uniset::Uniset;
use core::fmt;
use smallvec::{smallvec, SmallVec};

pub type NodeId = u32;

/// Predicate over one code point.
#[derive(Debug, Clone)]
pub(crate) enum Accept {
    Char(u32),
    /// Inclusive range.
    Range(u32, u32),
    Any { dot_all: bool },
    Property(PropertyClass),
}

impl Accept {
    pub(crate) fn accepts(&self, cp: u32) -> bool {
        match self {
            Accept::Char(c) => cp == *c,
            Accept::Range(lo, hi) => *lo <= cp && cp <= *hi,
            Accept::Any { dot_all } => *dot_all || cp != '\n' as u32,
            Accept::Property(class) => class.contains(cp),
        }
    }
}

/// What a matcher contributes in generate mode.
#[derive(Debug, Clone)]
pub(crate) enum GenSource {
    /// Sample a code point from the set and append it.
    Pick(Uniset),
    /// Union the set into the traversal's accumulator (negated classes).
    Gather(Uniset),
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    /// Entry point; owns the graph and forwards to its downstream.
    Start,

    /// Consumes (or, with `peek`, inspects) one code point.
    /// The predicate is `accept.accepts(cp) != invert`.
    Match {
        accept: Accept,
        invert: bool,
        peek: bool,
        gen: GenSource,
    },

    /// Broadcasts each incoming traversal to every outgoing edge.
    Split,

    /// Pushes `(name, pos)` onto the open-group stack.
    BeginGroup(GroupName),

    /// Pops the top frame and records its keys' captures.
    EndGroup,

    /// Brackets the peek matchers of a negated class.
    BeginPeek,

    /// Consumes the code point all enclosed matchers peeked at.
    EndPeek,

    /// Terminal; publishes results to the executor.
    Success,
}

/// One node record. `Split` broadcasts to every edge in `out`; every
/// other kind forwards to its single edge.
#[derive(Debug)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub out: SmallVec<[NodeId; 2]>,
}

/// A subgraph under construction: its entry and the nodes whose outgoing
/// wiring is still open.
struct Fragment {
    entry: NodeId,
    ends: SmallVec<[NodeId; 2]>,
}

/// The compiled automaton. Dropping it tears down the whole graph.
pub struct Nfa {
    nodes: Vec<Node>,
    group_count: GroupOrdinal,
    labels: Vec<(GroupOrdinal, String)>,
    capture: CaptureSpec,
    dot_all: bool,
}

pub(crate) const START: NodeId = 0;

struct Builder {
    nodes: Vec<Node>,
    dot_all: bool,
}

impl Builder {
    /// Add a node with no outgoing wiring yet, returning its id.
    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            out: SmallVec::new(),
        });
        (self.nodes.len() - 1) as NodeId
    }

    /// Fill deferred wiring: point every loose end at `target`.
    fn attach(&mut self, ends: &[NodeId], target: NodeId) {
        for &end in ends {
            self.nodes[end as usize].out.push(target);
        }
    }

    fn build(&mut self, ast: &Ast) -> Fragment {
        match ast {
            Ast::Literal(cp) => self.matcher(
                Accept::Char(*cp),
                false,
                GenSource::Pick(Uniset::single(*cp)),
            ),

            Ast::AnyChar => {
                let gen = if self.dot_all {
                    Uniset::all()
                } else {
                    Uniset::single('\n' as u32).complement()
                };
                self.matcher(
                    Accept::Any {
                        dot_all: self.dot_all,
                    },
                    false,
                    GenSource::Pick(gen),
                )
            }

            Ast::Property(p) => {
                let set = if p.negated {
                    p.class.to_uniset().complement()
                } else {
                    p.class.to_uniset()
                };
                self.matcher(
                    Accept::Property(p.class.clone()),
                    p.negated,
                    GenSource::Pick(set),
                )
            }

            Ast::Sequence(children) => self.build_seq(children),

            Ast::Group(GroupName::NoCapture, children) => self.build_seq(children),

            Ast::Group(name, children) => {
                let begin = self.push(NodeKind::BeginGroup(name.clone()));
                let body = self.build_seq(children);
                self.attach(&[begin], body.entry);
                let end = self.push(NodeKind::EndGroup);
                self.attach(&body.ends, end);
                Fragment {
                    entry: begin,
                    ends: smallvec![end],
                }
            }

            Ast::Alternate(children) => {
                let split = self.push(NodeKind::Split);
                let mut ends = SmallVec::new();
                for child in children {
                    let frag = self.build(child);
                    self.nodes[split as usize].out.push(frag.entry);
                    ends.extend(frag.ends);
                }
                Fragment { entry: split, ends }
            }

            Ast::ZeroOne(child) => {
                // The split itself stays a loose end: the bypass edge.
                let split = self.push(NodeKind::Split);
                let body = self.build(child);
                self.nodes[split as usize].out.push(body.entry);
                let mut ends = body.ends;
                ends.push(split);
                Fragment { entry: split, ends }
            }

            Ast::OneMore(child) => {
                // Enter the body first; its outputs loop back through the
                // split, whose remaining edge is the exit.
                let body = self.build(child);
                let split = self.push(NodeKind::Split);
                self.attach(&body.ends, split);
                self.nodes[split as usize].out.push(body.entry);
                Fragment {
                    entry: body.entry,
                    ends: smallvec![split],
                }
            }

            Ast::ZeroMore(child) => {
                let split = self.push(NodeKind::Split);
                let body = self.build(child);
                self.nodes[split as usize].out.push(body.entry);
                self.attach(&body.ends, split);
                Fragment {
                    entry: split,
                    ends: smallvec![split],
                }
            }

            Ast::Repeat(count, child) => {
                // k independent copies in sequence. Automata cannot count.
                let mut entry = None;
                let mut ends: SmallVec<[NodeId; 2]> = SmallVec::new();
                for _ in 0..*count {
                    let copy = self.build(child);
                    match entry {
                        None => entry = Some(copy.entry),
                        Some(_) => self.attach(&ends, copy.entry),
                    }
                    ends = copy.ends;
                }
                debug_assert!(entry.is_some(), "repeat count is at least 2");
                Fragment {
                    entry: entry.unwrap_or(START),
                    ends,
                }
            }

            Ast::Class { negated: false, elems } => {
                if let [elem] = elems.as_slice() {
                    return self.class_matcher(elem, false);
                }
                let split = self.push(NodeKind::Split);
                let mut ends = SmallVec::new();
                for elem in elems {
                    let frag = self.class_matcher(elem, false);
                    self.nodes[split as usize].out.push(frag.entry);
                    ends.extend(frag.ends);
                }
                Fragment { entry: split, ends }
            }

            Ast::Class { negated: true, elems } => {
                // Peek-AND over inverted matchers: the class matches iff
                // every element's own predicate fails on the same code
                // point, which EndPeek then consumes.
                let begin = self.push(NodeKind::BeginPeek);
                let mut prev: SmallVec<[NodeId; 2]> = smallvec![begin];
                for elem in elems {
                    let frag = self.class_matcher(elem, true);
                    self.attach(&prev, frag.entry);
                    prev = frag.ends;
                }
                let end = self.push(NodeKind::EndPeek);
                self.attach(&prev, end);
                Fragment {
                    entry: begin,
                    ends: smallvec![end],
                }
            }
        }
    }

    fn build_seq(&mut self, children: &[Ast]) -> Fragment {
        let mut entry = None;
        let mut ends: SmallVec<[NodeId; 2]> = SmallVec::new();
        for child in children {
            let frag = self.build(child);
            match entry {
                None => entry = Some(frag.entry),
                Some(_) => self.attach(&ends, frag.entry),
            }
            ends = frag.ends;
        }
        debug_assert!(entry.is_some(), "sequences are never empty");
        Fragment {
            entry: entry.unwrap_or(START),
            ends,
        }
    }

    fn matcher(&mut self, accept: Accept, invert: bool, gen: GenSource) -> Fragment {
        let id = self.push(NodeKind::Match {
            accept,
            invert,
            peek: false,
            gen,
        });
        Fragment {
            entry: id,
            ends: smallvec![id],
        }
    }

    /// An atomic matcher for one class element. Under negation the
    /// matcher peeks, its acceptor is inverted, and it gathers its set
    /// into the generate-mode accumulator instead of sampling.
    fn class_matcher(&mut self, elem: &ClassElem, negated: bool) -> Fragment {
        let (accept, elem_invert, set) = match elem {
            ClassElem::Literal(cp) => (Accept::Char(*cp), false, Uniset::single(*cp)),
            ClassElem::Range(lo, hi) => (Accept::Range(*lo, *hi), false, Uniset::range(*lo, *hi)),
            ClassElem::Property(p) => {
                let set = if p.negated {
                    p.class.to_uniset().complement()
                } else {
                    p.class.to_uniset()
                };
                (Accept::Property(p.class.clone()), p.negated, set)
            }
            ClassElem::Any => (Accept::Any { dot_all: true }, false, Uniset::all()),
        };
        let (invert, peek, gen) = if negated {
            (!elem_invert, true, GenSource::Gather(set))
        } else {
            (elem_invert, false, GenSource::Pick(set))
        };
        let id = self.push(NodeKind::Match {
            accept,
            invert,
            peek,
            gen,
        });
        Fragment {
            entry: id,
            ends: smallvec![id],
        }
    }
}

/// Build the automaton for a parsed pattern.
pub(crate) fn build(ast: &Ast, opts: &Options) -> Nfa {
    let mut b = Builder {
        nodes: Vec::new(),
        dot_all: opts.dot_all,
    };
    let start = b.push(NodeKind::Start);
    debug_assert!(start == START);
    let body = b.build(ast);
    b.nodes[START as usize].out.push(body.entry);
    let success = b.push(NodeKind::Success);
    b.attach(&body.ends, success);

    let mut group_count = 0;
    let mut labels = Vec::new();
    ast.each_group(&mut |name| match name {
        GroupName::Index(n) => group_count = group_count.max(*n),
        GroupName::Named(n, label) => {
            group_count = group_count.max(*n);
            labels.push((*n, label.clone()));
        }
        GroupName::NoCapture | GroupName::Search => {}
    });

    Nfa {
        nodes: b.nodes,
        group_count,
        labels,
        capture: opts.capture.clone(),
        dot_all: opts.dot_all,
    }
}

impl Nfa {
    pub(crate) fn nodes(&self) -> &[Node] {
        self.nodes.as_slice()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The highest group ordinal in the pattern.
    pub fn group_count(&self) -> GroupOrdinal {
        self.group_count
    }

    /// Labelled groups, as `(ordinal, label)` pairs in lex order.
    pub fn labels(&self) -> &[(GroupOrdinal, String)] {
        self.labels.as_slice()
    }

    pub(crate) fn capture_spec(&self) -> &CaptureSpec {
        &self.capture
    }
}

/// The `.*` prefix and search sentinel spliced in front of a compiled
/// automaton for batch search. The base graph is untouched; dropping the
/// overlay tears the splice down.
pub(crate) struct SearchOverlay {
    nodes: Vec<Node>,
    entry: NodeId,
}

impl SearchOverlay {
    pub(crate) fn entry(&self) -> NodeId {
        self.entry
    }
}

pub(crate) fn search_overlay(base: &Nfa) -> SearchOverlay {
    let offset = base.nodes.len() as NodeId;
    let start = offset;
    let split = offset + 1;
    let any = offset + 2;
    let sentinel = offset + 3;

    let gen = if base.dot_all {
        Uniset::all()
    } else {
        Uniset::single('\n' as u32).complement()
    };
    let nodes = vec![
        Node {
            kind: NodeKind::Start,
            out: smallvec![split],
        },
        Node {
            kind: NodeKind::Split,
            out: smallvec![sentinel, any],
        },
        Node {
            kind: NodeKind::Match {
                accept: Accept::Any {
                    dot_all: base.dot_all,
                },
                invert: false,
                peek: false,
                gen: GenSource::Pick(gen),
            },
            out: smallvec![split],
        },
        Node {
            kind: NodeKind::BeginGroup(GroupName::Search),
            out: smallvec![START],
        },
    ];
    SearchOverlay {
        nodes,
        entry: start,
    }
}

/// A base arena plus an optional overlay, addressed by one id space.
#[derive(Copy, Clone)]
pub(crate) struct GraphView<'g> {
    base: &'g [Node],
    overlay: &'g [Node],
}

impl<'g> GraphView<'g> {
    pub(crate) fn new(nfa: &'g Nfa) -> GraphView<'g> {
        GraphView {
            base: nfa.nodes(),
            overlay: &[],
        }
    }

    pub(crate) fn with_overlay(nfa: &'g Nfa, overlay: &'g SearchOverlay) -> GraphView<'g> {
        GraphView {
            base: nfa.nodes(),
            overlay: overlay.nodes.as_slice(),
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &'g Node {
        let i = id as usize;
        if i < self.base.len() {
            &self.base[i]
        } else {
            &self.overlay[i - self.base.len()]
        }
    }
}

impl fmt::Display for Nfa {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "NFA({} nodes)", self.nodes.len())?;
        for (idx, node) in self.nodes.iter().enumerate() {
            let kind = match &node.kind {
                NodeKind::Start => "Start".to_string(),
                NodeKind::Match { accept, invert, peek, .. } => {
                    let inv = if *invert { "!" } else { "" };
                    let pk = if *peek { " peek" } else { "" };
                    match accept {
                        Accept::Char(cp) => match char::from_u32(*cp) {
                            Some(c) => format!("Match({}{:?}{})", inv, c, pk),
                            None => format!("Match({}U+{:04X}{})", inv, cp, pk),
                        },
                        Accept::Range(lo, hi) => {
                            format!("Match({}U+{:04X}-U+{:04X}{})", inv, lo, hi, pk)
                        }
                        Accept::Any { .. } => format!("Match({}any{})", inv, pk),
                        Accept::Property(_) => format!("Match({}prop{})", inv, pk),
                    }
                }
                NodeKind::Split => "Split".to_string(),
                NodeKind::BeginGroup(name) => format!("BeginGroup({:?})", name),
                NodeKind::EndGroup => "EndGroup".to_string(),
                NodeKind::BeginPeek => "BeginPeek".to_string(),
                NodeKind::EndPeek => "EndPeek".to_string(),
                NodeKind::Success => "Success".to_string(),
            };
            write!(f, "[{:3}] {}", idx, kind)?;
            for &target in &node.out {
                write!(f, " →{}", target)?;
            }
            if idx + 1 < self.nodes.len() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn nfa_for(pattern: &str) -> Nfa {
        let ast = parse(lex(pattern).expect("lex")).expect("parse");
        build(&ast, &Options::default())
    }

    #[test]
    fn literal_chain() {
        let nfa = nfa_for("ab");
        // Start, two matchers, Success.
        assert_eq!(nfa.node_count(), 4);
        assert!(matches!(nfa.nodes()[START as usize].kind, NodeKind::Start));
        assert!(matches!(
            nfa.nodes().last().map(|n| &n.kind),
            Some(NodeKind::Success)
        ));
    }

    #[test]
    fn zero_more_has_bypass() {
        let nfa = nfa_for("a*");
        let split = nfa
            .nodes()
            .iter()
            .find(|n| matches!(n.kind, NodeKind::Split))
            .expect("a* builds a split");
        // Body edge plus exit edge.
        assert_eq!(split.out.len(), 2);
    }

    #[test]
    fn alternation_fans_out() {
        let nfa = nfa_for("a|b|c");
        let split = nfa
            .nodes()
            .iter()
            .find(|n| matches!(n.kind, NodeKind::Split))
            .expect("alternation builds a split");
        assert_eq!(split.out.len(), 3);
    }

    #[test]
    fn repeat_lays_copies() {
        let three = nfa_for("a{3}");
        let matchers = three
            .nodes()
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Match { .. }))
            .count();
        assert_eq!(matchers, 3);
    }

    #[test]
    fn negated_class_brackets_with_peeks() {
        let nfa = nfa_for("[^ab]");
        assert!(nfa
            .nodes()
            .iter()
            .any(|n| matches!(n.kind, NodeKind::BeginPeek)));
        assert!(nfa
            .nodes()
            .iter()
            .any(|n| matches!(n.kind, NodeKind::EndPeek)));
        let peeks = nfa
            .nodes()
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Match { peek: true, invert: true, .. }))
            .count();
        assert_eq!(peeks, 2);
    }

    #[test]
    fn groups_record_their_ordinals() {
        let nfa = nfa_for("(a)(?<two>b)(?:c)");
        assert_eq!(nfa.group_count(), 2);
        assert_eq!(nfa.labels(), &[(2, "two".to_string())]);
    }

    #[test]
    fn display_dumps_one_line_per_node() {
        let nfa = nfa_for("a|b");
        let dump = nfa.to_string();
        assert!(dump.starts_with("NFA("));
        assert_eq!(dump.lines().count(), nfa.node_count() + 1);
        assert!(dump.contains("Split"));
    }

    #[test]
    fn overlay_extends_the_id_space() {
        let nfa = nfa_for("ab");
        let overlay = search_overlay(&nfa);
        assert_eq!(overlay.entry(), nfa.node_count() as NodeId);
        let view = GraphView::with_overlay(&nfa, &overlay);
        assert!(matches!(view.node(overlay.entry()).kind, NodeKind::Start));
        assert!(matches!(view.node(START).kind, NodeKind::Start));
    }
}
