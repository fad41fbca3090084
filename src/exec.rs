//! The traversal-counting executor.
//!
//! A single-threaded cooperative scheduler: a FIFO deque of
//! `(node, traversal)` pairs owned by the executor. FIFO dispatch keeps
//! every live traversal making progress even under exponential fan-out.
//! The executor keeps the fan-out/join accounting explicit: Split adds
//! `fan-out − 1` before dispatching children, every dead or finished
//! traversal subtracts one, and the run ends when the count reaches 0.

use crate::nfa::{self, GraphView, Nfa, NodeId, NodeKind, SearchOverlay};
use crate::types::{
    CaptureKey, CaptureSpec, CaptureValue, Captures, Error, GroupName, MatchResult, Multiple,
    Options, Payload, SearchResult, Span,
};
use log::{debug, trace};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Whether Success judges whole-input matches or substring hits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Mode {
    Match,
    Search,
}

/// The state carried by one traversal between nodes.
#[derive(Debug, Clone)]
struct Traversal<'g> {
    /// Code points consumed from the original input.
    pos: usize,
    /// Open-group stack of `(name, start_pos)` frames, LIFO.
    stack: SmallVec<[(&'g GroupName, usize); 4]>,
    caps: Captures,
}

struct Executor<'g> {
    graph: GraphView<'g>,
    nfa: &'g Nfa,
    input: &'g [char],
    text: &'g str,
    entry: NodeId,
    mode: Mode,
    multiple: Multiple,
    offset: usize,
    timeout: Duration,
    deadline: Instant,
    queue: VecDeque<(NodeId, Traversal<'g>)>,
    /// Live traversal count; the run is over when it reaches zero.
    active: usize,
    matches: Vec<Captures>,
    searches: Vec<(Span, Captures)>,
    /// Rightmost position a search traversal was seeded at. Re-seeds
    /// must advance past it: the wildcard prefix already explores every
    /// later start, and a stationary re-seed would loop on zero-length
    /// hits.
    last_seed: usize,
    /// Set when `multiple: One` delivered its result: tear down and exit.
    done: bool,
}

impl<'g> Executor<'g> {
    fn new(
        graph: GraphView<'g>,
        nfa: &'g Nfa,
        input: &'g [char],
        text: &'g str,
        entry: NodeId,
        mode: Mode,
        opts: &Options,
    ) -> Executor<'g> {
        Executor {
            graph,
            nfa,
            input,
            text,
            entry,
            mode,
            multiple: opts.multiple,
            offset: opts.offset,
            timeout: opts.timeout,
            deadline: Instant::now() + opts.timeout,
            queue: VecDeque::new(),
            active: 0,
            matches: Vec::new(),
            searches: Vec::new(),
            last_seed: opts.offset,
            done: false,
        }
    }

    fn seed(&self, pos: usize) -> Traversal<'g> {
        Traversal {
            pos,
            stack: SmallVec::new(),
            caps: Captures::new(),
        }
    }

    fn run(&mut self) -> Result<(), Error> {
        self.active = 1;
        self.queue.push_back((self.entry, self.seed(self.offset)));
        while self.active > 0 && !self.done {
            if Instant::now() >= self.deadline {
                return Err(Error::Timeout(self.timeout));
            }
            let Some((id, traversal)) = self.queue.pop_front() else {
                return Err(Error::Protocol("live traversals but an empty queue"));
            };
            self.step(id, traversal)?;
        }
        trace!(
            "run finished: {} matches, {} hits",
            self.matches.len(),
            self.searches.len()
        );
        Ok(())
    }

    fn forward(&mut self, id: NodeId, traversal: Traversal<'g>) -> Result<(), Error> {
        match self.graph.node(id).out.first() {
            Some(&next) => {
                self.queue.push_back((next, traversal));
                Ok(())
            }
            None => Err(Error::Protocol("node with no downstream wiring")),
        }
    }

    /// One traversal left the graph without a result.
    fn no_match(&mut self) -> Result<(), Error> {
        match self.active.checked_sub(1) {
            Some(active) => {
                self.active = active;
                Ok(())
            }
            None => Err(Error::Protocol("traversal count went negative")),
        }
    }

    fn step(&mut self, id: NodeId, mut t: Traversal<'g>) -> Result<(), Error> {
        let node = self.graph.node(id);
        match &node.kind {
            NodeKind::Start => self.forward(id, t),

            NodeKind::Match {
                accept,
                invert,
                peek,
                ..
            } => match self.input.get(t.pos) {
                Some(&c) if accept.accepts(c as u32) != *invert => {
                    if !*peek {
                        t.pos += 1;
                    }
                    self.forward(id, t)
                }
                _ => self.no_match(),
            },

            NodeKind::Split => {
                let Some((&last, rest)) = node.out.split_last() else {
                    return Err(Error::Protocol("split with no children"));
                };
                // The increment lands before any child can report back.
                self.active += rest.len();
                for &child in rest {
                    self.queue.push_back((child, t.clone()));
                }
                self.queue.push_back((last, t));
                Ok(())
            }

            NodeKind::BeginGroup(name) => {
                t.stack.push((name, t.pos));
                for key in name.keys() {
                    t.caps.insert(key, CaptureValue::NoCapture);
                }
                self.forward(id, t)
            }

            NodeKind::EndGroup => {
                let Some((name, start)) = t.stack.pop() else {
                    return Err(Error::Protocol("group closed without an open frame"));
                };
                for key in name.keys() {
                    t.caps
                        .insert(key, CaptureValue::Index(Span::new(start, t.pos - start)));
                }
                self.forward(id, t)
            }

            NodeKind::BeginPeek => self.forward(id, t),

            NodeKind::EndPeek => {
                // Every enclosed matcher peeked at this code point.
                debug_assert!(t.pos < self.input.len());
                t.pos += 1;
                self.forward(id, t)
            }

            NodeKind::Success => self.succeed(t),
        }
    }

    fn succeed(&mut self, t: Traversal<'g>) -> Result<(), Error> {
        let consumed_all = t.pos == self.input.len();
        match self.mode {
            Mode::Match => {
                if consumed_all && t.stack.is_empty() {
                    let caps = self.finish(t.caps);
                    if !self.matches.contains(&caps) {
                        self.matches.push(caps);
                    }
                    if self.multiple == Multiple::One {
                        self.done = true;
                        Ok(())
                    } else {
                        self.no_match()
                    }
                } else {
                    // Unconsumed input in match mode is an ordinary failure.
                    self.no_match()
                }
            }
            Mode::Search => {
                let [(GroupName::Search, begin)] = t.stack.as_slice() else {
                    return Err(Error::Protocol("search traversal lost its sentinel frame"));
                };
                let span = Span::new(*begin, t.pos - begin);
                let end = t.pos;
                let caps = self.finish(t.caps);
                let hit = (span, caps);
                if !self.searches.contains(&hit) {
                    self.searches.push(hit);
                }
                if self.multiple == Multiple::One {
                    self.done = true;
                    return Ok(());
                }
                if consumed_all || end <= self.last_seed {
                    self.no_match()
                } else {
                    // A partial hit: restart a fresh traversal at the end
                    // of the match. One terminated, one injected, so the
                    // count is unchanged.
                    self.last_seed = end;
                    let seed = self.seed(end);
                    self.queue.push_back((self.entry, seed));
                    Ok(())
                }
            }
        }
    }

    /// Success guarantees a value for every declared key, echoes the
    /// whole input at key 0, and canonicalises the entry order.
    fn finish(&self, mut caps: Captures) -> Captures {
        for n in 1..=self.nfa.group_count() {
            let key = CaptureKey::Ordinal(n);
            if !caps.contains_key(&key) {
                caps.insert(key, CaptureValue::NoCapture);
            }
        }
        for (_, label) in self.nfa.labels() {
            let key = CaptureKey::Label(label.clone());
            if !caps.contains_key(&key) {
                caps.insert(key, CaptureValue::NoCapture);
            }
        }
        caps.insert(
            CaptureKey::Ordinal(0),
            CaptureValue::Text(self.text.to_string()),
        );
        caps.normalize();
        caps
    }
}

fn check_offset(opts: &Options, input_len: usize) -> Result<(), Error> {
    if opts.offset > input_len {
        return Err(Error::Option(format!(
            "offset {} is past the end of the input ({} code points)",
            opts.offset, input_len
        )));
    }
    Ok(())
}

/// The `{0: input}` capture set carried by `NoMatch`.
pub(crate) fn echo_input(input: &str) -> Captures {
    let mut caps = Captures::new();
    caps.insert(CaptureKey::Ordinal(0), CaptureValue::Text(input.to_string()));
    caps
}

/// Apply the compiled-and-runtime capture filter and the payload form.
pub(crate) fn present(
    mut caps: Captures,
    compiled: &CaptureSpec,
    opts: &Options,
    chars: &[char],
) -> Captures {
    caps.retain_allowed(|key| compiled.allows(key) && opts.capture.allows(key));
    if opts.payload == Payload::Binary {
        caps.map_values(|key, value| match value {
            CaptureValue::Index(span) if *key != CaptureKey::Ordinal(0) => {
                CaptureValue::Text(chars[span.pos..span.pos + span.len].iter().collect())
            }
            value => value,
        });
    }
    caps
}

/// Run a whole-input match, returning raw capture sets: every declared
/// key present, index payloads, no filtering.
pub(crate) fn run_match_raw(
    nfa: &Nfa,
    input: &str,
    opts: &Options,
) -> Result<Vec<Captures>, Error> {
    let chars: Vec<char> = input.chars().collect();
    check_offset(opts, chars.len())?;
    debug!(
        "match run: {} nodes over {} code points",
        nfa.node_count(),
        chars.len()
    );
    let mut exec = Executor::new(
        GraphView::new(nfa),
        nfa,
        &chars,
        input,
        nfa::START,
        Mode::Match,
        opts,
    );
    exec.run()?;
    Ok(exec.matches)
}

pub(crate) fn run_match(nfa: &Nfa, input: &str, opts: &Options) -> Result<MatchResult, Error> {
    let found = run_match_raw(nfa, input, opts)?;
    if found.is_empty() {
        return Ok(MatchResult::NoMatch(echo_input(input)));
    }
    let chars: Vec<char> = input.chars().collect();
    let presented = found
        .into_iter()
        .map(|caps| present(caps, nfa.capture_spec(), opts, &chars));
    match opts.multiple {
        Multiple::All => Ok(MatchResult::Matches(presented.collect())),
        Multiple::One => match presented.into_iter().next() {
            Some(caps) => Ok(MatchResult::Match(caps)),
            None => Err(Error::Protocol("a recorded match vanished")),
        },
    }
}

/// Run a substring search by splicing the `.*` prefix overlay in front
/// of the compiled graph. The overlay is torn down when the run ends.
pub(crate) fn run_search(nfa: &Nfa, input: &str, opts: &Options) -> Result<SearchResult, Error> {
    let chars: Vec<char> = input.chars().collect();
    check_offset(opts, chars.len())?;
    let overlay: SearchOverlay = nfa::search_overlay(nfa);
    debug!(
        "search run: {} nodes plus spliced prefix over {} code points",
        nfa.node_count(),
        chars.len()
    );
    let mut exec = Executor::new(
        GraphView::with_overlay(nfa, &overlay),
        nfa,
        &chars,
        input,
        overlay.entry(),
        Mode::Search,
        opts,
    );
    exec.run()?;
    let mut hits = exec.searches;
    if hits.is_empty() {
        return Ok(SearchResult::NoMatch(echo_input(input)));
    }
    match opts.multiple {
        Multiple::One => match hits.into_iter().next() {
            Some((span, caps)) => Ok(SearchResult::Search(
                span,
                present(caps, nfa.capture_spec(), opts, &chars),
            )),
            None => Err(Error::Protocol("a recorded hit vanished")),
        },
        Multiple::All => {
            hits.sort_by_key(|(span, _)| (span.pos, span.len));
            Ok(SearchResult::Searches(
                hits.into_iter()
                    .map(|(span, caps)| (span, present(caps, nfa.capture_spec(), opts, &chars)))
                    .collect(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn compile(pattern: &str) -> Nfa {
        let ast = parse(lex(pattern).expect("lex")).expect("parse");
        nfa::build(&ast, &Options::default())
    }

    fn all() -> Options {
        Options {
            multiple: Multiple::All,
            ..Options::default()
        }
    }

    #[test]
    fn literal_match_consumes_everything() {
        let nfa = compile("ab");
        assert!(run_match(&nfa, "ab", &Options::default())
            .expect("run")
            .is_match());
        assert!(!run_match(&nfa, "abab", &Options::default())
            .expect("run")
            .is_match());
        assert!(!run_match(&nfa, "a", &Options::default())
            .expect("run")
            .is_match());
    }

    #[test]
    fn split_accounting_reaches_zero() {
        // Three branches, one survivor: counting must settle at zero
        // without a protocol error.
        let nfa = compile("a|b|c");
        let result = run_match(&nfa, "b", &all()).expect("run");
        assert_eq!(
            match result {
                MatchResult::Matches(sets) => sets.len(),
                other => panic!("expected Matches, got {:?}", other),
            },
            1
        );
    }

    #[test]
    fn ambiguous_patterns_enumerate_distinct_results() {
        let nfa = compile("(a?)(a*)");
        let result = run_match(&nfa, "aa", &all()).expect("run");
        let MatchResult::Matches(sets) = result else {
            panic!("expected Matches");
        };
        assert_eq!(sets.len(), 2);
        // Every set has keys 0..=2.
        for caps in &sets {
            assert_eq!(caps.len(), 3);
        }
    }

    #[test]
    fn duplicate_paths_collapse() {
        let nfa = compile("a|a");
        let result = run_match(&nfa, "a", &all()).expect("run");
        let MatchResult::Matches(sets) = result else {
            panic!("expected Matches");
        };
        assert_eq!(sets.len(), 1);
    }

    #[test]
    fn search_reports_overlapping_hits() {
        let nfa = compile("ana");
        let result = run_search(&nfa, "banana", &all()).expect("run");
        assert_eq!(
            result.spans(),
            vec![Span::new(1, 3), Span::new(3, 3)]
        );
    }

    #[test]
    fn zero_length_search_hits_terminate() {
        let nfa = compile("a*");
        let result = run_search(&nfa, "b", &all()).expect("run");
        assert_eq!(result.spans(), vec![Span::new(0, 0), Span::new(1, 0)]);
    }

    #[test]
    fn offset_past_end_is_an_option_error() {
        let nfa = compile("a");
        let opts = Options {
            offset: 2,
            ..Options::default()
        };
        assert!(matches!(
            run_match(&nfa, "a", &opts),
            Err(Error::Option(_))
        ));
    }

    #[test]
    fn epsilon_cycles_hit_the_timeout() {
        let nfa = compile("(a*)*");
        let opts = Options {
            multiple: Multiple::All,
            timeout: Duration::from_millis(80),
            ..Options::default()
        };
        assert!(matches!(
            run_match(&nfa, "", &opts),
            Err(Error::Timeout(_))
        ));
    }
}
