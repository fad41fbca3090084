//! The public compile/match/search/generate surface.

use crate::exec;
use crate::generate;
use crate::lexer;
use crate::nfa::{self, Nfa};
use crate::parser;
use crate::types::{
    CaptureKey, CaptureValue, Captures, Error, MatchResult, Options, SearchResult, Span,
};
use log::debug;
use rand::Rng;

pub use crate::types::GroupOrdinal;

/// A compiled pattern: the handle that owns the running NFA.
///
/// Dropping the handle is the teardown: the arena is freed and every
/// node in it ceases to exist.
pub struct Regex {
    nfa: Nfa,
    pattern: String,
}

impl Regex {
    /// Compile `pattern` into an NFA. `dot_all` and `capture` are baked
    /// into the graph; a run may restrict `capture` further but never
    /// widen it.
    pub fn compile(pattern: &str, opts: &Options) -> Result<Regex, Error> {
        let tokens = lexer::lex(pattern)?;
        let ast = parser::parse(tokens)?;
        let nfa = nfa::build(&ast, opts);
        debug!(
            "compiled {:?}: {} nodes, {} groups",
            pattern,
            nfa.node_count(),
            nfa.group_count()
        );
        Ok(Regex {
            nfa,
            pattern: pattern.to_string(),
        })
    }

    /// Match the whole input against the pattern.
    pub fn match_text(&self, input: &str, opts: &Options) -> Result<MatchResult, Error> {
        exec::run_match(&self.nfa, input, opts)
    }

    /// Find the pattern as a substring of the input.
    pub fn search_text(&self, input: &str, opts: &Options) -> Result<SearchResult, Error> {
        exec::run_search(&self.nfa, input, opts)
    }

    /// Generate a random string the pattern matches.
    pub fn generate_text(&self, opts: &Options) -> Result<String, Error> {
        generate::run(&self.nfa, &mut rand::thread_rng(), opts)
    }

    /// Generate with a caller-supplied source of randomness.
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        opts: &Options,
    ) -> Result<String, Error> {
        generate::run(&self.nfa, rng, opts)
    }

    /// The pattern this regex was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The highest group ordinal in the pattern.
    pub fn group_count(&self) -> GroupOrdinal {
        self.nfa.group_count()
    }

    /// Labelled groups, as `(ordinal, label)` pairs in lex order.
    pub fn group_labels(&self) -> &[(GroupOrdinal, String)] {
        self.nfa.labels()
    }
}

impl core::fmt::Debug for Regex {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Regex")
            .field("pattern", &self.pattern)
            .field("nodes", &self.nfa.node_count())
            .finish()
    }
}

impl core::str::FromStr for Regex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Regex, Error> {
        Regex::compile(s, &Options::default())
    }
}

/// One-shot match: compile, run once, tear down.
pub fn match_once(pattern: &str, input: &str, opts: &Options) -> Result<MatchResult, Error> {
    Regex::compile(pattern, opts)?.match_text(input, opts)
}

/// One-shot search. The pattern is rewritten to `.*( RE ).*` and run in
/// match mode; group 1 of the wrapper holds the match extent and every
/// user ordinal shifts down by one on the way out.
pub fn search_once(pattern: &str, input: &str, opts: &Options) -> Result<SearchResult, Error> {
    let wrapped = format!(".*({}).*", pattern);
    let compile_opts = Options {
        capture: crate::types::CaptureSpec::All,
        ..opts.clone()
    };
    let re = Regex::compile(&wrapped, &compile_opts)?;
    let found = exec::run_match_raw(&re.nfa, input, opts)?;
    if found.is_empty() {
        return Ok(SearchResult::NoMatch(exec::echo_input(input)));
    }
    let chars: Vec<char> = input.chars().collect();
    let mut hits: Vec<(Span, Captures)> = Vec::new();
    for caps in found {
        let Some(CaptureValue::Index(span)) = caps.ordinal(1).cloned() else {
            return Err(Error::Protocol("search wrapper group did not capture"));
        };
        let shifted = shift_ordinals_down(caps);
        let presented = exec::present(shifted, re.nfa.capture_spec(), opts, &chars);
        let hit = (span, presented);
        if !hits.contains(&hit) {
            hits.push(hit);
        }
    }
    match opts.multiple {
        crate::types::Multiple::One => match hits.into_iter().next() {
            Some((span, caps)) => Ok(SearchResult::Search(span, caps)),
            None => Err(Error::Protocol("a recorded hit vanished")),
        },
        crate::types::Multiple::All => {
            hits.sort_by_key(|(span, _)| (span.pos, span.len));
            Ok(SearchResult::Searches(hits))
        }
    }
}

/// Drop the wrapper's group 1 and renumber user groups back down.
fn shift_ordinals_down(caps: Captures) -> Captures {
    let mut shifted = Captures::new();
    for (key, value) in caps.iter() {
        match key {
            CaptureKey::Ordinal(0) => shifted.insert(key.clone(), value.clone()),
            CaptureKey::Ordinal(1) => {}
            CaptureKey::Ordinal(n) => shifted.insert(CaptureKey::Ordinal(n - 1), value.clone()),
            CaptureKey::Label(_) => shifted.insert(key.clone(), value.clone()),
        }
    }
    shifted.normalize();
    shifted
}

/// One-shot generation: compile, sample once, tear down.
pub fn generate_once(pattern: &str, opts: &Options) -> Result<String, Error> {
    Regex::compile(pattern, opts)?.generate_text(opts)
}

/// Escape a string so it matches itself as a pattern.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if ".?+*|()[]-{}\\".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
