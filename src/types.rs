//! Shared option, capture, and result types.

use core::time::Duration;
use smallvec::SmallVec;
use thiserror::Error;

/// Errors surfaced by compilation or execution.
/// A failed match is not an error; it is the `NoMatch` result.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Lexical or parse error in the pattern.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// An option value that cannot apply to the given input.
    #[error("invalid option: {0}")]
    Option(String),

    /// No traversal made progress within the configured timeout.
    #[error("execution timed out after {0:?}")]
    Timeout(Duration),

    /// A node received a message shape it cannot handle. Fatal.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),
}

/// Build a syntax error result from any printable message.
pub(crate) fn syntax<S: ToString, T>(text: S) -> Result<T, Error> {
    Err(Error::Syntax(text.to_string()))
}

/// A group ordinal. Ordinal 0 is reserved for the whole input.
pub type GroupOrdinal = u32;

/// Identity of a group as written in the pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupName {
    /// `(...)`: numbered group, 1-based in lex order.
    Index(GroupOrdinal),

    /// `(?<label>...)`: carries both its lex-order ordinal and its label.
    Named(GroupOrdinal, String),

    /// `(?:...)`: groups without capturing.
    NoCapture,

    /// Sentinel frame marking where a substring match began.
    Search,
}

impl GroupName {
    /// The capture keys owned by this group. A named group owns two.
    pub(crate) fn keys(&self) -> SmallVec<[CaptureKey; 2]> {
        let mut keys = SmallVec::new();
        match self {
            GroupName::Index(n) => keys.push(CaptureKey::Ordinal(*n)),
            GroupName::Named(n, label) => {
                keys.push(CaptureKey::Ordinal(*n));
                keys.push(CaptureKey::Label(label.clone()));
            }
            GroupName::NoCapture | GroupName::Search => {}
        }
        keys
    }
}

/// Key under which a capture is reported.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CaptureKey {
    Ordinal(GroupOrdinal),
    Label(String),
}

/// Extent of a match, in code points from the start of the input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub pos: usize,
    pub len: usize,
}

impl Span {
    pub fn new(pos: usize, len: usize) -> Span {
        Span { pos, len }
    }
}

/// Payload of a single capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureValue {
    /// The group exists in the pattern but captured nothing.
    NoCapture,

    /// Extent of the capture, in code points.
    Index(Span),

    /// The captured text itself (`payload: Binary`, and always key 0).
    Text(String),
}

impl CaptureValue {
    pub fn is_capture(&self) -> bool {
        !matches!(self, CaptureValue::NoCapture)
    }

    /// The span, if this value is in index form.
    pub fn span(&self) -> Option<Span> {
        match self {
            CaptureValue::Index(span) => Some(*span),
            _ => None,
        }
    }

    /// The text, if this value is in text form.
    pub fn text(&self) -> Option<&str> {
        match self {
            CaptureValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// An ordered small map from capture keys to values.
///
/// Key 0 of any result carries the whole input as text, so the raw input
/// is always available to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    entries: Vec<(CaptureKey, CaptureValue)>,
}

impl Captures {
    pub fn new() -> Captures {
        Captures::default()
    }

    /// Insert or replace the value for a key.
    pub fn insert(&mut self, key: CaptureKey, value: CaptureValue) {
        for entry in &mut self.entries {
            if entry.0 == key {
                entry.1 = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    pub(crate) fn contains_key(&self, key: &CaptureKey) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &CaptureKey) -> Option<&CaptureValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a capture by group ordinal. Ordinal 0 is the whole input.
    pub fn ordinal(&self, n: GroupOrdinal) -> Option<&CaptureValue> {
        self.get(&CaptureKey::Ordinal(n))
    }

    /// Look up a capture by group label.
    pub fn label(&self, label: &str) -> Option<&CaptureValue> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, CaptureKey::Label(l) if l == label))
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(CaptureKey, CaptureValue)> {
        self.entries.iter()
    }

    /// Canonicalise entry order so that equal capture sets compare equal.
    pub(crate) fn normalize(&mut self) {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
    }

    /// Drop every entry whose key the filter rejects. Key 0 always stays.
    pub(crate) fn retain_allowed(&mut self, allowed: impl Fn(&CaptureKey) -> bool) {
        self.entries
            .retain(|(k, _)| *k == CaptureKey::Ordinal(0) || allowed(k));
    }

    /// Map every value through `f`, leaving keys in place.
    pub(crate) fn map_values(&mut self, f: impl Fn(&CaptureKey, CaptureValue) -> CaptureValue) {
        for (k, v) in &mut self.entries {
            let taken = core::mem::replace(v, CaptureValue::NoCapture);
            *v = f(k, taken);
        }
    }
}

/// Which payload form captures are reported in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Payload {
    /// `(pos, len)` spans in code points.
    #[default]
    Index,
    /// Slices of the input as strings.
    Binary,
}

/// Which capture keys are exposed in results.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CaptureSpec {
    #[default]
    All,
    /// Only labelled keys.
    Named,
    /// Only key 0.
    None,
    /// Exactly the listed keys.
    List(Vec<CaptureKey>),
}

impl CaptureSpec {
    pub(crate) fn allows(&self, key: &CaptureKey) -> bool {
        match self {
            CaptureSpec::All => true,
            CaptureSpec::Named => matches!(key, CaptureKey::Label(_)),
            CaptureSpec::None => false,
            CaptureSpec::List(keys) => keys.contains(key),
        }
    }
}

/// Whether a run stops at the first result or enumerates all of them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Multiple {
    #[default]
    One,
    All,
}

/// Options consumed by compile and by each run.
///
/// `capture` is compiled into the NFA; the run-time value may only
/// further restrict what the compiled pattern exposes.
#[derive(Debug, Clone)]
pub struct Options {
    /// If set, `.` matches `\n` as well.
    pub dot_all: bool,

    /// Capture payload form.
    pub payload: Payload,

    /// Which captures to expose.
    pub capture: CaptureSpec,

    /// Executor timeout for one run.
    pub timeout: Duration,

    /// Stop at the first result, or enumerate all of them.
    pub multiple: Multiple,

    /// Initial position, in code points.
    pub offset: usize,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            dot_all: false,
            payload: Payload::Index,
            capture: CaptureSpec::All,
            timeout: Duration::from_millis(1000),
            multiple: Multiple::One,
            offset: 0,
        }
    }
}

/// Result of a whole-input match run.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    /// No traversal consumed the whole input. Key 0 echoes the input.
    NoMatch(Captures),
    Match(Captures),
    /// All distinct capture sets, in discovery order (`multiple: All`).
    Matches(Vec<Captures>),
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        !matches!(self, MatchResult::NoMatch(_))
    }

    /// The single capture set, if there is exactly one.
    pub fn captures(&self) -> Option<&Captures> {
        match self {
            MatchResult::Match(caps) => Some(caps),
            MatchResult::Matches(all) if all.len() == 1 => all.first(),
            _ => None,
        }
    }
}

/// Result of a substring search run.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResult {
    /// No substring matched. Key 0 echoes the input.
    NoMatch(Captures),
    Search(Span, Captures),
    /// All distinct hits, in ascending position order (`multiple: All`).
    Searches(Vec<(Span, Captures)>),
}

impl SearchResult {
    pub fn is_match(&self) -> bool {
        !matches!(self, SearchResult::NoMatch(_))
    }

    /// The spans of every hit.
    pub fn spans(&self) -> Vec<Span> {
        match self {
            SearchResult::NoMatch(_) => Vec::new(),
            SearchResult::Search(span, _) => vec![*span],
            SearchResult::Searches(hits) => hits.iter().map(|(span, _)| *span).collect(),
        }
    }
}
