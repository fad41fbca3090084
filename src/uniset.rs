//! Run-length-encoded Unicode code point sets.
//!
//! A `Uniset` is a list of `(start, len)` runs plus a tag. Runs are kept
//! exactly as constructed: unions concatenate without sorting or merging,
//! which is acceptable because sets are only consulted by linear
//! membership scans and weighted random picks. `complement` is the one
//! operation that sorts.

use rand::Rng;

pub type CodePoint = u32;

/// The maximum (inclusive) code point.
pub const CODE_POINT_MAX: CodePoint = 0x10FFFF;

const SURROGATE_FIRST: CodePoint = 0xD800;
const SURROGATE_LAST: CodePoint = 0xDFFF;

/// How many times `pick` re-draws before giving up. Only degenerate sets
/// (all surrogates, or a complement with nothing left) hit the bound.
const PICK_ATTEMPTS: u32 = 4096;

pub(crate) fn is_surrogate(cp: CodePoint) -> bool {
    (SURROGATE_FIRST..=SURROGATE_LAST).contains(&cp)
}

/// A run of `len` consecutive code points starting at `start`. `len ≥ 1`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Run {
    pub start: CodePoint,
    pub len: u32,
}

impl Run {
    pub const fn new(start: CodePoint, len: u32) -> Run {
        debug_assert!(len >= 1);
        Run { start, len }
    }

    /// Construct from an inclusive range.
    pub const fn span(first: CodePoint, last: CodePoint) -> Run {
        debug_assert!(first <= last);
        Run {
            start: first,
            len: last - first + 1,
        }
    }

    /// The last code point in the run.
    pub fn last(&self) -> CodePoint {
        self.start + self.len - 1
    }

    pub fn contains(&self, cp: CodePoint) -> bool {
        self.start <= cp && cp <= self.last()
    }
}

/// Distinguishes the full assigned set from sets built by hand.
/// Surrogates are included only via `FullAssigned` and are filtered at
/// pick time.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SetKind {
    FullAssigned,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uniset {
    kind: SetKind,
    size: u64,
    runs: Vec<Run>,
}

impl Uniset {
    /// The whole assigned code space, `[0, 0x10FFFF]`.
    pub fn all() -> Uniset {
        Uniset {
            kind: SetKind::FullAssigned,
            size: (CODE_POINT_MAX + 1) as u64,
            runs: vec![Run::span(0, CODE_POINT_MAX)],
        }
    }

    pub fn none() -> Uniset {
        Uniset {
            kind: SetKind::General,
            size: 0,
            runs: Vec::new(),
        }
    }

    pub fn single(cp: CodePoint) -> Uniset {
        Uniset {
            kind: SetKind::General,
            size: 1,
            runs: vec![Run::new(cp, 1)],
        }
    }

    /// One run of length 1 per listed code point, in the given order.
    pub fn from_codepoints(cps: &[CodePoint]) -> Uniset {
        Uniset {
            kind: SetKind::General,
            size: cps.len() as u64,
            runs: cps.iter().map(|&cp| Run::new(cp, 1)).collect(),
        }
    }

    /// The inclusive range `[first, last]`, `first ≤ last`.
    pub fn range(first: CodePoint, last: CodePoint) -> Uniset {
        debug_assert!(first <= last && last <= CODE_POINT_MAX);
        Uniset {
            kind: SetKind::General,
            size: (last - first + 1) as u64,
            runs: vec![Run::span(first, last)],
        }
    }

    pub fn from_runs(runs: Vec<Run>) -> Uniset {
        let size = runs.iter().map(|r| r.len as u64).sum();
        Uniset {
            kind: SetKind::General,
            size,
            runs,
        }
    }

    pub fn kind(&self) -> SetKind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn runs(&self) -> &[Run] {
        self.runs.as_slice()
    }

    /// Union by run concatenation. Inputs are treated as disjoint: sizes
    /// add, and nothing is sorted or merged. `FullAssigned` absorbs.
    pub fn union(mut self, mut other: Uniset) -> Uniset {
        if self.kind == SetKind::FullAssigned {
            return self;
        }
        if other.kind == SetKind::FullAssigned {
            return other;
        }
        self.size += other.size;
        self.runs.append(&mut other.runs);
        self
    }

    /// Everything not in the set: sort a copy of the runs, then emit the
    /// gaps up to `CODE_POINT_MAX`. The `FullAssigned` tag complements to
    /// the empty set and the empty set complements back to it.
    pub fn complement(&self) -> Uniset {
        if self.kind == SetKind::FullAssigned {
            return Uniset::none();
        }
        if self.runs.is_empty() {
            return Uniset::all();
        }
        let mut sorted = self.runs.clone();
        sorted.sort_by_key(|r| r.start);

        let mut gaps = Vec::new();
        let mut next: CodePoint = 0;
        for run in &sorted {
            if run.start > next {
                gaps.push(Run::span(next, run.start - 1));
            }
            // Runs may overlap after a careless union; never step back.
            next = next.max(run.last().saturating_add(1));
        }
        if next <= CODE_POINT_MAX {
            gaps.push(Run::span(next, CODE_POINT_MAX));
        }
        Uniset::from_runs(gaps)
    }

    /// Linear scan over the runs.
    pub fn contains(&self, cp: CodePoint) -> bool {
        self.runs.iter().any(|r| r.contains(cp))
    }

    /// Draw one code point uniformly, weighted by run length. Surrogate
    /// draws are re-tried; a set with nothing pickable yields `None`.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<CodePoint> {
        if self.size == 0 {
            return None;
        }
        for _ in 0..PICK_ATTEMPTS {
            let mut i = rng.gen_range(0..self.size);
            for run in &self.runs {
                if i < run.len as u64 {
                    let cp = run.start + i as u32;
                    if is_surrogate(cp) {
                        break;
                    }
                    return Some(cp);
                }
                i -= run.len as u64;
            }
        }
        None
    }

    /// Draw one code point *not* in the set, by rejection-sampling the
    /// full code space. `FullAssigned` has no complement to sample.
    /// Linear retry; slow for very dense sets.
    pub fn pick_neg<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<CodePoint> {
        if self.kind == SetKind::FullAssigned {
            return None;
        }
        for _ in 0..PICK_ATTEMPTS {
            let cp = rng.gen_range(0..=CODE_POINT_MAX);
            if is_surrogate(cp) || self.contains(cp) {
                continue;
            }
            return Some(cp);
        }
        None
    }
}
