/*!

# regraph - regular expressions as concurrently traversed graphs

This crate provides a regular expression engine built on Thompson's
construction: a pattern compiles to a graph of nodes, and matching
explores the graph with fine-grained concurrent traversals rather than
backtracking. Ambiguous patterns can enumerate every distinct match,
and any pattern can generate random strings it would accept.

# Example: match a whole input

```rust
use regraph::{Options, Regex};
let re = Regex::compile("(ab)+", &Options::default()).unwrap();
assert!(re.match_text("abab", &Options::default()).unwrap().is_match());
assert!(!re.match_text("abx", &Options::default()).unwrap().is_match());
```

# Example: enumerate every match of an ambiguous pattern

```rust
use regraph::{MatchResult, Multiple, Options, Regex};
let re = Regex::compile("(a?)(a*)", &Options::default()).unwrap();
let opts = Options { multiple: Multiple::All, ..Options::default() };
match re.match_text("aa", &opts).unwrap() {
    MatchResult::Matches(sets) => assert_eq!(sets.len(), 2),
    other => panic!("unexpected result {:?}", other),
}
```

# Example: search a substring, overlapping hits included

```rust
use regraph::{Multiple, Options, Regex, Span};
let re = Regex::compile("ana", &Options::default()).unwrap();
let opts = Options { multiple: Multiple::All, ..Options::default() };
let result = re.search_text("banana", &opts).unwrap();
assert_eq!(result.spans(), vec![Span::new(1, 3), Span::new(3, 3)]);
```

# Example: generate a string from a pattern

```rust
use regraph::{Options, Regex};
let re = Regex::compile("[0-9]{4}-[a-f]+", &Options::default()).unwrap();
let s = re.generate_text(&Options::default()).unwrap();
assert!(re.match_text(&s, &Options::default()).unwrap().is_match());
```

# Semantics

All quantifiers explore all branches: there is no greedy/lazy
distinction and no backtracking, so there are also no backreferences
and no lookarounds. Matching is anchored to the whole input; substring
search wraps the pattern in an implicit `.*` prefix and records where
the hit began. Positions and lengths are counted in Unicode code
points, and `\p{...}` classes resolve against the Unicode category,
block, and script tables.

A compiled [`Regex`] is the handle that owns the running graph;
dropping it tears the graph down.

*/

#![warn(clippy::all)]

pub use crate::api::*;
pub use crate::types::{
    CaptureKey, CaptureSpec, CaptureValue, Captures, Error, GroupName, MatchResult, Multiple,
    Options, Payload, SearchResult, Span,
};

mod api;
mod ast;
mod blocks;
mod charclasses;
mod exec;
mod generate;
mod lexer;
mod nfa;
mod parser;
mod types;
mod unicode;
mod uniset;

pub use crate::ast::{Ast, ClassElem};
pub use crate::lexer::{format, lex, Property, Token};
pub use crate::nfa::Nfa;
pub use crate::parser::parse;
pub use crate::unicode::{Extension, PropertyClass};
pub use crate::uniset::{CodePoint, Run, SetKind, Uniset, CODE_POINT_MAX};
