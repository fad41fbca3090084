//! The engine's laws, checked over finite ensembles.

use rand::rngs::StdRng;
use rand::SeedableRng;
use regraph::{
    format, lex, match_once, parse, search_once, MatchResult, Multiple, Options, Regex,
    SearchResult,
};

/// Patterns whose surface form survives a lex or parse round trip.
const CANONICAL: &[&str] = &[
    "ab",
    "a.c",
    "a|b",
    "a|b|c",
    "(ab)|(cd)",
    "(a|b)c",
    "a*b+c?",
    "a{3}",
    "(?:ab)d",
    "(?<yr>ab)",
    "[a-dZ]",
    "[^0-9p]",
    r"\p{Lu}+",
    r"\p{Greek}",
    r"\.\*\(",
    "a(b(c|d))e",
];

#[test]
fn lex_unlex_round_trip() {
    for pattern in CANONICAL {
        let tokens = lex(pattern).expect("canonical patterns lex");
        assert_eq!(&format(&tokens), pattern, "lex round trip for {:?}", pattern);
    }
}

#[test]
fn parse_unparse_round_trip() {
    for pattern in CANONICAL {
        let tokens = lex(pattern).expect("canonical patterns lex");
        let ast = parse(tokens).expect("canonical patterns parse");
        assert_eq!(
            &ast.to_string(),
            pattern,
            "parse round trip for {:?}",
            pattern
        );
    }
}

#[test]
fn generated_strings_always_match() {
    let patterns = [
        "ab",
        "(a|b)*c",
        "[a-f]{3}",
        "x+y?",
        r"\p{Lu}\p{Nd}",
        "[^0-9]",
        "(?:ab|cd)+",
        "a.b",
        r"\w\w",
    ];
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    for pattern in patterns {
        let re = Regex::compile(pattern, &Options::default()).expect("compile");
        for round in 0..20 {
            let s = re
                .generate_with(&mut rng, &Options::default())
                .expect("generate");
            let result = re.match_text(&s, &Options::default()).expect("run");
            assert!(
                result.is_match(),
                "{:?} rejected its own output {:?} (round {})",
                pattern,
                s,
                round
            );
        }
    }
}

#[test]
fn one_result_is_in_the_all_set_and_all_has_no_duplicates() {
    let cases = [
        ("(a?)(a*)", "aa"),
        ("(a|b)+", "ab"),
        ("a*", "aaa"),
        ("(x)|(x)", "x"),
        ("ab", "ab"),
        ("ab", "nope"),
    ];
    for (pattern, input) in cases {
        let one = match_once(pattern, input, &Options::default()).expect("run");
        let all_opts = Options {
            multiple: Multiple::All,
            ..Options::default()
        };
        let all = match_once(pattern, input, &all_opts).expect("run");
        match (one, all) {
            (MatchResult::NoMatch(_), MatchResult::NoMatch(_)) => {}
            (MatchResult::Match(caps), MatchResult::Matches(sets)) => {
                assert!(
                    sets.contains(&caps),
                    "the One result must appear in the All set for {:?}",
                    pattern
                );
                for (i, a) in sets.iter().enumerate() {
                    for b in &sets[i + 1..] {
                        assert_ne!(a, b, "duplicate result for {:?} on {:?}", pattern, input);
                    }
                }
            }
            (one, all) => panic!(
                "inconsistent multiplicities for {:?}: {:?} vs {:?}",
                pattern, one, all
            ),
        }
    }
}

#[test]
fn search_multiplicity_sanity() {
    let cases = [("ana", "banana"), ("a", "aaaa"), ("zz", "aaaa")];
    for (pattern, input) in cases {
        let re = Regex::compile(pattern, &Options::default()).expect("compile");
        let one = re.search_text(input, &Options::default()).expect("run");
        let all_opts = Options {
            multiple: Multiple::All,
            ..Options::default()
        };
        let all = re.search_text(input, &all_opts).expect("run");
        match (one, all) {
            (SearchResult::NoMatch(_), SearchResult::NoMatch(_)) => {}
            (SearchResult::Search(span, caps), SearchResult::Searches(hits)) => {
                assert!(
                    hits.contains(&(span, caps)),
                    "the One hit must appear in the All set for {:?}",
                    pattern
                );
                for (i, a) in hits.iter().enumerate() {
                    for b in &hits[i + 1..] {
                        assert_ne!(a, b, "duplicate hit for {:?} on {:?}", pattern, input);
                    }
                }
            }
            (one, all) => panic!(
                "inconsistent multiplicities for {:?}: {:?} vs {:?}",
                pattern, one, all
            ),
        }
    }
}

#[test]
fn batch_search_equals_wrapped_match() {
    // The spliced-prefix search and the one-shot `.*( RE ).*` rewrite
    // are two routes to the same answer.
    let cases = [
        ("ana", "banana"),
        ("(n)(a)", "banana"),
        ("Z", "aZnZs"),
        ("[0-9]+", "a12b345"),
        ("q", "banana"),
    ];
    let opts = Options {
        multiple: Multiple::All,
        ..Options::default()
    };
    for (pattern, input) in cases {
        let re = Regex::compile(pattern, &Options::default()).expect("compile");
        let batch = re.search_text(input, &opts).expect("run");
        let wrapped = search_once(pattern, input, &opts).expect("run");
        assert_eq!(
            batch, wrapped,
            "batch and wrapped search disagree for {:?} on {:?}",
            pattern, input
        );
    }
}

fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let mut result = 1u64;
    for i in 0..k {
        result = result * (n - i) / (i + 1);
    }
    result
}

#[test]
fn pascal_triangle_match_counts() {
    // For (a?)^n (a*)^n on "a"*n, the number of distinct capture sets is
    // sum over k of C(n,k) * C(n+k-1,k).
    for n in 1..=3usize {
        let pattern: String = "(a?)".repeat(n) + &"(a*)".repeat(n);
        let input: String = "a".repeat(n);
        let expected: u64 = (0..=n as u64)
            .map(|k| binomial(n as u64, k) * binomial(n as u64 + k - 1, k))
            .sum();
        let opts = Options {
            multiple: Multiple::All,
            ..Options::default()
        };
        let result = match_once(&pattern, &input, &opts).expect("run");
        let MatchResult::Matches(sets) = result else {
            panic!("expected Matches for {:?}", pattern);
        };
        assert_eq!(
            sets.len() as u64,
            expected,
            "match count for n = {} ({:?})",
            n,
            pattern
        );
    }
}
