//! The compile-time error surface.

use regraph::{match_once, Error, Options, Regex};

#[track_caller]
fn test_1_error(pattern: &str, expected_err: &str) {
    let res = Regex::compile(pattern, &Options::default());
    let Err(err) = res else {
        panic!("pattern should not have compiled: {}", pattern);
    };
    let Error::Syntax(text) = err else {
        panic!("expected a syntax error for {}, got {:?}", pattern, err);
    };
    assert!(
        text.contains(expected_err),
        "error text '{}' did not contain '{}' for pattern '{}'",
        text,
        expected_err,
        pattern
    );
}

#[test]
fn test_unmatched_brackets() {
    test_1_error(r")", "unmatched )");
    test_1_error(r"ab)", "unmatched )");
    test_1_error(r"]", "unmatched ]");
    test_1_error(r"}", "unmatched }");
    test_1_error(r"[abc", "unmatched [");
    test_1_error(r"(ab", "unbalanced group");
    test_1_error(r"((a)", "unbalanced group");
}

#[test]
fn test_bad_escapes() {
    test_1_error("\\", "lone");
    test_1_error(r"\q", "unknown escape");
    test_1_error(r"\x4", "hex digits");
    test_1_error(r"\xZZ", "hex digits");
    test_1_error(r"\u12", "hex digits");
}

#[test]
fn test_bad_properties() {
    test_1_error(r"\p{}", "empty property name");
    test_1_error(r"\p{Nope}", "unknown property");
    test_1_error(r"\p{Lu", "unterminated property");
    test_1_error(r"\pLu", "expected {");
}

#[test]
fn test_bad_groups() {
    test_1_error(r"(?<>a)", "group name");
    test_1_error(r"(?<unclosed", "unterminated group name");
    test_1_error(r"(?<a b>c)", "group name");
    test_1_error(r"(?=a)", "expected `:` or `<`");
    test_1_error(r"()", "empty group");
}

#[test]
fn test_bad_alternations() {
    test_1_error(r"a|", "empty alternative");
    test_1_error(r"|a", "empty alternative");
    test_1_error(r"a||b", "empty alternative");
    test_1_error(r"(a|)", "empty alternative");
    test_1_error(r"", "empty alternative");
}

#[test]
fn test_bad_quantifiers() {
    test_1_error(r"*", "nothing to repeat");
    test_1_error(r"?a", "nothing to repeat");
    test_1_error(r"(+)", "nothing to repeat");
    test_1_error(r"a{0}", "at least 2");
    test_1_error(r"a{1}", "at least 2");
    test_1_error(r"a{", "repeat count");
    test_1_error(r"a{2", "unmatched {");
}

#[test]
fn test_bad_classes() {
    test_1_error(r"[]", "empty character class");
    test_1_error(r"[z-a]", "inverted character range");
    test_1_error(r"[\d-z]", "invalid character range");
    test_1_error(r"[a[b]]", "nested character class");
}

#[test]
fn no_partial_result_on_error() {
    // A compile failure never surfaces a runnable handle.
    assert!(Regex::compile("(a", &Options::default()).is_err());
    assert!(match_once("(a", "a", &Options::default()).is_err());
}
