use crate::uniset::Run;

// Literal character classes composed into the extension properties.

/// Construct a run from an inclusive range of char.
const fn r(first: char, last: char) -> Run {
    Run::span(first as u32, last as u32)
}

/// Construct a run from a single char.
const fn r1(c: char) -> Run {
    Run::span(c as u32, c as u32)
}

/// The literal whitespace characters folded into `Xsp` alongside the
/// `Zs` category: space, `\n`, `\r`, `\t`, `\v`, `\f`.
pub const LITERAL_WHITESPACE: [Run; 2] = [
    // U+0009 <TAB>, U+000A <LF>, U+000B <VT>, U+000C <FF>, U+000D <CR>
    r('\u{0009}', '\u{000D}'),
    r1('\u{0020}'),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_covers_the_usual_suspects() {
        for c in ['\t', '\n', '\u{0B}', '\u{0C}', '\r', ' '] {
            assert!(
                LITERAL_WHITESPACE.iter().any(|r| r.contains(c as u32)),
                "missing {:?}",
                c
            );
        }
        assert!(!LITERAL_WHITESPACE.iter().any(|r| r.contains('x' as u32)));
    }
}
