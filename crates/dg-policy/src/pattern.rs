// pattern.rs — Deck-name pattern matching.
//
// Deck names are hierarchical (`Study::Math::Algebra`) but patterns are not
// segment-aware: `*` matches any run of characters, `::` included. So
// `Study::*` covers every subdeck at any depth, and `*.Private` matches any
// name ending in `.Private`.
//
// This is a deliberately tiny matcher instead of a glob library: there is no
// `?`, no character classes, no escaping, and runs of `*` collapse into one.

/// The only metacharacter.
const WILDCARD: char = '*';

/// Check whether `name` matches `pattern` in full.
///
/// Matching is case-sensitive and anchored at both ends. The pattern is
/// split on `*`; the name must start with the first piece, end with the last
/// piece, and contain the pieces in between in order without overlapping.
/// An empty pattern only matches the empty name.
pub fn matches(name: &str, pattern: &str) -> bool {
    if !pattern.contains(WILDCARD) {
        return name == pattern;
    }

    // Splitting "a**b" yields an empty middle piece, which always matches,
    // so consecutive wildcards already behave like one.
    let pieces: Vec<&str> = pattern.split(WILDCARD).collect();
    let first = pieces[0];
    let last = pieces[pieces.len() - 1];

    if name.len() < first.len() + last.len() {
        return false;
    }
    if !name.starts_with(first) || !name.ends_with(last) {
        return false;
    }

    // Both bounds fall on char boundaries: they are the ends of a matched
    // prefix and the start of a matched suffix.
    let mut rest = &name[first.len()..name.len() - last.len()];
    for piece in &pieces[1..pieces.len() - 1] {
        if piece.is_empty() {
            continue;
        }
        match rest.find(piece) {
            Some(idx) => rest = &rest[idx + piece.len()..],
            None => return false,
        }
    }
    true
}

/// Return the first pattern in `patterns` that matches `name`, if any.
///
/// Callers use the returned pattern to say which rule fired.
pub fn matches_any<'a, I, S>(name: &str, patterns: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    patterns
        .into_iter()
        .map(|pattern: &'a S| -> &'a str { pattern.as_ref() })
        .find(|pattern| matches(name, pattern))
}
