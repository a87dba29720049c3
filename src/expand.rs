//! Namespace chains: structural helpers over dot-separated names.
//!
//! Everything here is pure string slicing: no registry, no allocation of new
//! names. The chain of `"a.b.c"` is `["a.b.c", "a.b", "a"]`, nearest first.

use crate::error::PathError;

/// Segment separator.
pub const SEPARATOR: char = '.';

/// Expand a namespace name into its ancestor chain, closest first.
///
/// The chain includes the name itself and ends at the top-level segment.
/// The empty name has an empty chain.
///
/// ```
/// assert_eq!(ns_marker::expand("a.b.c"), vec!["a.b.c", "a.b", "a"]);
/// assert_eq!(ns_marker::expand("a"), vec!["a"]);
/// ```
pub fn expand(name: &str) -> Vec<&str> {
    ancestors(name).collect()
}

/// Lazy form of [`expand`].
#[inline]
pub fn ancestors(name: &str) -> Ancestors<'_> {
    Ancestors {
        next: (!name.is_empty()).then_some(name),
    }
}

/// Iterator returned by [`ancestors`].
#[derive(Clone, Debug)]
pub struct Ancestors<'a> {
    next: Option<&'a str>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let current = self.next?;
        self.next = parent_of(current);
        Some(current)
    }
}

/// The enclosing namespace, or `None` for a top-level name.
///
/// A leading separator never yields the empty string as a parent.
#[inline]
pub fn parent_of(name: &str) -> Option<&str> {
    name.rfind(SEPARATOR)
        .map(|pos| &name[..pos])
        .filter(|parent| !parent.is_empty())
}

/// Number of separators in the name (`"a"` is depth 0).
#[inline]
pub fn depth_of(name: &str) -> usize {
    name.matches(SEPARATOR).count()
}

/// True if `candidate` is `scope` itself or lies underneath it.
///
/// Matches whole segments only: `"ab.c"` is not within `"a"`.
pub fn is_within(candidate: &str, scope: &str) -> bool {
    match candidate.strip_prefix(scope) {
        Some("") => !scope.is_empty(),
        Some(rest) => !scope.is_empty() && rest.starts_with(SEPARATOR),
        None => false,
    }
}

/// Check that a name is well formed.
///
/// Resolution accepts any string; registries and manifests only accept names
/// made of identifier-like segments.
pub fn validate(path: &str) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if path.starts_with(SEPARATOR) || path.ends_with(SEPARATOR) {
        return Err(PathError::DanglingSeparator(path.to_string()));
    }

    for seg in path.split(SEPARATOR) {
        let mut chars = seg.chars();
        let Some(first) = chars.next() else {
            return Err(PathError::EmptySegment(path.to_string()));
        };
        if !first.is_alphabetic() && first != '_' {
            return Err(PathError::BadSegmentStart {
                path: path.to_string(),
                segment: seg.to_string(),
            });
        }
        if let Some(ch) = chars.find(|c| !c.is_alphanumeric() && *c != '_') {
            return Err(PathError::BadCharacter {
                path: path.to_string(),
                segment: seg.to_string(),
                ch,
            });
        }
    }
    Ok(())
}
