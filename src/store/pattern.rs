//! Glob Matching for Key Listing
//!
//! Supported syntax:
//!
//! - `*` matches any run of characters, including none
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]`, `[^a]` match one character from (or outside) a set
//! - `\x` matches `x` literally
//!
//! Matching works on bytes, so `?` consumes one byte of a multi-byte
//! UTF-8 character.

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub(crate) struct GlobPattern {
    pattern: Vec<u8>,
}

impl GlobPattern {
    pub(crate) fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.as_bytes().to_vec(),
        }
    }

    pub(crate) fn matches(&self, text: &str) -> bool {
        matches_at(&self.pattern, text.as_bytes())
    }
}

fn matches_at(pattern: &[u8], text: &[u8]) -> bool {
    let Some((&first, rest)) = pattern.split_first() else {
        return text.is_empty();
    };

    match first {
        b'*' => (0..=text.len()).any(|skip| matches_at(rest, &text[skip..])),
        b'?' => !text.is_empty() && matches_at(rest, &text[1..]),
        b'[' => match text.split_first() {
            Some((&c, text_rest)) => match match_class(rest, c) {
                Some((true, after)) => matches_at(after, text_rest),
                _ => false,
            },
            None => false,
        },
        b'\\' if !rest.is_empty() => {
            !text.is_empty() && rest[0] == text[0] && matches_at(&rest[1..], &text[1..])
        }
        literal => !text.is_empty() && literal == text[0] && matches_at(rest, &text[1..]),
    }
}

/// Matches `c` against a class body (the bytes after `[`).
///
/// Returns whether it matched and the pattern after the closing `]`, or
/// None if the class is never closed.
fn match_class(class: &[u8], c: u8) -> Option<(bool, &[u8])> {
    let (negate, mut i) = match class.first() {
        Some(b'^') => (true, 1),
        _ => (false, 0),
    };

    let mut matched = false;
    while i < class.len() && class[i] != b']' {
        let is_range = i + 2 < class.len() && class[i + 1] == b'-' && class[i + 2] != b']';
        if is_range {
            matched |= (class[i]..=class[i + 2]).contains(&c);
            i += 3;
        } else {
            matched |= class[i] == c;
            i += 1;
        }
    }

    if i >= class.len() {
        return None;
    }
    Some((matched != negate, &class[i + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_and_question() {
        let pattern = GlobPattern::new("h*llo");
        assert!(pattern.matches("hello"));
        assert!(pattern.matches("hllo"));
        assert!(pattern.matches("heeeello"));
        assert!(!pattern.matches("world"));

        let pattern = GlobPattern::new("h?llo");
        assert!(pattern.matches("hallo"));
        assert!(!pattern.matches("hllo"));
        assert!(!pattern.matches("heello"));

        let pattern = GlobPattern::new("*");
        assert!(pattern.matches(""));
        assert!(pattern.matches("Pin Code"));
    }

    #[test]
    fn test_character_classes() {
        let pattern = GlobPattern::new("h[ae]llo");
        assert!(pattern.matches("hello"));
        assert!(pattern.matches("hallo"));
        assert!(!pattern.matches("hillo"));

        let pattern = GlobPattern::new("user:[0-9]");
        assert!(pattern.matches("user:7"));
        assert!(!pattern.matches("user:x"));

        let pattern = GlobPattern::new("[^P]*");
        assert!(pattern.matches("Username"));
        assert!(!pattern.matches("Password"));

        // Unclosed class never matches
        assert!(!GlobPattern::new("[abc").matches("a"));
    }

    #[test]
    fn test_escape() {
        let pattern = GlobPattern::new(r"what\?");
        assert!(pattern.matches("what?"));
        assert!(!pattern.matches("whats"));
    }
}
