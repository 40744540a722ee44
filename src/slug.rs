//! Title → URL-safe slug conversion.
//!
//! The slug becomes part of each post's URL and therefore of the feed item's
//! guid, so the function must be deterministic and total.

/// Longest slug produced by [`slugify`] (before any collision suffix).
pub const MAX_SLUG_LEN: usize = 60;

/// Returned when a title has no usable characters.
pub const FALLBACK_SLUG: &str = "story";

/// Turn an arbitrary title into a lower-case, hyphenated identifier.
///
/// Only ASCII letters, digits, spaces and hyphens survive.  Runs of spaces
/// become a single hyphen and the result is cut to [`MAX_SLUG_LEN`]
/// characters.  Never returns an empty string.
pub fn slugify(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-')
        .collect();

    let slug = kept
        .trim()
        .to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");

    // Everything left is ASCII, so byte truncation is safe.
    let slug = &slug[..slug.len().min(MAX_SLUG_LEN)];

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Suffix a slug to make it unique; `n` counts from 2.
pub fn disambiguate(slug: &str, n: usize) -> String {
    format!("{slug}-{n}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn is_slug_shaped(s: &str) -> bool {
        s.len() <= MAX_SLUG_LEN
            && s.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }

    #[test]
    fn simple_title() {
        assert_eq!(slugify("Cats"), "cats");
        assert_eq!(slugify("The Fog Lifts"), "the-fog-lifts");
    }

    #[test]
    fn strips_punctuation_and_collapses_spaces() {
        assert_eq!(slugify("  Hello,   World!  "), "hello-world");
        assert_eq!(slugify("What's up? (part 2)"), "whats-up-part-2");
    }

    #[test]
    fn keeps_existing_hyphens() {
        assert_eq!(slugify("Well-Known Story"), "well-known-story");
    }

    #[test]
    fn non_ascii_letters_are_dropped() {
        assert_eq!(slugify("Café Noir"), "caf-noir");
    }

    #[test]
    fn tabs_and_newlines_are_removed_not_joined() {
        assert_eq!(slugify("a\tb\nc"), "abc");
    }

    #[test]
    fn truncates_to_sixty() {
        let long = "a".repeat(100);
        assert_eq!(slugify(&long).len(), MAX_SLUG_LEN);

        let words = "word ".repeat(30);
        let slug = slugify(&words);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(slug.starts_with("word-word"));
    }

    #[test]
    fn empty_inputs_fall_back() {
        assert_eq!(slugify(""), FALLBACK_SLUG);
        assert_eq!(slugify("   "), FALLBACK_SLUG);
        assert_eq!(slugify("!!!???"), FALLBACK_SLUG);
        assert_eq!(slugify("日本語"), FALLBACK_SLUG);
    }

    #[test]
    fn output_is_always_slug_shaped_and_non_empty() {
        let inputs = [
            "",
            "Cats",
            "  Mixed CASE  and   spaces ",
            "emoji 🐈 here",
            "line\r\nbreaks",
            "----",
            &"x y ".repeat(50),
        ];
        for input in inputs {
            let s = slugify(input);
            assert!(!s.is_empty(), "empty slug for {input:?}");
            assert!(is_slug_shaped(&s), "bad slug {s:?} for {input:?}");
            assert_eq!(s, slugify(input), "not deterministic for {input:?}");
        }
    }

    #[test]
    fn disambiguate_appends_counter() {
        assert_eq!(disambiguate("cats", 2), "cats-2");
    }
}
