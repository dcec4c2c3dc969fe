//! URL slugs for book titles.
//!
//! Titles are transliterated to ASCII first ("Война и мир" -> "voina-i-mir",
//! "Les Misérables" -> "les-miserables"), so any title with a letter or
//! digit in some script yields a non-empty slug. Apostrophes join words
//! instead of splitting them.

/// Upper bound on slug length, in bytes (slugs are ASCII)
pub const MAX_SLUG_LEN: usize = 100;

pub fn slugify(title: &str) -> String {
    let joined: String = title
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2019}'))
        .collect();

    let mut slug = slug::slugify(joined);
    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        let trimmed = slug.trim_end_matches('-').len();
        slug.truncate(trimmed);
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_titles() {
        assert_eq!(slugify("My Title"), "my-title");
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("foo/bar\\baz"), "foo-bar-baz");
        assert_eq!(slugify("1984"), "1984");
    }

    #[test]
    fn punctuation_collapses() {
        assert_eq!(slugify("Don't Panic"), "dont-panic");
        assert_eq!(slugify("Don\u{2019}t Panic"), "dont-panic");
        assert_eq!(
            slugify("  The Hobbit: There and Back Again  "),
            "the-hobbit-there-and-back-again"
        );
        assert_eq!(slugify("C++ -- A Primer?"), "c-a-primer");
    }

    #[test]
    fn accented_titles_are_transliterated() {
        assert_eq!(slugify("Les Misérables"), "les-miserables");
        assert_eq!(slugify("café au lait"), "cafe-au-lait");
        assert_eq!(slugify("Über Straße"), "uber-strasse");
    }

    #[test]
    fn non_latin_titles_get_a_slug() {
        let russian = slugify("Война и мир");
        assert!(russian.ends_with("-i-mir"), "{russian}");
        assert!(russian.starts_with('v'), "{russian}");

        let greek = slugify("Οδύσσεια");
        assert!(!greek.is_empty());
        assert!(greek
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn empty_and_symbol_only() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("?!..."), "");
    }

    #[test]
    fn truncates_without_trailing_hyphen() {
        let slug = slugify(&"a".repeat(150));
        assert_eq!(slug.len(), MAX_SLUG_LEN);
        assert!(slug.chars().all(|c| c == 'a'));

        let slug = slugify(&"ab ".repeat(60));
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }
}
