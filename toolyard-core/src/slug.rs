//! URL slug generation and per-table uniqueness.

use crate::error::{Result, ToolyardError};

const MAX_SLUG_LEN: usize = 80;
const MAX_SUFFIX: u32 = 1000;
const FALLBACK_SLUG: &str = "item";

/// Lookup used to decide whether a slug is already taken.
#[cfg_attr(test, mockall::automock)]
pub trait SlugStore {
    /// Return true when another record already owns `slug`.
    fn slug_exists(&self, slug: &str) -> Result<bool>;
}

/// Turn arbitrary text into a lowercase, dash-separated URL slug.
///
/// Runs of non-alphanumeric characters collapse into a single dash, dashes
/// are trimmed from both ends and the result is cut at the last dash before
/// 80 characters.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        let truncated = &slug[..MAX_SLUG_LEN];
        slug = match truncated.rfind('-') {
            Some(pos) if pos > 0 => truncated[..pos].to_string(),
            _ => truncated.to_string(),
        };
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Return `base` if it is free, otherwise the first free `base-N` for N >= 2.
pub fn unique_slug<S: SlugStore + ?Sized>(base: &str, store: &S) -> Result<String> {
    let base = slugify(base);
    if !store.slug_exists(&base)? {
        return Ok(base);
    }
    for suffix in 2..=MAX_SUFFIX {
        let candidate = format!("{base}-{suffix}");
        if !store.slug_exists(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(ToolyardError::conflict(format!(
        "no free slug left for {base}"
    )))
}

/// In-memory slug set, handy for batch imports and tests.
impl SlugStore for std::collections::HashSet<String> {
    fn slug_exists(&self, slug: &str) -> Result<bool> {
        Ok(self.contains(slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use std::collections::HashSet;

    #[test]
    fn slugify_lowercases_and_collapses_separators() {
        assert_eq!(slugify("Acme Analytics"), "acme-analytics");
        assert_eq!(slugify("  Hello,   World!! "), "hello-world");
        assert_eq!(slugify("foo@bar#baz"), "foo-bar-baz");
        assert_eq!(slugify("a---b"), "a-b");
    }

    #[test]
    fn slugify_drops_non_ascii_and_falls_back() {
        assert_eq!(slugify("Café Crème"), "caf-cr-me");
        assert_eq!(slugify("!!!"), "item");
        assert_eq!(slugify(""), "item");
    }

    #[test]
    fn slugify_truncates_at_word_boundary() {
        let long = "word ".repeat(30);
        let slug = slugify(&long);
        assert!(slug.len() <= 80);
        assert!(!slug.ends_with('-'));
        assert!(slug.starts_with("word-word"));
    }

    #[test]
    fn unique_slug_returns_base_when_free() {
        let mut store = MockSlugStore::new();
        store
            .expect_slug_exists()
            .with(eq("acme"))
            .times(1)
            .returning(|_| Ok(false));
        assert_eq!(unique_slug("Acme", &store).expect("slug"), "acme");
    }

    #[test]
    fn unique_slug_appends_first_free_suffix() {
        let taken: HashSet<String> = ["acme", "acme-2", "acme-3"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(unique_slug("ACME", &taken).expect("slug"), "acme-4");
    }

    #[test]
    fn unique_slug_propagates_store_errors() {
        let mut store = MockSlugStore::new();
        store
            .expect_slug_exists()
            .returning(|_| Err(ToolyardError::Other("db down".to_string())));
        let err = unique_slug("acme", &store).unwrap_err();
        assert_eq!(err, ToolyardError::Other("db down".to_string()));
    }

    #[test]
    fn unique_slug_gives_up_after_limit() {
        let mut store = MockSlugStore::new();
        store.expect_slug_exists().returning(|_| Ok(true));
        let err = unique_slug("busy", &store).unwrap_err();
        assert!(matches!(err, ToolyardError::Conflict(_)));
    }
}
