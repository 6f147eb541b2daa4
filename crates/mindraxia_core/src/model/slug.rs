//! Slug derivation and validation.

use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

const MAX_SLUG_CHARS: usize = 120;

/// Derives a URL slug from free text.
///
/// ASCII letters and digits are kept (lowercased); every other run of
/// characters collapses into one dash. Returns an empty string when nothing
/// survives.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= MAX_SLUG_CHARS {
            break;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Returns whether `slug` is already in canonical form.
pub fn is_valid_slug(slug: &str) -> bool {
    slug.len() <= MAX_SLUG_CHARS && SLUG_RE.is_match(slug)
}

/// Validates an explicit slug or derives one from `fallback`.
pub fn resolve_slug(explicit: Option<&str>, fallback: &str) -> Result<String, ValidationError> {
    match explicit.map(str::trim).filter(|value| !value.is_empty()) {
        Some(slug) if is_valid_slug(slug) => Ok(slug.to_string()),
        Some(slug) => Err(ValidationError::InvalidSlug(slug.to_string())),
        None => {
            let derived = slugify(fallback);
            if derived.is_empty() {
                Err(ValidationError::UnsluggableTitle(fallback.to_string()))
            } else {
                Ok(derived)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_slug, resolve_slug, slugify};

    #[test]
    fn slugify_collapses_punctuation_and_case() {
        assert_eq!(slugify("  Euler's Identity: A Tour!  "), "euler-s-identity-a-tour");
        assert_eq!(slugify("Groups & Rings"), "groups-rings");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn slug_validation_rejects_double_dashes_and_uppercase() {
        assert!(is_valid_slug("linear-algebra-101"));
        assert!(!is_valid_slug("Linear"));
        assert!(!is_valid_slug("a--b"));
        assert!(!is_valid_slug("-a"));
    }

    #[test]
    fn resolve_slug_prefers_explicit_value() {
        assert_eq!(resolve_slug(Some("custom"), "Title").unwrap(), "custom");
        assert_eq!(resolve_slug(Some("  "), "Some Title").unwrap(), "some-title");
        assert!(resolve_slug(Some("Bad Slug"), "x").is_err());
        assert!(resolve_slug(None, "!!!").is_err());
    }
}
