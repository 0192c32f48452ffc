//! Property-based tests for identifier and slug utilities.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{
        doc_dir_name, glob_match, is_valid_slug, normalize_identifier, parse_doc_dir_name,
        slugify,
    };
    use proptest::prelude::*;

    // ============================================================================
    // slugify property tests
    // ============================================================================

    proptest! {
        /// Property: slugify output is either empty or a valid slug
        #[test]
        fn slugify_produces_valid_slugs(input in ".*") {
            let slug = slugify(&input);
            prop_assert!(
                slug.is_empty() || is_valid_slug(&slug),
                "slugify produced invalid slug '{}' from input '{}'",
                slug,
                input
            );
        }

        /// Property: slugify is idempotent
        #[test]
        fn slugify_is_idempotent(input in ".*") {
            let once = slugify(&input);
            let twice = slugify(&once);
            prop_assert_eq!(once, twice);
        }

        /// Property: lowercase alphanumeric input is preserved
        #[test]
        fn slugify_preserves_lower_alphanumeric(input in "[a-z0-9]+") {
            prop_assert_eq!(slugify(&input), input);
        }
    }

    // ============================================================================
    // document directory naming property tests
    // ============================================================================

    proptest! {
        /// Property: a directory name built from an id and slug parses back
        #[test]
        fn doc_dir_name_parses_back(
            kind in "[A-Z]{1,6}",
            number in 0u32..100_000,
            slug in "[a-z0-9]{1,8}(-[a-z0-9]{1,8}){0,3}",
        ) {
            let id = format!("{}-{:03}", kind, number);
            let name = doc_dir_name(&id, &slug);
            let parsed = parse_doc_dir_name(&name);
            prop_assert_eq!(parsed, Some((id, Some(slug))));
        }
    }

    // ============================================================================
    // normalize_identifier property tests
    // ============================================================================

    proptest! {
        /// Property: normalization is idempotent
        #[test]
        fn normalize_identifier_is_idempotent(input in "[a-z./\\\\]{0,30}") {
            let once = normalize_identifier(&input);
            let twice = normalize_identifier(&once);
            prop_assert_eq!(once, twice);
        }

        /// Property: normalized identifiers never contain backslashes or empty segments
        #[test]
        fn normalize_identifier_has_clean_segments(input in "[a-z./\\\\]{0,30}") {
            let normalized = normalize_identifier(&input);
            prop_assert!(!normalized.contains('\\'));
            prop_assert!(!normalized.contains("//"));
            prop_assert!(!normalized.starts_with('/'));
        }

        /// Property: pattern "**" matches any identifier
        #[test]
        fn glob_double_star_matches_all(path in "[a-zA-Z0-9_]+(/[a-zA-Z0-9_.]+){0,4}") {
            let result = glob_match("**", &path);
            prop_assert!(result.is_ok());
            prop_assert!(result.unwrap(), "Pattern '**' should match '{}'", path);
        }
    }
}
