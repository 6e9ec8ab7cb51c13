//! Public identifiers and URL slugs.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

pub const UID_LENGTH: usize = 12;

const UID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9-]+$").expect("static regex"));

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

/// Opaque 12 character public id (`[0-9a-z]`).
pub fn generate_uid() -> String {
    let mut rng = rand::rng();
    (0..UID_LENGTH)
        .map(|_| UID_ALPHABET[rng.random_range(0..UID_ALPHABET.len())] as char)
        .collect()
}

pub fn is_valid_public_id(id: &str) -> bool {
    id.len() == UID_LENGTH && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Lower-cases `name` and collapses every run of other characters into a
/// single dash. May return an empty string.
pub fn generate_slug(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    NON_ALPHANUMERIC
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// `[a-zA-Z0-9-]` within `min..=max` characters, and not made only of dashes.
pub fn is_valid_slug(slug: &str, min: usize, max: usize) -> bool {
    let len = slug.chars().count();
    (min..=max).contains(&len) && SLUG_CHARS.is_match(slug) && !slug.chars().all(|c| c == '-')
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn uid_has_fixed_length_and_alphabet() {
        let uid = generate_uid();
        assert_eq!(uid.len(), UID_LENGTH);
        assert!(uid.bytes().all(|b| UID_ALPHABET.contains(&b)));
        assert!(is_valid_public_id(&uid));
    }

    #[test]
    fn uids_do_not_repeat() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_uid()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn slug_from_name() {
        assert_eq!(generate_slug("My Board"), "my-board");
        assert_eq!(generate_slug("  Road map: Q3 / 2025 "), "road-map-q3-2025");
        assert_eq!(generate_slug("--already-slugged--"), "already-slugged");
        assert_eq!(generate_slug("!!!"), "");
    }

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("team-alpha", 3, 24));
        assert!(is_valid_slug("ABC", 3, 24));
        assert!(!is_valid_slug("ab", 3, 24));
        assert!(!is_valid_slug("---", 3, 24));
        assert!(!is_valid_slug("with space", 3, 24));
        assert!(!is_valid_slug(&"a".repeat(25), 3, 24));
        assert!(is_valid_slug(&"a".repeat(60), 3, 60));
    }

    #[test]
    fn public_id_validation() {
        assert!(is_valid_public_id("abc123def456"));
        assert!(!is_valid_public_id("abc123"));
        assert!(!is_valid_public_id("abc123def45!"));
    }
}
