//! Name normalization for syntactic matching
//!
//! Display names are never replaced by their normalized form; the normalized
//! string is only ever used as a comparison key.

/// Minimum normalized length before a name is allowed to match anything.
/// Short names ("IT", "misc", "trip") collide far too easily.
pub const MIN_MATCH_LEN: usize = 5;

/// Canonicalize a display name into a comparison key.
///
/// Lower-cases, removes all whitespace, and strips `-`, `_` and `.`.
/// Total: any input produces a (possibly empty) key.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_' | '.'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Containment match between two display names.
///
/// The names match when either normalized form contains the other and the
/// first name's normalized form is longer than [`MIN_MATCH_LEN`] characters.
/// The length floor is checked on `name` (the probe side), mirroring how the
/// matcher and linker always probe with the draft under consideration.
pub fn names_match(name: &str, candidate: &str) -> bool {
    let a = normalize(name);
    if a.len() <= MIN_MATCH_LEN {
        return false;
    }
    let b = normalize(candidate);
    if b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("Tree Planting Day"), "treeplantingday");
        assert_eq!(normalize("robotics-club_annual.trip"), "roboticsclubannualtrip");
        assert_eq!(normalize("  MIXED  Case \t"), "mixedcase");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for s in [
            "Tree Planting Day",
            "robotics-club_annual.trip",
            "",
            "A.B-C_D e",
            "ÜBUNG macht den Meister",
        ] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_normalize_total_on_empty_and_symbols() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("-_. \t"), "");
    }

    #[test]
    fn test_match_is_reflexive_above_floor() {
        assert!(names_match("Tree Planting Day", "Tree Planting Day"));
        assert!(names_match("robotics-club_annual.trip", "Robotics Club Annual Trip"));
    }

    #[test]
    fn test_short_names_never_match() {
        // "trip" normalizes to 4 chars, below the floor
        assert!(!names_match("trip", "trip"));
        // exactly 5 is still too short; the floor is strict
        assert!(!names_match("ab-cde", "abcde"));
        assert!(names_match("abcdef", "abcdef"));
    }

    #[test]
    fn test_containment_either_direction() {
        assert!(names_match("Tree Planting Day 2024", "Tree Planting Day"));
        assert!(names_match("Tree Planting", "Tree Planting Day"));
        assert!(!names_match("Library Renovation", "Tree Planting Day"));
    }

    #[test]
    fn test_empty_candidate_never_matches() {
        // an empty key is contained in everything; it must not count
        assert!(!names_match("Tree Planting Day", ""));
        assert!(!names_match("Tree Planting Day", "-_."));
    }
}
