use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::HashMap;

// Patterns are tried in priority order against the uppercased area text.
// The feed writes vessel names either as "(BARCO FOO)", as a bare
// "BARCO FOO" run, or as any parenthesized name without the keyword.
static EXTRACT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\(BARCO\s+([^)]+)\)",
        r"BARCO\s+([A-Z0-9\s\.]+?)(?:\)|$)",
        r"\(\s*([A-Z][A-Z0-9\s\.]+?)\s*\)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("invalid extraction pattern"))
    .collect()
});

/// Extracts a vessel name from the free-text area field.
///
/// Returns `None` if no pattern matches or the extracted name is
/// shorter than 2 characters.
pub fn extract_vessel_name(area: &str) -> Option<String> {
    let area = area.to_uppercase();

    for pattern in EXTRACT_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(&area) {
            let name = captures[1].trim().replace("BARCO", "");
            let name = collapse_whitespace(&name);
            if name.chars().count() >= 2 {
                return Some(name);
            }
        }
    }

    None
}

/// Normalizes a raw vessel name against the canonical roster.
///
/// The alias table is consulted first and always wins over fuzzy
/// matching. Fuzzy matching walks the roster in order and takes the
/// first entry that matches; ambiguous inputs therefore resolve by
/// roster position. If nothing matches, the cleaned-up input is
/// returned as-is and the caller is responsible for treating
/// non-roster results as unresolved.
pub fn normalize_vessel_name(
    raw: &str,
    roster: &[String],
    aliases: &HashMap<String, String>,
) -> Option<String> {
    let name = collapse_whitespace(&strip_punctuation(&raw.to_uppercase()));
    if name.is_empty() {
        return None;
    }

    if let Some(canonical) = aliases.get(&name) {
        return Some(canonical.clone());
    }

    for vessel in roster {
        let canonical = strip_punctuation(vessel).trim().to_string();
        if name == canonical
            || name.contains(&canonical)
            || (name.chars().count() >= 4 && canonical.contains(&name))
        {
            return Some(vessel.clone());
        }
    }

    Some(name)
}

fn strip_punctuation(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FleetConfig;
    use quickcheck_macros::quickcheck;

    fn defaults() -> FleetConfig {
        FleetConfig::default()
    }

    #[test]
    fn test_extract_parenthesized_barco() {
        assert_eq!(
            extract_vessel_name("🐟 FLOTA ATUNERA (BARCO MILENA A)"),
            Some("MILENA A".to_string())
        );
    }

    #[test]
    fn test_extract_bare_barco_run() {
        assert_eq!(
            extract_vessel_name("FLOTA ATUNERA BARCO ROSA F"),
            Some("ROSA F".to_string())
        );
    }

    #[test]
    fn test_extract_any_parenthesized_name() {
        assert_eq!(
            extract_vessel_name("Flota Atunera (Gloria A)"),
            Some("GLORIA A".to_string())
        );
    }

    #[test]
    fn test_extract_strips_keyword_and_collapses_whitespace() {
        assert_eq!(
            extract_vessel_name("(BARCO   MARIA   DEL  MAR)"),
            Some("MARIA DEL MAR".to_string())
        );
    }

    #[test]
    fn test_extract_rejects_short_names() {
        assert_eq!(extract_vessel_name("(BARCO X)"), None);
    }

    #[test]
    fn test_extract_no_match() {
        assert_eq!(extract_vessel_name("sala de maquinas"), None);
    }

    #[test]
    fn test_normalize_exact_roster_match() {
        let config = defaults();
        assert_eq!(
            normalize_vessel_name("MILENA A", &config.roster, &config.aliases),
            Some("MILENA A".to_string())
        );
    }

    #[test]
    fn test_normalize_alias_hit() {
        let config = defaults();
        assert_eq!(
            normalize_vessel_name("RICKY A", &config.roster, &config.aliases),
            Some("BP RICKY A".to_string())
        );
    }

    #[test]
    fn test_normalize_strips_punctuation() {
        let config = defaults();
        assert_eq!(
            normalize_vessel_name("rosa  f.", &config.roster, &config.aliases),
            Some("ROSA F".to_string())
        );
    }

    #[test]
    fn test_normalize_input_substring_of_canonical() {
        let config = defaults();
        // 4+ characters may match as a substring of a roster entry
        assert_eq!(
            normalize_vessel_name("DRENN", &config.roster, &config.aliases),
            Some("DRENNEC".to_string())
        );
    }

    #[test]
    fn test_normalize_short_input_never_substring_matches() {
        let config = defaults();
        // "GUR" is 3 chars, too short for the substring-of-canonical rule
        assert_eq!(
            normalize_vessel_name("GUR", &config.roster, &config.aliases),
            Some("GUR".to_string())
        );
    }

    #[test]
    fn test_normalize_unknown_returns_cleaned_input() {
        let config = defaults();
        assert_eq!(
            normalize_vessel_name("el  tiburon!", &config.roster, &config.aliases),
            Some("EL TIBURON".to_string())
        );
    }

    #[test]
    fn test_normalize_empty_input() {
        let config = defaults();
        assert_eq!(
            normalize_vessel_name("   ", &config.roster, &config.aliases),
            None
        );
    }

    #[test]
    fn test_alias_wins_over_fuzzy_match() {
        let roster = vec!["ROSA F".to_string(), "ROSA MARIA".to_string()];
        let aliases =
            HashMap::from([("ROSA".to_string(), "ROSA MARIA".to_string())]);

        // Fuzzy matching would resolve "ROSA" to "ROSA F" (first roster
        // entry containing it); the alias table must win.
        assert_eq!(
            normalize_vessel_name("ROSA", &roster, &aliases),
            Some("ROSA MARIA".to_string())
        );
    }

    #[test]
    fn test_extract_then_normalize_scenario() {
        let config = defaults();
        let extracted = extract_vessel_name("(BARCO MILENA A)").expect("should extract");
        assert_eq!(extracted, "MILENA A");
        assert_eq!(
            normalize_vessel_name(&extracted, &config.roster, &config.aliases),
            Some("MILENA A".to_string())
        );
    }

    #[quickcheck]
    fn prop_normalize_is_idempotent(input: String) -> bool {
        let config = defaults();
        let once = normalize_vessel_name(&input, &config.roster, &config.aliases);
        match once {
            None => true,
            Some(name) => {
                normalize_vessel_name(&name, &config.roster, &config.aliases)
                    == Some(name)
            }
        }
    }
}
