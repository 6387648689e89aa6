//! Field-by-field comparison between a reference profile and user input.

use bactid_schema::{TempRange, UNKNOWN};

/// Fields where a mismatch eliminates the genus outright: a single
/// morphological contradiction cannot be outweighed by other agreement.
pub const HARD_EXCLUSION_FIELDS: &[&str] = &["Gram Stain", "Shape", "Spore Formation"];

/// Field name whose reference values are `low..high` ranges.
pub const GROWTH_TEMPERATURE: &str = "Growth Temperature";

/// Outcome of comparing one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldComparison {
    /// No usable signal: empty/Unknown input, a Variable on either side, or
    /// an unparseable temperature.
    Skip,
    Match,
    Mismatch,
    /// Mismatch on a hard-exclusion field.
    HardExclusion,
}

/// Split a stored value into its lowercase option set. Multi-valued fields
/// use `;` or `/` separators.
fn split_options(value: &str) -> Vec<String> {
    value
        .split([';', '/'])
        .map(|p| p.trim().to_ascii_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Compare one test field between the reference table and user input.
///
/// Variability on either side cannot be scored and yields [`FieldComparison::Skip`];
/// the growth-temperature field compares a single numeric reading against the
/// stored inclusive range; everything else matches on partial,
/// order-independent, case-insensitive containment between option sets.
pub fn compare_field(db_val: &str, user_val: &str, field: &str) -> FieldComparison {
    let user_val = user_val.trim();
    if user_val.is_empty() || user_val.eq_ignore_ascii_case(UNKNOWN) {
        return FieldComparison::Skip;
    }

    let db_options = split_options(db_val);
    let user_options = split_options(user_val);

    if db_options.iter().any(|o| o == "variable") || user_options.iter().any(|o| o == "variable") {
        return FieldComparison::Skip;
    }

    if field == GROWTH_TEMPERATURE {
        if let Some(range) = TempRange::parse(db_val) {
            return match user_val.trim().parse::<f64>() {
                Ok(reading) if range.contains(reading) => FieldComparison::Match,
                Ok(_) => FieldComparison::Mismatch,
                Err(_) => FieldComparison::Skip,
            };
        }
        // Malformed or absent reference range: nothing to score against.
        return FieldComparison::Skip;
    }

    let matched = user_options
        .iter()
        .any(|u| db_options.iter().any(|d| u.contains(d.as_str()) || d.contains(u.as_str())));

    if matched {
        FieldComparison::Match
    } else if HARD_EXCLUSION_FIELDS.contains(&field) {
        FieldComparison::HardExclusion
    } else {
        FieldComparison::Mismatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_and_unknown_skip() {
        assert_eq!(compare_field("Positive", "", "Catalase"), FieldComparison::Skip);
        assert_eq!(compare_field("Positive", "  ", "Catalase"), FieldComparison::Skip);
        assert_eq!(
            compare_field("Positive", "Unknown", "Catalase"),
            FieldComparison::Skip
        );
    }

    #[test]
    fn variable_on_either_side_skips() {
        assert_eq!(
            compare_field("Variable", "Positive", "Catalase"),
            FieldComparison::Skip
        );
        assert_eq!(
            compare_field("Positive", "variable", "Catalase"),
            FieldComparison::Skip
        );
        assert_eq!(
            compare_field("Positive; Variable", "Negative", "Motility"),
            FieldComparison::Skip
        );
    }

    #[test]
    fn exact_equality_matches() {
        assert_eq!(
            compare_field("Positive", "Positive", "Catalase"),
            FieldComparison::Match
        );
        assert_eq!(
            compare_field("Cocci", "COCCI", "Shape"),
            FieldComparison::Match
        );
    }

    #[test]
    fn containment_is_bidirectional_across_option_sets() {
        assert_eq!(
            compare_field("Rods; Short Rods", "rods", "Oxygen Requirement"),
            FieldComparison::Match
        );
        assert_eq!(
            compare_field("Aerobic", "Aerobic / Facultative", "Oxygen Requirement"),
            FieldComparison::Match
        );
    }

    #[test]
    fn mismatch_on_soft_field_is_mismatch() {
        assert_eq!(
            compare_field("Positive", "Negative", "Catalase"),
            FieldComparison::Mismatch
        );
    }

    #[test]
    fn mismatch_on_hard_field_escalates() {
        for field in HARD_EXCLUSION_FIELDS {
            assert_eq!(
                compare_field("Positive", "Negative", field),
                FieldComparison::HardExclusion
            );
        }
    }

    #[test]
    fn growth_temperature_uses_inclusive_range() {
        assert_eq!(
            compare_field("20..40", "37", GROWTH_TEMPERATURE),
            FieldComparison::Match
        );
        assert_eq!(
            compare_field("20..40", "40", GROWTH_TEMPERATURE),
            FieldComparison::Match
        );
        assert_eq!(
            compare_field("20..40", "45", GROWTH_TEMPERATURE),
            FieldComparison::Mismatch
        );
    }

    #[test]
    fn growth_temperature_parse_failures_skip() {
        assert_eq!(
            compare_field("20..40", "warm", GROWTH_TEMPERATURE),
            FieldComparison::Skip
        );
        assert_eq!(
            compare_field("mesophile", "37", GROWTH_TEMPERATURE),
            FieldComparison::Skip
        );
    }

    proptest! {
        /// Any identical non-empty, non-Unknown, non-Variable value matches
        /// itself on every soft field.
        #[test]
        fn equal_values_always_match(v in "[A-Za-z][A-Za-z ]{0,12}") {
            prop_assume!(!v.trim().is_empty());
            prop_assume!(!v.eq_ignore_ascii_case("unknown"));
            prop_assume!(!v.to_ascii_lowercase().contains("variable"));
            prop_assert_eq!(compare_field(&v, &v, "Catalase"), FieldComparison::Match);
        }

        /// The option-set containment test is symmetric in its two arguments
        /// for soft fields (only the mismatch escalation depends on the field).
        #[test]
        fn containment_is_symmetric(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            prop_assume!(a != "variable" && b != "variable");
            let ab = compare_field(&a, &b, "Indole");
            let ba = compare_field(&b, &a, "Indole");
            prop_assert_eq!(ab, ba);
        }
    }
}
