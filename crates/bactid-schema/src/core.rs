//! Canonical core field table.
//!
//! One entry per laboratory test the reference table knows about, in display
//! order. The table is fixed at compile time; learned ("extended") fields are
//! registered at runtime by the training loop and live in `bactid-store`.

use std::collections::BTreeMap;

use crate::{observation::ObservationSet, range::TempRange, MULTI_SEPARATOR, UNKNOWN};

/// The shared Positive/Negative/Variable result enumeration.
pub const POS_NEG_VAR: &[&str] = &["Positive", "Negative", "Variable"];

const SHAPES: &[&str] = &["Cocci", "Rods", "Bacilli", "Spiral", "Short Rods"];
const HAEMOLYSIS_TYPES: &[&str] = &["None", "Alpha", "Beta", "Gamma"];

/// How a field's values are typed and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single value from a closed set.
    Enum { allowed: &'static [&'static str] },
    /// Semicolon-separated values; `allowed: None` means an open set
    /// (colony morphology, media).
    MultiEnum {
        allowed: Option<&'static [&'static str]>,
    },
    /// Inclusive numeric range `low..high` (°C).
    Range,
    /// Free text.
    Text,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMeta {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn enum_field(name: &'static str) -> FieldMeta {
    FieldMeta {
        name,
        kind: FieldKind::Enum {
            allowed: POS_NEG_VAR,
        },
        required: false,
    }
}

static FIELDS: &[FieldMeta] = &[
    // Identifiers
    FieldMeta {
        name: "Genus",
        kind: FieldKind::Text,
        required: true,
    },
    FieldMeta {
        name: "Species",
        kind: FieldKind::Text,
        required: false,
    },
    // Morphology & basic traits
    enum_field("Gram Stain"),
    FieldMeta {
        name: "Shape",
        kind: FieldKind::Enum { allowed: SHAPES },
        required: false,
    },
    FieldMeta {
        name: "Colony Morphology",
        kind: FieldKind::MultiEnum { allowed: None },
        required: false,
    },
    enum_field("Haemolysis"),
    FieldMeta {
        name: "Haemolysis Type",
        kind: FieldKind::MultiEnum {
            allowed: Some(HAEMOLYSIS_TYPES),
        },
        required: false,
    },
    enum_field("Motility"),
    enum_field("Capsule"),
    enum_field("Spore Formation"),
    // Physiology / growth
    FieldMeta {
        name: "Growth Temperature",
        kind: FieldKind::Range,
        required: false,
    },
    FieldMeta {
        name: "Oxygen Requirement",
        kind: FieldKind::Text,
        required: false,
    },
    FieldMeta {
        name: "Media Grown On",
        kind: FieldKind::MultiEnum { allowed: None },
        required: false,
    },
    // Enzymes & core biochemistry
    enum_field("Catalase"),
    enum_field("Oxidase"),
    enum_field("Indole"),
    enum_field("Urease"),
    enum_field("Citrate"),
    enum_field("Methyl Red"),
    enum_field("VP"),
    enum_field("H2S"),
    enum_field("DNase"),
    enum_field("ONPG"),
    enum_field("Coagulase"),
    enum_field("Lipase Test"),
    enum_field("Nitrate Reduction"),
    // Salt tolerance (explicit >=6% rule)
    enum_field("NaCl Tolerant (>=6%)"),
    // Decarboxylases / dihydrolase
    enum_field("Lysine Decarboxylase"),
    enum_field("Ornithine Decarboxylase"),
    enum_field("Arginine Dihydrolase"),
    // Hydrolyses
    enum_field("Gelatin Hydrolysis"),
    enum_field("Esculin Hydrolysis"),
    // Carbohydrate fermentations
    enum_field("Glucose Fermentation"),
    enum_field("Lactose Fermentation"),
    enum_field("Sucrose Fermentation"),
    enum_field("Mannitol Fermentation"),
    enum_field("Sorbitol Fermentation"),
    enum_field("Maltose Fermentation"),
    enum_field("Xylose Fermentation"),
    enum_field("Rhamnose Fermentation"),
    enum_field("Arabinose Fermentation"),
    enum_field("Raffinose Fermentation"),
    enum_field("Trehalose Fermentation"),
    enum_field("Inositol Fermentation"),
    // Notes
    FieldMeta {
        name: "Extra Notes",
        kind: FieldKind::Text,
        required: false,
    },
];

/// Fields that identify a profile rather than describe a test result.
pub const IDENTIFIER_FIELDS: &[&str] = &["Genus", "Species"];

/// Accessors over the built-in core field table.
pub struct CoreSchema;

impl CoreSchema {
    /// All fields, in canonical display order.
    pub fn fields() -> impl Iterator<Item = &'static FieldMeta> {
        FIELDS.iter()
    }

    /// Look up a field by exact name.
    pub fn field(name: &str) -> Option<&'static FieldMeta> {
        FIELDS.iter().find(|f| f.name == name)
    }

    /// Look up a field by name, ignoring case.
    pub fn field_ignore_case(name: &str) -> Option<&'static FieldMeta> {
        FIELDS.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn contains(name: &str) -> bool {
        Self::field(name).is_some()
    }

    pub fn is_identifier(name: &str) -> bool {
        IDENTIFIER_FIELDS.contains(&name)
    }

    pub fn field_names() -> impl Iterator<Item = &'static str> {
        FIELDS.iter().map(|f| f.name)
    }
}

/// A single validation finding for one field of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

/// Standardize capitalization and map spelling variants onto canonical enum
/// labels. `Unknown` passes through unchanged; values the schema cannot place
/// are returned as-is for the validator to flag.
pub fn normalize_value(field: &str, raw: &str) -> String {
    let v = raw.trim();
    if v.is_empty() || v.eq_ignore_ascii_case(UNKNOWN) {
        return UNKNOWN.to_string();
    }

    let Some(meta) = CoreSchema::field(field) else {
        return v.to_string();
    };

    match meta.kind {
        FieldKind::Enum { allowed } => {
            if let Some(hit) = allowed.iter().find(|a| a.eq_ignore_ascii_case(v)) {
                return hit.to_string();
            }
            match v.to_ascii_lowercase().as_str() {
                "+" | "pos" | "positive" if allowed.contains(&"Positive") => "Positive".into(),
                "-" | "neg" | "negative" if allowed.contains(&"Negative") => "Negative".into(),
                "v" | "var" | "variable" if allowed.contains(&"Variable") => "Variable".into(),
                _ => v.to_string(),
            }
        }
        FieldKind::MultiEnum { allowed } => {
            let parts: Vec<String> = v
                .split(MULTI_SEPARATOR)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| match allowed {
                    Some(set) => set
                        .iter()
                        .find(|a| a.eq_ignore_ascii_case(p))
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| p.to_string()),
                    None => p.to_string(),
                })
                .collect();
            if parts.is_empty() {
                UNKNOWN.to_string()
            } else {
                parts.join(" ; ")
            }
        }
        // Detailed bounds checks happen in validate_record.
        FieldKind::Range => v.replace(' ', ""),
        FieldKind::Text => v.to_string(),
    }
}

/// Validate a field → value record against the core schema. `Unknown` is
/// always allowed; unknown fields are ignored here (the training loop owns
/// those via proposals).
pub fn validate_record(record: &BTreeMap<String, String>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for meta in CoreSchema::fields() {
        let Some(value) = record.get(meta.name) else {
            continue;
        };
        if value == UNKNOWN {
            continue;
        }

        match meta.kind {
            FieldKind::Enum { allowed } => {
                if !allowed.contains(&value.as_str()) {
                    issues.push(ValidationIssue {
                        field: meta.name.to_string(),
                        message: format!("'{value}' not in {allowed:?} or Unknown"),
                    });
                }
            }
            FieldKind::MultiEnum {
                allowed: Some(allowed),
            } => {
                let bad: Vec<&str> = value
                    .split(MULTI_SEPARATOR)
                    .map(str::trim)
                    .filter(|p| !p.is_empty() && !allowed.contains(p))
                    .collect();
                if !bad.is_empty() {
                    issues.push(ValidationIssue {
                        field: meta.name.to_string(),
                        message: format!("invalid values {bad:?}; allowed {allowed:?}"),
                    });
                }
            }
            FieldKind::Range => match TempRange::parse(value) {
                Some(range) if range.low > range.high => issues.push(ValidationIssue {
                    field: meta.name.to_string(),
                    message: format!("low {} > high {}", range.low, range.high),
                }),
                Some(_) => {}
                None => issues.push(ValidationIssue {
                    field: meta.name.to_string(),
                    message: format!("expected 'low..high' got '{value}'"),
                }),
            },
            FieldKind::MultiEnum { allowed: None } | FieldKind::Text => {}
        }
    }

    issues
}

/// Default record: empty identifiers, `Unknown` everywhere else.
pub fn empty_record() -> ObservationSet {
    let mut obs = ObservationSet::new();
    for meta in CoreSchema::fields() {
        if CoreSchema::is_identifier(meta.name) {
            obs.set(meta.name, "");
        } else {
            obs.set(meta.name, UNKNOWN);
        }
    }
    obs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_has_identifiers_first() {
        let names: Vec<&str> = CoreSchema::field_names().collect();
        assert_eq!(&names[..2], &["Genus", "Species"]);
        assert!(names.contains(&"Gram Stain"));
        assert!(names.contains(&"Inositol Fermentation"));
    }

    #[test]
    fn normalize_maps_shorthand_onto_canonical_labels() {
        assert_eq!(normalize_value("Catalase", "+"), "Positive");
        assert_eq!(normalize_value("Catalase", "neg"), "Negative");
        assert_eq!(normalize_value("Catalase", "VARIABLE"), "Variable");
        assert_eq!(normalize_value("Catalase", ""), UNKNOWN);
        assert_eq!(normalize_value("Catalase", "unknown"), UNKNOWN);
    }

    #[test]
    fn normalize_multienum_canonicalizes_known_labels() {
        assert_eq!(
            normalize_value("Haemolysis Type", "beta; ALPHA"),
            "Beta ; Alpha"
        );
        // Open sets keep free text.
        assert_eq!(
            normalize_value("Media Grown On", "Blood Agar; MacConkey Agar"),
            "Blood Agar ; MacConkey Agar"
        );
    }

    #[test]
    fn validate_flags_disallowed_enum_value() {
        let mut rec = BTreeMap::new();
        rec.insert("Catalase".to_string(), "Sometimes".to_string());
        let issues = validate_record(&rec);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "Catalase");
    }

    #[test]
    fn validate_checks_range_bounds() {
        let mut rec = BTreeMap::new();
        rec.insert("Growth Temperature".to_string(), "40..20".to_string());
        assert_eq!(validate_record(&rec).len(), 1);

        rec.insert("Growth Temperature".to_string(), "20..40".to_string());
        assert!(validate_record(&rec).is_empty());

        rec.insert("Growth Temperature".to_string(), "warmish".to_string());
        assert_eq!(validate_record(&rec).len(), 1);
    }

    #[test]
    fn empty_record_is_unknown_except_identifiers() {
        let rec = empty_record();
        assert_eq!(rec.get("Genus"), "");
        assert_eq!(rec.get("Catalase"), UNKNOWN);
    }
}
