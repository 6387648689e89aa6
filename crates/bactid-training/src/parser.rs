//! Text-extraction capability interface.
//!
//! The actual parsers (rule-based, extended-pattern, model-based) are
//! external collaborators; this module defines the contract they satisfy and
//! the deterministic precedence fusion that merges their outputs per field:
//! extended > rules > model > Unknown.

use std::collections::BTreeMap;

use bactid_schema::UNKNOWN;

/// Which strategy produced a field mapping; doubles as fusion precedence
/// (lower rank wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParserSource {
    Extended,
    Rules,
    Model,
    Fused,
}

/// The uniform output contract: a field → value mapping plus a source tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub fields: BTreeMap<String, String>,
    pub source: ParserSource,
}

impl ParseOutcome {
    pub fn new(source: ParserSource) -> Self {
        Self {
            fields: BTreeMap::new(),
            source,
        }
    }
}

/// One text-to-field-map extraction strategy.
pub trait TextParser {
    fn parse(&self, text: &str) -> ParseOutcome;
}

/// Trivial parser for corpora that carry pre-parsed observations: ignores
/// the text and returns a fixed mapping.
#[derive(Debug, Clone)]
pub struct MappingParser {
    fields: BTreeMap<String, String>,
}

impl MappingParser {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }
}

impl TextParser for MappingParser {
    fn parse(&self, _text: &str) -> ParseOutcome {
        ParseOutcome {
            fields: self.fields.clone(),
            source: ParserSource::Rules,
        }
    }
}

/// Fusion decorator: runs every inner parser and, per field, keeps the value
/// from the highest-precedence source that produced a real (non-Unknown)
/// result. Entirely deterministic.
pub struct PrecedenceFusion {
    parsers: Vec<(ParserSource, Box<dyn TextParser>)>,
}

impl PrecedenceFusion {
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    pub fn with(mut self, source: ParserSource, parser: Box<dyn TextParser>) -> Self {
        self.parsers.push((source, parser));
        self
    }
}

impl Default for PrecedenceFusion {
    fn default() -> Self {
        Self::new()
    }
}

impl TextParser for PrecedenceFusion {
    fn parse(&self, text: &str) -> ParseOutcome {
        // (precedence, value) per field; replaced only by a strictly
        // higher-precedence real value.
        let mut merged: BTreeMap<String, (ParserSource, String)> = BTreeMap::new();

        for (source, parser) in &self.parsers {
            let outcome = parser.parse(text);
            for (field, value) in outcome.fields {
                if value.trim().is_empty() || value.eq_ignore_ascii_case(UNKNOWN) {
                    continue;
                }
                match merged.get(&field) {
                    Some((existing, _)) if *existing <= *source => {}
                    _ => {
                        merged.insert(field, (*source, value));
                    }
                }
            }
        }

        ParseOutcome {
            fields: merged
                .into_iter()
                .map(|(field, (_, value))| (field, value))
                .collect(),
            source: ParserSource::Fused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn higher_precedence_source_wins_per_field() {
        let fusion = PrecedenceFusion::new()
            .with(
                ParserSource::Model,
                Box::new(MappingParser::new(mapping(&[
                    ("Catalase", "Negative"),
                    ("Oxidase", "Positive"),
                ]))),
            )
            .with(
                ParserSource::Extended,
                Box::new(MappingParser::new(mapping(&[("Catalase", "Positive")]))),
            );

        let out = fusion.parse("ignored");
        assert_eq!(out.fields.get("Catalase").unwrap(), "Positive");
        assert_eq!(out.fields.get("Oxidase").unwrap(), "Positive");
        assert_eq!(out.source, ParserSource::Fused);
    }

    #[test]
    fn unknown_values_never_shadow_real_ones() {
        let fusion = PrecedenceFusion::new()
            .with(
                ParserSource::Rules,
                Box::new(MappingParser::new(mapping(&[("Urease", "Positive")]))),
            )
            .with(
                ParserSource::Extended,
                Box::new(MappingParser::new(mapping(&[("Urease", "Unknown")]))),
            );

        let out = fusion.parse("ignored");
        assert_eq!(out.fields.get("Urease").unwrap(), "Positive");
    }

    #[test]
    fn fusion_is_deterministic() {
        let build = || {
            PrecedenceFusion::new()
                .with(
                    ParserSource::Rules,
                    Box::new(MappingParser::new(mapping(&[
                        ("Catalase", "Positive"),
                        ("Indole", "Negative"),
                    ]))),
                )
                .with(
                    ParserSource::Model,
                    Box::new(MappingParser::new(mapping(&[("Indole", "Positive")]))),
                )
        };
        assert_eq!(build().parse("x"), build().parse("x"));
    }
}
