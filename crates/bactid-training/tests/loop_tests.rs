//! End-to-end loop over a tempdir: evaluate a labeled corpus, train on the
//! resulting proposals, then confirm the identification engine consumes the
//! learned signals.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bactid_engine::Identifier;
use bactid_schema::ObservationSet;
use bactid_store::{ArtifactRepository, ProposalKind, ProposalSink, ReferenceStore};
use bactid_training::{evaluate, LabeledCase, MappingParser, Trainer};

fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn case(name: &str, genus: &str, fields: &[(&str, &str)]) -> LabeledCase {
    LabeledCase {
        name: name.to_string(),
        genus: Some(genus.to_string()),
        input: None,
        observations: Some(map(fields)),
        expected: map(fields),
    }
}

fn write_reference(dir: &Path) -> ReferenceStore {
    // Two genera with identical core profiles, so only learned extended
    // evidence can separate them.
    let profile = map(&[("Gram Stain", "Positive"), ("Catalase", "Negative")]);
    let table = BTreeMap::from([
        ("Enterococcus".to_string(), profile.clone()),
        ("Streptococcus".to_string(), profile),
    ]);
    let path = dir.join("reference.json");
    fs::write(&path, serde_json::to_string(&table).unwrap()).unwrap();
    ReferenceStore::load(&path).unwrap()
}

#[test]
fn evaluate_train_identify_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let repository = ArtifactRepository::new(dir.path());
    let sink = ProposalSink::new(&dir.path().join("extended_proposals.jsonl"));

    let corpus = vec![
        case("Enterococcus faecalis 1", "Enterococcus", &[("Bile Esculin", "Positive")]),
        case("Enterococcus faecalis 2", "Enterococcus", &[("Bile Esculin", "Positive")]),
        case("Streptococcus pyogenes 1", "Streptococcus", &[("Bile Esculin", "Negative")]),
        case("Streptococcus pyogenes 2", "Streptococcus", &[("Bile Esculin", "Negative")]),
    ];

    // Evaluation flags Bile Esculin as unexplained on both sides.
    let parser = MappingParser::new(BTreeMap::new());
    let report = evaluate(&corpus, &parser, &sink, "rules").unwrap();
    assert_eq!(report.cases_skipped, 0);
    assert_eq!(report.unknown_fields.get("Bile Esculin"), Some(&4));

    let proposals = sink.read_all().unwrap();
    assert!(proposals
        .iter()
        .any(|p| p.kind == ProposalKind::UnknownField && p.field == "Bile Esculin"));

    // Training folds the proposals and the per-genus evidence in.
    let summary = Trainer::new(&repository).train(&corpus, &sink).unwrap();
    assert_eq!(summary.new_fields, vec!["Bile Esculin".to_string()]);
    assert_eq!(summary.evidence_recorded, 4);

    let artifacts = repository.load();
    assert_eq!(
        artifacts
            .signals
            .counts("Enterococcus", "Bile Esculin")
            .unwrap()
            .positive,
        2
    );

    // The engine now separates two core-identical genera on the learned
    // signal alone.
    let reference = write_reference(dir.path());
    let observations: ObservationSet = serde_json::from_value(serde_json::json!({
        "Gram Stain": "Positive",
        "Catalase": "Negative",
        "Bile Esculin": "Positive",
    }))
    .unwrap();

    let identifier = Identifier::new(&reference, &artifacts);
    let candidates = identifier.identify(&observations);
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].genus, "Enterococcus");
    assert_eq!(candidates[0].total_score, candidates[1].total_score);

    let top = candidates[0].extended_likelihood.unwrap();
    let runner_up = candidates[1].extended_likelihood.unwrap();
    assert!(top > runner_up);
}

#[test]
fn training_twice_keeps_the_knowledge_base_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let repository = ArtifactRepository::new(dir.path());
    let sink = ProposalSink::new(&dir.path().join("extended_proposals.jsonl"));

    let corpus = vec![case(
        "Listeria monocytogenes 1",
        "Listeria",
        &[("CAMP Test", "Positive")],
    )];

    let parser = MappingParser::new(BTreeMap::new());
    evaluate(&corpus, &parser, &sink, "rules").unwrap();
    let trainer = Trainer::new(&repository);
    trainer.train(&corpus, &sink).unwrap();
    sink.clear().unwrap();
    evaluate(&corpus, &parser, &sink, "rules").unwrap();
    trainer.train(&corpus, &sink).unwrap();

    let artifacts = repository.load();
    assert_eq!(artifacts.registry.len(), 1);
    let counts = artifacts.signals.counts("Listeria", "CAMP Test").unwrap();
    assert_eq!(counts.positive, 2);
    assert_eq!(counts.n, 2);
}
