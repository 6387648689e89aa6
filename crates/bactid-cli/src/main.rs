//! BactID CLI
//!
//! Command-line interface for:
//! - Ranking genera against a JSON observation set (`identify`)
//! - Scoring a labeled-case corpus and logging proposals (`evaluate`)
//! - Folding proposals and corpus evidence into the learned artifacts
//!   (`train`)
//! - Inspecting the learned knowledge base (`artifacts show`)
//!
//! All state lives under one data directory: `reference.json` (the canonical
//! genus profiles), the three learned-artifact documents, the proposal log,
//! and evaluation reports under `reports/`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use bactid_engine::{EngineConfig, Identifier};
use bactid_schema::ObservationSet;
use bactid_store::{ArtifactRepository, ProposalSink, ReferenceStore};
use bactid_training::{evaluate, load_corpus, write_report, MappingParser, Trainer};

#[derive(Parser)]
#[command(name = "bactid")]
#[command(
    author,
    version,
    about = "BactID: bacterial genus identification from laboratory observations"
)]
struct Cli {
    /// Data directory holding reference.json, the learned artifacts, the
    /// proposal log, and reports/.
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank genera against an observation set (JSON field → value map).
    Identify {
        /// Observations JSON file
        #[arg(long)]
        observations: PathBuf,
        /// Seed for presentation-only choices (phrasing, suggestion order)
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Emit the full ranked candidates as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Score a labeled-case corpus; unexplained observations become
    /// proposals and the report lands under reports/.
    Evaluate {
        /// Corpus JSON file (array of labeled cases)
        #[arg(long)]
        corpus: PathBuf,
        /// Label recorded in the report (e.g. rules, fused)
        #[arg(long, default_value = "rules")]
        mode: String,
    },

    /// Fold the proposal log and corpus evidence into the learned
    /// artifacts, under the exclusive training lock. Schema and alias
    /// merges are idempotent; evidence counts grow on every run.
    Train {
        /// Corpus JSON file (array of labeled cases)
        #[arg(long)]
        corpus: PathBuf,
        /// Clear the proposal log after a successful pass
        #[arg(long)]
        clear_proposals: bool,
    },

    /// Inspect the learned knowledge base.
    Artifacts {
        #[command(subcommand)]
        command: ArtifactsCommands,
    },
}

#[derive(Subcommand)]
enum ArtifactsCommands {
    /// Summarize the extended-schema registry, alias map, and signals
    /// catalog.
    Show,
}

fn proposal_log(data_dir: &Path) -> ProposalSink {
    ProposalSink::new(&data_dir.join("extended_proposals.jsonl"))
}

fn cmd_identify(data_dir: &Path, observations: &Path, seed: u64, json: bool) -> Result<()> {
    let reference = ReferenceStore::load(&data_dir.join("reference.json"))
        .context("loading reference table")?;
    let artifacts = ArtifactRepository::new(data_dir).load();

    let text = fs::read_to_string(observations)
        .with_context(|| format!("reading observations from {}", observations.display()))?;
    let observations: ObservationSet =
        serde_json::from_str(&text).context("parsing observations JSON")?;

    let config = EngineConfig {
        narrative_seed: seed,
        ..EngineConfig::default()
    };
    let identifier = Identifier::with_config(&reference, &artifacts, config);
    let candidates = identifier.identify(&observations);

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    if candidates.is_empty() {
        println!(
            "{} no candidate survived the morphological exclusions",
            "no match:".yellow().bold()
        );
        return Ok(());
    }

    let weights = identifier.config().blend;
    for (rank, candidate) in candidates.iter().enumerate() {
        let blended = candidate.blended_percent(weights);
        println!(
            "{} {} {}",
            format!("{}.", rank + 1).bold(),
            candidate.genus.green().bold(),
            format!("({blended}% blended)").bold()
        );
        println!(
            "   core {}%  true {}%  score {}  ({}/{} fields evaluated)",
            candidate.core_percent(),
            candidate.true_percent(),
            candidate.total_score,
            candidate.fields_evaluated,
            candidate.fields_possible
        );
        if !candidate.matched_fields.is_empty() {
            println!(
                "   {} {}",
                "matched:".green(),
                candidate.matched_fields.join(", ")
            );
        }
        if !candidate.mismatched_fields.is_empty() {
            println!(
                "   {} {}",
                "mismatched:".red(),
                candidate.mismatched_fields.join(", ")
            );
        }
        if let Some(likelihood) = candidate.extended_likelihood {
            println!("   {} {likelihood:.3}", "extended likelihood:".cyan());
        }
        if !candidate.next_tests.is_empty() {
            println!(
                "   {} {}",
                "suggested next tests:".cyan(),
                candidate.next_tests.join(", ")
            );
        }
        if !candidate.narrative.is_empty() {
            println!("   {}", candidate.narrative);
        }
    }
    if let Some(top) = candidates.first() {
        if !top.extended_explanation.is_empty() {
            println!("\n{}", top.extended_explanation);
        }
    }
    Ok(())
}

fn cmd_evaluate(data_dir: &Path, corpus_path: &Path, mode: &str) -> Result<()> {
    let corpus = load_corpus(corpus_path)
        .with_context(|| format!("loading corpus from {}", corpus_path.display()))?;
    let sink = proposal_log(data_dir);

    // Concrete text parsers are external collaborators; the built-in
    // evaluation covers corpora that carry pre-parsed observations.
    let parser = MappingParser::new(BTreeMap::new());
    let report = evaluate(&corpus, &parser, &sink, mode).context("running evaluation pass")?;
    let report_path =
        write_report(&report, &data_dir.join("reports")).context("writing report")?;

    println!(
        "{} {} cases ({} skipped), micro accuracy {:.1}%",
        "evaluated".green().bold(),
        report.num_cases,
        report.cases_skipped,
        report.micro_accuracy * 100.0
    );
    for metric in &report.per_field {
        println!(
            "   {:<28} accuracy {:>5.1}%  coverage {:>5.1}%  (n={})",
            metric.field,
            metric.accuracy * 100.0,
            metric.coverage * 100.0,
            metric.n
        );
    }
    if !report.case_issues.is_empty() {
        println!("{}", "corpus issues:".yellow().bold());
        for issue in &report.case_issues {
            println!("   {}: {}", issue.case, issue.message);
        }
    }
    let proposals = report.unknown_fields.len()
        + report.unknown_values.len()
        + report.expected_unknown_fields.len();
    if proposals > 0 {
        println!(
            "{} {} distinct unexplained observations logged to {}",
            "proposals:".yellow().bold(),
            proposals,
            sink.path().display()
        );
    }
    println!("{} {}", "wrote".green().bold(), report_path.display());
    Ok(())
}

fn cmd_train(data_dir: &Path, corpus_path: &Path, clear_proposals: bool) -> Result<()> {
    let corpus = load_corpus(corpus_path)
        .with_context(|| format!("loading corpus from {}", corpus_path.display()))?;
    let repository = ArtifactRepository::new(data_dir);
    let sink = proposal_log(data_dir);

    let summary = Trainer::new(&repository)
        .train(&corpus, &sink)
        .context("running training pass")?;
    if clear_proposals {
        sink.clear().context("clearing proposal log")?;
    }

    println!(
        "{} {} proposals scanned, {} evidence observations recorded",
        "trained".green().bold(),
        summary.proposals_scanned,
        summary.evidence_recorded
    );
    if summary.new_fields.is_empty() {
        println!("   no new extended fields");
    } else {
        println!(
            "   {} {}",
            "new extended fields:".cyan(),
            summary.new_fields.join(", ")
        );
    }
    if summary.aliases_added > 0 {
        println!("   {} {}", "aliases added:".cyan(), summary.aliases_added);
    }
    Ok(())
}

fn cmd_artifacts_show(data_dir: &Path) -> Result<()> {
    let repository = ArtifactRepository::new(data_dir);
    let artifacts = repository.load();

    println!(
        "{} {} extended fields",
        "registry:".bold(),
        artifacts.registry.len()
    );
    for field in artifacts.registry.field_names() {
        if let Some(meta) = artifacts.registry.get(field) {
            let aliases = if meta.aliases.is_empty() {
                String::new()
            } else {
                format!("  (aliases: {})", meta.aliases.join(", "))
            };
            println!("   {field}{aliases}");
        }
    }

    println!(
        "{} {} field aliases, {} value aliases",
        "aliases:".bold(),
        artifacts.aliases.field_aliases.len(),
        artifacts.aliases.value_aliases.len()
    );
    for (alias, canonical) in &artifacts.aliases.field_aliases {
        println!("   {alias} -> {canonical}");
    }

    println!(
        "{} {} genera with evidence",
        "signals:".bold(),
        artifacts.signals.len()
    );
    for genus in artifacts.signals.genera() {
        println!("   {}", genus.green());
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Identify {
            observations,
            seed,
            json,
        } => cmd_identify(&cli.data_dir, &observations, seed, json),
        Commands::Evaluate { corpus, mode } => cmd_evaluate(&cli.data_dir, &corpus, &mode),
        Commands::Train {
            corpus,
            clear_proposals,
        } => cmd_train(&cli.data_dir, &corpus, clear_proposals),
        Commands::Artifacts { command } => match command {
            ArtifactsCommands::Show => cmd_artifacts_show(&cli.data_dir),
        },
    }
}
