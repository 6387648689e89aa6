//! Extended-test reasoner: naive categorical likelihood fusion over the
//! learned signals catalog.
//!
//! For each genus, the log-likelihood of the observed extended results is
//! accumulated under an independence assumption, with Laplace (additive)
//! smoothing so unseen categories never zero out a genus. The per-genus
//! log-sums are normalized into a probability distribution with a
//! numerically stable softmax.

use std::collections::BTreeMap;

use bactid_schema::CategoricalValue;
use bactid_store::SignalsCatalog;

/// Floor for probabilities before taking logs.
const LOG_GUARD: f64 = 1e-12;

/// Per-genus normalized likelihoods plus a short explanation of the leading
/// contributions.
#[derive(Debug, Clone, Default)]
pub struct ExtendedScores {
    /// `(genus, probability)` sorted descending; probabilities sum to 1 over
    /// all catalog genera.
    pub ranked: Vec<(String, f64)>,
    pub explanation: String,
}

impl ExtendedScores {
    fn empty(message: &str) -> Self {
        Self {
            ranked: Vec::new(),
            explanation: message.to_string(),
        }
    }

    pub fn probability(&self, genus: &str) -> Option<f64> {
        self.ranked
            .iter()
            .find(|(g, _)| g == genus)
            .map(|(_, p)| *p)
    }
}

/// Score every genus in the catalog against the supplied extended results.
///
/// An unseen (genus, test) pair contributes the uniform `alpha / 3·alpha`
/// prior (exactly 1/3 at the default `alpha` = 1.0); a seen pair contributes
/// `(count + alpha) / (n + 3·alpha)`. Empty input or an empty catalog yields
/// an empty ranking with an explanatory message rather than an error.
pub fn score_extended(
    catalog: &SignalsCatalog,
    observed: &BTreeMap<String, CategoricalValue>,
    alpha: f64,
) -> ExtendedScores {
    if observed.is_empty() || catalog.is_empty() {
        return ExtendedScores::empty("No extended tests or signals available.");
    }

    let genera: Vec<&str> = catalog.genera().collect();
    let mut log_sums: BTreeMap<&str, f64> = genera.iter().map(|g| (*g, 0.0)).collect();
    let mut contributions: BTreeMap<&str, Vec<String>> =
        genera.iter().map(|g| (*g, Vec::new())).collect();

    for (test, value) in observed {
        for genus in &genera {
            let prob = match catalog.counts(genus, test) {
                Some(counts) if counts.n > 0 => {
                    (counts.count(*value) as f64 + alpha) / (counts.n as f64 + 3.0 * alpha)
                }
                // Unseen test for this genus: uniform prior.
                _ => alpha / (3.0 * alpha),
            };
            if let Some(sum) = log_sums.get_mut(genus) {
                *sum += prob.max(LOG_GUARD).ln();
            }
            if let Some(terms) = contributions.get_mut(genus) {
                terms.push(format!("{test}={value}\u{2192}{prob:.3}"));
            }
        }
    }

    // Numerically stable softmax over the accumulated log-sums.
    let max_log = log_sums.values().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: BTreeMap<&str, f64> = log_sums
        .iter()
        .map(|(g, s)| (*g, (s - max_log).exp()))
        .collect();
    let z: f64 = exp.values().sum();

    let mut ranked: Vec<(String, f64)> = exp
        .iter()
        .map(|(g, e)| (g.to_string(), if z > 0.0 { e / z } else { 0.0 }))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let explanation = explain(&ranked, &contributions);
    ExtendedScores {
        ranked,
        explanation,
    }
}

fn explain(ranked: &[(String, f64)], contributions: &BTreeMap<&str, Vec<String>>) -> String {
    let rows: Vec<String> = ranked
        .iter()
        .take(5)
        .map(|(genus, p)| {
            let terms = contributions
                .get(genus.as_str())
                .map(|c| c.iter().take(3).cloned().collect::<Vec<_>>().join("; "))
                .unwrap_or_default();
            format!("{genus}: {p:.3}  |  {terms}")
        })
        .collect();
    if rows.is_empty() {
        "No contributions.".to_string()
    } else {
        format!("Extended-test likelihoods (top 5):\n{}", rows.join("\n"))
    }
}
