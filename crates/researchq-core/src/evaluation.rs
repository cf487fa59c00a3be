//! Retrieval quality metrics: MRR, precision@k and recall@k

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Default cutoffs for precision and recall
pub const DEFAULT_K_VALUES: &[usize] = &[1, 3, 5, 10];

/// One judged query: what was retrieved, in order, and what is relevant
#[derive(Debug, Clone, Default)]
pub struct EvaluationRun {
    pub query: String,
    pub retrieved_ids: Vec<String>,
    pub relevant_ids: HashSet<String>,
}

impl EvaluationRun {
    pub fn new<R, S>(query: impl Into<String>, retrieved: R, relevant: S) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            query: query.into(),
            retrieved_ids: retrieved.into_iter().map(Into::into).collect(),
            relevant_ids: relevant.into_iter().map(Into::into).collect(),
        }
    }
}

/// Mean metrics over all judged queries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Queries that had at least one relevant id
    pub queries: usize,
    pub mrr: f64,
    pub precision_at: BTreeMap<usize, f64>,
    pub recall_at: BTreeMap<usize, f64>,
}

/// Average MRR, precision@k and recall@k.
///
/// Runs without relevant ids are skipped; with nothing to judge every metric
/// is zero.
pub fn evaluate(runs: &[EvaluationRun], k_values: &[usize]) -> EvaluationReport {
    let judged: Vec<&EvaluationRun> = runs.iter().filter(|r| !r.relevant_ids.is_empty()).collect();
    let k_values: Vec<usize> = k_values.iter().copied().filter(|&k| k > 0).collect();

    let mut report = EvaluationReport {
        queries: judged.len(),
        precision_at: k_values.iter().map(|&k| (k, 0.0)).collect(),
        recall_at: k_values.iter().map(|&k| (k, 0.0)).collect(),
        ..Default::default()
    };
    if judged.is_empty() {
        return report;
    }

    for run in &judged {
        report.mrr += reciprocal_rank(run);
        for &k in &k_values {
            let hits = hits_at(run, k) as f64;
            *report.precision_at.entry(k).or_insert(0.0) += hits / k as f64;
            *report.recall_at.entry(k).or_insert(0.0) += hits / run.relevant_ids.len() as f64;
        }
    }

    let n = judged.len() as f64;
    report.mrr /= n;
    for value in report.precision_at.values_mut().chain(report.recall_at.values_mut()) {
        *value /= n;
    }
    report
}

fn reciprocal_rank(run: &EvaluationRun) -> f64 {
    run.retrieved_ids
        .iter()
        .position(|id| run.relevant_ids.contains(id))
        .map_or(0.0, |i| 1.0 / (i + 1) as f64)
}

fn hits_at(run: &EvaluationRun, k: usize) -> usize {
    let top: HashSet<&String> = run.retrieved_ids.iter().take(k).collect();
    top.into_iter().filter(|id| run.relevant_ids.contains(*id)).count()
}
