//! LexRank extractive summarization.
//!
//! Sentences are vertices of a similarity graph (idf-modified cosine over term frequencies),
//! edges keep only pairs above [`SIMILARITY_THRESHOLD`], and the stationary distribution of
//! the degree-normalized graph ranks the sentences.


use anyhow::{Result, bail};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::embeddings::chunking::split_sentences;

pub const DEFAULT_SUMMARY_SENTENCES: usize = 5;

const SIMILARITY_THRESHOLD: f64 = 0.1;
const EPSILON: f64 = 1e-4;
const MAX_ITERATIONS: usize = 1000;

/// Select the `sentence_count` most central sentences of `text`, in their original order
#[inline]
pub fn summarize(text: &str, sentence_count: usize) -> Result<Vec<String>> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        bail!("No sentences to summarize");
    }

    if sentences.len() <= sentence_count {
        return Ok(sentences.into_iter().map(String::from).collect());
    }

    let terms: Vec<Vec<String>> = sentences.iter().map(|s| tokenize(s)).collect();
    let idf = inverse_document_frequency(&terms);
    let tf: Vec<HashMap<&str, f64>> = terms.iter().map(|t| term_frequency(t)).collect();
    let scores = rank(&tf, &idf);

    let selected: HashSet<usize> = scores
        .iter()
        .enumerate()
        .sorted_by(|(_, a), (_, b)| b.total_cmp(a))
        .take(sentence_count)
        .map(|(idx, _)| idx)
        .collect();

    debug!(
        "Selected {} of {} sentences for summary",
        selected.len(),
        sentences.len()
    );

    Ok(sentences
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| selected.contains(idx))
        .map(|(_, sentence)| sentence.to_string())
        .collect())
}

fn tokenize(sentence: &str) -> Vec<String> {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Term counts scaled by the most frequent term of the sentence
fn term_frequency(terms: &[String]) -> HashMap<&str, f64> {
    let counts = terms.iter().map(String::as_str).counts();
    let max = counts.values().copied().max().unwrap_or(1) as f64;

    counts
        .into_iter()
        .map(|(term, count)| (term, count as f64 / max))
        .collect()
}

fn inverse_document_frequency(terms: &[Vec<String>]) -> HashMap<String, f64> {
    let total = terms.len() as f64;
    let mut document_frequency: HashMap<&str, usize> = HashMap::new();

    for sentence in terms {
        for term in sentence.iter().map(String::as_str).unique() {
            *document_frequency.entry(term).or_default() += 1;
        }
    }

    document_frequency
        .into_iter()
        .map(|(term, df)| (term.to_string(), (total / df as f64).ln()))
        .collect()
}

fn idf_modified_cosine(
    a: &HashMap<&str, f64>,
    b: &HashMap<&str, f64>,
    idf: &HashMap<String, f64>,
) -> f64 {
    let weight = |term: &str| idf.get(term).copied().unwrap_or(0.0);

    let numerator: f64 = a
        .iter()
        .filter_map(|(term, tf_a)| {
            b.get(term)
                .map(|tf_b| tf_a * tf_b * weight(term).powi(2))
        })
        .sum();

    let norm = |tf: &HashMap<&str, f64>| -> f64 {
        tf.iter()
            .map(|(term, value)| (value * weight(term)).powi(2))
            .sum::<f64>()
            .sqrt()
    };

    let denominator = norm(a) * norm(b);
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Stationary distribution of the thresholded, degree-normalized similarity graph
fn rank(tf: &[HashMap<&str, f64>], idf: &HashMap<String, f64>) -> Vec<f64> {
    let n = tf.len();

    let adjacency: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j || idf_modified_cosine(&tf[i], &tf[j], idf) > SIMILARITY_THRESHOLD {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect();

    let transition: Vec<Vec<f64>> = adjacency
        .into_iter()
        .map(|row| {
            let degree: f64 = row.iter().sum();
            row.into_iter().map(|edge| edge / degree).collect()
        })
        .collect();

    let mut scores = vec![1.0 / n as f64; n];
    for _ in 0..MAX_ITERATIONS {
        let next: Vec<f64> = (0..n)
            .map(|j| (0..n).map(|i| transition[i][j] * scores[i]).sum())
            .collect();

        let delta = next
            .iter()
            .zip(&scores)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        scores = next;

        if delta < EPSILON {
            break;
        }
    }

    scores
}
