//! Lexical-overlap metrics: ROUGE-N, ROUGE-L and smoothed sentence BLEU
//!
//! Scores track the reference `rouge_score` and NLTK scorers closely but not bit for bit:
//!
//! - ROUGE stems with the Snowball English (Porter2) stemmer from
//!   `rust-stemmers`, while `rouge_score` uses NLTK's original Porter
//!   stemmer. The two disagree on a few suffixes (`generously` becomes
//!   `generous` vs `gener`), so ROUGE on such words can differ slightly.
//! - BLEU tokens come from Unicode word bounds plus a Treebank-style split
//!   of English contractions (`don't` becomes `do` `n't`). Other Treebank
//!   rules, such as splitting quotes or tokens like `U.S.`, are not applied.

use std::collections::HashMap;
use std::hash::Hash;

use rust_stemmers::{Algorithm, Stemmer};
use unicode_segmentation::UnicodeSegmentation;

/// Tokens longer than this many characters are stemmed for ROUGE
const MIN_STEM_LEN: usize = 3;

/// Smoothing epsilon for zero-count n-gram precisions
const BLEU_EPSILON: f64 = 0.1;

/// Highest n-gram order for BLEU, weighted uniformly
const BLEU_MAX_ORDER: usize = 4;

/// Precision, recall and F1 of one ROUGE variant
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RougeScore {
    /// Overlap over candidate size
    pub precision: f64,
    /// Overlap over reference size
    pub recall: f64,
    /// Harmonic mean of precision and recall
    pub fmeasure: f64,
}

impl RougeScore {
    fn from_overlap(overlap: usize, candidate_len: usize, reference_len: usize) -> Self {
        let precision = overlap as f64 / candidate_len.max(1) as f64;
        let recall = overlap as f64 / reference_len.max(1) as f64;
        let fmeasure = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            fmeasure,
        }
    }
}

/// Lower-cases, splits on non-alphanumerics and stems long tokens
pub struct RougeTokenizer {
    stemmer: Stemmer,
}

impl Default for RougeTokenizer {
    fn default() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }
}

impl RougeTokenizer {
    /// Tokenize text for ROUGE scoring
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(|token| {
                if token.chars().count() > MIN_STEM_LEN {
                    self.stemmer.stem(token).into_owned()
                } else {
                    token.to_string()
                }
            })
            .collect()
    }
}

/// Clitics split off a word token, longest first
const CONTRACTION_SUFFIXES: &[&str] = &["n't", "'re", "'ve", "'ll", "'s", "'d", "'m"];

/// Lower-cased word tokens for BLEU; punctuation is kept as separate tokens
pub fn bleu_tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut tokens = Vec::new();
    for token in lower.split_word_bounds().filter(|token| !token.trim().is_empty()) {
        match split_contraction(token) {
            Some((stem, clitic)) => {
                tokens.push(stem.to_string());
                tokens.push(clitic.to_string());
            }
            None => tokens.push(token.to_string()),
        }
    }
    tokens
}

/// `don't` -> (`do`, `n't`), `it's` -> (`it`, `'s`)
fn split_contraction(token: &str) -> Option<(&str, &str)> {
    CONTRACTION_SUFFIXES.iter().find_map(|suffix| {
        let stem = token.strip_suffix(suffix)?;
        (!stem.is_empty()).then(|| token.split_at(stem.len()))
    })
}

fn ngram_counts<T: Eq + Hash>(tokens: &[T], n: usize) -> HashMap<&[T], usize> {
    let mut counts = HashMap::new();
    if n == 0 {
        return counts;
    }
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// Sum over n-grams of min(candidate count, reference count)
fn clipped_overlap<T: Eq + Hash>(candidate: &[T], reference: &[T], n: usize) -> usize {
    let reference_counts = ngram_counts(reference, n);
    ngram_counts(candidate, n)
        .into_iter()
        .map(|(gram, count)| count.min(reference_counts.get(gram).copied().unwrap_or(0)))
        .sum()
}

/// ROUGE-N of `candidate` against `reference`
pub fn rouge_n(candidate: &[String], reference: &[String], n: usize) -> RougeScore {
    let overlap = clipped_overlap(candidate, reference, n);
    let candidate_len = candidate.len().saturating_sub(n.saturating_sub(1));
    let reference_len = reference.len().saturating_sub(n.saturating_sub(1));
    RougeScore::from_overlap(overlap, candidate_len, reference_len)
}

/// ROUGE-L (longest common subsequence) of `candidate` against `reference`
pub fn rouge_l(candidate: &[String], reference: &[String]) -> RougeScore {
    if candidate.is_empty() || reference.is_empty() {
        return RougeScore::default();
    }
    let lcs = lcs_len(candidate, reference);
    RougeScore::from_overlap(lcs, candidate.len(), reference.len())
}

fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            current[j + 1] = if x == y {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Sentence BLEU with one reference, uniform 1-4 gram weights and epsilon smoothing
pub fn sentence_bleu(candidate: &[String], reference: &[String]) -> f64 {
    let hyp_len = candidate.len();
    let ref_len = reference.len();

    let mut log_sum = 0.0;
    for n in 1..=BLEU_MAX_ORDER {
        let numerator = clipped_overlap(candidate, reference, n);
        let denominator = hyp_len.saturating_sub(n - 1).max(1);

        if n == 1 && numerator == 0 {
            return 0.0;
        }

        let precision = if numerator == 0 {
            BLEU_EPSILON / denominator as f64
        } else {
            numerator as f64 / denominator as f64
        };
        log_sum += precision.ln() / BLEU_MAX_ORDER as f64;
    }

    brevity_penalty(ref_len, hyp_len) * log_sum.exp()
}

fn brevity_penalty(ref_len: usize, hyp_len: usize) -> f64 {
    if hyp_len > ref_len {
        1.0
    } else if hyp_len == 0 {
        0.0
    } else {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    }
}
