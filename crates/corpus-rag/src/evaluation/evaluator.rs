//! Scoring generated answers against reference answers

use serde::Serialize;

use crate::error::EvaluationError;

use super::metrics::{bleu_tokenize, rouge_l, rouge_n, sentence_bleu, RougeTokenizer};

/// Qualitative band for an average score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rating {
    /// Strong overlap with the references
    Excellent,
    /// Solid overlap
    Good,
    /// Some overlap
    Fair,
    /// Little overlap
    Poor,
}

impl Rating {
    /// Band for an average ROUGE-1 F1
    pub fn for_rouge(score: f64) -> Self {
        Self::band(score, [0.5, 0.3, 0.2])
    }

    /// Band for an average BLEU
    pub fn for_bleu(score: f64) -> Self {
        Self::band(score, [0.4, 0.25, 0.15])
    }

    fn band(score: f64, [excellent, good, fair]: [f64; 3]) -> Self {
        if score >= excellent {
            Self::Excellent
        } else if score >= good {
            Self::Good
        } else if score >= fair {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        };
        f.write_str(label)
    }
}

/// Scores of one response against its ground truth
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PairScores {
    /// ROUGE-1 F1
    pub rouge1: f64,
    /// ROUGE-2 F1
    pub rouge2: f64,
    /// ROUGE-L F1
    pub rouge_l: f64,
    /// Smoothed sentence BLEU
    pub bleu: f64,
}

/// Arithmetic mean of each metric over all pairs
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricAverages {
    /// Mean ROUGE-1 F1
    pub rouge1: f64,
    /// Mean ROUGE-2 F1
    pub rouge2: f64,
    /// Mean ROUGE-L F1
    pub rouge_l: f64,
    /// Mean BLEU
    pub bleu: f64,
}

/// Per-pair and aggregate evaluation scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    /// Scores in input order
    pub per_pair: Vec<PairScores>,
    /// Mean scores
    pub averages: MetricAverages,
    /// Band of the mean ROUGE-1
    pub rouge_rating: Rating,
    /// Band of the mean BLEU
    pub bleu_rating: Rating,
}

/// ROUGE-1/2/L and BLEU evaluator
#[derive(Default)]
pub struct Evaluator {
    tokenizer: RougeTokenizer,
}

impl Evaluator {
    /// Create an evaluator
    pub fn new() -> Self {
        Self::default()
    }

    /// Score one response against one ground truth
    pub fn score_pair(&self, response: &str, ground_truth: &str) -> PairScores {
        let candidate = self.tokenizer.tokenize(response);
        let reference = self.tokenizer.tokenize(ground_truth);

        PairScores {
            rouge1: rouge_n(&candidate, &reference, 1).fmeasure,
            rouge2: rouge_n(&candidate, &reference, 2).fmeasure,
            rouge_l: rouge_l(&candidate, &reference).fmeasure,
            bleu: sentence_bleu(&bleu_tokenize(response), &bleu_tokenize(ground_truth)),
        }
    }

    /// Score responses against ground truths, pairwise by position
    pub fn evaluate<R, G>(
        &self,
        responses: &[R],
        ground_truths: &[G],
    ) -> Result<EvaluationResult, EvaluationError>
    where
        R: AsRef<str>,
        G: AsRef<str>,
    {
        if responses.len() != ground_truths.len() {
            return Err(EvaluationError::LengthMismatch {
                responses: responses.len(),
                ground_truths: ground_truths.len(),
            });
        }

        if let Some(index) = ground_truths
            .iter()
            .position(|truth| self.tokenizer.tokenize(truth.as_ref()).is_empty())
        {
            return Err(EvaluationError::TokenizationFailure { index });
        }

        tracing::info!("Evaluating {} response pairs", responses.len());

        let mut per_pair = Vec::with_capacity(responses.len());
        for (i, (response, truth)) in responses.iter().zip(ground_truths).enumerate() {
            let scores = self.score_pair(response.as_ref(), truth.as_ref());
            tracing::info!(
                "Pair {}: ROUGE-1 {:.3}, ROUGE-2 {:.3}, ROUGE-L {:.3}, BLEU {:.3}",
                i + 1,
                scores.rouge1,
                scores.rouge2,
                scores.rouge_l,
                scores.bleu
            );
            per_pair.push(scores);
        }

        let averages = average(&per_pair);
        let rouge_rating = Rating::for_rouge(averages.rouge1);
        let bleu_rating = Rating::for_bleu(averages.bleu);

        tracing::info!(
            "Average: ROUGE-1 {:.3}, ROUGE-2 {:.3}, ROUGE-L {:.3}, BLEU {:.3}",
            averages.rouge1,
            averages.rouge2,
            averages.rouge_l,
            averages.bleu
        );
        tracing::info!("Word overlap: {}, fluency/precision: {}", rouge_rating, bleu_rating);

        Ok(EvaluationResult {
            per_pair,
            averages,
            rouge_rating,
            bleu_rating,
        })
    }
}

fn average(scores: &[PairScores]) -> MetricAverages {
    if scores.is_empty() {
        return MetricAverages::default();
    }

    let n = scores.len() as f64;
    let mean = |metric: fn(&PairScores) -> f64| scores.iter().map(metric).sum::<f64>() / n;
    MetricAverages {
        rouge1: mean(|s| s.rouge1),
        rouge2: mean(|s| s.rouge2),
        rouge_l: mean(|s| s.rouge_l),
        bleu: mean(|s| s.bleu),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_answer_scores_full_rouge() {
        let result = Evaluator::new()
            .evaluate(&["the cat sat"], &["the cat sat"])
            .unwrap();

        let pair = result.per_pair[0];
        assert!((pair.rouge1 - 1.0).abs() < 1e-9);
        assert!((pair.rouge2 - 1.0).abs() < 1e-9);
        assert!((pair.rouge_l - 1.0).abs() < 1e-9);
        assert!((pair.bleu - 0.1f64.powf(0.25)).abs() < 1e-9);
        assert_eq!(result.rouge_rating, Rating::Excellent);
        assert_eq!(result.bleu_rating, Rating::Excellent);
    }

    #[test]
    fn test_length_mismatch() {
        let err = Evaluator::new()
            .evaluate(&["a", "b"], &["a"])
            .unwrap_err();
        assert_eq!(
            err,
            EvaluationError::LengthMismatch {
                responses: 2,
                ground_truths: 1,
            }
        );
    }

    #[test]
    fn test_untokenizable_ground_truth() {
        let err = Evaluator::new()
            .evaluate(&["fine", "also fine"], &["a reference", "..."])
            .unwrap_err();
        assert_eq!(err, EvaluationError::TokenizationFailure { index: 1 });
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let empty: [&str; 0] = [];
        let result = Evaluator::new().evaluate(&empty, &empty).unwrap();
        assert!(result.per_pair.is_empty());
        assert_eq!(result.averages, MetricAverages::default());
        assert_eq!(result.rouge_rating, Rating::Poor);
    }

    #[test]
    fn test_averages_are_means() {
        let result = Evaluator::new()
            .evaluate(
                &["edge devices run models", "completely unrelated words"],
                &["edge devices run models", "quantization shrinks networks"],
            )
            .unwrap();

        assert!((result.per_pair[0].rouge1 - 1.0).abs() < 1e-9);
        assert_eq!(result.per_pair[1].rouge1, 0.0);
        assert!((result.averages.rouge1 - 0.5).abs() < 1e-9);
        assert_eq!(result.rouge_rating, Rating::Excellent);
    }

    #[test]
    fn test_stemming_matches_inflections() {
        let scores = Evaluator::new().score_pair("models running", "model runs");
        assert!((scores.rouge1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rating_bands() {
        assert_eq!(Rating::for_rouge(0.5), Rating::Excellent);
        assert_eq!(Rating::for_rouge(0.3), Rating::Good);
        assert_eq!(Rating::for_rouge(0.25), Rating::Fair);
        assert_eq!(Rating::for_rouge(0.1), Rating::Poor);
        assert_eq!(Rating::for_bleu(0.4), Rating::Excellent);
        assert_eq!(Rating::for_bleu(0.3), Rating::Good);
        assert_eq!(Rating::for_bleu(0.15), Rating::Fair);
        assert_eq!(Rating::for_bleu(0.0), Rating::Poor);
    }
}
