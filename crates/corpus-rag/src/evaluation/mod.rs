//! Answer evaluation with ROUGE and BLEU

mod evaluator;
pub mod metrics;
mod qa;

pub use evaluator::{EvaluationResult, Evaluator, MetricAverages, PairScores, Rating};
pub use qa::{load_qa_pairs, QaPair};
