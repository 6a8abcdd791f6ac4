//! Generation evaluation metrics
//!
//! Every score compares one prediction against one reference and lies in
//! `[0, 1]`. BLEU splits on whitespace; ROUGE tokenizes with Unicode word
//! boundaries and stems tokens longer than three characters.

use crate::corpus::{Corpus, ReferenceText};
use crate::response::CorrectionResponse;
use crate::Result;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

/// Exact-match accuracy: 1 when the strings are identical, else 0
#[must_use]
pub fn accuracy(prediction: &str, reference: &str) -> f64 {
    if prediction == reference {
        1.0
    } else {
        0.0
    }
}

/// BLEU settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BleuConfig {
    /// Longest n-gram order (uniform weights)
    pub max_order: usize,
    /// Numerator used in place of a zero match count; `None` disables
    /// smoothing
    pub smoothing: Option<f64>,
}

impl Default for BleuConfig {
    fn default() -> Self {
        Self {
            max_order: 4,
            smoothing: None,
        }
    }
}

/// Sentence BLEU with default settings
#[must_use]
pub fn bleu(prediction: &str, reference: &str) -> f64 {
    bleu_with(prediction, reference, &BleuConfig::default())
}

/// Sentence BLEU
///
/// BLEU = BP · exp(Σ wₙ · ln pₙ), with clipped n-gram precisions pₙ and
/// brevity penalty BP = min(1, exp(1 − r/c)). Orders longer than the
/// candidate are skipped and the weights spread over the remaining orders.
#[must_use]
pub fn bleu_with(prediction: &str, reference: &str, config: &BleuConfig) -> f64 {
    let candidate: Vec<&str> = prediction.split_whitespace().collect();
    let reference: Vec<&str> = reference.split_whitespace().collect();
    if candidate.is_empty() || reference.is_empty() {
        return 0.0;
    }

    let orders = config.max_order.min(candidate.len());
    if orders == 0 {
        return 0.0;
    }
    let weight = 1.0 / orders as f64;

    let mut log_precision = 0.0;
    for n in 1..=orders {
        let candidate_counts = ngram_counts(&candidate, n);
        let reference_counts = ngram_counts(&reference, n);
        let total = candidate.len() + 1 - n;

        let matched = clipped_overlap(&candidate_counts, &reference_counts);
        let precision = match (matched, config.smoothing) {
            (0, None) => return 0.0,
            (0, Some(epsilon)) => epsilon / total as f64,
            (m, _) => m as f64 / total as f64,
        };
        log_precision += weight * precision.ln();
    }

    let c = candidate.len() as f64;
    let r = reference.len() as f64;
    let brevity_penalty = if c > r { 1.0 } else { (1.0 - r / c).exp() };

    (brevity_penalty * log_precision.exp()).clamp(0.0, 1.0)
}

fn ngram_counts<'a, T: std::hash::Hash + Eq>(
    tokens: &'a [T],
    n: usize,
) -> HashMap<&'a [T], usize> {
    let mut counts = HashMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

fn clipped_overlap<K: std::hash::Hash + Eq>(
    candidate: &HashMap<K, usize>,
    reference: &HashMap<K, usize>,
) -> usize {
    candidate
        .iter()
        .map(|(gram, count)| (*count).min(reference.get(gram).copied().unwrap_or(0)))
        .sum()
}

/// Precision, recall and F1 of one ROUGE measure
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RougeScore {
    /// overlap / prediction length
    pub precision: f64,
    /// overlap / reference length
    pub recall: f64,
    /// Harmonic mean of precision and recall
    pub f1: f64,
}

impl RougeScore {
    fn from_overlap(overlap: usize, prediction_len: usize, reference_len: usize) -> Self {
        let precision = if prediction_len == 0 {
            0.0
        } else {
            overlap as f64 / prediction_len as f64
        };
        let recall = if reference_len == 0 {
            0.0
        } else {
            overlap as f64 / reference_len as f64
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
        }
    }
}

/// Word tokenizer for ROUGE
pub struct RougeTokenizer {
    stem: bool,
    arabic: Stemmer,
    english: Stemmer,
}

impl std::fmt::Debug for RougeTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RougeTokenizer")
            .field("stem", &self.stem)
            .finish_non_exhaustive()
    }
}

impl Default for RougeTokenizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RougeTokenizer {
    /// Create a tokenizer, optionally stemming tokens
    #[must_use]
    pub fn new(stem: bool) -> Self {
        Self {
            stem,
            arabic: Stemmer::create(Algorithm::Arabic),
            english: Stemmer::create(Algorithm::English),
        }
    }

    /// Lowercased Unicode words, stemmed when longer than three characters
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .map(|word| {
                let word = word.to_lowercase();
                if !self.stem || word.chars().count() <= 3 {
                    return word;
                }
                let stemmer = if word.chars().any(is_arabic) {
                    &self.arabic
                } else {
                    &self.english
                };
                stemmer.stem(&word).into_owned()
            })
            .collect()
    }
}

fn is_arabic(c: char) -> bool {
    matches!(c,
        '\u{0600}'..='\u{06FF}'
        | '\u{0750}'..='\u{077F}'
        | '\u{08A0}'..='\u{08FF}'
        | '\u{FB50}'..='\u{FDFF}'
        | '\u{FE70}'..='\u{FEFF}')
}

/// ROUGE-N over pre-tokenized text, with clipped n-gram overlap
#[must_use]
pub fn rouge_n(prediction: &[String], reference: &[String], n: usize) -> RougeScore {
    let prediction_counts = ngram_counts(prediction, n);
    let reference_counts = ngram_counts(reference, n);
    let overlap = clipped_overlap(&prediction_counts, &reference_counts);

    RougeScore::from_overlap(
        overlap,
        prediction_counts.values().sum(),
        reference_counts.values().sum(),
    )
}

/// ROUGE-L over pre-tokenized text
#[must_use]
pub fn rouge_l(prediction: &[String], reference: &[String]) -> RougeScore {
    let lcs = lcs_length(prediction, reference);
    RougeScore::from_overlap(lcs, prediction.len(), reference.len())
}

/// Length of the longest common subsequence
fn lcs_length<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            current[j + 1] = if x == y {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Scores for one (prediction, reference) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Exact match: 0 or 1
    pub accuracy: f64,
    /// Sentence BLEU
    pub bleu: f64,
    /// ROUGE-1 F1
    pub rouge1_f1: f64,
    /// ROUGE-L F1
    #[serde(rename = "rougeL_f1")]
    pub rouge_l_f1: f64,
}

/// A scored model response with the strings that were compared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEvaluation {
    /// Text extracted from the model response
    pub prediction: String,
    /// Ground truth from the corpus
    pub reference: String,
    /// Scores
    pub scores: EvaluationResult,
}

/// Computes [`EvaluationResult`]s
#[derive(Debug, Default)]
pub struct Evaluator {
    tokenizer: RougeTokenizer,
    bleu: BleuConfig,
}

impl Evaluator {
    /// Evaluator with stemming and unsmoothed 4-gram BLEU
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom BLEU settings
    #[must_use]
    pub fn with_bleu(mut self, bleu: BleuConfig) -> Self {
        self.bleu = bleu;
        self
    }

    /// Enable or disable ROUGE stemming
    #[must_use]
    pub fn with_stemming(mut self, stem: bool) -> Self {
        self.tokenizer = RougeTokenizer::new(stem);
        self
    }

    /// Score a prediction against a reference
    #[must_use]
    pub fn evaluate(&self, prediction: &str, reference: &str) -> EvaluationResult {
        let prediction_tokens = self.tokenizer.tokenize(prediction);
        let reference_tokens = self.tokenizer.tokenize(reference);

        EvaluationResult {
            accuracy: accuracy(prediction, reference),
            bleu: bleu_with(prediction, reference, &self.bleu),
            rouge1_f1: rouge_n(&prediction_tokens, &reference_tokens, 1).f1,
            rouge_l_f1: rouge_l(&prediction_tokens, &reference_tokens).f1,
        }
    }

    /// Parse a model response and score it against the corpus record for
    /// `sentence`
    ///
    /// The prediction takes the same shape as the reference: the
    /// explanation alone, or the correction and explanation joined by a
    /// space.
    pub fn evaluate_response(
        &self,
        corpus: &Corpus,
        sentence: &str,
        response: &str,
        target: ReferenceText,
    ) -> Result<ResponseEvaluation> {
        let reference = corpus.ground_truth(sentence, target)?;
        let parsed = CorrectionResponse::parse(response)?;
        let prediction = match target {
            ReferenceText::Explanation => parsed.explanation,
            ReferenceText::CorrectionAndExplanation => parsed.correction_and_explanation()?,
        };

        let scores = self.evaluate(&prediction, &reference);
        tracing::debug!(
            accuracy = scores.accuracy,
            bleu = scores.bleu,
            rouge1 = scores.rouge1_f1,
            rouge_l = scores.rouge_l_f1,
            "evaluated response"
        );
        Ok(ResponseEvaluation {
            prediction,
            reference,
            scores,
        })
    }
}
