//! Property-based tests for tashih-rag

use proptest::prelude::*;
use tashih_rag::{
    chunk::{chunk_corpus, Chunk, ExplanationSplitChunker},
    corpus::{Corpus, ErrorRecord},
    embed::{cosine_similarity, Embedder, MockEmbedder},
    index::{DistanceMetric, VectorStore},
    metrics::{accuracy, bleu, Evaluator},
    response::parse_paraphrases,
};

fn store_from(vectors: &[Vec<f32>], metric: DistanceMetric) -> VectorStore {
    let chunks = (0..vectors.len())
        .map(|i| Chunk::new(i, format!("record {i}")))
        .collect();
    VectorStore::build_with_metric(chunks, vectors.to_vec(), metric).unwrap()
}

fn arabic_sentence() -> impl Strategy<Value = String> {
    prop::collection::vec("[ا-غف-ي]{2,7}", 1..12).prop_map(|words| words.join(" "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_scores_within_unit_interval(
        prediction in arabic_sentence(),
        reference in arabic_sentence(),
    ) {
        let result = Evaluator::new().evaluate(&prediction, &reference);

        for score in [result.accuracy, result.bleu, result.rouge1_f1, result.rouge_l_f1] {
            prop_assert!((0.0..=1.0).contains(&score), "score out of range: {}", score);
        }
        prop_assert!(result.accuracy == 0.0 || result.accuracy == 1.0);
        prop_assert!(result.rouge_l_f1 <= result.rouge1_f1 + 1e-9);
    }

    #[test]
    fn prop_identical_text_scores_one(text in arabic_sentence()) {
        let result = Evaluator::new().evaluate(&text, &text);

        prop_assert_eq!(result.accuracy, 1.0);
        prop_assert!((result.bleu - 1.0).abs() < 1e-9);
        prop_assert!((result.rouge1_f1 - 1.0).abs() < 1e-9);
        prop_assert!((result.rouge_l_f1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn prop_accuracy_symmetric(a in arabic_sentence(), b in arabic_sentence()) {
        prop_assert_eq!(accuracy(&a, &b), accuracy(&b, &a));
        prop_assert_eq!(accuracy(&a, &b) == 1.0, a == b);
    }

    #[test]
    fn prop_bleu_zero_without_shared_words(
        prediction in prop::collection::vec("[a-z]{3,6}", 1..8),
        reference in prop::collection::vec("[ا-غف-ي]{3,6}", 1..8),
    ) {
        prop_assert_eq!(bleu(&prediction.join(" "), &reference.join(" ")), 0.0);
    }

    #[test]
    fn prop_search_sorted_and_bounded(
        vectors in prop::collection::vec(prop::collection::vec(-1.0f32..1.0, 8), 1..30),
        query in prop::collection::vec(-1.0f32..1.0, 8),
        k in 0usize..40,
    ) {
        for metric in [DistanceMetric::Cosine, DistanceMetric::DotProduct] {
            let store = store_from(&vectors, metric);
            let hits = store.search(&query, k).unwrap();

            prop_assert_eq!(hits.len(), k.min(vectors.len()));
            for pair in hits.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }

            let mut rows: Vec<usize> = hits.iter().map(|h| h.chunk.record_index).collect();
            rows.sort_unstable();
            rows.dedup();
            prop_assert_eq!(rows.len(), hits.len());
        }
    }

    #[test]
    fn prop_search_rejects_wrong_dimension(
        vectors in prop::collection::vec(prop::collection::vec(-1.0f32..1.0, 8), 1..10),
        len in 1usize..16,
    ) {
        prop_assume!(len != 8);
        let store = store_from(&vectors, DistanceMetric::Cosine);
        prop_assert!(store.search(&vec![0.5; len], 3).is_err());
    }

    #[test]
    fn prop_mock_embeddings_normalized(text in arabic_sentence(), dim in 16usize..512) {
        let embedder = MockEmbedder::new(dim);
        let embedding = embedder.embed(&text).unwrap();

        prop_assert_eq!(embedding.len(), dim);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        prop_assert!((norm - 1.0).abs() < 1e-4);
        prop_assert!((cosine_similarity(&embedding, &embedding) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn prop_indexed_record_finds_itself(
        sentences in prop::collection::hash_set(arabic_sentence(), 1..10),
    ) {
        let sentences: Vec<String> = sentences.into_iter().collect();
        let embedder = MockEmbedder::new(512);
        let mut chunks: Vec<Chunk> = sentences
            .iter()
            .enumerate()
            .map(|(i, s)| Chunk::new(i, s.clone()))
            .collect();
        embedder.embed_chunks(&mut chunks).unwrap();
        let store = VectorStore::from_embedded_chunks(chunks, DistanceMetric::Cosine).unwrap();

        for sentence in &sentences {
            let query = embedder.embed_query(sentence).unwrap();
            let hits = store.search(&query, 1).unwrap();
            prop_assert!((hits[0].score - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn prop_split_chunks_respect_record(
        explanation in prop::collection::vec("[ا-غف-ي]{2,9}", 1..60),
        max_chars in 10usize..80,
        overlap in 0usize..3,
    ) {
        let corpus = Corpus::from_records(vec![ErrorRecord::new(
            "رأيت المهندسون.",
            "رأيت المهندسين.",
            explanation.join(" "),
        )]);
        let chunks = chunk_corpus(&corpus, &ExplanationSplitChunker::new(max_chars, overlap)).unwrap();

        prop_assert!(!chunks.is_empty());
        for chunk in &chunks {
            prop_assert_eq!(chunk.record_index, 0);
            prop_assert!(chunk.content.starts_with("الخطأ: رأيت المهندسون."));
        }
    }

    #[test]
    fn prop_numbered_paraphrases_stripped(
        lines in prop::collection::vec(arabic_sentence(), 1..6),
    ) {
        let text: String = lines
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{}. {line}\n", i + 1))
            .collect();

        prop_assert_eq!(parse_paraphrases(&text), lines);
    }
}

#[test]
fn test_empty_store_search_returns_nothing() {
    let store = VectorStore::build(Vec::new(), Vec::new()).unwrap();
    assert!(store.is_empty());
    assert!(store.search(&[1.0, 0.0], 5).unwrap().is_empty());
}
