//! Prompt templates and retrieved-context assembly
//!
//! All three modes share the same correction instructions so that responses
//! carry the same four labelled lines whichever mode produced them.

use crate::index::SearchHit;
use serde::{Deserialize, Serialize};

/// Label preceding the erroneous sentence in a response
pub const LABEL_ERROR: &str = "الخطأ:";
/// Label preceding the error category
pub const LABEL_ERROR_TYPE: &str = "نوع الخطأ:";
/// Label preceding the corrected sentence
pub const LABEL_CORRECTION: &str = "الصواب:";
/// Label preceding the explanation
pub const LABEL_EXPLANATION: &str = "التفسير:";

/// Correction request for a sentence, with response format instructions
#[must_use]
pub fn correction_prompt(sentence: &str) -> String {
    format!(
        "\nقم بتصحيح الجملة التالية ({sentence}) مع تطبيق الشروط التالية:\n\
         1- توضيح نوع الخطأ اللغوي فيها\n\
         2- اختصار التفسير حدود 20 كلمة فقط\n\
         3- الرد كاملاً يجب أن يكون باللغة العربية\n\
         \n\
         اكتب الرد على النحو التالي:\n\
         {LABEL_ERROR} الجملة\n\
         {LABEL_ERROR_TYPE} النوع\n\
         {LABEL_CORRECTION} تصحيح الجملة\n\
         {LABEL_EXPLANATION} كتابة التفسيرالمختصر\n"
    )
}

/// Correction request preceded by retrieved reference documents
#[must_use]
pub fn retrieval_prompt(context: &str, sentence: &str) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, \
         don't try to make up an answer.\n\n\
         {context}\n\n\
         Question: {question}\n\
         Helpful Answer:",
        question = correction_prompt(sentence)
    )
}

/// Request for five dissimilar rewordings, one per line
#[must_use]
pub fn paraphrase_prompt(sentence: &str) -> String {
    format!("أعد صياغة الجملة التالية بخمس طرق غير متشابهة واجعل كل جملة في سطر جديد  : {sentence}")
}

/// A retrieved chunk placed in the prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextChunk {
    /// The chunk content
    pub content: String,
    /// Corpus row the chunk came from
    pub record_index: usize,
    /// Retrieval score
    pub score: f32,
}

/// Assembled context from retrieval results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssembledContext {
    /// Ordered chunks in context
    pub chunks: Vec<ContextChunk>,
    /// Total characters of chunk content
    pub total_chars: usize,
}

impl AssembledContext {
    /// Chunks separated by blank lines
    #[must_use]
    pub fn format_plain(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Get the number of chunks
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if the context is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Assembles retrieved chunks into prompt context, in rank order
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    max_chars: Option<usize>,
}

impl ContextAssembler {
    /// Assembler that keeps every hit
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop adding hits once the character budget would be exceeded
    #[must_use]
    pub fn with_max_chars(max_chars: usize) -> Self {
        Self {
            max_chars: Some(max_chars),
        }
    }

    /// Assemble context from search hits
    #[must_use]
    pub fn assemble(&self, hits: &[SearchHit]) -> AssembledContext {
        let mut context = AssembledContext::default();

        for hit in hits {
            let chars = hit.chunk.len();
            if let Some(max) = self.max_chars {
                if context.total_chars + chars > max {
                    break;
                }
            }

            context.total_chars += chars;
            context.chunks.push(ContextChunk {
                content: hit.chunk.content.clone(),
                record_index: hit.chunk.record_index,
                score: hit.score,
            });
        }

        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Chunk;

    const SENTENCE: &str = "معلموا المبحث نشيطون.";

    fn hit(index: usize, content: &str, score: f32) -> SearchHit {
        SearchHit {
            chunk: Chunk::new(index, content.to_string()),
            score,
        }
    }

    // ============ Template Tests ============

    #[test]
    fn test_correction_prompt_embeds_sentence() {
        let prompt = correction_prompt(SENTENCE);
        assert!(prompt.contains(&format!("({SENTENCE})")));
        assert!(prompt.contains("20 كلمة"));
        assert!(prompt.contains("باللغة العربية"));
        for label in [LABEL_ERROR, LABEL_ERROR_TYPE, LABEL_CORRECTION, LABEL_EXPLANATION] {
            assert!(prompt.contains(label), "missing {label}");
        }
        assert!(prompt.starts_with('\n'));
        assert!(prompt.ends_with('\n'));
    }

    #[test]
    fn test_correction_prompt_line_layout() {
        let prompt = correction_prompt(SENTENCE);
        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(lines[0], "");
        assert!(lines[1].starts_with("قم بتصحيح"));
        assert_eq!(lines[5], "");
        assert_eq!(lines[7], "الخطأ: الجملة");
        assert_eq!(lines[10], "التفسير: كتابة التفسيرالمختصر");
    }

    #[test]
    fn test_retrieval_prompt_contains_context_and_question() {
        let prompt = retrieval_prompt("الخطأ: أ\nالصواب: ب", SENTENCE);
        assert!(prompt.starts_with("Use the following pieces of context"));
        assert!(prompt.contains("الخطأ: أ\nالصواب: ب"));
        assert!(prompt.contains(&correction_prompt(SENTENCE)));
        assert!(prompt.ends_with("Helpful Answer:"));
    }

    #[test]
    fn test_paraphrase_prompt() {
        let prompt = paraphrase_prompt(SENTENCE);
        assert!(prompt.starts_with("أعد صياغة"));
        assert!(prompt.contains("بخمس طرق"));
        assert!(prompt.ends_with(SENTENCE));
    }

    // ============ ContextAssembler Tests ============

    #[test]
    fn test_assemble_keeps_rank_order() {
        let hits = vec![hit(3, "ثالث", 0.9), hit(1, "أول", 0.5)];
        let context = ContextAssembler::new().assemble(&hits);

        assert_eq!(context.len(), 2);
        assert_eq!(context.chunks[0].record_index, 3);
        assert_eq!(context.format_plain(), "ثالث\n\nأول");
        assert_eq!(context.total_chars, 7);
    }

    #[test]
    fn test_assemble_empty() {
        let context = ContextAssembler::new().assemble(&[]);
        assert!(context.is_empty());
        assert_eq!(context.format_plain(), "");
    }

    #[test]
    fn test_assemble_respects_budget() {
        let hits = vec![hit(0, "aaaa", 1.0), hit(1, "bbbb", 0.9), hit(2, "c", 0.8)];
        let context = ContextAssembler::with_max_chars(6).assemble(&hits);
        assert_eq!(context.len(), 1);
        assert_eq!(context.format_plain(), "aaaa");
    }
}
