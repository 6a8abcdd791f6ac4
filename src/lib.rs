//! Tashih-RAG: Arabic grammar-error correction with retrieval-augmented
//! generation
//!
//! A corpus of known (error, correction, explanation) triples is chunked,
//! embedded and indexed in memory. A sentence is then corrected by a hosted
//! language model in one of three modes, and the model's explanation can be
//! scored against the corpus record for that sentence.
//!
//! # Quick Start
//!
//! ```rust
//! use tashih_rag::{
//!     corpus::{Corpus, ErrorRecord, ReferenceText},
//!     embed::MockEmbedder,
//!     generate::MockGenerator,
//!     metrics::Evaluator,
//!     pipeline::RagPipelineBuilder,
//! };
//!
//! let corpus = Corpus::from_records(vec![ErrorRecord::new(
//!     "معلموا المبحث نشيطون.",
//!     "معلمو المبحث نشيطون.",
//!     "جمع المذكر السالم يُحذف نونه عند الإضافة",
//! )]);
//!
//! let pipeline = RagPipelineBuilder::new()
//!     .corpus(corpus)
//!     .embedder(MockEmbedder::new(64))
//!     .generator(MockGenerator::fixed(
//!         "الصواب: معلمو المبحث نشيطون.\nالتفسير: جمع المذكر السالم يُحذف نونه عند الإضافة",
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let output = pipeline.retrieve("معلموا المبحث نشيطون.").unwrap();
//! assert_eq!(output.hits.len(), 1);
//!
//! let scored = Evaluator::new()
//!     .evaluate_response(
//!         pipeline.corpus(),
//!         &output.sentence,
//!         &output.response,
//!         ReferenceText::Explanation,
//!     )
//!     .unwrap();
//! assert_eq!(scored.scores.accuracy, 1.0);
//! ```
//!
//! # Modes
//!
//! - [`Mode::Direct`] - correction instructions only
//! - [`Mode::Retrieval`] - instructions preceded by the most similar records
//! - [`Mode::Paraphrase`] - five rewordings, one per line
//!
//! # Remote services
//!
//! [`WatsonxEmbedder`] and [`WatsonxGenerator`] talk to IBM watsonx.ai using
//! credentials from [`config::Credentials`]. [`MockEmbedder`] and
//! [`MockGenerator`] run offline.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::float_cmp)]

pub mod chunk;
pub mod config;
pub mod corpus;
pub mod embed;
pub mod error;
pub mod generate;
pub mod index;
pub mod metrics;
pub mod pipeline;
pub mod prompt;
pub mod response;
pub mod retry;
pub mod watsonx;

pub use chunk::{
    Chunk, ChunkId, ChunkingStrategy, ExplanationSplitChunker, RecordChunker, WholeRecordChunker,
};
pub use config::{Config, Credentials};
pub use corpus::{Corpus, CorpusColumns, ErrorRecord, ReferenceText};
pub use embed::{Embedder, MockEmbedder, WatsonxEmbedder};
pub use error::{Error, Result};
pub use generate::{GenerationOptions, Generator, MockGenerator, WatsonxGenerator};
pub use index::{DistanceMetric, SearchHit, VectorStore};
pub use metrics::{EvaluationResult, Evaluator};
pub use pipeline::{Mode, ModeOutput, RagPipeline, RagPipelineBuilder};
pub use response::CorrectionResponse;
