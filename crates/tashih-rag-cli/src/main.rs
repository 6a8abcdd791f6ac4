//! Tashih-RAG CLI
//!
//! Command-line interface for the Arabic grammar-correction pipeline.
//!
//! ## Usage
//!
//! ```bash
//! export WATSONX_URL=https://eu-de.ml.cloud.ibm.com
//! export WATSONX_APIKEY=...
//! export WATSONX_PROJECT_ID=...
//!
//! # Run all three modes and score the retrieval answer
//! tashih-rag correct --corpus errors.csv --sentence "معلموا المبحث نشيطون."
//!
//! # Score a saved answer without calling any service
//! tashih-rag score --corpus errors.csv --sentence "..." --response-file answer.txt
//!
//! # Settings from a JSON file; flags and environment still win
//! tashih-rag --config tashih.json correct --corpus errors.csv --max-new-tokens 200
//! ```
//!
//! Set `RUST_LOG=debug` for request-level logging on stderr.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tashih_rag::{
    chunk::chunk_corpus,
    config::{Config, PromptFormat, ENV_API_KEY, ENV_PROJECT_ID, ENV_URL},
    embed::{Embedder, MockEmbedder, WatsonxEmbedder},
    generate::{Decoding, GenerationOptions, WatsonxGenerator},
    index::{SearchHit, VectorStore},
    metrics::{Evaluator, ResponseEvaluation},
    pipeline::{Mode, ModeOutput, RagPipelineBuilder},
    watsonx::WatsonxClient,
    Corpus, ReferenceText,
};
use tracing_subscriber::EnvFilter;

/// Mode selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Correction instructions only
    Direct,
    /// Correction with similar corpus records as context
    Retrieval,
    /// Five rewordings of the sentence
    Paraphrase,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Direct => Mode::Direct,
            ModeArg::Retrieval => Mode::Retrieval,
            ModeArg::Paraphrase => Mode::Paraphrase,
        }
    }
}

/// Which part of the corpus record the answer is scored against
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ReferenceArg {
    /// Correction and explanation joined by a space
    #[default]
    Combined,
    /// Explanation only
    Explanation,
}

impl From<ReferenceArg> for ReferenceText {
    fn from(reference: ReferenceArg) -> Self {
        match reference {
            ReferenceArg::Combined => ReferenceText::CorrectionAndExplanation,
            ReferenceArg::Explanation => ReferenceText::Explanation,
        }
    }
}

/// Decoding strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DecodingArg {
    /// Sample with temperature
    Sample,
    /// Always pick the most likely token
    Greedy,
}

impl From<DecodingArg> for Decoding {
    fn from(decoding: DecodingArg) -> Self {
        match decoding {
            DecodingArg::Sample => Decoding::Sampling,
            DecodingArg::Greedy => Decoding::Greedy,
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Human-readable text
    #[default]
    Text,
    /// JSON report on stdout
    Json,
}

#[derive(Parser)]
#[command(name = "tashih-rag")]
#[command(version)]
#[command(about = "Arabic grammar-error correction with retrieval-augmented generation", long_about = None)]
struct Cli {
    /// JSON configuration file (models, retrieval, columns, retry)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Configuration file contents, or defaults when no file is given
fn base_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path).context("Failed to read configuration file"),
        None => Ok(Config::default()),
    }
}

/// Service credentials; flags and environment override the config file
#[derive(Args)]
struct CredentialArgs {
    /// Service URL
    #[arg(long, env = "WATSONX_URL", hide_env_values = true)]
    url: Option<String>,

    /// API key
    #[arg(long, env = "WATSONX_APIKEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Project ID
    #[arg(long, env = "WATSONX_PROJECT_ID", hide_env_values = true)]
    project_id: Option<String>,

    /// Request timeout in seconds [default: 60]
    #[arg(long)]
    timeout: Option<u64>,
}

impl CredentialArgs {
    fn apply(&self, config: &mut Config) -> Result<()> {
        config.credentials = std::mem::take(&mut config.credentials)
            .overridden(
                self.url.clone(),
                self.api_key.clone(),
                self.project_id.clone(),
            )
            .context("service credentials are required")?;

        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        Ok(())
    }
}

/// Decoding parameters; unset flags keep the configured values
#[derive(Args, Default)]
struct GenerationArgs {
    /// Minimum tokens to generate [default: 1]
    #[arg(long)]
    min_new_tokens: Option<u32>,

    /// Maximum tokens to generate [default: 500]
    #[arg(long)]
    max_new_tokens: Option<u32>,

    /// Sampling temperature in [0, 2] [default: 0.6]
    #[arg(long)]
    temperature: Option<f32>,

    /// Decoding strategy [default: sample]
    #[arg(long, value_enum)]
    decoding: Option<DecodingArg>,

    /// Wrap prompts in instruction markers
    #[arg(long)]
    instruct: bool,
}

impl GenerationArgs {
    fn apply(&self, config: &mut Config) {
        let options: &mut GenerationOptions = &mut config.generation.options;
        if let Some(min) = self.min_new_tokens {
            options.min_new_tokens = min;
        }
        if let Some(max) = self.max_new_tokens {
            options.max_new_tokens = max;
        }
        if let Some(temperature) = self.temperature {
            options.temperature = temperature;
        }
        if let Some(decoding) = self.decoding {
            options.decoding = decoding.into();
        }
        if self.instruct {
            config.generation.prompt_format = PromptFormat::Instruct;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Correct a sentence in one or more modes and score the answer
    Correct {
        /// Corpus CSV file
        #[arg(short, long)]
        corpus: PathBuf,

        /// Sentence to correct (read from stdin when absent)
        #[arg(short, long)]
        sentence: Option<String>,

        /// Modes to run (default: all)
        #[arg(short, long, value_enum)]
        mode: Vec<ModeArg>,

        /// Number of corpus records retrieved as context [default: 10]
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Reference used for scoring
        #[arg(long, value_enum, default_value = "combined")]
        reference: ReferenceArg,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,

        #[command(flatten)]
        generation: GenerationArgs,

        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Show the corpus records most similar to a sentence
    Search {
        /// Corpus CSV file
        #[arg(short, long)]
        corpus: PathBuf,

        /// Sentence to look up (read from stdin when absent)
        #[arg(short, long)]
        sentence: Option<String>,

        /// Number of results [default: 10]
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Use local hash embeddings instead of the embedding service
        #[arg(long)]
        offline: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,

        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Score a model answer against the corpus without calling any service
    Score {
        /// Corpus CSV file
        #[arg(short, long)]
        corpus: PathBuf,

        /// Erroneous sentence the answer belongs to
        #[arg(short, long)]
        sentence: String,

        /// Model answer text
        #[arg(short, long, conflicts_with = "response_file")]
        response: Option<String>,

        /// File holding the model answer (stdin when neither is given)
        #[arg(long)]
        response_file: Option<PathBuf>,

        /// Reference used for scoring
        #[arg(long, value_enum, default_value = "combined")]
        reference: ReferenceArg,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show pipeline info
    Info,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .try_init()
        .ok();

    let cli = Cli::parse();
    let mut config = base_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Correct {
            corpus,
            sentence,
            mode,
            top_k,
            reference,
            format,
            generation,
            credentials,
        } => {
            credentials.apply(&mut config)?;
            generation.apply(&mut config);
            if let Some(top_k) = top_k {
                config.retrieval.top_k = top_k;
            }
            run_correct(&config, &corpus, sentence, &mode, reference.into(), format)?;
        }
        Commands::Search {
            corpus,
            sentence,
            top_k,
            offline,
            format,
            credentials,
        } => {
            if !offline {
                credentials.apply(&mut config)?;
            }
            if let Some(top_k) = top_k {
                config.retrieval.top_k = top_k;
            }
            run_search(&config, &corpus, sentence, offline, format)?;
        }
        Commands::Score {
            corpus,
            sentence,
            response,
            response_file,
            reference,
            format,
        } => run_score(
            &config,
            &corpus,
            &sentence,
            response,
            response_file.as_deref(),
            reference.into(),
            format,
        )?,
        Commands::Info => run_info(&config, cli.config.as_deref()),
    }

    Ok(())
}

fn run_info(config: &Config, source: Option<&Path>) {
    let embedding = &config.embedding;
    let generation = &config.generation;
    let retrieval = &config.retrieval;
    let columns = &retrieval.columns;

    println!("Tashih-RAG Pipeline");
    println!("===================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
    match source {
        Some(path) => println!("Config: {}", path.display()),
        None => println!("Config: built-in defaults"),
    }
    println!("Modes: direct, retrieval, paraphrase");
    println!(
        "Corpus columns: {}, {}, {}",
        columns.error, columns.correction, columns.explanation
    );
    println!(
        "Embedding model: {} ({} dims)",
        embedding.model_id, embedding.dimension
    );
    println!("Generation model: {}", generation.model_id);
    println!(
        "Generation: min_new_tokens={}, max_new_tokens={}, temperature={}, decoding={}",
        generation.options.min_new_tokens,
        generation.options.max_new_tokens,
        generation.options.temperature,
        generation.options.decoding.as_str()
    );
    println!(
        "Retrieval: top_k={}, metric={:?}, chunking={:?}",
        retrieval.top_k, retrieval.metric, retrieval.chunking
    );
    println!("Timeout: {}s, retries: {}", config.timeout_secs, config.retry.max_retries);
    println!("Metrics: accuracy, BLEU, ROUGE-1 F1, ROUGE-L F1");
    println!();
    println!("Credentials: {ENV_URL}, {ENV_API_KEY}, {ENV_PROJECT_ID}");
    let missing = config.credentials.missing();
    if !missing.is_empty() {
        println!("Not set in config file: {}", missing.join(", "));
    }
}

fn load_corpus(config: &Config, path: &Path) -> Result<Corpus> {
    Corpus::load(path, &config.retrieval.columns)
        .with_context(|| format!("Failed to load corpus: {}", path.display()))
}

/// Take the sentence from the flag, or prompt for one line on stdin
fn read_sentence(sentence: Option<String>) -> Result<String> {
    if let Some(sentence) = sentence {
        return Ok(sentence);
    }

    eprint!("Please enter a sentence with error: ");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read sentence from stdin")?;

    let sentence = line.trim().to_string();
    if sentence.is_empty() {
        anyhow::bail!("No sentence given");
    }
    Ok(sentence)
}

fn read_response(response: Option<String>, file: Option<&Path>) -> Result<String> {
    match (response, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read response file: {}", path.display())),
        (None, None) => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read response from stdin")?;
            Ok(text)
        }
    }
}

#[derive(Serialize)]
struct CorrectionReport {
    sentence: String,
    outputs: Vec<ModeOutput>,
    paraphrases: Vec<String>,
    evaluated_mode: Option<Mode>,
    evaluation: Option<ResponseEvaluation>,
    warnings: Vec<String>,
}

fn run_correct(
    config: &Config,
    corpus_path: &Path,
    sentence: Option<String>,
    modes: &[ModeArg],
    reference: ReferenceText,
    format: Format,
) -> Result<()> {
    config.validate()?;

    let corpus = load_corpus(config, corpus_path)?;
    let sentence = read_sentence(sentence)?;

    // One client, so both services reuse a single access token
    let client = Arc::new(WatsonxClient::new(config).context("Failed to create watsonx client")?);
    let embedder = WatsonxEmbedder::with_client(Arc::clone(&client), config.embedding.clone());
    let generator = WatsonxGenerator::with_client(client, config.generation.clone());

    let pipeline = RagPipelineBuilder::new()
        .chunker(config.retrieval.chunking.build(corpus.columns()))
        .corpus(corpus)
        .embedder(embedder)
        .generator(generator)
        .options(config.generation.options.clone())
        .metric(config.retrieval.metric)
        .top_k(config.retrieval.top_k)
        .build()
        .context("Failed to set up pipeline")?;

    let modes: Vec<Mode> = if modes.is_empty() {
        Mode::ALL.to_vec()
    } else {
        modes.iter().copied().map(Mode::from).collect()
    };

    let mut outputs = Vec::with_capacity(modes.len());
    for mode in modes {
        let output = pipeline
            .run(mode, &sentence)
            .with_context(|| format!("{mode} mode failed"))?;
        if format == Format::Text {
            print_output(&output);
        }
        outputs.push(output);
    }

    let Scoring {
        mode: evaluated_mode,
        evaluation,
        warnings,
    } = score_outputs(pipeline.corpus(), &outputs, reference);

    match format {
        Format::Json => {
            let paraphrases = outputs
                .iter()
                .find(|o| o.mode == Mode::Paraphrase)
                .map(ModeOutput::paraphrases)
                .unwrap_or_default();
            let report = CorrectionReport {
                sentence,
                evaluated_mode,
                outputs,
                paraphrases,
                evaluation,
                warnings,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Format::Text => {
            if let (Some(mode), Some(evaluation)) = (evaluated_mode, &evaluation) {
                println!("=== Evaluation ({mode}) ===");
                print_evaluation(evaluation);
            }
            for warning in &warnings {
                println!("Warning: {warning}");
            }
        }
    }

    Ok(())
}

/// Outcome of scoring one answer of a `correct` run
#[derive(Debug, Default)]
struct Scoring {
    mode: Option<Mode>,
    evaluation: Option<ResponseEvaluation>,
    warnings: Vec<String>,
}

/// Score the retrieval answer when present, else the direct one
///
/// Scoring failures become warnings; they never fail the run.
fn score_outputs(corpus: &Corpus, outputs: &[ModeOutput], reference: ReferenceText) -> Scoring {
    let Some(output) = outputs
        .iter()
        .find(|o| o.mode == Mode::Retrieval)
        .or_else(|| outputs.iter().find(|o| o.mode == Mode::Direct))
    else {
        return Scoring::default();
    };

    match Evaluator::new().evaluate_response(corpus, &output.sentence, &output.response, reference)
    {
        Ok(evaluation) => Scoring {
            mode: Some(output.mode),
            evaluation: Some(evaluation),
            warnings: Vec::new(),
        },
        Err(err) => {
            tracing::warn!(mode = %output.mode, error = %err, "answer not scored");
            Scoring {
                mode: Some(output.mode),
                evaluation: None,
                warnings: vec![err.to_string()],
            }
        }
    }
}

fn print_output(output: &ModeOutput) {
    println!("=== {} ===", output.mode);
    if !output.hits.is_empty() {
        println!("Retrieved ({}):", output.hits.len());
        print_hits(&output.hits);
    }
    println!("Query: {}", output.prompt);
    println!("Response: {}", output.response);
    if output.mode == Mode::Paraphrase {
        let paraphrases = output.paraphrases();
        if !paraphrases.is_empty() {
            println!("Paraphrases:");
            for (i, line) in paraphrases.iter().enumerate() {
                println!("  {}. {line}", i + 1);
            }
        }
    }
    println!();
}

fn print_hits(hits: &[SearchHit]) {
    for (rank, hit) in hits.iter().enumerate() {
        let first_line = hit.chunk.content.lines().next().unwrap_or_default();
        println!(
            "{}. [Score: {:.3}] (row {}) {}",
            rank + 1,
            hit.score,
            hit.chunk.record_index + 1,
            first_line
        );
    }
}

fn print_evaluation(evaluation: &ResponseEvaluation) {
    println!("Reference: {}", evaluation.reference);
    println!("Prediction: {}", evaluation.prediction);
    println!("Accuracy Score: {}", evaluation.scores.accuracy);
    println!("BLEU Score: {:.4}", evaluation.scores.bleu);
    println!("ROUGE-1 F1 Score: {:.4}", evaluation.scores.rouge1_f1);
    println!("ROUGE-L F1 Score: {:.4}", evaluation.scores.rouge_l_f1);
}

fn run_search(
    config: &Config,
    corpus_path: &Path,
    sentence: Option<String>,
    offline: bool,
    format: Format,
) -> Result<()> {
    if !offline {
        config.validate()?;
    }

    let corpus = load_corpus(config, corpus_path)?;
    let sentence = read_sentence(sentence)?;

    let embedder: Box<dyn Embedder> = if offline {
        Box::new(
            MockEmbedder::new(256)
                .with_model_id("offline-hash")
                .with_prefixes(
                    config.embedding.query_prefix.as_deref(),
                    config.embedding.document_prefix.as_deref(),
                ),
        )
    } else {
        Box::new(WatsonxEmbedder::new(config).context("Failed to create embedding client")?)
    };

    let retrieval = &config.retrieval;
    let chunker = retrieval.chunking.build(corpus.columns());
    let mut chunks = chunk_corpus(&corpus, chunker.as_ref())?;
    embedder
        .embed_chunks(&mut chunks)
        .context("Failed to embed corpus")?;
    let store = VectorStore::from_embedded_chunks(chunks, retrieval.metric)?;

    let hits = if store.is_empty() {
        Vec::new()
    } else {
        let query = embedder
            .embed_query(sentence.trim())
            .context("Failed to embed sentence")?;
        store.search(&query, retrieval.top_k)?
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&hits)?),
        Format::Text => {
            println!("Query: \"{sentence}\"\n");
            println!("Results ({}):", hits.len());
            println!("{}", "-".repeat(50));
            print_hits(&hits);
        }
    }

    Ok(())
}

fn run_score(
    config: &Config,
    corpus_path: &Path,
    sentence: &str,
    response: Option<String>,
    response_file: Option<&Path>,
    reference: ReferenceText,
    format: Format,
) -> Result<()> {
    let corpus = load_corpus(config, corpus_path)?;
    let response = read_response(response, response_file)?;

    let evaluation = Evaluator::new()
        .evaluate_response(&corpus, sentence.trim(), &response, reference)
        .context("Failed to score response")?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&evaluation)?),
        Format::Text => print_evaluation(&evaluation),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_mode_arg_conversion() {
        assert_eq!(Mode::from(ModeArg::Direct), Mode::Direct);
        assert_eq!(Mode::from(ModeArg::Retrieval), Mode::Retrieval);
        assert_eq!(Mode::from(ModeArg::Paraphrase), Mode::Paraphrase);
    }

    #[test]
    fn test_reference_arg_conversion() {
        assert_eq!(
            ReferenceText::from(ReferenceArg::Combined),
            ReferenceText::CorrectionAndExplanation
        );
        assert_eq!(
            ReferenceText::from(ReferenceArg::Explanation),
            ReferenceText::Explanation
        );
    }

    #[test]
    fn test_read_response_prefers_text() {
        assert_eq!(read_response(Some("x".to_string()), None).unwrap(), "x");
    }

    #[test]
    fn test_read_sentence_from_flag() {
        assert_eq!(read_sentence(Some("جملة".to_string())).unwrap(), "جملة");
    }

    // ============ Config Merge Tests ============

    #[test]
    fn test_generation_flags_override_config() {
        let mut config = Config::default();
        config.generation.options.max_new_tokens = 300;

        let args = GenerationArgs {
            min_new_tokens: Some(5),
            temperature: Some(0.2),
            decoding: Some(DecodingArg::Greedy),
            instruct: true,
            ..GenerationArgs::default()
        };
        args.apply(&mut config);

        let options = &config.generation.options;
        assert_eq!(options.min_new_tokens, 5);
        assert_eq!(options.max_new_tokens, 300);
        assert!((options.temperature - 0.2).abs() < 1e-6);
        assert_eq!(options.decoding, Decoding::Greedy);
        assert_eq!(config.generation.prompt_format, PromptFormat::Instruct);
    }

    #[test]
    fn test_unset_generation_flags_keep_config() {
        let mut config = Config::default();
        config.generation.options.temperature = 1.1;
        GenerationArgs::default().apply(&mut config);

        assert!((config.generation.options.temperature - 1.1).abs() < 1e-6);
        assert_eq!(config.generation.prompt_format, PromptFormat::Plain);
    }

    #[test]
    fn test_credential_flags_fill_config_file_gaps() {
        let mut config = Config::default();
        config.credentials.url = "eu-de.ml.cloud.ibm.com".to_string();
        config.timeout_secs = 30;

        let args = CredentialArgs {
            url: None,
            api_key: Some("k".to_string()),
            project_id: Some("p".to_string()),
            timeout: None,
        };
        args.apply(&mut config).unwrap();

        assert_eq!(config.credentials.url, "https://eu-de.ml.cloud.ibm.com");
        assert_eq!(config.credentials.api_key, "k");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    // ============ Scoring Tests ============

    const ANSWER: &str = "الصواب: رأيت المهندسين.\nالتفسير: المفعول به منصوب";

    fn scoring_corpus() -> Corpus {
        Corpus::from_records(vec![tashih_rag::ErrorRecord::new(
            "رأيت المهندسون.",
            "رأيت المهندسين.",
            "المفعول به منصوب",
        )])
    }

    fn output(mode: Mode, sentence: &str, response: &str) -> ModeOutput {
        ModeOutput {
            mode,
            sentence: sentence.to_string(),
            prompt: String::new(),
            response: response.to_string(),
            hits: Vec::new(),
        }
    }

    #[test]
    fn test_score_outputs_prefers_retrieval() {
        let outputs = vec![
            output(Mode::Direct, "رأيت المهندسون.", "الصواب: خطأ\nالتفسير: لا"),
            output(Mode::Retrieval, "رأيت المهندسون.", ANSWER),
            output(Mode::Paraphrase, "رأيت المهندسون.", "1. أ"),
        ];
        let scoring = score_outputs(&scoring_corpus(), &outputs, ReferenceText::Explanation);

        assert_eq!(scoring.mode, Some(Mode::Retrieval));
        assert!(scoring.warnings.is_empty());
        let evaluation = scoring.evaluation.unwrap();
        assert_eq!(evaluation.reference, "المفعول به منصوب");
        assert_eq!(evaluation.scores.accuracy, 1.0);
    }

    #[test]
    fn test_score_outputs_falls_back_to_direct() {
        let outputs = vec![
            output(Mode::Paraphrase, "رأيت المهندسون.", "1. أ"),
            output(Mode::Direct, "رأيت المهندسون.", ANSWER),
        ];
        let scoring = score_outputs(&scoring_corpus(), &outputs, ReferenceText::Explanation);
        assert_eq!(scoring.mode, Some(Mode::Direct));
        assert!(scoring.evaluation.is_some());
    }

    #[test]
    fn test_score_outputs_paraphrase_only_scores_nothing() {
        let outputs = vec![output(Mode::Paraphrase, "رأيت المهندسون.", "1. أ")];
        let scoring = score_outputs(&scoring_corpus(), &outputs, ReferenceText::default());
        assert!(scoring.mode.is_none());
        assert!(scoring.evaluation.is_none());
        assert!(scoring.warnings.is_empty());
    }

    #[test]
    fn test_score_outputs_unknown_sentence_warns() {
        let outputs = vec![output(Mode::Direct, "جملة خارج المدونة", ANSWER)];
        let scoring = score_outputs(&scoring_corpus(), &outputs, ReferenceText::default());

        assert_eq!(scoring.mode, Some(Mode::Direct));
        assert!(scoring.evaluation.is_none());
        assert_eq!(scoring.warnings.len(), 1);
        assert!(scoring.warnings[0].contains("no ground truth found"));
    }

    #[test]
    fn test_score_outputs_unlabelled_answer_warns() {
        let outputs = vec![output(Mode::Retrieval, "رأيت المهندسون.", "لا أعرف")];
        let scoring = score_outputs(&scoring_corpus(), &outputs, ReferenceText::default());

        assert!(scoring.evaluation.is_none());
        assert!(scoring.warnings[0].contains("could not parse model response"));
    }
}
