//! Corpus of known errors and their corrections
//!
//! The corpus is a UTF-8 CSV file with one row per error. Three columns are
//! required: the erroneous sentence, its correction, and an explanation.
//! Column names default to the Arabic headers of the reference spreadsheet
//! and can be overridden with [`CorpusColumns`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Header names of the three required columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusColumns {
    /// Column holding the erroneous sentence
    pub error: String,
    /// Column holding the corrected sentence
    pub correction: String,
    /// Column holding the explanation of the error
    pub explanation: String,
}

impl Default for CorpusColumns {
    fn default() -> Self {
        Self {
            error: "الخطأ".to_string(),
            correction: "الصواب".to_string(),
            explanation: "التفسير".to_string(),
        }
    }
}

/// One known error with its correction and explanation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Sentence containing the error
    pub erroneous_sentence: String,
    /// Corrected sentence
    pub correct_sentence: String,
    /// Why the sentence was wrong
    pub explanation: String,
}

impl ErrorRecord {
    /// Create a new record
    #[must_use]
    pub fn new(
        erroneous_sentence: impl Into<String>,
        correct_sentence: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            erroneous_sentence: erroneous_sentence.into(),
            correct_sentence: correct_sentence.into(),
            explanation: explanation.into(),
        }
    }
}

/// Which part of a record serves as the evaluation reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceText {
    /// Correction and explanation joined by a single space
    #[default]
    CorrectionAndExplanation,
    /// The explanation alone
    Explanation,
}

/// An immutable, ordered snapshot of the error corpus
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    records: Vec<ErrorRecord>,
    columns: CorpusColumns,
    source: Option<PathBuf>,
}

impl Corpus {
    /// Build a corpus from records already in memory
    #[must_use]
    pub fn from_records(records: Vec<ErrorRecord>) -> Self {
        Self {
            records,
            columns: CorpusColumns::default(),
            source: None,
        }
    }

    /// Load a corpus from a CSV file
    pub fn load(path: impl AsRef<Path>, columns: &CorpusColumns) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| Error::CorpusLoad(format!("{}: {e}", path.display())))?;

        let mut corpus = Self::from_reader(file, columns)
            .map_err(|e| match e {
                Error::CorpusLoad(msg) => Error::CorpusLoad(format!("{}: {msg}", path.display())),
                other => other,
            })?;
        corpus.source = Some(path.to_path_buf());

        tracing::info!(
            path = %path.display(),
            records = corpus.len(),
            "loaded error corpus"
        );
        Ok(corpus)
    }

    /// Load a corpus from any CSV reader
    pub fn from_reader<R: Read>(reader: R, columns: &CorpusColumns) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| Error::CorpusLoad(format!("unreadable header row: {e}")))?
            .clone();

        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        };

        let wanted = [
            columns.error.as_str(),
            columns.correction.as_str(),
            columns.explanation.as_str(),
        ];
        let missing: Vec<&str> = wanted
            .iter()
            .copied()
            .filter(|name| position(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::CorpusLoad(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        // Presence checked above
        let error_idx = position(&columns.error).unwrap_or_default();
        let correction_idx = position(&columns.correction).unwrap_or_default();
        let explanation_idx = position(&columns.explanation).unwrap_or_default();

        let mut records = Vec::new();
        for (row, result) in csv_reader.records().enumerate() {
            let row_data = result
                .map_err(|e| Error::CorpusLoad(format!("row {}: {e}", row + 1)))?;

            if row_data.iter().all(str::is_empty) {
                continue;
            }

            let cell = |idx: usize| row_data.get(idx).unwrap_or_default().to_string();
            if cell(error_idx).is_empty() {
                return Err(Error::CorpusLoad(format!(
                    "row {}: empty erroneous sentence",
                    row + 1
                )));
            }
            records.push(ErrorRecord {
                erroneous_sentence: cell(error_idx),
                correct_sentence: cell(correction_idx),
                explanation: cell(explanation_idx),
            });
        }

        Ok(Self {
            records,
            columns: columns.clone(),
            source: None,
        })
    }

    /// All records in file order
    #[must_use]
    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    /// Record at a given row position
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ErrorRecord> {
        self.records.get(index)
    }

    /// Column names the corpus was loaded with
    #[must_use]
    pub fn columns(&self) -> &CorpusColumns {
        &self.columns
    }

    /// File the corpus was loaded from, if any
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the corpus is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record whose erroneous sentence equals `sentence` exactly
    #[must_use]
    pub fn find(&self, sentence: &str) -> Option<(usize, &ErrorRecord)> {
        self.records
            .iter()
            .enumerate()
            .find(|(_, r)| r.erroneous_sentence == sentence)
    }

    /// Reference text for evaluating a response to `sentence`
    pub fn ground_truth(&self, sentence: &str, reference: ReferenceText) -> Result<String> {
        let (_, record) = self
            .find(sentence)
            .ok_or_else(|| Error::GroundTruthNotFound(sentence.to_string()))?;

        Ok(match reference {
            ReferenceText::CorrectionAndExplanation => {
                format!("{} {}", record.correct_sentence, record.explanation)
            }
            ReferenceText::Explanation => record.explanation.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "الخطأ,الصواب,التفسير\n\
        معلموا المبحث نشيطون.,معلمو المبحث نشيطون.,جمع المذكر السالم يُحذف نونه عند الإضافة\n\
        رأيت المهندسون.,رأيت المهندسين.,جمع المذكر السالم يُنصب بالياء\n";

    fn load_sample() -> Corpus {
        Corpus::from_reader(SAMPLE.as_bytes(), &CorpusColumns::default()).unwrap()
    }

    #[test]
    fn test_load_records_in_order() {
        let corpus = load_sample();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.records()[0].erroneous_sentence, "معلموا المبحث نشيطون.");
        assert_eq!(corpus.records()[1].correct_sentence, "رأيت المهندسين.");
    }

    #[test]
    fn test_missing_columns_listed() {
        let data = "الخطأ,ملاحظة\nجملة,شيء\n";
        let err = Corpus::from_reader(data.as_bytes(), &CorpusColumns::default()).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, Error::CorpusLoad(_)));
        assert!(msg.contains("الصواب"));
        assert!(msg.contains("التفسير"));
        assert!(!msg.contains("الخطأ,"));
    }

    #[test]
    fn test_extra_columns_and_reordering() {
        let data = "id,التفسير,الخطأ,الصواب\n1,شرح,خطأ,صواب\n";
        let corpus = Corpus::from_reader(data.as_bytes(), &CorpusColumns::default()).unwrap();
        assert_eq!(corpus.records()[0], ErrorRecord::new("خطأ", "صواب", "شرح"));
    }

    #[test]
    fn test_bom_header_is_accepted() {
        let data = "\u{feff}الخطأ,الصواب,التفسير\nأ,ب,ج\n";
        let corpus = Corpus::from_reader(data.as_bytes(), &CorpusColumns::default()).unwrap();
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn test_empty_rows_skipped() {
        let data = "الخطأ,الصواب,التفسير\nأ,ب,ج\n,,\nد,هـ,و\n";
        let corpus = Corpus::from_reader(data.as_bytes(), &CorpusColumns::default()).unwrap();
        assert_eq!(corpus.len(), 2);
    }

    #[test]
    fn test_row_without_erroneous_sentence_rejected() {
        let data = "الخطأ,الصواب,التفسير\nأ,ب,ج\n,صواب فقط,شرح بلا خطأ\n";
        let err = Corpus::from_reader(data.as_bytes(), &CorpusColumns::default()).unwrap_err();
        assert!(matches!(err, Error::CorpusLoad(_)));
        assert!(err.to_string().contains("row 2: empty erroneous sentence"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(data.as_bytes()).unwrap();
        let err = Corpus::load(file.path(), &CorpusColumns::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(&file.path().display().to_string()));
        assert!(msg.contains("empty erroneous sentence"));
    }

    #[test]
    fn test_custom_columns() {
        let data = "error,correction,explanation\nteh cat,the cat,spelling\n";
        let columns = CorpusColumns {
            error: "error".to_string(),
            correction: "correction".to_string(),
            explanation: "explanation".to_string(),
        };
        let corpus = Corpus::from_reader(data.as_bytes(), &columns).unwrap();
        assert_eq!(corpus.records()[0].explanation, "spelling");
        assert_eq!(corpus.columns(), &columns);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Corpus::load("/definitely/not/here.csv", &CorpusColumns::default()).unwrap_err();
        assert!(matches!(err, Error::CorpusLoad(_)));
        assert!(err.to_string().contains("here.csv"));
    }

    #[test]
    fn test_load_from_file_records_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let corpus = Corpus::load(file.path(), &CorpusColumns::default()).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.source(), Some(file.path()));
    }

    #[test]
    fn test_ground_truth_combined() {
        let corpus = load_sample();
        let truth = corpus
            .ground_truth("معلموا المبحث نشيطون.", ReferenceText::CorrectionAndExplanation)
            .unwrap();
        assert_eq!(
            truth,
            "معلمو المبحث نشيطون. جمع المذكر السالم يُحذف نونه عند الإضافة"
        );
    }

    #[test]
    fn test_ground_truth_explanation_only() {
        let corpus = load_sample();
        let truth = corpus
            .ground_truth("رأيت المهندسون.", ReferenceText::Explanation)
            .unwrap();
        assert_eq!(truth, "جمع المذكر السالم يُنصب بالياء");
    }

    #[test]
    fn test_ground_truth_not_found() {
        let corpus = load_sample();
        let err = corpus
            .ground_truth("جملة غير موجودة", ReferenceText::default())
            .unwrap_err();
        assert!(matches!(err, Error::GroundTruthNotFound(_)));
    }

    #[test]
    fn test_find_returns_first_duplicate() {
        let corpus = Corpus::from_records(vec![
            ErrorRecord::new("س", "ص1", "ت1"),
            ErrorRecord::new("س", "ص2", "ت2"),
        ]);
        let (idx, record) = corpus.find("س").unwrap();
        assert_eq!(idx, 0);
        assert_eq!(record.correct_sentence, "ص1");
    }

    #[test]
    fn test_find_is_exact() {
        let corpus = load_sample();
        assert!(corpus.find("معلموا المبحث نشيطون").is_none());
    }
}
